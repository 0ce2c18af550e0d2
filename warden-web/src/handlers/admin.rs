//! Admin API: roles, business elements, and the rule matrix
//!
//! Every route here sits behind the coarse admin gate; handlers assume the
//! caller already holds the admin role.

use super::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use warden_auth::{AccessRule, AccessRuleDetail, BusinessElement, Role, RuleFlags};

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ElementRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    pub role_id: i64,
    pub element_id: i64,
    #[serde(flatten)]
    pub flags: RuleFlags,
}

#[derive(Debug, Deserialize)]
pub struct RuleFlagsRequest {
    #[serde(flatten)]
    pub flags: RuleFlags,
}

#[derive(Debug, Deserialize)]
pub struct RuleFilter {
    #[serde(default)]
    pub role_id: Option<i64>,
    #[serde(default)]
    pub element_id: Option<i64>,
}

// ---- roles ----

pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(state.rules.list_roles().await?))
}

pub async fn create_role(
    State(state): State<AppState>,
    Json(request): Json<RoleRequest>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Role name is required"));
    }
    if state.rules.find_role_by_name(name).await?.is_some() {
        return Err(ApiError::bad_request("A role with this name already exists"));
    }

    let role = state
        .rules
        .create_role(name, request.description.as_deref())
        .await?;
    info!(role = %role.name, "Role created");
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<Role>, ApiError> {
    let role = state
        .rules
        .update_role(id, request.name.trim(), request.description.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    Ok(Json(role))
}

/// Deleting a role still referenced by users is refused
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.rules.find_role(id).await?.is_none() {
        return Err(ApiError::not_found("Role not found"));
    }
    if state.users.count_by_role(id).await? > 0 {
        return Err(ApiError::bad_request(
            "Role is assigned to users and cannot be deleted",
        ));
    }

    state.rules.delete_role(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- business elements ----

pub async fn list_elements(
    State(state): State<AppState>,
) -> Result<Json<Vec<BusinessElement>>, ApiError> {
    Ok(Json(state.rules.list_elements().await?))
}

pub async fn create_element(
    State(state): State<AppState>,
    Json(request): Json<ElementRequest>,
) -> Result<(StatusCode, Json<BusinessElement>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Element name is required"));
    }
    if state.rules.find_element_by_name(name).await?.is_some() {
        return Err(ApiError::bad_request(
            "An element with this name already exists",
        ));
    }

    let element = state
        .rules
        .create_element(name, request.description.as_deref(), request.endpoint.as_deref())
        .await?;
    info!(element = %element.name, "Business element created");
    Ok((StatusCode::CREATED, Json(element)))
}

pub async fn update_element(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ElementRequest>,
) -> Result<Json<BusinessElement>, ApiError> {
    let element = state
        .rules
        .update_element(
            id,
            request.name.trim(),
            request.description.as_deref(),
            request.endpoint.as_deref(),
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Element not found"))?;
    Ok(Json(element))
}

/// Deleting an element cascades to its rules; every role loses access
pub async fn delete_element(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.rules.find_element(id).await?.is_none() {
        return Err(ApiError::not_found("Element not found"));
    }

    state.rules.delete_element(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- access rules ----

pub async fn list_rules(
    State(state): State<AppState>,
    Query(filter): Query<RuleFilter>,
) -> Result<Json<Vec<AccessRuleDetail>>, ApiError> {
    Ok(Json(
        state
            .rules
            .list_rules(filter.role_id, filter.element_id)
            .await?,
    ))
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(request): Json<RuleRequest>,
) -> Result<(StatusCode, Json<AccessRule>), ApiError> {
    if state.rules.find_role(request.role_id).await?.is_none() {
        return Err(ApiError::not_found("Role not found"));
    }
    if state.rules.find_element(request.element_id).await?.is_none() {
        return Err(ApiError::not_found("Element not found"));
    }

    // A duplicate (role, element) pair surfaces as a validation error
    let rule = state
        .rules
        .create_rule(request.role_id, request.element_id, request.flags)
        .await?;
    info!(rule_id = rule.id, "Access rule created");
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<RuleFlagsRequest>,
) -> Result<Json<AccessRule>, ApiError> {
    let rule = state
        .rules
        .update_rule(id, request.flags)
        .await?
        .ok_or_else(|| ApiError::not_found("Rule not found"))?;
    Ok(Json(rule))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.rules.find_rule(id).await?.is_none() {
        return Err(ApiError::not_found("Rule not found"));
    }

    state.rules.delete_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/roles/{id}/rules - the matrix row for one role
pub async fn role_rules(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let role = state
        .rules
        .find_role(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;
    let rules = state.rules.list_rules(Some(id), None).await?;

    Ok(Json(json!({ "role": role, "rules": rules })))
}
