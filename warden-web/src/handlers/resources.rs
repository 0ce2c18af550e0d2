//! Business resource handlers: products and orders
//!
//! Collection routes trust the grant attached by the gating middleware.
//! Detail routes fetch the object first and then re-run the permission
//! engine with the object's owner, so ownership-scoped grants are enforced
//! against the real row.

use super::ApiError;
use crate::business::{Order, Product};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use warden_auth::{AccessGrant, Action};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Re-run the engine against a concrete object's owner
async fn authorize_object(
    state: &AppState,
    grant: &AccessGrant,
    element: &str,
    action: Action,
    owner_id: i64,
) -> Result<(), ApiError> {
    let decision = state
        .gate
        .engine()
        .evaluate(&grant.user, element, action, Some(owner_id))
        .await;

    if decision.allowed {
        Ok(())
    } else {
        Err(ApiError::forbidden(decision.reason.detail()))
    }
}

// ---- products ----

pub async fn list_products(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
) -> Result<Json<Value>, ApiError> {
    let owner_filter = grant.requires_ownership_filter.then_some(grant.user.id);
    let products = state.products.list(owner_filter).await?;

    Ok(Json(json!({ "count": products.len(), "results": products })))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("Product name is required"));
    }
    if request.price < 0.0 {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }

    let product = state
        .products
        .create(request.name.trim(), request.price, grant.user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .products
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    authorize_object(&state, &grant, "products", Action::Read, product.owner_id).await?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .products
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    authorize_object(&state, &grant, "products", Action::Update, product.owner_id).await?;

    let updated = state
        .products
        .update(id, request.name, request.price)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(updated))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let product = state
        .products
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    authorize_object(&state, &grant, "products", Action::Delete, product.owner_id).await?;

    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- orders ----

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
) -> Result<Json<Value>, ApiError> {
    let owner_filter = grant.requires_ownership_filter.then_some(grant.user.id);
    let orders = state.orders.list(owner_filter).await?;

    Ok(Json(json!({ "count": orders.len(), "results": orders })))
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    if request.quantity < 1 {
        return Err(ApiError::bad_request("Quantity must be at least 1"));
    }
    if state.products.find(request.product_id).await?.is_none() {
        return Err(ApiError::bad_request("Unknown product"));
    }

    let order = state
        .orders
        .create(request.product_id, request.quantity, grant.user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    authorize_object(&state, &grant, "orders", Action::Read, order.owner_id).await?;
    Ok(Json(order))
}

pub async fn update_order(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    authorize_object(&state, &grant, "orders", Action::Update, order.owner_id).await?;

    let updated = state
        .orders
        .update(id, request.status, request.quantity)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(Json(updated))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Extension(grant): Extension<AccessGrant>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let order = state
        .orders
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    authorize_object(&state, &grant, "orders", Action::Delete, order.owner_id).await?;

    state.orders.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
