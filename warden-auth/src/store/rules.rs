//! Role, business-element, and access-rule store (the permission matrix)

use super::parse_timestamp;
use crate::models::{AccessRule, AccessRuleDetail, BusinessElement, Role, RuleFlags};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use warden_core::{storage_error, validation_error, WardenResult};

/// SQLite-backed store for the role x element permission matrix
#[derive(Debug, Clone)]
pub struct RuleStore {
    pool: SqlitePool,
}

impl RuleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ---- roles ----

    pub async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> WardenResult<Role> {
        let result = sqlx::query("INSERT INTO roles (name, description, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(description)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to create role: {}", e), "rule_store"))?;

        self.find_role(result.last_insert_rowid()).await?.ok_or_else(|| {
            storage_error!("Role vanished after insert", "rule_store")
        })
    }

    pub async fn list_roles(&self) -> WardenResult<Vec<Role>> {
        let rows = sqlx::query("SELECT * FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to list roles: {}", e), "rule_store"))?;

        rows.iter().map(role_from_row).collect()
    }

    pub async fn find_role(&self, id: i64) -> WardenResult<Option<Role>> {
        let row = sqlx::query("SELECT * FROM roles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to fetch role: {}", e), "rule_store"))?;

        row.as_ref().map(role_from_row).transpose()
    }

    pub async fn find_role_by_name(&self, name: &str) -> WardenResult<Option<Role>> {
        let row = sqlx::query("SELECT * FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to fetch role: {}", e), "rule_store"))?;

        row.as_ref().map(role_from_row).transpose()
    }

    pub async fn update_role(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> WardenResult<Option<Role>> {
        sqlx::query("UPDATE roles SET name = ?, description = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to update role: {}", e), "rule_store"))?;

        self.find_role(id).await
    }

    /// Delete a role; the caller must have verified no user references it
    pub async fn delete_role(&self, id: i64) -> WardenResult<()> {
        sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to delete role: {}", e), "rule_store"))?;
        Ok(())
    }

    // ---- business elements ----

    pub async fn create_element(
        &self,
        name: &str,
        description: Option<&str>,
        endpoint: Option<&str>,
    ) -> WardenResult<BusinessElement> {
        let result = sqlx::query(
            "INSERT INTO business_elements (name, description, endpoint, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(endpoint)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error!(format!("Failed to create element: {}", e), "rule_store"))?;

        self.find_element(result.last_insert_rowid())
            .await?
            .ok_or_else(|| storage_error!("Element vanished after insert", "rule_store"))
    }

    pub async fn list_elements(&self) -> WardenResult<Vec<BusinessElement>> {
        let rows = sqlx::query("SELECT * FROM business_elements ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to list elements: {}", e), "rule_store"))?;

        rows.iter().map(element_from_row).collect()
    }

    pub async fn find_element(&self, id: i64) -> WardenResult<Option<BusinessElement>> {
        let row = sqlx::query("SELECT * FROM business_elements WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to fetch element: {}", e), "rule_store"))?;

        row.as_ref().map(element_from_row).transpose()
    }

    pub async fn find_element_by_name(&self, name: &str) -> WardenResult<Option<BusinessElement>> {
        let row = sqlx::query("SELECT * FROM business_elements WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to fetch element: {}", e), "rule_store"))?;

        row.as_ref().map(element_from_row).transpose()
    }

    pub async fn update_element(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        endpoint: Option<&str>,
    ) -> WardenResult<Option<BusinessElement>> {
        sqlx::query("UPDATE business_elements SET name = ?, description = ?, endpoint = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(endpoint)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to update element: {}", e), "rule_store"))?;

        self.find_element(id).await
    }

    pub async fn delete_element(&self, id: i64) -> WardenResult<()> {
        sqlx::query("DELETE FROM business_elements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to delete element: {}", e), "rule_store"))?;
        Ok(())
    }

    // ---- access rules ----

    /// Insert a rule for a (role, element) pair; at most one rule may exist
    /// per pair
    pub async fn create_rule(
        &self,
        role_id: i64,
        element_id: i64,
        flags: RuleFlags,
    ) -> WardenResult<AccessRule> {
        if self.find_rule_for(role_id, element_id).await?.is_some() {
            return Err(validation_error!(
                "An access rule for this role and element already exists",
                "role_id",
                "rule_store"
            ));
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"INSERT INTO access_rules
               (role_id, element_id, "read", read_all, "create", "update", update_all,
                "delete", delete_all, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(role_id)
        .bind(element_id)
        .bind(flags.read as i64)
        .bind(flags.read_all as i64)
        .bind(flags.create as i64)
        .bind(flags.update as i64)
        .bind(flags.update_all as i64)
        .bind(flags.delete as i64)
        .bind(flags.delete_all as i64)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error!(format!("Failed to create access rule: {}", e), "rule_store"))?;

        self.find_rule(result.last_insert_rowid())
            .await?
            .ok_or_else(|| storage_error!("Access rule vanished after insert", "rule_store"))
    }

    pub async fn find_rule(&self, id: i64) -> WardenResult<Option<AccessRule>> {
        let row = sqlx::query("SELECT * FROM access_rules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to fetch rule: {}", e), "rule_store"))?;

        row.as_ref().map(rule_from_row).transpose()
    }

    /// The single rule for a (role, element) pair, if configured
    pub async fn find_rule_for(
        &self,
        role_id: i64,
        element_id: i64,
    ) -> WardenResult<Option<AccessRule>> {
        let row = sqlx::query("SELECT * FROM access_rules WHERE role_id = ? AND element_id = ?")
            .bind(role_id)
            .bind(element_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to fetch rule: {}", e), "rule_store"))?;

        row.as_ref().map(rule_from_row).transpose()
    }

    /// List rules joined with role/element names, optionally filtered
    pub async fn list_rules(
        &self,
        role_id: Option<i64>,
        element_id: Option<i64>,
    ) -> WardenResult<Vec<AccessRuleDetail>> {
        let mut sql = String::from(
            "SELECT ar.*, r.name AS role_name, e.name AS element_name \
             FROM access_rules ar \
             JOIN roles r ON r.id = ar.role_id \
             JOIN business_elements e ON e.id = ar.element_id WHERE 1 = 1",
        );
        if role_id.is_some() {
            sql.push_str(" AND ar.role_id = ?");
        }
        if element_id.is_some() {
            sql.push_str(" AND ar.element_id = ?");
        }
        sql.push_str(" ORDER BY r.name, e.name");

        let mut query = sqlx::query(&sql);
        if let Some(role_id) = role_id {
            query = query.bind(role_id);
        }
        if let Some(element_id) = element_id {
            query = query.bind(element_id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to list rules: {}", e), "rule_store"))?;

        rows.iter().map(rule_detail_from_row).collect()
    }

    /// Replace a rule's flags and return the fresh record
    pub async fn update_rule(&self, id: i64, flags: RuleFlags) -> WardenResult<Option<AccessRule>> {
        sqlx::query(
            r#"UPDATE access_rules SET "read" = ?, read_all = ?, "create" = ?, "update" = ?,
               update_all = ?, "delete" = ?, delete_all = ?, updated_at = ? WHERE id = ?"#,
        )
        .bind(flags.read as i64)
        .bind(flags.read_all as i64)
        .bind(flags.create as i64)
        .bind(flags.update as i64)
        .bind(flags.update_all as i64)
        .bind(flags.delete as i64)
        .bind(flags.delete_all as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error!(format!("Failed to update rule: {}", e), "rule_store"))?;

        self.find_rule(id).await
    }

    pub async fn delete_rule(&self, id: i64) -> WardenResult<()> {
        sqlx::query("DELETE FROM access_rules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to delete rule: {}", e), "rule_store"))?;
        Ok(())
    }
}

fn role_from_row(row: &SqliteRow) -> WardenResult<Role> {
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| storage_error!(format!("Missing created_at: {}", e), "rule_store"))?;

    Ok(Role {
        id: row
            .try_get("id")
            .map_err(|e| storage_error!(format!("Missing id: {}", e), "rule_store"))?,
        name: row
            .try_get("name")
            .map_err(|e| storage_error!(format!("Missing name: {}", e), "rule_store"))?,
        description: row.try_get("description").unwrap_or(None),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn element_from_row(row: &SqliteRow) -> WardenResult<BusinessElement> {
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| storage_error!(format!("Missing created_at: {}", e), "rule_store"))?;

    Ok(BusinessElement {
        id: row
            .try_get("id")
            .map_err(|e| storage_error!(format!("Missing id: {}", e), "rule_store"))?,
        name: row
            .try_get("name")
            .map_err(|e| storage_error!(format!("Missing name: {}", e), "rule_store"))?,
        description: row.try_get("description").unwrap_or(None),
        endpoint: row.try_get("endpoint").unwrap_or(None),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn flags_from_row(row: &SqliteRow) -> RuleFlags {
    let flag = |name: &str| row.try_get::<i64, _>(name).unwrap_or(0) != 0;
    RuleFlags {
        read: flag("read"),
        read_all: flag("read_all"),
        create: flag("create"),
        update: flag("update"),
        update_all: flag("update_all"),
        delete: flag("delete"),
        delete_all: flag("delete_all"),
    }
}

fn rule_from_row(row: &SqliteRow) -> WardenResult<AccessRule> {
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| storage_error!(format!("Missing created_at: {}", e), "rule_store"))?;
    let updated_at: String = row
        .try_get("updated_at")
        .map_err(|e| storage_error!(format!("Missing updated_at: {}", e), "rule_store"))?;

    Ok(AccessRule {
        id: row
            .try_get("id")
            .map_err(|e| storage_error!(format!("Missing id: {}", e), "rule_store"))?,
        role_id: row
            .try_get("role_id")
            .map_err(|e| storage_error!(format!("Missing role_id: {}", e), "rule_store"))?,
        element_id: row
            .try_get("element_id")
            .map_err(|e| storage_error!(format!("Missing element_id: {}", e), "rule_store"))?,
        flags: flags_from_row(row),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn rule_detail_from_row(row: &SqliteRow) -> WardenResult<AccessRuleDetail> {
    let rule = rule_from_row(row)?;

    Ok(AccessRuleDetail {
        id: rule.id,
        role_id: rule.role_id,
        role: row
            .try_get("role_name")
            .map_err(|e| storage_error!(format!("Missing role_name: {}", e), "rule_store"))?,
        element_id: rule.element_id,
        element: row
            .try_get("element_name")
            .map_err(|e| storage_error!(format!("Missing element_name: {}", e), "rule_store"))?,
        flags: rule.flags,
        created_at: rule.created_at,
        updated_at: rule.updated_at,
    })
}
