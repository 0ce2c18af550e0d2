//! Demo dataset: roles, business elements, the rule matrix, and accounts
//!
//! Seeding is idempotent; existing rows are left untouched so it is safe to
//! run on every startup.

use crate::models::RuleFlags;
use crate::password::hash_password;
use crate::store::{NewUser, RuleStore, UserStore};
use sqlx::SqlitePool;
use tracing::info;
use warden_core::WardenResult;

const ROLES: &[(&str, &str)] = &[
    ("admin", "Full access to every element"),
    ("manager", "Catalog management and order oversight"),
    ("user", "Regular customer"),
    ("guest", "Catalog browsing only"),
];

const ELEMENTS: &[(&str, &str, &str)] = &[
    ("users", "User accounts", "/api/users"),
    ("products", "Product catalog", "/api/products"),
    ("orders", "Customer orders", "/api/orders"),
    ("stores", "Store fronts", "/api/stores"),
];

/// Demo accounts; passwords match the role name with a `123` suffix
const ACCOUNTS: &[(&str, &str, &str, &str, &str)] = &[
    ("admin@example.com", "Ada", "Admin", "admin123", "admin"),
    ("manager@example.com", "Max", "Manager", "manager123", "manager"),
    ("user@example.com", "Uma", "User", "user123", "user"),
    ("guest@example.com", "Glen", "Guest", "guest123", "guest"),
];

struct SeedRule {
    role: &'static str,
    element: &'static str,
    flags: RuleFlags,
}

fn full_access() -> RuleFlags {
    RuleFlags {
        read: false,
        read_all: true,
        create: true,
        update: false,
        update_all: true,
        delete: false,
        delete_all: true,
    }
}

fn read_all_only() -> RuleFlags {
    RuleFlags {
        read: false,
        read_all: true,
        create: false,
        update: false,
        update_all: false,
        delete: false,
        delete_all: false,
    }
}

fn matrix() -> Vec<SeedRule> {
    let rule = |role, element, flags| SeedRule {
        role,
        element,
        flags,
    };

    vec![
        rule("admin", "users", full_access()),
        rule("admin", "products", full_access()),
        rule("admin", "orders", full_access()),
        rule("admin", "stores", full_access()),
        rule("manager", "users", read_all_only()),
        rule("manager", "products", full_access()),
        rule(
            "manager",
            "orders",
            RuleFlags {
                read: false,
                read_all: true,
                create: true,
                update: true,
                update_all: false,
                delete: false,
                delete_all: false,
            },
        ),
        rule("manager", "stores", read_all_only()),
        rule(
            "user",
            "users",
            RuleFlags {
                read: true,
                read_all: false,
                create: false,
                update: true,
                update_all: false,
                delete: false,
                delete_all: false,
            },
        ),
        rule("user", "products", read_all_only()),
        rule(
            "user",
            "orders",
            RuleFlags {
                read: true,
                read_all: false,
                create: true,
                update: true,
                update_all: false,
                delete: true,
                delete_all: false,
            },
        ),
        rule("guest", "products", read_all_only()),
    ]
}

/// Seed the demo roles, elements, rule matrix, and accounts
pub async fn seed_demo_data(pool: &SqlitePool) -> WardenResult<()> {
    let rules = RuleStore::new(pool.clone());
    let users = UserStore::new(pool.clone());

    for (name, description) in ROLES {
        if rules.find_role_by_name(name).await?.is_none() {
            rules.create_role(name, Some(description)).await?;
            info!(role = name, "Seeded role");
        }
    }

    for (name, description, endpoint) in ELEMENTS {
        if rules.find_element_by_name(name).await?.is_none() {
            rules
                .create_element(name, Some(description), Some(endpoint))
                .await?;
            info!(element = name, "Seeded business element");
        }
    }

    for seed in matrix() {
        let role = rules
            .find_role_by_name(seed.role)
            .await?
            .ok_or_else(|| warden_core::not_found_error!(seed.role, "seed"))?;
        let element = rules
            .find_element_by_name(seed.element)
            .await?
            .ok_or_else(|| warden_core::not_found_error!(seed.element, "seed"))?;

        if rules.find_rule_for(role.id, element.id).await?.is_none() {
            rules.create_rule(role.id, element.id, seed.flags).await?;
        }
    }

    for (email, first_name, last_name, password, role_name) in ACCOUNTS {
        if users.find_by_email(email).await?.is_some() {
            continue;
        }
        let role = rules
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| warden_core::not_found_error!(role_name, "seed"))?;

        users
            .create(NewUser {
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                middle_name: None,
                password_hash: hash_password(password)?,
                role_id: role.id,
            })
            .await?;
        info!(email = email, "Seeded demo account");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Action, PermissionEngine};
    use crate::store;

    #[tokio::test]
    async fn seeding_twice_creates_nothing_extra() {
        let pool = store::connect_memory().await.unwrap();
        seed_demo_data(&pool).await.unwrap();
        seed_demo_data(&pool).await.unwrap();

        let rules = RuleStore::new(pool.clone());
        assert_eq!(rules.list_roles().await.unwrap().len(), 4);
        assert_eq!(rules.list_elements().await.unwrap().len(), 4);
        assert_eq!(rules.list_rules(None, None).await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn seeded_matrix_matches_the_reference_policy() {
        let pool = store::connect_memory().await.unwrap();
        seed_demo_data(&pool).await.unwrap();

        let users = UserStore::new(pool.clone());
        let engine = PermissionEngine::new(pool);

        let guest = users
            .find_by_email("guest@example.com")
            .await
            .unwrap()
            .unwrap();
        let regular = users
            .find_by_email("user@example.com")
            .await
            .unwrap()
            .unwrap();
        let admin = users
            .find_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();

        // Guests browse the catalog but touch nothing else
        assert!(engine
            .evaluate(&guest, "products", Action::Read, None)
            .await
            .allowed);
        assert!(!engine
            .evaluate(&guest, "orders", Action::Read, None)
            .await
            .allowed);

        // Regular users see only their own orders
        let orders = engine.evaluate(&regular, "orders", Action::Read, None).await;
        assert!(orders.allowed && orders.requires_ownership_filter);

        // Admins see everything unfiltered
        let all = engine.evaluate(&admin, "orders", Action::Read, None).await;
        assert!(all.allowed && !all.requires_ownership_filter);
    }

    #[tokio::test]
    async fn seeded_passwords_verify() {
        let pool = store::connect_memory().await.unwrap();
        seed_demo_data(&pool).await.unwrap();

        let users = UserStore::new(pool);
        let admin = users
            .find_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.verify_password("admin123"));
        assert!(!admin.verify_password("wrong"));
    }
}
