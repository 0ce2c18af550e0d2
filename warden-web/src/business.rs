//! Mock business resources gated by the permission matrix
//!
//! Products and orders exist to exercise the decision core; they carry an
//! `owner_id` so ownership-scoped grants have something to bite on.

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use warden_core::{storage_error, WardenResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub status: String,
    pub owner_id: i64,
}

/// Create the business tables if they do not exist
pub async fn init_business_schema(pool: &SqlitePool) -> WardenResult<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            owner_id INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            status TEXT NOT NULL,
            owner_id INTEGER NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to create schema: {}", e), "business"))?;
    }

    Ok(())
}

/// Seed the demo catalog and orders; a no-op when rows already exist
///
/// Owner ids match the seeded demo accounts (1 admin, 2 manager, 3 user,
/// 4 guest).
pub async fn seed_business_data(pool: &SqlitePool) -> WardenResult<()> {
    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM products")
        .fetch_one(pool)
        .await
        .and_then(|row| row.try_get("n"))
        .map_err(|e| storage_error!(format!("Failed to count products: {}", e), "business"))?;
    if count > 0 {
        return Ok(());
    }

    let products: [(&str, f64, i64); 5] = [
        ("Laptop", 50000.0, 2),
        ("Phone", 30000.0, 2),
        ("Tablet", 25000.0, 3),
        ("Headphones", 5000.0, 3),
        ("Keyboard", 3000.0, 1),
    ];
    for (name, price, owner_id) in products {
        sqlx::query("INSERT INTO products (name, price, owner_id) VALUES (?, ?, ?)")
            .bind(name)
            .bind(price)
            .bind(owner_id)
            .execute(pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to seed product: {}", e), "business"))?;
    }

    let orders: [(i64, i64, &str, i64); 4] = [
        (1, 1, "pending", 3),
        (2, 2, "completed", 3),
        (3, 1, "cancelled", 4),
        (4, 3, "pending", 4),
    ];
    for (product_id, quantity, status, owner_id) in orders {
        sqlx::query("INSERT INTO orders (product_id, quantity, status, owner_id) VALUES (?, ?, ?, ?)")
            .bind(product_id)
            .bind(quantity)
            .bind(status)
            .bind(owner_id)
            .execute(pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to seed order: {}", e), "business"))?;
    }

    Ok(())
}

/// SQLite-backed product catalog
#[derive(Debug, Clone)]
pub struct ProductStore {
    pool: SqlitePool,
}

impl ProductStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List products, optionally restricted to one owner
    pub async fn list(&self, owner_id: Option<i64>) -> WardenResult<Vec<Product>> {
        let rows = match owner_id {
            Some(owner_id) => {
                sqlx::query("SELECT * FROM products WHERE owner_id = ? ORDER BY id")
                    .bind(owner_id)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM products ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| storage_error!(format!("Failed to list products: {}", e), "business"))?;

        rows.iter().map(product_from_row).collect()
    }

    pub async fn find(&self, id: i64) -> WardenResult<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to fetch product: {}", e), "business"))?;

        row.as_ref().map(product_from_row).transpose()
    }

    pub async fn create(&self, name: &str, price: f64, owner_id: i64) -> WardenResult<Product> {
        let result = sqlx::query("INSERT INTO products (name, price, owner_id) VALUES (?, ?, ?)")
            .bind(name)
            .bind(price)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to create product: {}", e), "business"))?;

        self.find(result.last_insert_rowid())
            .await?
            .ok_or_else(|| storage_error!("Product vanished after insert", "business"))
    }

    pub async fn update(
        &self,
        id: i64,
        name: Option<String>,
        price: Option<f64>,
    ) -> WardenResult<Option<Product>> {
        let Some(current) = self.find(id).await? else {
            return Ok(None);
        };

        sqlx::query("UPDATE products SET name = ?, price = ? WHERE id = ?")
            .bind(name.unwrap_or(current.name))
            .bind(price.unwrap_or(current.price))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to update product: {}", e), "business"))?;

        self.find(id).await
    }

    pub async fn delete(&self, id: i64) -> WardenResult<()> {
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to delete product: {}", e), "business"))?;
        Ok(())
    }
}

/// SQLite-backed order book
#[derive(Debug, Clone)]
pub struct OrderStore {
    pool: SqlitePool,
}

impl OrderStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, owner_id: Option<i64>) -> WardenResult<Vec<Order>> {
        let rows = match owner_id {
            Some(owner_id) => {
                sqlx::query("SELECT * FROM orders WHERE owner_id = ? ORDER BY id")
                    .bind(owner_id)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM orders ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| storage_error!(format!("Failed to list orders: {}", e), "business"))?;

        rows.iter().map(order_from_row).collect()
    }

    pub async fn find(&self, id: i64) -> WardenResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to fetch order: {}", e), "business"))?;

        row.as_ref().map(order_from_row).transpose()
    }

    /// New orders always start out pending and belong to their creator
    pub async fn create(
        &self,
        product_id: i64,
        quantity: i64,
        owner_id: i64,
    ) -> WardenResult<Order> {
        let result =
            sqlx::query("INSERT INTO orders (product_id, quantity, status, owner_id) VALUES (?, ?, 'pending', ?)")
                .bind(product_id)
                .bind(quantity)
                .bind(owner_id)
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error!(format!("Failed to create order: {}", e), "business"))?;

        self.find(result.last_insert_rowid())
            .await?
            .ok_or_else(|| storage_error!("Order vanished after insert", "business"))
    }

    pub async fn update(
        &self,
        id: i64,
        status: Option<String>,
        quantity: Option<i64>,
    ) -> WardenResult<Option<Order>> {
        let Some(current) = self.find(id).await? else {
            return Ok(None);
        };

        sqlx::query("UPDATE orders SET status = ?, quantity = ? WHERE id = ?")
            .bind(status.unwrap_or(current.status))
            .bind(quantity.unwrap_or(current.quantity))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to update order: {}", e), "business"))?;

        self.find(id).await
    }

    pub async fn delete(&self, id: i64) -> WardenResult<()> {
        sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error!(format!("Failed to delete order: {}", e), "business"))?;
        Ok(())
    }
}

fn product_from_row(row: &SqliteRow) -> WardenResult<Product> {
    Ok(Product {
        id: row
            .try_get("id")
            .map_err(|e| storage_error!(format!("Missing id: {}", e), "business"))?,
        name: row
            .try_get("name")
            .map_err(|e| storage_error!(format!("Missing name: {}", e), "business"))?,
        price: row
            .try_get("price")
            .map_err(|e| storage_error!(format!("Missing price: {}", e), "business"))?,
        owner_id: row
            .try_get("owner_id")
            .map_err(|e| storage_error!(format!("Missing owner_id: {}", e), "business"))?,
    })
}

fn order_from_row(row: &SqliteRow) -> WardenResult<Order> {
    Ok(Order {
        id: row
            .try_get("id")
            .map_err(|e| storage_error!(format!("Missing id: {}", e), "business"))?,
        product_id: row
            .try_get("product_id")
            .map_err(|e| storage_error!(format!("Missing product_id: {}", e), "business"))?,
        quantity: row
            .try_get("quantity")
            .map_err(|e| storage_error!(format!("Missing quantity: {}", e), "business"))?,
        status: row
            .try_get("status")
            .map_err(|e| storage_error!(format!("Missing status: {}", e), "business"))?,
        owner_id: row
            .try_get("owner_id")
            .map_err(|e| storage_error!(format!("Missing owner_id: {}", e), "business"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_auth::store::connect_memory;

    #[tokio::test]
    async fn ownership_filter_narrows_listings() {
        let pool = connect_memory().await.unwrap();
        init_business_schema(&pool).await.unwrap();
        seed_business_data(&pool).await.unwrap();

        let products = ProductStore::new(pool);
        assert_eq!(products.list(None).await.unwrap().len(), 5);

        let owned = products.list(Some(3)).await.unwrap();
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|p| p.owner_id == 3));
    }

    #[tokio::test]
    async fn seeding_twice_keeps_the_catalog_stable() {
        let pool = connect_memory().await.unwrap();
        init_business_schema(&pool).await.unwrap();
        seed_business_data(&pool).await.unwrap();
        seed_business_data(&pool).await.unwrap();

        let products = ProductStore::new(pool.clone());
        assert_eq!(products.list(None).await.unwrap().len(), 5);
        let orders = OrderStore::new(pool);
        assert_eq!(orders.list(None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn partial_update_keeps_unspecified_fields() {
        let pool = connect_memory().await.unwrap();
        init_business_schema(&pool).await.unwrap();

        let orders = OrderStore::new(pool);
        let order = orders.create(1, 2, 7).await.unwrap();
        assert_eq!(order.status, "pending");

        let updated = orders
            .update(order.id, Some("completed".to_string()), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "completed");
        assert_eq!(updated.quantity, 2);
    }
}
