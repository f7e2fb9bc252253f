use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Row, postgres::PgRow};
use utoipa::ToSchema;

use crate::core_types::{Bv, MemberId};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    /// GST percentage added on top of the base price
    pub gst: Decimal,
    /// BV credited per unit purchased
    pub bv_credit: Bv,
    pub stock: i32,
    pub is_active: bool,
}

impl Product {
    /// Base price plus GST, per unit.
    pub fn unit_price(&self) -> Decimal {
        self.base_price * (Decimal::ONE_HUNDRED + self.gst) / Decimal::ONE_HUNDRED
    }
}

pub(crate) fn product_from_row(row: &PgRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        base_price: row.get("base_price"),
        gst: row.get("gst"),
        bv_credit: row.get("bv_credit"),
        stock: row.get("stock"),
        is_active: row.get("is_active"),
    }
}

/// Catalogue reads; purchase-path row locking stays in the service.
pub struct ProductRepository;

impl ProductRepository {
    pub async fn load_active(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT id, name, description, base_price, gst, bv_credit, stock, is_active
               FROM products WHERE is_active ORDER BY id"#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(product_from_row).collect())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub member_id: MemberId,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub bv_earned: Bv,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn order_from_row(row: &PgRow) -> Order {
    Order {
        id: row.get("id"),
        member_id: row.get("member_id"),
        product_id: row.get("product_id"),
        quantity: row.get("quantity"),
        unit_price: row.get("unit_price"),
        total_price: row.get("total_price"),
        bv_earned: row.get("bv_earned"),
        status: row.get("status"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_price_includes_gst() {
        let product = Product {
            id: 1,
            name: "Wellness Pack".to_string(),
            description: None,
            base_price: Decimal::new(1000, 0),
            gst: Decimal::new(18, 0),
            bv_credit: 50,
            stock: 10,
            is_active: true,
        };
        assert_eq!(product.unit_price(), Decimal::new(1180, 0));
    }
}
