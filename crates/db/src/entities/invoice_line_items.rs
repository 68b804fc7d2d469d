//! `SeaORM` Entity for invoice_line_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub activity_id: i64,
    pub remote_service_id: String,
    pub remote_pricing_line_id: String,
    pub remote_payment_id: String,
    #[sea_orm(column_type = "Text")]
    pub product_title: String,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub total_price: Decimal,
    pub service_date: Option<Date>,
    pub participant_count: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id",
        on_delete = "Cascade"
    )]
    Invoices,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
