//! `SeaORM` Entity for the bookings mirror table.
//!
//! Rows are written by webhook ingestion; invoicing only reads them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub booking_id: i64,
    pub confirmation_code: String,
    /// Creation timestamp exactly as the booking source sent it.
    pub booked_at_raw: String,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub total_amount: Decimal,
    pub currency: Option<String>,
    pub seller: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub customer: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub activities: Json,
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
