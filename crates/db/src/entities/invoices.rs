//! `SeaORM` Entity for invoices table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub pratica_id: Option<Uuid>,
    pub booking_id: i64,
    pub invoice_type: String,
    pub confirmation_code: String,
    pub status: String,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub total_amount: Decimal,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub seller_name: Option<String>,
    pub booking_created_on: Option<Date>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub triggered_by: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub sent_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::monthly_praticas::Entity",
        from = "Column::PraticaId",
        to = "super::monthly_praticas::Column::Id"
    )]
    MonthlyPraticas,
    #[sea_orm(has_many = "super::invoice_line_items::Entity")]
    InvoiceLineItems,
}

impl Related<super::monthly_praticas::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonthlyPraticas.def()
    }
}

impl Related<super::invoice_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceLineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
