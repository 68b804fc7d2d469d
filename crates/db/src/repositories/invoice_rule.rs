//! Invoice rule reads.

use pratica_core::invoicing::{InvoiceRuleRepository, RepositoryError};
use pratica_core::period::{DateBasis, InvoiceRule};
use pratica_shared::types::InvoiceRuleId;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::store::{SeaOrmInvoicingStore, corrupt, db_err, to_utc};
use crate::entities::invoice_rules;

impl InvoiceRuleRepository for SeaOrmInvoicingStore {
    async fn active_rules(&self) -> Result<Vec<InvoiceRule>, RepositoryError> {
        invoice_rules::Entity::find()
            .filter(invoice_rules::Column::Active.eq(true))
            .order_by_asc(invoice_rules::Column::CreatedAt)
            .order_by_asc(invoice_rules::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}

/// Convert database model to domain model.
pub(crate) fn to_domain(model: invoice_rules::Model) -> Result<InvoiceRule, RepositoryError> {
    let date_basis = DateBasis::parse(&model.date_basis)
        .ok_or_else(|| corrupt("invoice_rules", "date_basis", &model.date_basis))?;
    let seller_names: Vec<String> = serde_json::from_value(model.seller_names)
        .map_err(|e| corrupt("invoice_rules", "seller_names", e))?;

    Ok(InvoiceRule {
        id: InvoiceRuleId::from_uuid(model.id),
        name: model.name,
        active: model.active,
        seller_names,
        date_basis,
        start_date: model.start_date,
        created_at: to_utc(model.created_at),
    })
}
