//! Append-only invoice audit log.

use chrono::Utc;
use pratica_core::invoicing::{
    AuditEntityType, AuditLogEntry, AuditLogRepository, NewAuditEntry, RepositoryError,
};
use pratica_shared::types::AuditLogId;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use super::store::{SeaOrmInvoicingStore, corrupt, db_err, to_utc};
use crate::entities::invoice_audit_log;

impl AuditLogRepository for SeaOrmInvoicingStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, RepositoryError> {
        let active_model = invoice_audit_log::ActiveModel {
            id: Set(AuditLogId::new().into_inner()),
            entity_type: Set(entry.entity_type.as_str().to_string()),
            entity_id: Set(entry.entity_id),
            action: Set(entry.action.to_string()),
            old_status: Set(entry.old_status),
            new_status: Set(entry.new_status),
            details: Set(entry.details),
            actor: Set(entry.actor),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model.insert(self.db.as_ref()).await.map_err(db_err)?;
        to_domain(model)
    }

    async fn entries_for(
        &self,
        entity_type: AuditEntityType,
        entity_id: Uuid,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        invoice_audit_log::Entity::find()
            .filter(invoice_audit_log::Column::EntityType.eq(entity_type.as_str()))
            .filter(invoice_audit_log::Column::EntityId.eq(entity_id))
            .order_by_asc(invoice_audit_log::Column::CreatedAt)
            .order_by_asc(invoice_audit_log::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}

fn to_domain(model: invoice_audit_log::Model) -> Result<AuditLogEntry, RepositoryError> {
    let entity_type = AuditEntityType::parse(&model.entity_type)
        .ok_or_else(|| corrupt("invoice_audit_log", "entity_type", &model.entity_type))?;

    Ok(AuditLogEntry {
        id: AuditLogId::from_uuid(model.id),
        entity_type,
        entity_id: model.entity_id,
        action: model.action,
        old_status: model.old_status,
        new_status: model.new_status,
        details: model.details,
        actor: model.actor,
        created_at: to_utc(model.created_at),
    })
}
