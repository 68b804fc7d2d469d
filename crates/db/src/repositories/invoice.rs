//! Invoice and line item persistence.

use chrono::{DateTime, NaiveTime, Utc};
use pratica_core::invoicing::{
    InsertOutcome, Invoice, InvoiceFilter, InvoiceLineItem, InvoiceRepository, InvoiceStatus,
    InvoiceType, NewInvoice, NewLineItem, RepositoryError,
};
use pratica_shared::types::{InvoiceId, LineItemId, MonthlyPraticaId};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::store::{SeaOrmInvoicingStore, corrupt, db_err, is_unique_violation, to_utc};
use crate::entities::{invoice_line_items, invoices};

impl SeaOrmInvoicingStore {
    async fn invoice_model(&self, id: InvoiceId) -> Result<invoices::Model, RepositoryError> {
        invoices::Entity::find_by_id(id.into_inner())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| RepositoryError::NotFound(format!("invoice {id}")))
    }
}

impl InvoiceRepository for SeaOrmInvoicingStore {
    async fn find_invoice(
        &self,
        booking_id: i64,
        invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>, RepositoryError> {
        invoices::Entity::find()
            .filter(invoices::Column::BookingId.eq(booking_id))
            .filter(invoices::Column::InvoiceType.eq(invoice_type.as_str()))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }

    async fn find_invoice_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        invoices::Entity::find_by_id(id.into_inner())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }

    async fn insert_invoice(
        &self,
        input: NewInvoice,
    ) -> Result<InsertOutcome<Invoice>, RepositoryError> {
        let now = Utc::now();
        let booking_id = input.booking_id;
        let active_model = invoices::ActiveModel {
            id: Set(InvoiceId::new().into_inner()),
            pratica_id: Set(Some(input.pratica_id.into_inner())),
            booking_id: Set(input.booking_id),
            invoice_type: Set(input.invoice_type.as_str().to_string()),
            confirmation_code: Set(input.confirmation_code),
            status: Set(InvoiceStatus::Pending.as_str().to_string()),
            total_amount: Set(input.total_amount),
            currency: Set(input.currency),
            customer_name: Set(input.customer_name),
            customer_email: Set(input.customer_email),
            seller_name: Set(input.seller_name),
            booking_created_on: Set(input.booking_created_on),
            error_message: Set(None),
            retry_count: Set(input.retry_count),
            triggered_by: Set(input.triggered_by),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            sent_at: Set(None),
        };

        match active_model.insert(self.db.as_ref()).await {
            Ok(model) => Ok(InsertOutcome::Inserted(to_domain(model)?)),
            Err(err) if is_unique_violation(&err) => {
                tracing::debug!(booking_id, "Invoice insert lost the race");
                Ok(InsertOutcome::Conflict)
            }
            Err(err) => Err(db_err(err)),
        }
    }

    async fn mark_sent(&self, id: InvoiceId, at: DateTime<Utc>) -> Result<Invoice, RepositoryError> {
        let mut active: invoices::ActiveModel = self.invoice_model(id).await?.into();
        active.status = Set(InvoiceStatus::Sent.as_str().to_string());
        active.error_message = Set(None);
        active.sent_at = Set(Some(at.into()));
        active.updated_at = Set(at.into());

        let updated = active.update(self.db.as_ref()).await.map_err(db_err)?;
        to_domain(updated)
    }

    async fn mark_failed(
        &self,
        id: InvoiceId,
        error_message: String,
    ) -> Result<Invoice, RepositoryError> {
        let mut active: invoices::ActiveModel = self.invoice_model(id).await?.into();
        active.status = Set(InvoiceStatus::Failed.as_str().to_string());
        active.error_message = Set(Some(error_message));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(self.db.as_ref()).await.map_err(db_err)?;
        to_domain(updated)
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool, RepositoryError> {
        // Line items go with the invoice through ON DELETE CASCADE.
        let result = invoices::Entity::delete_by_id(id.into_inner())
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn insert_line_item(&self, input: NewLineItem) -> Result<InvoiceLineItem, RepositoryError> {
        let active_model = invoice_line_items::ActiveModel {
            id: Set(LineItemId::new().into_inner()),
            invoice_id: Set(input.invoice_id.into_inner()),
            activity_id: Set(input.activity_id),
            remote_service_id: Set(input.remote_service_id),
            remote_pricing_line_id: Set(input.remote_pricing_line_id),
            remote_payment_id: Set(input.remote_payment_id),
            product_title: Set(input.product_title),
            quantity: Set(input.quantity),
            unit_price: Set(input.unit_price),
            total_price: Set(input.total_price),
            service_date: Set(input.service_date),
            participant_count: Set(input.participant_count),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model.insert(self.db.as_ref()).await.map_err(db_err)?;
        Ok(line_item_to_domain(model))
    }

    async fn line_items(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceLineItem>, RepositoryError> {
        let models = invoice_line_items::Entity::find()
            .filter(invoice_line_items::Column::InvoiceId.eq(invoice_id.into_inner()))
            .order_by_asc(invoice_line_items::Column::CreatedAt)
            .order_by_asc(invoice_line_items::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(line_item_to_domain).collect())
    }

    async fn sent_totals(
        &self,
        pratica_id: MonthlyPraticaId,
    ) -> Result<(Decimal, i64), RepositoryError> {
        let row: Option<(i64, Option<Decimal>)> = invoices::Entity::find()
            .select_only()
            .column_as(Expr::col(invoices::Column::Id).count(), "count")
            .column_as(Expr::col(invoices::Column::TotalAmount).sum(), "total")
            .filter(invoices::Column::PraticaId.eq(pratica_id.into_inner()))
            .filter(invoices::Column::Status.eq(InvoiceStatus::Sent.as_str()))
            .into_tuple()
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?;

        // SUM over no rows is NULL.
        let (count, total) = row.unwrap_or((0, None));
        Ok((total.unwrap_or(Decimal::ZERO), count))
    }

    async fn list_failed(&self, max_retries: i32) -> Result<Vec<Invoice>, RepositoryError> {
        invoices::Entity::find()
            .filter(invoices::Column::Status.eq(InvoiceStatus::Failed.as_str()))
            .filter(invoices::Column::RetryCount.lt(max_retries))
            .order_by_asc(invoices::Column::CreatedAt)
            .order_by_asc(invoices::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn list_invoices(&self, filter: InvoiceFilter) -> Result<Vec<Invoice>, RepositoryError> {
        let mut query = invoices::Entity::find();

        if let Some(from) = filter.from {
            let start = from.and_time(NaiveTime::MIN).and_utc();
            query = query.filter(invoices::Column::CreatedAt.gte(start));
        }
        if let Some(to) = filter.to.and_then(|to| to.succ_opt()) {
            // Inclusive upper bound: everything before the next midnight.
            let end = to.and_time(NaiveTime::MIN).and_utc();
            query = query.filter(invoices::Column::CreatedAt.lt(end));
        }
        if let Some(status) = filter.status {
            query = query.filter(invoices::Column::Status.eq(status.as_str()));
        }
        if let Some(seller) = filter.seller.as_deref() {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(invoices::Column::SellerName)))
                    .eq(seller.trim().to_lowercase()),
            );
        }
        if let Some(code) = filter.confirmation_code {
            query = query.filter(invoices::Column::ConfirmationCode.eq(code));
        }

        query
            .order_by_desc(invoices::Column::CreatedAt)
            .order_by_desc(invoices::Column::Id)
            .offset(filter.page.offset())
            .limit(filter.page.limit())
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn invoices_for_booking(&self, booking_id: i64) -> Result<Vec<Invoice>, RepositoryError> {
        invoices::Entity::find()
            .filter(invoices::Column::BookingId.eq(booking_id))
            .order_by_asc(invoices::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}

/// Convert database model to domain model.
pub(crate) fn to_domain(model: invoices::Model) -> Result<Invoice, RepositoryError> {
    let invoice_type = InvoiceType::parse(&model.invoice_type)
        .ok_or_else(|| corrupt("invoices", "invoice_type", &model.invoice_type))?;
    let status = InvoiceStatus::parse(&model.status)
        .ok_or_else(|| corrupt("invoices", "status", &model.status))?;

    Ok(Invoice {
        id: InvoiceId::from_uuid(model.id),
        pratica_id: model.pratica_id.map(MonthlyPraticaId::from_uuid),
        booking_id: model.booking_id,
        invoice_type,
        confirmation_code: model.confirmation_code,
        status,
        total_amount: model.total_amount,
        currency: model.currency,
        customer_name: model.customer_name,
        customer_email: model.customer_email,
        seller_name: model.seller_name,
        booking_created_on: model.booking_created_on,
        error_message: model.error_message,
        retry_count: model.retry_count,
        triggered_by: model.triggered_by,
        created_at: to_utc(model.created_at),
        updated_at: to_utc(model.updated_at),
        sent_at: model.sent_at.map(to_utc),
    })
}

fn line_item_to_domain(model: invoice_line_items::Model) -> InvoiceLineItem {
    InvoiceLineItem {
        id: LineItemId::from_uuid(model.id),
        invoice_id: InvoiceId::from_uuid(model.invoice_id),
        activity_id: model.activity_id,
        remote_service_id: model.remote_service_id,
        remote_pricing_line_id: model.remote_pricing_line_id,
        remote_payment_id: model.remote_payment_id,
        product_title: model.product_title,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
        service_date: model.service_date,
        participant_count: model.participant_count,
        created_at: to_utc(model.created_at),
    }
}
