//! Monthly pratica persistence.

use chrono::{DateTime, Utc};
use pratica_core::invoicing::{
    InsertOutcome, MonthlyPratica, NewPratica, PraticaFilter, PraticaRepository, PraticaStatus,
    RemoteAggregateRef, RepositoryError,
};
use pratica_shared::types::{MonthlyPraticaId, YearMonth};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use super::store::{SeaOrmInvoicingStore, corrupt, db_err, is_unique_violation, to_utc};
use crate::entities::monthly_praticas;

impl SeaOrmInvoicingStore {
    async fn pratica_model(
        &self,
        id: MonthlyPraticaId,
    ) -> Result<monthly_praticas::Model, RepositoryError> {
        monthly_praticas::Entity::find_by_id(id.into_inner())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| RepositoryError::NotFound(format!("monthly pratica {id}")))
    }
}

impl PraticaRepository for SeaOrmInvoicingStore {
    async fn find_pratica(
        &self,
        year_month: YearMonth,
    ) -> Result<Option<MonthlyPratica>, RepositoryError> {
        monthly_praticas::Entity::find()
            .filter(monthly_praticas::Column::YearMonth.eq(year_month.to_string()))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }

    async fn insert_pratica(
        &self,
        input: NewPratica,
    ) -> Result<InsertOutcome<MonthlyPratica>, RepositoryError> {
        let now = Utc::now();
        let active_model = monthly_praticas::ActiveModel {
            id: Set(MonthlyPraticaId::new().into_inner()),
            year_month: Set(input.year_month.to_string()),
            remote_id: Set(None),
            display_number: Set(None),
            period_code: Set(None),
            status: Set(PraticaStatus::Open.as_str().to_string()),
            total_amount: Set(Decimal::ZERO),
            booking_count: Set(0),
            metadata: Set(input.metadata),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            finalized_at: Set(None),
        };

        match active_model.insert(self.db.as_ref()).await {
            Ok(model) => Ok(InsertOutcome::Inserted(to_domain(model)?)),
            Err(err) if is_unique_violation(&err) => {
                tracing::debug!(year_month = %input.year_month, "Monthly pratica insert lost the race");
                Ok(InsertOutcome::Conflict)
            }
            Err(err) => Err(db_err(err)),
        }
    }

    async fn set_remote(
        &self,
        id: MonthlyPraticaId,
        remote: RemoteAggregateRef,
    ) -> Result<MonthlyPratica, RepositoryError> {
        let mut active: monthly_praticas::ActiveModel = self.pratica_model(id).await?.into();
        active.remote_id = Set(Some(remote.remote_id));
        active.display_number = Set(remote.display_number);
        active.period_code = Set(Some(remote.period_code));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(self.db.as_ref()).await.map_err(db_err)?;
        to_domain(updated)
    }

    async fn mark_finalized(
        &self,
        id: MonthlyPraticaId,
        at: DateTime<Utc>,
    ) -> Result<MonthlyPratica, RepositoryError> {
        let mut active: monthly_praticas::ActiveModel = self.pratica_model(id).await?.into();
        active.status = Set(PraticaStatus::Finalized.as_str().to_string());
        active.finalized_at = Set(Some(at.into()));
        active.updated_at = Set(at.into());

        let updated = active.update(self.db.as_ref()).await.map_err(db_err)?;
        to_domain(updated)
    }

    async fn update_totals(
        &self,
        id: MonthlyPraticaId,
        total_amount: Decimal,
        booking_count: i32,
    ) -> Result<(), RepositoryError> {
        let result = monthly_praticas::Entity::update_many()
            .col_expr(
                monthly_praticas::Column::TotalAmount,
                Expr::value(total_amount),
            )
            .col_expr(
                monthly_praticas::Column::BookingCount,
                Expr::value(booking_count),
            )
            .col_expr(monthly_praticas::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(monthly_praticas::Column::Id.eq(id.into_inner()))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound(format!("monthly pratica {id}")));
        }
        Ok(())
    }

    async fn list_praticas(
        &self,
        filter: PraticaFilter,
    ) -> Result<Vec<MonthlyPratica>, RepositoryError> {
        // YYYY-MM sorts lexicographically in period order.
        let mut query = monthly_praticas::Entity::find();
        if let Some(from) = filter.from {
            query = query.filter(monthly_praticas::Column::YearMonth.gte(from.to_string()));
        }
        if let Some(to) = filter.to {
            query = query.filter(monthly_praticas::Column::YearMonth.lte(to.to_string()));
        }
        if let Some(status) = filter.status {
            query = query.filter(monthly_praticas::Column::Status.eq(status.as_str()));
        }

        query
            .order_by_desc(monthly_praticas::Column::YearMonth)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}

/// Convert database model to domain model.
pub(crate) fn to_domain(model: monthly_praticas::Model) -> Result<MonthlyPratica, RepositoryError> {
    let year_month: YearMonth = model
        .year_month
        .parse()
        .map_err(|_| corrupt("monthly_praticas", "year_month", &model.year_month))?;
    let status = PraticaStatus::parse(&model.status)
        .ok_or_else(|| corrupt("monthly_praticas", "status", &model.status))?;

    Ok(MonthlyPratica {
        id: MonthlyPraticaId::from_uuid(model.id),
        year_month,
        remote_id: model.remote_id,
        display_number: model.display_number,
        period_code: model.period_code,
        status,
        total_amount: model.total_amount,
        booking_count: model.booking_count,
        metadata: model.metadata,
        created_at: to_utc(model.created_at),
        updated_at: to_utc(model.updated_at),
        finalized_at: model.finalized_at.map(to_utc),
    })
}
