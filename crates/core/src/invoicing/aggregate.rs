//! Monthly aggregate manager.
//!
//! Owns the one-row-per-period invariant of monthly praticas. Within a process
//! a per-period async mutex serialises lookup, insert and remote creation;
//! across processes the unique `year_month` constraint decides the winner and
//! the loser re-reads the row.
//!
//! A second per-period gate keeps finalization out while attachments are in
//! flight: attachments hold it shared, `finalize` holds it exclusively.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use pratica_shared::AccountingProfile;
use pratica_shared::types::YearMonth;
use serde_json::json;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, RwLock};
use tracing::{info, warn};

use super::audit::{AuditEvent, actions};
use super::error::{InvoicingError, RepositoryError};
use super::repository::{InsertOutcome, InvoicingStore};
use super::types::{
    AuditEntityType, MonthlyPratica, NewPratica, PraticaStatus, RemoteAggregateRef,
};
use crate::accounting::{AccountingApi, NewAggregate, RemoteAggregateStatus};

/// Get-or-create, lazy repair and finalization of monthly praticas.
pub struct MonthlyAggregateManager<S: InvoicingStore, A: AccountingApi> {
    store: Arc<S>,
    api: Arc<A>,
    profile: AccountingProfile,
    locks: DashMap<YearMonth, Arc<Mutex<()>>>,
    gates: DashMap<YearMonth, Arc<RwLock<()>>>,
}

impl<S: InvoicingStore, A: AccountingApi> MonthlyAggregateManager<S, A> {
    /// Create a new manager.
    #[must_use]
    pub fn new(store: Arc<S>, api: Arc<A>, profile: AccountingProfile) -> Self {
        Self {
            store,
            api,
            profile,
            locks: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    fn lock_for(&self, year_month: YearMonth) -> Arc<Mutex<()>> {
        self.locks.entry(year_month).or_default().clone()
    }

    fn gate_for(&self, year_month: YearMonth) -> Arc<RwLock<()>> {
        self.gates.entry(year_month).or_default().clone()
    }

    /// Keeps the period from being finalized until the guard is dropped.
    ///
    /// Take it before [`Self::get_or_create`] and hold it until the invoice
    /// and the totals are written.
    pub(crate) async fn hold_open(&self, year_month: YearMonth) -> OwnedRwLockReadGuard<()> {
        self.gate_for(year_month).read_owned().await
    }

    /// Returns the open pratica of a period, creating it locally and remotely
    /// when absent.
    ///
    /// A failed remote creation still returns the local row, with no remote id.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyFinalized` if the period is closed, or a repository error.
    pub async fn get_or_create(
        &self,
        year_month: YearMonth,
    ) -> Result<MonthlyPratica, InvoicingError> {
        let lock = self.lock_for(year_month);
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.find_pratica(year_month).await? {
            return Self::ensure_open(existing);
        }

        let metadata = serde_json::to_value(&self.profile)
            .map_err(|e| RepositoryError::Database(format!("metadata snapshot: {e}")))?;

        let pratica = match self
            .store
            .insert_pratica(NewPratica {
                year_month,
                metadata,
            })
            .await?
        {
            InsertOutcome::Inserted(pratica) => pratica,
            InsertOutcome::Conflict => {
                info!(year_month = %year_month, "Monthly pratica created concurrently, re-reading");
                let winner = self.store.find_pratica(year_month).await?.ok_or_else(|| {
                    RepositoryError::NotFound(format!("monthly pratica {year_month}"))
                })?;
                return Self::ensure_open(winner);
            }
        };

        info!(pratica_id = %pratica.id, year_month = %year_month, "Created monthly pratica");
        AuditEvent::new(
            AuditEntityType::MonthlyPratica,
            pratica.id.into_inner(),
            actions::PRATICA_CREATED,
        )
        .transition(None, Some(PraticaStatus::Open.as_str()))
        .record(self.store.as_ref())
        .await;

        match self.create_remote(&pratica).await {
            Ok(remote) => self.link_remote(&pratica, remote).await,
            Err(err) => {
                warn!(
                    pratica_id = %pratica.id,
                    year_month = %year_month,
                    error = %err,
                    "Remote aggregate creation failed, will repair on next use"
                );
                AuditEvent::new(
                    AuditEntityType::MonthlyPratica,
                    pratica.id.into_inner(),
                    actions::PRATICA_REMOTE_FAILED,
                )
                .details(json!({ "error": err.to_string() }))
                .record(self.store.as_ref())
                .await;
                Ok(pratica)
            }
        }
    }

    /// Makes sure a pratica has a remote aggregate, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns the remote failure when the aggregate still cannot be created.
    pub async fn ensure_remote(
        &self,
        pratica: MonthlyPratica,
    ) -> Result<MonthlyPratica, InvoicingError> {
        if pratica.remote_id.is_some() {
            return Ok(pratica);
        }

        let lock = self.lock_for(pratica.year_month);
        let _guard = lock.lock().await;

        // Another task may have repaired it while we waited.
        let current = self
            .store
            .find_pratica(pratica.year_month)
            .await?
            .unwrap_or(pratica);
        if current.remote_id.is_some() {
            return Ok(current);
        }
        let current = Self::ensure_open(current)?;

        info!(pratica_id = %current.id, year_month = %current.year_month, "Repairing missing remote aggregate");
        let remote = self.create_remote(&current).await?;
        self.link_remote(&current, remote).await
    }

    /// Closes a period locally and remotely.
    ///
    /// Waits for in-flight attachments to the period. The remote record is
    /// switched to `INS` first; the local row is only touched after that
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns `PraticaNotFound`, `AlreadyFinalized`, `MissingRemoteAggregate`
    /// or the remote failure.
    pub async fn finalize(&self, year_month: YearMonth) -> Result<MonthlyPratica, InvoicingError> {
        // Gate before mutex, the same order attachments use.
        let gate = self.gate_for(year_month);
        let _closing = gate.write().await;
        let lock = self.lock_for(year_month);
        let _guard = lock.lock().await;

        let pratica = self
            .store
            .find_pratica(year_month)
            .await?
            .ok_or(InvoicingError::PraticaNotFound(year_month))?;
        let pratica = Self::ensure_open(pratica)?;
        let remote_id = pratica
            .remote_id
            .as_deref()
            .ok_or(InvoicingError::MissingRemoteAggregate(year_month))?;

        self.api
            .update_aggregate_status(remote_id, RemoteAggregateStatus::Inserted)
            .await
            .map_err(|e| InvoicingError::remote("update_aggregate_status", e))?;

        let finalized = self.store.mark_finalized(pratica.id, Utc::now()).await?;
        info!(
            pratica_id = %finalized.id,
            year_month = %year_month,
            remote_id = %remote_id,
            "Finalized monthly pratica"
        );
        AuditEvent::new(
            AuditEntityType::MonthlyPratica,
            finalized.id.into_inner(),
            actions::PRATICA_FINALIZED,
        )
        .transition(
            Some(PraticaStatus::Open.as_str()),
            Some(PraticaStatus::Finalized.as_str()),
        )
        .details(json!({
            "total_amount": finalized.total_amount,
            "booking_count": finalized.booking_count,
        }))
        .record(self.store.as_ref())
        .await;

        Ok(finalized)
    }

    /// Recomputes cached totals from the `sent` invoices of a pratica.
    ///
    /// # Errors
    ///
    /// Returns a repository error.
    pub async fn recompute_totals(&self, pratica: &MonthlyPratica) -> Result<(), InvoicingError> {
        let (sum, count) = self.store.sent_totals(pratica.id).await?;
        let count = i32::try_from(count)
            .map_err(|_| RepositoryError::Database(format!("booking count overflow: {count}")))?;
        self.store
            .update_totals(pratica.id, pratica_shared::types::round_amount(sum), count)
            .await?;
        Ok(())
    }

    fn ensure_open(pratica: MonthlyPratica) -> Result<MonthlyPratica, InvoicingError> {
        if pratica.is_finalized() {
            return Err(InvoicingError::AlreadyFinalized(pratica.year_month));
        }
        Ok(pratica)
    }

    async fn create_remote(
        &self,
        pratica: &MonthlyPratica,
    ) -> Result<RemoteAggregateRef, InvoicingError> {
        let code = pratica.year_month.compact_code();
        let period_code = self
            .api
            .get_or_create_period_code(&code)
            .await
            .map_err(|e| InvoicingError::remote("period_code", e))?;

        let aggregate = self
            .api
            .create_aggregate(NewAggregate {
                agency_code: self.profile.agency_code.clone(),
                operator_code: self.profile.operator_code.clone(),
                customer_code: self.profile.customer_code.clone(),
                description: format!("Monthly bookings {}", pratica.year_month),
                period_code_id: period_code.id,
                status: RemoteAggregateStatus::WorkInProgress,
                currency: self.profile.default_currency.clone(),
                opened_on: pratica.created_at.date_naive(),
            })
            .await
            .map_err(|e| InvoicingError::remote("create_aggregate", e))?;

        Ok(RemoteAggregateRef {
            remote_id: aggregate.id,
            display_number: aggregate.display_number,
            period_code: period_code.code,
        })
    }

    async fn link_remote(
        &self,
        pratica: &MonthlyPratica,
        remote: RemoteAggregateRef,
    ) -> Result<MonthlyPratica, InvoicingError> {
        let remote_id = remote.remote_id.clone();
        let linked = self.store.set_remote(pratica.id, remote).await?;
        info!(
            pratica_id = %linked.id,
            year_month = %linked.year_month,
            remote_id = %remote_id,
            "Linked monthly pratica to remote aggregate"
        );
        AuditEvent::new(
            AuditEntityType::MonthlyPratica,
            linked.id.into_inner(),
            actions::PRATICA_REMOTE_CREATED,
        )
        .details(json!({
            "remote_id": remote_id,
            "display_number": linked.display_number,
            "period_code": linked.period_code,
        }))
        .record(self.store.as_ref())
        .await;
        Ok(linked)
    }
}
