//! Finalization controller.

use std::sync::Arc;

use pratica_shared::types::YearMonth;

use super::aggregate::MonthlyAggregateManager;
use super::error::InvoicingError;
use super::repository::InvoicingStore;
use super::types::MonthlyPratica;
use crate::accounting::AccountingApi;

/// Validates period input and closes monthly praticas.
pub struct FinalizationController<S: InvoicingStore, A: AccountingApi> {
    aggregates: Arc<MonthlyAggregateManager<S, A>>,
}

impl<S: InvoicingStore, A: AccountingApi> FinalizationController<S, A> {
    /// Create a new controller.
    #[must_use]
    pub fn new(aggregates: Arc<MonthlyAggregateManager<S, A>>) -> Self {
        Self { aggregates }
    }

    /// Finalizes the period given as `YYYY-MM`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed period, otherwise whatever
    /// [`MonthlyAggregateManager::finalize`] returns.
    pub async fn finalize_period(&self, year_month: &str) -> Result<MonthlyPratica, InvoicingError> {
        let period = parse_period(year_month)?;
        self.aggregates.finalize(period).await
    }

    #[cfg(test)]
    pub(crate) fn aggregates(&self) -> &MonthlyAggregateManager<S, A> {
        &self.aggregates
    }
}

/// Parses a `YYYY-MM` period.
///
/// # Errors
///
/// Returns `Validation` when the input is not a valid period.
pub fn parse_period(raw: &str) -> Result<YearMonth, InvoicingError> {
    raw.parse()
        .map_err(|e| InvoicingError::Validation(format!("invalid yearMonth: {e}")))
}
