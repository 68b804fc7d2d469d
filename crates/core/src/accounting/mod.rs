//! Remote accounting back-office capability.
//!
//! The orchestrator depends only on [`AccountingApi`]; the HTTP realisation
//! lives in the `pratica-accounting` crate.

mod error;
mod types;

pub use error::RemoteCallError;
pub use types::{
    NewAccount, NewAggregate, NewPassenger, NewPaymentMovement, NewPricingLine, NewService,
    RemoteAccount, RemoteAggregate, RemoteAggregateStatus, RemotePassenger,
    RemotePaymentMovement, RemotePeriodCode, RemotePricingLine, RemoteService,
};

/// Operations the invoicing flow needs from the remote practice-management API.
pub trait AccountingApi: Send + Sync {
    /// Create a monthly aggregate (pratica).
    fn create_aggregate(
        &self,
        request: NewAggregate,
    ) -> impl std::future::Future<Output = Result<RemoteAggregate, RemoteCallError>> + Send;

    /// Read an aggregate, including fields this system does not model.
    fn get_aggregate(
        &self,
        remote_id: &str,
    ) -> impl std::future::Future<Output = Result<RemoteAggregate, RemoteCallError>> + Send;

    /// Change an aggregate's status by replacing the full record.
    ///
    /// Every field of the current remote record is preserved.
    fn update_aggregate_status(
        &self,
        remote_id: &str,
        status: RemoteAggregateStatus,
    ) -> impl std::future::Future<Output = Result<RemoteAggregate, RemoteCallError>> + Send;

    /// Look up an account by its external key.
    fn find_account_by_external_key(
        &self,
        external_key: &str,
    ) -> impl std::future::Future<Output = Result<Option<RemoteAccount>, RemoteCallError>> + Send;

    /// Create an account.
    fn create_account(
        &self,
        request: NewAccount,
    ) -> impl std::future::Future<Output = Result<RemoteAccount, RemoteCallError>> + Send;

    /// Add a passenger to an aggregate.
    fn create_passenger(
        &self,
        request: NewPassenger,
    ) -> impl std::future::Future<Output = Result<RemotePassenger, RemoteCallError>> + Send;

    /// Add a service line to an aggregate.
    fn create_service(
        &self,
        request: NewService,
    ) -> impl std::future::Future<Output = Result<RemoteService, RemoteCallError>> + Send;

    /// Add the pricing line of a service.
    fn create_pricing_line(
        &self,
        request: NewPricingLine,
    ) -> impl std::future::Future<Output = Result<RemotePricingLine, RemoteCallError>> + Send;

    /// Record a payment movement.
    fn create_payment_movement(
        &self,
        request: NewPaymentMovement,
    ) -> impl std::future::Future<Output = Result<RemotePaymentMovement, RemoteCallError>> + Send;

    /// Return the period code registry entry for `code`, creating it if absent.
    fn get_or_create_period_code(
        &self,
        code: &str,
    ) -> impl std::future::Future<Output = Result<RemotePeriodCode, RemoteCallError>> + Send;
}
