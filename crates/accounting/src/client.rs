//! `AccountingApi` over HTTP.

use std::time::Duration;

use moka::future::Cache;
use pratica_core::accounting::{
    AccountingApi, NewAccount, NewAggregate, NewPassenger, NewPaymentMovement, NewPricingLine,
    NewService, RemoteAccount, RemoteAggregate, RemoteAggregateStatus, RemoteCallError,
    RemotePassenger, RemotePaymentMovement, RemotePeriodCode, RemotePricingLine, RemoteService,
};
use pratica_shared::AppError;
use pratica_shared::config::AccountingConfig;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::session::TokenSession;
use crate::transport::{Request, Transport, is_unauthorized};

/// How long cached lookups stay valid.
const LOOKUP_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Serialize)]
struct NewPeriodCode<'a> {
    code: &'a str,
}

/// Authenticated client for the practice-management API.
pub struct HttpAccountingClient {
    transport: Transport,
    session: TokenSession,
    accounts: Cache<String, RemoteAccount>,
    period_codes: Cache<String, RemotePeriodCode>,
}

impl HttpAccountingClient {
    /// Builds a client from configuration. No request is sent until first use.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` for an unusable base URL.
    pub fn new(config: &AccountingConfig) -> Result<Self, AppError> {
        let transport = Transport::new(&config.base_url, Duration::from_secs(config.timeout_secs))
            .map_err(AppError::Configuration)?;
        let session = TokenSession::new(
            config.username.clone(),
            config.password.clone(),
            Duration::from_secs(config.token_refresh_margin_secs),
        );

        Ok(Self {
            transport,
            session,
            accounts: Cache::builder()
                .max_capacity(config.lookup_cache_capacity)
                .time_to_live(LOOKUP_TTL)
                .build(),
            period_codes: Cache::builder()
                .max_capacity(config.lookup_cache_capacity)
                .time_to_live(LOOKUP_TTL)
                .build(),
        })
    }

    /// Sends an authenticated request, refreshing the token once on `401`.
    async fn call<B, T>(&self, request: Request<'_, B>) -> Result<T, RemoteCallError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let token = self.session.token(&self.transport).await?;
        match self.transport.send(&request, Some(&token)).await {
            Err(err) if is_unauthorized(&err) => {
                self.session.invalidate(&token).await;
                let token = self.session.token(&self.transport).await?;
                self.transport
                    .send(&request, Some(&token))
                    .await
                    .map_err(|err| {
                        if is_unauthorized(&err) {
                            RemoteCallError::Auth("token rejected after refresh".to_string())
                        } else {
                            err
                        }
                    })
            }
            other => other,
        }
    }

    async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, RemoteCallError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.call(Request::with_body(Method::POST, segments, body))
            .await
    }
}

impl AccountingApi for HttpAccountingClient {
    async fn create_aggregate(&self, request: NewAggregate) -> Result<RemoteAggregate, RemoteCallError> {
        let created: RemoteAggregate = self.post(&["praticas"], &request).await?;
        info!(
            remote_id = %created.id,
            display_number = ?created.display_number,
            "Created remote aggregate"
        );
        Ok(created)
    }

    async fn get_aggregate(&self, remote_id: &str) -> Result<RemoteAggregate, RemoteCallError> {
        self.call(Request::get(&["praticas", remote_id])).await
    }

    async fn update_aggregate_status(
        &self,
        remote_id: &str,
        status: RemoteAggregateStatus,
    ) -> Result<RemoteAggregate, RemoteCallError> {
        // The remote only supports full-record replacement.
        let mut record = self.get_aggregate(remote_id).await?;
        let previous = record.status;
        record.status = status;

        let updated: RemoteAggregate = self
            .call(Request::with_body(Method::PUT, &["praticas", remote_id], &record))
            .await?;
        info!(
            remote_id = %remote_id,
            from = %previous,
            to = %updated.status,
            "Updated remote aggregate status"
        );
        Ok(updated)
    }

    async fn find_account_by_external_key(
        &self,
        external_key: &str,
    ) -> Result<Option<RemoteAccount>, RemoteCallError> {
        if let Some(cached) = self.accounts.get(external_key).await {
            return Ok(Some(cached));
        }

        let found: Vec<RemoteAccount> = self
            .call(Request::get(&["accounts"]).query(&[("external_key", external_key)]))
            .await?;
        let account = found.into_iter().find(|a| a.external_key == external_key);
        if let Some(account) = &account {
            self.accounts
                .insert(external_key.to_string(), account.clone())
                .await;
        }
        Ok(account)
    }

    async fn create_account(&self, request: NewAccount) -> Result<RemoteAccount, RemoteCallError> {
        let created: RemoteAccount = self.post(&["accounts"], &request).await?;
        self.accounts
            .insert(created.external_key.clone(), created.clone())
            .await;
        Ok(created)
    }

    async fn create_passenger(&self, request: NewPassenger) -> Result<RemotePassenger, RemoteCallError> {
        self.post(&["passengers"], &request).await
    }

    async fn create_service(&self, request: NewService) -> Result<RemoteService, RemoteCallError> {
        self.post(&["services"], &request).await
    }

    async fn create_pricing_line(
        &self,
        request: NewPricingLine,
    ) -> Result<RemotePricingLine, RemoteCallError> {
        self.post(&["pricing-lines"], &request).await
    }

    async fn create_payment_movement(
        &self,
        request: NewPaymentMovement,
    ) -> Result<RemotePaymentMovement, RemoteCallError> {
        self.post(&["payment-movements"], &request).await
    }

    async fn get_or_create_period_code(&self, code: &str) -> Result<RemotePeriodCode, RemoteCallError> {
        if let Some(cached) = self.period_codes.get(code).await {
            return Ok(cached);
        }

        let existing: Vec<RemotePeriodCode> = self
            .call(Request::get(&["period-codes"]).query(&[("code", code)]))
            .await?;
        let entry = match existing.into_iter().find(|p| p.code == code) {
            Some(entry) => entry,
            None => {
                warn!(code = %code, "Period code missing remotely, creating it");
                self.post(&["period-codes"], &NewPeriodCode { code }).await?
            }
        };

        self.period_codes.insert(code.to_string(), entry.clone()).await;
        Ok(entry)
    }
}
