//! Booking mirror repository.
//!
//! Serves [`BookingSource`] from the `bookings` table. Customer and
//! activities are stored as JSONB in the shape the core types serialize to.

use std::sync::Arc;

use chrono::Utc;
use pratica_core::booking::{Activity, Booking, BookingSource, Customer};
use pratica_core::invoicing::RepositoryError;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use super::store::{corrupt, db_err};
use crate::entities::bookings;

/// Booking mirror repository implementation.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    db: Arc<DatabaseConnection>,
}

impl BookingRepository {
    /// Create a new booking repository over an owned or shared pool.
    #[must_use]
    pub fn new(db: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { db: db.into() }
    }

    /// Insert or replace a mirrored booking.
    pub async fn upsert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let customer = serde_json::to_value(&booking.customer)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let activities = serde_json::to_value(&booking.activities)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let active_model = bookings::ActiveModel {
            booking_id: Set(booking.booking_id),
            confirmation_code: Set(booking.confirmation_code.clone()),
            booked_at_raw: Set(booking.created_at.clone()),
            total_amount: Set(booking.total_amount),
            currency: Set(booking.currency.clone()),
            seller: Set(booking.seller.clone()),
            customer: Set(customer),
            activities: Set(activities),
            synced_at: Set(Utc::now().into()),
        };

        bookings::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(bookings::Column::BookingId)
                    .update_columns([
                        bookings::Column::ConfirmationCode,
                        bookings::Column::BookedAtRaw,
                        bookings::Column::TotalAmount,
                        bookings::Column::Currency,
                        bookings::Column::Seller,
                        bookings::Column::Customer,
                        bookings::Column::Activities,
                        bookings::Column::SyncedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;

        tracing::debug!(booking_id = booking.booking_id, "Booking mirrored");
        Ok(())
    }
}

impl BookingSource for BookingRepository {
    async fn find_booking(&self, booking_id: i64) -> Result<Option<Booking>, RepositoryError> {
        bookings::Entity::find_by_id(booking_id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(to_domain)
            .transpose()
    }
}

/// Convert database model to domain model.
fn to_domain(model: bookings::Model) -> Result<Booking, RepositoryError> {
    let customer: Customer = serde_json::from_value(model.customer)
        .map_err(|e| corrupt("bookings", "customer", e))?;
    let activities: Vec<Activity> = serde_json::from_value(model.activities)
        .map_err(|e| corrupt("bookings", "activities", e))?;

    Ok(Booking {
        booking_id: model.booking_id,
        confirmation_code: model.confirmation_code,
        created_at: model.booked_at_raw,
        total_amount: model.total_amount,
        currency: model.currency,
        customer,
        seller: model.seller,
        activities,
    })
}
