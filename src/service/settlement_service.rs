//! Ride completion: evaluation, status, and payment in one unit of work.
//!
//! The evaluation, the `COMPLETED` event, and the chair release are only
//! committed once the gateway has accepted the charge. If the charge
//! cannot be confirmed the whole unit of work is rolled back and the ride
//! stays `ARRIVED`, so the rider can submit again. Every attempt (and
//! every resubmission) carries the ride id as idempotency key, so the
//! gateway charges at most once.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::status_ledger;
use crate::domain::{Evaluation, RideId, RideStatus, UserId};
use crate::error::ServiceError;
use crate::payment::{FareCalculator, PaymentAck, PaymentGateway, PaymentRequest, RetryPolicy};
use crate::persistence::Store;

/// A settled ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// The ride.
    pub ride_id: RideId,
    /// Amount charged.
    pub fare: i64,
    /// Timestamp of the `COMPLETED` event.
    pub completed_at: DateTime<Utc>,
    /// How the gateway acknowledged the charge.
    pub ack: PaymentAck,
}

/// Completes rides and collects payment.
#[derive(Debug)]
pub struct SettlementService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    fares: Arc<dyn FareCalculator>,
    retry: RetryPolicy,
}

impl SettlementService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        fares: Arc<dyn FareCalculator>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            fares,
            retry,
        }
    }

    /// Records the rider's evaluation, completes the ride, and charges the
    /// fare. `user_id` must be the rider who requested the ride.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`]: `evaluation` is outside 1..=5.
    /// - [`ServiceError::NotFound`]: unknown ride, a ride of another user,
    ///   or no payment token is registered for the rider.
    /// - [`ServiceError::Conflict`]: the ride is not `ARRIVED`.
    /// - [`ServiceError::Transport`]: the gateway stayed unreachable for
    ///   the whole retry budget.
    /// - [`ServiceError::Upstream`]: the gateway rejected the charge.
    /// - [`ServiceError::InternalInconsistency`] /
    ///   [`ServiceError::Persistence`]: store problems.
    ///
    /// On any error nothing is committed.
    pub async fn submit_evaluation(
        &self,
        user_id: UserId,
        ride_id: RideId,
        evaluation: i64,
    ) -> Result<Settlement, ServiceError> {
        let evaluation = Evaluation::new(evaluation)?;
        let mut tx = self.store.begin().await?;

        let ride = tx
            .ride_for_update(ride_id)
            .await?
            .filter(|ride| ride.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("ride {ride_id} not found")))?;

        let status = status_ledger::current_status(tx.as_mut(), ride_id).await?;
        if status != RideStatus::Arrived {
            return Err(ServiceError::Conflict(format!(
                "ride {ride_id} has not arrived yet (status {status})"
            )));
        }

        let ride = tx.set_evaluation(ride_id, evaluation).await?;
        let completed = status_ledger::append(tx.as_mut(), &ride, RideStatus::Completed).await?;

        let fare = self
            .fares
            .discounted_fare(ride.user_id, ride.pickup, ride.destination);
        let token = tx.payment_token(ride.user_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("no payment token registered for user {}", ride.user_id))
        })?;

        let request = PaymentRequest {
            token,
            amount: fare,
            idempotency_key: ride_id,
        };
        let ack = match self.retry.post_payment(self.gateway.as_ref(), &request).await {
            Ok(ack) => ack,
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(%ride_id, error = %rollback, "rollback after payment failure failed");
                }
                tracing::warn!(%ride_id, fare, error = %err, "payment failed, ride left ARRIVED");
                return Err(err.into());
            }
        };

        tx.commit().await?;

        tracing::info!(%ride_id, fare, evaluation = evaluation.get(), ?ack, "ride completed");
        Ok(Settlement {
            ride_id,
            fare,
            completed_at: completed.created_at,
            ack,
        })
    }
}
