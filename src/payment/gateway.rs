//! Outbound port to the payment gateway and its reqwest adapter.
//!
//! The adapter owns transport details only: request serialisation,
//! bearer auth, the idempotency header, and status classification.
//!
//! | Gateway answer            | Result                                   |
//! |---------------------------|------------------------------------------|
//! | `204 No Content`          | [`PaymentAck::Charged`]                  |
//! | `409 Conflict`            | [`PaymentAck::AlreadyProcessed`]         |
//! | any other status          | [`PaymentError::Upstream`] (no retry)    |
//! | no response / timeout     | [`PaymentError::Transport`] (retryable)  |

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::domain::RideId;
use crate::error::ServiceError;

/// Header carrying the idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// One charge to submit.
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Gateway credential of the paying user.
    pub token: String,
    /// Amount to charge.
    pub amount: i64,
    /// The ride being paid for; the gateway deduplicates on it.
    pub idempotency_key: RideId,
}

impl fmt::Debug for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("token", &"<redacted>")
            .field("amount", &self.amount)
            .field("idempotency_key", &self.idempotency_key)
            .finish()
    }
}

/// Successful gateway outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAck {
    /// The charge was made by this call.
    Charged,
    /// The gateway had already processed this idempotency key.
    AlreadyProcessed,
}

/// Errors surfaced while calling the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// The request never produced a response.
    #[error("payment transport failed: {0}")]
    Transport(String),
    /// The gateway answered with a status that is neither success nor an
    /// idempotent replay.
    #[error("payment gateway answered with status {status}")]
    Upstream {
        /// HTTP status returned by the gateway.
        status: u16,
    },
    /// The adapter could not be built.
    #[error("payment gateway misconfigured: {0}")]
    Configuration(String),
}

impl PaymentError {
    /// Return whether retrying this error is expected to help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<PaymentError> for ServiceError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Transport(_) => Self::Transport(err.to_string()),
            PaymentError::Upstream { .. } => Self::Upstream(err.to_string()),
            PaymentError::Configuration(_) => Self::Internal(err.to_string()),
        }
    }
}

/// Port for submitting a charge.
#[async_trait]
pub trait PaymentGateway: Send + Sync + fmt::Debug {
    /// Submits one charge attempt. Implementations never retry.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Transport`] when no response was received
    /// and [`PaymentError::Upstream`] when the gateway reported a failure.
    async fn post_payment(&self, request: &PaymentRequest) -> Result<PaymentAck, PaymentError>;
}

#[derive(Debug, Serialize)]
struct PaymentBody {
    amount: i64,
}

/// Payment gateway adapter performing `POST {base}/payments`.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    payments_url: Url,
}

impl HttpPaymentGateway {
    /// Builds an adapter using a reqwest client with an explicit request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Configuration`] when the client cannot be
    /// constructed or the payments URL cannot be derived from `base_url`.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, PaymentError> {
        let payments_url = format!("{}/payments", base_url.as_str().trim_end_matches('/'))
            .parse::<Url>()
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            payments_url,
        })
    }

    /// Endpoint charges are posted to.
    #[must_use]
    pub const fn payments_url(&self) -> &Url {
        &self.payments_url
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn post_payment(&self, request: &PaymentRequest) -> Result<PaymentAck, PaymentError> {
        let response = self
            .client
            .post(self.payments_url.clone())
            .bearer_auth(&request.token)
            .header(IDEMPOTENCY_KEY_HEADER, request.idempotency_key.to_string())
            .json(&PaymentBody {
                amount: request.amount,
            })
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(PaymentAck::Charged),
            StatusCode::CONFLICT => Ok(PaymentAck::AlreadyProcessed),
            status => Err(PaymentError::Upstream {
                status: status.as_u16(),
            }),
        }
    }
}
