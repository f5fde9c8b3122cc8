//! Bounded retry around a single payment submission.

use std::time::Duration;

use tracing::{debug, warn};

use super::gateway::{PaymentAck, PaymentError, PaymentGateway, PaymentRequest};

/// Retry budget for payment submissions.
///
/// At most `max_retries + 1` attempts are made. Only
/// [`PaymentError::Transport`] is retried; every other error is returned
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Submits `request`, retrying transport failures within budget.
    ///
    /// Every attempt carries the same idempotency key, so a retry after a
    /// lost response cannot charge twice.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable [`PaymentError`], or the last
    /// transport failure once the budget is spent.
    pub async fn post_payment(
        &self,
        gateway: &dyn PaymentGateway,
        request: &PaymentRequest,
    ) -> Result<PaymentAck, PaymentError> {
        let attempts = self.max_retries.saturating_add(1);
        let mut last_error = PaymentError::Transport("no attempt made".to_string());

        for attempt in 1..=attempts {
            match gateway.post_payment(request).await {
                Ok(ack) => {
                    debug!(
                        ride_id = %request.idempotency_key,
                        attempt,
                        ack = ?ack,
                        "payment accepted"
                    );
                    return Ok(ack);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    warn!(
                        ride_id = %request.idempotency_key,
                        attempt,
                        max_attempts = attempts,
                        error = %err,
                        "payment attempt failed"
                    );
                    last_error = err;
                    if attempt < attempts && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::domain::RideId;

    /// Gateway that replays a fixed script of answers, then keeps
    /// returning the fallback.
    #[derive(Debug)]
    pub(crate) struct ScriptedGateway {
        script: Mutex<VecDeque<Result<PaymentAck, PaymentError>>>,
        fallback: Result<PaymentAck, PaymentError>,
        calls: AtomicUsize,
        keys: Mutex<Vec<RideId>>,
    }

    impl ScriptedGateway {
        pub(crate) fn new(
            script: Vec<Result<PaymentAck, PaymentError>>,
            fallback: Result<PaymentAck, PaymentError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
                keys: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn always(answer: Result<PaymentAck, PaymentError>) -> Arc<Self> {
            Self::new(Vec::new(), answer)
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) async fn keys(&self) -> Vec<RideId> {
            self.keys.lock().await.clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn post_payment(&self, request: &PaymentRequest) -> Result<PaymentAck, PaymentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keys.lock().await.push(request.idempotency_key);
            let next = self.script.lock().await.pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    pub(crate) fn transport() -> Result<PaymentAck, PaymentError> {
        Err(PaymentError::Transport("connection refused".to_string()))
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            token: "token".to_string(),
            amount: 700,
            idempotency_key: RideId::new(),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(5, Duration::ZERO)
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let gateway = ScriptedGateway::new(
            vec![transport(), transport(), transport(), transport()],
            Ok(PaymentAck::Charged),
        );
        let req = request();

        let result = policy().post_payment(gateway.as_ref(), &req).await;

        tokio_test::assert_ok!(&result);
        assert_eq!(gateway.calls(), 5);
        let keys = gateway.keys().await;
        assert!(keys.iter().all(|k| *k == req.idempotency_key));
    }

    #[tokio::test]
    async fn gives_up_after_budget_is_spent() {
        let gateway = ScriptedGateway::always(transport());

        let result = policy().post_payment(gateway.as_ref(), &request()).await;

        assert!(matches!(result, Err(PaymentError::Transport(_))));
        assert_eq!(gateway.calls(), 6);
    }

    #[tokio::test]
    async fn upstream_rejection_is_not_retried() {
        let gateway = ScriptedGateway::always(Err(PaymentError::Upstream { status: 400 }));

        let result = policy().post_payment(gateway.as_ref(), &request()).await;

        assert_eq!(result, Err(PaymentError::Upstream { status: 400 }));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn replay_after_lost_response_counts_as_success() {
        let gateway = ScriptedGateway::new(vec![transport()], Ok(PaymentAck::AlreadyProcessed));

        let result = policy().post_payment(gateway.as_ref(), &request()).await;

        assert_eq!(result, Ok(PaymentAck::AlreadyProcessed));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let gateway = ScriptedGateway::always(transport());

        let result = RetryPolicy::new(0, Duration::ZERO)
            .post_payment(gateway.as_ref(), &request())
            .await;

        assert!(result.is_err());
        assert_eq!(gateway.calls(), 1);
    }
}
