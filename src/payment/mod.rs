//! Payment settlement plumbing: the outbound gateway port, its HTTP
//! adapter, the bounded retry policy, and the fare collaborator.

pub mod fare;
pub mod gateway;
pub mod retry;

pub use fare::{FareCalculator, MeteredFare};
pub use gateway::{
    HttpPaymentGateway, PaymentAck, PaymentError, PaymentGateway, PaymentRequest,
};
pub use retry::RetryPolicy;
