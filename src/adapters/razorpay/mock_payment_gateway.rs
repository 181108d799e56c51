//! Mock payment gateway for testing.
//!
//! Supports:
//! - Deterministic order ids
//! - Error injection for the next call
//! - Call tracking

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::ports::{CreateOrderRequest, GatewayOrder, PaymentError, PaymentGateway};

/// Mock payment gateway. Clones share state.
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_error: Option<PaymentError>,
    orders_created: u64,
    requests: Vec<CreateOrderRequest>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `create_order` call with `error`.
    pub fn fail_next(&self, error: PaymentError) {
        self.lock().next_error = Some(error);
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<CreateOrderRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, PaymentError> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        state.orders_created += 1;
        Ok(GatewayOrder {
            id: format!("order_mock_{}", state.orders_created),
            amount: request.amount,
            currency: request.currency,
            receipt: Some(request.receipt),
            status: Some("created".to_string()),
        })
    }

    fn public_key_id(&self) -> &str {
        "rzp_test_mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PaymentErrorCode;
    use std::collections::BTreeMap;

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            amount: 249_900,
            currency: "INR".to_string(),
            receipt: "r".to_string(),
            notes: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn order_ids_are_sequential() {
        let gw = MockPaymentGateway::new();
        assert_eq!(gw.create_order(request()).await.unwrap().id, "order_mock_1");
        assert_eq!(gw.create_order(request()).await.unwrap().id, "order_mock_2");
        assert_eq!(gw.requests().len(), 2);
    }

    #[tokio::test]
    async fn injected_error_applies_once() {
        let gw = MockPaymentGateway::new();
        gw.fail_next(PaymentError::timeout("slow"));
        let err = gw.create_order(request()).await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::Timeout);
        assert!(gw.create_order(request()).await.is_ok());
    }
}
