//! Scripted provider for tests and local runs.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tkl_sdk::objects::Target;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    CallbackPolicy, FulfillRequest, FulfillResult, ProviderError, ProviderOrderStatus,
    TargetCheck, TopupProvider, TopupStatus,
};
use crate::utils::clock::now;

/// What the next `fulfill` or `get_status` call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Success { voucher_code: Option<String> },
    Pending,
    Processing,
    Failed(String),
    Transient(String),
    Rejected(String),
}

#[derive(Default)]
struct State {
    fulfill_script: VecDeque<MockOutcome>,
    status_script: VecDeque<MockOutcome>,
    /// provider order id -> last known status
    orders: HashMap<String, (TopupStatus, Option<String>)>,
    fulfill_calls: HashMap<Uuid, u32>,
    display_names: HashMap<String, String>,
}

/// Unscripted calls succeed. Provider order ids are derived from the order id,
/// so repeated `fulfill` calls for one order map to one provider order.
///
/// Callbacks are rejected until a [`CallbackPolicy`] is set.
pub struct MockProvider {
    state: Mutex<State>,
    verify_delay: Option<Duration>,
    fulfill_delay: Option<Duration>,
    policy: CallbackPolicy,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            verify_delay: None,
            fulfill_delay: None,
            policy: CallbackPolicy::default(),
        }
    }

    pub fn with_callback_policy(mut self, policy: CallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Slow down `verify_target`, for exercising caller timeouts.
    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = Some(delay);
        self
    }

    /// Hold every `fulfill` call this long before answering.
    pub fn with_fulfill_delay(mut self, delay: Duration) -> Self {
        self.fulfill_delay = Some(delay);
        self
    }

    pub async fn push_fulfill(&self, outcome: MockOutcome) {
        self.state.lock().await.fulfill_script.push_back(outcome);
    }

    pub async fn push_status(&self, outcome: MockOutcome) {
        self.state.lock().await.status_script.push_back(outcome);
    }

    pub async fn set_display_name(&self, primary: &str, name: &str) {
        self.state
            .lock()
            .await
            .display_names
            .insert(primary.to_string(), name.to_string());
    }

    /// How many times `fulfill` was called for `order_id`.
    pub async fn fulfill_calls(&self, order_id: Uuid) -> u32 {
        self.state
            .lock()
            .await
            .fulfill_calls
            .get(&order_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn provider_order_id(order_id: Uuid) -> String {
        format!("MOCK-{}", order_id.simple())
    }
}

fn apply(outcome: MockOutcome) -> Result<(TopupStatus, Option<String>, Option<String>), ProviderError> {
    match outcome {
        MockOutcome::Success { voucher_code } => Ok((TopupStatus::Success, None, voucher_code)),
        MockOutcome::Pending => Ok((TopupStatus::Pending, None, None)),
        MockOutcome::Processing => Ok((TopupStatus::Processing, None, None)),
        MockOutcome::Failed(msg) => Ok((TopupStatus::Failed, Some(msg), None)),
        MockOutcome::Transient(msg) => Err(ProviderError::Transient(msg)),
        MockOutcome::Rejected(msg) => Err(ProviderError::Rejected(msg)),
    }
}

#[async_trait]
impl TopupProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn verify_target(
        &self,
        _product_code: &str,
        target: &Target,
    ) -> Result<TargetCheck, ProviderError> {
        if let Some(delay) = self.verify_delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().await;
        Ok(TargetCheck::valid(
            state.display_names.get(target.primary()).cloned(),
        ))
    }

    async fn fulfill(&self, request: FulfillRequest) -> Result<FulfillResult, ProviderError> {
        if let Some(delay) = self.fulfill_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().await;
        *state.fulfill_calls.entry(request.order_id).or_default() += 1;
        let outcome = state
            .fulfill_script
            .pop_front()
            .unwrap_or(MockOutcome::Success { voucher_code: None });
        let (status, message, voucher_code) = apply(outcome)?;
        let provider_order_id = Self::provider_order_id(request.order_id);
        state
            .orders
            .insert(provider_order_id.clone(), (status, voucher_code.clone()));
        Ok(FulfillResult {
            provider_order_id,
            status,
            message,
            voucher_code,
        })
    }

    async fn get_status(
        &self,
        provider_order_id: &str,
    ) -> Result<ProviderOrderStatus, ProviderError> {
        let mut state = self.state.lock().await;
        let Some(&(known, _)) = state.orders.get(provider_order_id) else {
            return Err(ProviderError::NotFound(provider_order_id.to_string()));
        };
        let (status, message, voucher_code) = match state.status_script.pop_front() {
            Some(outcome) => apply(outcome)?,
            None => (known, None, None),
        };
        state
            .orders
            .insert(provider_order_id.to_string(), (status, voucher_code.clone()));
        Ok(ProviderOrderStatus {
            status,
            message,
            voucher_code,
            completed_at: status.is_final().then(now),
        })
    }

    fn callback_policy(&self) -> &CallbackPolicy {
        &self.policy
    }
}
