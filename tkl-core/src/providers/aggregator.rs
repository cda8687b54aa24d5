//! Offline stand-in for the upstream aggregator.
//!
//! Accepts every order as `processing` and reports `success` once the
//! configured settle delay has passed.

use std::collections::HashMap;

use async_trait::async_trait;
use tkl_sdk::objects::Target;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{
    CallbackPolicy, FulfillRequest, FulfillResult, ProviderError, ProviderOrderStatus,
    TargetCheck, TopupProvider, TopupStatus,
};
use crate::config::AggregatorConfig;
use crate::utils::clock::now;

pub struct AggregatorStub {
    config: AggregatorConfig,
    accepted: Mutex<HashMap<String, Instant>>,
    policy: CallbackPolicy,
}

impl AggregatorStub {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            accepted: Mutex::new(HashMap::new()),
            policy: CallbackPolicy::default(),
        }
    }
}

#[async_trait]
impl TopupProvider for AggregatorStub {
    fn name(&self) -> &'static str {
        "aggregator"
    }

    async fn verify_target(
        &self,
        _product_code: &str,
        _target: &Target,
    ) -> Result<TargetCheck, ProviderError> {
        Ok(TargetCheck::valid(None))
    }

    async fn fulfill(&self, request: FulfillRequest) -> Result<FulfillResult, ProviderError> {
        let provider_order_id = format!("AGG-{}", request.order_id.simple());
        self.accepted
            .lock()
            .await
            .entry(provider_order_id.clone())
            .or_insert_with(Instant::now);
        tracing::debug!(
            order_id = %request.order_id,
            product_code = %request.product_code,
            "Aggregator stub accepted order"
        );
        Ok(FulfillResult {
            provider_order_id,
            status: TopupStatus::Processing,
            message: None,
            voucher_code: None,
        })
    }

    async fn get_status(
        &self,
        provider_order_id: &str,
    ) -> Result<ProviderOrderStatus, ProviderError> {
        let accepted = self.accepted.lock().await;
        let at = accepted
            .get(provider_order_id)
            .ok_or_else(|| ProviderError::NotFound(provider_order_id.to_string()))?;
        if at.elapsed() >= self.config.settle_after {
            Ok(ProviderOrderStatus {
                status: TopupStatus::Success,
                message: None,
                voucher_code: None,
                completed_at: Some(now()),
            })
        } else {
            Ok(ProviderOrderStatus {
                status: TopupStatus::Processing,
                message: None,
                voucher_code: None,
                completed_at: None,
            })
        }
    }

    fn callback_policy(&self) -> &CallbackPolicy {
        &self.policy
    }
}
