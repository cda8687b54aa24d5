//! JSON client for the topup reseller API.
//!
//! Every request is signed with `hex(HMAC-SHA256(username + ref, api_key))`
//! where `ref` is the reference the request is about.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tkl_sdk::objects::Target;
use tkl_sdk::signature::hmac_sha256_hex;

use super::{
    CallbackPolicy, FulfillRequest, FulfillResult, ProviderError, ProviderOrderStatus,
    TargetCheck, TopupProvider, TopupStatus,
};
use crate::config::ResellerConfig;
use crate::utils::clock::now;
use crate::utils::http::{client_with_timeout, is_transient_status};

#[derive(Debug, Serialize)]
struct ValidateBody<'a> {
    username: &'a str,
    product_code: &'a str,
    customer_no: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    zone_id: Option<&'a str>,
    sign: String,
}

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    username: &'a str,
    buyer_sku_code: &'a str,
    customer_no: String,
    ref_id: String,
    sign: String,
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    username: &'a str,
    trxid: &'a str,
    sign: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ValidateData {
    valid: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderData {
    #[serde(default)]
    trxid: Option<String>,
    #[serde(default)]
    ref_id: Option<String>,
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    sn: Option<String>,
}

pub struct ResellerClient {
    config: ResellerConfig,
    http: reqwest::Client,
    policy: CallbackPolicy,
}

impl ResellerClient {
    pub fn new(config: ResellerConfig) -> Result<Self, reqwest::Error> {
        let http = client_with_timeout(config.timeout)?;
        let policy = CallbackPolicy {
            secret: config.callback_secret.clone(),
            allow_unsigned: config.allow_unsigned_callbacks,
        };
        Ok(Self {
            config,
            http,
            policy,
        })
    }

    pub fn sign(&self, reference: &str) -> Result<String, ProviderError> {
        let data = format!("{}{}", self.config.username, reference);
        hmac_sha256_hex(data.as_bytes(), self.config.api_key.as_bytes())
            .map_err(|e| ProviderError::Rejected(format!("cannot sign request: {e}")))
    }

    /// Customer number as the reseller expects it: game zone appended to the uid.
    pub fn customer_no(target: &Target) -> String {
        match target.zone() {
            Some(zone) => format!("{}{}", target.primary(), zone),
            None => target.primary().to_string(),
        }
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let url = self
            .config
            .base_url
            .join(path)
            .map_err(|e| ProviderError::Rejected(format!("invalid endpoint {path}: {e}")))?;
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            let envelope: Envelope<T> = response
                .json()
                .await
                .map_err(|e| ProviderError::Payload(e.to_string()))?;
            return Ok(envelope.data);
        }
        let text = response.text().await.unwrap_or_default();
        let message = format!("HTTP {}: {}", status.as_u16(), text.chars().take(256).collect::<String>());
        if status == reqwest::StatusCode::NOT_FOUND {
            Err(ProviderError::NotFound(message))
        } else if is_transient_status(status) {
            Err(ProviderError::Transient(message))
        } else {
            Err(ProviderError::Rejected(message))
        }
    }
}

#[async_trait]
impl TopupProvider for ResellerClient {
    fn name(&self) -> &'static str {
        "reseller"
    }

    #[tracing::instrument(skip_all, err, fields(product_code = %product_code, kind = target.kind()))]
    async fn verify_target(
        &self,
        product_code: &str,
        target: &Target,
    ) -> Result<TargetCheck, ProviderError> {
        let body = ValidateBody {
            username: &self.config.username,
            product_code,
            customer_no: target.primary(),
            zone_id: target.zone(),
            sign: self.sign(target.primary())?,
        };
        let data: ValidateData = self.post("validate", &body).await?;
        Ok(if data.valid {
            TargetCheck::valid(data.name)
        } else {
            TargetCheck::invalid(
                data.message
                    .unwrap_or_else(|| "Target not found".to_string()),
            )
        })
    }

    #[tracing::instrument(skip_all, err, fields(order_id = %request.order_id))]
    async fn fulfill(&self, request: FulfillRequest) -> Result<FulfillResult, ProviderError> {
        let ref_id = request.order_id.to_string();
        let body = OrderBody {
            username: &self.config.username,
            buyer_sku_code: &request.product_code,
            customer_no: Self::customer_no(&request.target),
            sign: self.sign(&ref_id)?,
            ref_id,
        };
        let data: OrderData = self.post("order", &body).await?;
        let provider_order_id = data
            .trxid
            .or(data.ref_id)
            .ok_or_else(|| ProviderError::Payload("order response has no trxid".into()))?;
        Ok(FulfillResult {
            provider_order_id,
            status: TopupStatus::from_reseller(&data.status),
            message: data.message,
            voucher_code: data.sn.filter(|sn| !sn.trim().is_empty()),
        })
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_status(
        &self,
        provider_order_id: &str,
    ) -> Result<ProviderOrderStatus, ProviderError> {
        let body = StatusBody {
            username: &self.config.username,
            trxid: provider_order_id,
            sign: self.sign(provider_order_id)?,
        };
        let data: OrderData = self.post("status", &body).await?;
        let status = TopupStatus::from_reseller(&data.status);
        Ok(ProviderOrderStatus {
            status,
            message: data.message,
            voucher_code: data.sn.filter(|sn| !sn.trim().is_empty()),
            completed_at: status.is_final().then(now),
        })
    }

    fn callback_policy(&self) -> &CallbackPolicy {
        &self.policy
    }
}
