//! Order lifecycle orchestration.
//!
//! The [`Orchestrator`] owns every status change an order goes through:
//! checkout and invoice issuance, payment webhooks, fulfillment attempts,
//! provider callbacks and reconciliation. All writes go through
//! [`OrderStore::transition`], so concurrent writers race on the stored status
//! and at most one of them wins each edge.

mod checkout;
mod error;
mod fulfillment;
mod payment;
mod reconcile;
pub mod validation;

pub use checkout::{CheckoutResult, checkout_response};
pub use error::{OrderError, WebhookError};
pub use fulfillment::AttemptOutcome;
pub use reconcile::ReconcileReport;

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::{CheckoutConfig, FulfillmentConfig};
use crate::entities::catalog::{Denomination, Product};
use crate::entities::order::Order;
use crate::entities::transaction_log::{LogKind, TransactionLogInsert};
use crate::events::{FulfillmentJob, FulfillmentJobSender};
use crate::gateways::PaymentGateway;
use crate::providers::TopupProvider;
use crate::store::OrderStore;

pub struct Orchestrator {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    provider: Arc<dyn TopupProvider>,
    jobs: FulfillmentJobSender,
    checkout: CheckoutConfig,
    fulfillment: FulfillmentConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        provider: Arc<dyn TopupProvider>,
        jobs: FulfillmentJobSender,
        checkout: CheckoutConfig,
        fulfillment: FulfillmentConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            provider,
            jobs,
            checkout,
            fulfillment,
        }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.gateway
    }

    pub fn provider(&self) -> &Arc<dyn TopupProvider> {
        &self.provider
    }

    pub fn fulfillment_config(&self) -> &FulfillmentConfig {
        &self.fulfillment
    }

    /// Active product and one of its active denominations.
    async fn load_offer(
        &self,
        product_id: Uuid,
        denomination_id: Uuid,
    ) -> Result<(Product, Denomination), OrderError> {
        let product = self
            .store
            .product(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(OrderError::NotFound("Product"))?;
        let denomination = self
            .store
            .denomination(denomination_id)
            .await?
            .filter(|d| d.is_active && d.product_id == product.id)
            .ok_or(OrderError::NotFound("Denomination"))?;
        Ok((product, denomination))
    }

    /// Append an audit entry. A failed write is logged and otherwise ignored;
    /// the status change it describes has already been committed.
    async fn audit(&self, order_id: Uuid, kind: LogKind, payload: Value) {
        if let Err(e) = self
            .store
            .append_log(TransactionLogInsert::new(order_id, kind, payload))
            .await
        {
            error!(order_id = %order_id, kind = ?kind, error = %e, "Failed to append transaction log");
        }
    }

    /// Hand a paid order to the fulfillment worker.
    ///
    /// A full or closed queue is not an error: the reconciler picks up PAID
    /// orders that nobody started.
    fn enqueue(&self, order: &Order) {
        let job = FulfillmentJob::first(order.id, order.idempotency_key.clone());
        if let Err(e) = self.jobs.try_send(job) {
            warn!(order_id = %order.id, error = %e, "Fulfillment queue unavailable, leaving order to the reconciler");
        }
    }
}
