//! Injected collaborators for the reserver reducer
//!
//! The reducer reaches the outside world only through [`ReserverEnvironment`]:
//! a [`Clock`] for the time gate and an [`InventoryClient`] for the catalog and
//! reservation calls. Production wires in [`SystemClock`](salegate_core::environment::SystemClock)
//! and a [`KideClient`]; tests wire in a fixed clock and a scripted client.

use crate::gate::TimeGate;
use crate::types::{InventoryError, Product, Reservation, Variant};
use async_trait::async_trait;
use salegate_core::environment::Clock;
use salegate_kide::{KideClient, KideError, VariantInfo};
use std::sync::Arc;
use std::time::Duration;

/// Catalog and reservation operations the agent depends on
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Resolve product metadata, including the sale start
    ///
    /// # Errors
    ///
    /// [`InventoryError::Transient`] when a retry may succeed,
    /// [`InventoryError::Permanent`] otherwise.
    async fn fetch_product(&self, product_id: &str) -> Result<Product, InventoryError>;

    /// Read the current variant list, in service order
    ///
    /// # Errors
    ///
    /// Any failure to read the list.
    async fn fetch_variants(&self, product_id: &str) -> Result<Vec<Variant>, InventoryError>;

    /// Attempt to reserve `quantity` units of `inventory_id`
    ///
    /// # Errors
    ///
    /// Any rejection or transport failure.
    async fn reserve(
        &self,
        inventory_id: &str,
        quantity: u32,
    ) -> Result<Reservation, InventoryError>;
}

impl From<KideError> for InventoryError {
    fn from(error: KideError) -> Self {
        if error.is_transient() {
            Self::Transient(error.to_string())
        } else {
            Self::Permanent(error.to_string())
        }
    }
}

impl From<VariantInfo> for Variant {
    fn from(info: VariantInfo) -> Self {
        Self {
            inventory_id: info.inventory_id,
            name: info.name,
            description: info.description.unwrap_or_default(),
            max_reservable_quantity: info.max_reservable_quantity,
        }
    }
}

#[async_trait]
impl InventoryClient for KideClient {
    async fn fetch_product(&self, product_id: &str) -> Result<Product, InventoryError> {
        let model = self.product(product_id).await?;
        let sale_start_at = model.product.sale_start()?;

        Ok(Product {
            id: product_id.to_string(),
            name: model.product.name,
            sale_start_at,
        })
    }

    async fn fetch_variants(&self, product_id: &str) -> Result<Vec<Variant>, InventoryError> {
        let model = self.product(product_id).await?;
        Ok(model.variants.into_iter().map(Variant::from).collect())
    }

    async fn reserve(
        &self,
        inventory_id: &str,
        quantity: u32,
    ) -> Result<Reservation, InventoryError> {
        let item = KideClient::reserve(self, inventory_id, quantity).await?;
        Ok(Reservation {
            variant_name: item.variant_name,
            quantity: item.quantity,
        })
    }
}

/// Retry pacing for the fetch loops
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryTiming {
    /// Pause before re-reading an empty or unreadable variant list
    pub fetch_retry_delay: Duration,
    /// Pause before retrying a transient metadata failure
    pub metadata_retry_delay: Duration,
}

impl Default for RetryTiming {
    fn default() -> Self {
        Self {
            fetch_retry_delay: Duration::from_millis(100),
            metadata_retry_delay: Duration::from_secs(1),
        }
    }
}

/// Environment for the reserver reducer
#[derive(Clone)]
pub struct ReserverEnvironment {
    /// Wall clock consulted by the time gate
    pub clock: Arc<dyn Clock>,
    /// Catalog and reservation service
    pub inventory: Arc<dyn InventoryClient>,
    /// Gate pacing and countdown reporting
    pub gate: TimeGate,
    /// Retry pacing
    pub timing: RetryTiming,
}

impl ReserverEnvironment {
    /// Environment with default gate and retry pacing
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, inventory: Arc<dyn InventoryClient>) -> Self {
        Self {
            clock,
            inventory,
            gate: TimeGate::default(),
            timing: RetryTiming::default(),
        }
    }

    /// Override the time gate
    #[must_use]
    pub const fn with_gate(mut self, gate: TimeGate) -> Self {
        self.gate = gate;
        self
    }

    /// Override retry pacing
    #[must_use]
    pub const fn with_timing(mut self, timing: RetryTiming) -> Self {
        self.timing = timing;
        self
    }
}

impl std::fmt::Debug for ReserverEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReserverEnvironment")
            .field("gate", &self.gate)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}
