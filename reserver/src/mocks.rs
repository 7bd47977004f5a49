//! Scripted inventory client for tests
//!
//! Responses are queued per operation. The last queued response repeats once
//! the queue is down to it, so a script like `[empty, empty, catalog]` keeps
//! returning `catalog` after the second empty list. Every call is recorded
//! with the time it was made.

use crate::environment::InventoryClient;
use crate::types::{InventoryError, Product, Reservation, Variant};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salegate_core::environment::{Clock, SystemClock};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One recorded call against [`ScriptedInventory`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryCall {
    /// `fetch_product`
    FetchProduct {
        /// When the call was made
        at: DateTime<Utc>,
    },
    /// `fetch_variants`
    FetchVariants {
        /// When the call was made
        at: DateTime<Utc>,
    },
    /// `reserve`
    Reserve {
        /// Requested inventory id
        inventory_id: String,
        /// Requested units
        quantity: u32,
        /// When the call was made
        at: DateTime<Utc>,
    },
}

type Script<T> = VecDeque<Result<T, InventoryError>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn next<T: Clone>(script: &Mutex<Script<T>>, what: &str) -> Result<T, InventoryError> {
    let mut script = lock(script);
    let response = if script.len() > 1 { script.pop_front() } else { script.front().cloned() };
    response.unwrap_or_else(|| Err(InventoryError::Permanent(format!("no scripted {what}"))))
}

/// In-memory [`InventoryClient`] driven by queued responses
pub struct ScriptedInventory {
    clock: Arc<dyn Clock>,
    products: Mutex<Script<Product>>,
    variants: Mutex<Script<Vec<Variant>>>,
    reservations: Mutex<HashMap<String, Result<Reservation, InventoryError>>>,
    calls: Mutex<Vec<InventoryCall>>,
}

impl ScriptedInventory {
    /// Empty script recording wall-clock call times
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            products: Mutex::new(VecDeque::new()),
            variants: Mutex::new(VecDeque::new()),
            reservations: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Record call times from `clock` instead of the wall clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Queue a product metadata response
    #[must_use]
    pub fn with_product(self, product: Product) -> Self {
        self.with_product_result(Ok(product))
    }

    /// Queue a product metadata failure
    #[must_use]
    pub fn with_product_error(self, error: InventoryError) -> Self {
        self.with_product_result(Err(error))
    }

    fn with_product_result(mut self, result: Result<Product, InventoryError>) -> Self {
        self.products
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
        self
    }

    /// Queue a variant list
    #[must_use]
    pub fn with_variants(self, variants: Vec<Variant>) -> Self {
        self.with_variants_result(Ok(variants))
    }

    /// Queue a variant list failure
    #[must_use]
    pub fn with_variants_error(self, error: InventoryError) -> Self {
        self.with_variants_result(Err(error))
    }

    fn with_variants_result(mut self, result: Result<Vec<Variant>, InventoryError>) -> Self {
        self.variants
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
        self
    }

    /// Accept reservations of `inventory_id`, reporting it as `variant_name`
    ///
    /// Items without a scripted answer are rejected as sold out.
    #[must_use]
    pub fn accepting(mut self, inventory_id: &str, variant_name: &str) -> Self {
        self.reservations
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                inventory_id.to_string(),
                Ok(Reservation {
                    variant_name: variant_name.to_string(),
                    quantity: None,
                }),
            );
        self
    }

    /// Answer reservations of `inventory_id` with `error`
    #[must_use]
    pub fn failing(mut self, inventory_id: &str, error: InventoryError) -> Self {
        self.reservations
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(inventory_id.to_string(), Err(error));
        self
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<InventoryCall> {
        lock(&self.calls).clone()
    }

    /// `(inventory_id, quantity)` of every reservation attempt, in order
    #[must_use]
    pub fn reservation_attempts(&self) -> Vec<(String, u32)> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                InventoryCall::Reserve { inventory_id, quantity, .. } => {
                    Some((inventory_id.clone(), *quantity))
                },
                _ => None,
            })
            .collect()
    }

    /// Times of every variant-list read
    #[must_use]
    pub fn variant_fetch_times(&self) -> Vec<DateTime<Utc>> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                InventoryCall::FetchVariants { at } => Some(*at),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: InventoryCall) {
        lock(&self.calls).push(call);
    }
}

impl Default for ScriptedInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryClient for ScriptedInventory {
    async fn fetch_product(&self, _product_id: &str) -> Result<Product, InventoryError> {
        self.record(InventoryCall::FetchProduct { at: self.clock.now() });
        next(&self.products, "product")
    }

    async fn fetch_variants(&self, _product_id: &str) -> Result<Vec<Variant>, InventoryError> {
        self.record(InventoryCall::FetchVariants { at: self.clock.now() });
        next(&self.variants, "variants")
    }

    async fn reserve(
        &self,
        inventory_id: &str,
        quantity: u32,
    ) -> Result<Reservation, InventoryError> {
        self.record(InventoryCall::Reserve {
            inventory_id: inventory_id.to_string(),
            quantity,
            at: self.clock.now(),
        });

        lock(&self.reservations)
            .get(inventory_id)
            .cloned()
            .unwrap_or_else(|| {
                Err(InventoryError::Permanent("API error (status 409): sold out".into()))
            })
            .map(|reservation| Reservation {
                quantity: reservation.quantity.or(Some(quantity)),
                ..reservation
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_response_repeats() {
        let inventory = ScriptedInventory::new()
            .with_variants(vec![])
            .with_variants(vec![Variant {
                inventory_id: "a".into(),
                name: "GA".into(),
                description: String::new(),
                max_reservable_quantity: 1,
            }]);

        assert!(inventory.fetch_variants("42").await.unwrap().is_empty());
        assert_eq!(inventory.fetch_variants("42").await.unwrap().len(), 1);
        assert_eq!(inventory.fetch_variants("42").await.unwrap().len(), 1);
        assert_eq!(inventory.variant_fetch_times().len(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_reservation_is_rejected() {
        let inventory = ScriptedInventory::new().accepting("b", "GA-VIP");

        assert!(inventory.reserve("a", 1).await.is_err());
        let reserved = inventory.reserve("b", 2).await.unwrap();

        assert_eq!(reserved.variant_name, "GA-VIP");
        assert_eq!(reserved.quantity, Some(2));
        assert_eq!(
            inventory.reservation_attempts(),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_empty_script_is_permanent_error() {
        let inventory = ScriptedInventory::new();
        let error = inventory.fetch_product("42").await.unwrap_err();
        assert!(!error.is_transient());
    }
}
