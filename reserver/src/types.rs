//! Domain types for the reservation agent.

use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// Catalog
// ============================================================================

/// A product (event) as resolved once at startup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    /// Product id the operator asked for
    pub id: String,
    /// Display name
    pub name: String,
    /// Instant before which reservation attempts are pointless
    pub sale_start_at: DateTime<Utc>,
}

/// One purchasable sub-item of a product (a ticket tier)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    /// Inventory id used when reserving
    pub inventory_id: String,
    /// Display name
    pub name: String,
    /// Free-form description (empty when the catalog has none)
    pub description: String,
    /// Most units one reservation may hold
    pub max_reservable_quantity: u32,
}

impl Variant {
    /// Whether the name or description contains any of `terms`
    ///
    /// Matching ignores case: `"vip"` matches `"GA-VIP"`.
    #[must_use]
    pub fn matches_any(&self, terms: &[String]) -> bool {
        let name = self.name.to_lowercase();
        let description = self.description.to_lowercase();
        terms.iter().any(|term| {
            let term = term.to_lowercase();
            name.contains(&term) || description.contains(&term)
        })
    }
}

/// A held reservation as reported by the inventory service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    /// Name of the reserved variant
    pub variant_name: String,
    /// Units held, when the service reports it
    pub quantity: Option<u32>,
}

// ============================================================================
// Policies
// ============================================================================

/// How the next variant is chosen
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Pick the first variant whose name or description contains a term.
    /// Degrades to [`SelectionPolicy::PositionalIndex`] after the first hit.
    FilterMatch(Vec<String>),
    /// Pick the variant at `AgentState::current_index`
    PositionalIndex,
}

impl SelectionPolicy {
    /// Filter mode when `terms` is non-empty, positional otherwise
    #[must_use]
    pub fn from_terms(terms: Vec<String>) -> Self {
        if terms.is_empty() {
            Self::PositionalIndex
        } else {
            Self::FilterMatch(terms)
        }
    }
}

/// How many units to request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityPolicy {
    /// Request the variant's `max_reservable_quantity`, at least one unit
    Maximum,
    /// Request a fixed number of units
    Fixed(u32),
}

impl QuantityPolicy {
    /// `Maximum` when `max` is set, one unit otherwise
    #[must_use]
    pub const fn from_flag(max: bool) -> Self {
        if max { Self::Maximum } else { Self::Fixed(1) }
    }

    /// Units to request for `variant`
    #[must_use]
    pub const fn quantity_for(&self, variant: &Variant) -> u32 {
        match self {
            // A listing without a limit reports zero
            Self::Maximum if variant.max_reservable_quantity == 0 => 1,
            Self::Maximum => variant.max_reservable_quantity,
            Self::Fixed(n) => *n,
        }
    }
}

impl Default for QuantityPolicy {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

// ============================================================================
// Agent state
// ============================================================================

/// Variant cursor and selection policies
///
/// `current_index` only ever grows. `max_index` is fixed from the first
/// non-empty variant list and never re-derived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentState {
    /// Position of the variant to try next
    pub current_index: usize,
    /// Last valid position, known after the first non-empty fetch
    pub max_index: Option<usize>,
    /// Filter-or-positional selection
    pub selection_policy: SelectionPolicy,
    /// Units to request
    pub quantity_policy: QuantityPolicy,
    /// Inventory id of the most recent selection
    pub last_selected_inventory_id: Option<String>,
    /// Quantity of the most recent selection
    pub last_selected_quantity: Option<u32>,
}

impl AgentState {
    /// Fresh cursor at position zero
    #[must_use]
    pub const fn new(selection_policy: SelectionPolicy, quantity_policy: QuantityPolicy) -> Self {
        Self {
            current_index: 0,
            max_index: None,
            selection_policy,
            quantity_policy,
            last_selected_inventory_id: None,
            last_selected_quantity: None,
        }
    }

    /// Whether no further variant remains after the current one
    #[must_use]
    pub fn at_last_variant(&self) -> bool {
        self.current_index >= self.max_index.unwrap_or(0)
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new(SelectionPolicy::PositionalIndex, QuantityPolicy::default())
    }
}

/// Where the engine is in its lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not started
    Idle,
    /// Resolving product metadata
    FetchingMetadata,
    /// Holding at the time gate
    WaitingForSale,
    /// Reading the variant list
    FetchingVariants,
    /// A reservation request is in flight
    Reserving,
    /// Terminal
    Finished(Outcome),
}

impl Phase {
    /// Whether the engine has stopped
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Terminal result handed back to the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A reservation is held
    Succeeded {
        /// Reserved variant
        variant_name: String,
        /// Units held
        quantity: u32,
    },
    /// Every variant was tried and none could be reserved
    Exhausted,
    /// The run cannot proceed (invalid product, unusable sale-start)
    Fatal {
        /// Diagnostic for the operator
        reason: String,
    },
}

/// Complete engine state owned by the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserverState {
    /// Product id to book
    pub product_id: String,
    /// Lifecycle phase
    pub phase: Phase,
    /// Product metadata once resolved
    pub product: Option<Product>,
    /// Variant cursor and policies
    pub agent: AgentState,
}

impl ReserverState {
    /// Idle engine for `product_id`
    #[must_use]
    pub fn new(product_id: impl Into<String>, agent: AgentState) -> Self {
        Self {
            product_id: product_id.into(),
            phase: Phase::Idle,
            product: None,
            agent,
        }
    }

    /// Terminal outcome, if reached
    #[must_use]
    pub const fn outcome(&self) -> Option<&Outcome> {
        match &self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure reported by an inventory collaborator, classified for the engine
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// Retrying may succeed (network failure, rate limit, server error)
    #[error("transient: {0}")]
    Transient(String),
    /// Retrying will not help (unknown product, malformed payload)
    #[error("{0}")]
    Permanent(String),
}

impl InventoryError {
    /// Whether the engine should retry the call
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A reservation attempt did not produce a reservation
///
/// Covers both a rejection by the service (sold out, conflict) and a
/// transport failure on the request. Both advance to the next variant.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("reservation unavailable for '{inventory_id}': {cause}")]
pub struct ReservationUnavailable {
    /// Inventory id that was requested
    pub inventory_id: String,
    /// Underlying failure
    pub cause: InventoryError,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(name: &str, description: &str, max: u32) -> Variant {
        Variant {
            inventory_id: format!("inv-{name}"),
            name: name.to_string(),
            description: description.to_string(),
            max_reservable_quantity: max,
        }
    }

    #[test]
    fn test_matches_any_checks_name_and_description() {
        let v = variant("Evening", "Includes VIP lounge", 2);
        assert!(v.matches_any(&["vip".to_string()]));
        assert!(v.matches_any(&["nope".to_string(), "even".to_string()]));
        assert!(!v.matches_any(&["student".to_string()]));
        assert!(!v.matches_any(&[]));
    }

    #[test]
    fn test_quantity_policy() {
        let v = variant("GA", "", 5);
        assert_eq!(QuantityPolicy::from_flag(true).quantity_for(&v), 5);
        assert_eq!(QuantityPolicy::from_flag(false).quantity_for(&v), 1);
    }

    #[test]
    fn test_maximum_without_listed_limit_requests_one_unit() {
        let v = variant("GA", "", 0);
        assert_eq!(QuantityPolicy::Maximum.quantity_for(&v), 1);
    }

    #[test]
    fn test_selection_policy_from_terms() {
        assert_eq!(SelectionPolicy::from_terms(vec![]), SelectionPolicy::PositionalIndex);
        assert_eq!(
            SelectionPolicy::from_terms(vec!["VIP".into()]),
            SelectionPolicy::FilterMatch(vec!["VIP".into()])
        );
    }

    #[test]
    fn test_at_last_variant() {
        let mut agent = AgentState::default();
        assert!(agent.at_last_variant(), "unknown max index counts as a single variant");

        agent.max_index = Some(2);
        assert!(!agent.at_last_variant());
        agent.current_index = 2;
        assert!(agent.at_last_variant());
    }

    #[test]
    fn test_outcome_only_when_finished() {
        let mut state = ReserverState::new("42", AgentState::default());
        assert_eq!(state.outcome(), None);

        state.phase = Phase::Finished(Outcome::Exhausted);
        assert_eq!(state.outcome(), Some(&Outcome::Exhausted));
        assert!(state.phase.is_terminal());
    }
}
