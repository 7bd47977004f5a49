//! Reservation engine.
//!
//! Drives one product from startup to a terminal outcome:
//!
//! 1. Resolve product metadata (retrying transient failures)
//! 2. Hold at the time gate until the sale opens
//! 3. Read the variant list until it is non-empty
//! 4. Select a variant and attempt a reservation
//! 5. On rejection, move the cursor forward and go back to 3
//! 6. Stop on success, when the last variant is rejected, or on a fatal error
//!
//! Every transition is a pure state change plus effect descriptions. Network
//! calls are [`Effect::Future`]s resolved through the environment's
//! [`InventoryClient`](crate::environment::InventoryClient), and all waiting is
//! expressed as [`Effect::Delay`].

use crate::environment::ReserverEnvironment;
use crate::gate::{format_remaining, GateStatus};
use crate::selector::{SelectError, Selection, VariantSelector};
use crate::types::{
    InventoryError, Outcome, Phase, Product, Reservation, ReservationUnavailable, ReserverState,
    SelectionPolicy, Variant,
};
use salegate_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};

// ============================================================================
// Actions
// ============================================================================

/// Inputs the engine reacts to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReserverAction {
    /// Begin (or retry) resolving product metadata
    Start,

    /// Product metadata resolved
    ProductLoaded {
        /// Resolved product
        product: Product,
    },

    /// Product metadata could not be resolved
    ProductFetchFailed {
        /// Classified failure
        error: InventoryError,
    },

    /// Re-check the time gate
    GateTick,

    /// Read the variant list
    FetchVariants,

    /// Variant list read
    VariantsFetched {
        /// Variants in service order, possibly empty
        variants: Vec<Variant>,
    },

    /// Variant list could not be read
    VariantFetchFailed {
        /// Classified failure
        error: InventoryError,
    },

    /// The reservation request succeeded
    ReservationConfirmed {
        /// Held reservation
        reservation: Reservation,
    },

    /// The reservation request did not produce a reservation
    ReservationFailed {
        /// Requested item and cause
        failure: ReservationUnavailable,
    },

    /// Announces the terminal outcome; no further actions follow
    Finished {
        /// How the run ended
        outcome: Outcome,
    },
}

impl ReserverAction {
    /// Whether this action ends the run
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the reservation engine
#[derive(Clone, Copy, Debug, Default)]
pub struct ReserverReducer;

type Effects = SmallVec<[Effect<ReserverAction>; 4]>;

impl ReserverReducer {
    /// Creates a new `ReserverReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fetch_product(state: &ReserverState, env: &ReserverEnvironment) -> Effect<ReserverAction> {
        let inventory = env.inventory.clone();
        let product_id = state.product_id.clone();

        Effect::Future(Box::pin(async move {
            Some(match inventory.fetch_product(&product_id).await {
                Ok(product) => ReserverAction::ProductLoaded { product },
                Err(error) => ReserverAction::ProductFetchFailed { error },
            })
        }))
    }

    fn fetch_variants(state: &ReserverState, env: &ReserverEnvironment) -> Effect<ReserverAction> {
        metrics::counter!("reserver.variant_fetches").increment(1);

        let inventory = env.inventory.clone();
        let product_id = state.product_id.clone();

        Effect::Future(Box::pin(async move {
            Some(match inventory.fetch_variants(&product_id).await {
                Ok(variants) => ReserverAction::VariantsFetched { variants },
                Err(error) => ReserverAction::VariantFetchFailed { error },
            })
        }))
    }

    fn reserve(selection: &Selection, env: &ReserverEnvironment) -> Effect<ReserverAction> {
        metrics::counter!("reserver.reservation_attempts").increment(1);

        let inventory = env.inventory.clone();
        let inventory_id = selection.variant.inventory_id.clone();
        let quantity = selection.quantity;

        Effect::Future(Box::pin(async move {
            Some(match inventory.reserve(&inventory_id, quantity).await {
                Ok(reservation) => ReserverAction::ReservationConfirmed { reservation },
                Err(cause) => ReserverAction::ReservationFailed {
                    failure: ReservationUnavailable {
                        inventory_id,
                        cause,
                    },
                },
            })
        }))
    }

    /// Enter the terminal phase and announce the outcome
    fn finish(state: &mut ReserverState, outcome: Outcome) -> Effects {
        tracing::debug!(?outcome, "Reservation run finished");
        state.phase = Phase::Finished(outcome.clone());

        smallvec![Effect::Future(Box::pin(async move {
            Some(ReserverAction::Finished { outcome })
        }))]
    }

    /// Compare the clock with the sale start; open the gate or schedule a re-check
    fn check_gate(state: &mut ReserverState, env: &ReserverEnvironment) -> Effects {
        let Some(sale_start_at) = state.product.as_ref().map(|p| p.sale_start_at) else {
            return Self::finish(
                state,
                Outcome::Fatal {
                    reason: "time gate checked before the product was loaded".to_string(),
                },
            );
        };

        match env.gate.check(env.clock.now(), sale_start_at) {
            GateStatus::Open => {
                tracing::info!("Sale is open, looking for items");
                state.phase = Phase::FetchingVariants;
                smallvec![Self::fetch_variants(state, env)]
            },
            GateStatus::Closed { remaining } => {
                if env.gate.reports_countdown() {
                    tracing::info!(
                        "Product reservation starts in {}",
                        format_remaining(remaining)
                    );
                }
                smallvec![Effect::delay(
                    env.gate.next_wake(remaining),
                    ReserverAction::GateTick
                )]
            },
        }
    }

    /// Count a failed attempt at the current position
    ///
    /// Moves to the next variant and re-reads the list, or finishes as
    /// exhausted when the current position is the last one.
    fn advance(state: &mut ReserverState, env: &ReserverEnvironment) -> Effects {
        if state.agent.at_last_variant() {
            tracing::info!("Max variant index reached");
            return Self::finish(state, Outcome::Exhausted);
        }

        state.agent.current_index += 1;
        tracing::info!(index = state.agent.current_index, "Trying the next item");
        state.phase = Phase::FetchingVariants;
        smallvec![Self::fetch_variants(state, env)]
    }

    fn on_variants(
        state: &mut ReserverState,
        variants: &[Variant],
        env: &ReserverEnvironment,
    ) -> Effects {
        if variants.is_empty() {
            tracing::info!("No items found yet, trying again");
            return smallvec![Effect::delay(
                env.timing.fetch_retry_delay,
                ReserverAction::FetchVariants
            )];
        }

        // Fixed from the first non-empty list; later lists never move it
        if state.agent.max_index.is_none() {
            state.agent.max_index = Some(variants.len() - 1);
        }

        match VariantSelector::select(variants, &mut state.agent) {
            Ok(selection) => {
                state.agent.last_selected_inventory_id =
                    Some(selection.variant.inventory_id.clone());
                state.agent.last_selected_quantity = Some(selection.quantity);
                state.phase = Phase::Reserving;
                smallvec![Self::reserve(&selection, env)]
            },
            Err(SelectError::Empty) => smallvec![Effect::delay(
                env.timing.fetch_retry_delay,
                ReserverAction::FetchVariants
            )],
            Err(error @ SelectError::OutOfRange { .. }) => {
                tracing::warn!(%error, "Variant list shrank below the current position");
                Self::advance(state, env)
            },
        }
    }
}

impl Reducer for ReserverReducer {
    type State = ReserverState;
    type Action = ReserverAction;
    type Environment = ReserverEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per engine transition
    fn reduce(
        &self,
        state: &mut ReserverState,
        action: ReserverAction,
        env: &ReserverEnvironment,
    ) -> Effects {
        match (state.phase.clone(), action) {
            (Phase::Idle | Phase::FetchingMetadata, ReserverAction::Start) => {
                state.phase = Phase::FetchingMetadata;
                smallvec![Self::fetch_product(state, env)]
            },

            (Phase::FetchingMetadata, ReserverAction::ProductLoaded { product }) => {
                tracing::info!("Starting booking for {}", product.name);
                if let SelectionPolicy::FilterMatch(terms) = &state.agent.selection_policy {
                    tracing::info!("Using filter(s) '{}'", terms.join(", "));
                }

                state.product = Some(product);
                state.phase = Phase::WaitingForSale;
                Self::check_gate(state, env)
            },

            (Phase::FetchingMetadata, ReserverAction::ProductFetchFailed { error }) => {
                if error.is_transient() {
                    tracing::warn!(%error, "Could not load product, retrying");
                    smallvec![Effect::delay(
                        env.timing.metadata_retry_delay,
                        ReserverAction::Start
                    )]
                } else {
                    let reason = format!("Invalid product '{}': {error}", state.product_id);
                    Self::finish(state, Outcome::Fatal { reason })
                }
            },

            (Phase::WaitingForSale, ReserverAction::GateTick) => Self::check_gate(state, env),

            (Phase::FetchingVariants, ReserverAction::FetchVariants) => {
                smallvec![Self::fetch_variants(state, env)]
            },

            (Phase::FetchingVariants, ReserverAction::VariantsFetched { variants }) => {
                Self::on_variants(state, &variants, env)
            },

            (Phase::FetchingVariants, ReserverAction::VariantFetchFailed { error }) => {
                tracing::warn!(%error, "Could not read variants, retrying");
                smallvec![Effect::delay(
                    env.timing.fetch_retry_delay,
                    ReserverAction::FetchVariants
                )]
            },

            (Phase::Reserving, ReserverAction::ReservationConfirmed { reservation }) => {
                let quantity = reservation
                    .quantity
                    .or(state.agent.last_selected_quantity)
                    .unwrap_or(1);
                Self::finish(
                    state,
                    Outcome::Succeeded {
                        variant_name: reservation.variant_name,
                        quantity,
                    },
                )
            },

            (Phase::Reserving, ReserverAction::ReservationFailed { failure }) => {
                metrics::counter!("reserver.reservation_failures").increment(1);
                tracing::info!(
                    inventory_id = %failure.inventory_id,
                    cause = %failure.cause,
                    "Error reserving item, possibly already fully booked"
                );
                Self::advance(state, env)
            },

            (Phase::Finished(_), ReserverAction::Finished { .. }) => SmallVec::new(),

            (phase, action) => {
                tracing::debug!(?phase, ?action, "Ignoring action outside its phase");
                SmallVec::new()
            },
        }
    }
}
