//! # Salegate Reserver
//!
//! A reservation agent for time-gated ticket sales. Given a product id it
//! resolves the product, waits for the sale to open, then walks the variant
//! list trying to reserve one, preferring variants that match the operator's
//! filter terms.
//!
//! The engine is a [`ReserverReducer`] run by a [`Store`]: all I/O goes through
//! the [`InventoryClient`] in the environment and all waiting is an effect,
//! so the whole run can be driven against a scripted client and a fixed clock.
//!
//! ```ignore
//! let store = Store::new(
//!     ReserverState::new("42", config.agent_state()),
//!     ReserverReducer::new(),
//!     ReserverEnvironment::new(Arc::new(SystemClock), Arc::new(client)),
//! );
//! match run_until_finished(&store, None).await? {
//!     Outcome::Succeeded { variant_name, .. } => println!("{variant_name}"),
//!     other => eprintln!("{other:?}"),
//! }
//! ```

pub mod config;
pub mod environment;
pub mod gate;
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;
pub mod reducer;
pub mod selector;
pub mod types;

pub use config::{Cli, Config, ConfigError};
pub use environment::{InventoryClient, ReserverEnvironment, RetryTiming};
pub use gate::{GateStatus, TimeGate};
pub use reducer::{ReserverAction, ReserverReducer};
pub use selector::{SelectError, Selection, VariantSelector};
pub use types::{
    AgentState, InventoryError, Outcome, Phase, Product, QuantityPolicy, Reservation,
    ReservationUnavailable, ReserverState, SelectionPolicy, Variant,
};

use salegate_runtime::{Store, StoreError};
use std::time::Duration;

/// Store running the reservation engine
pub type ReserverStore = Store<ReserverState, ReserverAction, ReserverEnvironment, ReserverReducer>;

/// Start the engine and wait for its outcome
///
/// # Errors
///
/// [`StoreError::Timeout`] if `timeout` elapses first,
/// [`StoreError::ChannelClosed`] if the store stops broadcasting.
pub async fn run_until_finished(
    store: &ReserverStore,
    timeout: Option<Duration>,
) -> Result<Outcome, StoreError> {
    let action = store
        .send_and_wait_for(ReserverAction::Start, ReserverAction::is_terminal, timeout)
        .await?;

    match action {
        ReserverAction::Finished { outcome } => Ok(outcome),
        // The predicate only lets `Finished` through
        _ => Err(StoreError::ChannelClosed),
    }
}
