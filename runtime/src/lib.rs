//! # Salegate Runtime
//!
//! The [`Store`](store::Store) that drives a reducer: it owns the state,
//! runs the reducer for every action, executes the returned effects and
//! feeds the actions they produce back in.
//!
//! ## Example
//!
//! ```ignore
//! use salegate_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! // Kick off the state machine and wait for a terminal action
//! let last = store
//!     .send_and_wait_for(Action::Start, |a| a.is_terminal(), None)
//!     .await?;
//!
//! // Read state
//! let phase = store.state(|s| s.phase.clone()).await;
//! ```

use salegate_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is observed.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;
pub use store::Store;

/// Store module - the runtime for reducers
pub mod store {
    use super::{Arc, Effect, Reducer, RwLock, StoreError};
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Actions buffered for observers before they start lagging
    pub const BROADCAST_CAPACITY: usize = 64;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` so it can be inspected while effects run)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Every action is broadcast to subscribers *after* the reducer has
    /// applied it, so an observer that sees an action can read the state it
    /// produced.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Sync + Clone + std::fmt::Debug + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The action broadcast buffers [`BROADCAST_CAPACITY`] actions.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            let (action_broadcast, _) = broadcast::channel(BROADCAST_CAPACITY);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Broadcasts the action to subscribers
        /// 4. Spawns execution of the returned effects
        ///
        /// Returns once effects are started, not when they finish.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) {
            tracing::debug!(?action, "Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let observed = action.clone();
            let effects = {
                let mut state = self.state.write().await;
                let effects = self.reducer.reduce(&mut *state, action, &*self.environment);
                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            // No subscribers is fine
            let _ = self.action_broadcast.send(observed);

            for effect in effects {
                self.spawn_effect(effect);
            }
        }

        /// Send an action and wait for a matching action
        ///
        /// Subscribes before sending so no action can slip past, then
        /// returns the first action (the initial one included) for which
        /// `predicate` holds. With `timeout` set to `None` it waits as long as
        /// the state machine keeps running.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: timeout expired before a matching action
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Option<Duration>,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.action_broadcast.subscribe();
            self.send(action).await;

            let wait = async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, actions skipped");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            };

            match timeout {
                Some(limit) => tokio::time::timeout(limit, wait)
                    .await
                    .map_err(|_| StoreError::Timeout)?,
                None => wait.await,
            }
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let index = store.state(|s| s.current_index).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        fn spawn_effect(&self, effect: Effect<A>) {
            if effect.is_none() {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                return;
            }

            let store = self.clone();
            tokio::spawn(async move {
                store.run_effect(effect).await;
            });
        }

        /// Execute an effect to completion
        ///
        /// - `None`: no-op
        /// - `Future`: awaits the computation, sends the resulting action if `Some`
        /// - `Delay`: sleeps, then sends the action
        async fn run_effect(&self, effect: Effect<A>) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    if let Some(action) = fut.await {
                        tracing::trace!("Effect::Future produced an action, sending to store");
                        self.send(action).await;
                    } else {
                        tracing::trace!("Effect::Future completed with no action");
                    }
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tokio::time::sleep(duration).await;
                    self.send(*action).await;
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
        A: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use salegate_core::{smallvec, SmallVec};
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    struct CountdownState {
        remaining: u32,
        finished: bool,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum CountdownAction {
        Start(u32),
        Tick,
        Finished,
    }

    struct CountdownReducer;

    impl Reducer for CountdownReducer {
        type State = CountdownState;
        type Action = CountdownAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                CountdownAction::Start(n) => {
                    state.remaining = n;
                    smallvec![Effect::Future(Box::pin(async { Some(CountdownAction::Tick) }))]
                },
                CountdownAction::Tick if state.remaining == 0 => {
                    smallvec![Effect::Future(Box::pin(async { Some(CountdownAction::Finished) }))]
                },
                CountdownAction::Tick => {
                    state.remaining -= 1;
                    smallvec![Effect::delay(Duration::from_millis(1), CountdownAction::Tick)]
                },
                CountdownAction::Finished => {
                    state.finished = true;
                    SmallVec::new()
                },
            }
        }
    }

    #[tokio::test]
    async fn test_feedback_loop_runs_to_terminal_action() {
        let store = Store::new(CountdownState::default(), CountdownReducer, ());

        let last = store
            .send_and_wait_for(
                CountdownAction::Start(3),
                |a| *a == CountdownAction::Finished,
                Some(Duration::from_secs(5)),
            )
            .await
            .unwrap();

        assert_eq!(last, CountdownAction::Finished);
        // Broadcast happens after the reducer ran
        assert!(store.state(|s| s.finished).await);
        assert_eq!(store.state(|s| s.remaining).await, 0);
    }

    #[tokio::test]
    async fn test_send_and_wait_for_times_out() {
        let store = Store::new(CountdownState::default(), CountdownReducer, ());

        let result = store
            .send_and_wait_for(
                CountdownAction::Start(1_000),
                |a| *a == CountdownAction::Finished,
                Some(Duration::from_millis(20)),
            )
            .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn test_initial_action_is_observable() {
        let store = Store::new(CountdownState::default(), CountdownReducer, ());

        let first = store
            .send_and_wait_for(
                CountdownAction::Start(0),
                |a| matches!(a, CountdownAction::Start(_)),
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();

        assert_eq!(first, CountdownAction::Start(0));
    }
}
