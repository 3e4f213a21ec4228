//! # Tixchain Runtime
//!
//! The [`Store`] owns the state of one flow, runs its reducer and executes
//! the effects the reducer returns.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Spawns effect work on tokio and feeds produced actions back
//! - **Effect Handle**: Lets a caller wait until the effects of an action finished
//!
//! ## Example
//!
//! ```ignore
//! use tixchain_runtime::Store;
//!
//! let store = Store::new(PurchaseState::new(event_id), PurchaseReducer::new(), env);
//!
//! let mut handle = store.send(PurchaseAction::Load { event_id, wallet }).await?;
//! handle.wait().await;
//!
//! let eligibility = store.state(PurchaseState::eligibility).await;
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tixchain_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{broadcast, watch, RwLock};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for an action or for effects
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Effect tracking mode - controls which effects an [`EffectHandle`] waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    /// Track only the effects returned for the sent action
    #[default]
    Direct,

    /// Also track effects of every action fed back by those effects,
    /// transitively (a purchase, its confirmation, the refresh reads and the
    /// status cooldown all count)
    Cascading,
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send`]. Await [`EffectHandle::wait`] to know when the
/// effects produced by that action are done.
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new(mode: TrackingMode) -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            mode,
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new(TrackingMode::Direct);
        handle
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, so nothing can still be running
                break;
            }
        }
    }

    /// Wait for all tracked effects with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the effects are still running when
    /// `timeout` elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: tracking context carried through effect execution
#[derive(Clone)]
struct EffectTracking {
    mode: TrackingMode,
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }

    /// Tracking used for an action an effect fed back into the store
    fn for_feedback(&self) -> Self {
        match self.mode {
            TrackingMode::Cascading => self.clone(),
            TrackingMode::Direct => EffectHandle::new(TrackingMode::Direct).1,
        }
    }
}

/// Internal: RAII guard that decrements effect counters on drop, so a
/// panicking effect still completes its handle
struct DecrementGuard {
    tracking: EffectTracking,
    pending: Arc<AtomicUsize>,
}

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.tracking.decrement();
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The Store - runtime coordinator for a reducer
///
/// The Store manages:
/// 1. State (behind `RwLock` for concurrent access)
/// 2. Reducer (flow logic)
/// 3. Environment (injected dependencies)
/// 4. Effect execution (with feedback loop)
///
/// Cloning a `Store` is cheap; clones share the same state.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: Arc<R>,
    environment: Arc<E>,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    /// Every action produced by an effect is broadcast here before it is
    /// reduced, so callers can await call results.
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: Arc::clone(&self.reducer),
            environment: Arc::clone(&self.environment),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + std::fmt::Debug + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
    }

    /// Create a new store with a custom action broadcast capacity
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity.max(1));

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer: Arc::new(reducer),
            environment: Arc::new(environment),
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
        }
    }

    /// Send an action to the store
    ///
    /// Runs the reducer under the state write lock, then starts the returned
    /// effects. Returns once effects are *started*; use the handle to wait for
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        self.send_with_mode(action, TrackingMode::Direct).await
    }

    /// Send an action and track every effect it transitively causes
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn send_cascading(&self, action: A) -> Result<EffectHandle, StoreError> {
        self.send_with_mode(action, TrackingMode::Cascading).await
    }

    async fn send_with_mode(
        &self,
        action: A,
        mode: TrackingMode,
    ) -> Result<EffectHandle, StoreError> {
        let (handle, tracking) = EffectHandle::new(mode);
        self.dispatch(action, tracking).await?;
        Ok(handle)
    }

    /// Send an action and wait for a feedback action matching `predicate`
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    /// - [`StoreError::Timeout`] if no matching action arrives in time
    /// - [`StoreError::ChannelClosed`] if the broadcast channel closed
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        // Subscribe before sending so the result cannot slip past
        let mut rx = self.action_broadcast.subscribe();

        self.send(action).await?;

        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Action observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Subscribe to actions produced by effects
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Read from the current state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&*state)
    }

    /// Number of effects currently running in this store
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::SeqCst)
    }

    /// Stop accepting actions and wait for running effects
    ///
    /// After shutdown, actions fed back by still-running effects are dropped
    /// instead of being applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when `timeout` elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating store shutdown");
        self.shutdown.store(true, Ordering::Release);

        let start = tokio::time::Instant::now();
        let poll_interval = Duration::from_millis(50);

        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);
            if pending == 0 {
                tracing::info!("Store shut down cleanly");
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(pending_effects = pending, "Store shutdown timed out");
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn dispatch(&self, action: A, tracking: EffectTracking) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!(?action, "Rejected action: store is shutting down");
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            return Err(StoreError::ShutdownInProgress);
        }

        tracing::debug!(?action, "Processing action");
        metrics::counter!("store.actions.total").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            self.reducer.reduce(&mut state, action, &self.environment)
        };

        tracing::trace!(count = effects.len(), "Executing effects");
        for effect in effects {
            self.execute(effect, tracking.clone());
        }

        Ok(())
    }

    /// Starts tracking a spawned effect; the guard undoes it on drop
    fn track(&self, tracking: &EffectTracking) -> DecrementGuard {
        tracking.increment();
        self.pending_effects.fetch_add(1, Ordering::SeqCst);
        DecrementGuard {
            tracking: tracking.clone(),
            pending: Arc::clone(&self.pending_effects),
        }
    }

    async fn feed_back(&self, action: A, tracking: &EffectTracking) {
        let _ = self.action_broadcast.send(action.clone());
        if let Err(error) = self.dispatch(action, tracking.for_feedback()).await {
            tracing::debug!(%error, "Feedback action dropped");
        }
    }

    #[allow(clippy::needless_pass_by_value)] // tracking is cloned into spawned tasks
    fn execute(&self, effect: Effect<A>, tracking: EffectTracking) {
        match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            },
            Effect::Future(fut) => {
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                let guard = self.track(&tracking);
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    if let Some(action) = fut.await {
                        store.feed_back(action, &tracking).await;
                    }
                });
            },
            Effect::Delay { duration, action } => {
                metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                let guard = self.track(&tracking);
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    tokio::time::sleep(duration).await;
                    store.feed_back(*action, &tracking).await;
                });
            },
            Effect::Parallel(effects) => {
                metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                for effect in effects {
                    self.execute(effect, tracking.clone());
                }
            },
            Effect::Sequential(effects) => {
                metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                let guard = self.track(&tracking);
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    // The outer guard stays alive until every step is done
                    for effect in effects {
                        let (mut step, step_tracking) = EffectHandle::new(tracking.mode);
                        store.execute(effect, step_tracking);
                        step.wait().await;
                    }
                });
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use tixchain_core::{smallvec, SmallVec};

    #[derive(Debug, Clone, Default)]
    struct CounterState {
        value: i32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum CounterAction {
        Increment,
        IncrementLater,
        IncrementAfter(Duration),
        IncrementTwiceInOrder,
        Chain(u8),
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = CounterState;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut CounterState,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                CounterAction::IncrementLater => {
                    smallvec![Effect::Future(Box::pin(async { Some(CounterAction::Increment) }))]
                },
                CounterAction::IncrementAfter(duration) => smallvec![Effect::Delay {
                    duration,
                    action: Box::new(CounterAction::Increment),
                }],
                CounterAction::IncrementTwiceInOrder => smallvec![Effect::chain(vec![
                    Effect::Future(Box::pin(async { Some(CounterAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(CounterAction::Increment) })),
                ])],
                CounterAction::Chain(0) => smallvec![Effect::None],
                CounterAction::Chain(n) => {
                    state.value += 1;
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(CounterAction::Chain(n - 1))
                    }))]
                },
            }
        }
    }

    fn store() -> Store<CounterState, CounterAction, (), CounterReducer> {
        Store::new(CounterState::default(), CounterReducer, ())
    }

    #[tokio::test]
    async fn send_runs_reducer() {
        let store = store();
        store.send(CounterAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn future_effect_feeds_action_back() {
        let store = store();
        let mut handle = store.send(CounterAction::IncrementLater).await.unwrap();
        handle.wait().await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_effect_waits_before_dispatch() {
        let store = store();
        let mut handle = store
            .send(CounterAction::IncrementAfter(Duration::from_secs(3)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.state(|s| s.value).await, 0);

        handle.wait().await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn sequential_effects_all_complete() {
        let store = store();
        let mut handle = store.send(CounterAction::IncrementTwiceInOrder).await.unwrap();
        handle.wait().await;
        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test]
    async fn cascading_handle_waits_for_whole_chain() {
        let store = store();
        let mut handle = store.send_cascading(CounterAction::Chain(5)).await.unwrap();
        handle.wait().await;
        assert_eq!(store.state(|s| s.value).await, 5);
    }

    #[tokio::test]
    async fn send_and_wait_for_returns_feedback_action() {
        let store = store();
        let action = store
            .send_and_wait_for(
                CounterAction::IncrementLater,
                |a| matches!(a, CounterAction::Increment),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(action, CounterAction::Increment);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = store();
        store.shutdown(Duration::from_secs(1)).await.unwrap();
        let result = store.send(CounterAction::Increment).await;
        assert_eq!(result.unwrap_err(), StoreError::ShutdownInProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn feedback_after_shutdown_is_dropped() {
        let store = store();
        store
            .send(CounterAction::IncrementAfter(Duration::from_millis(200)))
            .await
            .unwrap();

        store.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 0);
        assert_eq!(store.pending_effects(), 0);
    }

    #[test]
    fn completed_handle_has_nothing_pending() {
        assert_eq!(EffectHandle::completed().pending(), 0);
    }
}
