//! Apply coordinator.
//!
//! The coordinator owns the snapshot a view currently displays and drives new
//! snapshots into the view one at a time:
//!
//! ```text
//! Idle -> Diffing -> Applying -> Idle
//! ```
//!
//! Only one apply is in flight per coordinator. Later submissions wait in a
//! FIFO queue, and each diffs against whatever snapshot is current when it
//! starts, never against the snapshot from submission time.
//!
//! The view acknowledges an update by finishing the [`ApplyTicket`] it was
//! handed, typically once its animation settles. Finishing posts the
//! finalization onto the UI executor, where the current snapshot is swapped
//! in a single assignment and the completion callback runs. Completions
//! therefore fire exactly once, in submission order, and never re-entrantly
//! from inside `apply`.

mod config;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use ordo_core::logging::targets;
use ordo_core::{BoxedTask, Signal, ThreadAffinity, ThreadPool, UiExecutor};

pub use config::{DEFAULT_ANIMATION, DataSourceConfig};

use crate::diff::{Diff, TreeDiff, diff_snapshots, diff_trees};
use crate::identity::Identifier;
use crate::snapshot::{Snapshot, TreeSnapshot};

/// Callback run once an apply has been fully displayed.
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

/// A model a coordinator can diff and display.
pub trait Diffable: Clone + Send + Sync + 'static {
    /// The change list produced by [`diff_from`](Self::diff_from).
    type Diff: Send + 'static;

    /// Changes that turn `old` into `self`.
    fn diff_from(&self, old: &Self) -> Self::Diff;

    /// Number of changes in `diff`.
    fn change_count(diff: &Self::Diff) -> usize;

    /// Drops reload marks once the model is displayed.
    fn clear_reload_marks(&mut self);
}

impl<S: Identifier, I: Identifier> Diffable for Snapshot<S, I> {
    type Diff = Diff<S, I>;

    fn diff_from(&self, old: &Self) -> Self::Diff {
        diff_snapshots(old, self)
    }

    fn change_count(diff: &Self::Diff) -> usize {
        diff.len()
    }

    fn clear_reload_marks(&mut self) {
        Snapshot::clear_reload_marks(self);
    }
}

impl<I: Identifier> Diffable for TreeSnapshot<I> {
    type Diff = TreeDiff<I>;

    fn diff_from(&self, old: &Self) -> Self::Diff {
        diff_trees(old, self)
    }

    fn change_count(diff: &Self::Diff) -> usize {
        diff.len()
    }

    fn clear_reload_marks(&mut self) {
        TreeSnapshot::clear_reload_marks(self);
    }
}

/// How an apply is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOption {
    /// Replay the diff with animations of the given duration.
    Animated(Duration),
    /// Replay the diff without animating.
    WithoutAnimation,
    /// Skip the diff and rebuild the view from the new snapshot.
    UsingReloadData,
}

impl ApplyOption {
    /// Animated with [`DEFAULT_ANIMATION`].
    pub const fn animated() -> Self {
        Self::Animated(DEFAULT_ANIMATION)
    }

    /// The animation duration, if the option animates.
    pub fn animation_duration(&self) -> Option<Duration> {
        match self {
            Self::Animated(duration) => Some(*duration),
            Self::WithoutAnimation | Self::UsingReloadData => None,
        }
    }
}

impl Default for ApplyOption {
    fn default() -> Self {
        Self::animated()
    }
}

/// Coordinator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Computing the diff for the in-flight apply.
    Diffing,
    /// The view is replaying the in-flight apply.
    Applying,
}

/// What a view receives for an incremental update.
pub struct ApplyBatch<M: Diffable> {
    /// Changes from the displayed model to `snapshot`, in replay order.
    pub diff: M::Diff,
    /// The model being applied.
    pub snapshot: M,
    /// [`ApplyOption::Animated`] or [`ApplyOption::WithoutAnimation`].
    pub option: ApplyOption,
}

impl<M: Diffable> ApplyBatch<M> {
    /// Whether the view should animate the update.
    pub fn is_animated(&self) -> bool {
        self.option.animation_duration().is_some()
    }
}

impl<M: Diffable> fmt::Debug for ApplyBatch<M>
where
    M::Diff: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyBatch")
            .field("diff", &self.diff)
            .field("option", &self.option)
            .finish_non_exhaustive()
    }
}

/// Proof of an in-flight view update.
///
/// The view calls [`finish`](Self::finish) once the update is on screen.
/// Until then the coordinator keeps the previous snapshot current and later
/// applies wait. A ticket dropped without being finished finishes itself and
/// logs a warning.
#[must_use = "the apply queue stalls until the ticket is finished"]
pub struct ApplyTicket {
    id: u64,
    on_finish: Option<BoxedTask>,
    executor: Arc<dyn UiExecutor>,
}

impl ApplyTicket {
    fn new(id: u64, executor: Arc<dyn UiExecutor>, on_finish: BoxedTask) -> Self {
        Self {
            id,
            on_finish: Some(on_finish),
            executor,
        }
    }

    /// The apply this ticket belongs to.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Marks the update as displayed.
    pub fn finish(mut self) {
        self.complete();
    }

    fn complete(&mut self) {
        let Some(task) = self.on_finish.take() else {
            return;
        };
        if let Err(err) = self.executor.post(task) {
            tracing::error!(target: targets::APPLY, apply = self.id, %err, "cannot finish apply");
        }
    }
}

impl Drop for ApplyTicket {
    fn drop(&mut self) {
        if self.on_finish.is_some() {
            tracing::warn!(target: targets::APPLY, apply = self.id, "apply ticket dropped without finish");
            self.complete();
        }
    }
}

impl fmt::Debug for ApplyTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyTicket")
            .field("id", &self.id)
            .field("finished", &self.on_finish.is_none())
            .finish()
    }
}

/// The coordinator's view of a host view.
pub trait ViewDriver<M: Diffable>: Send {
    /// Replay `batch` and finish `ticket` when done.
    fn perform_batch_updates(&mut self, batch: ApplyBatch<M>, ticket: ApplyTicket);

    /// Rebuild everything from `snapshot` and finish `ticket` when done.
    fn reload_data(&mut self, snapshot: &M, ticket: ApplyTicket);
}

struct Request<M> {
    id: u64,
    snapshot: M,
    option: ApplyOption,
    completion: Option<Completion>,
}

struct QueueState<M> {
    phase: ApplyState,
    pending: VecDeque<Request<M>>,
    in_flight: Option<Request<M>>,
    /// The most recently submitted model until it is displayed.
    latest: Option<(u64, M)>,
    next_id: u64,
}

struct Inner<M: Diffable, V> {
    current: RwLock<M>,
    view: Mutex<V>,
    state: Mutex<QueueState<M>>,
    executor: Arc<dyn UiExecutor>,
    pool: Option<Arc<ThreadPool>>,
    config: DataSourceConfig,
    affinity: ThreadAffinity,
    applied: Signal<u64>,
}

/// Serializes applies into one view.
///
/// Cloning a coordinator yields another handle to the same state.
pub struct ApplyCoordinator<M: Diffable, V> {
    inner: Arc<Inner<M, V>>,
}

impl<M: Diffable, V> Clone for ApplyCoordinator<M, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M, V> ApplyCoordinator<M, V>
where
    M: Diffable,
    V: ViewDriver<M> + 'static,
{
    /// Creates a coordinator displaying `initial`.
    ///
    /// Must be called on the UI thread, the thread that drains `executor`.
    /// Background diffing uses `pool` when given, else a dedicated pool when
    /// the config names one, else [`ThreadPool::global`].
    pub fn new(
        initial: M,
        view: V,
        executor: Arc<dyn UiExecutor>,
        config: DataSourceConfig,
        pool: Option<Arc<ThreadPool>>,
    ) -> Self {
        let pool = if config.background_diffing {
            let pool = pool.or_else(|| match &config.pool {
                Some(pool_config) => match ThreadPool::new(pool_config.clone()) {
                    Ok(pool) => Some(Arc::new(pool)),
                    Err(err) => {
                        tracing::warn!(target: targets::APPLY, %err, "dedicated pool failed, sharing the global one");
                        ThreadPool::global()
                    }
                },
                None => ThreadPool::global(),
            });
            if pool.is_none() {
                tracing::warn!(target: targets::APPLY, "no background pool, diffing on the UI thread");
            }
            pool
        } else {
            None
        };
        Self {
            inner: Arc::new(Inner {
                current: RwLock::new(initial),
                view: Mutex::new(view),
                state: Mutex::new(QueueState {
                    phase: ApplyState::Idle,
                    pending: VecDeque::new(),
                    in_flight: None,
                    latest: None,
                    next_id: 1,
                }),
                executor,
                pool,
                config,
                affinity: ThreadAffinity::current(),
                applied: Signal::new(),
            }),
        }
    }

    /// Queues `snapshot` for display.
    ///
    /// Starts right away when idle. `completion` runs on the UI executor once
    /// the view has finished displaying it. Returns the apply id.
    pub fn apply(&self, snapshot: M, option: ApplyOption, completion: Option<Completion>) -> u64 {
        self.inner.affinity.debug_assert_same_thread();
        let (id, idle) = {
            let mut state = self.inner.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.latest = Some((id, snapshot.clone()));
            state.pending.push_back(Request {
                id,
                snapshot,
                option,
                completion,
            });
            (id, state.phase == ApplyState::Idle)
        };
        tracing::debug!(target: targets::APPLY, apply = id, ?option, queued = !idle, "apply submitted");
        if idle {
            Inner::start_next(&self.inner);
        }
        id
    }

    /// A copy of the displayed model.
    pub fn current(&self) -> M {
        self.inner.current.read().clone()
    }

    /// The model the view will show once every submitted apply is displayed.
    ///
    /// This is the last submitted model while applies are in flight or
    /// queued, else the displayed one. Edits derived from user actions start
    /// from here so they build on pending applies instead of reverting them.
    /// Reload marks are dropped.
    pub fn latest(&self) -> M {
        let pending = self
            .inner
            .state
            .lock()
            .latest
            .as_ref()
            .map(|(_, model)| model.clone());
        match pending {
            Some(mut model) => {
                model.clear_reload_marks();
                model
            }
            None => self.current(),
        }
    }

    /// Runs `f` against the displayed model without copying it.
    pub fn with_current<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.inner.current.read())
    }

    /// Runs `f` against the view.
    ///
    /// Must not be called from inside the view's own update callbacks.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut self.inner.view.lock())
    }

    /// Current phase.
    pub fn state(&self) -> ApplyState {
        self.inner.state.lock().phase
    }

    /// Whether nothing is in flight or queued.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.phase == ApplyState::Idle && state.pending.is_empty()
    }

    /// Number of applies waiting behind the in-flight one.
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Emitted with the apply id after each apply is displayed, before the
    /// next queued apply starts.
    pub fn applied(&self) -> &Signal<u64> {
        &self.inner.applied
    }

    /// The configuration in use.
    pub fn config(&self) -> &DataSourceConfig {
        &self.inner.config
    }
}

impl<M, V> Inner<M, V>
where
    M: Diffable,
    V: ViewDriver<M> + 'static,
{
    fn start_next(this: &Arc<Self>) {
        let request = {
            let mut state = this.state.lock();
            if state.phase != ApplyState::Idle {
                return;
            }
            let Some(request) = state.pending.pop_front() else {
                return;
            };
            state.phase = ApplyState::Diffing;
            request
        };

        if request.option == ApplyOption::UsingReloadData {
            Self::begin_applying(this, request, None);
            return;
        }

        let old = this.current.read().clone();
        match &this.pool {
            Some(pool) => {
                let new = request.snapshot.clone();
                let inner = Arc::clone(this);
                tracing::trace!(target: targets::APPLY, apply = request.id, "diffing in background");
                pool.spawn_with_callback(
                    move || new.diff_from(&old),
                    Arc::clone(&this.executor),
                    move |diff| Self::begin_applying(&inner, request, Some(diff)),
                );
            }
            None => {
                let diff = request.snapshot.diff_from(&old);
                Self::begin_applying(this, request, Some(diff));
            }
        }
    }

    fn begin_applying(this: &Arc<Self>, request: Request<M>, diff: Option<M::Diff>) {
        this.affinity.debug_assert_same_thread();
        let id = request.id;
        let option = request.option;
        let snapshot = request.snapshot.clone();
        {
            let mut state = this.state.lock();
            state.phase = ApplyState::Applying;
            state.in_flight = Some(request);
        }

        let finalize: BoxedTask = {
            let inner = Arc::clone(this);
            Box::new(move || Self::finalize(&inner, id))
        };
        let ticket = ApplyTicket::new(id, Arc::clone(&this.executor), finalize);

        let diff = match diff {
            None => {
                tracing::debug!(target: targets::APPLY, apply = id, "reloading view");
                this.view.lock().reload_data(&snapshot, ticket);
                return;
            }
            Some(diff) => diff,
        };

        let changes = M::change_count(&diff);
        if changes == 0 {
            tracing::debug!(target: targets::APPLY, apply = id, "nothing to replay");
            ticket.finish();
        } else if this.config.exceeds_reload_threshold(changes) {
            tracing::debug!(
                target: targets::APPLY,
                apply = id,
                changes,
                threshold = ?this.config.reload_threshold,
                "diff over reload threshold, reloading view"
            );
            this.view.lock().reload_data(&snapshot, ticket);
        } else {
            tracing::debug!(target: targets::APPLY, apply = id, changes, "replaying diff");
            let batch = ApplyBatch {
                diff,
                snapshot,
                option,
            };
            this.view.lock().perform_batch_updates(batch, ticket);
        }
    }

    fn finalize(this: &Arc<Self>, id: u64) {
        this.affinity.debug_assert_same_thread();
        let request = {
            let mut state = this.state.lock();
            match state.in_flight.take() {
                Some(request) if request.id == id => request,
                other => {
                    state.in_flight = other;
                    tracing::warn!(target: targets::APPLY, apply = id, "finish for an apply that is not in flight");
                    return;
                }
            }
        };

        let Request {
            mut snapshot,
            completion,
            ..
        } = request;
        snapshot.clear_reload_marks();
        *this.current.write() = snapshot;
        {
            let mut state = this.state.lock();
            if state.latest.as_ref().is_some_and(|(latest, _)| *latest == id) {
                state.latest = None;
            }
        }
        tracing::debug!(target: targets::APPLY, apply = id, "apply displayed");

        // Still `Applying` here: applies submitted from the completion or
        // from `applied` slots queue behind this one.
        if let Some(completion) = completion {
            completion();
        }
        this.applied.emit(id);
        this.state.lock().phase = ApplyState::Idle;
        Self::start_next(this);
    }
}

static_assertions::assert_impl_all!(ApplyTicket: Send);
static_assertions::assert_impl_all!(ApplyOption: Send, Sync, Copy);
