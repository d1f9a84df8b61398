use std::cell::{Cell, RefCell};
use std::pin::pin;
use std::rc::Rc;
use std::time::Duration;

use compio::time::sleep;
use derive_more::Display;
use futures::future::{Either, select};
use futures_channel::oneshot;
use snafu::Report;
use tracing::{debug, info, warn};

use super::ChangeNotifier;
use crate::reconcile::{PassReport, Reconciler};
use crate::storage::StorageAdapter;
use crate::tree::TreeIndex;

/// Tree handle shared with readers. Only the driver's passes mutate it.
pub type SharedTree = Rc<RefCell<TreeIndex>>;

pub fn shared_tree(root: impl Into<String>) -> SharedTree {
    Rc::new(RefCell::new(TreeIndex::new(root)))
}

/// Default delay between the end of one pass and the next timer tick.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Default wait between the host's layout becoming ready and the first pass.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub interval: Duration,
    /// Wait before the startup pass.
    pub startup_delay: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Trigger {
    #[display("startup")]
    Startup,
    #[display("timer")]
    Timer,
    #[display("layout change")]
    LayoutChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Reconciling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Another pass was in flight, or the driver is shut down.
    Dropped,
    Completed(PassReport),
    /// The pass was aborted; the next trigger retries.
    Failed,
}

/// Single-flight trigger for reconciliation passes.
///
/// Every trigger source (timer, startup, layout changes) funnels through
/// [`PollDriver::trigger`]. A trigger that arrives while a pass is running is
/// dropped, so passes never overlap and the tree keeps a single writer.
pub struct PollDriver<S, N> {
    reconciler: Reconciler<S>,
    notifier: N,
    tree: SharedTree,
    timing: PollTiming,
    state: Cell<DriverState>,
    stopped: Cell<bool>,
    idle_waiters: RefCell<Vec<oneshot::Sender<()>>>,
}

impl<S: StorageAdapter, N: ChangeNotifier> PollDriver<S, N> {
    pub fn new(reconciler: Reconciler<S>, tree: SharedTree, notifier: N, timing: PollTiming) -> Self {
        Self {
            reconciler,
            notifier,
            tree,
            timing,
            state: Cell::new(DriverState::Idle),
            stopped: Cell::new(false),
            idle_waiters: RefCell::new(Vec::new()),
        }
    }

    pub fn tree(&self) -> SharedTree {
        self.tree.clone()
    }

    pub fn state(&self) -> DriverState {
        self.state.get()
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Runs one pass unless one is already in flight.
    pub async fn trigger(&self, trigger: Trigger) -> PassOutcome {
        if self.stopped.get() {
            debug!("Ignoring {} trigger after shutdown", trigger);
            return PassOutcome::Dropped;
        }
        if self.state.get() == DriverState::Reconciling {
            debug!("Dropping {} trigger, a pass is already running", trigger);
            return PassOutcome::Dropped;
        }

        let _guard = ReconcilingGuard::enter(&self.state, &self.idle_waiters);
        debug!("Starting pass on {} trigger", trigger);

        match self.reconciler.reconcile(&self.tree).await {
            Ok(report) => {
                if !report.changes.is_empty() {
                    self.notifier.on_changed(&report.changes);
                }
                PassOutcome::Completed(report)
            }
            Err(e) => {
                warn!("Reconciliation pass failed: {}", Report::from_error(e));
                PassOutcome::Failed
            }
        }
    }

    pub async fn layout_changed(&self) -> PassOutcome {
        self.trigger(Trigger::LayoutChanged).await
    }

    /// Polls until `stop` fires or its sender is dropped, then tears down.
    ///
    /// The timer is re-armed only after a pass completes, so timer ticks
    /// never overlap a pass.
    pub async fn run(&self, mut stop: oneshot::Receiver<()>) {
        info!(
            "Polling '{}' every {:?}",
            self.reconciler.root(),
            self.timing.interval
        );

        if !self.timing.startup_delay.is_zero() {
            let delay = pin!(sleep(self.timing.startup_delay));
            if let Either::Right(_) = select(delay, &mut stop).await {
                self.shutdown().await;
                return;
            }
        }

        self.trigger(Trigger::Startup).await;
        loop {
            let tick = pin!(sleep(self.timing.interval));
            match select(tick, &mut stop).await {
                Either::Left(_) => {
                    self.trigger(Trigger::Timer).await;
                }
                Either::Right(_) => break,
            }
        }

        self.shutdown().await;
    }

    /// Stops accepting triggers, waits for an in-flight pass, then drops
    /// every node without notifying.
    pub async fn shutdown(&self) {
        self.stopped.set(true);
        self.wait_idle().await;

        let mut tree = self.tree.borrow_mut();
        let tracked = tree.len();
        tree.clear();
        info!(
            "Stopped tracking '{}' ({} paths released)",
            self.reconciler.root(),
            tracked
        );
    }

    /// Accepts triggers again after a shutdown.
    pub(super) fn rearm(&self) {
        self.stopped.set(false);
    }

    async fn wait_idle(&self) {
        if self.state.get() == DriverState::Idle {
            return;
        }
        let (sender, receiver) = oneshot::channel();
        self.idle_waiters.borrow_mut().push(sender);
        let _ = receiver.await;
    }
}

/// Holds the driver in `Reconciling`; dropping it returns to `Idle` and wakes
/// anyone waiting for the pass to finish, even if the pass was cancelled.
struct ReconcilingGuard<'a> {
    state: &'a Cell<DriverState>,
    idle_waiters: &'a RefCell<Vec<oneshot::Sender<()>>>,
}

impl<'a> ReconcilingGuard<'a> {
    fn enter(state: &'a Cell<DriverState>, idle_waiters: &'a RefCell<Vec<oneshot::Sender<()>>>) -> Self {
        state.set(DriverState::Reconciling);
        Self {
            state,
            idle_waiters,
        }
    }
}

impl Drop for ReconcilingGuard<'_> {
    fn drop(&mut self) {
        self.state.set(DriverState::Idle);
        for waiter in self.idle_waiters.borrow_mut().drain(..) {
            let _ = waiter.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::ChangeSet;
    use crate::storage::MemoryStorage;
    use futures::executor::block_on;
    use futures::join;

    const ROOT: &str = ".claude";

    type ChangeLog = Rc<RefCell<Vec<ChangeSet>>>;
    type TestDriver = PollDriver<Rc<MemoryStorage>, Box<dyn Fn(&ChangeSet)>>;

    fn setup(timing: PollTiming) -> (Rc<MemoryStorage>, TestDriver, ChangeLog) {
        let storage = Rc::new(MemoryStorage::new());
        let log: ChangeLog = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let notifier: Box<dyn Fn(&ChangeSet)> =
            Box::new(move |changes: &ChangeSet| sink.borrow_mut().push(changes.clone()));
        let driver = PollDriver::new(
            Reconciler::new(storage.clone(), ROOT),
            shared_tree(ROOT),
            notifier,
            timing,
        );
        (storage, driver, log)
    }

    fn completed(outcome: PassOutcome) -> PassReport {
        match outcome {
            PassOutcome::Completed(report) => report,
            other => panic!("Expected a completed pass, got {:?}", other),
        }
    }

    #[test]
    fn overlapping_triggers_run_a_single_scan() {
        let (storage, driver, _log) = setup(PollTiming::default());
        storage.add_file(".claude/a.md", 1);
        let gate = storage.gate_next_list();

        let (first, second, third) = block_on(async {
            join!(
                driver.trigger(Trigger::Startup),
                async {
                    assert_eq!(driver.state(), DriverState::Reconciling);
                    driver.trigger(Trigger::Timer).await
                },
                async {
                    let outcome = driver.layout_changed().await;
                    let _ = gate.send(());
                    outcome
                }
            )
        });

        assert!(matches!(first, PassOutcome::Completed(_)));
        assert_eq!(second, PassOutcome::Dropped);
        assert_eq!(third, PassOutcome::Dropped);
        assert_eq!(storage.exists_calls(), 1);
        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn driver_accepts_triggers_again_after_a_pass() {
        let (storage, driver, _log) = setup(PollTiming::default());
        storage.add_folder(ROOT);

        block_on(driver.trigger(Trigger::Startup));
        block_on(driver.trigger(Trigger::Timer));

        assert_eq!(storage.exists_calls(), 2);
    }

    #[test]
    fn notifies_once_per_changed_pass_only() {
        let (storage, driver, log) = setup(PollTiming::default());
        storage.add_file(".claude/x/y.md", 1);

        block_on(driver.trigger(Trigger::Startup));
        block_on(driver.trigger(Trigger::Timer));
        storage.remove(".claude/x");
        block_on(driver.trigger(Trigger::Timer));

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].top_level_added().collect::<Vec<_>>(), vec![ROOT]);
        assert_eq!(log[1].top_level_removed().collect::<Vec<_>>(), vec![".claude/x"]);
    }

    #[test]
    fn notification_sees_the_committed_tree() {
        let storage = Rc::new(MemoryStorage::new());
        storage.add_file(".claude/a/b.md", 1);
        let tree = shared_tree(ROOT);
        let reader = tree.clone();
        let seen = Rc::new(Cell::new(false));
        let seen_by_notifier = seen.clone();
        let notifier = move |changes: &ChangeSet| {
            let tree = reader.borrow();
            assert!(changes.added.iter().all(|path| tree.contains(path)));
            seen_by_notifier.set(true);
        };
        let driver = PollDriver::new(
            Reconciler::new(storage, ROOT),
            tree,
            notifier,
            PollTiming::default(),
        );

        block_on(driver.trigger(Trigger::Startup));

        assert!(seen.get());
    }

    #[test]
    fn failed_pass_returns_to_idle_and_retries() {
        let (storage, driver, log) = setup(PollTiming::default());
        storage.add_file(".claude/a.md", 1);
        storage.set_unavailable(true);

        let outcome = block_on(driver.trigger(Trigger::Timer));

        assert_eq!(outcome, PassOutcome::Failed);
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(log.borrow().is_empty());

        storage.set_unavailable(false);
        let report = completed(block_on(driver.trigger(Trigger::Timer)));
        assert!(report.changes.added.contains(".claude/a.md"));
    }

    #[test]
    fn cancelled_pass_releases_the_gate() {
        let (storage, driver, _log) = setup(PollTiming::default());
        storage.add_folder(ROOT);
        let _gate = storage.gate_next_list();

        {
            let pass = pin!(driver.trigger(Trigger::Startup));
            let waker = futures::task::noop_waker();
            let mut context = std::task::Context::from_waker(&waker);
            assert!(pass.poll(&mut context).is_pending());
            assert_eq!(driver.state(), DriverState::Reconciling);
        }

        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn shutdown_waits_for_the_in_flight_pass() {
        let (storage, driver, log) = setup(PollTiming::default());
        storage.add_file(".claude/a.md", 1);
        let gate = storage.gate_next_list();

        let (outcome, _, _) = block_on(async {
            join!(
                driver.trigger(Trigger::Startup),
                driver.shutdown(),
                async {
                    let _ = gate.send(());
                }
            )
        });

        let report = completed(outcome);
        assert!(report.changes.added.contains(".claude/a.md"));
        assert_eq!(log.borrow().len(), 1);
        assert!(driver.tree().borrow().is_empty());
        assert!(driver.is_stopped());
    }

    #[test]
    fn shutdown_tears_down_silently_and_drops_later_triggers() {
        let (storage, driver, log) = setup(PollTiming::default());
        storage.add_file(".claude/a/b.md", 1);
        block_on(driver.trigger(Trigger::Startup));

        block_on(driver.shutdown());
        let outcome = block_on(driver.trigger(Trigger::Timer));

        assert_eq!(outcome, PassOutcome::Dropped);
        assert!(driver.tree().borrow().is_empty());
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(storage.exists_calls(), 1);
    }

    #[compio::test]
    async fn run_polls_until_stopped() {
        let (storage, driver, log) = setup(PollTiming {
            interval: Duration::from_millis(10),
            startup_delay: Duration::ZERO,
        });
        storage.add_folder(ROOT);
        let (stop_tx, stop_rx) = oneshot::channel();

        join!(driver.run(stop_rx), async {
            sleep(Duration::from_millis(30)).await;
            assert!(driver.tree().borrow().contains(ROOT));

            storage.add_file(".claude/late.md", 1);
            sleep(Duration::from_millis(60)).await;
            assert!(driver.tree().borrow().contains(".claude/late.md"));

            let _ = stop_tx.send(());
        });

        assert!(driver.tree().borrow().is_empty());
        assert_eq!(log.borrow().len(), 2);
        assert!(storage.exists_calls() >= 3);
    }

    #[compio::test]
    async fn startup_pass_runs_before_the_first_tick() {
        let (storage, driver, _log) = setup(PollTiming {
            interval: Duration::from_secs(3600),
            startup_delay: Duration::ZERO,
        });
        storage.add_file(".claude/a.md", 1);
        let (stop_tx, stop_rx) = oneshot::channel();

        join!(driver.run(stop_rx), async {
            sleep(Duration::from_millis(20)).await;
            assert!(driver.tree().borrow().contains(".claude/a.md"));
            drop(stop_tx);
        });

        assert_eq!(storage.exists_calls(), 1);
    }

    #[test]
    fn default_timing_waits_before_the_first_pass() {
        let timing = PollTiming::default();

        assert_eq!(timing.interval, Duration::from_secs(2));
        assert_eq!(timing.startup_delay, Duration::from_millis(100));
    }

    #[compio::test]
    async fn startup_pass_waits_for_the_delay() {
        let (storage, driver, _log) = setup(PollTiming {
            interval: Duration::from_secs(3600),
            startup_delay: Duration::from_millis(50),
        });
        storage.add_folder(ROOT);
        let (stop_tx, stop_rx) = oneshot::channel();

        join!(driver.run(stop_rx), async {
            sleep(Duration::from_millis(10)).await;
            assert_eq!(storage.exists_calls(), 0);
            sleep(Duration::from_millis(100)).await;
            assert!(driver.tree().borrow().contains(ROOT));
            let _ = stop_tx.send(());
        });

        assert_eq!(storage.exists_calls(), 1);
    }

    #[compio::test]
    async fn stop_during_startup_delay_skips_every_pass() {
        let (storage, driver, _log) = setup(PollTiming {
            interval: Duration::from_millis(10),
            startup_delay: Duration::from_secs(3600),
        });
        storage.add_folder(ROOT);
        let (stop_tx, stop_rx) = oneshot::channel();

        join!(driver.run(stop_rx), async {
            sleep(Duration::from_millis(20)).await;
            let _ = stop_tx.send(());
        });

        assert_eq!(storage.exists_calls(), 0);
        assert!(driver.is_stopped());
    }
}
