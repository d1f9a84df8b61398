//! Polling lifecycle around the reconciler: the single-flight driver, the
//! change notification boundary, and start/stop hooks.

mod lifecycle;
mod notifier;
mod poll_driver;

pub use lifecycle::Engine;
pub use notifier::ChangeNotifier;
pub use poll_driver::{DEFAULT_POLL_INTERVAL, DEFAULT_STARTUP_DELAY, DriverState, PassOutcome, PollDriver, PollTiming, SharedTree, Trigger, shared_tree};
