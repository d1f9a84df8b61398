use std::rc::Rc;

use futures_channel::oneshot;
use tracing::debug;

use super::{ChangeNotifier, PollDriver, SharedTree};
use crate::storage::StorageAdapter;

struct RunningLoop {
    stop: oneshot::Sender<()>,
    finished: oneshot::Receiver<()>,
}

/// Owns the polling loop of a [`PollDriver`] on the current runtime.
///
/// `start` spawns the loop, `stop` signals it and waits until the tree has
/// been torn down.
pub struct Engine<S, N> {
    driver: Rc<PollDriver<S, N>>,
    running: Option<RunningLoop>,
}

impl<S, N> Engine<S, N>
where
    S: StorageAdapter + 'static,
    N: ChangeNotifier + 'static,
{
    pub fn new(driver: PollDriver<S, N>) -> Self {
        Self {
            driver: Rc::new(driver),
            running: None,
        }
    }

    pub fn driver(&self) -> &PollDriver<S, N> {
        &self.driver
    }

    pub fn tree(&self) -> SharedTree {
        self.driver.tree()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawns the polling loop. Does nothing if it is already running.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let (stop, stop_rx) = oneshot::channel();
        let (done_tx, finished) = oneshot::channel();
        let driver = self.driver.clone();

        driver.rearm();
        compio::runtime::spawn(async move {
            driver.run(stop_rx).await;
            let _ = done_tx.send(());
        })
        .detach();

        self.running = Some(RunningLoop { stop, finished });
    }

    /// Requests a pass outside the timer, e.g. when the host's layout changes.
    /// Dropped if a pass is already in flight.
    pub fn layout_changed(&self) {
        let driver = self.driver.clone();
        compio::runtime::spawn(async move {
            driver.layout_changed().await;
        })
        .detach();
    }

    /// Stops polling and waits until every tracked node has been released.
    pub async fn stop(&mut self) {
        match self.running.take() {
            Some(RunningLoop { stop, finished }) => {
                let _ = stop.send(());
                if finished.await.is_err() {
                    debug!("Polling loop ended before signalling completion");
                    self.driver.shutdown().await;
                }
            }
            None => self.driver.shutdown().await,
        }
    }
}
