use snafu::Snafu;
use snafu::prelude::*;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::application::{ConsoleNotifier, RuntimeConfig};
use crate::config::{EngineConfig, EngineConfigError};
use crate::engine::{ChangeNotifier, Engine, PassOutcome, PollDriver, Trigger, shared_tree};
use crate::reconcile::{ChangeSet, Reconciler};
use crate::storage::LocalStorage;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let file_config = EngineConfig::read(&app_config.root)
            .await
            .context(ConfigSnafu)?;
        let config = app_config.resolve(file_config).context(ConfigSnafu)?;
        debug!("Resolved config: {:?}", config);

        let storage = LocalStorage::new(&app_config.root);
        let reconciler = Reconciler::new(storage, config.tracked.clone());
        let tree = shared_tree(config.tracked.clone());

        if app_config.once {
            let driver = PollDriver::new(reconciler, tree, |_: &ChangeSet| {}, config.timing());
            return Self::run_once(&driver).await;
        }

        let notifier = ConsoleNotifier::stdout(tree.clone());
        let mut engine = Engine::new(PollDriver::new(reconciler, tree, notifier, config.timing()));
        engine.start();

        compio::signal::ctrl_c().await.context(SignalSnafu)?;
        info!("Interrupted, shutting down");
        engine.stop().await;

        Ok(())
    }

    async fn run_once<N>(driver: &PollDriver<LocalStorage, N>) -> Result<(), ApplicationError>
    where
        N: ChangeNotifier,
    {
        let outcome = driver.trigger(Trigger::Startup).await;
        let PassOutcome::Completed(report) = outcome else {
            return PassFailedSnafu.fail();
        };
        if !report.root_present {
            warn!("Tracked root is absent, nothing to show");
        }
        for path in report.deferred.iter().chain(&report.skipped) {
            debug!("Not shown yet: {}", path);
        }

        print!("{}", driver.tree().borrow().render());
        driver.shutdown().await;

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: EngineConfigError },
    #[snafu(display("Failed to listen for the interrupt signal"))]
    SignalError { source: std::io::Error },
    #[snafu(display("The tracked directory could not be scanned"))]
    PassFailedError,
}
