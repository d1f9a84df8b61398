use std::path::PathBuf;
use std::time::Duration;

use snafu::ensure;

use crate::cli::Cli;
use crate::config::{EngineConfig, EngineConfigError, ZeroIntervalSnafu};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub root: PathBuf,
    pub tracked: Option<String>,
    pub poll_interval: Option<Duration>,
    pub startup_delay: Option<Duration>,
    pub once: bool,
}

impl RuntimeConfig {
    /// Applies command line overrides on top of the file configuration.
    pub fn resolve(&self, mut config: EngineConfig) -> Result<EngineConfig, EngineConfigError> {
        if let Some(tracked) = &self.tracked {
            config.tracked = EngineConfig::normalize_tracked(tracked)?;
        }
        if let Some(interval) = self.poll_interval {
            ensure!(!interval.is_zero(), ZeroIntervalSnafu);
            config.poll_interval = interval;
        }
        if let Some(delay) = self.startup_delay {
            config.startup_delay = delay;
        }
        Ok(config)
    }
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            root: cli.root,
            tracked: cli.tracked,
            poll_interval: cli.interval_ms.map(Duration::from_millis),
            startup_delay: cli.startup_delay_ms.map(Duration::from_millis),
            once: cli.once,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_values_override_the_config_file() {
        let runtime: RuntimeConfig = Cli::parse_from(["treemirror", "--tracked", "./notes/", "-i", "50"]).into();
        let file_config = EngineConfig {
            tracked: "docs".to_string(),
            poll_interval: Duration::from_secs(5),
            startup_delay: Duration::from_millis(300),
        };

        let config = runtime.resolve(file_config).unwrap();

        assert_eq!(config.tracked, "notes");
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.startup_delay, Duration::from_millis(300));
    }

    #[test]
    fn missing_overrides_keep_file_values() {
        let runtime: RuntimeConfig = Cli::parse_from(["treemirror"]).into();

        let config = runtime.resolve(EngineConfig::default()).unwrap();

        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn zero_interval_override_is_rejected() {
        let runtime: RuntimeConfig = Cli::parse_from(["treemirror", "--interval-ms", "0"]).into();

        let result = runtime.resolve(EngineConfig::default());

        assert!(matches!(result, Err(EngineConfigError::ZeroInterval)));
    }
}
