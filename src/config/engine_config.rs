use compio::{fs::File, io::AsyncReadExt, io::BufReader};
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use std::{
    borrow::Cow,
    io::{Cursor, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

use crate::engine::{DEFAULT_POLL_INTERVAL, DEFAULT_STARTUP_DELAY, PollTiming};

const CONFIG_FILE_NAME: &str = "treemirror.yaml";

const DEFAULT_TRACKED: &str = ".claude";

fn get_config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Tracked root, relative to the host root.
    pub tracked: String,
    pub poll_interval: Duration,
    pub startup_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tracked: DEFAULT_TRACKED.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }
}

impl EngineConfig {
    /// Reads `treemirror.yaml` under `root`. A missing file yields defaults.
    pub async fn read(root: &Path) -> Result<Self, EngineConfigError> {
        Self::from_path(get_config_file_path(root)).await
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, EngineConfigError> {
        debug!("Opening config file: {}", path.display());
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).context(ReadSnafu {
                    file_path: path.display().to_string(),
                });
            }
        };

        let cursor = Cursor::new(file);
        let mut reader = BufReader::new(cursor);
        let res = reader.read_to_string(String::new()).await;
        match res.0 {
            Ok(n) => debug!("Successfully read config file: {n} bytes"),
            _ => {
                res.0.context(ReadSnafu {
                    file_path: path.display().to_string(),
                })?;
            }
        }
        res.1.as_str().try_into()
    }

    pub fn timing(&self) -> PollTiming {
        PollTiming {
            interval: self.poll_interval,
            startup_delay: self.startup_delay,
        }
    }

    /// Normalizes a tracked root: no leading `./`, no trailing `/`, and it
    /// must stay below the host root.
    pub fn normalize_tracked(tracked: &str) -> Result<String, EngineConfigError> {
        let trimmed = tracked.trim();
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed).trim_end_matches('/');
        ensure!(!trimmed.is_empty() && trimmed != ".", EmptyTrackedSnafu);
        ensure!(
            !trimmed.starts_with('/') && !trimmed.split('/').any(|segment| segment == ".." || segment.is_empty()),
            TrackedOutsideHostSnafu { tracked }
        );
        Ok(trimmed.to_string())
    }

    fn parse_millis(top_level: &LinkedHashMap<Yaml, Yaml>, key: &'static str) -> Result<Option<Duration>, EngineConfigError> {
        match top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key)))) {
            None => Ok(None),
            Some(Yaml::Value(Scalar::Integer(ms))) if *ms >= 0 => Ok(Some(Duration::from_millis(*ms as u64))),
            Some(value) => InvalidValueSnafu {
                key,
                value: format!("{:?}", value),
            }
            .fail(),
        }
    }
}

impl TryFrom<&str> for EngineConfig {
    type Error = EngineConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let contents_vec = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(contents) = contents_vec.first() else {
            // An empty file configures nothing.
            return Ok(Self::default());
        };

        let top_level = contents.as_mapping().context(TopLevelNotMapSnafu)?;
        let mut config = Self::default();

        if let Some(tracked) = top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed("tracked")))) {
            let tracked = tracked.as_str().context(InvalidValueSnafu {
                key: "tracked",
                value: format!("{:?}", tracked),
            })?;
            config.tracked = Self::normalize_tracked(tracked)?;
        }
        if let Some(interval) = Self::parse_millis(top_level, "pollIntervalMs")? {
            ensure!(!interval.is_zero(), ZeroIntervalSnafu);
            config.poll_interval = interval;
        }
        if let Some(delay) = Self::parse_millis(top_level, "startupDelayMs")? {
            config.startup_delay = delay;
        }

        for key in top_level.keys() {
            match key.as_str() {
                Some("tracked" | "pollIntervalMs" | "startupDelayMs") => {}
                _ => debug!("Skipping unknown config entry: {:?}", key),
            }
        }

        Ok(config)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Invalid value for '{}': {}", key, value))]
    InvalidValue { key: String, value: String },
    #[snafu(display("Poll interval must be greater than zero"))]
    ZeroInterval,
    #[snafu(display("Tracked root must not be empty"))]
    EmptyTracked,
    #[snafu(display("Tracked root '{}' must be a relative path below the host root", tracked))]
    TrackedOutsideHost { tracked: String },
}
