mod engine_config;

pub(crate) use engine_config::ZeroIntervalSnafu;
pub use engine_config::{EngineConfig, EngineConfigError};
