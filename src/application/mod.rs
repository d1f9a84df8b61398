mod application_impl;
mod console_notifier;
pub mod data;
mod runtime_config;

pub use application_impl::{Application, ApplicationError};
pub use console_notifier::ConsoleNotifier;
pub use runtime_config::RuntimeConfig;
