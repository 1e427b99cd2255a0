pub mod ccsds;
pub mod code500;
pub mod config;
pub mod constants;
pub mod logging;
pub mod time_environment;
pub mod time_system;
pub mod timecore_errors;

pub use config::TimeDataConfig;
pub use time_environment::TimeEnvironment;
pub use time_system::{converter::TimeConverter, Epoch, TimeSystem};
pub use timecore_errors::{ErrorKind, TimeCoreError};
