pub mod callback;
pub mod config;
pub mod error;
pub mod net;
pub mod scheduler;
pub mod sys;
pub mod telemetry;
pub mod time;
pub mod units;

pub use error::{AraneidError, Result};
pub use scheduler::Scheduler;
