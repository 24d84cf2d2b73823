pub mod app;
pub mod comparison;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod quiz;
pub mod scheduler;
pub mod server;
pub mod shell;

pub use app::Academy;
pub use config::Config;
pub use error::{AcademyError, Result};
