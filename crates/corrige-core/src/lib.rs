pub mod config;
pub mod error;
pub mod types;

pub use config::CorrigeConfig;
pub use error::{CorrigeError, Result};
pub use types::*;
