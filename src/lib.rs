pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod sample;
pub mod services;
pub mod table;

pub use crate::core::*;
pub use config::ServiceConfig;
pub use error::{FactsheetError, Result};
pub use services::*;
pub use table::*;
