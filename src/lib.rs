pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod screen;
pub mod tui;

pub use client::{Answer, Citation, Dispatcher, QueryClient};
pub use config::{Config, Endpoint};
pub use error::{Error, Result};
