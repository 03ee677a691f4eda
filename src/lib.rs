// Public module exports for the satchel binary and tests
pub mod api;
pub mod ask;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod poll;
pub mod session;
pub mod storage;

#[cfg(feature = "tui")]
pub mod tui;
