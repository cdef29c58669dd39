//! BlueChat CLI Library
//!
//! Argument parsing, layered configuration and the terminal chat front end.

pub mod app;
pub mod cli;
pub mod config;
pub mod demo;
pub mod error;

pub use app::{parse_input, render_event, BluechatApp, ChatInput};
pub use cli::{Cli, Commands};
pub use config::{AppConfig, CliConfig};
pub use error::{CliError, Result};
