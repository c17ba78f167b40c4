//! CLI utilities for flitevox.
//!
//! This crate provides common utilities for CLI applications.

pub mod config;
pub mod output;

pub use config::{Config, LinkedVoiceConfig, load_config, save_config};
pub use output::{Output, OutputFormat};
