// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # ExactoBar Store
//!
//! Persistence and configuration for the ExactoBar application.
//!
//! This crate provides:
//!
//! - **RoutingConfig**: Routing engine configuration (concurrency,
//!   timeouts, roles, cost multipliers), resolved env var > config
//!   file > defaults
//! - **SettingsStore**: User preferences with persistence
//! - **CostUsageSnapshot**: Local token cost tracking shapes
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use exactobar_store::{RoutingConfig, SettingsStore};
//!
//! let routing = RoutingConfig::resolve()?;
//! let settings = SettingsStore::load_default().await?;
//! ```

pub mod config;
pub mod cost;
pub mod error;
pub mod persistence;
pub mod settings_store;

pub use config::{RoleConfig, RoutingConfig};
pub use cost::{CostUsageSnapshot, DailyCost};
pub use error::StoreError;
pub use persistence::{
    default_cache_dir, default_cache_path, default_config_dir, default_settings_path,
    load_json, load_json_or_default, save_json,
};
pub use settings_store::{
    CookieSource, DataSourceMode, LogLevel, ProviderSettings, RefreshCadence, Settings, SettingsStore,
};

#[cfg(test)]
mod persistence_tests;
