//! # ExactoBar Routing
//!
//! Resolves a model name or a user-configured role to a ranked list
//! of providers, by fetching fresh (or cached) usage snapshots for
//! every provider that offers the model and handing them to
//! `exactobar_core`'s ranking core.
//!
//! The service holds no global state: every external lookup (model
//! catalog, role catalog, provider configuration, cost multipliers,
//! strategy construction) is injected as a function value on
//! [`RoutingService`], so a caller can swap in test doubles without a
//! registry singleton.

pub mod error;
pub mod model;
pub mod service;

pub use error::RoutingError;
pub use model::{ModelInfo, RoleConfig};
pub use service::RoutingService;

#[cfg(test)]
mod tests;
