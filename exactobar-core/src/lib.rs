// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Core
//!
//! Core types and ranking logic shared across all other crates in this
//! workspace.
//!
//! This crate provides the foundational abstractions used across all other
//! crates, including:
//!
//! - Domain models (providers, usage snapshots)
//! - Error types
//! - The pure ranking/routing algorithm
//!
//! ## Key Types
//!
//! ### Provider Types
//! - [`ProviderKind`] - Enum of all supported LLM providers
//! - [`Provider`] - Provider configuration
//! - [`ProviderIdentity`] - Account identity (siloed per provider)
//! - [`ProviderMetadata`] - Provider capabilities and display info
//! - [`ProviderBranding`] - Visual styling for providers
//!
//! ### Usage Types
//! - [`UsageSnapshot`] - A single provider's usage reading
//! - [`UsagePeriod`] - Individual usage window (session, weekly, per-model, ...)
//! - [`PeriodType`] - Window classification
//! - [`Overage`] - Billing overage detail
//!
//! ### Status
//! - [`ProviderStatus`] - Provider service health
//! - [`StatusIndicator`] - Status indicator levels
//!
//! ### Ranking
//! - [`rank`] - Deterministic headroom ranking across providers
//! - [`rank_by_role`] - Same ranking, scoped to a named role's model list

pub mod error;
pub mod models;
pub mod ranking;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Provider types
    IconStyle,
    LoginMethod,
    Provider,
    ProviderBranding,
    ProviderColor,
    ProviderIdentity,
    ProviderKind,
    ProviderMetadata,
    // Usage types
    Overage,
    PeriodType,
    UsagePeriod,
    UsageSnapshot,
    // Status
    ProviderStatus,
    StatusIndicator,
};

// Re-export ranking
pub use ranking::{rank, rank_by_role, Candidate, Recommendation, RoleRecommendation};
