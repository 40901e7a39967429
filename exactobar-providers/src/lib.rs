// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # ExactoBar Providers
//!
//! Provider-specific implementations for the ExactoBar application.
//!
//! This crate contains the concrete implementations for each supported
//! LLM provider. Each provider module includes:
//!
//! - **Descriptor**: Static configuration (metadata, branding, fetch plan)
//! - **Strategies**: Fetch strategy implementations (CLI, OAuth, Web)
//! - **Parser**: Response parsing for various formats
//!
//! ## Supported Providers
//!
//! | Provider | CLI | OAuth | API Key | Web | Local |
//! |----------|-----|-------|---------|-----|-------|
//! | Codex (OpenAI) | ✅ | ❌ | ✅ | ❌ | ✅ |
//! | Claude (Anthropic) | ✅ | ✅ | ❌ | ✅ | ✅ |
//! | Copilot (GitHub) | ❌ | ✅ | ✅ | ❌ | ❌ |
//!
//! ## Usage
//!
//! ```ignore
//! use exactobar_providers::ProviderRegistry;
//! use exactobar_core::ProviderKind;
//! use exactobar_fetch::{FetchContext, orchestrator::OrchestratorConfig};
//!
//! // Get a provider by kind
//! let registry = ProviderRegistry::new();
//! let desc = registry.get(ProviderKind::Claude).unwrap();
//!
//! // Build the strategy list and run it through a pipeline
//! let ctx = FetchContext::new();
//! let strategies = desc.build_strategies(&ctx);
//! ```

pub mod catalog;
pub mod descriptor;
pub mod registry;

// Provider modules (alphabetical)
pub mod claude;
pub mod codex;
pub mod copilot;

// Re-export key types
pub use descriptor::{
    CliConfig, FetchPlan, ProviderDescriptor, ProviderDescriptorBuilder, TokenCostConfig,
};
pub use registry::ProviderRegistry;

// Re-export provider descriptors
pub use claude::claude_descriptor;
pub use codex::codex_descriptor;
pub use copilot::copilot_descriptor;

// Re-export strategy types for convenience
pub use claude::{ClaudeCliStrategy, ClaudeOAuthStrategy, ClaudePtyStrategy, ClaudeWebStrategy};
pub use codex::{CodexApiStrategy, CodexCliStrategy, CodexPtyStrategy, CodexRpcStrategy};
pub use copilot::{CopilotApiStrategy, CopilotEnvStrategy};
