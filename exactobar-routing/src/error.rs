//! Routing-layer error taxonomy.

use thiserror::Error;

/// Errors raised while resolving a model or role to a ranked
/// recommendation.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// `lookup_model` found nothing and `search_models` produced no
    /// exact match either. Carries up to a handful of suggestions.
    #[error("Unknown model '{query}'{}", suggestions_suffix(.suggestions))]
    UnknownModel {
        /// The query string that failed to resolve.
        query: String,
        /// Up to a handful of alternative model ids, for display.
        suggestions: Vec<String>,
    },

    /// The model resolved, but none of its providers are configured.
    #[error("No configured provider offers '{model_name}' (offered by: {})", .offering_providers.join(", "))]
    NoConfiguredProvider {
        /// The resolved model's display name.
        model_name: String,
        /// Providers that offer the model but aren't configured.
        offering_providers: Vec<String>,
    },

    /// `get_role` found nothing. Carries every known role name, sorted.
    #[error("Unknown role '{role}' (available: {})", .available_roles.join(", "))]
    UnknownRole {
        /// The role name that failed to resolve.
        role: String,
        /// Every configured role name, sorted ascending.
        available_roles: Vec<String>,
    },

    /// Every model listed under a role had no configured provider.
    #[error("No configured provider offers any model in role '{role}'")]
    NoConfiguredProviderForRole {
        /// The role name.
        role: String,
    },
}

fn suggestions_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}
