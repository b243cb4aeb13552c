//! Configuration types shared by the handoff core and its collaborators.
//!
//! - [`Configuration`] is the remote configuration served by the gateway. It
//!   decides whether a provider is enabled and carries per-provider settings.
//! - [`LiteralOrEnv`] lets local configuration files reference secrets held in
//!   environment variables instead of spelling them out.
//!
//! # Environment Variable Resolution
//!
//! ```json
//! {
//!   "gateway_url": "https://gateway.example/v1/",  // Literal value
//!   "authorization": "$PAYSWITCH_AUTHORIZATION",   // Simple env var
//!   "return_url_scheme": "${RETURN_SCHEME}"        // Braced env var
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use crate::provider::Provider;

/// Remote configuration, fetched at most once per flow build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Gateway environment name, e.g. `sandbox` or `production`.
    #[serde(default)]
    pub environment: String,
    /// Names of enabled features, see [`ProviderProfile::feature`](crate::provider::ProviderProfile::feature).
    #[serde(default)]
    pub enabled_features: HashSet<String>,
    #[serde(default)]
    pub providers: HashMap<Provider, ProviderSettings>,
}

/// Provider-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    /// Host the provider's approval URLs must belong to, if constrained.
    #[serde(default)]
    pub authorization_domain: Option<String>,
}

impl Configuration {
    pub fn is_feature_enabled(&self, name: &str) -> bool {
        self.enabled_features.contains(name)
    }

    pub fn provider_settings(&self, provider: Provider) -> Option<&ProviderSettings> {
        self.providers.get(&provider)
    }

    /// Builder-style helper, mostly for tests and fixtures.
    pub fn with_feature<S: Into<String>>(mut self, name: S) -> Self {
        self.enabled_features.insert(name.into());
        self
    }

    pub fn with_provider(mut self, provider: Provider, settings: ProviderSettings) -> Self {
        self.providers.insert(provider, settings);
        self
    }
}

// ============================================================================
// Environment Variable Resolution
// ============================================================================

/// A transparent wrapper that resolves environment variables during deserialization.
///
/// Supports both literal values and environment variable references:
/// - Literal: `"sandbox_abc123"`
/// - Simple env var: `"$PAYSWITCH_AUTHORIZATION"`
/// - Braced env var: `"${PAYSWITCH_AUTHORIZATION}"`
///
/// The wrapper implements `Deref` to provide transparent access to the inner type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    /// Get a reference to the inner value
    pub fn inner(&self) -> &T {
        &self.0
    }

    /// Parse environment variable syntax from a string.
    /// Returns the variable name if the string matches `$VAR` or `${VAR}` syntax.
    fn parse_env_var_syntax(s: &str) -> Option<String> {
        if s.starts_with("${") && s.ends_with('}') {
            Some(s[2..s.len() - 1].to_string())
        } else if s.starts_with('$') && s.len() > 1 {
            let var_name = &s[1..];
            if var_name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                Some(var_name.to_string())
            } else {
                None
            }
        } else {
            None
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for LiteralOrEnv<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let value = if let Some(var_name) = Self::parse_env_var_syntax(&s) {
            std::env::var(&var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{}' not found (referenced as '{}')",
                    var_name, s
                ))
            })?
        } else {
            s
        };

        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {}", e)))?;

        Ok(LiteralOrEnv(parsed))
    }
}

impl<T> Serialize for LiteralOrEnv<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}
