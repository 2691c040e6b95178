//! Environment variable handling for application configuration
//!
//! Standard colour and CI variables, applied on top of the defaults before
//! CLI flags are merged in.

use crate::primitives::{ColorIntent, ConfigError};
use serde::Deserialize;

/// Environment variables that affect application behavior
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentConfig {
    /// NO_COLOR environment variable (any non-empty value = disable color)
    pub no_color: Option<String>,
    /// FORCE_COLOR environment variable (0/false = disable, 1/2/3/true = enable)
    pub force_color: Option<String>,
    /// CLICOLOR environment variable (0 = disable color)
    pub clicolor: Option<String>,
    /// CI environment variable (set and not empty/0/false = CI mode)
    pub ci: Option<String>,
}

impl EnvironmentConfig {
    /// Load environment configuration from current environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).map_err(|e| ConfigError::EnvironmentParsingFailed { source: e })
    }

    /// Explicit FORCE_COLOR decision, if the value is recognised
    fn forced_color(&self) -> Option<ColorIntent> {
        match self.force_color.as_deref()? {
            "0" | "false" => Some(ColorIntent::Never),
            "1" | "2" | "3" | "true" => Some(ColorIntent::Always),
            _ => None,
        }
    }

    /// CI counts unless it is explicitly switched off
    fn in_ci(&self) -> bool {
        self.ci
            .as_deref()
            .is_some_and(|value| !matches!(value, "" | "0" | "false"))
    }

    /// Apply environment variables to color configuration
    ///
    /// A recognised FORCE_COLOR wins over everything else. Without one, CI,
    /// CLICOLOR=0 or a non-empty NO_COLOR disables colour.
    pub fn apply_color_config(&self, color: ColorIntent) -> ColorIntent {
        if let Some(forced) = self.forced_color() {
            return forced;
        }

        let disabled = self.in_ci()
            || self.clicolor.as_deref() == Some("0")
            || self.no_color.as_deref().is_some_and(|value| !value.is_empty());

        if disabled { ColorIntent::Never } else { color }
    }
}

#[cfg(test)]
mod tests {
    include!("env.test.rs");
}
