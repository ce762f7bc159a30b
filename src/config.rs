use crate::chart::{ChartLayout, Theme};
use crate::model::UpdatedFormula;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_USERNAME: &str = "mkr302";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_OUTPUT: &str = "github_code_metrics.png";

/// How long to keep asking for contributor stats while GitHub is still
/// computing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub token: Option<String>,
    pub api_base: String,
    pub retry: RetryPolicy,
    pub output_path: PathBuf,
    pub formula: UpdatedFormula,
    pub track_previous_year: bool,
    pub layout: ChartLayout,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            retry: RetryPolicy::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            formula: UpdatedFormula::default(),
            track_previous_year: true,
            layout: ChartLayout::default(),
            theme: Theme::default(),
        }
    }
}

impl Config {
    /// Build the run configuration. The username and token come from
    /// `GITHUB_USERNAME` / `GITHUB_TOKEN`; `UPDATED_FORMULA`, `CHART_LAYOUT`
    /// and `CHART_THEME` pick between the built-in variants. Everything else
    /// is fixed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(username) = lookup("GITHUB_USERNAME").filter(|u| !u.trim().is_empty()) {
            config.username = username.trim().to_string();
        }

        config.token = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());
        if config.token.is_none() {
            warn!("GITHUB_TOKEN not set; requests will be unauthenticated and may be rate-limited");
        }

        if let Some(formula) = parse_var(&lookup, "UPDATED_FORMULA") {
            config.formula = formula;
        }
        if let Some(layout) = parse_var(&lookup, "CHART_LAYOUT") {
            config.layout = layout;
        }
        if let Some(theme) = parse_var(&lookup, "CHART_THEME") {
            config.theme = theme;
        }

        config
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr<Err = String>,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("ignoring {key}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_fixed_constants() {
        let config = Config::default();
        assert_eq!(config.username, "mkr302");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay, Duration::from_secs(10));
        assert_eq!(config.output_path, PathBuf::from("github_code_metrics.png"));
        assert_eq!(config.formula, UpdatedFormula::Overlap);
        assert!(config.track_previous_year);
        assert!(config.token.is_none());
    }

    #[test]
    fn env_overrides_username_and_token_only() {
        let config = Config::from_lookup(lookup_from(&[
            ("GITHUB_USERNAME", " octocat "),
            ("GITHUB_TOKEN", "ghp_secret"),
        ]));
        assert_eq!(config.username, "octocat");
        assert_eq!(config.token.as_deref(), Some("ghp_secret"));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn variant_selectors() {
        let config = Config::from_lookup(lookup_from(&[
            ("UPDATED_FORMULA", "net"),
            ("CHART_LAYOUT", "donut"),
            ("CHART_THEME", "light"),
        ]));
        assert_eq!(config.formula, UpdatedFormula::Net);
        assert_eq!(config.layout, ChartLayout::Donut);
        assert_eq!(config.theme, Theme::Light);

        let config = Config::from_lookup(lookup_from(&[("CHART_LAYOUT", "sparkline")]));
        assert_eq!(config.layout, ChartLayout::Bar);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = Config::from_lookup(lookup_from(&[
            ("GITHUB_USERNAME", "   "),
            ("GITHUB_TOKEN", ""),
        ]));
        assert_eq!(config.username, DEFAULT_USERNAME);
        assert!(config.token.is_none());
    }
}
