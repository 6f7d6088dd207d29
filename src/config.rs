use anyhow::{Context, Result};
use std::{env, time::Duration};

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BUNDLE: &str = "ORIGINAL";

/// Settings for building SAF content, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafConfig {
    /// Timeout handed to remote fetches.
    pub fetch_timeout: Duration,
    pub user_agent: String,
    /// Bundle used for content files that do not name one.
    pub default_bundle: String,
}

impl Default for SafConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            user_agent: format!("dspace-saf/{}", env!("CARGO_PKG_VERSION")),
            default_bundle: DEFAULT_BUNDLE.into(),
        }
    }
}

impl SafConfig {
    /// Read `SAF_FETCH_TIMEOUT_SECS`, `SAF_USER_AGENT` and `SAF_DEFAULT_BUNDLE`,
    /// falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let defaults = Self::default();

        let fetch_timeout = match lookup("SAF_FETCH_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("parsing SAF_FETCH_TIMEOUT_SECS value `{}`", value))?,
            Err(env::VarError::NotPresent) => defaults.fetch_timeout,
            Err(err) => return Err(err).context("reading SAF_FETCH_TIMEOUT_SECS"),
        };
        let user_agent = lookup("SAF_USER_AGENT").unwrap_or(defaults.user_agent);
        let default_bundle = lookup("SAF_DEFAULT_BUNDLE")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.default_bundle);

        Ok(Self {
            fetch_timeout,
            user_agent,
            default_bundle,
        })
    }
}
