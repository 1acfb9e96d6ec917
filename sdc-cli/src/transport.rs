//! API transport options shared by both subcommands.

use std::time::Duration;

use sdc_data::{RetryPolicy, TransportConfig};

use crate::{ARG_USER_AGENT, CliError};

/// Transport-related options after configuration merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TransportOptions {
    pub(crate) user_agent: Option<String>,
    pub(crate) commons_api: Option<String>,
    pub(crate) wikidata_api: Option<String>,
    pub(crate) max_attempts: Option<u32>,
    pub(crate) timeout_secs: Option<u64>,
}

impl TransportOptions {
    /// Build a [`TransportConfig`], requiring a user agent.
    ///
    /// `env` names the variable that supplies the user agent for the calling
    /// subcommand.
    pub(crate) fn into_config(self, env: &'static str) -> Result<TransportConfig, CliError> {
        let user_agent = self.user_agent.ok_or(CliError::MissingArgument {
            field: ARG_USER_AGENT,
            env,
        })?;
        let mut config = TransportConfig::new(user_agent);
        if let Some(url) = self.commons_api {
            config = config.with_commons_api(url);
        }
        if let Some(url) = self.wikidata_api {
            config = config.with_wikidata_api(url);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(attempts) = self.max_attempts {
            config = config.with_retry(RetryPolicy::default().with_max_attempts(attempts));
        }
        Ok(config)
    }
}
