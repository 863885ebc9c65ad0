//! Implementation of the `glassscore config` command.

use anyhow::Result;

use crate::domain::models::Config;

const REDACTED: &str = "***";

/// Copy of the configuration with every credential replaced.
pub fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    for provider in &mut config.judge.providers {
        for key in &mut provider.api_keys {
            *key = REDACTED.to_string();
        }
    }
    if config.search.api_key.is_some() {
        config.search.api_key = Some(REDACTED.to_string());
    }
    config
}

pub fn execute(config: &Config) -> Result<()> {
    print!("{}", serde_yaml::to_string(&redacted(config))?);
    Ok(())
}
