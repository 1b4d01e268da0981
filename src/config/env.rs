//! `NEO_*` environment overrides, applied after the file is parsed.

use std::str::FromStr;

use crate::error::ConfigError;
use crate::executor::ExecutorMode;

use super::Config;

pub const ENV_REQUIRE_APPROVAL: &str = "NEO_REQUIRE_APPROVAL";
pub const ENV_AUTO_APPROVE: &str = "NEO_AUTO_APPROVE";
pub const ENV_EXECUTOR_MODE: &str = "NEO_EXECUTOR_MODE";
pub const ENV_MAX_WAIT_SECS: &str = "NEO_MAX_WAIT_SECS";

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(raw) = env_lookup(ENV_REQUIRE_APPROVAL) {
        config.approval.require_approval = parse_bool(ENV_REQUIRE_APPROVAL, &raw)?;
    }
    if let Some(raw) = env_lookup(ENV_AUTO_APPROVE) {
        config.approval.auto_approve_all = parse_bool(ENV_AUTO_APPROVE, &raw)?;
    }
    if let Some(raw) = env_lookup(ENV_EXECUTOR_MODE) {
        config.executor.mode = ExecutorMode::from_str(&raw)
            .map_err(|e| ConfigError::Invalid(format!("invalid {ENV_EXECUTOR_MODE}: {e}")))?;
    }
    if let Some(raw) = env_lookup(ENV_MAX_WAIT_SECS) {
        let parsed = raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid {ENV_MAX_WAIT_SECS} value `{raw}`: expected positive integer seconds"
            ))
        })?;
        // Zero would make every command time out immediately.
        config.executor.max_wait_secs = parsed.max(1);
    }
    Ok(())
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "invalid {name} value `{raw}`: expected true or false"
        ))),
    }
}
