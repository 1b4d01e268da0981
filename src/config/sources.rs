//! Config-file source discovery.
//!
//! Precedence: explicit path > local file > global file > built-in defaults.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::defaults::{GLOBAL_CONFIG_DIR, LOCAL_CONFIG_FILE};
use super::ConfigSource;

/// Read config text from the highest-precedence available source.
pub(super) fn read_config_text_with_sources<FRead, FRoot>(
    path_override: Option<&Path>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<(String, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    // An explicit path must exist; the fallbacks are optional.
    if let Some(path) = path_override {
        let text = read_file(path)?;
        return Ok((text, ConfigSource::Explicit(path.to_path_buf())));
    }

    if let Ok(text) = read_file(Path::new(LOCAL_CONFIG_FILE)) {
        return Ok((text, ConfigSource::Local));
    }
    if let Some(dir) = config_root() {
        let global = dir.join(GLOBAL_CONFIG_DIR).join(LOCAL_CONFIG_FILE);
        if let Ok(text) = read_file(&global) {
            return Ok((text, ConfigSource::Global(global)));
        }
    }

    Ok((String::new(), ConfigSource::BuiltInDefaults))
}

/// Platform config root (`$XDG_CONFIG_HOME` or its equivalent).
pub(super) fn config_root_dir() -> Option<PathBuf> {
    dirs::config_dir()
}
