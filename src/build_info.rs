//! Compile-time build metadata exposed to CLI surfaces.

/// Semver package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// VCS commit hash captured at build time.
pub const GIT_COMMIT: &str = env!("NEO_BUILD_GIT_HASH");

/// Build timestamp captured at compile time.
pub const BUILD_TIMESTAMP: &str = env!("NEO_BUILD_TIMESTAMP");

/// Cargo profile the binary was built with.
pub const BUILD_PROFILE: &str = env!("NEO_BUILD_PROFILE");

/// Help trailer block that surfaces build metadata in `neo --help`.
pub const HELP_BUILD_METADATA: &str = concat!(
    "Build metadata:\n  commit: ",
    env!("NEO_BUILD_GIT_HASH"),
    "\n  built: ",
    env!("NEO_BUILD_TIMESTAMP"),
    " (",
    env!("NEO_BUILD_PROFILE"),
    ")"
);

/// Version block printed by `neo --version`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("NEO_BUILD_GIT_HASH"),
    "\nbuilt: ",
    env!("NEO_BUILD_TIMESTAMP"),
    " (",
    env!("NEO_BUILD_PROFILE"),
    ")"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_version_includes_expected_lines() {
        let text = LONG_VERSION;
        assert!(text.starts_with(VERSION));
        assert!(text.contains("commit:"));
        assert!(text.contains("built:"));
    }

    #[test]
    fn help_trailer_mentions_commit() {
        assert!(HELP_BUILD_METADATA.contains(GIT_COMMIT));
        assert!(HELP_BUILD_METADATA.contains(BUILD_PROFILE));
    }
}
