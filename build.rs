//! Stamps `neo --help` and `neo --version` with where the binary came from.
//!
//! Every value can be pinned from the environment for reproducible builds:
//! `NEO_BUILD_GIT_HASH` directly, the timestamp through `NEO_BUILD_TIMESTAMP`
//! or the conventional `SOURCE_DATE_EPOCH`.

use std::env;
use std::path::Path;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    for var in ["NEO_BUILD_GIT_HASH", "NEO_BUILD_TIMESTAMP", "SOURCE_DATE_EPOCH"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
    watch_git_head(Path::new(".git"));

    let stamps = [
        ("NEO_BUILD_GIT_HASH", pinned("NEO_BUILD_GIT_HASH").unwrap_or_else(describe_commit)),
        ("NEO_BUILD_TIMESTAMP", pinned("NEO_BUILD_TIMESTAMP").unwrap_or_else(build_time)),
        ("NEO_BUILD_PROFILE", env::var("PROFILE").unwrap_or_else(|_| "unknown".into())),
    ];
    for (key, value) in stamps {
        println!("cargo:rustc-env={key}={value}");
    }
}

fn pinned(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Rebuild when HEAD moves, including commits on the checked-out branch.
fn watch_git_head(git_dir: &Path) {
    let head = git_dir.join("HEAD");
    if !head.exists() {
        return;
    }
    println!("cargo:rerun-if-changed={}", head.display());
    if let Some(branch) = std::fs::read_to_string(&head)
        .ok()
        .and_then(|text| text.trim().strip_prefix("ref: ").map(str::to_string))
    {
        println!("cargo:rerun-if-changed={}", git_dir.join(branch).display());
    }
}

/// Short commit, suffixed `-dirty` when the tree has local edits.
fn describe_commit() -> String {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=12", "--exclude=*"])
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if text.is_empty() {
                "unknown".into()
            } else {
                text
            }
        }
        _ => "unknown".into(),
    }
}

fn build_time() -> String {
    let secs = pinned("SOURCE_DATE_EPOCH")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs())
        });
    rfc3339_utc(secs)
}

/// Format seconds since the epoch as `YYYY-MM-DDTHH:MM:SSZ`.
fn rfc3339_utc(secs: u64) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    // Civil-from-days over 400-year eras.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
        rem / 3_600,
        rem % 3_600 / 60,
        rem % 60
    )
}
