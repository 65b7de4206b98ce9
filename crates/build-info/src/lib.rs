//! Build metadata captured by `build.rs` and shared by the relay binaries.

use once_cell::sync::Lazy;

#[derive(Debug)]
struct BuildMeta {
    build_id: String,
    build_time: String,
    git_commit: Option<String>,
}

impl BuildMeta {
    fn collect() -> Self {
        let git_commit = option_env!("LGRELAY_BUILD_GIT")
            .filter(|label| !label.is_empty() && *label != "unknown")
            .map(str::to_string);
        Self {
            build_id: option_env!("LGRELAY_BUILD_ID")
                .unwrap_or("unknown build")
                .to_string(),
            build_time: option_env!("LGRELAY_BUILD_TIME")
                .unwrap_or("unknown time")
                .to_string(),
            git_commit,
        }
    }
}

static META: Lazy<BuildMeta> = Lazy::new(BuildMeta::collect);

/// Full build identifier, e.g. "2026-10-16 09:12:44 UTC | 8a4f1d2".
pub fn build_id() -> &'static str {
    META.build_id.as_str()
}

pub fn build_timestamp() -> &'static str {
    META.build_time.as_str()
}

/// Short git commit the binary was built from, when the build ran inside a checkout.
pub fn git_commit() -> Option<&'static str> {
    META.git_commit.as_deref()
}

/// One-line banner logged by each binary at startup.
pub fn formatted_banner(package: &str, version: &str) -> String {
    format!("{} {} | {}", package, version, build_id())
}

/// Multi-line version report for operator-facing `version` commands.
pub fn version_report(package: &str, version: &str) -> String {
    let mut text = format!("{} version: {}\n", package, version);
    text.push_str(&format!("Built: {}\n", build_timestamp()));
    match git_commit() {
        Some(hash) => text.push_str(&format!("Git commit: {}", hash)),
        None => text.push_str("Git commit: not available"),
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_includes_package_and_version() {
        let banner = formatted_banner("lgrelayd", "1.2.3");
        assert!(banner.starts_with("lgrelayd 1.2.3 | "));
    }

    #[test]
    fn version_report_always_names_commit_line() {
        let report = version_report("lgq", "0.1.0");
        assert!(report.starts_with("lgq version: 0.1.0\n"));
        assert!(report.contains("Git commit: "));
    }
}
