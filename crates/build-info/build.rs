use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

use chrono::Utc;

fn main() {
    println!("cargo:rerun-if-env-changed=LGRELAY_BUILD_ID_OVERRIDE");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    if let Some(path) = git_head_path() {
        println!("cargo:rerun-if-changed={}", path);
    }

    let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let git_label = git_short_hash().unwrap_or_else(|| "unknown".to_string());
    let build_id = env::var("LGRELAY_BUILD_ID_OVERRIDE")
        .ok()
        .unwrap_or_else(|| format!("{} | {}", build_time, git_label));

    println!("cargo:rustc-env=LGRELAY_BUILD_ID={}", build_id);
    println!("cargo:rustc-env=LGRELAY_BUILD_TIME={}", build_time);
    println!("cargo:rustc-env=LGRELAY_BUILD_GIT={}", git_label);
}

fn git_head_path() -> Option<String> {
    let head_path = Path::new(".git/HEAD");
    if !head_path.exists() {
        return None;
    }
    if let Ok(head_ref) = fs::read_to_string(head_path) {
        if let Some(path) = head_ref.strip_prefix("ref: ") {
            let ref_path = format!(".git/{}", path.trim());
            if Path::new(&ref_path).exists() {
                return Some(ref_path);
            }
        }
    }
    Some(head_path.display().to_string())
}

// Same probe the relay's `version` output reports: short commit hash, if any.
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let label = raw.trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}
