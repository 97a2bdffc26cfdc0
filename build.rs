//! Build script for sitecheck.
//!
//! Exposes build metadata to `src/version.rs` through `SITECHECK_*`
//! compile-time environment variables. Every value is optional; a build
//! outside a git checkout or without `date` on the path still succeeds.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    println!(
        "cargo:rustc-env=SITECHECK_TARGET={}",
        env::var("TARGET").unwrap_or_else(|_| "unknown".to_string())
    );

    if let Some(hash) = command_output("git", &["rev-parse", "--short", "HEAD"]) {
        let dirty = command_output("git", &["status", "--porcelain"]).is_some_and(|s| !s.is_empty());
        let hash = if dirty { format!("{}-dirty", hash) } else { hash };
        println!("cargo:rustc-env=SITECHECK_GIT_HASH={}", hash);
    }

    if let Some(date) = command_output("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]) {
        println!("cargo:rustc-env=SITECHECK_BUILD_DATE={}", date);
    }

    // "rustc 1.75.0 (...)" -> "1.75.0"
    if let Some(version) = command_output("rustc", &["--version"])
        .and_then(|s| s.split_whitespace().nth(1).map(str::to_string))
    {
        println!("cargo:rustc-env=SITECHECK_RUSTC_VERSION={}", version);
    }
}

/// Trimmed stdout of a successful command.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}
