//! Exposes the commit hash and date of the build through `BUILD_HASH` and
//! `BUILD_DATE`, falling back to placeholders outside of a git checkout.

use std::process::Command;

const DEFAULT_HASH: &str = "0000000";
const DEFAULT_DATE: &str = "0000-00-00";

fn main() {
    let (hash, date) = git_head().unwrap_or_else(|| (DEFAULT_HASH.into(), DEFAULT_DATE.into()));
    println!("cargo:rustc-env=BUILD_HASH={hash}");
    println!("cargo:rustc-env=BUILD_DATE={date}");
    println!("cargo:rerun-if-changed=.git/HEAD");
}

/// Returns the abbreviated hash and short date of the `HEAD` commit.
fn git_head() -> Option<(String, String)> {
    let out = Command::new("git")
        .args(["log", "-1", "--format=%h %cs"])
        .output()
        .inspect_err(|e| println!("cargo:warning=git: {e}"))
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let line = String::from_utf8(out.stdout).ok()?;
    let (hash, date) = line.trim().split_once(' ')?;
    Some((hash.to_string(), date.to_string()))
}
