//! Build script that embeds the build version into the binary.

use std::process::Command;

fn main() {
    // Prefer STILYAGI_BUILD_VERSION if set (e.g., by the release workflow),
    // otherwise fall back to git describe for local development builds.
    if let Ok(version) = std::env::var("STILYAGI_BUILD_VERSION") {
        println!("cargo:rustc-env=STILYAGI_BUILD_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=STILYAGI_BUILD_VERSION={version}");
    }

    // Re-run if git HEAD changes or env var changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=STILYAGI_BUILD_VERSION");
}
