//! Build script for docsync-notify - embeds version information.
//!
//! `BUILD_INFO_HUMAN` is assembled from the crate version, the output of
//! `git describe --tags --always --dirty` (when the build runs inside a
//! checkout) and the rustc version. Missing pieces are left out.

use std::process::Command;

fn main() {
    ["src", "build.rs", "Cargo.toml"]
        .iter()
        .for_each(|path| println!("cargo:rerun-if-changed={path}"));

    let build_info = [
        Some(env!("CARGO_PKG_VERSION").to_string()),
        command_output("git", &["describe", "--tags", "--always", "--dirty"])
            .map(|desc| format!("({desc})")),
        command_output("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={build_info}");
}

/// Runs a command and returns its trimmed stdout, if it succeeded.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
