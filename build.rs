use std::process::Command;

const GIT_QUERIES: &[&[&str]] = &[
    &["describe", "--tags", "--always", "--dirty"],
    &["rev-parse", "--short", "HEAD"],
];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");
    println!("cargo:rustc-env=HTTPTUNNEL_VERSION={}", build_version());
}

fn build_version() -> String {
    GIT_QUERIES
        .iter()
        .find_map(|args| git_output(args))
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn git_output(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
