//! Development automation tasks for the harvester workspace.
//!
//! Run with: `cargo xtask <command>`
//!
//! This is a CLI tool for developers, so `println!` and `eprintln!` are
//! used for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::env;
use std::process::{Command, ExitCode};

use anyhow::{anyhow, Context};

/// Workspace crates checked one by one in CI
const HARVESTER_CRATES: &[&str] =
    &["harvester-common", "harvester-domain", "harvester-core", "harvester-infra", "harvester-app"];

fn main() -> ExitCode {
    let task = env::args().nth(1);

    let result = match task.as_deref() {
        Some("ci") => run_ci(),
        Some("fmt") => run_fmt(),
        Some("clippy") => run_clippy(),
        Some("test") => run_test(),
        Some("check-crates") => check_crates(),
        Some("smoke") => run_smoke(),
        Some("deny") => run_deny(),
        Some("audit") => run_audit(),
        Some("help") | None => {
            print_help();
            Ok(())
        }
        Some(unknown) => {
            eprintln!("Unknown task: {unknown}");
            eprintln!();
            print_help();
            Err(anyhow!("Unknown task"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Task failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("Harvester Development Tasks");
    println!();
    println!("USAGE:");
    println!("    cargo xtask <TASK>");
    println!();
    println!("TASKS:");
    println!("    ci            Run all CI checks (fmt, clippy, check-crates, test, smoke)");
    println!("    fmt           Check Rust code formatting");
    println!("    clippy        Run Clippy lints");
    println!("    test          Run all tests");
    println!("    check-crates  Check each harvester crate compiles on its own");
    println!("    smoke         Run the harvester binary's help and usage paths");
    println!("    deny          Check dependencies with cargo-deny");
    println!("    audit         Audit dependencies for security vulnerabilities");
    println!("    help          Show this help message");
}

/// Run all CI checks in sequence
fn run_ci() -> anyhow::Result<()> {
    println!("==> Running CI checks...\n");

    println!("==> Step 1/5: Checking Rust format...");
    run_fmt()?;

    println!("\n==> Step 2/5: Running Clippy...");
    run_clippy()?;

    println!("\n==> Step 3/5: Checking crates individually...");
    check_crates()?;

    println!("\n==> Step 4/5: Running tests...");
    run_test()?;

    println!("\n==> Step 5/5: Smoke testing the harvester binary...");
    run_smoke()?;

    println!("\n✓ All CI checks passed!");
    Ok(())
}

/// Check Rust code formatting
fn run_fmt() -> anyhow::Result<()> {
    let status = Command::new("cargo").args(["fmt", "--all", "--", "--check"]).status()?;

    if !status.success() {
        anyhow::bail!("Format check failed. Run 'cargo fmt --all' to fix.");
    }

    Ok(())
}

/// Run Clippy lints
fn run_clippy() -> anyhow::Result<()> {
    let status = Command::new("cargo")
        .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("Clippy run failed. See output above."))
    }
}

/// Check every harvester crate compiles without the rest of the workspace
/// unifying its features
fn check_crates() -> anyhow::Result<()> {
    for name in HARVESTER_CRATES {
        println!("Checking {name}...");
        let status = Command::new("cargo")
            .args(["check", "-p", name, "--all-targets"])
            .status()
            .with_context(|| format!("Failed to run cargo check for {name}"))?;

        if !status.success() {
            anyhow::bail!("{name} check failed");
        }
    }

    println!("✓ {} crates compile successfully", HARVESTER_CRATES.len());
    Ok(())
}

/// Run all workspace tests
fn run_test() -> anyhow::Result<()> {
    let status = Command::new("cargo").args(["test", "--workspace"]).status()?;

    if !status.success() {
        anyhow::bail!("Tests failed");
    }

    Ok(())
}

/// Exercise the binary's argument handling and its exit codes
fn run_smoke() -> anyhow::Result<()> {
    let cases: &[(&[&str], i32)] = &[
        (&["-h"], 0),
        (&["--version"], 0),
        (&["--destination", "mirror.caom.caom2"], 1),
        (&["--source", "no-dots", "--destination", "mirror.caom.caom2"], 1),
        (&["--full", "--skip", "--source", "a.b.c", "--destination", "d.e.f"], 1),
    ];

    for (args, expected) in cases {
        let output = Command::new("cargo")
            .args(["run", "--quiet", "-p", "harvester-app", "--bin", "harvester", "--"])
            .args(*args)
            .output()
            .context("Failed to run the harvester binary")?;

        let code = output.status.code().unwrap_or(-1);
        if code != *expected {
            anyhow::bail!(
                "harvester {} exited with {code}, expected {expected}\n{}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        println!("  harvester {} -> {code}", args.join(" "));
    }

    Ok(())
}

/// Check dependencies with cargo-deny
fn run_deny() -> anyhow::Result<()> {
    ensure_installed("deny", "cargo-deny")?;

    let status = Command::new("cargo").args(["deny", "check"]).status()?;

    if !status.success() {
        anyhow::bail!("cargo-deny found issues");
    }

    Ok(())
}

/// Audit dependencies for security vulnerabilities
fn run_audit() -> anyhow::Result<()> {
    ensure_installed("audit", "cargo-audit")?;

    let status = Command::new("cargo").args(["audit"]).status()?;

    if !status.success() {
        anyhow::bail!("cargo-audit found vulnerabilities");
    }

    Ok(())
}

fn ensure_installed(subcommand: &str, package: &str) -> anyhow::Result<()> {
    let check = Command::new("cargo").args([subcommand, "--version"]).output();

    if check.is_err() || !check.as_ref().is_ok_and(|o| o.status.success()) {
        eprintln!("{package} is not installed.");
        eprintln!("Install it with: cargo install {package}");
        anyhow::bail!("{package} not found");
    }

    Ok(())
}
