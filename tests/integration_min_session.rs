// Minimal integration test that drives the compiled binary through a PTY.
// This exercises the real event loop and crossterm input handling across
// the main boundaries without relying on internal modules.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("accrue");
    let cmd = format!(
        "{} --data-dir {} --preset pull-ups",
        bin.display(),
        dir.path().display()
    );

    // Spawn the TUI inside a pseudo terminal
    let mut p = spawn(cmd)?;

    // Give the app a moment to initialize the terminal/alternate screen
    std::thread::sleep(Duration::from_millis(200));

    // One set of 25 reps (+2 adjustment) clears the 20 rep target
    p.send("25\r")?;
    std::thread::sleep(Duration::from_millis(200));

    // Send ESC to exit from the complete screen
    p.send("\x1b")?;

    p.expect(Eof)?;
    Ok(())
}
