//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code in the console crates MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::io`, `reqwest` async client.
//! Synchronous functions that run before or outside the runtime (config
//! and seed file loading) may read files with `std::fs`.

use architectural_enforcement::{code_part, is_in_async_function, scan_production};

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = scan_production(|_, lines, idx| {
        let code = code_part(lines[idx]);
        let in_async = is_in_async_function(lines, idx);

        if code.contains("reqwest::blocking") {
            return Some("Blocking HTTP client");
        }
        if code.contains("std::process::Command") {
            return Some("Blocking process I/O");
        }
        if !in_async {
            return None;
        }
        if code.contains("std::fs::") {
            return Some("Blocking file I/O");
        }
        if code.contains("std::net::") {
            return Some("Blocking network I/O");
        }
        if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
            return Some("Blocking stdin/stdout in async");
        }
        None
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in async production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await");
        eprintln!("  - tokio::io::stdin() with AsyncBufReadExt");
        eprintln!("  - reqwest::Client");
        eprintln!("\n✅ ACCEPTABLE blocking I/O:");
        eprintln!("  - Non-async functions (config and seed loading)");
        eprintln!("  - Test code");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
