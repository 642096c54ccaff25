//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the console crates MUST NOT call sleep
//! methods. Waiting happens on I/O, channels, or `tokio::time::timeout`.
//! **Exceptions**: exponential backoff in retry logic, periodic tasks
//! driven by `tokio::time::interval`, test code.

use architectural_enforcement::{code_part, scan_production};

#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan_production(|_, lines, idx| {
        let code = code_part(lines[idx]);
        if !(code.contains("::sleep(") || code.contains(".sleep(")) {
            return None;
        }
        if is_backoff_context(lines, idx) || is_interval_pattern(lines, idx) {
            return None;
        }
        Some("Sleep call")
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE sleep uses:");
        eprintln!("  - Exponential backoff in retry logic");
        eprintln!("  - Periodic tasks using tokio::time::interval()");
        eprintln!("  - Test code");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep to wait for an agent reply (await the call instead)");
        eprintln!("  - Sleep as poor man's synchronization");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Sleep next to a retry counter and a doubling delay
fn is_backoff_context(lines: &[&str], current_idx: usize) -> bool {
    let range = current_idx.saturating_sub(15)..std::cmp::min(current_idx + 5, lines.len());

    let mut has_backoff_calc = false;
    let mut has_retry_context = false;
    for line in &lines[range] {
        let line = line.to_lowercase();
        if line.contains("<<") || line.contains("pow") || line.contains("* 2") {
            has_backoff_calc = true;
        }
        if line.contains("retry") || line.contains("backoff") || line.contains("attempt") {
            has_retry_context = true;
        }
    }
    has_backoff_calc && has_retry_context
}

fn is_interval_pattern(lines: &[&str], current_idx: usize) -> bool {
    let range = current_idx.saturating_sub(20)..std::cmp::min(current_idx + 5, lines.len());
    lines[range]
        .iter()
        .any(|l| l.contains("interval.tick()") || l.contains("tokio::time::interval"))
}

#[test]
fn test_backoff_detection() {
    let code = vec![
        "for attempt in 0..5 {",
        "    let delay = base * 2u32.pow(attempt);",
        "    tokio::time::sleep(delay).await;",
        "}",
    ];
    assert!(is_backoff_context(&code, 2));

    let polling = vec!["loop {", "    tokio::time::sleep(Duration::from_millis(50)).await;", "}"];
    assert!(!is_backoff_context(&polling, 1));
    assert!(!is_interval_pattern(&polling, 1));
}
