//! Architectural Enforcement Integration Tests
//!
//! Shared source scanning for the enforcement tests:
//! - No sleep() calls in production code
//! - No blocking I/O inside async functions
//!
//! The checks are line based. They look backwards from a suspicious line to
//! find the enclosing function and decide from its signature whether the
//! line is test code, async code, or plain synchronous code.

use std::path::{Path, PathBuf};

/// Production source trees checked by every rule
pub const PRODUCTION_DIRS: &[&str] = &["console/core/src", "console/shell/src"];

/// A source line that broke a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the line came from
    pub path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// Short description of the rule
    pub kind: &'static str,
    /// The offending line, trimmed
    pub line: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line_number,
            self.kind,
            self.line
        )
    }
}

/// Workspace root, two levels above this crate
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_sources(dir: &str) -> Vec<PathBuf> {
    let path = workspace_root().join(dir);
    if !path.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Code portion of a line, with any `//` comment removed
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether a trimmed line opens a function, with or without visibility
#[must_use]
pub fn is_fn_signature(line: &str) -> bool {
    let line = line
        .strip_prefix("pub(crate) ")
        .or_else(|| line.strip_prefix("pub "))
        .unwrap_or(line);
    line.starts_with("fn ") || line.starts_with("async fn ")
}

fn is_boundary(line: &str) -> bool {
    line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{'))
}

/// Signature line of the function enclosing `current_idx`, if any
fn enclosing_fn<'a>(lines: &[&'a str], current_idx: usize) -> Option<(usize, &'a str)> {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();
        if is_fn_signature(line) {
            return Some((i, line));
        }
        if is_boundary(line) {
            return None;
        }
    }
    None
}

/// Whether the line sits in a test function or a `#[cfg(test)]` item
#[must_use]
pub fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    if lines[..current_idx]
        .iter()
        .any(|l| l.trim().starts_with("#[cfg(test)]"))
    {
        return true;
    }

    let Some((fn_idx, _)) = enclosing_fn(lines, current_idx) else {
        return false;
    };
    for i in (0..fn_idx).rev() {
        let line = lines[i].trim();
        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }
        if !line.starts_with("#[") && !line.starts_with("///") {
            break;
        }
    }
    false
}

/// Whether the enclosing function is `async`
#[must_use]
pub fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    enclosing_fn(lines, current_idx).is_some_and(|(_, sig)| sig.contains("async fn "))
}

/// Whether the enclosing function is a plain synchronous one
#[must_use]
pub fn is_in_non_async_function(lines: &[&str], current_idx: usize) -> bool {
    enclosing_fn(lines, current_idx).is_some_and(|(_, sig)| !sig.contains("async fn "))
}

/// Run `check` over every production line that is not test code
pub fn scan_production<F>(mut check: F) -> Vec<Violation>
where
    F: FnMut(&Path, &[&str], usize) -> Option<&'static str>,
{
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for path in rust_sources(dir) {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let lines: Vec<&str> = content.lines().collect();
            for idx in 0..lines.len() {
                if is_in_test_function(&lines, idx) {
                    continue;
                }
                if let Some(kind) = check(&path, &lines, idx) {
                    violations.push(Violation {
                        path: path.clone(),
                        line_number: idx + 1,
                        kind,
                        line: lines[idx].trim().to_string(),
                    });
                }
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signatures() {
        assert!(is_fn_signature("fn main() {"));
        assert!(is_fn_signature("pub fn load(path: &Path) -> Result<()> {"));
        assert!(is_fn_signature("pub(crate) async fn run(&self) {"));
        assert!(!is_fn_signature("let f = |x| x;"));
    }

    #[test]
    fn test_async_detection() {
        let code = vec![
            "pub async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));
        assert!(!is_in_non_async_function(&code, 1));
    }

    #[test]
    fn test_sync_detection() {
        let code = vec![
            "pub fn load_seed_file(path: &Path) {",
            "    let contents = std::fs::read_to_string(path)?;",
            "}",
        ];
        assert!(is_in_non_async_function(&code, 1));
        assert!(!is_in_async_function(&code, 1));
    }

    #[test]
    fn test_test_detection() {
        let code = vec![
            "#[tokio::test]",
            "async fn test_something() {",
            "    tokio::time::sleep(Duration::from_millis(5)).await;",
            "}",
        ];
        assert!(is_in_test_function(&code, 2));

        let module = vec!["#[cfg(test)]", "mod tests {", "    fn helper() {", "        x();", "    }"];
        assert!(is_in_test_function(&module, 3));
    }

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }
}
