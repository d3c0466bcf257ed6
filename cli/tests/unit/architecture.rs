//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! domain is pure, application talks to the outside only through ports,
//! infra never reaches up into commands or output.

use std::path::Path;

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

fn src_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
        .replace('\\', "/")
}

/// Every non-test, non-comment line under `dir` containing any of `needles`.
fn find_outside_tests(dir: &Path, needles: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let rel = relative(&file);
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            if in_test || line.trim().starts_with("//") {
                continue;
            }
            for needle in needles {
                if line.contains(needle) {
                    violations.push(format!("{rel}:{}: `{needle}`: {line}", i + 1));
                }
            }
        }
    }
    violations
}

// ── Domain purity ─────────────────────────────────────────────────────────────

#[test]
fn domain_has_no_io_or_outer_layer_imports() {
    let violations = find_outside_tests(
        &src_dir().join("domain"),
        &[
            "tokio::",
            "std::fs",
            "std::net",
            "std::process",
            "reqwest",
            "rustls",
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

// ── Application talks through ports ───────────────────────────────────────────

#[test]
fn application_has_no_imports_from_outer_layers() {
    let violations = find_outside_tests(
        &src_dir().join("application"),
        &["crate::infra", "crate::commands", "crate::output", "reqwest::", "std::fs"],
    );
    assert!(
        violations.is_empty(),
        "application/ must reach infrastructure through ports only:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_concrete_infra_types_in_service_signatures() {
    let services_dir = src_dir().join("application").join("services");
    let concrete_types = [
        "ReqwestTransport",
        "PingProbe<",
        "AesCredentialVault",
        "TracingEventSink",
        "YamlConfigStore",
        "TokioCommandRunner",
    ];

    let mut violations: Vec<String> = Vec::new();
    for file in collect_rs_files(&services_dir) {
        let rel = relative(&file);
        let lines = read_non_comment_lines(&file);
        for (i, line) in lines.iter().enumerate() {
            if !line.contains("fn ") {
                continue;
            }
            for concrete in &concrete_types {
                if line.contains(concrete) {
                    violations.push(format!(
                        "{rel}:{}: concrete type `{concrete}` in function signature: {line}",
                        i + 1
                    ));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found concrete infra types in service function signatures: use trait bounds instead:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_tokio_command_runner_outside_infra_and_commands() {
    let mut violations: Vec<String> = Vec::new();
    for file in collect_rs_files(&src_dir()) {
        let rel = relative(&file);
        if rel.contains("/infra/") || rel.contains("/commands/") {
            continue;
        }
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            if line.contains("TokioCommandRunner") {
                violations.push(format!("{rel}:{}: {line}", i + 1));
            }
        }
    }
    assert!(
        violations.is_empty(),
        "TokioCommandRunner is wired up in commands/ only:\n{}",
        violations.join("\n")
    );
}

// ── Infra boundaries ──────────────────────────────────────────────────────────

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations =
        find_outside_tests(&src_dir().join("infra"), &["crate::commands", "crate::output"]);
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = find_outside_tests(&src_dir().join("infra"), &["println!", "eprintln!"]);
    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_log_through_tracing_not_print_macros() {
    let violations = find_outside_tests(
        &src_dir().join("application"),
        &["println!", "eprintln!", "print!(", "eprint!("],
    );
    assert!(
        violations.is_empty(),
        "application/ reports through events and tracing:\n{}",
        violations.join("\n")
    );
}

#[test]
fn controllers_report_through_event_sink() {
    let violations = find_outside_tests(
        &src_dir().join("application").join("services").join("controller"),
        &["tracing::"],
    );
    assert!(
        violations.is_empty(),
        "controllers emit ShutdownEvents instead of logging directly:\n{}",
        violations.join("\n")
    );
}

// ── Commands ──────────────────────────────────────────────────────────────────

#[test]
fn commands_print_through_output_context() {
    let violations = find_outside_tests(
        &src_dir().join("commands"),
        &["println!", "eprintln!", "print!(", "eprint!("],
    );
    assert!(
        violations.is_empty(),
        "commands/ prints through OutputContext or the Renderer:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_inline_json_branching_in_commands() {
    let commands_dir = src_dir().join("commands");
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&commands_dir) {
        let rel = relative(&file);
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            let lineno = i + 1;
            if line.contains("json: bool") {
                violations.push(format!(
                    "{rel}:{lineno}: found `json: bool` parameter: {line}"
                ));
            }
            let trimmed = line.trim();
            if trimmed.starts_with("if json") || trimmed.starts_with("if !json") {
                violations.push(format!("{rel}:{lineno}: found inline JSON branch: {line}"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found inline JSON branching in commands/: use app.renderer() instead:\n{}",
        violations.join("\n")
    );
}

/// Command files that touch `app.output` or the renderer must receive
/// `&AppContext` rather than loose parameters.
#[test]
fn command_handlers_accept_app_context() {
    let commands_dir = src_dir().join("commands");
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&commands_dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let uses_app = content.contains("app.output") || content.contains("app.renderer()");
        if uses_app && !content.contains("app: &AppContext") {
            violations.push(relative(&file));
        }
    }

    assert!(
        violations.is_empty(),
        "Command handlers using AppContext fields must take `app: &AppContext`:\n{}",
        violations.join("\n")
    );
}
