//! Source analyzer producer.
//!
//! Walks a directory of Rust sources and snapshots its shape: item counts,
//! per-file declarations, and dependency use targets. The scan is a line
//! scan, not a parse; it is meant to orient a synthesis model, not to be
//! a compiler front end.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use contextfuse_core::error::ProducerError;
use contextfuse_core::{estimate_tokens, Fact, Producer, Snapshot};
use tracing::debug;

const MAX_FILES: usize = 20;
const MAX_FILE_SIZE: u64 = 50_000;

/// Snapshots the structure of a Rust source tree.
pub struct SourceAnalyzerProducer {
    id: String,
    root: PathBuf,
    max_files: usize,
}

#[derive(Default)]
struct FileReport {
    path: PathBuf,
    lines: usize,
    functions: Vec<String>,
    structs: Vec<String>,
    enums: Vec<String>,
    traits: Vec<String>,
    uses: Vec<String>,
}

impl SourceAnalyzerProducer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            id: "source_analyzer".into(),
            root: root.into(),
            max_files: MAX_FILES,
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files.max(1);
        self
    }

    fn invalid(&self, reason: impl std::fmt::Display) -> ProducerError {
        ProducerError::InvalidSnapshot {
            producer_id: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Producer for SourceAnalyzerProducer {
    fn producer_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Analyzes a Rust source tree and reports its structure"
    }

    async fn produce(&self, _query: &str) -> Result<Snapshot, ProducerError> {
        if !self.root.is_dir() {
            let summary = format!("Source path not found: {}", self.root.display());
            let fact = Fact::new("error", "path_not_found").map_err(|e| self.invalid(e))?;
            return Snapshot::new(&self.id, summary)
                .map(|s| s.with_facts(vec![fact]))
                .map_err(|e| self.invalid(e));
        }

        let mut files = Vec::new();
        collect_rust_files(&self.root, &mut files);
        files.sort();
        files.truncate(self.max_files);

        let reports: Vec<FileReport> = files
            .iter()
            .filter_map(|path| scan_file(path))
            .collect();
        debug!(root = %self.root.display(), files = reports.len(), "Source scan complete");

        let total_lines: usize = reports.iter().map(|r| r.lines).sum();
        let total_fns: usize = reports.iter().map(|r| r.functions.len()).sum();
        let total_structs: usize = reports.iter().map(|r| r.structs.len()).sum();
        let total_enums: usize = reports.iter().map(|r| r.enums.len()).sum();
        let total_traits: usize = reports.iter().map(|r| r.traits.len()).sum();

        let mut deps: Vec<String> = reports
            .iter()
            .flat_map(|r| r.uses.iter().cloned())
            .collect();
        deps.sort();
        deps.dedup();

        let mut facts = vec![
            Fact::new("total_files", reports.len().to_string()),
            Fact::new("total_lines", total_lines.to_string()),
            Fact::new("functions", total_fns.to_string()),
            Fact::new("structs", total_structs.to_string()),
            Fact::new("enums", total_enums.to_string()),
            Fact::new("traits", total_traits.to_string()),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| self.invalid(e))?;

        if !deps.is_empty() {
            facts.push(Fact::new("use_targets", deps.join(", ")).map_err(|e| self.invalid(e))?);
        }

        let mut raw = String::new();
        for report in &reports {
            let rel = report
                .path
                .strip_prefix(&self.root)
                .unwrap_or(&report.path);
            raw.push_str(&format!("## {} ({} lines)\n", rel.display(), report.lines));
            push_section(&mut raw, "fn", &report.functions);
            push_section(&mut raw, "struct", &report.structs);
            push_section(&mut raw, "enum", &report.enums);
            push_section(&mut raw, "trait", &report.traits);
            raw.push('\n');
        }

        let token_count = estimate_tokens(&raw);
        let summary = format!(
            "Rust source tree at {}: {} files, {} lines, {} functions",
            self.root.display(),
            reports.len(),
            total_lines,
            total_fns
        );

        Snapshot::new(&self.id, summary)
            .map(|s| s.with_facts(facts).with_raw_context(raw, token_count))
            .map_err(|e| self.invalid(e))
    }
}

fn collect_rust_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.') || n == "target");
            if !hidden {
                collect_rust_files(&path, out);
            }
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

fn scan_file(path: &Path) -> Option<FileReport> {
    let metadata = std::fs::metadata(path).ok()?;
    if metadata.len() > MAX_FILE_SIZE {
        return None;
    }
    let content = std::fs::read_to_string(path).ok()?;

    let mut report = FileReport {
        path: path.to_path_buf(),
        ..FileReport::default()
    };
    for line in content.lines() {
        report.lines += 1;
        let trimmed = line.trim_start();
        if let Some(name) = declared_name(trimmed, &["fn ", "pub fn ", "pub(crate) fn ", "async fn ", "pub async fn "]) {
            report.functions.push(name);
        } else if let Some(name) = declared_name(trimmed, &["struct ", "pub struct ", "pub(crate) struct "]) {
            report.structs.push(name);
        } else if let Some(name) = declared_name(trimmed, &["enum ", "pub enum ", "pub(crate) enum "]) {
            report.enums.push(name);
        } else if let Some(name) = declared_name(trimmed, &["trait ", "pub trait ", "pub(crate) trait "]) {
            report.traits.push(name);
        } else if let Some(rest) = trimmed.strip_prefix("use ") {
            let target: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !target.is_empty() && target != "crate" && target != "super" && target != "self" {
                report.uses.push(target);
            }
        }
    }
    Some(report)
}

/// Return the identifier following the first matching declaration prefix.
fn declared_name(line: &str, prefixes: &[&str]) -> Option<String> {
    for prefix in prefixes {
        if let Some(rest) = line.strip_prefix(prefix) {
            let name: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    None
}

fn push_section(out: &mut String, label: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }
    out.push_str(&format!("  {label}: {}\n", names.join(", ")));
}
