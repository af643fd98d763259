//! Run report generation (text report and JSON manifest).

use crate::domain::{CloneOutcome, CloneStatus, RunContext, MANIFEST_SCHEMA_VERSION};
use serde::Serialize;
use serde_json::{json, Value};

const RULE_WIDTH: usize = 30;

/// One line of the report, in descriptor order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub identifier: String,
    pub clone_url: String,
    pub stars: u64,
    pub size_kb: u64,
    pub dir_name: String,
    pub status: CloneStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Summary of a run. Built once all outcomes are known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub query: String,
    pub generated_at: String,
    /// File-name form of the run timestamp.
    pub timestamp: String,
    pub requested: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub entries: Vec<ReportEntry>,
}

/// Aggregate outcomes into a report. Pure: no I/O.
pub fn build_report(context: &RunContext, outcomes: &[CloneOutcome]) -> RunReport {
    let entries: Vec<ReportEntry> = outcomes
        .iter()
        .map(|o| ReportEntry {
            identifier: o.descriptor.identifier.clone(),
            clone_url: o.descriptor.clone_url.clone(),
            stars: o.descriptor.stars,
            size_kb: o.descriptor.size_kb,
            dir_name: o.dir_name.clone(),
            status: o.status,
            error: o.error.clone(),
            elapsed_ms: u64::try_from(o.elapsed.as_millis()).unwrap_or(u64::MAX),
        })
        .collect();
    let succeeded = entries.iter().filter(|e| e.status == CloneStatus::Success).count();

    RunReport {
        query: context.query.clone(),
        generated_at: context.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        timestamp: context.timestamp(),
        requested: context.requested,
        attempted: entries.len(),
        succeeded,
        failed: entries.len() - succeeded,
        entries,
    }
}

impl RunReport {
    pub fn successes(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.status == CloneStatus::Success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.status == CloneStatus::Failed)
    }

    /// Human-readable report. Only the `Generated:` line depends on when the
    /// run happened; timings are left to the manifest.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Repository harvest report\n");
        out.push_str(&format!("Generated: {}\n", self.generated_at));
        out.push_str(&format!("Query: {}\n", self.query));
        out.push_str(&format!("Requested: {}\n", self.requested));
        out.push_str(&format!("Attempted: {}\n", self.attempted));
        out.push_str(&format!("Succeeded: {}\n", self.succeeded));
        out.push_str(&format!("Failed: {}\n", self.failed));
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push('\n');

        for entry in &self.entries {
            let tag = match entry.status {
                CloneStatus::Success => "[OK]    ",
                CloneStatus::Failed => "[FAILED]",
            };
            out.push_str(&format!(
                "{tag} [{}★] {} -> {}\n",
                entry.stars, entry.identifier, entry.clone_url
            ));
            if let Some(error) = &entry.error {
                let mut lines = error.lines();
                if let Some(first) = lines.next() {
                    out.push_str(&format!("         error: {first}\n"));
                }
                for line in lines {
                    out.push_str(&format!("                {line}\n"));
                }
            }
        }

        if self.entries.is_empty() {
            out.push_str("(no repositories)\n");
        }
        out
    }

    /// Machine-readable manifest stored next to the text report.
    pub fn to_manifest(&self) -> Result<Value, serde_json::Error> {
        Ok(json!({
            "schema_version": MANIFEST_SCHEMA_VERSION,
            "run": serde_json::to_value(self)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RepositoryDescriptor;
    use std::path::PathBuf;
    use std::time::Duration;

    fn ok(id: &str, stars: u64) -> CloneOutcome {
        let d = RepositoryDescriptor::new(id, format!("https://github.com/{id}.git"), stars);
        let dir = id.replace('/', "_");
        CloneOutcome::success(d, dir.clone(), PathBuf::from(dir), Duration::from_millis(1500))
    }

    fn failed(id: &str, err: &str) -> CloneOutcome {
        let d = RepositoryDescriptor::new(id, format!("https://github.com/{id}.git"), 3);
        CloneOutcome::failed(d, id.replace('/', "_"), err, Duration::from_millis(20))
    }

    fn context() -> RunContext {
        RunContext::new("trading bot", 5, PathBuf::from("out"), None)
    }

    #[test]
    fn counts_outcomes() {
        let report = build_report(&context(), &[ok("a/a", 10), failed("b/b", "boom"), ok("c/c", 2)]);
        assert_eq!(report.requested, 5);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.successes().count(), 2);
        assert_eq!(report.failures().next().map(|e| e.identifier.as_str()), Some("b/b"));
    }

    #[test]
    fn text_lists_entries_in_input_order() {
        let report = build_report(&context(), &[failed("z/z", "boom"), ok("a/a", 10)]);
        let text = report.render_text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Repository harvest report");
        assert!(lines[1].starts_with("Generated: "));
        assert_eq!(lines[2], "Query: trading bot");
        assert_eq!(lines[7], "-".repeat(30));
        assert_eq!(lines[8], "[FAILED] [3★] z/z -> https://github.com/z/z.git");
        assert_eq!(lines[9], "         error: boom");
        assert_eq!(lines[10], "[OK]     [10★] a/a -> https://github.com/a/a.git");
    }

    #[test]
    fn multi_line_errors_are_indented() {
        let report = build_report(&context(), &[failed("a/a", "fatal: one\nhint: two")]);
        let text = report.render_text();
        assert!(text.contains("         error: fatal: one\n                hint: two\n"));
    }

    #[test]
    fn text_excludes_timings() {
        let report = build_report(&context(), &[ok("a/a", 1)]);
        assert!(!report.render_text().contains("1500"));
    }

    #[test]
    fn manifest_carries_schema_and_timings() {
        let report = build_report(&context(), &[ok("a/a", 1), failed("b/b", "boom")]);
        let manifest = report.to_manifest().expect("manifest");
        assert_eq!(manifest["schema_version"], json!(MANIFEST_SCHEMA_VERSION));
        assert_eq!(manifest["run"]["entries"][0]["elapsed_ms"], json!(1500));
        assert_eq!(manifest["run"]["entries"][0]["status"], json!("success"));
        assert!(manifest["run"]["entries"][0].get("error").is_none());
        assert_eq!(manifest["run"]["entries"][1]["error"], json!("boom"));
    }

    #[test]
    fn empty_run_renders_placeholder() {
        let report = build_report(&context(), &[]);
        assert_eq!(report.attempted, 0);
        assert!(report.render_text().ends_with("(no repositories)\n"));
    }
}
