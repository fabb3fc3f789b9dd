//! Diagnostics collected while turning tabular records into a snapshot.
//!
//! Loading never aborts on a single bad row. Instead, every recovered problem
//! is recorded here so the caller can show it next to the diagnostic report:
//!
//! - Field coercions (a cell that did not parse as its declared type)
//! - Duplicate identifiers (first row wins)
//! - Bus identifiers from which no region code could be derived
//! - Time-series columns that reference unknown entities
//!
//! # Example
//!
//! ```
//! use netdiag_core::diagnostics::{LoadDiagnostics, LoadIssueKind};
//!
//! let mut diag = LoadDiagnostics::new();
//! diag.add_coercion_warning("lines", 3, "s_nom", "n/a");
//! diag.add_duplicate("buses", "DE0 0");
//!
//! assert_eq!(diag.warning_count(), 2);
//! assert_eq!(diag.issues_of(LoadIssueKind::FieldCoercion).count(), 1);
//! ```

use serde::Serialize;

/// Severity level for load issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recovered, the value or row was defaulted or skipped
    Warning,
    /// Could not use the element at all
    Error,
}

/// Kind of problem recovered during loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadIssueKind {
    /// A cell could not be parsed as its declared type; a sentinel was substituted
    FieldCoercion,
    /// A later row repeated an identifier already loaded
    DuplicateId,
    /// No region code could be derived for a bus
    UnderivableRegion,
    /// A time-series column names an entity that does not exist
    UnknownSeriesColumn,
    /// A row had no identifier and was skipped
    MissingId,
}

impl LoadIssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadIssueKind::FieldCoercion => "field_coercion",
            LoadIssueKind::DuplicateId => "duplicate_id",
            LoadIssueKind::UnderivableRegion => "underivable_region",
            LoadIssueKind::UnknownSeriesColumn => "unknown_series_column",
            LoadIssueKind::MissingId => "missing_id",
        }
    }
}

/// A single issue recovered while loading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadIssue {
    pub severity: Severity,
    pub kind: LoadIssueKind,
    /// Record collection the issue was found in
    pub table: String,
    pub message: String,
    /// Zero-based data row (header excluded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl LoadIssue {
    pub fn new(
        severity: Severity,
        kind: LoadIssueKind,
        table: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            table: table.into(),
            message: message.into(),
            row: None,
            column: None,
            entity: None,
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(
            f,
            "[{}:{}] {}: {}",
            severity,
            self.kind.as_str(),
            self.table,
            self.message
        )?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(row) = self.row {
            write!(f, " at row {}", row)?;
        }

        Ok(())
    }
}

/// Counts of entities that made it into the snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub buses: usize,
    pub lines: usize,
    pub links: usize,
    pub generators: usize,
    pub loads: usize,
    pub stores: usize,
    pub coerced_values: usize,
    pub skipped_rows: usize,
}

/// Complete diagnostics for a load operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadDiagnostics {
    pub stats: LoadStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<LoadIssue>,
}

impl LoadDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cell that was replaced by a sentinel (increments `coerced_values`)
    pub fn add_coercion_warning(&mut self, table: &str, row: usize, column: &str, value: &str) {
        self.issues.push(
            LoadIssue::new(
                Severity::Warning,
                LoadIssueKind::FieldCoercion,
                table,
                format!("could not parse '{value}' in column '{column}'"),
            )
            .with_row(row)
            .with_column(column),
        );
        self.stats.coerced_values += 1;
    }

    /// Record a repeated identifier (increments `skipped_rows`)
    pub fn add_duplicate(&mut self, table: &str, id: &str) {
        self.issues.push(
            LoadIssue::new(
                Severity::Warning,
                LoadIssueKind::DuplicateId,
                table,
                format!("duplicate identifier '{id}', keeping the first row"),
            )
            .with_entity(id),
        );
        self.stats.skipped_rows += 1;
    }

    /// Record a row without identifier (increments `skipped_rows`)
    pub fn add_missing_id(&mut self, table: &str, row: usize) {
        self.issues.push(
            LoadIssue::new(
                Severity::Error,
                LoadIssueKind::MissingId,
                table,
                "row has an empty 'name' and was skipped",
            )
            .with_row(row),
        );
        self.stats.skipped_rows += 1;
    }

    pub fn add_warning_with_entity(
        &mut self,
        kind: LoadIssueKind,
        table: &str,
        message: &str,
        entity: &str,
    ) {
        self.issues.push(
            LoadIssue::new(Severity::Warning, kind, table, message).with_entity(entity),
        );
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Issues of one kind, in recording order
    pub fn issues_of(&self, kind: LoadIssueKind) -> impl Iterator<Item = &LoadIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let errors = self.error_count();
        let issue_summary = match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (0, e) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (w, e) => format!(
                "{} warning{}, {} error{}",
                w,
                if w == 1 { "" } else { "s" },
                e,
                if e == 1 { "" } else { "s" }
            ),
        };

        format!(
            "{} buses, {} lines, {} links, {} generators, {} loads, {} stores | {}",
            self.stats.buses,
            self.stats.lines,
            self.stats.links,
            self.stats.generators,
            self.stats.loads,
            self.stats.stores,
            issue_summary
        )
    }
}

impl std::fmt::Display for LoadDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Load: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion_counts() {
        let mut diag = LoadDiagnostics::new();
        diag.add_coercion_warning("generators", 4, "p_nom", "abc");
        diag.add_coercion_warning("lines", 0, "s_nom", "");
        diag.add_missing_id("loads", 2);

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.stats.coerced_values, 2);
        assert_eq!(diag.stats.skipped_rows, 1);
        assert!(diag.has_issues());
    }

    #[test]
    fn test_issue_display() {
        let issue = LoadIssue::new(
            Severity::Warning,
            LoadIssueKind::FieldCoercion,
            "lines",
            "could not parse 'x' in column 's_nom'",
        )
        .with_entity("L1")
        .with_row(7);

        let display = issue.to_string();
        assert!(display.contains("warning"));
        assert!(display.contains("field_coercion"));
        assert!(display.contains("(L1)"));
        assert!(display.contains("row 7"));
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let mut diag = LoadDiagnostics::new();
        diag.stats.buses = 3;
        diag.add_duplicate("buses", "DE0 0");

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"buses\": 3"));
        assert!(json.contains("\"duplicate_id\""));
        assert!(json.contains("\"entity\": \"DE0 0\""));
        assert!(!json.contains("\"row\""));
    }

    #[test]
    fn test_summary() {
        let mut diag = LoadDiagnostics::new();
        diag.stats.buses = 2;
        assert!(diag.summary().ends_with("No issues"));

        diag.add_duplicate("buses", "A 1");
        assert!(diag.summary().contains("2 buses"));
        assert!(diag.summary().ends_with("1 warning"));
    }
}
