//! Aggregation of classification records into the per-module diagnostic report.
//!
//! # Example
//!
//! ```rust
//! use dotshim::rewriter::{
//!     Classification, ClassificationRecord, Location, RewriteReport, Severity, SeverityPolicy,
//! };
//!
//! let records = vec![ClassificationRecord::new(
//!     Classification::DetectedConsoleAccess,
//!     Location::Module,
//!     "console-finder",
//!     "uses System.Console",
//! )];
//! let report = RewriteReport::aggregate("ExampleMod", records, &SeverityPolicy::default());
//!
//! assert_eq!(report.severity(), Some(Severity::Informational));
//! assert!(report.may_load());
//! ```

use std::{collections::BTreeSet, fmt};

use crate::rewriter::classification::{Classification, Severity, SeverityPolicy};

/// Where a classification was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// The module as a whole (header, module-level handlers)
    Module,
    /// One instruction
    Instruction {
        /// `Type::Method` of the containing method
        method: String,
        /// Position within the method's instruction list
        index: usize,
        /// Byte offset within the method body
        offset: u32,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Module => write!(f, "<module>"),
            Location::Instruction { method, offset, .. } => write!(f, "{method}+IL_{offset:04x}"),
        }
    }
}

/// One classification recorded during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRecord {
    /// What was found
    pub classification: Classification,
    /// Severity under the policy in effect; set by [`RewriteReport::aggregate`]
    pub severity: Severity,
    /// Where it was found
    pub location: Location,
    /// Name of the handler that recorded it
    pub handler: &'static str,
    /// Human-readable detail
    pub message: String,
}

impl ClassificationRecord {
    /// Creates a record with the classification's default severity
    pub fn new(
        classification: Classification,
        location: Location,
        handler: &'static str,
        message: impl Into<String>,
    ) -> Self {
        ClassificationRecord {
            classification,
            severity: SeverityPolicy::default_severity(classification),
            location,
            handler,
            message: message.into(),
        }
    }
}

impl fmt::Display for ClassificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {} ({}): {}",
            self.severity, self.classification, self.location, self.handler, self.message
        )
    }
}

/// The diagnostic report of one rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    module: String,
    records: Vec<ClassificationRecord>,
    severity: Option<Severity>,
    may_load: bool,
}

impl RewriteReport {
    /// Folds records into a report, assigning each record its severity under `policy`.
    ///
    /// Pure: aggregating the records of a report again with the same policy yields an
    /// equal report.
    #[must_use]
    pub fn aggregate(
        module: impl Into<String>,
        records: Vec<ClassificationRecord>,
        policy: &SeverityPolicy,
    ) -> Self {
        let records: Vec<ClassificationRecord> = records
            .into_iter()
            .map(|mut record| {
                record.severity = policy.severity(record.classification);
                record
            })
            .collect();

        let severity = records.iter().map(|r| r.severity).max();
        let may_load = records.iter().all(|r| r.severity < Severity::Blocking);

        RewriteReport {
            module: module.into(),
            records,
            severity,
            may_load,
        }
    }

    /// Name of the processed module
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// All records in the order they were recorded
    #[must_use]
    pub fn records(&self) -> &[ClassificationRecord] {
        &self.records
    }

    /// Consumes the report, returning its records
    #[must_use]
    pub fn into_records(self) -> Vec<ClassificationRecord> {
        self.records
    }

    /// The highest recorded severity, `None` if nothing was recorded
    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    /// Returns `true` unless a blocking classification was recorded
    #[must_use]
    pub fn may_load(&self) -> bool {
        self.may_load
    }

    /// Returns `true` if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The distinct classifications that were recorded
    #[must_use]
    pub fn classifications(&self) -> BTreeSet<Classification> {
        self.records.iter().map(|r| r.classification).collect()
    }

    /// Returns `true` if the classification was recorded at least once
    #[must_use]
    pub fn has(&self, classification: Classification) -> bool {
        self.records.iter().any(|r| r.classification == classification)
    }

    /// How often a classification was recorded
    #[must_use]
    pub fn count(&self, classification: Classification) -> usize {
        self.records_for(classification).count()
    }

    /// The records of one classification
    pub fn records_for(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &ClassificationRecord> {
        self.records
            .iter()
            .filter(move |r| r.classification == classification)
    }

    /// One-line summary for operator logs
    #[must_use]
    pub fn summary(&self) -> String {
        if self.records.is_empty() {
            return format!("{}: no findings", self.module);
        }

        let counts: Vec<String> = self
            .classifications()
            .into_iter()
            .map(|c| format!("{c} x{}", self.count(c)))
            .collect();
        format!(
            "{}: {} ({}), {}",
            self.module,
            self.severity.map_or_else(String::new, |s| s.to_string()),
            if self.may_load { "may load" } else { "blocked" },
            counts.join(", ")
        )
    }
}

impl fmt::Display for RewriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for record in &self.records {
            writeln!(f, "  {record}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(index: usize) -> Location {
        Location::Instruction {
            method: "Mod.ModEntry::Entry".to_string(),
            index,
            offset: u32::try_from(index).unwrap() * 5,
        }
    }

    fn record(classification: Classification, index: usize) -> ClassificationRecord {
        ClassificationRecord::new(classification, at(index), "test", "")
    }

    #[test]
    fn empty_report() {
        let report = RewriteReport::aggregate("Mod", Vec::new(), &SeverityPolicy::default());
        assert!(report.is_empty());
        assert!(report.may_load());
        assert_eq!(report.severity(), None);
        assert_eq!(report.summary(), "Mod: no findings");
    }

    #[test]
    fn severity_is_maximum() {
        let report = RewriteReport::aggregate(
            "Mod",
            vec![
                record(Classification::Rewritten, 0),
                record(Classification::DetectedShellAccess, 1),
                record(Classification::DetectedConsoleAccess, 2),
            ],
            &SeverityPolicy::default(),
        );

        assert_eq!(report.severity(), Some(Severity::Warning));
        assert!(report.may_load());
        assert_eq!(report.classifications().len(), 3);
    }

    #[test]
    fn blocking_prevents_load() {
        let report = RewriteReport::aggregate(
            "Mod",
            vec![
                record(Classification::DetectedBrokenReference, 0),
                record(Classification::DetectedBrokenReference, 3),
            ],
            &SeverityPolicy::default(),
        );

        assert!(!report.may_load());
        assert_eq!(report.count(Classification::DetectedBrokenReference), 2);
        assert!(report.summary().contains("detected-broken-reference x2"));
        assert!(report.to_string().contains("Mod.ModEntry::Entry+IL_000f"));
    }

    #[test]
    fn aggregate_is_idempotent() {
        let policy = SeverityPolicy::default()
            .with_severity(Classification::DetectedConsoleAccess, Severity::Blocking);
        let first = RewriteReport::aggregate(
            "Mod",
            vec![
                record(Classification::DetectedConsoleAccess, 0),
                record(Classification::Rewritten, 1),
            ],
            &policy,
        );
        let second = RewriteReport::aggregate("Mod", first.records().to_vec(), &policy);

        assert_eq!(first, second);
        assert!(!second.may_load());
    }

    #[test]
    fn architecture_failure_blocks_under_any_policy() {
        let report = RewriteReport::aggregate(
            "Mod",
            vec![ClassificationRecord::new(
                Classification::ArchitectureRewriteFailed,
                Location::Module,
                "architecture",
                "mixed-mode image targets 32-bit",
            )],
            &SeverityPolicy::permissive(),
        );
        assert!(!report.may_load());
        assert_eq!(report.severity(), Some(Severity::Blocking));
    }
}
