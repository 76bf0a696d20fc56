use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticCounts {
    pub errors: usize,
    pub warnings: usize,
}

impl DiagnosticCounts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Information | Severity::Hint => {},
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}

/// Error and warning counts per file, summed into every ancestor directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticSnapshot {
    counts: HashMap<PathBuf, DiagnosticCounts>,
}

impl DiagnosticSnapshot {
    pub fn new(diagnostics: impl IntoIterator<Item = Diagnostic>) -> Self {
        let mut counts: HashMap<PathBuf, DiagnosticCounts> = HashMap::new();
        for diagnostic in diagnostics {
            if !matches!(diagnostic.severity, Severity::Error | Severity::Warning)
            {
                continue;
            }
            for path in diagnostic.path.ancestors() {
                if path.as_os_str().is_empty() {
                    break;
                }
                counts
                    .entry(path.to_path_buf())
                    .or_default()
                    .add(diagnostic.severity);
            }
        }
        Self { counts }
    }

    pub fn counts(&self, path: &Path) -> DiagnosticCounts {
        self.counts.get(path).copied().unwrap_or_default()
    }

    /// Paths whose counts differ between `previous` and `self`.
    pub fn changed_paths(
        &self,
        previous: &DiagnosticSnapshot,
    ) -> BTreeSet<PathBuf> {
        let candidates: HashSet<&PathBuf> =
            self.counts.keys().chain(previous.counts.keys()).collect();
        candidates
            .into_iter()
            .filter(|path| self.counts(path) != previous.counts(path))
            .cloned()
            .collect()
    }
}
