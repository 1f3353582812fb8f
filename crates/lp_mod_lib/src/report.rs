use serde::Serialize;
use std::fmt;

/// The kinds of content a mod folder can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    FileRemaps,
    AssetRemaps,
    Tables,
    TextTables,
    Parameters,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::FileRemaps => "file remaps",
            ContentKind::AssetRemaps => "asset remaps",
            ContentKind::Tables => "tables",
            ContentKind::TextTables => "text tables",
            ContentKind::Parameters => "parameters",
        };
        f.write_str(name)
    }
}

/// Outcome of loading one mod's content.
///
/// A failing loader does not stop the others, so a report can hold both
/// applied counts and failures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub mod_id: String,
    /// Entries applied per content kind
    pub applied: Vec<(ContentKind, usize)>,
    /// Loader failures, already logged
    pub failures: Vec<(ContentKind, String)>,
}

impl LoadReport {
    pub fn new(mod_id: impl Into<String>) -> Self {
        Self {
            mod_id: mod_id.into(),
            applied: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_applied(&self) -> usize {
        self.applied.iter().map(|(_, count)| count).sum()
    }

    pub fn applied(&self, kind: ContentKind) -> usize {
        self.applied
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, count)| count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut report = LoadReport::new("faster-dash");
        assert!(report.is_ok());
        assert_eq!(report.total_applied(), 0);

        report.applied.push((ContentKind::Tables, 3));
        report.applied.push((ContentKind::Parameters, 2));
        report.applied.push((ContentKind::Tables, 1));
        report
            .failures
            .push((ContentKind::TextTables, "bad file".to_string()));

        assert!(!report.is_ok());
        assert_eq!(report.total_applied(), 6);
        assert_eq!(report.applied(ContentKind::Tables), 4);
        assert_eq!(report.applied(ContentKind::FileRemaps), 0);
    }

    #[test]
    fn test_report_serializes_kinds_in_kebab_case() {
        let mut report = LoadReport::new("m");
        report.applied.push((ContentKind::AssetRemaps, 1));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["modId"], "m");
        assert_eq!(json["applied"][0][0], "asset-remaps");
    }
}
