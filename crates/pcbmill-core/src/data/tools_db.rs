//! Tools database - default parameters keyed by tool diameter
//!
//! A record matches a requested diameter when the difference is within the
//! record's tolerance and the record targets the requested kind of work.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::tools::ParamSet;
use crate::error::{Error, FailKind, FailResult, Result};

/// Kind of work a database record applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolTarget {
    #[default]
    Milling,
    Drilling,
    Isolation,
    Paint,
}

/// One tools database entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDbRecord {
    pub name: String,
    pub diameter: f64,
    #[serde(default)]
    pub tolerance: f64,
    #[serde(default)]
    pub tool_target: ToolTarget,
    #[serde(default)]
    pub params: ParamSet,
}

impl ToolDbRecord {
    pub fn matches(&self, diameter: f64, target: ToolTarget) -> bool {
        self.tool_target == target && (self.diameter - diameter).abs() <= self.tolerance + 1e-9
    }
}

/// Collection of tool database records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolsDatabase {
    records: Vec<ToolDbRecord>,
}

impl ToolsDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: ToolDbRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ToolDbRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up the default parameters for a diameter
    ///
    /// Returns `Ok(None)` on a miss. More than one match is a hard failure.
    pub fn lookup(&self, diameter: f64, target: ToolTarget) -> FailResult<Option<ParamSet>> {
        let matches: Vec<&ToolDbRecord> = self
            .records
            .iter()
            .filter(|r| r.matches(diameter, target))
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [record] => {
                tracing::debug!("Tools DB match '{}' for diameter {}", record.name, diameter);
                Ok(Some(record.params.clone()))
            }
            _ => Err(FailKind::MultipleDbMatches {
                diameter,
                count: matches.len(),
            }),
        }
    }

    /// Load a database from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let db: ToolsDatabase = serde_json::from_str(&content)?;
        tracing::info!("Loaded {} tools DB records from {:?}", db.len(), path);
        Ok(db)
    }

    /// Save the database as pretty JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, diameter: f64, tolerance: f64, cut_z: f64) -> ToolDbRecord {
        ToolDbRecord {
            name: name.to_string(),
            diameter,
            tolerance,
            tool_target: ToolTarget::Milling,
            params: ParamSet {
                cut_z,
                ..ParamSet::default()
            },
        }
    }

    #[test]
    fn test_lookup_found_and_miss() {
        let mut db = ToolsDatabase::new();
        db.add(record("1mm", 1.0, 0.01, -1.7));

        let found = db.lookup(1.005, ToolTarget::Milling).unwrap().unwrap();
        assert_eq!(found.cut_z, -1.7);
        assert!(db.lookup(1.2, ToolTarget::Milling).unwrap().is_none());
        assert!(db.lookup(1.0, ToolTarget::Drilling).unwrap().is_none());
    }

    #[test]
    fn test_lookup_ambiguous() {
        let mut db = ToolsDatabase::new();
        db.add(record("a", 1.0, 0.1, -1.0));
        db.add(record("b", 1.05, 0.1, -1.2));
        let err = db.lookup(1.02, ToolTarget::Milling).unwrap_err();
        assert!(matches!(err, FailKind::MultipleDbMatches { count: 2, .. }));
    }
}
