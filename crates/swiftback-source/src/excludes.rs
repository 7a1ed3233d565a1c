use crate::SourceError;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;

/// Exclusion literals matched against a file or directory's final path
/// component. An excluded directory is skipped with its whole subtree.
#[derive(Debug, Default, Clone)]
pub struct ExcludeSet {
    names: HashSet<String>,
}

impl ExcludeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a newline-delimited exclude file. Each non-empty trimmed line
    /// is one literal.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| SourceError::Excludes {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut set = Self::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            set.insert(line);
        }
        Ok(set)
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_owned());
    }

    pub fn matches(&self, file_name: &OsStr) -> bool {
        match file_name.to_str() {
            Some(name) => self.names.contains(name),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
