use crate::error::FormatError;
use crate::record::{parse_line, ResourceRecord};
use std::collections::HashMap;
use std::path::Path;

/// §3 Zone: a mapping from record name to a single [`ResourceRecord`],
/// loaded once and immutable thereafter.
#[derive(Debug, Default)]
pub struct Zone {
    records: HashMap<String, ResourceRecord>,
}

impl Zone {
    /// Parses `text` line by line. A later record with the same `name`
    /// overwrites an earlier one.
    pub fn load_str(text: &str) -> Result<Self, FormatError> {
        let mut records = HashMap::new();
        for line in text.split(['\n', '\r']) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record = parse_line(trimmed)?;
            records.insert(record.name.clone(), record);
        }
        Ok(Self { records })
    }

    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::load_str(&text).map_err(|err| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())
        })
    }

    /// Derives `<base_dir>/rsrc/zone_files/<zone-name>.zone` and loads it.
    /// `base_dir` is the directory that directly contains `rsrc/` — the
    /// crate root for the shipped config and zone fixtures, or whatever
    /// `--base-dir` names for a standalone server.
    pub fn load_named(base_dir: impl AsRef<Path>, zone_name: &str) -> std::io::Result<Self> {
        let path = base_dir
            .as_ref()
            .join("rsrc")
            .join("zone_files")
            .join(format!("{zone_name}.zone"));
        Self::load_path(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// §4.2 longest-suffix match: the record whose name is the longest
    /// suffix of `query`, or `None`. Byte-wise `ends_with`, no label-
    /// boundary awareness — intentional, see §9.
    pub fn longest_suffix_match(&self, query: &str) -> Option<&ResourceRecord> {
        self.records
            .values()
            .filter(|record| query.ends_with(record.name.as_str()))
            .max_by_key(|record| record.name.len())
    }
}
