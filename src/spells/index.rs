use super::record::SpellRecord;

use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Subdirectory of the data directory that holds the spell files.
pub const SPELLS_SUBDIR: &str = "spells";

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("failed to read spell data directory {}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("malformed spell record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("spell record has an empty `{0}`")]
    Empty(&'static str),
}

/// Normalized lookup key: case-folded, trimmed, inner whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Validates one raw JSON record into a [`SpellRecord`].
pub fn parse_record(value: Value) -> Result<SpellRecord, RecordError> {
    let record: SpellRecord = serde_json::from_value(value)?;
    if record.name.trim().is_empty() {
        return Err(RecordError::Empty("name"));
    }
    if record.source.trim().is_empty() {
        return Err(RecordError::Empty("source"));
    }
    Ok(record)
}

/// Read-only spell index built once at startup.
#[derive(Debug, Default)]
pub struct SpellIndex {
    records: Vec<SpellRecord>,
    by_name: HashMap<String, Vec<usize>>,
    sources: BTreeSet<String>,
}

impl SpellIndex {
    /// Builds an index from in-memory records. A repeated `(name, source)`
    /// pair is dropped in favour of the first one seen.
    pub fn from_records(records: impl IntoIterator<Item = SpellRecord>) -> Self {
        let mut index = Self::default();
        let mut seen = HashSet::new();

        for record in records {
            let key = normalize_name(&record.name);
            if !seen.insert((key.clone(), record.source.to_uppercase())) {
                warn!(
                    "Skipping duplicate spell {} ({})",
                    record.name, record.source
                );
                continue;
            }

            index.sources.insert(record.source.to_uppercase());
            index
                .by_name
                .entry(key)
                .or_default()
                .push(index.records.len());
            index.records.push(record);
        }

        index
    }

    /// Loads every `*.json` file under `<data_dir>/spells`, in path order.
    ///
    /// Only an unreadable directory is fatal. Unparseable files and invalid
    /// records are logged and skipped.
    pub fn load(data_dir: &Path) -> Result<Self, DataLoadError> {
        let dir = data_dir.join(SPELLS_SUBDIR);
        info!("Loading spells from {}", dir.display());

        let entries = std::fs::read_dir(&dir).map_err(|source| DataLoadError::Directory {
            path: dir.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let index = Self::from_records(files.iter().flat_map(|path| read_spell_file(path)));

        if index.is_empty() {
            warn!("No spells found in {}", dir.display());
        } else {
            info!(
                "Loaded {} spells from {} sources",
                index.len(),
                index.sources.len()
            );
        }

        Ok(index)
    }

    /// Candidates for `name`, optionally narrowed to one source code.
    pub fn find(&self, name: &str, source: Option<&str>) -> Vec<&SpellRecord> {
        let key = normalize_name(name);
        let source = source.map(str::trim);

        let found: Vec<&SpellRecord> = self
            .by_name
            .get(&key)
            .into_iter()
            .flatten()
            .map(|&i| &self.records[i])
            .filter(|record| source.map_or(true, |s| record.source.eq_ignore_ascii_case(s)))
            .collect();

        debug!("Lookup {:?} {:?}: {} match(es)", key, source, found.len());
        found
    }

    pub fn has_source(&self, source: &str) -> bool {
        self.sources.contains(&source.trim().to_uppercase())
    }

    /// Known source codes, upper-cased and sorted.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn read_spell_file(path: &Path) -> Vec<SpellRecord> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping unreadable spell file {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let json: Value = match serde_json::from_str(&raw) {
        Ok(json) => json,
        Err(e) => {
            warn!("Skipping malformed spell file {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let items = match json {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("spell") {
            Some(Value::Array(items)) => items,
            _ => {
                debug!("{} holds no spell list, skipping", path.display());
                return Vec::new();
            }
        },
        _ => {
            debug!("{} holds no spell list, skipping", path.display());
            return Vec::new();
        }
    };

    let total = items.len();
    let records: Vec<SpellRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match parse_record(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping record #{} in {}: {}", i, path.display(), e);
                None
            }
        })
        .collect();

    debug!(
        "Read {}/{} spells from {}",
        records.len(),
        total,
        path.display()
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str, source: &str) -> SpellRecord {
        parse_record(json!({ "name": name, "source": source })).unwrap()
    }

    fn sample_index() -> SpellIndex {
        SpellIndex::from_records(vec![
            record("Fireball", "PHB"),
            record("Fireball", "SRD"),
            record("Cure Wounds", "PHB"),
            record("Toll the Dead", "XGE"),
        ])
    }

    fn write_spells(dir: &Path, file: &str, contents: &str) {
        let spells_dir = dir.join(SPELLS_SUBDIR);
        std::fs::create_dir_all(&spells_dir).unwrap();
        std::fs::write(spells_dir.join(file), contents).unwrap();
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_name("  Cure   WOUNDS "), "cure wounds");
    }

    #[test]
    fn unique_name_returns_single_record() {
        let index = sample_index();

        let found = index.find("toll the dead", None);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, "XGE");
    }

    #[test]
    fn reprinted_name_returns_every_source_in_order() {
        let index = sample_index();

        let found = index.find("Fireball", None);

        let sources: Vec<&str> = found.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["PHB", "SRD"]);
    }

    #[test]
    fn source_filter_is_exact_and_case_insensitive() {
        let index = sample_index();

        assert_eq!(index.find("Fireball", Some("phb")).len(), 1);
        assert_eq!(index.find("Fireball", Some("phb"))[0].source, "PHB");
        assert!(index.find("Fireball", Some("XGE")).is_empty());
        assert!(index.find("Fireball", Some("PH")).is_empty());
    }

    #[test]
    fn unknown_name_returns_nothing() {
        let index = sample_index();

        assert!(index.find("Nonexistent Spell", None).is_empty());
    }

    #[test]
    fn repeated_lookups_are_identical() {
        let index = sample_index();

        let first = index.find("Fireball", Some("SRD"));
        let second = index.find("Fireball", Some("SRD"));

        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_name_source_pairs_are_dropped() {
        let index = SpellIndex::from_records(vec![
            record("Light", "PHB"),
            record("light", "phb"),
            record("Light", "SRD"),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.find("light", None).len(), 2);
    }

    #[test]
    fn knows_its_sources() {
        let index = sample_index();

        assert!(index.has_source("xge"));
        assert!(!index.has_source("TCE"));
        assert_eq!(index.sources().collect::<Vec<_>>(), vec!["PHB", "SRD", "XGE"]);
    }

    #[test]
    fn empty_fields_are_rejected() {
        assert!(matches!(
            parse_record(json!({ "name": "  ", "source": "PHB" })),
            Err(RecordError::Empty("name"))
        ));
        assert!(matches!(
            parse_record(json!({ "name": "Light" })),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn load_reads_arrays_and_book_files_skipping_bad_records() {
        let dir = tempfile::tempdir().unwrap();
        write_spells(
            dir.path(),
            "a-phb.json",
            r#"{ "spell": [
                { "name": "Fireball", "source": "PHB", "level": 3 },
                { "name": "No Source" },
                { "name": "Shield", "source": "PHB", "level": "one" }
            ] }"#,
        );
        write_spells(
            dir.path(),
            "b-xge.json",
            r#"[ { "name": "Toll the Dead", "source": "XGE" } ]"#,
        );
        write_spells(dir.path(), "c-broken.json", "{ this is not json");
        write_spells(dir.path(), "index.json", r#"{ "PHB": "a-phb.json" }"#);
        write_spells(dir.path(), "notes.txt", "not a spell file");

        let index = SpellIndex::load(dir.path()).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.find("fireball", None)[0].level, 3);
        assert_eq!(index.find("Toll the Dead", Some("XGE")).len(), 1);
        assert!(index.find("Shield", None).is_empty());
    }

    #[test]
    fn load_keeps_file_order_across_reprints() {
        let dir = tempfile::tempdir().unwrap();
        write_spells(dir.path(), "2.json", r#"[ { "name": "Light", "source": "SRD" } ]"#);
        write_spells(dir.path(), "1.json", r#"[ { "name": "Light", "source": "PHB" } ]"#);

        let index = SpellIndex::load(dir.path()).unwrap();

        let sources: Vec<&str> = index
            .find("Light", None)
            .iter()
            .map(|r| r.source.as_str())
            .collect();
        assert_eq!(sources, vec!["PHB", "SRD"]);
    }

    #[test]
    fn missing_data_directory_fails() {
        let dir = tempfile::tempdir().unwrap();

        let result = SpellIndex::load(&dir.path().join("nowhere"));

        assert!(matches!(result, Err(DataLoadError::Directory { .. })));
    }
}
