//! Item id → name/icon catalogs loaded from game data dumps.
//!
//! Two on-disk shapes are understood:
//!
//! - plain mappings: `{"123": {"name": "...", "icon": "..."}}` or the
//!   shorthand `{"123": "Name"}`
//! - `ItemTable.json` dumps: an outer object whose values carry `Id`,
//!   `Name`, and `Icon`, with the outer key as id fallback
//!
//! Multiple sources merge left-to-right; later sources overwrite earlier
//! entries for the same id. Unreadable or invalid sources are skipped with a
//! warning so that one stale dump does not take the whole catalog down.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::consolidate::ItemResolver;
use crate::error::CatalogError;

/// Display metadata for one game item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    /// Item configuration id.
    pub item_id: u64,
    /// Human-readable display name.
    pub name: String,
    /// Icon path, when the source carried one.
    pub icon: Option<String>,
}

/// Filenames probed when scanning a directory source, case-insensitive.
const SOURCE_PATTERNS: [&str; 2] = ["item_name_map.json", "itemtable.json"];

/// Repository-relative locations probed when no sources are given.
const DEFAULT_SEARCH_LOCATIONS: [&str; 4] = [
    "data/game-data/item_name_map.json",
    "ref/StarResonanceData/item_name_map.json",
    "ref/StarResonanceData/ztable/item_name_map.json",
    "ref/StarResonanceData/ztable/ItemTable.json",
];

/// Default root scanned by the mapping rebuild when no sources are given.
const DEFAULT_SOURCE_ROOT: &str = "ref/StarResonanceData";

/// An id-keyed item catalog.
#[derive(Debug, Default, Clone)]
pub struct ItemCatalog {
    entries: HashMap<u64, ItemRecord>,
}

impl ItemCatalog {
    /// Merge all readable candidate files; later sources win per item id.
    ///
    /// Non-files are skipped silently, unparseable files with a warning.
    pub fn from_sources<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut entries = HashMap::new();
        for path in paths {
            if !path.is_file() {
                continue;
            }
            match load_source(&path) {
                Ok(loaded) => {
                    tracing::debug!(
                        path = %path.display(),
                        entries = loaded.len(),
                        "loaded item source"
                    );
                    entries.extend(loaded);
                },
                Err(err) => {
                    tracing::warn!(path = %path.display(), "skipping item source: {err}");
                },
            }
        }
        Self { entries }
    }

    /// The default repository-relative probe locations.
    #[must_use]
    pub fn default_sources() -> Vec<PathBuf> {
        DEFAULT_SEARCH_LOCATIONS.iter().map(PathBuf::from).collect()
    }

    /// The default data-dump root scanned by the mapping rebuild.
    #[must_use]
    pub fn default_source_roots() -> Vec<PathBuf> {
        vec![PathBuf::from(DEFAULT_SOURCE_ROOT)]
    }

    /// Expand files and directories into candidate mapping files.
    ///
    /// Files pass through as-is; directories are walked recursively for the
    /// known table filenames, sorted for deterministic merge order.
    #[must_use]
    pub fn discover_sources(roots: &[PathBuf]) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for root in roots {
            if root.is_file() {
                candidates.push(root.clone());
                continue;
            }
            if !root.is_dir() {
                tracing::debug!(root = %root.display(), "skipping missing source root");
                continue;
            }
            let mut matches: Vec<PathBuf> = WalkDir::new(root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    let name = entry.file_name().to_string_lossy();
                    SOURCE_PATTERNS.iter().any(|pattern| name.eq_ignore_ascii_case(pattern))
                })
                .map(walkdir::DirEntry::into_path)
                .collect();
            matches.sort();
            candidates.extend(matches);
        }
        candidates
    }

    /// Number of items in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up one item.
    #[must_use]
    pub fn get(&self, item_id: u64) -> Option<&ItemRecord> {
        self.entries.get(&item_id)
    }

    /// Serialize as a plain mapping, ids ascending, with the given indent.
    ///
    /// The output is the `{"id": {"name", "icon"?}}` shape that
    /// [`Self::from_sources`] reads back, with a trailing newline.
    pub fn to_mapping_json(&self, indent: usize) -> Result<String, CatalogError> {
        let sorted: BTreeMap<u64, &ItemRecord> =
            self.entries.iter().map(|(id, record)| (*id, record)).collect();

        let mut mapping = Map::new();
        for (item_id, record) in sorted {
            let mut entry = Map::new();
            entry.insert("name".to_owned(), Value::from(record.name.clone()));
            if let Some(icon) = &record.icon {
                if !icon.is_empty() {
                    entry.insert("icon".to_owned(), Value::from(icon.clone()));
                }
            }
            mapping.insert(item_id.to_string(), Value::Object(entry));
        }

        let indent_bytes = vec![b' '; indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent_bytes);
        let mut rendered = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut rendered, formatter);
        Value::Object(mapping).serialize(&mut serializer)?;

        let mut text = String::from_utf8_lossy(&rendered).into_owned();
        text.push('\n');
        Ok(text)
    }
}

impl ItemResolver for ItemCatalog {
    fn resolve(&self, item_id: u64) -> Option<ItemRecord> {
        self.get(item_id).cloned()
    }
}

/// Parse one source file, dispatching on its filename.
fn load_source(path: &Path) -> Result<HashMap<u64, ItemRecord>, CatalogError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| CatalogError::Io { path: path.to_path_buf(), source })?;
    let payload: Value = serde_json::from_str(&text)
        .map_err(|source| CatalogError::InvalidJson { path: path.to_path_buf(), source })?;

    let is_item_table = path
        .file_name()
        .map(|name| name.to_string_lossy().eq_ignore_ascii_case("itemtable.json"))
        .unwrap_or(false);

    Ok(if is_item_table { parse_item_table(&payload) } else { parse_plain_mapping(&payload) })
}

/// Parse the `{"123": {"name", "icon"} | "Name"}` shape.
fn parse_plain_mapping(payload: &Value) -> HashMap<u64, ItemRecord> {
    let mut mapping = HashMap::new();
    let Some(object) = payload.as_object() else {
        return mapping;
    };

    for (raw_key, value) in object {
        // Non-numeric keys are metadata or comments.
        let Ok(item_id) = raw_key.parse::<u64>() else {
            continue;
        };
        let (name, icon) = match value {
            Value::Object(fields) => {
                let name = fields
                    .get("name")
                    .or_else(|| fields.get("Name"))
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                let icon = fields
                    .get("icon")
                    .or_else(|| fields.get("Icon"))
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                (name, icon)
            },
            Value::String(name) => (Some(name.clone()), None),
            Value::Number(number) => (Some(number.to_string()), None),
            _ => (None, None),
        };
        let Some(name) = name.filter(|name| !name.is_empty()) else {
            continue;
        };
        mapping.insert(item_id, ItemRecord { item_id, name, icon });
    }
    mapping
}

/// Parse the `ItemTable.json` shape: values with `Id`/`Name`/`Icon`, outer
/// key as id fallback.
fn parse_item_table(payload: &Value) -> HashMap<u64, ItemRecord> {
    let mut mapping = HashMap::new();
    let Some(object) = payload.as_object() else {
        return mapping;
    };

    for (raw_key, value) in object {
        let Some(fields) = value.as_object() else {
            continue;
        };
        let name = fields.get("Name").and_then(Value::as_str);
        let icon = fields.get("Icon").and_then(Value::as_str).map(str::to_owned);

        let item_id = match fields.get("Id").and_then(Value::as_u64) {
            Some(id) => id,
            None => match raw_key.parse::<u64>() {
                Ok(id) => id,
                Err(_) => continue,
            },
        };
        let Some(name) = name.filter(|name| !name.is_empty()) else {
            continue;
        };
        mapping.insert(item_id, ItemRecord { item_id, name: name.to_owned(), icon });
    }
    mapping
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_plain_mapping_with_both_value_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "item_name_map.json",
            r#"{
                "100": {"name": "Iron Sword", "icon": "icons/iron.png"},
                "200": "Bare Name",
                "not-a-number": "skipped",
                "300": {"icon": "icons/orphan.png"}
            }"#,
        );

        let catalog = ItemCatalog::from_sources(vec![path]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(100).unwrap().name, "Iron Sword");
        assert_eq!(catalog.get(100).unwrap().icon.as_deref(), Some("icons/iron.png"));
        assert_eq!(catalog.get(200).unwrap().name, "Bare Name");
        assert!(catalog.get(300).is_none());
    }

    #[test]
    fn loads_item_table_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "ItemTable.json",
            r#"{
                "row1": {"Id": 41, "Name": "Herb", "Icon": "icons/herb.png"},
                "42": {"Name": "Keyed Herb"},
                "row3": {"Icon": "icons/nameless.png"}
            }"#,
        );

        let catalog = ItemCatalog::from_sources(vec![path]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(41).unwrap().name, "Herb");
        // Outer key used when Id is missing.
        assert_eq!(catalog.get(42).unwrap().name, "Keyed Herb");
    }

    #[test]
    fn later_sources_overwrite_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "first.json", r#"{"1": "Old Name", "2": "Kept"}"#);
        let second = write(dir.path(), "second.json", r#"{"1": "New Name"}"#);

        let catalog = ItemCatalog::from_sources(vec![first, second]);
        assert_eq!(catalog.get(1).unwrap().name, "New Name");
        assert_eq!(catalog.get(2).unwrap().name, "Kept");
    }

    #[test]
    fn invalid_sources_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let broken = write(dir.path(), "broken.json", "{nope");
        let good = write(dir.path(), "good.json", r#"{"5": "Fine"}"#);
        let missing = dir.path().join("missing.json");

        let catalog = ItemCatalog::from_sources(vec![broken, missing, good]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(5).unwrap().name, "Fine");
    }

    #[test]
    fn discovery_walks_directories_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("ztable");
        fs::create_dir(&sub).unwrap();
        write(dir.path(), "item_name_map.json", "{}");
        write(&sub, "ItemTable.json", "{}");
        write(&sub, "unrelated.json", "{}");
        let stray = write(dir.path(), "stray.json", "{}");

        let candidates =
            ItemCatalog::discover_sources(&[dir.path().to_path_buf(), stray.clone()]);
        assert_eq!(candidates.len(), 3);
        assert!(candidates.contains(&stray));
        assert!(!candidates.iter().any(|path| path.ends_with("unrelated.json")));
    }

    #[test]
    fn mapping_json_is_sorted_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "item_name_map.json",
            r#"{"10": "Ten", "2": {"name": "Two", "icon": "icons/two.png"}}"#,
        );

        let catalog = ItemCatalog::from_sources(vec![path]);
        let rendered = catalog.to_mapping_json(2).unwrap();

        // Numeric ordering, not lexicographic.
        let two_pos = rendered.find("\"2\"").unwrap();
        let ten_pos = rendered.find("\"10\"").unwrap();
        assert!(two_pos < ten_pos);

        let reload = write(dir.path(), "reloaded_map.json", &rendered);
        let reloaded = ItemCatalog::from_sources(vec![reload]);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(2).unwrap().icon.as_deref(), Some("icons/two.png"));
    }
}
