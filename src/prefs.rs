//! Key-value preference storage.
//!
//! Preferences live in one named namespace (`standby_prefs`) stored as a flat
//! JSON object on disk. Only integers are stored today.
//!
//! ## Rust concepts
//! - Trait objects for swappable storage (`JsonFilePreferences` on the
//!   device, `MemoryPreferences` in tests)
//! - `serde_json::Map` for an untyped JSON object
//! - Writing to a temp file and renaming, so a crash never leaves half a file

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Namespace the clock's preferences are stored under.
pub const PREFS_NAME: &str = "standby_prefs";

pub trait PreferenceStore: Send {
    /// Read an integer. Missing keys and non-integer values read as `None`.
    fn get_int(&self, key: &str) -> Option<i64>;

    /// Store an integer synchronously.
    fn put_int(&mut self, key: &str, value: i64) -> Result<(), Box<dyn std::error::Error>>;
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Box<T> {
    fn get_int(&self, key: &str) -> Option<i64> {
        (**self).get_int(key)
    }

    fn put_int(&mut self, key: &str, value: i64) -> Result<(), Box<dyn std::error::Error>> {
        (**self).put_int(key, value)
    }
}

/// Preferences persisted to `<dir>/standby_prefs.json`.
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFilePreferences {
    /// Open the namespace file in `dir`.
    ///
    /// A missing, unreadable, or corrupt file is treated as empty: preference
    /// loss only means falling back to defaults.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(format!("{PREFS_NAME}.json"));
        let values = match read_values(&path) {
            Ok(values) => values,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("Ignoring unreadable preferences {}: {}", path.display(), e);
                }
                Map::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_values(path: &Path) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    match serde_json::from_str(&text)? {
        Value::Object(map) => Ok(map),
        _ => Err("preferences file is not a JSON object".into()),
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    fn put_int(&mut self, key: &str, value: i64) -> Result<(), Box<dyn std::error::Error>> {
        self.values.insert(key.to_string(), Value::from(value));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store, for tests and runs without a preferences directory.
#[derive(Default)]
pub struct MemoryPreferences {
    values: HashMap<String, i64>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    fn put_int(&mut self, key: &str, value: i64) -> Result<(), Box<dyn std::error::Error>> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
