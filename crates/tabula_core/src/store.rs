use crate::GridError;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Durable key-value store for per-table display preferences.
///
/// Values are JSON documents; the engine serializes its own payloads
/// (e.g. column configuration) before handing them over.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, GridError>;
    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), GridError>;
}

/// File-backed store keeping all preferences in a single JSON document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new() -> Result<Self, GridError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GridError::Io(std::io::Error::other("Could not find config directory")))?;

        let app_dir = config_dir.join("tabula");
        fs::create_dir_all(&app_dir)?;

        Ok(Self {
            path: app_dir.join("preferences.json"),
        })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load_all(&self) -> Result<HashMap<String, serde_json::Value>, GridError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| GridError::PreferenceStore(e.to_string()))
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, GridError> {
        Ok(self.load_all()?.remove(key))
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), GridError> {
        let mut all = self.load_all()?;
        all.insert(key.to_string(), value);

        let content = serde_json::to_string_pretty(&all)
            .map_err(|e| GridError::PreferenceStore(e.to_string()))?;
        fs::write(&self.path, content)?;

        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
///
/// An injected write error makes every `set` fail, for exercising the
/// persistence-failure path.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
    write_error: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_error(message: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            write_error: Some(message.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, GridError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| GridError::PreferenceStore("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), GridError> {
        if let Some(message) = &self.write_error {
            return Err(GridError::PreferenceStore(message.clone()));
        }

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GridError::PreferenceStore("store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
