//! Config module.
//! Manages I/O for config.json (the link list behind the dashboard page).
//! Uses serde for JSON serialization with a strict shape: unknown keys,
//! missing required fields and duplicate ids are rejected at load time.
//! Writes are atomic (temp file in the same directory, then rename).
//! Read-modify-write cycles take a sibling `.lock` file for their duration.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{LinkError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_ICON: &str = "fas fa-link";

const LOCK_POLL: Duration = Duration::from_millis(25);
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

// *************** Document Types ***************

/// One addressable destination on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkEntry {
    pub id: String,
    /// Display name. Older files call this `name`.
    #[serde(alias = "name")]
    pub label: String,
    /// URL or local file path. Older files call this `url`.
    #[serde(alias = "url")]
    pub target: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl LinkEntry {
    /// Grouping key used for display. Surrounding whitespace is ignored and an
    /// empty category falls back to the default group.
    pub fn category_name(&self) -> &str {
        match self.category.trim() {
            "" => DEFAULT_CATEGORY,
            name => name,
        }
    }
}

/// Root document of config.json.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

impl Configuration {
    pub fn find(&self, id: &str) -> Option<&LinkEntry> {
        self.links.iter().find(|link| link.id == id)
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

// *************** Parsing ***************

/// Parses a config document, enforcing the id invariants serde cannot express.
pub fn parse_document(path: &Path, text: &str) -> Result<Configuration> {
    let malformed = |reason: String| LinkError::MalformedConfig {
        path: path.to_path_buf(),
        reason,
    };

    let config: Configuration =
        serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;

    let mut seen = HashSet::new();
    for link in &config.links {
        if link.id.trim().is_empty() {
            return Err(malformed(format!("link '{}' has an empty id", link.label)));
        }
        if !seen.insert(link.id.as_str()) {
            return Err(malformed(format!("duplicate link id '{}'", link.id)));
        }
    }

    Ok(config)
}

/// Serializes a config document: two-space indent, trailing newline.
pub fn render_document(config: &Configuration) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(config)?;
    text.push('\n');
    Ok(text)
}

// *************** Store ***************

/// The on-disk config file plus its load/save/lock contract.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the file. A missing file is an I/O error.
    pub fn load(&self) -> Result<Configuration> {
        let text = fs::read_to_string(&self.path).map_err(|e| LinkError::io(&self.path, e))?;
        let config = parse_document(&self.path, &text)?;
        debug!(path = %self.path.display(), links = config.links.len(), "loaded config");
        Ok(config)
    }

    /// Like [`Store::load`], but writes an empty document first if the file does not exist yet.
    pub fn load_or_init(&self) -> Result<Configuration> {
        match fs::metadata(&self.path) {
            Ok(_) => self.load(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "config not found, creating an empty one");
                let config = Configuration::default();
                self.save(&config)?;
                Ok(config)
            }
            Err(e) => Err(LinkError::io(&self.path, e)),
        }
    }

    /// Replaces the file with `config`. Either the old or the new document survives a crash.
    pub fn save(&self, config: &Configuration) -> Result<()> {
        let text = render_document(config).map_err(|e| LinkError::io(&self.path, e.into()))?;
        write_atomic(&self.path, text.as_bytes())?;
        info!(path = %self.path.display(), links = config.links.len(), "saved config");
        Ok(())
    }

    /// Takes the exclusive editor lock, waiting up to a few seconds for another holder.
    pub fn lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(lock_path(&self.path))
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Writes `bytes` to a temp file next to `path` and renames it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| LinkError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| LinkError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| LinkError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| LinkError::io(path, e.error))?;
    Ok(())
}

// *************** Lock ***************

/// Guard for the exclusive `<config>.lock` file. Dropping it releases the lock.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(path: PathBuf) -> Result<Self> {
        let start = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    debug!(lock = %path.display(), "acquired config lock");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if start.elapsed() >= LOCK_TIMEOUT {
                        let source = io::Error::new(
                            io::ErrorKind::WouldBlock,
                            "lock is held by another editor; remove the file if it is stale",
                        );
                        return Err(LinkError::io(path, source));
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(LinkError::io(path, e)),
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), "failed to release config lock: {e}");
        }
    }
}

// *************** Tests ***************
