use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    path::Path,
    sync::{Mutex, PoisonError},
};

use anyhow::Context;
use zip::{ZipArchive, result::ZipError};

use crate::foundation::error::{CgError, CgResult};

const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

// Declared entry sizes come from the archive and are only trusted up to this bound.
fn prealloc_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

/// Read access to the named entries of a container.
///
/// Entry names are compared after [`normalize_entry_name`].
pub trait ArchiveStore: Send + Sync {
    /// Raw bytes of `entry`; [`CgError::EntryNotFound`] when absent.
    fn bytes(&self, entry: &str) -> CgResult<Vec<u8>>;

    /// UTF-8 text of `entry`.
    fn text(&self, entry: &str) -> CgResult<String> {
        let bytes = self.bytes(entry)?;
        String::from_utf8(bytes).map_err(|e| {
            CgError::invalid_container(format!("entry '{entry}' is not valid UTF-8: {e}"))
        })
    }

    /// Return `true` when `entry` exists.
    fn contains(&self, entry: &str) -> bool;

    /// Normalized names of all file entries, sorted.
    fn entry_names(&self) -> Vec<String>;
}

/// Normalize an archive entry name.
///
/// The normalized result uses `/` separators, removes `.` and empty segments, and rejects
/// absolute names or parent traversals (`..`).
pub fn normalize_entry_name(name: &str) -> CgResult<String> {
    let s = name.replace('\\', "/");
    if s.starts_with('/') {
        return Err(CgError::validation(format!(
            "entry name '{name}' must be relative"
        )));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(CgError::validation(format!(
                "entry name '{name}' must not contain '..'"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(CgError::validation(format!(
            "entry name '{name}' must contain a file name"
        )));
    }

    Ok(out.join("/"))
}

fn lookup_key(entry: &str) -> CgResult<String> {
    normalize_entry_name(entry).map_err(|_| CgError::EntryNotFound(entry.to_string()))
}

/// Zip-backed container (the on-disk cgcompress / OpenRaster layout).
pub struct ZipArchiveStore<R> {
    archive: Mutex<ZipArchive<R>>,
    // normalized name -> name as stored in the zip directory
    names: BTreeMap<String, String>,
}

impl ZipArchiveStore<BufReader<File>> {
    /// Open a container file from disk.
    pub fn open(path: impl AsRef<Path>) -> CgResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("open container '{}'", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }
}

impl ZipArchiveStore<Cursor<Vec<u8>>> {
    /// Open a container held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> CgResult<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ZipArchiveStore<R> {
    /// Read the zip central directory from `reader`.
    pub fn from_reader(reader: R) -> CgResult<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| CgError::invalid_container(format!("not a zip archive: {e}")))?;

        let mut names = BTreeMap::new();
        for raw in archive.file_names() {
            if raw.ends_with('/') {
                continue;
            }
            match normalize_entry_name(raw) {
                Ok(norm) => {
                    if names.insert(norm, raw.to_string()).is_some() {
                        return Err(CgError::invalid_container(format!(
                            "duplicate entry '{raw}'"
                        )));
                    }
                }
                Err(_) => tracing::warn!(entry = raw, "ignoring zip entry with unusable name"),
            }
        }

        Ok(Self {
            archive: Mutex::new(archive),
            names,
        })
    }
}

impl<R: Read + Seek + Send> ArchiveStore for ZipArchiveStore<R> {
    fn bytes(&self, entry: &str) -> CgResult<Vec<u8>> {
        let key = lookup_key(entry)?;
        let Some(raw) = self.names.get(&key) else {
            return Err(CgError::EntryNotFound(entry.to_string()));
        };

        let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = match archive.by_name(raw) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Err(CgError::EntryNotFound(entry.to_string())),
            Err(e) => {
                return Err(CgError::invalid_container(format!(
                    "cannot read entry '{raw}': {e}"
                )));
            }
        };

        let mut out = Vec::with_capacity(prealloc_hint(file.size()));
        file.read_to_end(&mut out)
            .with_context(|| format!("read zip entry '{raw}'"))?;
        Ok(out)
    }

    fn contains(&self, entry: &str) -> bool {
        lookup_key(entry).is_ok_and(|key| self.names.contains_key(&key))
    }

    fn entry_names(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }
}

/// Container whose entries live in a plain map; useful for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryArchiveStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryArchiveStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, name: &str, bytes: impl Into<Vec<u8>>) -> CgResult<()> {
        self.entries
            .insert(normalize_entry_name(name)?, bytes.into());
        Ok(())
    }

    /// Builder-style [`MemoryArchiveStore::insert`].
    pub fn with_entry(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> CgResult<Self> {
        self.insert(name, bytes)?;
        Ok(self)
    }
}

impl ArchiveStore for MemoryArchiveStore {
    fn bytes(&self, entry: &str) -> CgResult<Vec<u8>> {
        let key = lookup_key(entry)?;
        self.entries
            .get(&key)
            .cloned()
            .ok_or_else(|| CgError::EntryNotFound(entry.to_string()))
    }

    fn contains(&self, entry: &str) -> bool {
        lookup_key(entry).is_ok_and(|key| self.entries.contains_key(&key))
    }

    fn entry_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/archive.rs"]
mod tests;
