//! On-disk vocabulary cache with a JSON manifest.
//!
//! Layout:
//!
//! ```text
//! <dir>/manifest.json       {"version": 1, "entries": {"cl100k_base": {...}}}
//! <dir>/cl100k_base.tiktoken
//! ```
//!
//! The manifest, not the presence of a file, decides what is cached. Files
//! are written to a temporary name and renamed into place, and the manifest
//! is rewritten after every change.

use std::collections::BTreeMap;
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{sha256_hex, ProvisionError};
use crate::core::EncodingFamily;

/// File name of the manifest inside the cache directory.
pub const MANIFEST_FILE: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;
const CACHE_DIR_ENV: &str = "RANKTOK_CACHE_DIR";
const TIKTOKEN_CACHE_DIR_ENV: &str = "TIKTOKEN_CACHE_DIR";

/// Where the cache lives and how strictly it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub dir: PathBuf,
    /// Re-hash cached files on every read.
    pub verify_on_read: bool,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            verify_on_read: true,
        }
    }

    /// Resolve the cache directory from the environment.
    ///
    /// `RANKTOK_CACHE_DIR`, then `TIKTOKEN_CACHE_DIR`, then
    /// `<temp dir>/ranktok-cache`. Empty values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dir = [CACHE_DIR_ENV, TIKTOKEN_CACHE_DIR_ENV]
            .into_iter()
            .filter_map(|key| lookup(key))
            .find(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("ranktok-cache"));
        Self::new(dir)
    }

    pub fn verify_on_read(mut self, verify: bool) -> Self {
        self.verify_on_read = verify;
        self
    }
}

/// One cached vocabulary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// File name relative to the cache directory.
    pub file: String,
    /// Lowercase hex SHA-256 of the file contents.
    pub sha256: String,
    pub size: u64,
}

/// Record of what the cache holds, keyed by vocabulary name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub entries: BTreeMap<String, ManifestEntry>,
}

fn default_version() -> u32 {
    MANIFEST_VERSION
}

impl Default for CacheManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl CacheManifest {
    /// Read a manifest, treating a missing file as empty.
    ///
    /// Entries whose name is not a valid cache name, or whose file is not
    /// `<name>.tiktoken`, are dropped; their files are never touched.
    pub fn read(path: &Path) -> Result<Self, ProvisionError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        let mut manifest: Self = serde_json::from_reader(BufReader::new(file))?;
        manifest.entries.retain(|name, entry| {
            let ok = validate_name(name).is_ok() && entry.file == cache_file_name(name);
            if !ok {
                log::warn!("dropping manifest entry {:?} -> {:?}", name, entry.file);
            }
            ok
        });
        Ok(manifest)
    }

    /// Write the manifest via a temporary file and rename.
    pub fn write(&self, path: &Path) -> Result<(), ProvisionError> {
        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// A directory of verified vocabulary files.
#[derive(Debug)]
pub struct VocabCache {
    config: CacheConfig,
    manifest: CacheManifest,
}

impl VocabCache {
    /// Open (creating if needed) the cache directory and load its manifest.
    pub fn open(config: CacheConfig) -> Result<Self, ProvisionError> {
        fs::create_dir_all(&config.dir)?;
        let manifest = CacheManifest::read(&config.dir.join(MANIFEST_FILE))?;
        log::debug!(
            "opened vocabulary cache at {} ({} entries)",
            config.dir.display(),
            manifest.entries.len()
        );
        Ok(Self { config, manifest })
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn manifest(&self) -> &CacheManifest {
        &self.manifest
    }

    fn manifest_path(&self) -> PathBuf {
        self.config.dir.join(MANIFEST_FILE)
    }

    fn save_manifest(&self) -> Result<(), ProvisionError> {
        self.manifest.write(&self.manifest_path())
    }

    /// Whether `name` is recorded and its file exists.
    pub fn contains(&self, name: &str) -> bool {
        self.manifest
            .entries
            .get(name)
            .is_some_and(|entry| self.config.dir.join(&entry.file).is_file())
    }

    /// Total size of cached files, per the manifest.
    pub fn size_bytes(&self) -> u64 {
        self.manifest.entries.values().map(|entry| entry.size).sum()
    }

    /// Cached bytes for `name`.
    ///
    /// The recorded hash must match `expected_sha256` if given. With
    /// `verify_on_read` the file is also re-hashed and compared with the
    /// recorded hash. A missing, corrupt or mismatching entry is evicted and
    /// reported as a miss.
    pub fn get(
        &mut self,
        name: &str,
        expected_sha256: Option<&str>,
    ) -> Result<Option<Vec<u8>>, ProvisionError> {
        let Some(entry) = self.manifest.entries.get(name).cloned() else {
            log::debug!("cache miss for {}", name);
            return Ok(None);
        };

        let path = self.config.dir.join(&entry.file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::warn!("cached file {} is missing, evicting {}", path.display(), name);
                self.evict(name)?;
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let recorded_ok =
            expected_sha256.map_or(true, |expected| expected.eq_ignore_ascii_case(&entry.sha256));
        let contents_ok = !self.config.verify_on_read || sha256_hex(&bytes) == entry.sha256;
        if !recorded_ok || !contents_ok {
            log::warn!("cached {} failed hash verification, evicting", name);
            self.evict(name)?;
            return Ok(None);
        }

        log::debug!("cache hit for {} ({} bytes)", name, bytes.len());
        Ok(Some(bytes))
    }

    /// Store `bytes` under `name`, returning the file path.
    ///
    /// # Errors
    /// [`ProvisionError::HashMismatch`] if `expected_sha256` is given and does
    /// not match; nothing is written in that case.
    pub fn put(
        &mut self,
        name: &str,
        bytes: &[u8],
        expected_sha256: Option<&str>,
    ) -> Result<PathBuf, ProvisionError> {
        validate_name(name)?;

        let actual = sha256_hex(bytes);
        if let Some(expected) = expected_sha256 {
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(ProvisionError::HashMismatch {
                    family: name.to_string(),
                    expected: expected.to_ascii_lowercase(),
                    actual,
                });
            }
        }

        let file = cache_file_name(name);
        let path = self.config.dir.join(&file);
        let tmp = self.config.dir.join(format!("{file}.tmp"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;

        self.manifest.entries.insert(
            name.to_string(),
            ManifestEntry {
                file,
                sha256: actual,
                size: bytes.len() as u64,
            },
        );
        self.save_manifest()?;

        log::info!("cached {} ({} bytes) at {}", name, bytes.len(), path.display());
        Ok(path)
    }

    /// Cached bytes for a family, checked against its published hash.
    pub fn get_family(&mut self, family: EncodingFamily) -> Result<Option<Vec<u8>>, ProvisionError> {
        self.get(family.vocab_name(), Some(family.expected_sha256()))
    }

    /// Store bytes for a family, checked against its published hash.
    pub fn put_family(
        &mut self,
        family: EncodingFamily,
        bytes: &[u8],
    ) -> Result<PathBuf, ProvisionError> {
        self.put(family.vocab_name(), bytes, Some(family.expected_sha256()))
    }

    /// Remove `name` from the cache. Returns whether it was recorded.
    pub fn evict(&mut self, name: &str) -> Result<bool, ProvisionError> {
        let Some(entry) = self.manifest.entries.remove(name) else {
            return Ok(false);
        };
        remove_if_present(&self.config.dir.join(&entry.file))?;
        self.save_manifest()?;
        Ok(true)
    }

    /// Remove every cached file and empty the manifest.
    pub fn clear(&mut self) -> Result<(), ProvisionError> {
        for entry in self.manifest.entries.values() {
            remove_if_present(&self.config.dir.join(&entry.file))?;
        }
        self.manifest.entries.clear();
        self.save_manifest()
    }
}

fn cache_file_name(name: &str) -> String {
    format!("{name}.tiktoken")
}

/// Names become file names, so keep them to a safe alphabet.
fn validate_name(name: &str) -> Result<(), ProvisionError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
    if ok {
        Ok(())
    } else {
        Err(ProvisionError::InvalidName(name.to_string()))
    }
}

fn remove_if_present(path: &Path) -> Result<(), ProvisionError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
