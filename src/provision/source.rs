//! Where vocabulary bytes come from on a cache miss.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::ProvisionError;
use crate::core::EncodingFamily;

/// Supplies raw `.tiktoken` bytes for a family.
///
/// Implementations do not verify what they return; [`Provisioner`] does.
///
/// [`Provisioner`]: super::Provisioner
pub trait VocabSource {
    fn fetch(&self, family: EncodingFamily) -> Result<Vec<u8>, ProvisionError>;
}

impl<F> VocabSource for F
where
    F: Fn(EncodingFamily) -> Result<Vec<u8>, ProvisionError>,
{
    fn fetch(&self, family: EncodingFamily) -> Result<Vec<u8>, ProvisionError> {
        self(family)
    }
}

/// Reads `<root>/<vocab name>.tiktoken`.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the file for `family` is expected at.
    pub fn path_for(&self, family: EncodingFamily) -> PathBuf {
        self.root.join(format!("{}.tiktoken", family.vocab_name()))
    }
}

impl VocabSource for DirSource {
    fn fetch(&self, family: EncodingFamily) -> Result<Vec<u8>, ProvisionError> {
        let path = self.path_for(family);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(ProvisionError::Source {
                family: family.vocab_name().to_string(),
                reason: format!("{} not found", path.display()),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
