//! Discovery and loading of blueprint documents from disk.
//!
//! A corpus is every `.yaml` file below a root directory, excluding `.git`.
//! Files are visited in file-name order so repeated runs see the same
//! sequence. A file that cannot be read or parsed is logged and skipped; only
//! a failure to walk the root itself is fatal.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use walkdir::WalkDir;

use crate::blueprint::BlueprintDocument;

const YAML_SUFFIX: &str = ".yaml";
const GIT_DIR: &str = ".git";

/// Errors that prevent a corpus from being loaded at all.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Raised when the root directory cannot be opened.
    #[error("failed to open corpus directory {path}: {message}")]
    Root {
        /// Root directory of the corpus.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when directory traversal fails.
    #[error("failed to walk {path}: {message}")]
    Walk {
        /// Root directory of the corpus.
        path: Utf8PathBuf,
        /// Error reported by the walker.
        message: String,
    },
}

/// A parsed document together with the file it came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadedDocument {
    /// Path of the source file.
    pub path: Utf8PathBuf,
    /// Parsed document.
    pub document: BlueprintDocument,
}

/// A file that was discovered but could not be used.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: Utf8PathBuf,
    /// Why the file was skipped.
    pub reason: String,
}

/// The documents of one corpus, in discovery order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Corpus {
    documents: Vec<LoadedDocument>,
    skipped: Vec<SkippedFile>,
}

impl Corpus {
    /// Builds a corpus from already parsed documents.
    #[must_use]
    pub const fn from_documents(documents: Vec<LoadedDocument>) -> Self {
        Self {
            documents,
            skipped: Vec::new(),
        }
    }

    /// Loads every `.yaml` document below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError`] when `root` cannot be opened or walked.
    /// Individual unreadable or malformed files are skipped instead.
    pub fn load(root: &Utf8Path) -> Result<Self, CorpusError> {
        let dir = Dir::open_ambient_dir(root, ambient_authority()).map_err(|err| {
            CorpusError::Root {
                path: root.to_path_buf(),
                message: err.to_string(),
            }
        })?;

        let mut corpus = Self::default();
        for relative in discover_yaml_files(root)? {
            let path = root.join(&relative);
            let parsed = dir
                .read_to_string(&relative)
                .map_err(|err| err.to_string())
                .and_then(|source| {
                    BlueprintDocument::from_yaml_str(&source).map_err(|err| err.to_string())
                });
            match parsed {
                Ok(document) => corpus.documents.push(LoadedDocument { path, document }),
                Err(reason) => {
                    tracing::warn!(file = %path, %reason, "skipping document");
                    corpus.skipped.push(SkippedFile { path, reason });
                }
            }
        }

        tracing::debug!(
            root = %root,
            documents = corpus.documents.len(),
            skipped = corpus.skipped.len(),
            "loaded corpus"
        );
        Ok(corpus)
    }

    /// Documents in discovery order.
    #[must_use]
    pub fn documents(&self) -> &[LoadedDocument] {
        &self.documents
    }

    /// Files that were discovered but not loaded.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Returns every PBN declared by more than one document (compared
    /// case-insensitively), with the files declaring it.
    #[must_use]
    pub fn duplicate_pbns(&self) -> Vec<(String, Vec<Utf8PathBuf>)> {
        let mut by_pbn: BTreeMap<String, Vec<Utf8PathBuf>> = BTreeMap::new();
        for loaded in &self.documents {
            by_pbn
                .entry(loaded.document.pbn().to_ascii_lowercase())
                .or_default()
                .push(loaded.path.clone());
        }
        by_pbn
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .collect()
    }
}

/// Lists `.yaml` files below `root` as paths relative to it, skipping `.git`
/// directories, in file-name order.
///
/// # Errors
///
/// Returns [`CorpusError::Walk`] when traversal fails.
pub fn discover_yaml_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, CorpusError> {
    let walk_error = |message: String| CorpusError::Walk {
        path: root.to_path_buf(),
        message,
    };

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == GIT_DIR));
    for entry in walker {
        let found = entry.map_err(|err| walk_error(err.to_string()))?;
        if !found.file_type().is_file() {
            continue;
        }
        let Some(relative) = found
            .path()
            .strip_prefix(root)
            .ok()
            .and_then(Utf8Path::from_path)
        else {
            tracing::warn!(file = %found.path().display(), "skipping non UTF-8 path");
            continue;
        };
        if relative.as_str().ends_with(YAML_SUFFIX) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}
