//! Persisted form of the store.
//!
//! The catalog is one JSON document holding every dataset, version and
//! layer with their scalar metadata. Runtime-only state (loaded regions,
//! active pointers of the process) is not part of these records; the store
//! rebuilds it on load. Paths are written as absolute strings with `/`
//! separators.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{
    BufReader,
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use tempfile::NamedTempFile;

use crate::error::Result;

/// File path serialized with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortablePath(PathBuf);

impl PortablePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Last path component, if any.
    pub fn file_name(&self) -> Option<String> {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// The path as a `/`-separated string.
    pub fn to_portable_string(&self) -> String {
        normalize_separators(&self.0.to_string_lossy())
    }
}

impl From<&Path> for PortablePath {
    fn from(value: &Path) -> Self {
        Self(value.to_path_buf())
    }
}

impl From<PathBuf> for PortablePath {
    fn from(value: PathBuf) -> Self {
        Self(value)
    }
}

impl Display for PortablePath {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.to_portable_string())
    }
}

impl Serialize for PortablePath {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer, {
        serializer.serialize_str(&self.to_portable_string())
    }
}

impl<'de> Deserialize<'de> for PortablePath {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>, {
        let s = String::deserialize(deserializer)?;
        Ok(Self(PathBuf::from(from_portable(&s))))
    }
}

/// Replaces `\` with `/`.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn from_portable(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '/' {
        path.to_owned()
    }
    else {
        path.replace('/', std::path::MAIN_SEPARATOR_STR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub name:            String,
    pub file:            PortablePath,
    #[serde(default)]
    pub annotation_keys: Vec<String>,
    #[serde(default)]
    pub last_modified:   u64,
    #[serde(default)]
    pub file_size:       u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub tag:          String,
    #[serde(default)]
    pub author:       Option<String>,
    #[serde(default)]
    pub description:  Option<String>,
    pub session:      PortablePath,
    pub active_layer: String,
    pub layers:       Vec<LayerRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub name:           String,
    #[serde(default)]
    pub category:       Option<String>,
    #[serde(default)]
    pub source_file:    Option<PortablePath>,
    pub active_version: String,
    pub versions:       Vec<VersionRecord>,
}

impl DatasetRecord {
    /// Every data file referenced by this dataset: layer files, then session
    /// descriptors.
    pub fn referenced_files(&self) -> Vec<&PortablePath> {
        let layers = self
            .versions
            .iter()
            .flat_map(|v| v.layers.iter().map(|l| &l.file));
        let sessions = self.versions.iter().map(|v| &v.session);
        layers.chain(sessions).collect()
    }
}

/// Archive manifest: dataset name to dataset.
pub type Manifest = BTreeMap<String, DatasetRecord>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub active_dataset: Option<String>,
    #[serde(default)]
    pub datasets:       BTreeMap<String, DatasetRecord>,
}

/// Reads a JSON document from `path`.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Writes `value` as pretty JSON. The document is written to a temporary
/// sibling first and renamed into place, so `path` is either the old or the
/// new document.
pub fn write_json<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
