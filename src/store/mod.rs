//! The versioned region store.
//!
//! Ownership runs one way: a [`Registry`] owns [`Dataset`]s, which own
//! [`Version`]s, which own [`Layer`]s. Files of every entity live flat in the
//! store home and are named after the owning dataset, version and layer
//! (see [`layer_file_path`] and [`session_file_path`]).

pub mod collab;
mod dataset;
mod layer;
mod lock;
mod registry;
mod version;
mod worker;


use std::path::{
    Path,
    PathBuf,
};

pub use collab::{
    AutoPrompt,
    Collaborators,
    GenomeCatalog,
    MemoryViewer,
    Prompt,
    StaticGenomeCatalog,
    Viewer,
};
pub use dataset::{
    next_tag,
    Dataset,
    DEFAULT_VERSION,
};
pub use layer::{
    ImportOutcome,
    Layer,
    DEFAULT_LAYER,
};
pub use lock::StoreLock;
pub use registry::Registry;
pub use version::Version;
pub use worker::{
    LoadReport,
    LoadWorker,
    SharedRegistry,
};

use crate::utils::encode_file_component;

pub const LAYER_FILE_SUFFIX: &str = ".roi.bed";
pub const SESSION_FILE_SUFFIX: &str = ".session.xml";

/// `<home>/<dataset>_<version>_<layer>.roi.bed`, each name percent-encoded.
pub fn layer_file_path(
    home: &Path,
    dataset: &str,
    version: &str,
    layer: &str,
) -> PathBuf {
    home.join(format!(
        "{}_{}_{}{LAYER_FILE_SUFFIX}",
        encode_file_component(dataset),
        encode_file_component(version),
        encode_file_component(layer)
    ))
}

/// `<home>/<dataset>_<version>.session.xml`, each name percent-encoded.
pub fn session_file_path(
    home: &Path,
    dataset: &str,
    version: &str,
) -> PathBuf {
    home.join(format!(
        "{}_{}{SESSION_FILE_SUFFIX}",
        encode_file_component(dataset),
        encode_file_component(version)
    ))
}
