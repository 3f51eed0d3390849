#![allow(dead_code)]

use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use roistore::prelude::*;
use tempfile::TempDir;

pub const SEED_BED: &str = "chr1\t100\t200\ta\nchr1\t150\t250\tb\nchr2\t10\t20\tc\n";

/// A store home plus a scratch directory for source files, with viewer and
/// prompt handles observing whatever registry is opened on it.
pub struct TestStore {
    pub home:    TempDir,
    pub scratch: TempDir,
    pub viewer:  MemoryViewer,
    pub prompt:  AutoPrompt,
}

pub fn hg38() -> StaticGenomeCatalog {
    StaticGenomeCatalog::new().with_genome("hg38", [
        ("chr1", 1_000_000),
        ("chr2", 500_000),
        ("chrX", 200_000),
    ])
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_prompt(AutoPrompt::new())
    }

    pub fn with_prompt(prompt: AutoPrompt) -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
            scratch: tempfile::tempdir().unwrap(),
            viewer: MemoryViewer::new(),
            prompt,
        }
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig::new(self.home.path())
    }

    pub fn open(&self) -> Result<Registry> {
        self.open_with(hg38())
    }

    pub fn open_with(
        &self,
        genomes: StaticGenomeCatalog,
    ) -> Result<Registry> {
        Registry::open(
            self.config(),
            Collaborators::new(genomes, self.viewer.clone(), self.prompt.clone()),
        )
    }

    /// Writes a source file outside the store home.
    pub fn source(
        &self,
        name: &str,
        content: &str,
    ) -> PathBuf {
        let path = self.scratch.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Sorted file names in the store home.
    pub fn home_files(&self) -> Vec<String> {
        list_files(self.home.path())
    }
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}

/// `(chrom, start, end, name)` of each region.
pub fn spans(regions: &[Region]) -> Vec<(String, u64, u64, Option<String>)> {
    regions
        .iter()
        .map(|r| {
            (
                r.chrom().to_owned(),
                r.start(),
                r.end(),
                r.display_name(),
            )
        })
        .collect()
}

pub fn span(
    chrom: &str,
    start: u64,
    end: u64,
    name: Option<&str>,
) -> (String, u64, u64, Option<String>) {
    (chrom.to_owned(), start, end, name.map(str::to_owned))
}
