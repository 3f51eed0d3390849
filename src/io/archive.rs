//! Flat ZIP packaging of datasets.
//!
//! An archive holds one manifest ([`MANIFEST_NAME`]) and every referenced
//! data file keyed by its base name. There are no subdirectories; two files
//! sharing a base name collide and the later one is skipped.

use std::fs::File;
use std::io::{
    self,
    BufWriter,
};
use std::path::{
    Path,
    PathBuf,
};

use hashbrown::HashSet;
use log::{
    debug,
    warn,
};
use tempfile::{
    NamedTempFile,
    TempDir,
};
use zip::write::SimpleFileOptions;
use zip::{
    CompressionMethod,
    ZipArchive,
    ZipWriter,
};

use super::catalog::Manifest;
use crate::error::{
    Result,
    StoreError,
};

pub const MANIFEST_NAME: &str = "GIE.dataset.json";

fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| StoreError::malformed(format!("no file name in {}", path.display())))
}

/// Writes `manifest` and `files` into a new archive at `dest`.
///
/// The archive is assembled in a temporary file next to `dest` and moved into
/// place only once complete, so a failure leaves `dest` untouched. Missing
/// files are skipped with a warning. Returns the entry names written.
pub fn write_archive(
    dest: &Path,
    manifest: &Manifest,
    files: &[PathBuf],
) -> Result<Vec<String>> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(files.len() + 1);
    {
        let mut zip = ZipWriter::new(BufWriter::new(tmp.as_file()));
        zip.start_file(MANIFEST_NAME, options)?;
        serde_json::to_writer_pretty(&mut zip, manifest)?;
        entries.push(MANIFEST_NAME.to_owned());

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(MANIFEST_NAME.to_owned());
        for path in files {
            if !path.is_file() {
                warn!("Skipping missing file {}", path.display());
                continue;
            }
            let name = base_name(path)?;
            if !seen.insert(name.clone()) {
                warn!("Skipping {}: archive already has an entry named {name}", path.display());
                continue;
            }
            zip.start_file(name.as_str(), options)?;
            let mut source = File::open(path)?;
            io::copy(&mut source, &mut zip)?;
            debug!("Archived {}", path.display());
            entries.push(name);
        }
        let mut inner = zip.finish()?;
        io::Write::flush(&mut inner)?;
    }
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(entries)
}

/// An archive extracted to a scratch directory, removed on drop.
pub struct UnpackedArchive {
    dir:      TempDir,
    manifest: Manifest,
    entries:  Vec<String>,
}

impl UnpackedArchive {
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Entry names other than the manifest.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    /// Location of an extracted entry.
    pub fn path_of(
        &self,
        name: &str,
    ) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Extracts `src` into a fresh scratch directory and parses its manifest.
pub fn unpack_archive(src: &Path) -> Result<UnpackedArchive> {
    let mut archive = ZipArchive::new(File::open(src)?)?;
    let dir = tempfile::tempdir()?;
    let mut entries = Vec::with_capacity(archive.len());
    let mut manifest = None;

    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .ok_or_else(|| {
                StoreError::malformed(format!("unsafe archive entry name '{}'", entry.name()))
            })?;
        if name == MANIFEST_NAME {
            manifest = Some(serde_json::from_reader::<_, Manifest>(&mut entry)?);
            continue;
        }
        let mut out = File::create(dir.path().join(&name))?;
        io::copy(&mut entry, &mut out)?;
        entries.push(name);
    }

    let manifest = manifest.ok_or_else(|| {
        StoreError::malformed(format!("{} has no {MANIFEST_NAME}", src.display()))
    })?;
    Ok(UnpackedArchive {
        dir,
        manifest,
        entries,
    })
}
