use std::fs::{
    self,
    File,
};
use std::io::{
    BufReader,
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};

use log::{
    debug,
    info,
    warn,
};
use tempfile::NamedTempFile;

use super::collab::{
    GenomeCatalog,
    Prompt,
    Viewer,
};
use crate::data_structs::{
    IntervalSet,
    Region,
    Strand,
};
use crate::error::{
    Result,
    StoreError,
};
use crate::io::bed::read_bed;
use crate::io::catalog::{
    LayerRecord,
    PortablePath,
};
use crate::io::layer_file::{
    format_line,
    read_regions,
    write_header,
    write_regions,
};
use crate::io::vcf::read_vcf;
use crate::utils::now_unix_ms;

/// Name of the layer every version starts with. It cannot be removed or
/// renamed.
pub const DEFAULT_LAYER: &str = "main";

/// How an import ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Every row of the source was imported.
    Complete(usize),
    /// The row limit checkpoint was declined; only the first rows were kept.
    Truncated(usize),
}

impl ImportOutcome {
    pub fn rows(&self) -> usize {
        match self {
            ImportOutcome::Complete(rows) | ImportOutcome::Truncated(rows) => *rows,
        }
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, ImportOutcome::Truncated(_))
    }
}

fn is_vcf(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase().ends_with(".vcf"))
        .unwrap_or(false)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// One named region collection backed by a layer file.
///
/// The region set is read lazily: a layer rebuilt from the catalog holds no
/// regions until [`Layer::load`] runs, and saving an unloaded layer leaves its
/// file alone.
#[derive(Debug, Clone)]
pub struct Layer {
    meta:    LayerRecord,
    regions: IntervalSet,
    loaded:  bool,
}

impl Layer {
    /// Creates an empty layer backed by a new file at `path`.
    ///
    /// An existing file at `path` means a previous layer of the same name was
    /// never cleaned up; this is refused with [`StoreError::Conflict`].
    pub fn create(
        path: PathBuf,
        name: &str,
        annotation_keys: Vec<String>,
    ) -> Result<Self> {
        if path.exists() {
            return Err(StoreError::conflict(format!(
                "layer file {} already exists",
                path.display()
            )));
        }
        let mut layer = Self {
            meta:    LayerRecord {
                name: name.to_owned(),
                file: PortablePath::new(path),
                annotation_keys,
                last_modified: 0,
                file_size: 0,
            },
            regions: IntervalSet::new(),
            loaded:  true,
        };
        layer.write_file()?;
        debug!("Created layer {} at {}", name, layer.path().display());
        Ok(layer)
    }

    /// Rebuilds an unloaded layer from its catalog record.
    pub fn from_record(record: LayerRecord) -> Self {
        Self {
            meta:    record,
            regions: IntervalSet::new(),
            loaded:  false,
        }
    }

    pub fn record(&self) -> &LayerRecord {
        &self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn path(&self) -> &Path {
        self.meta.file.as_path()
    }

    pub fn annotation_keys(&self) -> &[String] {
        &self.meta.annotation_keys
    }

    pub fn last_modified(&self) -> u64 {
        self.meta.last_modified
    }

    pub fn file_size(&self) -> u64 {
        self.meta.file_size
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn regions(&self) -> &IntervalSet {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut IntervalSet {
        self.loaded = true;
        &mut self.regions
    }

    pub(crate) fn set_name(
        &mut self,
        name: &str,
    ) {
        self.meta.name = name.to_owned();
    }

    /// Reads the layer file.
    pub fn load(
        &mut self,
        viewer: Option<&mut dyn Viewer>,
    ) -> Result<usize> {
        let path = self.path().to_path_buf();
        self.load_from_file(&path, viewer)
    }

    /// Reads regions from `path` into this layer.
    ///
    /// Rows are inserted in file order, so overlaps are resolved as if each
    /// row had been entered by hand. The current set is replaced only once
    /// the whole file parsed. With a viewer, the result is published to it.
    pub fn load_from_file(
        &mut self,
        path: &Path,
        viewer: Option<&mut dyn Viewer>,
    ) -> Result<usize> {
        let reader = BufReader::new(File::open(path)?);
        let rows = read_regions(reader, &self.meta.annotation_keys)?;
        let count = rows.len();

        let mut regions = IntervalSet::new();
        for region in rows {
            regions.insert(region, false);
        }
        self.regions = regions;
        self.loaded = true;
        debug!(
            "Loaded {} rows ({} regions) into layer {}",
            count,
            self.regions.len(),
            self.name()
        );

        if let Some(viewer) = viewer {
            viewer.publish(&self.regions.to_sorted_vec());
        }
        Ok(count)
    }

    /// Converts a BED or VCF file into this layer's file, then loads it.
    ///
    /// The format is chosen by extension (`.vcf` or BED otherwise). After
    /// `row_limit` rows the prompt is asked whether to go on; declining keeps
    /// the rows written so far and yields [`ImportOutcome::Truncated`]. Any
    /// failure removes the partially written file.
    pub fn import_and_load(
        &mut self,
        source: &Path,
        genomes: &dyn GenomeCatalog,
        prompt: &mut dyn Prompt,
        row_limit: usize,
        viewer: Option<&mut dyn Viewer>,
    ) -> Result<ImportOutcome> {
        let outcome = self
            .write_import(source, genomes, prompt, row_limit)
            .and_then(|outcome| self.load(viewer).map(|_| outcome));
        match outcome {
            Ok(outcome) => {
                info!(
                    "Imported {} rows from {} into layer {}",
                    outcome.rows(),
                    source.display(),
                    self.name()
                );
                Ok(outcome)
            },
            Err(e) => {
                if let Err(rm) = fs::remove_file(self.path()) {
                    warn!("Could not remove {}: {rm}", self.path().display());
                }
                Err(e)
            },
        }
    }

    fn write_import(
        &self,
        source: &Path,
        genomes: &dyn GenomeCatalog,
        prompt: &mut dyn Prompt,
        row_limit: usize,
    ) -> Result<ImportOutcome> {
        let input = BufReader::new(File::open(source)?);
        let mut writer = BufWriter::new(File::create(self.path())?);
        write_header(&mut writer, self.name())?;

        let schema = &self.meta.annotation_keys;
        let mut written = 0usize;
        let mut declined = false;
        let canonical = |raw: &str| genomes.canonical_chr(raw);
        let sink = |region: Region| -> Result<bool> {
            if written == row_limit {
                let question = format!(
                    "{} has more than {row_limit} rows. Continue importing?",
                    source.display()
                );
                if !prompt.confirm(&question) {
                    declined = true;
                    return Ok(false);
                }
            }
            writeln!(writer, "{}", format_line(&region, schema))?;
            written += 1;
            Ok(true)
        };

        if is_vcf(source) {
            read_vcf(input, canonical, sink)?;
        }
        else {
            read_bed(input, canonical, sink)?;
        }
        writer.flush()?;

        if declined {
            warn!(
                "Import of {} stopped by user after {written} rows",
                source.display()
            );
            Ok(ImportOutcome::Truncated(written))
        }
        else {
            Ok(ImportOutcome::Complete(written))
        }
    }

    /// Takes the viewer's displayed regions as this layer's set, then saves.
    pub fn update_and_save(
        &mut self,
        viewer: &dyn Viewer,
    ) -> Result<bool> {
        self.sync_from_viewer(viewer);
        self.save()
    }

    /// Replaces the set with the viewer's displayed regions, if it shows any.
    pub fn sync_from_viewer(
        &mut self,
        viewer: &dyn Viewer,
    ) {
        if let Some(displayed) = viewer.current_regions() {
            self.regions.bulk_replace(displayed);
            self.loaded = true;
        }
    }

    /// Writes the set in canonical order. The size and modification stamp
    /// are updated only when the file length changed. Returns whether they
    /// were.
    pub fn save(&mut self) -> Result<bool> {
        if !self.loaded {
            debug!("Layer {} not loaded, nothing to save", self.name());
            return Ok(false);
        }
        self.write_file()
    }

    fn write_file(&mut self) -> Result<bool> {
        let path = self.path().to_path_buf();
        let tmp = NamedTempFile::new_in(parent_dir(&path))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            write_regions(
                &mut writer,
                self.name(),
                self.regions.sorted(),
                &self.meta.annotation_keys,
            )?;
            writer.flush()?;
        }
        tmp.persist(&path).map_err(|e| e.error)?;

        let size = fs::metadata(&path)?.len();
        if size == self.meta.file_size {
            return Ok(false);
        }
        self.meta.file_size = size;
        self.meta.last_modified = now_unix_ms();
        Ok(true)
    }

    /// Removes the layer file. Returns whether it was removed.
    pub fn delete(&self) -> bool {
        match fs::remove_file(self.path()) {
            Ok(()) => {
                debug!("Deleted {}", self.path().display());
                true
            },
            Err(e) => {
                warn!("Could not delete {}: {e}", self.path().display());
                false
            },
        }
    }

    /// Writes the layer as plain BED6 with readable names.
    pub fn export_bed(
        &self,
        dest: &Path,
    ) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(dest)?);
        let mut count = 0;
        for region in self.regions.sorted() {
            let name = region
                .display_name()
                .map(|n| n.replace(['\t', '\n', '\r'], " "))
                .unwrap_or_else(|| ".".to_owned());
            let strand = match region.strand() {
                Some(Strand::Forward) => '+',
                Some(Strand::Reverse) => '-',
                _ => '.',
            };
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                region.chrom(),
                region.start(),
                region.end(),
                name,
                region.score().unwrap_or("0"),
                strand
            )?;
            count += 1;
        }
        writer.flush()?;
        Ok(count)
    }

    /// Moves the layer file to `dest`.
    pub fn relocate(
        &mut self,
        dest: PathBuf,
    ) -> Result<()> {
        if dest == self.path() {
            return Ok(());
        }
        if dest.exists() {
            return Err(StoreError::conflict(format!(
                "layer file {} already exists",
                dest.display()
            )));
        }
        if self.path().exists() {
            fs::rename(self.path(), &dest)?;
        }
        debug!("Moved layer {} to {}", self.name(), dest.display());
        self.meta.file = PortablePath::new(dest);
        Ok(())
    }

    /// Copies the layer file to `dest` and returns the copy.
    pub fn copy_to(
        &self,
        dest: PathBuf,
    ) -> Result<Layer> {
        if dest.exists() {
            return Err(StoreError::conflict(format!(
                "layer file {} already exists",
                dest.display()
            )));
        }
        let mut copy = self.clone();
        copy.meta.file = PortablePath::new(dest);
        if self.loaded {
            copy.write_file()?;
        }
        else {
            fs::copy(self.path(), copy.path())?;
        }
        Ok(copy)
    }
}
