use std::collections::BTreeMap;
use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use hashbrown::HashSet;
use itertools::Itertools;
use log::{
    debug,
    error,
    info,
    warn,
};

use super::collab::{
    Collaborators,
    GenomeCatalog,
    Viewer,
};
use super::dataset::Dataset;
use super::layer::{
    ImportOutcome,
    Layer,
};
use super::lock::StoreLock;
use crate::config::StoreConfig;
use crate::data_structs::{
    IntervalSet,
    Region,
};
use crate::error::{
    Result,
    StoreError,
};
use crate::io::archive::{
    unpack_archive,
    write_archive,
    UnpackedArchive,
};
use crate::io::catalog::{
    read_json,
    write_json,
    CatalogRecord,
    DatasetRecord,
    Manifest,
    PortablePath,
};
use crate::io::session::{
    reroot,
    summarize,
    RerootRules,
};

fn dataset_not_found(name: &str) -> StoreError {
    StoreError::not_found(format!("dataset '{name}'"))
}

fn no_active_dataset() -> StoreError {
    StoreError::not_found("no active dataset")
}

/// Reads the catalog, degrading to an empty one when it is missing or
/// unreadable.
fn load_catalog(path: &Path) -> CatalogRecord {
    if !path.exists() {
        info!("No catalog at {}, starting empty", path.display());
        return CatalogRecord::default();
    }
    match read_json::<CatalogRecord>(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(
                "Could not read catalog {}: {e}. Starting with an empty store",
                path.display()
            );
            CatalogRecord::default()
        },
    }
}

fn entry_name(path: &PortablePath) -> Result<String> {
    path.file_name().ok_or_else(|| {
        StoreError::malformed(format!("no file name in {}", path.to_portable_string()))
    })
}

/// Top-level store: every dataset of one home directory.
///
/// All mutating operations save the touched layer and, with autosave on,
/// the catalog before returning. Failures are logged and passed to the
/// prompt's `notify` before being returned.
pub struct Registry {
    config:         StoreConfig,
    home:           PathBuf,
    datasets:       BTreeMap<String, Dataset>,
    active_dataset: Option<String>,
    collab:         Collaborators,
    closed:         bool,
    _lock:          StoreLock,
}

impl Registry {
    /// Opens the store at the configured home, creating the directory if
    /// needed, taking the lock and reading the catalog.
    pub fn open(
        config: StoreConfig,
        mut collab: Collaborators,
    ) -> Result<Self> {
        fs::create_dir_all(config.home())?;
        let home = fs::canonicalize(config.home())?;
        let lock = StoreLock::acquire(&home.join(config.lock_name()), collab.prompt.as_mut())?;

        let catalog = load_catalog(&home.join(config.catalog_name()));
        let datasets = catalog
            .datasets
            .into_values()
            .map(|record| (record.name.clone(), Dataset::from_record(&home, record)))
            .collect::<BTreeMap<_, _>>();
        let active_dataset = catalog
            .active_dataset
            .filter(|name| datasets.contains_key(name));
        info!(
            "Opened store {} with {} datasets",
            home.display(),
            datasets.len()
        );

        let mut registry = Self {
            config,
            home,
            datasets,
            active_dataset,
            collab,
            closed: false,
            _lock: lock,
        };
        if registry.active_dataset.is_some() {
            if let Err(e) = registry.show_active() {
                warn!("Could not display the active dataset: {e}");
            }
        }
        Ok(registry)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn genomes(&self) -> &dyn GenomeCatalog {
        self.collab.genomes.as_ref()
    }

    fn report<T>(
        &mut self,
        op: &str,
        result: Result<T>,
    ) -> Result<T> {
        if let Err(e) = &result {
            if e.is_user_abort() {
                info!("{op}: {e}");
            }
            else {
                error!("{op} failed: {e}");
            }
            self.collab.prompt.notify(&format!("{op} failed: {e}"));
        }
        result
    }

    fn autosave(&mut self) -> Result<()> {
        if self.config.autosave() {
            self.save_catalog()
        }
        else {
            Ok(())
        }
    }

    // --- Persistence ---

    pub fn to_record(&self) -> CatalogRecord {
        CatalogRecord {
            active_dataset: self.active_dataset.clone(),
            datasets:       self
                .datasets
                .iter()
                .map(|(name, d)| (name.clone(), d.to_record()))
                .collect(),
        }
    }

    fn save_catalog(&mut self) -> Result<()> {
        if let Some(name) = self.active_dataset.clone() {
            if let Some(dataset) = self.datasets.get_mut(&name) {
                let version = dataset.active_version_mut()?;
                let session = version.session_path().to_path_buf();
                version
                    .active_layer_mut()?
                    .update_and_save(self.collab.viewer.as_ref())?;
                self.collab.viewer.flush_session(&session)?;
            }
        }
        let path = self.home.join(self.config.catalog_name());
        write_json(&path, &self.to_record())?;
        debug!("Saved catalog {}", path.display());
        Ok(())
    }

    /// Saves the displayed layer, the viewer session and the catalog.
    pub fn save(&mut self) -> Result<()> {
        let res = self.save_catalog();
        self.report("Save", res)
    }

    /// Saves and releases the store.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.save()
    }

    // --- Display bookkeeping ---

    fn active_layer_parts(&mut self) -> Result<(&mut Layer, &mut dyn Viewer)> {
        let name = self
            .active_dataset
            .as_deref()
            .ok_or_else(no_active_dataset)?;
        let dataset = self
            .datasets
            .get_mut(name)
            .ok_or_else(|| dataset_not_found(name))?;
        let layer = dataset.active_version_mut()?.active_layer_mut()?;
        Ok((layer, self.collab.viewer.as_mut()))
    }

    /// Saves what the viewer shows into the displayed layer and drops the
    /// viewer's undo history.
    fn persist_displayed(&mut self) -> Result<()> {
        if self.active_dataset.is_none() {
            return Ok(());
        }
        let (layer, viewer) = self.active_layer_parts()?;
        layer.update_and_save(viewer)?;
        viewer.clear_undo_history();
        Ok(())
    }

    /// Loads the active layer of the active dataset and publishes it.
    fn show_active(&mut self) -> Result<usize> {
        let (layer, viewer) = self.active_layer_parts()?;
        viewer.clear();
        layer.load(Some(viewer))?;
        Ok(layer.regions().len())
    }

    fn is_displayed(
        &self,
        dataset: &str,
        tag: &str,
    ) -> bool {
        self.active_dataset.as_deref() == Some(dataset)
            && self
                .datasets
                .get(dataset)
                .is_some_and(|d| d.active_version_tag() == tag)
    }

    fn activate(
        &mut self,
        name: &str,
    ) -> Result<usize> {
        if !self.datasets.contains_key(name) {
            return Err(dataset_not_found(name));
        }
        self.persist_displayed()?;
        self.collab.viewer.clear();
        self.active_dataset = Some(name.to_owned());
        self.show_active()
    }

    // --- Listing ---

    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.keys().map(String::as_str).collect()
    }

    pub fn dataset(
        &self,
        name: &str,
    ) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    pub fn active_dataset_name(&self) -> Option<&str> {
        self.active_dataset.as_deref()
    }

    /// Dataset names grouped by category. Uncategorized datasets are listed
    /// under the empty string.
    pub fn categories(&self) -> BTreeMap<String, Vec<&str>> {
        self.datasets
            .values()
            .map(|d| (d.category().unwrap_or_default().to_owned(), d.name()))
            .into_group_map()
            .into_iter()
            .collect()
    }

    // --- Datasets ---

    /// Creates a dataset, seeded from `source` when given, and makes it
    /// active.
    pub fn add_dataset(
        &mut self,
        name: &str,
        source: Option<&Path>,
        category: Option<&str>,
    ) -> Result<Option<ImportOutcome>> {
        let res = self.add_dataset_inner(name, source, category);
        self.report("Add dataset", res)
    }

    fn add_dataset_inner(
        &mut self,
        name: &str,
        source: Option<&Path>,
        category: Option<&str>,
    ) -> Result<Option<ImportOutcome>> {
        if self.datasets.contains_key(name) {
            return Err(StoreError::conflict(format!(
                "dataset '{name}' already exists"
            )));
        }
        let (mut dataset, outcome) = Dataset::create(
            &self.home,
            name,
            source,
            self.collab.genomes.as_ref(),
            self.collab.prompt.as_mut(),
            self.config.import_row_limit(),
        )?;
        dataset.set_category(category);
        let previous = self.active_dataset.clone();
        self.datasets.insert(name.to_owned(), dataset);
        if let Err(e) = self.activate(name) {
            self.discard_new_dataset(name, previous);
            return Err(e);
        }
        self.autosave()?;
        Ok(outcome)
    }

    /// Drops a dataset whose activation failed and shows `previous` again.
    fn discard_new_dataset(
        &mut self,
        name: &str,
        previous: Option<String>,
    ) {
        if let Some(dataset) = self.datasets.remove(name) {
            if !dataset.delete_files() {
                warn!("Some files of dataset {name} could not be removed");
            }
        }
        self.collab.viewer.clear();
        self.active_dataset = previous.filter(|p| self.datasets.contains_key(p));
        if self.active_dataset.is_some() {
            if let Err(e) = self.show_active() {
                warn!("Could not redisplay the previous dataset: {e}");
            }
        }
    }

    /// Deletes a dataset with all its files.
    pub fn delete_dataset(
        &mut self,
        name: &str,
    ) -> Result<()> {
        let res = self.delete_dataset_inner(name);
        self.report("Delete dataset", res)
    }

    fn delete_dataset_inner(
        &mut self,
        name: &str,
    ) -> Result<()> {
        let dataset = self
            .datasets
            .remove(name)
            .ok_or_else(|| dataset_not_found(name))?;
        if self.active_dataset.as_deref() == Some(name) {
            self.collab.viewer.clear();
            self.collab.viewer.clear_undo_history();
            self.active_dataset = None;
        }
        if !dataset.delete_files() {
            warn!("Some files of dataset {name} could not be removed");
        }
        info!("Deleted dataset {name}");
        self.autosave()
    }

    /// Renames a dataset, moving every file it owns.
    pub fn rename_dataset(
        &mut self,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let res = self.rename_dataset_inner(old, new);
        self.report("Rename dataset", res)
    }

    fn rename_dataset_inner(
        &mut self,
        old: &str,
        new: &str,
    ) -> Result<()> {
        if !self.datasets.contains_key(old) {
            return Err(dataset_not_found(old));
        }
        if self.datasets.contains_key(new) {
            return Err(StoreError::conflict(format!(
                "dataset '{new}' already exists"
            )));
        }
        let displayed = self.active_dataset.as_deref() == Some(old);
        if displayed {
            self.persist_displayed()?;
        }
        let dataset = self
            .datasets
            .get_mut(old)
            .ok_or_else(|| dataset_not_found(old))?;
        dataset.rename(new)?;
        if let Some(dataset) = self.datasets.remove(old) {
            self.datasets.insert(new.to_owned(), dataset);
        }
        if displayed {
            self.active_dataset = Some(new.to_owned());
        }
        self.autosave()
    }

    /// Makes `name` the active dataset and displays its active layer.
    /// Returns the number of regions displayed.
    pub fn select_dataset(
        &mut self,
        name: &str,
    ) -> Result<usize> {
        let res = self.activate(name).and_then(|n| self.autosave().map(|_| n));
        self.report("Select dataset", res)
    }

    pub fn set_category(
        &mut self,
        name: &str,
        category: Option<&str>,
    ) -> Result<()> {
        let res = match self.datasets.get_mut(name) {
            Some(dataset) => {
                dataset.set_category(category);
                self.autosave()
            },
            None => Err(dataset_not_found(name)),
        };
        self.report("Set category", res)
    }

    // --- Versions ---

    fn dataset_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut Dataset> {
        self.datasets
            .get_mut(name)
            .ok_or_else(|| dataset_not_found(name))
    }

    /// Proposed tag for the next version of `dataset`.
    pub fn next_version_tag(
        &self,
        dataset: &str,
    ) -> Result<String> {
        self.datasets
            .get(dataset)
            .map(Dataset::next_version_tag)
            .ok_or_else(|| dataset_not_found(dataset))
    }

    /// Adds a version (tag defaults to [`Dataset::next_version_tag`]),
    /// optionally copying another version, and makes it active. Returns the
    /// tag.
    pub fn add_version(
        &mut self,
        dataset: &str,
        tag: Option<&str>,
        copy_from: Option<&str>,
    ) -> Result<String> {
        let res = self.add_version_inner(dataset, tag, copy_from);
        self.report("Add version", res)
    }

    fn add_version_inner(
        &mut self,
        dataset: &str,
        tag: Option<&str>,
        copy_from: Option<&str>,
    ) -> Result<String> {
        let tag = match tag {
            Some(tag) => tag.to_owned(),
            None => self.next_version_tag(dataset)?,
        };
        if self.active_dataset.as_deref() == Some(dataset) {
            self.persist_displayed()?;
        }
        let genome = self.collab.genomes.current_genome();
        self.dataset_mut(dataset)?
            .add_version(&tag, copy_from, genome.as_deref())?;
        self.select_version_inner(dataset, &tag)?;
        Ok(tag)
    }

    /// Makes `tag` the active version of `dataset`.
    pub fn select_version(
        &mut self,
        dataset: &str,
        tag: &str,
    ) -> Result<()> {
        let res = self.select_version_inner(dataset, tag);
        self.report("Select version", res)
    }

    fn select_version_inner(
        &mut self,
        dataset: &str,
        tag: &str,
    ) -> Result<()> {
        let displayed = self.active_dataset.as_deref() == Some(dataset);
        if displayed {
            self.persist_displayed()?;
        }
        self.dataset_mut(dataset)?.select_version(tag)?;
        if displayed {
            self.show_active()?;
        }
        self.autosave()
    }

    pub fn rename_version(
        &mut self,
        dataset: &str,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let res = self.rename_version_inner(dataset, old, new);
        self.report("Rename version", res)
    }

    fn rename_version_inner(
        &mut self,
        dataset: &str,
        old: &str,
        new: &str,
    ) -> Result<()> {
        if self.is_displayed(dataset, old) {
            self.persist_displayed()?;
        }
        self.dataset_mut(dataset)?.rename_version(old, new)?;
        self.autosave()
    }

    /// Deletes a version with its files. Deleting the last version removes
    /// the dataset; returns whether that happened.
    pub fn delete_version(
        &mut self,
        dataset: &str,
        tag: &str,
    ) -> Result<bool> {
        let res = self.delete_version_inner(dataset, tag);
        self.report("Delete version", res)
    }

    fn delete_version_inner(
        &mut self,
        dataset: &str,
        tag: &str,
    ) -> Result<bool> {
        let displayed = self.is_displayed(dataset, tag);
        if displayed {
            self.collab.viewer.clear();
            self.collab.viewer.clear_undo_history();
        }
        let emptied = self.dataset_mut(dataset)?.delete_version(tag)?;
        if emptied {
            self.datasets.remove(dataset);
            if self.active_dataset.as_deref() == Some(dataset) {
                self.active_dataset = None;
            }
            info!("Dataset {dataset} lost its last version and was removed");
        }
        else if displayed {
            self.show_active()?;
        }
        self.autosave()?;
        Ok(emptied)
    }

    pub fn set_version_info(
        &mut self,
        dataset: &str,
        tag: &str,
        author: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let res = self
            .dataset_mut(dataset)
            .and_then(|d| d.version_or_err(tag))
            .map(|v| {
                v.set_author(author);
                v.set_description(description);
            })
            .and_then(|_| self.autosave());
        self.report("Set version info", res)
    }

    // --- Layers ---

    pub fn add_layer(
        &mut self,
        dataset: &str,
        tag: &str,
        name: &str,
        annotation_keys: Vec<String>,
    ) -> Result<()> {
        let displayed = self.is_displayed(dataset, tag);
        let viewer: Option<&mut dyn Viewer> =
            if displayed { Some(self.collab.viewer.as_mut()) } else { None };
        let res = match self.datasets.get_mut(dataset) {
            Some(d) => {
                d.version_or_err(tag)
                    .and_then(|v| v.add_layer(name, annotation_keys, viewer))
            },
            None => Err(dataset_not_found(dataset)),
        };
        let res = res.and_then(|_| self.autosave());
        self.report("Add layer", res)
    }

    pub fn del_layer(
        &mut self,
        dataset: &str,
        tag: &str,
        name: &str,
    ) -> Result<()> {
        let displayed = self.is_displayed(dataset, tag);
        let viewer: Option<&mut dyn Viewer> =
            if displayed { Some(self.collab.viewer.as_mut()) } else { None };
        let res = match self.datasets.get_mut(dataset) {
            Some(d) => d.version_or_err(tag).and_then(|v| v.del_layer(name, viewer)),
            None => Err(dataset_not_found(dataset)),
        };
        let res = res.and_then(|_| self.autosave());
        self.report("Delete layer", res)
    }

    pub fn rename_layer(
        &mut self,
        dataset: &str,
        tag: &str,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let displayed = self.is_displayed(dataset, tag);
        let viewer: Option<&mut dyn Viewer> =
            if displayed { Some(self.collab.viewer.as_mut()) } else { None };
        let res = match self.datasets.get_mut(dataset) {
            Some(d) => {
                d.version_or_err(tag)
                    .and_then(|v| v.rename_layer(old, new, viewer))
            },
            None => Err(dataset_not_found(dataset)),
        };
        let res = res.and_then(|_| self.autosave());
        self.report("Rename layer", res)
    }

    pub fn select_layer(
        &mut self,
        dataset: &str,
        tag: &str,
        name: &str,
    ) -> Result<()> {
        let displayed = self.is_displayed(dataset, tag);
        let viewer: Option<&mut dyn Viewer> =
            if displayed { Some(self.collab.viewer.as_mut()) } else { None };
        let res = match self.datasets.get_mut(dataset) {
            Some(d) => d.version_or_err(tag).and_then(|v| v.select_layer(name, viewer)),
            None => Err(dataset_not_found(dataset)),
        };
        let res = res.and_then(|_| self.autosave());
        self.report("Select layer", res)
    }

    /// Writes one layer as plain BED. The displayed layer is taken as shown.
    pub fn export_layer_bed(
        &mut self,
        dataset: &str,
        tag: &str,
        layer: &str,
        dest: &Path,
    ) -> Result<usize> {
        let res = self.export_layer_bed_inner(dataset, tag, layer, dest);
        self.report("Export BED", res)
    }

    fn export_layer_bed_inner(
        &mut self,
        dataset: &str,
        tag: &str,
        layer: &str,
        dest: &Path,
    ) -> Result<usize> {
        let displayed = self.is_displayed(dataset, tag);
        let viewer = self.collab.viewer.as_ref();
        let version = self
            .datasets
            .get_mut(dataset)
            .ok_or_else(|| dataset_not_found(dataset))?
            .version_or_err(tag)?;
        let is_active = version.active_layer_name() == layer;
        let target = version
            .layer_mut(layer)
            .ok_or_else(|| StoreError::not_found(format!("layer '{layer}' in version '{tag}'")))?;
        if !target.is_loaded() {
            target.load(None)?;
        }
        if displayed && is_active {
            target.sync_from_viewer(viewer);
        }
        target.export_bed(dest)
    }

    // --- Region editing on the displayed layer ---

    fn edit_active<T>(
        &mut self,
        edit: impl FnOnce(&mut IntervalSet) -> T,
    ) -> Result<T> {
        let (layer, viewer) = self.active_layer_parts()?;
        if !layer.is_loaded() {
            layer.load(None)?;
        }
        layer.sync_from_viewer(viewer);
        let out = edit(layer.regions_mut());
        viewer.publish(&layer.regions().to_sorted_vec());
        layer.save()?;
        Ok(out)
    }

    /// Canonicalizes the chromosome and checks the region against the
    /// chromosome length, when the genome catalog knows it.
    fn checked(
        &self,
        mut region: Region,
    ) -> Result<Region> {
        let chrom = self.collab.genomes.canonical_chr(region.chrom());
        if let Some(length) = self.collab.genomes.chromosome_length(&chrom) {
            if region.end() > length {
                return Err(StoreError::malformed(format!(
                    "{region} extends past the end of chromosome {chrom} ({length})"
                )));
            }
        }
        region.set_chrom(chrom);
        Ok(region)
    }

    /// Inserts a region into the displayed layer, resolving overlaps.
    pub fn insert_region(
        &mut self,
        region: Region,
    ) -> Result<()> {
        let res = self
            .checked(region)
            .and_then(|region| self.edit_active(|set| set.insert(region, false)))
            .and_then(|_| self.autosave());
        self.report("Insert region", res)
    }

    /// Cuts the range of `region` out of the displayed layer.
    pub fn clip_region(
        &mut self,
        region: Region,
    ) -> Result<()> {
        let res = self
            .checked(region)
            .and_then(|region| self.edit_active(|set| set.clip(region)))
            .and_then(|_| self.autosave());
        self.report("Clip region", res)
    }

    /// Joins every region of the displayed layer overlapping `region`.
    /// Returns the joined region, or `None` when nothing overlapped.
    pub fn merge_region(
        &mut self,
        region: Region,
    ) -> Result<Option<Region>> {
        let res = self
            .checked(region)
            .and_then(|region| self.edit_active(|set| set.merge(&region)))
            .and_then(|merged| self.autosave().map(|_| merged));
        self.report("Merge region", res)
    }

    /// Regions of the displayed layer in canonical order.
    pub fn active_regions(&mut self) -> Result<Vec<Region>> {
        let res = self.edit_active(|set| set.to_sorted_vec());
        self.report("Read regions", res)
    }

    /// Replaces the displayed layer's regions wholesale. Overlaps are kept
    /// as given.
    pub fn replace_active_regions(
        &mut self,
        regions: Vec<Region>,
    ) -> Result<()> {
        let res = self
            .edit_active(|set| set.bulk_replace(regions))
            .and_then(|_| self.autosave());
        self.report("Replace regions", res)
    }

    // --- Archive transfer ---

    /// Writes the named datasets and all their files into `archive`.
    /// Returns the archive entry names.
    pub fn export_datasets(
        &mut self,
        names: &[&str],
        archive: &Path,
    ) -> Result<Vec<String>> {
        let res = self.export_datasets_inner(names, archive);
        self.report("Export", res)
    }

    fn export_datasets_inner(
        &mut self,
        names: &[&str],
        archive: &Path,
    ) -> Result<Vec<String>> {
        self.save_catalog()?;
        let selected = names
            .iter()
            .map(|name| {
                self.datasets
                    .get(*name)
                    .ok_or_else(|| dataset_not_found(name))
            })
            .collect::<Result<Vec<_>>>()?;

        let manifest: Manifest = selected
            .iter()
            .map(|d| (d.name().to_owned(), d.to_record()))
            .collect();
        let files = selected.iter().flat_map(|d| d.files()).collect_vec();
        let entries = write_archive(archive, &manifest, &files)?;
        info!(
            "Exported {} datasets to {}",
            manifest.len(),
            archive.display()
        );
        Ok(entries)
    }

    /// Adds every dataset of `archive` to the store.
    ///
    /// The whole import is refused, before anything is written, when a
    /// dataset name is taken or a file would overwrite one in the home
    /// directory. Session descriptors are re-rooted to this home; an
    /// unknown genome or paths missing locally go through the prompt.
    /// Returns the imported dataset names.
    pub fn import_datasets(
        &mut self,
        archive: &Path,
    ) -> Result<Vec<String>> {
        let res = self.import_datasets_inner(archive);
        self.report("Import", res)
    }

    fn import_datasets_inner(
        &mut self,
        archive: &Path,
    ) -> Result<Vec<String>> {
        let unpacked = unpack_archive(archive)?;
        let manifest = unpacked.manifest().clone();

        // Refuse before touching anything.
        let mut targets: HashSet<String> = HashSet::new();
        for (name, record) in &manifest {
            if self.datasets.contains_key(name) {
                return Err(StoreError::conflict(format!(
                    "dataset '{name}' already exists"
                )));
            }
            for file in record.referenced_files() {
                let entry = entry_name(file)?;
                if self.home.join(&entry).exists() {
                    return Err(StoreError::conflict(format!(
                        "{} already exists in {}",
                        entry,
                        self.home.display()
                    )));
                }
                if !targets.insert(entry.clone()) {
                    return Err(StoreError::conflict(format!(
                        "archive references {entry} more than once"
                    )));
                }
            }
        }

        let sessions = self.prepare_sessions(&unpacked, &manifest)?;
        let written = self.copy_archive_files(&unpacked, &manifest, &sessions)?;
        debug!("Copied {} files from {}", written.len(), archive.display());

        let mut imported = Vec::with_capacity(manifest.len());
        for (name, record) in manifest {
            let record = self.rehome(record)?;
            self.datasets
                .insert(name.clone(), Dataset::from_record(&self.home, record));
            imported.push(name);
        }
        info!(
            "Imported datasets {} from {}",
            imported.join(", "),
            archive.display()
        );
        self.autosave()?;
        Ok(imported)
    }

    /// Re-roots every session descriptor of the archive in memory. Keyed by
    /// entry name.
    fn prepare_sessions(
        &mut self,
        unpacked: &UnpackedArchive,
        manifest: &Manifest,
    ) -> Result<BTreeMap<String, String>> {
        let mut sessions = BTreeMap::new();
        for record in manifest.values() {
            for version in &record.versions {
                let entry = entry_name(&version.session)?;
                if !unpacked.contains(&entry) {
                    warn!("Archive has no session descriptor {entry}");
                    continue;
                }
                let old_home = version
                    .session
                    .as_path()
                    .parent()
                    .map(|p| PortablePath::new(p).to_portable_string())
                    .unwrap_or_default();
                let xml = fs::read_to_string(unpacked.path_of(&entry))?;
                let rerooted = self.reroot_session(&xml, old_home)?;
                sessions.insert(entry, rerooted);
            }
        }
        Ok(sessions)
    }

    fn reroot_session(
        &mut self,
        xml: &str,
        old_home: String,
    ) -> Result<String> {
        let summary = summarize(xml)?;
        let genome = match summary.genome.as_deref() {
            Some(genome) if !self.collab.genomes.has_genome(genome) => {
                let available = self.collab.genomes.available_genomes();
                match self.collab.prompt.choose_genome(genome, &available) {
                    Some(substitute) => {
                        info!("Using genome {substitute} instead of {genome}");
                        Some(substitute)
                    },
                    None => {
                        return Err(StoreError::UserAborted(format!(
                            "no substitute chosen for genome {genome}"
                        )))
                    },
                }
            },
            _ => None,
        };

        let mut rules = RerootRules {
            old_home,
            new_home: PortablePath::new(self.home.clone()).to_portable_string(),
            external: Vec::new(),
            genome,
        };
        let broken = summary
            .paths
            .iter()
            .filter(|p| !rules.is_under_old_home(p) && !Path::new(p.as_str()).exists())
            .cloned()
            .collect_vec();
        if !broken.is_empty() {
            warn!("{} session paths do not exist locally", broken.len());
            rules.external = self.collab.prompt.fix_broken_links(&broken);
        }
        reroot(xml, &rules)
    }

    /// Copies every referenced file into the home directory. Already copied
    /// files are removed again if one copy fails.
    fn copy_archive_files(
        &self,
        unpacked: &UnpackedArchive,
        manifest: &Manifest,
        sessions: &BTreeMap<String, String>,
    ) -> Result<Vec<PathBuf>> {
        let mut written: Vec<PathBuf> = Vec::new();
        let entries = manifest
            .values()
            .flat_map(DatasetRecord::referenced_files)
            .map(entry_name)
            .collect::<Result<Vec<_>>>()?;

        for entry in entries {
            let dest = self.home.join(&entry);
            let copied = if let Some(xml) = sessions.get(&entry) {
                fs::write(&dest, xml).map(|_| true)
            }
            else if unpacked.contains(&entry) {
                fs::copy(unpacked.path_of(&entry), &dest).map(|_| true)
            }
            else {
                warn!("Archive has no file {entry}");
                Ok(false)
            };
            match copied {
                Ok(true) => written.push(dest),
                Ok(false) => {},
                Err(e) => {
                    for path in &written {
                        if let Err(rm) = fs::remove_file(path) {
                            warn!("Could not remove {}: {rm}", path.display());
                        }
                    }
                    return Err(e.into());
                },
            }
        }
        Ok(written)
    }

    /// Points every file of `record` into this home directory.
    fn rehome(
        &self,
        mut record: DatasetRecord,
    ) -> Result<DatasetRecord> {
        for version in record.versions.iter_mut() {
            version.session = PortablePath::new(self.home.join(entry_name(&version.session)?));
            for layer in version.layers.iter_mut() {
                layer.file = PortablePath::new(self.home.join(entry_name(&layer.file)?));
            }
        }
        Ok(record)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if self.closed || !self.config.autosave() {
            return;
        }
        if let Err(e) = self.save_catalog() {
            warn!("Could not save the store on shutdown: {e}");
        }
    }
}
