use std::path::{
    Path,
    PathBuf,
};

use indexmap::IndexMap;
use log::info;

use super::collab::{
    GenomeCatalog,
    Prompt,
};
use super::layer::ImportOutcome;
use super::version::Version;
use crate::error::{
    Result,
    StoreError,
};
use crate::io::catalog::{
    DatasetRecord,
    PortablePath,
};

/// Tag of the version every dataset starts with.
pub const DEFAULT_VERSION: &str = "ver1";

/// Increments the trailing number of `tag`, keeping zero padding where the
/// width allows. A tag without trailing digits gets `0` appended.
///
/// ```
/// use roistore::store::next_tag;
///
/// assert_eq!(next_tag("ver3"), "ver4");
/// assert_eq!(next_tag("ver09"), "ver10");
/// assert_eq!(next_tag("run"), "run0");
/// ```
pub fn next_tag(tag: &str) -> String {
    let digits_at = tag
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(idx, _)| idx);
    let Some(split) = digits_at
    else {
        return format!("{tag}0");
    };

    let (prefix, digits) = tag.split_at(split);
    let mut bytes = digits.as_bytes().to_vec();
    let mut carry = true;
    for b in bytes.iter_mut().rev() {
        if !carry {
            break;
        }
        if *b == b'9' {
            *b = b'0';
        }
        else {
            *b += 1;
            carry = false;
        }
    }
    if carry {
        bytes.insert(0, b'1');
    }
    format!("{prefix}{}", String::from_utf8_lossy(&bytes))
}

/// A named dataset: its versions, the active one, and where it came from.
#[derive(Debug, Clone)]
pub struct Dataset {
    home:           PathBuf,
    name:           String,
    category:       Option<String>,
    source_file:    Option<PathBuf>,
    active_version: String,
    versions:       IndexMap<String, Version>,
}

impl Dataset {
    /// Creates a dataset with the default version and layer, seeded from
    /// `source` when given. On failure every file created so far is removed.
    pub fn create(
        home: &Path,
        name: &str,
        source: Option<&Path>,
        genomes: &dyn GenomeCatalog,
        prompt: &mut dyn Prompt,
        row_limit: usize,
    ) -> Result<(Self, Option<ImportOutcome>)> {
        if name.trim().is_empty() {
            return Err(StoreError::malformed("dataset name must not be empty"));
        }
        let genome = genomes.current_genome();
        let mut version = Version::create(home, name, DEFAULT_VERSION, genome.as_deref())?;

        let outcome = match source {
            Some(source) => {
                let imported = version
                    .active_layer_mut()
                    .and_then(|layer| layer.import_and_load(source, genomes, prompt, row_limit, None));
                match imported {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        version.delete_files();
                        return Err(e);
                    },
                }
            },
            None => None,
        };

        let dataset = Self {
            home:           home.to_path_buf(),
            name:           name.to_owned(),
            category:       None,
            source_file:    source.map(Path::to_path_buf),
            active_version: DEFAULT_VERSION.to_owned(),
            versions:       IndexMap::from([(DEFAULT_VERSION.to_owned(), version)]),
        };
        info!("Created dataset {}", name);
        Ok((dataset, outcome))
    }

    pub fn from_record(
        home: &Path,
        record: DatasetRecord,
    ) -> Self {
        let versions = record
            .versions
            .into_iter()
            .map(|v| (v.tag.clone(), Version::from_record(home, &record.name, v)))
            .collect::<IndexMap<_, _>>();
        let active_version = if versions.contains_key(&record.active_version) {
            record.active_version
        }
        else {
            versions
                .keys()
                .next()
                .cloned()
                .unwrap_or(record.active_version)
        };
        Self {
            home: home.to_path_buf(),
            name: record.name,
            category: record.category,
            source_file: record.source_file.map(|p| p.as_path().to_path_buf()),
            active_version,
            versions,
        }
    }

    pub fn to_record(&self) -> DatasetRecord {
        DatasetRecord {
            name:           self.name.clone(),
            category:       self.category.clone(),
            source_file:    self.source_file.clone().map(PortablePath::new),
            active_version: self.active_version.clone(),
            versions:       self.versions.values().map(Version::to_record).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn set_category(
        &mut self,
        category: Option<&str>,
    ) {
        self.category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    pub fn active_version_tag(&self) -> &str {
        &self.active_version
    }

    pub fn version_tags(&self) -> Vec<&str> {
        self.versions.keys().map(String::as_str).collect()
    }

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.versions.values()
    }

    pub fn version(
        &self,
        tag: &str,
    ) -> Option<&Version> {
        self.versions.get(tag)
    }

    pub fn version_mut(
        &mut self,
        tag: &str,
    ) -> Option<&mut Version> {
        self.versions.get_mut(tag)
    }

    pub(crate) fn version_or_err(
        &mut self,
        tag: &str,
    ) -> Result<&mut Version> {
        let name = &self.name;
        self.versions.get_mut(tag).ok_or_else(|| {
            StoreError::not_found(format!("version '{}' of dataset '{}'", tag, name))
        })
    }

    pub fn active_version(&self) -> Result<&Version> {
        self.versions.get(&self.active_version).ok_or_else(|| {
            StoreError::not_found(format!(
                "version '{}' of dataset '{}'",
                self.active_version, self.name
            ))
        })
    }

    pub fn active_version_mut(&mut self) -> Result<&mut Version> {
        let tag = self.active_version.clone();
        self.version_or_err(&tag)
    }

    /// Every file owned by this dataset.
    pub fn files(&self) -> Vec<PathBuf> {
        self.versions.values().flat_map(Version::files).collect()
    }

    /// Proposed tag for the next version: the latest tag incremented, skipping
    /// tags already taken.
    pub fn next_version_tag(&self) -> String {
        let latest = self
            .versions
            .keys()
            .last()
            .map(String::as_str)
            .unwrap_or("ver0");
        let mut tag = next_tag(latest);
        while self.versions.contains_key(&tag) {
            tag = next_tag(&tag);
        }
        tag
    }

    /// Adds a version, empty or copied from `copy_from`. The active version
    /// is left unchanged.
    pub fn add_version(
        &mut self,
        tag: &str,
        copy_from: Option<&str>,
        genome: Option<&str>,
    ) -> Result<()> {
        if self.versions.contains_key(tag) {
            return Err(StoreError::conflict(format!(
                "version '{}' already exists in dataset '{}'",
                tag, self.name
            )));
        }
        let version = match copy_from {
            Some(from) => {
                let source = self.versions.get(from).ok_or_else(|| {
                    StoreError::not_found(format!(
                        "version '{}' of dataset '{}'",
                        from, self.name
                    ))
                })?;
                source.copy_as(tag, genome)?
            },
            None => Version::create(&self.home, &self.name, tag, genome)?,
        };
        self.versions.insert(tag.to_owned(), version);
        info!("Added version {} to {}", tag, self.name);
        Ok(())
    }

    /// Renames a version, moving its files.
    pub fn rename_version(
        &mut self,
        old: &str,
        new: &str,
    ) -> Result<()> {
        if new.trim().is_empty() {
            return Err(StoreError::malformed("version name must not be empty"));
        }
        if self.versions.contains_key(new) {
            return Err(StoreError::conflict(format!(
                "version '{}' already exists in dataset '{}'",
                new, self.name
            )));
        }
        let idx = self.versions.get_index_of(old).ok_or_else(|| {
            StoreError::not_found(format!("version '{}' of dataset '{}'", old, self.name))
        })?;
        let name = self.name.clone();
        self.version_or_err(old)?.relocate(&name, new)?;

        if let Some(version) = self.versions.shift_remove(old) {
            self.versions.shift_insert(idx, new.to_owned(), version);
        }
        if self.active_version == old {
            self.active_version = new.to_owned();
        }
        info!("Renamed version {} to {} in {}", old, new, self.name);
        Ok(())
    }

    /// Deletes a version and its files. Returns `true` when it was the last
    /// version, leaving the dataset empty.
    pub fn delete_version(
        &mut self,
        tag: &str,
    ) -> Result<bool> {
        let version = self.versions.shift_remove(tag).ok_or_else(|| {
            StoreError::not_found(format!("version '{}' of dataset '{}'", tag, self.name))
        })?;
        version.delete_files();
        if self.active_version == tag {
            if let Some(first) = self.versions.keys().next() {
                self.active_version = first.clone();
            }
        }
        info!("Deleted version {} of {}", tag, self.name);
        Ok(self.versions.is_empty())
    }

    pub fn select_version(
        &mut self,
        tag: &str,
    ) -> Result<()> {
        self.version_or_err(tag)?;
        self.active_version = tag.to_owned();
        Ok(())
    }

    /// Renames the dataset, moving the files of every version. Nothing is
    /// moved if any target file already exists.
    pub fn rename(
        &mut self,
        new: &str,
    ) -> Result<()> {
        if new.trim().is_empty() {
            return Err(StoreError::malformed("dataset name must not be empty"));
        }
        for version in self.versions.values() {
            version.check_relocation(new, version.tag())?;
        }
        for version in self.versions.values_mut() {
            let tag = version.tag().to_owned();
            version.relocate(new, &tag)?;
        }
        info!("Renamed dataset {} to {}", self.name, new);
        self.name = new.to_owned();
        Ok(())
    }

    /// Deletes the files of every version.
    pub fn delete_files(&self) -> bool {
        self.versions
            .values()
            .fold(true, |all, v| v.delete_files() && all)
    }
}
