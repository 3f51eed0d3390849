use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use indexmap::IndexMap;
use itertools::Itertools;
use log::{
    debug,
    info,
    warn,
};

use super::collab::Viewer;
use super::layer::{
    Layer,
    DEFAULT_LAYER,
};
use super::{
    layer_file_path,
    session_file_path,
};
use crate::error::{
    Result,
    StoreError,
};
use crate::io::catalog::{
    PortablePath,
    VersionRecord,
};
use crate::io::session::{
    add_track,
    new_descriptor,
    remove_track,
    reroot,
    RerootRules,
};

fn check_name(
    what: &str,
    name: &str,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::malformed(format!("{what} name must not be empty")));
    }
    Ok(())
}

pub(crate) fn ensure_free(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(StoreError::conflict(format!(
            "{} already exists",
            path.display()
        )));
    }
    Ok(())
}

/// Rewrites every occurrence of the `from` paths in the session descriptor at
/// `session` to the matching `to` path.
fn remap_session(
    session: &Path,
    moves: &[(PathBuf, PathBuf)],
) -> Result<()> {
    if moves.is_empty() || !session.is_file() {
        return Ok(());
    }
    let rules = RerootRules {
        external: moves
            .iter()
            .map(|(from, to)| {
                (
                    PortablePath::new(from.clone()).to_portable_string(),
                    PortablePath::new(to.clone()).to_portable_string(),
                )
            })
            .collect(),
        ..Default::default()
    };
    let xml = fs::read_to_string(session)?;
    fs::write(session, reroot(&xml, &rules)?)?;
    Ok(())
}

/// Applies `edit` to the session descriptor at `session`, if there is one.
fn edit_session<F>(
    session: &Path,
    edit: F,
) -> Result<()>
where
    F: FnOnce(&str) -> Result<String>, {
    if !session.is_file() {
        return Ok(());
    }
    let xml = fs::read_to_string(session)?;
    fs::write(session, edit(&xml)?)?;
    Ok(())
}

/// One version of a dataset: a set of named layers, one of them active, and
/// the viewer session descriptor that goes with them.
///
/// Operations taking a viewer expect `Some` only when this version is the one
/// on display.
#[derive(Debug, Clone)]
pub struct Version {
    home:         PathBuf,
    dataset:      String,
    tag:          String,
    author:       Option<String>,
    description:  Option<String>,
    session:      PathBuf,
    active_layer: String,
    layers:       IndexMap<String, Layer>,
}

impl Version {
    /// Creates a version with an empty default layer and a session
    /// descriptor listing it.
    pub fn create(
        home: &Path,
        dataset: &str,
        tag: &str,
        genome: Option<&str>,
    ) -> Result<Self> {
        check_name("version", tag)?;
        let session = session_file_path(home, dataset, tag);
        ensure_free(&session)?;

        let layer = Layer::create(
            layer_file_path(home, dataset, tag, DEFAULT_LAYER),
            DEFAULT_LAYER,
            Vec::new(),
        )?;
        let version = Self {
            home: home.to_path_buf(),
            dataset: dataset.to_owned(),
            tag: tag.to_owned(),
            author: None,
            description: None,
            session,
            active_layer: DEFAULT_LAYER.to_owned(),
            layers: IndexMap::from([(DEFAULT_LAYER.to_owned(), layer)]),
        };
        if let Err(e) = version.write_session(genome) {
            version.delete_files();
            return Err(e);
        }
        debug!("Created version {} of {}", tag, dataset);
        Ok(version)
    }

    pub fn from_record(
        home: &Path,
        dataset: &str,
        record: VersionRecord,
    ) -> Self {
        let layers = record
            .layers
            .into_iter()
            .map(|l| (l.name.clone(), Layer::from_record(l)))
            .collect::<IndexMap<_, _>>();
        let active_layer = if layers.contains_key(&record.active_layer) {
            record.active_layer
        }
        else {
            DEFAULT_LAYER.to_owned()
        };
        Self {
            home: home.to_path_buf(),
            dataset: dataset.to_owned(),
            tag: record.tag,
            author: record.author,
            description: record.description,
            session: record.session.as_path().to_path_buf(),
            active_layer,
            layers,
        }
    }

    pub fn to_record(&self) -> VersionRecord {
        VersionRecord {
            tag:          self.tag.clone(),
            author:       self.author.clone(),
            description:  self.description.clone(),
            session:      PortablePath::new(self.session.clone()),
            active_layer: self.active_layer.clone(),
            layers:       self
                .layers
                .values()
                .map(|l| l.record().clone())
                .collect(),
        }
    }

    fn write_session(
        &self,
        genome: Option<&str>,
    ) -> Result<()> {
        let tracks = self
            .layers
            .values()
            .map(|l| {
                (
                    PortablePath::new(l.path()).to_portable_string(),
                    l.name().to_owned(),
                )
            })
            .collect_vec();
        let xml = new_descriptor(
            genome,
            &PortablePath::new(self.session.clone()).to_portable_string(),
            &tracks,
        )?;
        fs::write(&self.session, xml)?;
        Ok(())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_author(
        &mut self,
        author: Option<&str>,
    ) {
        self.author = author.map(str::to_owned);
    }

    pub fn set_description(
        &mut self,
        description: Option<&str>,
    ) {
        self.description = description.map(str::to_owned);
    }

    pub fn session_path(&self) -> &Path {
        &self.session
    }

    pub fn active_layer_name(&self) -> &str {
        &self.active_layer
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.keys().map(String::as_str).collect()
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn layer(
        &self,
        name: &str,
    ) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn layer_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut Layer> {
        self.layers.get_mut(name)
    }

    fn layer_or_err(
        &self,
        name: &str,
    ) -> Result<&Layer> {
        self.layers.get(name).ok_or_else(|| {
            StoreError::not_found(format!("layer '{}' in version '{}'", name, self.tag))
        })
    }

    pub fn active_layer(&self) -> Result<&Layer> {
        self.layer_or_err(&self.active_layer)
    }

    pub fn active_layer_mut(&mut self) -> Result<&mut Layer> {
        let tag = &self.tag;
        self.layers.get_mut(&self.active_layer).ok_or_else(|| {
            StoreError::not_found(format!(
                "layer '{}' in version '{}'",
                self.active_layer, tag
            ))
        })
    }

    /// Saves the displayed layer and drops the viewer's undo history.
    fn persist_active(
        &mut self,
        viewer: &mut dyn Viewer,
    ) -> Result<()> {
        if let Some(active) = self.layers.get_mut(&self.active_layer) {
            active.update_and_save(viewer)?;
        }
        viewer.clear_undo_history();
        Ok(())
    }

    /// Makes `name` the active layer. A displayed version saves the outgoing
    /// layer first and shows the incoming one.
    fn switch_layer(
        &mut self,
        name: &str,
        viewer: Option<&mut dyn Viewer>,
    ) -> Result<()> {
        match viewer {
            Some(viewer) => {
                self.persist_active(viewer)?;
                viewer.clear();
                self.active_layer = name.to_owned();
                self.active_layer_mut()?.load(Some(viewer))?;
            },
            None => self.active_layer = name.to_owned(),
        }
        Ok(())
    }

    /// Adds an empty layer and makes it active.
    pub fn add_layer(
        &mut self,
        name: &str,
        annotation_keys: Vec<String>,
        viewer: Option<&mut dyn Viewer>,
    ) -> Result<()> {
        check_name("layer", name)?;
        if self.layers.contains_key(name) {
            return Err(StoreError::conflict(format!(
                "layer '{}' already exists in version '{}'",
                name, self.tag
            )));
        }
        let layer = Layer::create(
            layer_file_path(&self.home, &self.dataset, &self.tag, name),
            name,
            annotation_keys,
        )?;
        let track = PortablePath::new(layer.path()).to_portable_string();
        if let Err(e) = edit_session(&self.session, |xml| add_track(xml, &track, name)) {
            layer.delete();
            return Err(e);
        }
        self.layers.insert(name.to_owned(), layer);
        info!("Added layer {} to {}/{}", name, self.dataset, self.tag);
        self.switch_layer(name, viewer)
    }

    /// Removes a layer and its file. The default layer cannot be removed;
    /// removing the active layer activates the default one.
    pub fn del_layer(
        &mut self,
        name: &str,
        viewer: Option<&mut dyn Viewer>,
    ) -> Result<()> {
        if name == DEFAULT_LAYER {
            return Err(StoreError::conflict(format!(
                "the default layer '{DEFAULT_LAYER}' cannot be removed"
            )));
        }
        self.layer_or_err(name)?;

        if self.active_layer == name {
            self.switch_layer(DEFAULT_LAYER, viewer)?;
        }
        else if let Some(viewer) = viewer {
            self.persist_active(viewer)?;
        }

        if let Some(layer) = self.layers.shift_remove(name) {
            let track = PortablePath::new(layer.path()).to_portable_string();
            layer.delete();
            edit_session(&self.session, |xml| remove_track(xml, &track))?;
        }
        info!("Removed layer {} from {}/{}", name, self.dataset, self.tag);
        Ok(())
    }

    /// Renames a layer and moves its file. The default layer can neither be
    /// renamed nor be the target name.
    pub fn rename_layer(
        &mut self,
        old: &str,
        new: &str,
        viewer: Option<&mut dyn Viewer>,
    ) -> Result<()> {
        if old == DEFAULT_LAYER || new == DEFAULT_LAYER {
            return Err(StoreError::conflict(format!(
                "the default layer '{DEFAULT_LAYER}' cannot be renamed"
            )));
        }
        check_name("layer", new)?;
        self.layer_or_err(old)?;
        if self.layers.contains_key(new) {
            return Err(StoreError::conflict(format!(
                "layer '{}' already exists in version '{}'",
                new, self.tag
            )));
        }
        let dest = layer_file_path(&self.home, &self.dataset, &self.tag, new);
        ensure_free(&dest)?;

        if let Some(viewer) = viewer {
            self.persist_active(viewer)?;
        }

        let idx = self.layers.get_index_of(old).ok_or_else(|| {
            StoreError::not_found(format!("layer '{}' in version '{}'", old, self.tag))
        })?;
        let Some(mut layer) = self.layers.shift_remove(old) else {
            return Err(StoreError::not_found(format!("layer '{old}'")));
        };
        let from = layer.path().to_path_buf();
        if let Err(e) = layer.relocate(dest.clone()) {
            self.layers.shift_insert(idx, old.to_owned(), layer);
            return Err(e);
        }
        layer.set_name(new);
        self.layers.shift_insert(idx, new.to_owned(), layer);
        if self.active_layer == old {
            self.active_layer = new.to_owned();
        }
        remap_session(&self.session, &[(from, dest)])?;
        info!("Renamed layer {} to {} in {}/{}", old, new, self.dataset, self.tag);
        Ok(())
    }

    /// Activates `name`.
    pub fn select_layer(
        &mut self,
        name: &str,
        viewer: Option<&mut dyn Viewer>,
    ) -> Result<()> {
        self.layer_or_err(name)?;
        if self.active_layer == name {
            return Ok(());
        }
        self.switch_layer(name, viewer)
    }

    /// Every file this version owns: layer files, then the session
    /// descriptor.
    pub fn files(&self) -> Vec<PathBuf> {
        self.layers
            .values()
            .map(|l| l.path().to_path_buf())
            .chain(std::iter::once(self.session.clone()))
            .collect()
    }

    /// Deletes every layer file and the session descriptor. Returns whether
    /// all of them were removed.
    pub fn delete_files(&self) -> bool {
        let mut all = true;
        for layer in self.layers.values() {
            all &= layer.delete();
        }
        if let Err(e) = fs::remove_file(&self.session) {
            warn!("Could not delete {}: {e}", self.session.display());
            all = false;
        }
        all
    }

    fn target_paths(
        &self,
        dataset: &str,
        tag: &str,
    ) -> Vec<(PathBuf, PathBuf)> {
        self.layers
            .values()
            .map(|l| {
                (
                    l.path().to_path_buf(),
                    layer_file_path(&self.home, dataset, tag, l.name()),
                )
            })
            .chain(std::iter::once((
                self.session.clone(),
                session_file_path(&self.home, dataset, tag),
            )))
            .collect()
    }

    /// Fails with [`StoreError::Conflict`] if moving this version under
    /// `dataset`/`tag` would overwrite an existing file.
    pub(crate) fn check_relocation(
        &self,
        dataset: &str,
        tag: &str,
    ) -> Result<()> {
        self.target_paths(dataset, tag)
            .iter()
            .filter(|(from, to)| from != to)
            .try_for_each(|(_, to)| ensure_free(to))
    }

    /// Moves every file of this version to the names of `dataset`/`tag`.
    pub(crate) fn relocate(
        &mut self,
        dataset: &str,
        tag: &str,
    ) -> Result<()> {
        self.check_relocation(dataset, tag)?;
        let moves = self.target_paths(dataset, tag);

        for layer in self.layers.values_mut() {
            let dest = layer_file_path(&self.home, dataset, tag, layer.name());
            layer.relocate(dest)?;
        }
        let session_dest = session_file_path(&self.home, dataset, tag);
        if session_dest != self.session && self.session.exists() {
            fs::rename(&self.session, &session_dest)?;
        }
        self.session = session_dest;
        self.dataset = dataset.to_owned();
        self.tag = tag.to_owned();
        remap_session(&self.session, &moves)?;
        debug!("Relocated version to {}/{}", dataset, tag);
        Ok(())
    }

    /// Copies this version's files under a new tag. Layers keep their names
    /// and contents; author and description are not carried over.
    pub(crate) fn copy_as(
        &self,
        tag: &str,
        genome: Option<&str>,
    ) -> Result<Version> {
        check_name("version", tag)?;
        self.check_relocation(&self.dataset, tag)?;

        let mut layers = IndexMap::with_capacity(self.layers.len());
        for (name, layer) in &self.layers {
            let dest = layer_file_path(&self.home, &self.dataset, tag, name);
            match layer.copy_to(dest) {
                Ok(copy) => {
                    layers.insert(name.clone(), copy);
                },
                Err(e) => {
                    layers.values().for_each(|l: &Layer| {
                        l.delete();
                    });
                    return Err(e);
                },
            }
        }

        let copy = Version {
            home: self.home.clone(),
            dataset: self.dataset.clone(),
            tag: tag.to_owned(),
            author: None,
            description: None,
            session: session_file_path(&self.home, &self.dataset, tag),
            active_layer: self.active_layer.clone(),
            layers,
        };
        let session = if self.session.is_file() {
            fs::copy(&self.session, &copy.session)
                .map_err(StoreError::from)
                .and_then(|_| remap_session(&copy.session, &self.target_paths(&self.dataset, tag)))
        }
        else {
            copy.write_session(genome)
        };
        if let Err(e) = session {
            copy.delete_files();
            return Err(e);
        }
        info!("Copied {}/{} to {}", self.dataset, self.tag, tag);
        Ok(copy)
    }
}
