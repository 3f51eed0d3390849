//! Collaborators the store talks to but does not own the logic of.
//!
//! The store never renders regions or asks questions itself. It goes through
//! three seams:
//!
//! - [`GenomeCatalog`]: genome ids, canonical chromosome names and lengths.
//! - [`Viewer`]: whatever displays the active layer and reports user edits.
//! - [`Prompt`]: yes/no checkpoints, genome substitution, broken links and
//!   failure notices.
//!
//! Headless implementations ([`StaticGenomeCatalog`], [`MemoryViewer`],
//! [`AutoPrompt`]) are provided for scripted use and tests. [`MemoryViewer`]
//! and [`AutoPrompt`] are cheap handles over shared state, so a clone kept
//! by the caller observes what the store did.

use std::path::Path;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};

use hashbrown::HashMap;
use itertools::Itertools;
use log::{
    debug,
    info,
};

use crate::data_structs::chrom::canonical_chrom;
use crate::data_structs::typedef::PosType;
use crate::data_structs::Region;
use crate::error::Result;

pub trait GenomeCatalog: Send {
    /// Id of the genome currently in use, if any.
    fn current_genome(&self) -> Option<String>;

    fn has_genome(
        &self,
        id: &str,
    ) -> bool;

    /// Every genome id known locally.
    fn available_genomes(&self) -> Vec<String>;

    /// Name under which regions of `raw` are stored.
    fn canonical_chr(
        &self,
        raw: &str,
    ) -> String {
        canonical_chrom(raw).into_owned()
    }

    fn chromosome_length(
        &self,
        chr: &str,
    ) -> Option<PosType>;
}

pub trait Viewer: Send {
    /// Displays `regions` as the active layer.
    fn publish(
        &mut self,
        regions: &[Region],
    );

    /// Removes the displayed region set.
    fn clear(&mut self);

    /// Regions currently displayed, including user edits, or `None` when
    /// nothing is displayed.
    fn current_regions(&self) -> Option<Vec<Region>>;

    /// Drops undo snapshots that may refer to a layer that no longer exists.
    fn clear_undo_history(&mut self);

    /// Writes the viewer's own session state to `session`.
    fn flush_session(
        &mut self,
        session: &Path,
    ) -> Result<()>;
}

pub trait Prompt: Send {
    /// Yes/no checkpoint.
    fn confirm(
        &mut self,
        question: &str,
    ) -> bool;

    /// Picks a local genome to use instead of `missing`. `None` aborts.
    fn choose_genome(
        &mut self,
        missing: &str,
        available: &[String],
    ) -> Option<String>;

    /// Builds a prefix replacement table for paths that do not exist
    /// locally. Returned pairs are `(old prefix, new prefix)`.
    fn fix_broken_links(
        &mut self,
        broken: &[String],
    ) -> Vec<(String, String)>;

    /// Reports a failure to the user.
    fn notify(
        &mut self,
        message: &str,
    );
}

/// Collaborators owned by a [`Registry`](super::Registry).
pub struct Collaborators {
    pub genomes: Box<dyn GenomeCatalog>,
    pub viewer:  Box<dyn Viewer>,
    pub prompt:  Box<dyn Prompt>,
}

impl Collaborators {
    pub fn new(
        genomes: impl GenomeCatalog + 'static,
        viewer: impl Viewer + 'static,
        prompt: impl Prompt + 'static,
    ) -> Self {
        Self {
            genomes: Box::new(genomes),
            viewer:  Box::new(viewer),
            prompt:  Box::new(prompt),
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new(
            StaticGenomeCatalog::default(),
            MemoryViewer::default(),
            AutoPrompt::default(),
        )
    }
}

/// Fixed table of genomes and their chromosome lengths.
#[derive(Debug, Clone, Default)]
pub struct StaticGenomeCatalog {
    current: Option<String>,
    genomes: HashMap<String, HashMap<String, PosType>>,
}

impl StaticGenomeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a genome. Chromosome names are canonicalized. The first genome
    /// added becomes current.
    pub fn with_genome<'a>(
        mut self,
        id: &str,
        chromosomes: impl IntoIterator<Item = (&'a str, PosType)>,
    ) -> Self {
        let lengths = chromosomes
            .into_iter()
            .map(|(chr, len)| (canonical_chrom(chr).into_owned(), len))
            .collect();
        self.genomes.insert(id.to_owned(), lengths);
        if self.current.is_none() {
            self.current = Some(id.to_owned());
        }
        self
    }

    pub fn set_current(
        &mut self,
        id: Option<&str>,
    ) {
        self.current = id.map(str::to_owned);
    }
}

impl GenomeCatalog for StaticGenomeCatalog {
    fn current_genome(&self) -> Option<String> {
        self.current.clone()
    }

    fn has_genome(
        &self,
        id: &str,
    ) -> bool {
        self.genomes.contains_key(id)
    }

    fn available_genomes(&self) -> Vec<String> {
        self.genomes.keys().cloned().sorted().collect()
    }

    fn chromosome_length(
        &self,
        chr: &str,
    ) -> Option<PosType> {
        let genome = self.genomes.get(self.current.as_deref()?)?;
        genome.get(canonical_chrom(chr).as_ref()).copied()
    }
}

#[derive(Debug, Default)]
pub struct ViewerState {
    pub displayed:      Option<Vec<Region>>,
    pub publish_count:  usize,
    pub undo_clears:    usize,
    pub flushed:        Vec<String>,
}

/// Headless viewer keeping the displayed set in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryViewer {
    state: Arc<Mutex<ViewerState>>,
}

impl MemoryViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, ViewerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the displayed set, as a user edit in a real viewer would.
    pub fn edit(
        &self,
        regions: Vec<Region>,
    ) {
        self.state().displayed = Some(regions);
    }
}

impl Viewer for MemoryViewer {
    fn publish(
        &mut self,
        regions: &[Region],
    ) {
        let mut state = self.state();
        state.displayed = Some(regions.to_vec());
        state.publish_count += 1;
        debug!("Viewer shows {} regions", regions.len());
    }

    fn clear(&mut self) {
        self.state().displayed = None;
    }

    fn current_regions(&self) -> Option<Vec<Region>> {
        self.state().displayed.clone()
    }

    fn clear_undo_history(&mut self) {
        self.state().undo_clears += 1;
    }

    fn flush_session(
        &mut self,
        session: &Path,
    ) -> Result<()> {
        self.state()
            .flushed
            .push(session.to_string_lossy().into_owned());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PromptState {
    pub confirm:  bool,
    pub genome:   Option<String>,
    pub links:    Vec<(String, String)>,
    pub asked:    Vec<String>,
    pub messages: Vec<String>,
}

impl Default for PromptState {
    fn default() -> Self {
        Self {
            confirm:  true,
            genome:   None,
            links:    Vec::new(),
            asked:    Vec::new(),
            messages: Vec::new(),
        }
    }
}

/// Non-interactive prompt answering from preset values.
///
/// Confirms by default, chooses no substitute genome and fixes no links.
#[derive(Debug, Clone, Default)]
pub struct AutoPrompt {
    state: Arc<Mutex<PromptState>>,
}

impl AutoPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, PromptState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_confirm(
        self,
        answer: bool,
    ) -> Self {
        self.state().confirm = answer;
        self
    }

    pub fn with_genome(
        self,
        genome: &str,
    ) -> Self {
        self.state().genome = Some(genome.to_owned());
        self
    }

    pub fn with_link(
        self,
        from: &str,
        to: &str,
    ) -> Self {
        self.state()
            .links
            .push((from.to_owned(), to.to_owned()));
        self
    }
}

impl Prompt for AutoPrompt {
    fn confirm(
        &mut self,
        question: &str,
    ) -> bool {
        let mut state = self.state();
        state.asked.push(question.to_owned());
        state.confirm
    }

    fn choose_genome(
        &mut self,
        missing: &str,
        available: &[String],
    ) -> Option<String> {
        let mut state = self.state();
        state
            .asked
            .push(format!("substitute for genome {missing}"));
        state
            .genome
            .clone()
            .filter(|g| available.contains(g))
    }

    fn fix_broken_links(
        &mut self,
        broken: &[String],
    ) -> Vec<(String, String)> {
        let mut state = self.state();
        state
            .asked
            .push(format!("fix {} broken links", broken.len()));
        state.links.clone()
    }

    fn notify(
        &mut self,
        message: &str,
    ) {
        info!("{message}");
        self.state().messages.push(message.to_owned());
    }
}
