use std::fs;
use std::path::PathBuf;

use anyhow::{
    anyhow,
    Context,
};
use clap::Args;
use log::LevelFilter;
use roistore::prelude::*;

use crate::prompt::DialoguerPrompt;

#[derive(Args, Debug, Clone)]
pub(crate) struct UtilsArgs {
    #[arg(
        long,
        help = "Store home directory. Defaults to $ROISTORE_HOME or the current directory"
    )]
    pub home: Option<PathBuf>,

    #[arg(long, help = "Genome id recorded in new session descriptors")]
    pub genome: Option<String>,

    #[arg(
        long = "chrom-sizes",
        requires = "genome",
        help = "Tab-separated chromosome sizes of the genome, used to validate regions"
    )]
    pub chrom_sizes: Option<PathBuf>,

    #[arg(short = 'y', long, help = "Answer yes to every question")]
    pub yes: bool,

    #[arg(short, long, help = "Verbose output")]
    pub verbose: bool,
}

impl UtilsArgs {
    pub fn setup(&self) -> anyhow::Result<()> {
        let level = if self.verbose {
            LevelFilter::Debug
        }
        else {
            LevelFilter::Info
        };
        pretty_env_logger::formatted_builder()
            .filter_level(level)
            .parse_default_env()
            .try_init()
            .map_err(|e| anyhow!("Failed to set up logger: {e}"))
    }

    fn genomes(&self) -> anyhow::Result<StaticGenomeCatalog> {
        let Some(genome) = self.genome.as_deref()
        else {
            return Ok(StaticGenomeCatalog::new());
        };
        let sizes = match &self.chrom_sizes {
            Some(path) => read_chrom_sizes(path)?,
            None => Vec::new(),
        };
        Ok(StaticGenomeCatalog::new().with_genome(
            genome,
            sizes.iter().map(|(chr, len)| (chr.as_str(), *len)),
        ))
    }

    /// Opens the store with a headless viewer and terminal prompts.
    pub fn open_registry(&self) -> anyhow::Result<Registry> {
        let mut config = StoreConfig::from_env();
        if let Some(home) = &self.home {
            config = config.with_home(home.clone());
        }
        let collab = Collaborators::new(
            self.genomes()?,
            MemoryViewer::new(),
            DialoguerPrompt::new(self.yes),
        );
        Registry::open(config, collab).map_err(anyhow::Error::from)
    }
}

fn read_chrom_sizes(path: &PathBuf) -> anyhow::Result<Vec<(String, PosType)>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| {
            let mut fields = line.split_whitespace();
            let chr = fields
                .next()
                .ok_or_else(|| anyhow!("Empty line in {}", path.display()))?;
            let len = fields
                .next()
                .ok_or_else(|| anyhow!("No length for {chr} in {}", path.display()))?
                .parse::<PosType>()
                .with_context(|| format!("Bad length for {chr}"))?;
            Ok((chr.to_owned(), len))
        })
        .collect()
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RegionArgs {
    #[arg(help = "Chromosome")]
    pub chrom: String,
    #[arg(help = "Start (0-based, inclusive)")]
    pub start: PosType,
    #[arg(help = "End (exclusive)")]
    pub end:   PosType,
    #[arg(short, long, help = "Descriptive name")]
    pub name:  Option<String>,
}

impl RegionArgs {
    pub fn to_region(&self) -> Region {
        let region = Region::new(self.chrom.as_str(), self.start, self.end);
        match &self.name {
            Some(name) => region.with_name(name),
            None => region,
        }
    }
}
