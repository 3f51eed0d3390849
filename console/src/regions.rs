use clap::Subcommand;
use console::style;

use crate::utils::{
    RegionArgs,
    UtilsArgs,
};

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum RegionCommand {
    /// Print the regions of the active layer
    Show,
    /// Insert a region, trimming or splitting what it overlaps
    Insert(RegionArgs),
    /// Cut a range out of every region
    Clip(RegionArgs),
    /// Join every region overlapping a range
    Merge(RegionArgs),
}

impl RegionCommand {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        match self {
            RegionCommand::Show => {
                for region in registry.active_regions()? {
                    println!(
                        "{}\t{}\t{}",
                        style(format!("{}:", region.chrom())).blue(),
                        style(format!("{}-{}", region.start(), region.end())).green(),
                        region.display_name().unwrap_or_default()
                    );
                }
            },
            RegionCommand::Insert(args) => registry.insert_region(args.to_region())?,
            RegionCommand::Clip(args) => registry.clip_region(args.to_region())?,
            RegionCommand::Merge(args) => {
                match registry.merge_region(args.to_region())? {
                    Some(merged) => println!("Merged into {}", style(merged).green()),
                    None => println!("{}", style("Nothing overlaps that range").red()),
                }
            },
        }
        registry.close()?;
        Ok(())
    }
}
