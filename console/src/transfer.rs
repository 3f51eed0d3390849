use std::path::PathBuf;

use anyhow::anyhow;
use clap::Args;
use console::style;
use dialoguer::Confirm;

use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct ExportArgs {
    #[arg(short, long, required = true, help = "Archive to write")]
    output:   PathBuf,
    #[arg(required = true, help = "Datasets to export")]
    datasets: Vec<String>,
}

impl ExportArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        if self.output.exists() && !utils.yes {
            let confirmed = Confirm::new()
                .with_prompt(format!("Overwrite {}?", self.output.display()))
                .default(true)
                .interact()
                .unwrap_or(false);
            if !confirmed {
                println!("{}", style("Process aborted by the user.").red());
                return Err(anyhow!("User aborted the process."));
            }
        }
        let mut registry = utils.open_registry()?;
        let names = self.datasets.iter().map(String::as_str).collect::<Vec<_>>();
        let entries = registry.export_datasets(&names, &self.output)?;
        println!(
            "Wrote {} files to {}",
            style(entries.len()).green(),
            self.output.display()
        );
        registry.close()?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ImportArgs {
    #[arg(help = "Archive written by `export`")]
    archive: PathBuf,
}

impl ImportArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        if !self.archive.is_file() {
            eprintln!("Path {} is not a file.", style(self.archive.display()).red());
            return Err(anyhow!("Archive not found"));
        }
        let mut registry = utils.open_registry()?;
        let imported = registry.import_datasets(&self.archive)?;
        println!("Imported {}", style(imported.join(", ")).green());
        registry.close()?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ExportBedArgs {
    dataset: String,
    tag:     String,
    layer:   String,
    #[arg(help = "BED file to write")]
    output:  PathBuf,
}

impl ExportBedArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        let rows =
            registry.export_layer_bed(&self.dataset, &self.tag, &self.layer, &self.output)?;
        println!(
            "Wrote {} regions to {}",
            style(rows).green(),
            self.output.display()
        );
        registry.close()?;
        Ok(())
    }
}
