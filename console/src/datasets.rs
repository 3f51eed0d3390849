use std::path::PathBuf;

use clap::Args;
use console::style;
use roistore::prelude::*;

use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct ListArgs {
    #[arg(short, long, help = "Group datasets by category")]
    by_category: bool,
}

impl ListArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let registry = utils.open_registry()?;
        let active = registry.active_dataset_name().map(str::to_owned);
        let print = |name: &str, indent: &str| {
            let marker = if active.as_deref() == Some(name) { "*" } else { " " };
            let versions = registry
                .dataset(name)
                .map(|d| d.version_tags().join(", "))
                .unwrap_or_default();
            println!("{indent}{marker} {} [{}]", style(name).green(), versions);
        };

        if self.by_category {
            for (category, names) in registry.categories() {
                let title = if category.is_empty() {
                    "(uncategorized)".to_owned()
                }
                else {
                    category
                };
                println!("{}", style(title).bold());
                for name in names {
                    print(name, "  ");
                }
            }
        }
        else {
            for name in registry.dataset_names() {
                print(name, "");
            }
        }
        registry.close()?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct AddArgs {
    #[arg(help = "Dataset name")]
    name:     String,
    #[arg(help = "BED or VCF file seeding the default layer")]
    source:   Option<PathBuf>,
    #[arg(short, long, help = "Category")]
    category: Option<String>,
}

impl AddArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        let outcome = registry.add_dataset(
            &self.name,
            self.source.as_deref(),
            self.category.as_deref(),
        )?;
        match outcome {
            Some(ImportOutcome::Complete(rows)) => {
                println!(
                    "Created {} with {} rows",
                    style(&self.name).green(),
                    style(rows).green()
                )
            },
            Some(ImportOutcome::Truncated(rows)) => {
                println!(
                    "Created {} with the first {} rows only",
                    style(&self.name).green(),
                    style(rows).red()
                )
            },
            None => println!("Created empty dataset {}", style(&self.name).green()),
        }
        registry.close()?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DeleteArgs {
    #[arg(required = true, help = "Dataset names")]
    names: Vec<String>,
}

impl DeleteArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        for name in &self.names {
            registry.delete_dataset(name)?;
            println!("Deleted {}", style(name).red());
        }
        registry.close()?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RenameArgs {
    old: String,
    new: String,
}

impl RenameArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        registry.rename_dataset(&self.old, &self.new)?;
        registry.close()?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct SelectArgs {
    name: String,
}

impl SelectArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        let shown = registry.select_dataset(&self.name)?;
        println!(
            "Active dataset {} ({} regions)",
            style(&self.name).green(),
            shown
        );
        registry.close()?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CategoryArgs {
    name:     String,
    #[arg(help = "New category; omit to clear it")]
    category: Option<String>,
}

impl CategoryArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        registry.set_category(&self.name, self.category.as_deref())?;
        registry.close()?;
        Ok(())
    }
}
