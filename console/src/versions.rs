use clap::Subcommand;
use console::style;
use roistore::prelude::*;

use crate::utils::UtilsArgs;

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum VersionCommand {
    /// List the versions of a dataset
    List { dataset: String },
    /// Add a version, optionally copying an existing one
    Add {
        dataset:   String,
        #[arg(help = "Tag; defaults to the latest tag incremented")]
        tag:       Option<String>,
        #[arg(short, long, help = "Version to copy")]
        copy_from: Option<String>,
    },
    Select {
        dataset: String,
        tag:     String,
    },
    Rename {
        dataset: String,
        old:     String,
        new:     String,
    },
    Delete {
        dataset: String,
        tag:     String,
    },
    /// Set the author and description of a version
    Info {
        dataset:     String,
        tag:         String,
        #[arg(short, long)]
        author:      Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
}

impl VersionCommand {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        match self {
            VersionCommand::List { dataset } => {
                let Some(dataset) = registry.dataset(dataset)
                else {
                    return Err(StoreError::not_found(format!("dataset '{dataset}'")).into());
                };
                for version in dataset.versions() {
                    let marker = if version.tag() == dataset.active_version_tag() {
                        "*"
                    }
                    else {
                        " "
                    };
                    println!(
                        "{marker} {} layers: {} {}",
                        style(version.tag()).green(),
                        version.layer_names().join(", "),
                        style(version.description().unwrap_or_default()).dim()
                    );
                }
            },
            VersionCommand::Add {
                dataset,
                tag,
                copy_from,
            } => {
                let tag = registry.add_version(dataset, tag.as_deref(), copy_from.as_deref())?;
                println!("Added version {}", style(tag).green());
            },
            VersionCommand::Select { dataset, tag } => registry.select_version(dataset, tag)?,
            VersionCommand::Rename { dataset, old, new } => {
                registry.rename_version(dataset, old, new)?
            },
            VersionCommand::Delete { dataset, tag } => {
                if registry.delete_version(dataset, tag)? {
                    println!(
                        "Dataset {} had no versions left and was removed",
                        style(dataset).red()
                    );
                }
            },
            VersionCommand::Info {
                dataset,
                tag,
                author,
                description,
            } => registry.set_version_info(dataset, tag, author.as_deref(), description.as_deref())?,
        }
        registry.close()?;
        Ok(())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum LayerCommand {
    /// List the layers of a version
    List { dataset: String, tag: String },
    /// Add an empty layer and make it active
    Add {
        dataset: String,
        tag:     String,
        name:    String,
        #[arg(short, long, value_delimiter = ',', help = "Annotation columns")]
        keys:    Vec<String>,
    },
    Select {
        dataset: String,
        tag:     String,
        name:    String,
    },
    Rename {
        dataset: String,
        tag:     String,
        old:     String,
        new:     String,
    },
    Delete {
        dataset: String,
        tag:     String,
        name:    String,
    },
}

impl LayerCommand {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let mut registry = utils.open_registry()?;
        match self {
            LayerCommand::List { dataset, tag } => {
                let version = registry
                    .dataset(dataset)
                    .and_then(|d| d.version(tag))
                    .ok_or_else(|| {
                        StoreError::not_found(format!("version '{tag}' of dataset '{dataset}'"))
                    })?;
                for layer in version.layers() {
                    let marker = if layer.name() == version.active_layer_name() {
                        "*"
                    }
                    else {
                        " "
                    };
                    println!(
                        "{marker} {} ({} bytes) {}",
                        style(layer.name()).green(),
                        layer.file_size(),
                        layer.annotation_keys().join(",")
                    );
                }
            },
            LayerCommand::Add {
                dataset,
                tag,
                name,
                keys,
            } => registry.add_layer(dataset, tag, name, keys.clone())?,
            LayerCommand::Select { dataset, tag, name } => {
                registry.select_layer(dataset, tag, name)?
            },
            LayerCommand::Rename {
                dataset,
                tag,
                old,
                new,
            } => registry.rename_layer(dataset, tag, old, new)?,
            LayerCommand::Delete { dataset, tag, name } => {
                registry.del_layer(dataset, tag, name)?
            },
        }
        registry.close()?;
        Ok(())
    }
}
