mod datasets;
mod prompt;
mod regions;
mod transfer;
pub mod utils;
mod versions;

use clap::{
    Parser,
    Subcommand,
};
use datasets::{
    AddArgs,
    CategoryArgs,
    DeleteArgs,
    ListArgs,
    RenameArgs,
    SelectArgs,
};
use regions::RegionCommand;
use transfer::{
    ExportArgs,
    ExportBedArgs,
    ImportArgs,
};
use utils::UtilsArgs;
use versions::{
    LayerCommand,
    VersionCommand,
};
use wild::ArgsOs;

#[derive(Parser, Debug)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: MainMenu,
}

#[derive(Subcommand, Debug)]
enum MainMenu {
    /// List datasets
    List {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ListArgs,
    },
    /// Create a dataset, optionally seeded from a BED or VCF file
    Add {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  AddArgs,
    },
    Delete {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  DeleteArgs,
    },
    Rename {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  RenameArgs,
    },
    /// Make a dataset active
    Select {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  SelectArgs,
    },
    Category {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  CategoryArgs,
    },
    Version {
        #[clap(flatten)]
        utils:   UtilsArgs,
        #[command(subcommand)]
        command: VersionCommand,
    },
    Layer {
        #[clap(flatten)]
        utils:   UtilsArgs,
        #[command(subcommand)]
        command: LayerCommand,
    },
    /// Edit the active layer of the active dataset
    Region {
        #[clap(flatten)]
        utils:   UtilsArgs,
        #[command(subcommand)]
        command: RegionCommand,
    },
    /// Pack datasets into an archive
    Export {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ExportArgs,
    },
    /// Add the datasets of an archive
    Import {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ImportArgs,
    },
    #[command(name = "export-bed")]
    ExportBed {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ExportBedArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);

    match cli.command {
        MainMenu::List { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Add { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Delete { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Rename { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Select { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Category { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Version { utils, command } => {
            utils.setup()?;
            command.run(&utils)?;
        },
        MainMenu::Layer { utils, command } => {
            utils.setup()?;
            command.run(&utils)?;
        },
        MainMenu::Region { utils, command } => {
            utils.setup()?;
            command.run(&utils)?;
        },
        MainMenu::Export { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Import { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::ExportBed { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
    }
    Ok(())
}
