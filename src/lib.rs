//! # roistore
//!
//! `roistore` keeps user-curated genomic regions of interest as versioned,
//! named datasets. Each dataset holds one or more versions, each version one
//! or more named layers, and each layer a set of non-overlapping regions
//! backed by a flat tab-delimited file.
//!
//! ## Key Features
//!
//! * **Overlap resolution**: [`IntervalSet`] keeps every layer free of
//!   overlaps on insert, clip and merge, splitting or trimming existing
//!   regions as needed.
//! * **Canonical chromosome order**: `1..22, M, X, Y`, then other contigs
//!   alphabetically, used for every sort and comparison.
//! * **Lifecycle**: datasets, versions and layers are created, copied,
//!   renamed and deleted together with their files.
//! * **Import/export**: BED and VCF import into layers, plain BED export,
//!   and flat ZIP archives that move datasets between installations with
//!   their viewer session descriptors re-rooted.
//!
//! The store home, import row limit and autosave can be configured with the
//! `ROISTORE_HOME`, `ROISTORE_IMPORT_LIMIT` and `ROISTORE_AUTOSAVE`
//! environment variables (see [`StoreConfig`]).
//!
//! ## Structure
//!
//! * [`data_structs`]: chromosome order, [`Region`] and [`IntervalSet`].
//! * [`io`]: layer, BED and VCF formats, the JSON catalog, archives and
//!   session descriptors.
//! * [`store`]: [`Layer`], [`Version`], [`Dataset`], [`Registry`] and the
//!   collaborator traits they talk to.
//! * [`config`] and [`error`]: configuration and the shared error type.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use roistore::prelude::*;
//!
//! fn main() -> roistore::error::Result<()> {
//!     let config = StoreConfig::from_env();
//!     let mut registry = Registry::open(config, Collaborators::default())?;
//!
//!     registry.add_dataset("peaks", Some(Path::new("peaks.bed")), None)?;
//!     registry.insert_region(Region::new("chr1", 100, 200).with_name("edited"))?;
//!     for region in registry.active_regions()? {
//!         println!("{region}");
//!     }
//!     registry.close()
//! }
//! ```

pub mod config;
pub mod data_structs;
pub mod error;
pub mod io;
pub mod prelude;
pub mod store;
pub mod utils;

#[allow(unused_imports)]
use prelude::*;
