//! File formats read and written by the store.
//!
//! - [`layer_file`]: the canonical tab-delimited layer format.
//! - [`bed`] and [`vcf`]: importers for external interval files.
//! - [`catalog`]: persisted records and the JSON catalog.
//! - [`archive`]: flat ZIP packaging used for export and import.
//! - [`session`]: the subset of viewer session descriptors the store rewrites.

pub mod archive;
pub mod bed;
pub mod catalog;
pub mod layer_file;
pub mod session;
pub mod vcf;
