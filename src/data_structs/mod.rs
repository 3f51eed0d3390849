//! Core data types of the region store.
//!
//! - [`chrom`]: canonical chromosome labels and the total order used for every
//!   sort and comparison in the crate.
//! - [`Region`]: a single interval with its descriptive metadata.
//! - [`IntervalSet`]: the per-layer region collection and its overlap
//!   resolution (insert with split, clip, merge, collapse).
//! - [`Strand`] and the coordinate/annotation aliases in [`typedef`].

pub mod chrom;
mod enums;
mod interval_set;
mod region;
pub mod typedef;

#[cfg(test)]
mod tests;

pub use enums::Strand;
pub use interval_set::IntervalSet;
pub use region::{
    is_absent_marker,
    Region,
};
