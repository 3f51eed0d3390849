use std::fmt::Display;
use std::str::FromStr;

use crate::error::StoreError;

/// Strand of a region. An absent strand is modelled as `Option::<Strand>::None`.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum Strand {
    /// Forward strand (`+`).
    Forward,
    /// Reverse strand (`-`).
    Reverse,
    /// Explicitly unstranded (`0`).
    Unstranded,
}

impl Strand {
    /// Parses a strand field, returning `None` for the absent marker `.` and
    /// for empty fields.
    pub fn parse_field(s: &str) -> Result<Option<Strand>, StoreError> {
        match s.trim() {
            "" | "." => Ok(None),
            other => other.parse().map(Some),
        }
    }

    /// Renders an optional strand as a file field.
    pub fn to_field(strand: Option<Strand>) -> char {
        strand.map(char::from).unwrap_or('.')
    }
}

impl FromStr for Strand {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "0" => Ok(Strand::Unstranded),
            other => Err(StoreError::malformed(format!("invalid strand '{other}'"))),
        }
    }
}

impl From<Strand> for char {
    fn from(value: Strand) -> Self {
        match value {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unstranded => '0',
        }
    }
}

impl From<bio_types::strand::Strand> for Strand {
    fn from(value: bio_types::strand::Strand) -> Self {
        match value {
            bio_types::strand::Strand::Forward => Strand::Forward,
            bio_types::strand::Strand::Reverse => Strand::Reverse,
            bio_types::strand::Strand::Unknown => Strand::Unstranded,
        }
    }
}

impl Display for Strand {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}
