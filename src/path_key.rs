//! Six-part record identifiers.
//!
//! Records are addressed by a slash-delimited path `/A/B/C/D/E/F/`:
//! watershed, location, parameter, time block, interval and version.
//! The time block (D) splits one logical series into per-period blocks,
//! so deduplication and filenames work on the reduced key with D cleared.

use crate::constants::{FILENAME_PART_SEPARATOR, FILENAME_SUBSTITUTIONS, OUTPUT_EXTENSION};
use crate::error::{ExportError, Result};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const PART_COUNT: usize = 6;

/// Hierarchical identifier of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey {
    /// A part
    pub watershed: String,
    /// B part
    pub location: String,
    /// C part
    pub parameter: String,
    /// D part, the block start date for stored blocks
    pub block: String,
    /// E part
    pub interval: String,
    /// F part
    pub version: String,
}

impl PathKey {
    /// Build a key from its six parts. Always succeeds.
    pub fn build(
        watershed: impl Into<String>,
        location: impl Into<String>,
        parameter: impl Into<String>,
        block: impl Into<String>,
        interval: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            watershed: watershed.into(),
            location: location.into(),
            parameter: parameter.into(),
            block: block.into(),
            interval: interval.into(),
            version: version.into(),
        }
    }

    /// Parse a slash-delimited key, stripping one leading and one trailing slash
    pub fn parse(raw: &str) -> Result<Self> {
        let inner = raw.strip_prefix('/').unwrap_or(raw);
        let inner = inner.strip_suffix('/').unwrap_or(inner);

        let parts: Vec<&str> = inner.split('/').collect();
        if parts.len() != PART_COUNT {
            return Err(ExportError::MalformedKey {
                raw: raw.to_string(),
                found: parts.len(),
            });
        }

        Ok(Self::build(
            parts[0], parts[1], parts[2], parts[3], parts[4], parts[5],
        ))
    }

    /// Copy of this key with the time block cleared
    pub fn reduced(&self) -> Self {
        Self {
            block: String::new(),
            ..self.clone()
        }
    }

    pub fn is_reduced(&self) -> bool {
        self.block.is_empty()
    }

    /// CSV filename derived from the A, C and F parts: `A%C%F.csv`
    ///
    /// Distinct B, D or E parts map to the same name; the later export
    /// overwrites the earlier one.
    pub fn to_filename(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}.{}",
            clean_part(&self.watershed),
            clean_part(&self.parameter),
            clean_part(&self.version),
            OUTPUT_EXTENSION,
            sep = FILENAME_PART_SEPARATOR,
        )
    }
}

fn clean_part(part: &str) -> String {
    part.chars()
        .map(|c| {
            FILENAME_SUBSTITUTIONS
                .iter()
                .find(|(reserved, _)| *reserved == c)
                .map_or(c, |(_, replacement)| *replacement)
        })
        .collect()
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{}/{}/{}/{}/{}/",
            self.watershed, self.location, self.parameter, self.block, self.interval, self.version
        )
    }
}

impl FromStr for PathKey {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parse raw catalog entries and keep the first key for each reduced identity.
///
/// Order of first appearance is preserved. A malformed entry fails the whole
/// call.
pub fn unique_reduced_keys<I, S>(raw_keys: I) -> Result<Vec<PathKey>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for raw in raw_keys {
        let reduced = PathKey::parse(raw.as_ref())?.reduced();
        if seen.insert(reduced.clone()) {
            unique.push(reduced);
        }
    }

    Ok(unique)
}
