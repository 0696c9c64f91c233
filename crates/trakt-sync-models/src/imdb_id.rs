use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::InputError;

/// IMDb title identifier (`tt0133093`), the join key between IMDb and Trakt.
///
/// Only constructed through [`ImdbId::parse`], so every value in the system
/// carries the `tt` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImdbId(String);

impl ImdbId {
    /// Validate and normalize a raw identifier.
    ///
    /// Surrounding whitespace and `/` characters are removed first (Trakt
    /// sometimes returns ids with slashes).
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != '/').collect();
        if cleaned.len() <= 2 || !cleaned.starts_with("tt") {
            return Err(InputError::InvalidImdbId(raw.to_string()));
        }
        Ok(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ImdbId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ImdbId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ImdbId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
