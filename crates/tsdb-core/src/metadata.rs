//! # Metadata Module
//!
//! Catalog entries: what is stored, measured by what, from where.

use crate::frequency::Frequency;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A named quantity type, e.g. `Q` / `STREAMFLOW`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurand {
    pub short_id: String,
    pub long_id: String,
    pub description: String,
}

/// A data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub short_id: String,
    pub description: String,
}

/// A registered timeseries identifier (usually a station id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeseriesRecord {
    pub identifier: String,
}

/// Key of one stored series: identifier, measurand, source, frequency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    pub identifier: String,
    pub measurand: String,
    pub source: String,
    pub freq: Frequency,
}

impl InstanceKey {
    pub fn new(
        identifier: impl Into<String>,
        freq: Frequency,
        measurand: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            measurand: measurand.into(),
            source: source.into(),
            freq,
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.identifier, self.measurand, self.source, self.freq
        )
    }
}

/// One stored series and the uuid naming its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeseriesInstance {
    pub uuid: Uuid,
    pub identifier: String,
    pub measurand: String,
    pub source: String,
    pub freq: Frequency,
    pub initial_metadata: String,
}

impl TimeseriesInstance {
    #[must_use]
    pub fn key(&self) -> InstanceKey {
        InstanceKey::new(
            self.identifier.clone(),
            self.freq,
            self.measurand.clone(),
            self.source.clone(),
        )
    }
}

/// Optional constraints when listing instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFilter {
    pub measurand: Option<String>,
    pub source: Option<String>,
    pub freq: Option<Frequency>,
}

impl InstanceFilter {
    #[must_use]
    pub fn measurand(mut self, measurand: impl Into<String>) -> Self {
        self.measurand = Some(measurand.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn freq(mut self, freq: Frequency) -> Self {
        self.freq = Some(freq);
        self
    }

    /// True when no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.measurand.is_none() && self.source.is_none() && self.freq.is_none()
    }

    #[must_use]
    pub fn matches(&self, instance: &TimeseriesInstance) -> bool {
        self.measurand
            .as_deref()
            .is_none_or(|m| m == instance.measurand)
            && self.source.as_deref().is_none_or(|s| s == instance.source)
            && self.freq.is_none_or(|f| f == instance.freq)
    }
}

/// Which of an instance's files to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Fixed-width data records.
    Data,
    /// Change log.
    Log,
}

impl FileKind {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Data => "tsdb",
            Self::Log => "log",
        }
    }
}
