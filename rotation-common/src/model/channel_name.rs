//! Parsed channel names
//!
//! Grammar: `STATION.GROUP.CODE[/attribute...][/HASH]`, where `HASH` is 64 lowercase
//! hex characters and each attribute is a `,`-separated processing description
//! (`filter,<name>`, `masked`, `rotate` + `steer,backaz_<az>deg,phase_<phase>`, ...).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const COMPONENT_SEPARATOR: char = '/';
pub const CHANNEL_COMPONENT_SEPARATOR: char = '.';
pub const ATTRIBUTE_SEPARATOR: char = ',';
pub const TEMPORARY_CHANNEL_GROUP: &str = "temp";
pub const TEMPORARY_CHANNEL_CODE: &str = "---";
pub const ROTATION_CHANNEL_GROUP: &str = "rotation";

static BASE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+\.\w+\.[\w-]+").expect("static regex"));
static HASH_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/[a-f0-9]{64}").expect("static regex"));
static TRAILING_HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([a-f0-9]{64})$").expect("static regex"));
static ROTATION_ATTRIBUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/rotate/steer,backaz_(-?[0-9]+(?:\.[0-9]+)?)deg,phase_([^/]+)")
        .expect("static regex")
});

/// Derivation that produced a channel, read from the last processing attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelNameKind {
    Raw,
    Filtered,
    Masked,
    Beamed,
    Rotated,
    Fk,
    Temporary,
}

/// A channel name parsed once into its components
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName {
    raw: String,
    station: Option<String>,
    group: Option<String>,
    code: Option<String>,
    hash: Option<String>,
}

impl ChannelName {
    pub fn parse(name: &str) -> Self {
        let (station, group, code) = match BASE_CODE.find(name) {
            Some(m) => {
                let mut parts = m.as_str().split(CHANNEL_COMPONENT_SEPARATOR);
                (
                    parts.next().map(str::to_string),
                    parts.next().map(str::to_string),
                    parts.next().map(str::to_string),
                )
            }
            None => {
                tracing::warn!(channel = name, "Failed to parse channel name components");
                (None, None, None)
            }
        };
        let hash = TRAILING_HASH
            .captures(name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        Self {
            raw: name.to_string(),
            station,
            group,
            code,
            hash,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn station(&self) -> Option<&str> {
        self.station.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Trailing content hash, if the name has one
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// `STATION.GROUP.CODE`, without processing attributes or hash
    pub fn base_code(&self) -> Option<String> {
        match (&self.station, &self.group, &self.code) {
            (Some(s), Some(g), Some(c)) => Some(format!("{}.{}.{}", s, g, c)),
            _ => None,
        }
    }

    /// The name with its hash component removed
    pub fn stripped(&self) -> String {
        strip_hash(&self.raw)
    }

    /// Everything after the base code, without the hash and the leading `/`
    pub fn processing_attributes(&self) -> String {
        let stripped = self.stripped();
        let mut components = stripped.split(COMPONENT_SEPARATOR);
        components.next();
        components.collect::<Vec<_>>().join("/")
    }

    /// True when the name carries the rotation grammar anywhere in its attributes
    ///
    /// A filtered version of a rotated channel is still rotated.
    pub fn is_rotated(&self) -> bool {
        ROTATION_ATTRIBUTES.is_match(&self.raw)
    }

    /// Azimuth encoded in the rotation attributes
    pub fn rotation_azimuth(&self) -> Option<f64> {
        ROTATION_ATTRIBUTES
            .captures(&self.raw)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Phase encoded in the rotation attributes
    pub fn rotation_phase(&self) -> Option<&str> {
        ROTATION_ATTRIBUTES
            .captures(&self.raw)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str())
    }

    pub fn kind(&self) -> ChannelNameKind {
        if self.group.as_deref() == Some(TEMPORARY_CHANNEL_GROUP) {
            return ChannelNameKind::Temporary;
        }
        let attributes = self.processing_attributes();
        let components: Vec<&str> = attributes.split(COMPONENT_SEPARATOR).collect();
        let last = components.last().copied().unwrap_or_default();
        let previous = components
            .len()
            .checked_sub(2)
            .and_then(|i| components.get(i))
            .copied()
            .unwrap_or_default();

        if last.starts_with("filter,") {
            ChannelNameKind::Filtered
        } else if last == "masked" {
            ChannelNameKind::Masked
        } else if last.starts_with("steer,") && last.contains(",phase_") && previous == "rotate" {
            ChannelNameKind::Rotated
        } else if last.starts_with("steer,") && last.contains(",slow_") {
            ChannelNameKind::Beamed
        } else if previous == "fk" {
            ChannelNameKind::Fk
        } else {
            ChannelNameKind::Raw
        }
    }

    /// Same station, group and code; attributes and hash are ignored
    pub fn has_same_code(&self, other: &ChannelName) -> bool {
        match (self.base_code(), other.base_code()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for ChannelName {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

/// Remove the `/<64 hex>` hash component from a channel name
pub fn strip_hash(name: &str) -> String {
    HASH_COMPONENT.replace(name, "").into_owned()
}

/// Convenience predicate over an unparsed name
pub fn is_rotated_channel_name(name: &str) -> bool {
    ROTATION_ATTRIBUTES.is_match(name)
}

/// Compare `STATION.GROUP.CODE` of two unparsed names
pub fn channels_have_same_code(a: &str, b: &str) -> bool {
    ChannelName::parse(a).has_same_code(&ChannelName::parse(b))
}
