use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Wire-schema revision a subscriber negotiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketVersion(u16);

impl PacketVersion {
    pub const V0: PacketVersion = PacketVersion(0);
    pub const V1: PacketVersion = PacketVersion(1);

    pub const fn new(version: u16) -> Self {
        Self(version)
    }

    pub fn number(self) -> u16 {
        self.0
    }
}

impl fmt::Display for PacketVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for PacketVersion {
    type Err = std::num::ParseIntError;

    /// Accepts both `1` and `v1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('V'))
            .unwrap_or(s);
        digits.parse().map(Self)
    }
}

/// Serialization a subscriber negotiated. Both are map-based.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum WireFormat {
    #[default]
    #[serde(rename = "json")]
    #[strum(serialize = "json")]
    Json,
    #[serde(rename = "msgpack")]
    #[strum(serialize = "msgpack")]
    MessagePack,
}

/// How the registry treats a subscriber asking for a version the event kind
/// never registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionPolicy {
    /// Unknown (kind, version) pairs are `UnsupportedVersion`
    #[default]
    Reject,
    /// Fall back to the newest registered version not newer than the
    /// requested one
    NearestOlder,
}
