use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::debug;

use super::encoder::{EncodeFn, FnEncoder, PacketEncoder};
use super::error::{EncodeError, RegistryError};
use super::version::{PacketVersion, VersionPolicy, WireFormat};
use crate::event::{DomainEvent, EventKind};

/// Index of an encoder inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncoderId(usize);

/// Where a (kind, version) pair ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub encoder: EncoderId,
    /// Registered version the request resolved to
    pub version: PacketVersion,
    /// Version that owns the encoder; differs from `version` for aliases
    pub canonical: PacketVersion,
}

impl Route {
    pub fn is_alias(&self) -> bool {
        self.version != self.canonical
    }
}

/// Versioned packet encoders for every event kind
///
/// Built once at startup through [`SchemaRegistryBuilder`] and immutable
/// afterwards. Aliased versions point at the same encoder instance, so their
/// output is byte-identical by construction.
pub struct SchemaRegistry {
    encoders: Vec<Arc<dyn PacketEncoder>>,
    versions: HashMap<EventKind, BTreeMap<PacketVersion, Route>>,
    policies: HashMap<EventKind, VersionPolicy>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Resolves the route a subscriber at `requested` gets for `kind`,
    /// applying the kind's version policy
    pub fn resolve(&self, kind: EventKind, requested: PacketVersion) -> Result<Route, EncodeError> {
        let unsupported = || EncodeError::UnsupportedVersion {
            kind,
            version: requested,
        };
        let versions = self.versions.get(&kind).ok_or_else(unsupported)?;

        if let Some(route) = versions.get(&requested) {
            return Ok(*route);
        }

        match self.policy(kind) {
            VersionPolicy::Reject => Err(unsupported()),
            VersionPolicy::NearestOlder => versions
                .range(..=requested)
                .next_back()
                .map(|(_, route)| *route)
                .ok_or_else(unsupported),
        }
    }

    /// Encodes `event` for a subscriber at `version` in `format`
    pub fn encode(
        &self,
        event: &DomainEvent,
        version: PacketVersion,
        format: WireFormat,
    ) -> Result<Bytes, EncodeError> {
        let route = self.resolve(event.kind(), version)?;
        self.encode_route(&route, event, format)
    }

    /// Encodes through an already resolved route
    pub fn encode_route(
        &self,
        route: &Route,
        event: &DomainEvent,
        format: WireFormat,
    ) -> Result<Bytes, EncodeError> {
        let encoder = self
            .encoders
            .get(route.encoder.0)
            .ok_or(EncodeError::UnknownEncoder {
                kind: event.kind(),
                version: route.version,
            })?;
        debug!(
            kind = %event.kind(),
            version = %route.version,
            encoder = encoder.name(),
            format = %format,
            "Encoding event"
        );
        encoder.encode(event, format)
    }

    pub fn policy(&self, kind: EventKind) -> VersionPolicy {
        self.policies.get(&kind).copied().unwrap_or_default()
    }

    /// Registered versions of `kind`, oldest first
    pub fn versions(&self, kind: EventKind) -> Vec<PacketVersion> {
        self.versions
            .get(&kind)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, kind: EventKind) -> Option<PacketVersion> {
        self.versions
            .get(&kind)
            .and_then(|versions| versions.keys().next_back().copied())
    }

    pub fn is_alias(&self, kind: EventKind, version: PacketVersion) -> bool {
        self.versions
            .get(&kind)
            .and_then(|versions| versions.get(&version))
            .is_some_and(Route::is_alias)
    }

    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }
}

/// Append-only registration of encoders and aliases
#[derive(Default)]
pub struct SchemaRegistryBuilder {
    encoders: Vec<Arc<dyn PacketEncoder>>,
    versions: HashMap<EventKind, BTreeMap<PacketVersion, Route>>,
    policies: HashMap<EventKind, VersionPolicy>,
}

impl SchemaRegistryBuilder {
    /// Registers `encoder` as the canonical encoder of `kind` at `version`
    pub fn register(
        mut self,
        kind: EventKind,
        version: PacketVersion,
        encoder: impl PacketEncoder + 'static,
    ) -> Result<Self, RegistryError> {
        let versions = self.versions.entry(kind).or_default();
        if versions.contains_key(&version) {
            return Err(RegistryError::DuplicateVersion { kind, version });
        }

        let id = EncoderId(self.encoders.len());
        self.encoders.push(Arc::new(encoder));
        versions.insert(
            version,
            Route {
                encoder: id,
                version,
                canonical: version,
            },
        );
        Ok(self)
    }

    pub fn register_fn(
        self,
        kind: EventKind,
        version: PacketVersion,
        name: &'static str,
        encode: EncodeFn,
    ) -> Result<Self, RegistryError> {
        self.register(kind, version, FnEncoder::new(name, encode))
    }

    /// Declares `version` of `kind` as wire-identical to `canonical`
    ///
    /// Aliasing an alias resolves to the original canonical version.
    pub fn alias(
        mut self,
        kind: EventKind,
        version: PacketVersion,
        canonical: PacketVersion,
    ) -> Result<Self, RegistryError> {
        let versions = self.versions.entry(kind).or_default();
        if versions.contains_key(&version) {
            return Err(RegistryError::DuplicateVersion { kind, version });
        }

        let target = versions
            .get(&canonical)
            .copied()
            .ok_or(RegistryError::UnknownCanonical {
                kind,
                version,
                canonical,
            })?;

        versions.insert(
            version,
            Route {
                encoder: target.encoder,
                version,
                canonical: target.canonical,
            },
        );
        Ok(self)
    }

    pub fn policy(mut self, kind: EventKind, policy: VersionPolicy) -> Self {
        self.policies.insert(kind, policy);
        self
    }

    /// Freezes the registry; every event kind must have at least one version
    pub fn build(self) -> Result<SchemaRegistry, RegistryError> {
        if let Some(kind) = EventKind::iter().find(|kind| {
            self.versions
                .get(kind)
                .map_or(true, |versions| versions.is_empty())
        }) {
            return Err(RegistryError::MissingKind(kind));
        }

        Ok(SchemaRegistry {
            encoders: self.encoders,
            versions: self.versions,
            policies: self.policies,
        })
    }
}
