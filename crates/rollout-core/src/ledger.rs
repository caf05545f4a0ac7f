use crate::error::{Result, RolloutError};
use crate::types::{Component, ComponentValue, Network};
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ReleaseEntry
// ---------------------------------------------------------------------------

/// One versioned snapshot of deployed component addresses and configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub network: Network,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub components: BTreeMap<Component, ComponentValue>,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

impl ReleaseEntry {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            last_updated: Utc::now(),
            components: BTreeMap::new(),
            config: BTreeMap::new(),
        }
    }

    pub fn component(&self, c: Component) -> Option<&ComponentValue> {
        self.components.get(&c)
    }

    pub fn has_component(&self, c: Component) -> bool {
        self.components.contains_key(&c)
    }

    pub fn set_component(&mut self, c: Component, value: impl Into<ComponentValue>) {
        self.components.insert(c, value.into());
        self.last_updated = Utc::now();
    }

    pub fn config_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.config.get(key)
    }

    pub fn set_config(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.config.insert(key.into(), value);
        self.last_updated = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// VersionLedger
// ---------------------------------------------------------------------------

/// The persisted record of every release: a JSON document keyed by release
/// tag, insertion-ordered and append-only. Order is part of the contract
/// (the newest tag is the clone source for the next release), so the map is
/// kept as a vector with hand-written map (de)serialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VersionLedger {
    releases: Vec<(String, ReleaseEntry)>,
}

impl VersionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RolloutError::LedgerNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| RolloutError::LedgerCorrupt(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut data = serde_json::to_string_pretty(self)?;
        data.push('\n');
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.releases.iter().map(|(tag, _)| tag.as_str())
    }

    pub fn entry(&self, tag: &str) -> Option<&ReleaseEntry> {
        self.releases
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, e)| e)
    }

    pub fn entry_mut(&mut self, tag: &str) -> Option<&mut ReleaseEntry> {
        self.releases
            .iter_mut()
            .find(|(t, _)| t == tag)
            .map(|(_, e)| e)
    }

    /// The most recently appended release, if any.
    pub fn latest(&self) -> Option<(&str, &ReleaseEntry)> {
        self.releases.last().map(|(t, e)| (t.as_str(), e))
    }

    pub fn insert(&mut self, tag: impl Into<String>, entry: ReleaseEntry) {
        let tag = tag.into();
        match self.entry_mut(&tag) {
            Some(existing) => *existing = entry,
            None => self.releases.push((tag, entry)),
        }
    }

    /// Start working on `new_tag`, seeding it from `prior_tag`.
    ///
    /// Re-running a release in place (`new_tag == prior_tag`) is a supported,
    /// common case: the working entry already is the prior entry, so this is
    /// a no-op merge, since a run that changes nothing must leave the persisted
    /// ledger byte-for-byte unchanged. If `new_tag` exists from an earlier
    /// partial run, keys it is missing are filled from the prior entry and
    /// nothing already recorded is overwritten.
    pub fn begin_release(&mut self, prior_tag: &str, new_tag: &str) -> Result<()> {
        let prior = self
            .entry(prior_tag)
            .ok_or_else(|| RolloutError::ReleaseNotFound(prior_tag.to_string()))?
            .clone();

        if new_tag == prior_tag {
            return Ok(());
        }

        match self.entry_mut(new_tag) {
            Some(existing) => {
                for (c, v) in prior.components {
                    existing.components.entry(c).or_insert(v);
                }
                for (k, v) in prior.config {
                    existing.config.entry(k).or_insert(v);
                }
                existing.last_updated = Utc::now();
            }
            None => {
                self.releases.push((
                    new_tag.to_string(),
                    ReleaseEntry {
                        network: prior.network,
                        last_updated: Utc::now(),
                        components: prior.components,
                        config: prior.config,
                    },
                ));
            }
        }
        Ok(())
    }
}

impl Serialize for VersionLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.releases.len()))?;
        for (tag, entry) in &self.releases {
            map.serialize_entry(tag, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VersionLedger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LedgerVisitor;

        impl<'de> Visitor<'de> for LedgerVisitor {
            type Value = VersionLedger;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of release tag to release entry")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut releases: Vec<(String, ReleaseEntry)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((tag, entry)) = access.next_entry::<String, ReleaseEntry>()? {
                    if releases.iter().any(|(t, _)| *t == tag) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate release tag '{tag}'"
                        )));
                    }
                    releases.push((tag, entry));
                }
                Ok(VersionLedger { releases })
            }
        }

        deserializer.deserialize_map(LedgerVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
