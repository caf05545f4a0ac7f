use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: u64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// The closed set of deployable protocol components.
///
/// Component names are validated here, at the ledger's serde edge; step
/// logic never looks components up by free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    AddressProvider,
    Pool,
    PoolConfigurator,
    Oracle,
    Collector,
    RewardsController,
    Gateway,
    Strategies,
    Libraries,
}

impl Component {
    pub fn all() -> &'static [Component] {
        &[
            Component::AddressProvider,
            Component::Pool,
            Component::PoolConfigurator,
            Component::Oracle,
            Component::Collector,
            Component::RewardsController,
            Component::Gateway,
            Component::Strategies,
            Component::Libraries,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Component::AddressProvider => "address_provider",
            Component::Pool => "pool",
            Component::PoolConfigurator => "pool_configurator",
            Component::Oracle => "oracle",
            Component::Collector => "collector",
            Component::RewardsController => "rewards_controller",
            Component::Gateway => "gateway",
            Component::Strategies => "strategies",
            Component::Libraries => "libraries",
        }
    }

    /// Components recorded as a list of addresses rather than a single one.
    pub fn is_many(self) -> bool {
        matches!(self, Component::Strategies | Component::Libraries)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Component {
    type Err = crate::error::RolloutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address_provider" => Ok(Component::AddressProvider),
            "pool" => Ok(Component::Pool),
            "pool_configurator" => Ok(Component::PoolConfigurator),
            "oracle" => Ok(Component::Oracle),
            "collector" => Ok(Component::Collector),
            "rewards_controller" => Ok(Component::RewardsController),
            "gateway" => Ok(Component::Gateway),
            "strategies" => Ok(Component::Strategies),
            "libraries" => Ok(Component::Libraries),
            _ => Err(crate::error::RolloutError::UnknownComponent(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentValue
// ---------------------------------------------------------------------------

/// A recorded deployment: most components are a single address, a few
/// (libraries, interest strategies) are an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentValue {
    One(Address),
    Many(Vec<Address>),
}

impl ComponentValue {
    pub fn as_one(&self) -> Option<Address> {
        match self {
            ComponentValue::One(a) => Some(*a),
            ComponentValue::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Address]> {
        match self {
            ComponentValue::One(_) => None,
            ComponentValue::Many(v) => Some(v),
        }
    }
}

impl From<Address> for ComponentValue {
    fn from(a: Address) -> Self {
        ComponentValue::One(a)
    }
}

impl From<Vec<Address>> for ComponentValue {
    fn from(v: Vec<Address>) -> Self {
        ComponentValue::Many(v)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
