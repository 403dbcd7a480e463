// crates/zigbee-rs/src/zcl/mod.rs
//! The cluster/attribute model of the Zigbee Cluster Library.
//!
//! Only identifiers, data types and values are modelled here; what an
//! attribute means is left to higher layers.

pub mod frame;
pub mod ids;
pub mod reporting;
pub mod value;

pub use reporting::{ReportConfigurationRecord, ReportingDirection};
pub use value::{AttributeValue, DataType};

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

/// Direction of a cluster on an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClusterDirection {
    /// Server cluster, holds the attributes.
    Input,
    /// Client cluster.
    Output,
}

/// Status of the last read or report of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeStatus {
    #[default]
    Success,
    UnsupportedAttribute,
    NotFound,
    /// The payload could not be decoded for its data type. Local marker,
    /// never sent on the wire.
    DecodeError,
    Other(u8),
}

impl AttributeStatus {
    pub const CODE_SUCCESS: u8 = 0x00;
    pub const CODE_UNSUPPORTED_ATTRIBUTE: u8 = 0x86;
    pub const CODE_NOT_FOUND: u8 = 0x8B;
}

impl From<u8> for AttributeStatus {
    fn from(value: u8) -> Self {
        match value {
            Self::CODE_SUCCESS => Self::Success,
            Self::CODE_UNSUPPORTED_ATTRIBUTE => Self::UnsupportedAttribute,
            Self::CODE_NOT_FOUND => Self::NotFound,
            other => Self::Other(other),
        }
    }
}

/// One attribute as cached for a cluster.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    pub id: u16,
    pub data_type: DataType,
    pub value: AttributeValue,
    pub status: AttributeStatus,
}

/// An unsolicited or polled attribute value as delivered by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeReport {
    pub source_address: u16,
    pub endpoint: u8,
    pub cluster_id: u16,
    pub attribute_id: u16,
    pub status: u8,
    /// Raw ZCL data type id; may be unknown.
    pub data_type: u8,
    pub data: Vec<u8>,
}

/// A cluster on an endpoint, identified by `(id, direction)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    pub id: u16,
    pub direction: ClusterDirection,
    attributes: BTreeMap<u16, Attribute>,
    /// Attribute ids the device reported as existing.
    supported_attributes: BTreeSet<u16>,
    command_ids: BTreeSet<u8>,
}

impl Cluster {
    pub fn new(id: u16, direction: ClusterDirection) -> Self {
        Self {
            id,
            direction,
            attributes: BTreeMap::new(),
            supported_attributes: BTreeSet::new(),
            command_ids: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        ids::cluster::name(self.id)
    }

    pub fn attribute(&self, attribute_id: u16) -> Option<&Attribute> {
        self.attributes.get(&attribute_id)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn has_attribute(&self, attribute_id: u16) -> bool {
        self.attributes.contains_key(&attribute_id)
            || self.supported_attributes.contains(&attribute_id)
    }

    /// Stores an attribute. Returns false when the identical attribute was
    /// already cached.
    pub fn set_attribute(&mut self, attribute: Attribute) -> bool {
        self.supported_attributes.insert(attribute.id);
        if self.attributes.get(&attribute.id) == Some(&attribute) {
            return false;
        }
        self.attributes.insert(attribute.id, attribute);
        true
    }

    pub fn add_supported_attributes(&mut self, attribute_ids: &[u16]) {
        self.supported_attributes.extend(attribute_ids.iter().copied());
    }

    pub fn supported_attributes(&self) -> impl Iterator<Item = u16> + '_ {
        self.supported_attributes.iter().copied()
    }

    pub fn add_command_ids(&mut self, command_ids: &[u8]) {
        self.command_ids.extend(command_ids.iter().copied());
    }

    pub fn command_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.command_ids.iter().copied()
    }
}
