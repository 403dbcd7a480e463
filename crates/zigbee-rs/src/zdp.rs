// crates/zigbee-rs/src/zdp.rs
//! Zigbee Device Profile (ZDP) descriptors.
//!
//! These are the standard over-the-air layouts (little endian) returned by
//! node, simple and power descriptor requests. They are the same for every
//! bridge firmware, so back-ends parse them with the helpers in this module.

use crate::hal::ZigbeeError;
use crate::types::MacCapabilities;
use alloc::vec::Vec;

/// Length of an encoded node descriptor.
pub const NODE_DESCRIPTOR_LEN: usize = 13;

/// The logical role of a device in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogicalType {
    Coordinator,
    Router,
    EndDevice,
    Reserved(u8),
}

impl From<u8> for LogicalType {
    fn from(value: u8) -> Self {
        match value & 0x07 {
            0 => Self::Coordinator,
            1 => Self::Router,
            2 => Self::EndDevice,
            other => Self::Reserved(other),
        }
    }
}

impl From<LogicalType> for u8 {
    fn from(value: LogicalType) -> Self {
        match value {
            LogicalType::Coordinator => 0,
            LogicalType::Router => 1,
            LogicalType::EndDevice => 2,
            LogicalType::Reserved(v) => v & 0x07,
        }
    }
}

/// The node descriptor of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeDescriptor {
    pub logical_type: LogicalType,
    pub complex_descriptor_available: bool,
    pub user_descriptor_available: bool,
    /// Frequency band bits (bit 3 of the field = 2.4 GHz).
    pub frequency_band: u8,
    pub mac_capabilities: MacCapabilities,
    pub manufacturer_code: u16,
    pub maximum_buffer_size: u8,
    pub maximum_rx_size: u16,
    pub server_mask: u16,
    pub maximum_tx_size: u16,
    pub descriptor_capabilities: u8,
}

impl NodeDescriptor {
    pub fn from_bytes(data: &[u8]) -> Result<Self, ZigbeeError> {
        if data.len() < NODE_DESCRIPTOR_LEN {
            return Err(ZigbeeError::BufferTooShort);
        }
        Ok(Self {
            logical_type: LogicalType::from(data[0]),
            complex_descriptor_available: data[0] & 0x08 != 0,
            user_descriptor_available: data[0] & 0x10 != 0,
            frequency_band: data[1] >> 3,
            mac_capabilities: MacCapabilities::from_bits_truncate(data[2]),
            manufacturer_code: u16::from_le_bytes(data[3..5].try_into()?),
            maximum_buffer_size: data[5],
            maximum_rx_size: u16::from_le_bytes(data[6..8].try_into()?),
            server_mask: u16::from_le_bytes(data[8..10].try_into()?),
            maximum_tx_size: u16::from_le_bytes(data[10..12].try_into()?),
            descriptor_capabilities: data[12],
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NODE_DESCRIPTOR_LEN);
        let mut flags = u8::from(self.logical_type);
        if self.complex_descriptor_available {
            flags |= 0x08;
        }
        if self.user_descriptor_available {
            flags |= 0x10;
        }
        out.push(flags);
        out.push(self.frequency_band << 3);
        out.push(self.mac_capabilities.bits());
        out.extend_from_slice(&self.manufacturer_code.to_le_bytes());
        out.push(self.maximum_buffer_size);
        out.extend_from_slice(&self.maximum_rx_size.to_le_bytes());
        out.extend_from_slice(&self.server_mask.to_le_bytes());
        out.extend_from_slice(&self.maximum_tx_size.to_le_bytes());
        out.push(self.descriptor_capabilities);
        out
    }
}

/// The simple descriptor of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimpleDescriptor {
    pub endpoint: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
    pub input_clusters: Vec<u16>,
    pub output_clusters: Vec<u16>,
}

impl SimpleDescriptor {
    pub fn from_bytes(data: &[u8]) -> Result<Self, ZigbeeError> {
        if data.len() < 7 {
            return Err(ZigbeeError::BufferTooShort);
        }
        let endpoint = data[0];
        let profile_id = u16::from_le_bytes(data[1..3].try_into()?);
        let device_id = u16::from_le_bytes(data[3..5].try_into()?);
        let device_version = data[5] & 0x0F;

        let mut offset = 6;
        let input_clusters = Self::read_cluster_list(data, &mut offset)?;
        let output_clusters = Self::read_cluster_list(data, &mut offset)?;

        Ok(Self {
            endpoint,
            profile_id,
            device_id,
            device_version,
            input_clusters,
            output_clusters,
        })
    }

    fn read_cluster_list(data: &[u8], offset: &mut usize) -> Result<Vec<u16>, ZigbeeError> {
        let count = *data.get(*offset).ok_or(ZigbeeError::BufferTooShort)? as usize;
        *offset += 1;
        let end = *offset + count * 2;
        let bytes = data.get(*offset..end).ok_or(ZigbeeError::BufferTooShort)?;
        *offset = end;
        Ok(bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 2 * (self.input_clusters.len() + self.output_clusters.len()));
        out.push(self.endpoint);
        out.extend_from_slice(&self.profile_id.to_le_bytes());
        out.extend_from_slice(&self.device_id.to_le_bytes());
        out.push(self.device_version & 0x0F);
        for list in [&self.input_clusters, &self.output_clusters] {
            out.push(list.len() as u8);
            for id in list.iter() {
                out.extend_from_slice(&id.to_le_bytes());
            }
        }
        out
    }
}

/// The power descriptor of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerDescriptor {
    /// 0 = receiver synchronized with "receiver on when idle".
    pub power_mode: u8,
    /// Bits: 0 mains, 1 rechargeable battery, 2 disposable battery.
    pub available_sources: u8,
    pub current_source: u8,
    /// 0 = critical, 4 = 33%, 8 = 66%, 12 = 100%.
    pub current_level: u8,
}

impl PowerDescriptor {
    pub const SOURCE_MAINS: u8 = 1 << 0;
    pub const SOURCE_RECHARGEABLE_BATTERY: u8 = 1 << 1;
    pub const SOURCE_DISPOSABLE_BATTERY: u8 = 1 << 2;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZigbeeError> {
        if data.len() < 2 {
            return Err(ZigbeeError::BufferTooShort);
        }
        Ok(Self {
            power_mode: data[0] & 0x0F,
            available_sources: data[0] >> 4,
            current_source: data[1] & 0x0F,
            current_level: data[1] >> 4,
        })
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        [
            (self.power_mode & 0x0F) | (self.available_sources << 4),
            (self.current_source & 0x0F) | (self.current_level << 4),
        ]
    }

    pub fn is_mains_powered(&self) -> bool {
        self.current_source & Self::SOURCE_MAINS != 0
    }
}
