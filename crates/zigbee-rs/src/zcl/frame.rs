// crates/zigbee-rs/src/zcl/frame.rs
//! Minimal ZCL frame building and parsing for payloads carried by
//! `ZigbeeNetwork::send_request`.

use crate::hal::ZigbeeError;
use crate::zcl::reporting::ReportConfigurationRecord;
use crate::zcl::value::{AttributeValue, DataType};
use crate::zcl::AttributeStatus;
use alloc::vec::Vec;

// --- Global command ids ---
pub const READ_ATTRIBUTES: u8 = 0x00;
pub const READ_ATTRIBUTES_RESPONSE: u8 = 0x01;
pub const WRITE_ATTRIBUTES: u8 = 0x02;
pub const WRITE_ATTRIBUTES_RESPONSE: u8 = 0x04;
pub const CONFIGURE_REPORTING: u8 = 0x06;
pub const CONFIGURE_REPORTING_RESPONSE: u8 = 0x07;
pub const REPORT_ATTRIBUTES: u8 = 0x0A;
pub const DEFAULT_RESPONSE: u8 = 0x0B;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Profile wide command.
    Global = 0x00,
    ClusterSpecific = 0x01,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    ClientToServer,
    ServerToClient,
}

/// The ZCL frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZclHeader {
    pub frame_type: FrameType,
    pub manufacturer_code: Option<u16>,
    pub direction: FrameDirection,
    pub disable_default_response: bool,
    pub transaction_sequence: u8,
    pub command_id: u8,
}

impl ZclHeader {
    pub fn global(transaction_sequence: u8, command_id: u8) -> Self {
        Self {
            frame_type: FrameType::Global,
            manufacturer_code: None,
            direction: FrameDirection::ClientToServer,
            disable_default_response: false,
            transaction_sequence,
            command_id,
        }
    }

    pub fn cluster_specific(transaction_sequence: u8, command_id: u8) -> Self {
        Self {
            frame_type: FrameType::ClusterSpecific,
            ..Self::global(transaction_sequence, command_id)
        }
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        let mut control = self.frame_type as u8;
        if self.manufacturer_code.is_some() {
            control |= 1 << 2;
        }
        if self.direction == FrameDirection::ServerToClient {
            control |= 1 << 3;
        }
        if self.disable_default_response {
            control |= 1 << 4;
        }
        out.push(control);
        if let Some(code) = self.manufacturer_code {
            out.extend_from_slice(&code.to_le_bytes());
        }
        out.push(self.transaction_sequence);
        out.push(self.command_id);
    }

    /// Parses the header, returning it and the offset of the command payload.
    pub fn deserialize(data: &[u8]) -> Result<(Self, usize), ZigbeeError> {
        let control = *data.first().ok_or(ZigbeeError::BufferTooShort)?;
        let frame_type = match control & 0x03 {
            0 => FrameType::Global,
            1 => FrameType::ClusterSpecific,
            _ => return Err(ZigbeeError::InvalidFrame),
        };
        let mut offset = 1;
        let manufacturer_code = if control & (1 << 2) != 0 {
            let code = data
                .get(1..3)
                .ok_or(ZigbeeError::BufferTooShort)?;
            offset += 2;
            Some(u16::from_le_bytes(code.try_into()?))
        } else {
            None
        };
        let tail = data.get(offset..offset + 2).ok_or(ZigbeeError::BufferTooShort)?;
        Ok((
            Self {
                frame_type,
                manufacturer_code,
                direction: if control & (1 << 3) != 0 {
                    FrameDirection::ServerToClient
                } else {
                    FrameDirection::ClientToServer
                },
                disable_default_response: control & (1 << 4) != 0,
                transaction_sequence: tail[0],
                command_id: tail[1],
            },
            offset + 2,
        ))
    }
}

/// Builds a read attributes request.
pub fn read_attributes_request(transaction_sequence: u8, attribute_ids: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + attribute_ids.len() * 2);
    ZclHeader::global(transaction_sequence, READ_ATTRIBUTES).serialize(&mut out);
    for id in attribute_ids {
        out.extend_from_slice(&id.to_le_bytes());
    }
    out
}

/// Builds a configure reporting request.
pub fn configure_reporting_request(
    transaction_sequence: u8,
    records: &[ReportConfigurationRecord],
) -> Result<Vec<u8>, ZigbeeError> {
    let mut out = Vec::new();
    ZclHeader::global(transaction_sequence, CONFIGURE_REPORTING).serialize(&mut out);
    for record in records {
        out.extend_from_slice(&record.to_bytes()?);
    }
    Ok(out)
}

/// Builds a cluster specific command (e.g. On/Off toggle).
pub fn cluster_command(transaction_sequence: u8, command_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + payload.len());
    ZclHeader::cluster_specific(transaction_sequence, command_id).serialize(&mut out);
    out.extend_from_slice(payload);
    out
}

/// One entry of a read attributes response.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAttributeRecord {
    pub attribute_id: u16,
    pub status: AttributeStatus,
    pub value: Option<(DataType, AttributeValue)>,
}

/// Parses the payload (after the header) of a read attributes response.
pub fn parse_read_attributes_response(data: &[u8]) -> Result<Vec<ReadAttributeRecord>, ZigbeeError> {
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let head = data.get(offset..offset + 3).ok_or(ZigbeeError::BufferTooShort)?;
        let attribute_id = u16::from_le_bytes([head[0], head[1]]);
        let status = AttributeStatus::from(head[2]);
        offset += 3;
        let value = if status == AttributeStatus::Success {
            let data_type = DataType::try_from(*data.get(offset).ok_or(ZigbeeError::BufferTooShort)?)?;
            let (value, used) = AttributeValue::decode_prefix(data_type, &data[offset + 1..])?;
            offset += 1 + used;
            Some((data_type, value))
        } else {
            None
        };
        records.push(ReadAttributeRecord {
            attribute_id,
            status,
            value,
        });
    }
    Ok(records)
}
