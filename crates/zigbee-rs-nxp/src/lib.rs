// crates/zigbee-rs-nxp/src/lib.rs
#![no_std]
//! Bridge back-end for the NXP JN516x control-bridge firmware.
//!
//! Frames are exchanged after the transport removed the line framing and
//! checked the CRC. All multi-byte header and parameter fields are big endian;
//! ZDP descriptors inside payloads keep their standard little endian layout.
//!
//! ```text
//! request:      command u8 | sequence u8 | length u16 | payload
//! response:     command u8 | sequence u8 | status u8 | length u16 | payload
//! notification: id u8 (>= 0x7A) | sequence u8 | length u16 | payload
//! ```

extern crate alloc;

pub mod codec;

use alloc::vec::Vec;
use log::trace;
use zigbee_rs::{BridgeBackend, BridgeCommand, BridgeMessage, CommandKind, ZigbeeError};

/// First id of the notification range. Lower ids are command responses.
pub const NOTIFICATION_ID_MIN: u8 = 0x7A;

/// Command ids understood by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NxpCommand {
    GetVersion = 0x00,
    GetControllerState = 0x01,
    SoftReset = 0x02,
    FactoryReset = 0x03,
    SetPanId = 0x04,
    SetChannelMask = 0x05,
    SetSecurityKey = 0x06,
    StartNetwork = 0x07,
    GetNetworkState = 0x08,
    SetPermitJoinCoordinator = 0x09,
    NodeDescriptorRequest = 0x0A,
    SimpleDescriptorRequest = 0x0B,
    PowerDescriptorRequest = 0x0C,
    ApsDataRequest = 0x0D,
}

impl NxpCommand {
    /// The firmware command carrying a bridge command kind.
    pub fn for_kind(kind: CommandKind) -> Self {
        match kind {
            CommandKind::ErasePersistentData => Self::FactoryReset,
            CommandKind::Reset => Self::SoftReset,
            CommandKind::GetVersion => Self::GetVersion,
            CommandKind::SetPanId => Self::SetPanId,
            CommandKind::SetChannelMask => Self::SetChannelMask,
            CommandKind::SetSecurity => Self::SetSecurityKey,
            CommandKind::StartNetwork => Self::StartNetwork,
            CommandKind::NodeDescriptorRequest => Self::NodeDescriptorRequest,
            CommandKind::SimpleDescriptorRequest => Self::SimpleDescriptorRequest,
            CommandKind::PowerDescriptorRequest => Self::PowerDescriptorRequest,
            CommandKind::PermitJoin => Self::SetPermitJoinCoordinator,
            CommandKind::ApsDataRequest => Self::ApsDataRequest,
        }
    }

    /// The bridge command kind a response to this command completes.
    /// `GetControllerState` and `GetNetworkState` are never sent by the core.
    pub fn kind(self) -> Option<CommandKind> {
        match self {
            Self::GetVersion => Some(CommandKind::GetVersion),
            Self::SoftReset => Some(CommandKind::Reset),
            Self::FactoryReset => Some(CommandKind::ErasePersistentData),
            Self::SetPanId => Some(CommandKind::SetPanId),
            Self::SetChannelMask => Some(CommandKind::SetChannelMask),
            Self::SetSecurityKey => Some(CommandKind::SetSecurity),
            Self::StartNetwork => Some(CommandKind::StartNetwork),
            Self::SetPermitJoinCoordinator => Some(CommandKind::PermitJoin),
            Self::NodeDescriptorRequest => Some(CommandKind::NodeDescriptorRequest),
            Self::SimpleDescriptorRequest => Some(CommandKind::SimpleDescriptorRequest),
            Self::PowerDescriptorRequest => Some(CommandKind::PowerDescriptorRequest),
            Self::ApsDataRequest => Some(CommandKind::ApsDataRequest),
            Self::GetControllerState | Self::GetNetworkState => None,
        }
    }
}

impl TryFrom<u8> for NxpCommand {
    type Error = ZigbeeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::GetVersion),
            0x01 => Ok(Self::GetControllerState),
            0x02 => Ok(Self::SoftReset),
            0x03 => Ok(Self::FactoryReset),
            0x04 => Ok(Self::SetPanId),
            0x05 => Ok(Self::SetChannelMask),
            0x06 => Ok(Self::SetSecurityKey),
            0x07 => Ok(Self::StartNetwork),
            0x08 => Ok(Self::GetNetworkState),
            0x09 => Ok(Self::SetPermitJoinCoordinator),
            0x0A => Ok(Self::NodeDescriptorRequest),
            0x0B => Ok(Self::SimpleDescriptorRequest),
            0x0C => Ok(Self::PowerDescriptorRequest),
            0x0D => Ok(Self::ApsDataRequest),
            other => Err(ZigbeeError::UnknownCommand(other)),
        }
    }
}

/// Notification ids sent by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NxpNotification {
    DeviceStatusChanged = 0x7D,
    /// Answers `StartNetwork` with the sequence number of the request.
    NetworkStarted = 0x7E,
    DeviceAnnounce = 0x80,
    LeaveIndication = 0x81,
    AttributeReport = 0x82,
    NodeClusterList = 0x83,
    NodeAttributeList = 0x84,
    NodeCommandIdList = 0x85,
    DebugMessage = 0xFE,
}

impl TryFrom<u8> for NxpNotification {
    type Error = ZigbeeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x7D => Ok(Self::DeviceStatusChanged),
            0x7E => Ok(Self::NetworkStarted),
            0x80 => Ok(Self::DeviceAnnounce),
            0x81 => Ok(Self::LeaveIndication),
            0x82 => Ok(Self::AttributeReport),
            0x83 => Ok(Self::NodeClusterList),
            0x84 => Ok(Self::NodeAttributeList),
            0x85 => Ok(Self::NodeCommandIdList),
            0xFE => Ok(Self::DebugMessage),
            other => Err(ZigbeeError::UnknownNotification(other)),
        }
    }
}

/// Link key types of `SetSecurityKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyType {
    GlobalLinkKey = 0x00,
    UniqueLinkKey = 0x01,
}

/// Maps a firmware log level (syslog style, 0 = emergency .. 7 = debug).
pub fn log_level(level: u8) -> log::Level {
    match level {
        0..=3 => log::Level::Error,
        4 => log::Level::Warn,
        5 | 6 => log::Level::Info,
        _ => log::Level::Debug,
    }
}

/// The back-end for NXP control-bridge firmware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NxpBackend;

impl NxpBackend {
    pub fn new() -> Self {
        Self
    }
}

impl BridgeBackend for NxpBackend {
    fn name(&self) -> &'static str {
        "nxp"
    }

    fn encode_command(&self, sequence: u8, command: &BridgeCommand) -> Result<Vec<u8>, ZigbeeError> {
        let frame = codec::encode_request(sequence, command)?;
        trace!("[NXP] Encoded {:?} seq={}: {:02X?}", command.kind(), sequence, frame);
        Ok(frame)
    }

    fn decode_message(&self, frame: &[u8]) -> Result<BridgeMessage, ZigbeeError> {
        codec::decode_message(frame)
    }
}
