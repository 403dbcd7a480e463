// crates/zigbee-rs/src/bridge.rs
//! The capability interface towards the radio bridge firmware.
//!
//! A `BridgeBackend` turns typed `BridgeCommand`s into firmware frames and
//! firmware frames back into typed `BridgeMessage`s. The bring-up state
//! machine, the correlator and the network are written once against this
//! interface; there is one implementation per supported radio firmware.

use crate::hal::ZigbeeError;
use crate::network::{LinkKeyType, NetworkRequest};
use crate::types::{ChannelMask, ExtendedAddress, MacCapabilities};
use crate::zcl::{AttributeReport, ClusterDirection};
use crate::zdp::{NodeDescriptor, PowerDescriptor, SimpleDescriptor};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// The kind of a bridge command. Together with the sequence number this is
/// the key a response is correlated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKind {
    ErasePersistentData,
    Reset,
    GetVersion,
    SetPanId,
    SetChannelMask,
    SetSecurity,
    StartNetwork,
    NodeDescriptorRequest,
    SimpleDescriptorRequest,
    PowerDescriptorRequest,
    PermitJoin,
    ApsDataRequest,
}

/// A typed command for the bridge chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    /// Erases the persistent network data of the controller.
    ErasePersistentData,
    /// Soft reset of the controller.
    Reset,
    GetVersion,
    SetPanId { pan_id: u16, extended_pan_id: u64 },
    SetChannelMask(ChannelMask),
    /// Installs the network key and the trust-center link key (opaque bytes).
    SetSecurity {
        network_key: Vec<u8>,
        trust_center_link_key: Vec<u8>,
        link_key_type: LinkKeyType,
    },
    StartNetwork,
    NodeDescriptorRequest { short_address: u16 },
    SimpleDescriptorRequest { short_address: u16, endpoint: u8 },
    PowerDescriptorRequest { short_address: u16 },
    /// Opens (duration > 0) or closes (duration == 0) the network for joining.
    /// A duration of 255 keeps it open until closed explicitly.
    PermitJoin { short_address: u16, duration: u8 },
    /// Sends an application payload to a node.
    ApsDataRequest(NetworkRequest),
}

impl BridgeCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::ErasePersistentData => CommandKind::ErasePersistentData,
            Self::Reset => CommandKind::Reset,
            Self::GetVersion => CommandKind::GetVersion,
            Self::SetPanId { .. } => CommandKind::SetPanId,
            Self::SetChannelMask(_) => CommandKind::SetChannelMask,
            Self::SetSecurity { .. } => CommandKind::SetSecurity,
            Self::StartNetwork => CommandKind::StartNetwork,
            Self::NodeDescriptorRequest { .. } => CommandKind::NodeDescriptorRequest,
            Self::SimpleDescriptorRequest { .. } => CommandKind::SimpleDescriptorRequest,
            Self::PowerDescriptorRequest { .. } => CommandKind::PowerDescriptorRequest,
            Self::PermitJoin { .. } => CommandKind::PermitJoin,
            Self::ApsDataRequest(_) => CommandKind::ApsDataRequest,
        }
    }
}

/// Status code the bridge returns for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    Success,
    ProtocolError,
    UnknownCommand,
    InvalidCrc,
    StackError,
    Other(u8),
}

impl BridgeStatus {
    pub fn is_success(&self) -> bool {
        *self == Self::Success
    }
}

impl From<u8> for BridgeStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::ProtocolError,
            2 => Self::UnknownCommand,
            3 => Self::InvalidCrc,
            4 => Self::StackError,
            other => Self::Other(other),
        }
    }
}

impl From<BridgeStatus> for u8 {
    fn from(status: BridgeStatus) -> Self {
        match status {
            BridgeStatus::Success => 0,
            BridgeStatus::ProtocolError => 1,
            BridgeStatus::UnknownCommand => 2,
            BridgeStatus::InvalidCrc => 3,
            BridgeStatus::StackError => 4,
            BridgeStatus::Other(v) => v,
        }
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ProtocolError => write!(f, "protocol error"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::InvalidCrc => write!(f, "invalid CRC"),
            Self::StackError => write!(f, "stack error"),
            Self::Other(v) => write!(f, "status {v:#04x}"),
        }
    }
}

/// Firmware version reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Typed response data, decoded by the back-end. The correlator carries it
/// opaquely to whoever owns the exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Empty,
    Version(FirmwareVersion),
    NetworkStarted {
        short_address: u16,
        extended_address: ExtendedAddress,
        channel: u8,
    },
    NodeDescriptor {
        short_address: u16,
        descriptor: NodeDescriptor,
        active_endpoints: Vec<u8>,
    },
    SimpleDescriptor {
        short_address: u16,
        descriptor: SimpleDescriptor,
    },
    PowerDescriptor {
        short_address: u16,
        descriptor: PowerDescriptor,
    },
    /// Confirmation of an APS data request; `aps_status` 0 means delivered.
    ApsData { aps_status: u8, payload: Vec<u8> },
    Raw(Vec<u8>),
}

/// A response to a previously sent command.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeResponse {
    pub kind: CommandKind,
    pub sequence: u8,
    pub status: BridgeStatus,
    pub payload: ResponsePayload,
}

/// Unsolicited messages from the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeNotification {
    DeviceAnnounce {
        short_address: u16,
        extended_address: ExtendedAddress,
        mac_capabilities: MacCapabilities,
    },
    LeaveIndication {
        extended_address: ExtendedAddress,
        rejoin: bool,
    },
    AttributeReport(AttributeReport),
    NodeClusterList {
        source_address: u16,
        endpoint: u8,
        profile_id: u16,
        direction: ClusterDirection,
        cluster_ids: Vec<u16>,
    },
    NodeAttributeList {
        source_address: u16,
        endpoint: u8,
        profile_id: u16,
        cluster_id: u16,
        attribute_ids: Vec<u16>,
    },
    NodeCommandIdList {
        source_address: u16,
        endpoint: u8,
        profile_id: u16,
        cluster_id: u16,
        command_ids: Vec<u8>,
    },
    /// The controller changed its internal state (firmware specific code).
    ControllerStateChanged(u8),
    /// A debug/log line emitted by the firmware.
    Log { level: log::Level, text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    Response(BridgeResponse),
    Notification(BridgeNotification),
}

/// One implementation per supported radio firmware.
pub trait BridgeBackend {
    /// Human readable name of the firmware family.
    fn name(&self) -> &'static str;

    /// Encodes a command with the given sequence number into a frame for
    /// the transport.
    fn encode_command(&self, sequence: u8, command: &BridgeCommand) -> Result<Vec<u8>, ZigbeeError>;

    /// Decodes a frame received from the transport.
    fn decode_message(&self, frame: &[u8]) -> Result<BridgeMessage, ZigbeeError>;
}
