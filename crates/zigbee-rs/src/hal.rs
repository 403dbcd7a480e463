use crate::network::NetworkConfiguration;
use crate::node::Node;
use crate::types::ExtendedAddress;
use alloc::vec::Vec;
use core::array::TryFromSliceError;
use core::fmt;

/// Defines a portable, descriptive Error type for the Zigbee coordinator stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZigbeeError {
    /// The provided buffer is too small for the operation.
    BufferTooShort,
    /// A received bridge frame is fundamentally invalid (e.g., length field mismatch).
    InvalidFrame,
    /// A value in the frame is not a known bridge command id.
    UnknownCommand(u8),
    /// A value in the frame is not a known bridge notification id.
    UnknownNotification(u8),
    /// A value is not a valid ZCL data type id.
    InvalidDataType(u8),
    /// The channel is outside of the 2.4 GHz band (11-26).
    InvalidChannel(u8),
    /// Every sequence number is currently reserved by a waiting exchange.
    SequenceNumbersExhausted,
    /// The sequence number is already reserved by a waiting exchange of the same kind.
    SequenceInUse(u8),
    /// No waiting exchange exists for the given handle.
    UnknownExchange,
    /// The requested node is not in the registry.
    UnknownNode,
    /// The requested endpoint does not exist on the node.
    UnknownEndpoint(u8),
    /// The coordinator node can never be removed from the registry.
    CoordinatorNotRemovable,
    /// The transport to the bridge chip reports the hardware link down.
    TransportUnavailable,
    /// An underlying I/O error occurred.
    IoError,
    /// The operation requires the network to be running.
    NetworkOffline,
    /// The operation is not allowed in the current network state.
    InvalidState,
    /// The bridge answered with a payload that does not fit the command.
    UnexpectedResponse,
    /// A payload could not be decoded.
    DecodeError,
    /// An error occurred in the storage backend.
    StorageError(&'static str),
}

impl fmt::Display for ZigbeeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooShort => write!(f, "Buffer is too short for the frame"),
            Self::InvalidFrame => write!(f, "Frame is not a valid bridge frame"),
            Self::UnknownCommand(v) => write!(f, "Unknown bridge command id: {v:#04x}"),
            Self::UnknownNotification(v) => write!(f, "Unknown bridge notification id: {v:#04x}"),
            Self::InvalidDataType(v) => write!(f, "Invalid ZCL data type: {v:#04x}"),
            Self::InvalidChannel(v) => write!(f, "Invalid channel: {v} (must be 11-26)"),
            Self::SequenceNumbersExhausted => write!(f, "All sequence numbers are in use"),
            Self::SequenceInUse(v) => write!(f, "Sequence number {v} is already in use"),
            Self::UnknownExchange => write!(f, "No waiting exchange for this handle"),
            Self::UnknownNode => write!(f, "The requested node is not known"),
            Self::UnknownEndpoint(v) => write!(f, "Unknown endpoint: {v}"),
            Self::CoordinatorNotRemovable => write!(f, "The coordinator node cannot be removed"),
            Self::TransportUnavailable => write!(f, "The bridge transport is unavailable"),
            Self::IoError => write!(f, "An underlying I/O error occurred"),
            Self::NetworkOffline => write!(f, "The network is not running"),
            Self::InvalidState => write!(f, "Operation not allowed in the current network state"),
            Self::UnexpectedResponse => write!(f, "Unexpected response payload from the bridge"),
            Self::DecodeError => write!(f, "Failed to decode payload"),
            Self::StorageError(s) => write!(f, "Storage error: {}", s),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ZigbeeError {}

// --- From Implementations for Error Conversion ---

impl From<TryFromSliceError> for ZigbeeError {
    fn from(_: TryFromSliceError) -> Self {
        ZigbeeError::BufferTooShort
    }
}

impl From<&'static str> for ZigbeeError {
    fn from(s: &'static str) -> Self {
        ZigbeeError::StorageError(s)
    }
}

/// Hardware Abstraction Layer (HAL) for the link to the radio bridge chip.
///
/// The transport owns the physical serial line, its framing and CRC. The core
/// only hands it complete command frames; received frames are pushed back into
/// the network with `ZigbeeNetwork::process_frame`, availability changes with
/// `ZigbeeNetwork::set_transport_available`.
pub trait BridgeTransport {
    /// Sends one command frame (without line framing) to the bridge chip.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), ZigbeeError>;

    /// Returns true while the hardware link is up.
    fn is_available(&self) -> bool;
}

/// A trait for abstracting the persistence of network settings and the
/// node inventory.
///
/// The network calls into it after a successful bring-up, after a node has
/// been added or removed and on a factory reset. The storage format is up to
/// the implementation.
pub trait NetworkStorage {
    /// Persists the network configuration.
    fn save_network(&mut self, config: &NetworkConfiguration) -> Result<(), ZigbeeError>;

    /// Loads the persisted network configuration, if any.
    fn load_network(&mut self) -> Result<Option<NetworkConfiguration>, ZigbeeError>;

    /// Persists (inserts or replaces) one node.
    fn save_node(&mut self, node: &Node) -> Result<(), ZigbeeError>;

    /// Removes one node from the persisted inventory.
    fn remove_node(&mut self, extended_address: ExtendedAddress) -> Result<(), ZigbeeError>;

    /// Loads the persisted node inventory.
    fn load_nodes(&mut self) -> Result<Vec<Node>, ZigbeeError>;

    /// Clears all persisted data.
    fn clear(&mut self) -> Result<(), ZigbeeError>;
}
