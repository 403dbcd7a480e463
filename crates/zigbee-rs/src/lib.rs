#![cfg_attr(not(feature = "std"), no_std)]


// 'alloc' is used for dynamic allocation (e.g., Vec<u8> frames, node tables)
extern crate alloc;

// --- Foundation Modules ---
pub mod types;
pub mod hal;
pub mod bridge;
pub mod zdp;

// --- Request/Reply Correlation ---
pub mod correlator;

// --- Data Model ---
pub mod zcl;
pub mod node;

// --- Network Layer ---
pub mod network;

// --- Top-level Exports ---
pub use types::{ChannelMask, ExtendedAddress, MacCapabilities, NetworkAddress};
pub use hal::{BridgeTransport, NetworkStorage, ZigbeeError};
pub use bridge::{
    BridgeBackend, BridgeCommand, BridgeMessage, BridgeNotification, BridgeResponse,
    BridgeStatus, CommandKind, ResponsePayload,
};
pub use correlator::{ExchangeCompletion, ExchangeHandle, ExchangeOutcome, ReplyCorrelator};
pub use node::{Node, NodeState, registry::NodeRegistry};
pub use network::{
    NetworkConfiguration, NetworkError, NetworkEvent, NetworkState, ReplyError, ReplyHandle,
    SecurityConfiguration, ZigbeeNetwork,
};
