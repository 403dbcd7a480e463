// crates/zigbee-rs/src/network/state.rs
use crate::types::ExtendedAddress;
use crate::zcl::{Attribute, ClusterDirection};
use core::fmt;

/// Network-level state, owned by `ZigbeeNetwork`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkState {
    #[default]
    Uninitialized,
    Offline,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Offline => "offline",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// The last network-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkError {
    #[default]
    None,
    /// The transport reports the hardware link down.
    HardwareUnavailable,
    /// A bring-up step failed or timed out.
    ZigbeeError,
}

/// The externally observable notifications of a network.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    NodeAdded(ExtendedAddress),
    NodeRemoved {
        extended_address: ExtendedAddress,
        short_address: u16,
    },
    AttributeChanged {
        extended_address: ExtendedAddress,
        endpoint: u8,
        cluster_id: u16,
        direction: ClusterDirection,
        attribute: Attribute,
    },
    StateChanged(NetworkState),
    PermitJoiningChanged(bool),
    ErrorOccurred(NetworkError),
}
