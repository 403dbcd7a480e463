// crates/zigbee-rs/src/network/request.rs
use crate::bridge::BridgeStatus;
use crate::hal::ZigbeeError;
use crate::types::{ExtendedAddress, PROFILE_HOME_AUTOMATION};
use alloc::vec::Vec;
use core::fmt;

/// Endpoint the coordinator uses as source of application requests.
pub const DEFAULT_SOURCE_ENDPOINT: u8 = 1;

/// Where an APS data request is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationAddress {
    Short(u16),
    Group(u16),
    Extended(ExtendedAddress),
}

/// An application-level (APS) request to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    pub destination: DestinationAddress,
    pub destination_endpoint: u8,
    pub profile_id: u16,
    pub cluster_id: u16,
    pub source_endpoint: u8,
    /// Application payload, e.g. a ZCL frame.
    pub payload: Vec<u8>,
    /// 0 lets the stack pick the maximum radius.
    pub radius: u8,
}

impl NetworkRequest {
    /// A Home Automation request to one endpoint of a node.
    pub fn new(short_address: u16, destination_endpoint: u8, cluster_id: u16, payload: Vec<u8>) -> Self {
        Self {
            destination: DestinationAddress::Short(short_address),
            destination_endpoint,
            profile_id: PROFILE_HOME_AUTOMATION,
            cluster_id,
            source_endpoint: DEFAULT_SOURCE_ENDPOINT,
            payload,
            radius: 0,
        }
    }

    pub fn with_profile(mut self, profile_id: u16) -> Self {
        self.profile_id = profile_id;
        self
    }

    pub fn with_destination(mut self, destination: DestinationAddress) -> Self {
        self.destination = destination;
        self
    }
}

/// Caller-visible identifier of a request submitted to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyHandle(pub u32);

/// Why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyError {
    /// The bridge did not answer in time.
    Timeout,
    /// The request was aborted, e.g. by a network stop.
    Aborted,
    NetworkOffline,
    /// The bridge rejected the command.
    BridgeStatus(BridgeStatus),
    /// The bridge accepted the command but the delivery failed.
    ApsStatus(u8),
    /// The request could not be encoded or sent.
    Interface(ZigbeeError),
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Request timed out"),
            Self::Aborted => write!(f, "Request was aborted"),
            Self::NetworkOffline => write!(f, "The network is not running"),
            Self::BridgeStatus(s) => write!(f, "Bridge rejected the request: {}", s),
            Self::ApsStatus(s) => write!(f, "APS delivery failed with status {s:#04x}"),
            Self::Interface(e) => write!(f, "Interface error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ReplyError {}

impl From<ZigbeeError> for ReplyError {
    fn from(e: ZigbeeError) -> Self {
        match e {
            ZigbeeError::NetworkOffline => ReplyError::NetworkOffline,
            other => ReplyError::Interface(other),
        }
    }
}

/// The single outcome of a submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReply {
    pub handle: ReplyHandle,
    /// The response payload returned by the bridge, if any.
    pub result: Result<Vec<u8>, ReplyError>,
}

impl NetworkReply {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
