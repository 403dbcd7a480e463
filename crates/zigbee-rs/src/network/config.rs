// crates/zigbee-rs/src/network/config.rs
//! Network configuration: PAN identity, radio channel, security keys and the
//! serial parameters handed to the transport.

use crate::hal::ZigbeeError;
use crate::types::{ChannelMask, MAX_CHANNEL, MIN_CHANNEL};
use alloc::string::String;
use alloc::vec::Vec;
use log::debug;

/// Well-known default trust-center link key ("ZigBeeAlliance09").
pub const DEFAULT_TRUST_CENTER_LINK_KEY: [u8; 16] = *b"ZigBeeAlliance09";

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Which kind of link key the trust center uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkKeyType {
    #[default]
    Global,
    Unique,
}

/// Security keys of the network. The keys are opaque byte strings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecurityConfiguration {
    /// Empty means "let the controller choose".
    pub network_key: Vec<u8>,
    pub trust_center_link_key: Vec<u8>,
    pub link_key_type: LinkKeyType,
}

impl Default for SecurityConfiguration {
    fn default() -> Self {
        Self {
            network_key: Vec::new(),
            trust_center_link_key: DEFAULT_TRUST_CENTER_LINK_KEY.to_vec(),
            link_key_type: LinkKeyType::Global,
        }
    }
}

impl SecurityConfiguration {
    /// Sets the network key from a hex string.
    pub fn set_network_key_hex(&mut self, key: &str) -> Result<(), ZigbeeError> {
        self.network_key = hex::decode(key.trim()).map_err(|_| ZigbeeError::DecodeError)?;
        Ok(())
    }

    pub fn set_trust_center_link_key_hex(&mut self, key: &str) -> Result<(), ZigbeeError> {
        self.trust_center_link_key =
            hex::decode(key.trim()).map_err(|_| ZigbeeError::DecodeError)?;
        Ok(())
    }

    /// The network key as upper case hex.
    pub fn network_key_hex(&self) -> String {
        hex::encode_upper(&self.network_key)
    }

    pub fn trust_center_link_key_hex(&self) -> String {
        hex::encode_upper(&self.trust_center_link_key)
    }

    /// Resets the trust-center link key to the well-known default.
    pub fn reset_trust_center_link_key(&mut self) {
        self.trust_center_link_key = DEFAULT_TRUST_CENTER_LINK_KEY.to_vec();
    }
}

/// The configuration of one network.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkConfiguration {
    pub pan_id: u16,
    pub extended_pan_id: u64,
    /// 0 means "any channel of `channel_mask`".
    pub channel: u8,
    pub channel_mask: ChannelMask,
    pub security: SecurityConfiguration,
    /// Serial parameters, only passed through to the transport.
    pub serial_port: String,
    pub baud_rate: u32,
}

impl Default for NetworkConfiguration {
    fn default() -> Self {
        Self {
            pan_id: 0,
            extended_pan_id: 0,
            channel: 0,
            channel_mask: ChannelMask::ALL_CHANNELS,
            security: SecurityConfiguration::default(),
            serial_port: String::from(DEFAULT_SERIAL_PORT),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

impl NetworkConfiguration {
    /// Sets a fixed channel (11-26), or 0 for any channel of the mask.
    pub fn set_channel(&mut self, channel: u8) -> Result<(), ZigbeeError> {
        if channel != 0 && !(MIN_CHANNEL..=MAX_CHANNEL).contains(&channel) {
            return Err(ZigbeeError::InvalidChannel(channel));
        }
        debug!("[NET] Channel configured: {}", channel);
        self.channel = channel;
        Ok(())
    }

    /// The channel mask sent to the controller: the single fixed channel if
    /// one is set, else the configured mask.
    pub fn effective_channel_mask(&self) -> ChannelMask {
        ChannelMask::from_channel(self.channel).unwrap_or(self.channel_mask)
    }
}
