use core::fmt;
use core::ops::BitOr;

// --- Address Constants ---

/// Network (short) address of the coordinator. Always 0x0000.
pub const COORDINATOR_SHORT_ADDRESS: u16 = 0x0000;

/// Short address used for a node whose network address is no longer known.
pub const UNKNOWN_SHORT_ADDRESS: u16 = 0xFFFE;

/// Broadcast to all devices in the network.
pub const BROADCAST_ALL: u16 = 0xFFFF;

/// Broadcast to all devices with the receiver on when idle.
pub const BROADCAST_RX_ON_WHEN_IDLE: u16 = 0xFFFD;

/// Broadcast to all routers and the coordinator.
pub const BROADCAST_ROUTERS: u16 = 0xFFFC;

/// Home Automation profile id.
pub const PROFILE_HOME_AUTOMATION: u16 = 0x0104;

/// Zigbee Light Link profile id.
pub const PROFILE_LIGHT_LINK: u16 = 0xC05E;

/// Zigbee Device Profile id.
pub const PROFILE_ZDP: u16 = 0x0000;

/// First and last channel of the 2.4 GHz band.
pub const MIN_CHANNEL: u8 = 11;
pub const MAX_CHANNEL: u8 = 26;

/// The 64-bit IEEE (extended) address of a device.
///
/// This is the stable identity of a node; the short address may change on
/// every rejoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtendedAddress(pub u64);

impl ExtendedAddress {
    /// Returns the address bytes in over-the-air (little endian) order.
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl From<u64> for ExtendedAddress {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ExtendedAddress> for u64 {
    fn from(address: ExtendedAddress) -> Self {
        address.0
    }
}

impl fmt::Display for ExtendedAddress {
    /// Formats as colon separated bytes, most significant first
    /// (e.g. `00:12:4b:00:01:ab:cd:ef`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        for (i, byte) in bytes.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A node address pair as announced on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkAddress {
    pub short_address: u16,
    pub extended_address: ExtendedAddress,
}

impl NetworkAddress {
    pub fn new(short_address: u16, extended_address: ExtendedAddress) -> Self {
        Self {
            short_address,
            extended_address,
        }
    }
}

/// MAC capability flags from a device announcement or node descriptor.
/// (Reference: IEEE 802.15.4 capability information field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacCapabilities(pub u8);

impl MacCapabilities {
    // --- Flag Constants ---
    pub const ALTERNATE_PAN_COORDINATOR: Self = Self(1 << 0);
    /// Set for routers (full function devices), clear for end devices.
    pub const FULL_FUNCTION_DEVICE: Self = Self(1 << 1);
    pub const MAINS_POWERED: Self = Self(1 << 2);
    pub const RECEIVER_ON_WHEN_IDLE: Self = Self(1 << 3);
    pub const SECURITY_CAPABLE: Self = Self(1 << 6);
    pub const ALLOCATE_ADDRESS: Self = Self(1 << 7);

    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Checks if all of the specified flags are set.
    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn is_router(&self) -> bool {
        self.contains(Self::FULL_FUNCTION_DEVICE)
    }

    pub fn is_mains_powered(&self) -> bool {
        self.contains(Self::MAINS_POWERED)
    }
}

impl BitOr for MacCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// A 32-bit channel mask where bit N enables channel N (11..=26 are valid).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    /// All channels of the 2.4 GHz band (11-26).
    pub const ALL_CHANNELS: Self = Self(0x07FF_F800);
    /// The channels recommended for Zigbee Light Link / Home Automation (11, 15, 20, 25).
    pub const PRIMARY_CHANNELS: Self = Self((1 << 11) | (1 << 15) | (1 << 20) | (1 << 25));

    /// Creates a mask with a single channel enabled.
    pub fn from_channel(channel: u8) -> Option<Self> {
        if (MIN_CHANNEL..=MAX_CHANNEL).contains(&channel) {
            Some(Self(1 << channel))
        } else {
            None
        }
    }

    pub fn contains(&self, channel: u8) -> bool {
        channel < 32 && (self.0 & (1 << channel)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 & Self::ALL_CHANNELS.0 == 0
    }

    /// Iterates over the enabled, valid channels in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
        (MIN_CHANNEL..=MAX_CHANNEL).filter(move |c| self.contains(*c))
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL_CHANNELS
    }
}
