// crates/zigbee-rs/src/zcl/value.rs
//! ZCL data types and typed attribute values.

use crate::hal::ZigbeeError;
use crate::types::ExtendedAddress;
use alloc::string::String;
use alloc::vec::Vec;
use core::convert::TryFrom;

/// ZCL data type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DataType {
    NoData = 0x00,
    Data8 = 0x08,
    Data16 = 0x09,
    Data24 = 0x0A,
    Data32 = 0x0B,
    Data40 = 0x0C,
    Data48 = 0x0D,
    Data56 = 0x0E,
    Data64 = 0x0F,
    Boolean = 0x10,
    Bitmap8 = 0x18,
    Bitmap16 = 0x19,
    Bitmap24 = 0x1A,
    Bitmap32 = 0x1B,
    Bitmap40 = 0x1C,
    Bitmap48 = 0x1D,
    Bitmap56 = 0x1E,
    Bitmap64 = 0x1F,
    Uint8 = 0x20,
    Uint16 = 0x21,
    Uint24 = 0x22,
    Uint32 = 0x23,
    Uint40 = 0x24,
    Uint48 = 0x25,
    Uint56 = 0x26,
    Uint64 = 0x27,
    Int8 = 0x28,
    Int16 = 0x29,
    Int24 = 0x2A,
    Int32 = 0x2B,
    Int40 = 0x2C,
    Int48 = 0x2D,
    Int56 = 0x2E,
    Int64 = 0x2F,
    Enum8 = 0x30,
    Enum16 = 0x31,
    SemiFloat = 0x38,
    Float32 = 0x39,
    Float64 = 0x3A,
    OctetString = 0x41,
    CharString = 0x42,
    LongOctetString = 0x43,
    LongCharString = 0x44,
    Array = 0x48,
    Structure = 0x4C,
    Set = 0x50,
    Bag = 0x51,
    TimeOfDay = 0xE0,
    Date = 0xE1,
    UtcTime = 0xE2,
    ClusterId = 0xE8,
    AttributeId = 0xE9,
    BacnetOid = 0xEA,
    IeeeAddress = 0xF0,
    SecurityKey128 = 0xF1,
    Unknown = 0xFF,
}

impl TryFrom<u8> for DataType {
    type Error = ZigbeeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use DataType::*;
        Ok(match value {
            0x00 => NoData,
            0x08 => Data8,
            0x09 => Data16,
            0x0A => Data24,
            0x0B => Data32,
            0x0C => Data40,
            0x0D => Data48,
            0x0E => Data56,
            0x0F => Data64,
            0x10 => Boolean,
            0x18 => Bitmap8,
            0x19 => Bitmap16,
            0x1A => Bitmap24,
            0x1B => Bitmap32,
            0x1C => Bitmap40,
            0x1D => Bitmap48,
            0x1E => Bitmap56,
            0x1F => Bitmap64,
            0x20 => Uint8,
            0x21 => Uint16,
            0x22 => Uint24,
            0x23 => Uint32,
            0x24 => Uint40,
            0x25 => Uint48,
            0x26 => Uint56,
            0x27 => Uint64,
            0x28 => Int8,
            0x29 => Int16,
            0x2A => Int24,
            0x2B => Int32,
            0x2C => Int40,
            0x2D => Int48,
            0x2E => Int56,
            0x2F => Int64,
            0x30 => Enum8,
            0x31 => Enum16,
            0x38 => SemiFloat,
            0x39 => Float32,
            0x3A => Float64,
            0x41 => OctetString,
            0x42 => CharString,
            0x43 => LongOctetString,
            0x44 => LongCharString,
            0x48 => Array,
            0x4C => Structure,
            0x50 => Set,
            0x51 => Bag,
            0xE0 => TimeOfDay,
            0xE1 => Date,
            0xE2 => UtcTime,
            0xE8 => ClusterId,
            0xE9 => AttributeId,
            0xEA => BacnetOid,
            0xF0 => IeeeAddress,
            0xF1 => SecurityKey128,
            0xFF => Unknown,
            other => return Err(ZigbeeError::InvalidDataType(other)),
        })
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        value as u8
    }
}

/// How the bytes of a data type are laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Null,
    Bool,
    Bitmap(usize),
    Unsigned(usize),
    Signed(usize),
    Enum(usize),
    SemiFloat,
    Float32,
    Float64,
    Ieee,
    /// Fixed size, kept as raw bytes.
    Opaque(usize),
    OctetString { long: bool },
    CharString { long: bool },
    Array,
    /// Composite types whose length is only known from their content.
    Composite,
}

impl DataType {
    fn layout(self) -> Layout {
        use DataType::*;
        match self {
            NoData => Layout::Null,
            Boolean => Layout::Bool,
            Data8 | Bitmap8 => Layout::Bitmap(1),
            Data16 | Bitmap16 => Layout::Bitmap(2),
            Data24 | Bitmap24 => Layout::Bitmap(3),
            Data32 | Bitmap32 => Layout::Bitmap(4),
            Data40 | Bitmap40 => Layout::Bitmap(5),
            Data48 | Bitmap48 => Layout::Bitmap(6),
            Data56 | Bitmap56 => Layout::Bitmap(7),
            Data64 | Bitmap64 => Layout::Bitmap(8),
            Uint8 => Layout::Unsigned(1),
            Uint16 | ClusterId | AttributeId => Layout::Unsigned(2),
            Uint24 => Layout::Unsigned(3),
            Uint32 | TimeOfDay | Date | UtcTime | BacnetOid => Layout::Unsigned(4),
            Uint40 => Layout::Unsigned(5),
            Uint48 => Layout::Unsigned(6),
            Uint56 => Layout::Unsigned(7),
            Uint64 => Layout::Unsigned(8),
            Int8 => Layout::Signed(1),
            Int16 => Layout::Signed(2),
            Int24 => Layout::Signed(3),
            Int32 => Layout::Signed(4),
            Int40 => Layout::Signed(5),
            Int48 => Layout::Signed(6),
            Int56 => Layout::Signed(7),
            Int64 => Layout::Signed(8),
            Enum8 => Layout::Enum(1),
            Enum16 => Layout::Enum(2),
            SemiFloat => Layout::SemiFloat,
            Float32 => Layout::Float32,
            Float64 => Layout::Float64,
            IeeeAddress => Layout::Ieee,
            SecurityKey128 => Layout::Opaque(16),
            OctetString => Layout::OctetString { long: false },
            LongOctetString => Layout::OctetString { long: true },
            CharString => Layout::CharString { long: false },
            LongCharString => Layout::CharString { long: true },
            Array => Layout::Array,
            Structure | Set | Bag | Unknown => Layout::Composite,
        }
    }

    /// Size of a value of this type, or `None` for variable length types.
    pub fn fixed_size(self) -> Option<usize> {
        match self.layout() {
            Layout::Null => Some(0),
            Layout::Bool => Some(1),
            Layout::Bitmap(n)
            | Layout::Unsigned(n)
            | Layout::Signed(n)
            | Layout::Enum(n)
            | Layout::Opaque(n) => Some(n),
            Layout::SemiFloat => Some(2),
            Layout::Float32 => Some(4),
            Layout::Float64 | Layout::Ieee => Some(8),
            Layout::OctetString { .. }
            | Layout::CharString { .. }
            | Layout::Array
            | Layout::Composite => None,
        }
    }

    /// Analog types carry a reportable change in reporting configurations.
    pub fn is_analog(self) -> bool {
        matches!(
            self.layout(),
            Layout::Unsigned(_) | Layout::Signed(_) | Layout::SemiFloat | Layout::Float32 | Layout::Float64
        ) && !matches!(
            self,
            DataType::ClusterId | DataType::AttributeId | DataType::BacnetOid
        )
    }
}

/// A decoded attribute value.
///
/// Integers are widened to 64 bits; the `DataType` stored next to the value
/// keeps the wire width.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    NoData,
    Boolean(bool),
    Bitmap(u64),
    Unsigned(u64),
    Signed(i64),
    Enum(u16),
    /// IEEE 754 half precision, kept as raw bits.
    SemiFloat(u16),
    Float32(f32),
    Float64(f64),
    OctetString(Vec<u8>),
    /// Invalid UTF-8 is replaced, never rejected.
    CharString(String),
    Array {
        element_type: DataType,
        elements: Vec<AttributeValue>,
    },
    Ieee(ExtendedAddress),
    /// Bytes of a type this stack does not interpret.
    Raw(Vec<u8>),
}

fn read_uint(data: &[u8], n: usize) -> Result<u64, ZigbeeError> {
    let bytes = data.get(..n).ok_or(ZigbeeError::BufferTooShort)?;
    let mut buf = [0u8; 8];
    buf[..n].copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

fn sign_extend(value: u64, n: usize) -> i64 {
    let shift = 64 - (n as u32 * 8);
    ((value << shift) as i64) >> shift
}

impl AttributeValue {
    /// Decodes one value that must span all of `data`.
    pub fn decode(data_type: DataType, data: &[u8]) -> Result<Self, ZigbeeError> {
        let (value, used) = Self::decode_prefix(data_type, data)?;
        if used != data.len() {
            return Err(ZigbeeError::DecodeError);
        }
        Ok(value)
    }

    /// Decodes one value from the start of `data`, returning the value and
    /// the number of bytes consumed.
    pub fn decode_prefix(data_type: DataType, data: &[u8]) -> Result<(Self, usize), ZigbeeError> {
        match data_type.layout() {
            Layout::Null => Ok((Self::NoData, 0)),
            Layout::Bool => match data.first() {
                Some(0x00) => Ok((Self::Boolean(false), 1)),
                Some(0x01) => Ok((Self::Boolean(true), 1)),
                Some(_) => Err(ZigbeeError::DecodeError),
                None => Err(ZigbeeError::BufferTooShort),
            },
            Layout::Bitmap(n) => Ok((Self::Bitmap(read_uint(data, n)?), n)),
            Layout::Unsigned(n) => Ok((Self::Unsigned(read_uint(data, n)?), n)),
            Layout::Signed(n) => Ok((Self::Signed(sign_extend(read_uint(data, n)?, n)), n)),
            Layout::Enum(n) => Ok((Self::Enum(read_uint(data, n)? as u16), n)),
            Layout::SemiFloat => Ok((Self::SemiFloat(read_uint(data, 2)? as u16), 2)),
            Layout::Float32 => Ok((Self::Float32(f32::from_bits(read_uint(data, 4)? as u32)), 4)),
            Layout::Float64 => Ok((Self::Float64(f64::from_bits(read_uint(data, 8)?)), 8)),
            Layout::Ieee => Ok((Self::Ieee(ExtendedAddress(read_uint(data, 8)?)), 8)),
            Layout::Opaque(n) => {
                let bytes = data.get(..n).ok_or(ZigbeeError::BufferTooShort)?;
                Ok((Self::Raw(bytes.to_vec()), n))
            }
            Layout::OctetString { long } => {
                let (bytes, used) = Self::read_string(data, long)?;
                Ok((Self::OctetString(bytes.to_vec()), used))
            }
            Layout::CharString { long } => {
                let (bytes, used) = Self::read_string(data, long)?;
                Ok((
                    Self::CharString(String::from_utf8_lossy(bytes).into_owned()),
                    used,
                ))
            }
            Layout::Array => Self::decode_array(data),
            Layout::Composite => Ok((Self::Raw(data.to_vec()), data.len())),
        }
    }

    /// Reads a length prefixed string. A length of all ones marks an invalid
    /// string and decodes as empty.
    fn read_string(data: &[u8], long: bool) -> Result<(&[u8], usize), ZigbeeError> {
        let (len, header) = if long {
            let raw = read_uint(data, 2)? as usize;
            (if raw == 0xFFFF { 0 } else { raw }, 2)
        } else {
            let raw = *data.first().ok_or(ZigbeeError::BufferTooShort)? as usize;
            (if raw == 0xFF { 0 } else { raw }, 1)
        };
        let bytes = data
            .get(header..header + len)
            .ok_or(ZigbeeError::BufferTooShort)?;
        Ok((bytes, header + len))
    }

    fn decode_array(data: &[u8]) -> Result<(Self, usize), ZigbeeError> {
        let element_type = DataType::try_from(*data.first().ok_or(ZigbeeError::BufferTooShort)?)?;
        if element_type.layout() == Layout::Composite {
            return Err(ZigbeeError::DecodeError);
        }
        let raw_count = read_uint(&data[1..], 2)? as usize;
        let count = if raw_count == 0xFFFF { 0 } else { raw_count };

        let mut offset = 3;
        let mut elements = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let (element, used) = Self::decode_prefix(element_type, &data[offset..])?;
            elements.push(element);
            offset += used;
        }
        Ok((
            Self::Array {
                element_type,
                elements,
            },
            offset,
        ))
    }

    /// Encodes the value with the wire layout of `data_type`.
    pub fn encode(&self, data_type: DataType) -> Result<Vec<u8>, ZigbeeError> {
        let mut out = Vec::new();
        self.encode_into(data_type, &mut out)?;
        Ok(out)
    }

    fn encode_into(&self, data_type: DataType, out: &mut Vec<u8>) -> Result<(), ZigbeeError> {
        let mismatch = ZigbeeError::InvalidDataType(data_type as u8);
        match (data_type.layout(), self) {
            (Layout::Null, Self::NoData) => {}
            (Layout::Bool, Self::Boolean(v)) => out.push(*v as u8),
            (Layout::Bitmap(n), Self::Bitmap(v)) | (Layout::Unsigned(n), Self::Unsigned(v)) => {
                out.extend_from_slice(&v.to_le_bytes()[..n])
            }
            (Layout::Signed(n), Self::Signed(v)) => out.extend_from_slice(&v.to_le_bytes()[..n]),
            (Layout::Enum(n), Self::Enum(v)) => out.extend_from_slice(&v.to_le_bytes()[..n]),
            (Layout::SemiFloat, Self::SemiFloat(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (Layout::Float32, Self::Float32(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (Layout::Float64, Self::Float64(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (Layout::Ieee, Self::Ieee(v)) => out.extend_from_slice(&v.to_le_bytes()),
            (Layout::Opaque(n), Self::Raw(v)) if v.len() == n => out.extend_from_slice(v),
            (Layout::OctetString { long }, Self::OctetString(v)) => {
                Self::write_string(v, long, out)?
            }
            (Layout::CharString { long }, Self::CharString(v)) => {
                Self::write_string(v.as_bytes(), long, out)?
            }
            (
                Layout::Array,
                Self::Array {
                    element_type,
                    elements,
                },
            ) => {
                out.push(u8::from(*element_type));
                out.extend_from_slice(&(elements.len() as u16).to_le_bytes());
                for element in elements {
                    element.encode_into(*element_type, out)?;
                }
            }
            (Layout::Composite, Self::Raw(v)) => out.extend_from_slice(v),
            _ => return Err(mismatch),
        }
        Ok(())
    }

    fn write_string(bytes: &[u8], long: bool, out: &mut Vec<u8>) -> Result<(), ZigbeeError> {
        if long {
            if bytes.len() >= 0xFFFF {
                return Err(ZigbeeError::BufferTooShort);
            }
            out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
        } else {
            if bytes.len() >= 0xFF {
                return Err(ZigbeeError::BufferTooShort);
            }
            out.push(bytes.len() as u8);
        }
        out.extend_from_slice(bytes);
        Ok(())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns unsigned, bitmap and enumerated values as `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) | Self::Bitmap(v) => Some(*v),
            Self::Enum(v) => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Signed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::CharString(v) => Some(v.as_str()),
            _ => None,
        }
    }
}
