// crates/zigbee-rs/src/zcl/reporting.rs
use crate::hal::ZigbeeError;
use crate::zcl::value::{AttributeValue, DataType};
use alloc::vec::Vec;

/// Whether a record configures reports sent by the device or the timeout
/// for reports it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingDirection {
    Reported = 0x00,
    Received = 0x01,
}

/// One attribute reporting configuration record (ZCL configure reporting).
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfigurationRecord {
    pub direction: ReportingDirection,
    pub data_type: DataType,
    pub attribute_id: u16,
    /// Minimum reporting interval in seconds.
    pub min_interval: u16,
    /// Maximum reporting interval in seconds, 0xFFFF disables periodic reports.
    pub max_interval: u16,
    /// Timeout in seconds for received reports.
    pub timeout: u16,
    /// Minimum change that triggers a report. Only analog data types carry one.
    pub change_threshold: Option<AttributeValue>,
}

impl ReportConfigurationRecord {
    /// A record asking the device to report `attribute_id`.
    pub fn reported(
        attribute_id: u16,
        data_type: DataType,
        min_interval: u16,
        max_interval: u16,
        change_threshold: Option<AttributeValue>,
    ) -> Self {
        Self {
            direction: ReportingDirection::Reported,
            data_type,
            attribute_id,
            min_interval,
            max_interval,
            timeout: 0,
            change_threshold,
        }
    }

    /// Serializes the record. Fails if an analog type is missing its change
    /// threshold or the threshold does not fit the data type.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ZigbeeError> {
        let mut out = Vec::with_capacity(16);
        out.push(self.direction as u8);
        out.extend_from_slice(&self.attribute_id.to_le_bytes());
        match self.direction {
            ReportingDirection::Reported => {
                out.push(u8::from(self.data_type));
                out.extend_from_slice(&self.min_interval.to_le_bytes());
                out.extend_from_slice(&self.max_interval.to_le_bytes());
                if self.data_type.is_analog() {
                    let change = self
                        .change_threshold
                        .as_ref()
                        .ok_or(ZigbeeError::InvalidDataType(u8::from(self.data_type)))?;
                    out.extend_from_slice(&change.encode(self.data_type)?);
                }
            }
            ReportingDirection::Received => {
                out.extend_from_slice(&self.timeout.to_le_bytes());
            }
        }
        Ok(out)
    }

    /// Parses one record from the start of `data`, returning it with the
    /// number of bytes consumed.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), ZigbeeError> {
        if data.len() < 5 {
            return Err(ZigbeeError::BufferTooShort);
        }
        let attribute_id = u16::from_le_bytes(data[1..3].try_into()?);
        match data[0] {
            0x00 => {
                if data.len() < 8 {
                    return Err(ZigbeeError::BufferTooShort);
                }
                let data_type = DataType::try_from(data[3])?;
                let min_interval = u16::from_le_bytes(data[4..6].try_into()?);
                let max_interval = u16::from_le_bytes(data[6..8].try_into()?);
                let (change_threshold, used) = if data_type.is_analog() {
                    let (value, used) = AttributeValue::decode_prefix(data_type, &data[8..])?;
                    (Some(value), used)
                } else {
                    (None, 0)
                };
                Ok((
                    Self::reported(attribute_id, data_type, min_interval, max_interval, change_threshold),
                    8 + used,
                ))
            }
            0x01 => Ok((
                Self {
                    direction: ReportingDirection::Received,
                    data_type: DataType::NoData,
                    attribute_id,
                    min_interval: 0,
                    max_interval: 0,
                    timeout: u16::from_le_bytes(data[3..5].try_into()?),
                    change_threshold: None,
                },
                5,
            )),
            _ => Err(ZigbeeError::DecodeError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zcl::ids;

    #[test]
    fn test_on_off_record_has_no_change_field() {
        let record = ReportConfigurationRecord::reported(
            ids::on_off::ON_OFF,
            DataType::Boolean,
            0,
            300,
            None,
        );
        let bytes = record.to_bytes().unwrap();
        assert_eq!(bytes, [0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x2C, 0x01]);
        assert_eq!(ReportConfigurationRecord::from_bytes(&bytes).unwrap(), (record, 8));
    }

    #[test]
    fn test_level_record_carries_change() {
        let record = ReportConfigurationRecord::reported(
            ids::level_control::CURRENT_LEVEL,
            DataType::Uint8,
            1,
            600,
            Some(AttributeValue::Unsigned(5)),
        );
        let bytes = record.to_bytes().unwrap();
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[8], 5);
        assert_eq!(ReportConfigurationRecord::from_bytes(&bytes).unwrap().0, record);
    }

    #[test]
    fn test_analog_without_threshold_is_rejected() {
        let record = ReportConfigurationRecord::reported(0x0000, DataType::Int16, 1, 60, None);
        assert_eq!(record.to_bytes(), Err(ZigbeeError::InvalidDataType(0x29)));
    }

    #[test]
    fn test_received_record() {
        let bytes = [0x01, 0x00, 0x00, 0x58, 0x02];
        let (record, used) = ReportConfigurationRecord::from_bytes(&bytes).unwrap();
        assert_eq!(used, 5);
        assert_eq!(record.direction, ReportingDirection::Received);
        assert_eq!(record.timeout, 600);
        assert_eq!(record.to_bytes().unwrap(), bytes);
    }
}
