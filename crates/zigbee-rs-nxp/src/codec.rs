// crates/zigbee-rs-nxp/src/codec.rs
use crate::{KeyType, NOTIFICATION_ID_MIN, NxpCommand, NxpNotification, log_level};
use alloc::string::String;
use alloc::vec::Vec;
use log::{debug, trace};
use zigbee_rs::bridge::FirmwareVersion;
use zigbee_rs::network::{DestinationAddress, LinkKeyType};
use zigbee_rs::zcl::{AttributeReport, ClusterDirection};
use zigbee_rs::zdp::{NODE_DESCRIPTOR_LEN, NodeDescriptor, PowerDescriptor, SimpleDescriptor};
use zigbee_rs::{
    BridgeCommand, BridgeMessage, BridgeNotification, BridgeResponse, BridgeStatus, CommandKind,
    ExtendedAddress, MacCapabilities, ResponsePayload, ZigbeeError,
};

pub const REQUEST_HEADER_LEN: usize = 4;
pub const RESPONSE_HEADER_LEN: usize = 5;
pub const NOTIFICATION_HEADER_LEN: usize = 4;

/// Length of a trust-center link key in `SetSecurityKey`.
pub const LINK_KEY_LEN: usize = 16;

// APS address modes.
const ADDRESS_MODE_GROUP: u8 = 0x01;
const ADDRESS_MODE_SHORT: u8 = 0x02;
const ADDRESS_MODE_IEEE: u8 = 0x03;

/// Reads big endian fields from a payload, failing with `BufferTooShort`.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], ZigbeeError> {
        let end = self.offset + len;
        let bytes = self
            .data
            .get(self.offset..end)
            .ok_or(ZigbeeError::BufferTooShort)?;
        self.offset = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, ZigbeeError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ZigbeeError> {
        Ok(u16::from_be_bytes(self.bytes(2)?.try_into()?))
    }

    fn u64(&mut self) -> Result<u64, ZigbeeError> {
        Ok(u64::from_be_bytes(self.bytes(8)?.try_into()?))
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.offset.min(self.data.len())..];
        self.offset = self.data.len();
        rest
    }
}

/// Serializes a command into a request frame.
pub fn encode_request(sequence: u8, command: &BridgeCommand) -> Result<Vec<u8>, ZigbeeError> {
    let payload = command_payload(command)?;
    let length = u16::try_from(payload.len()).map_err(|_| ZigbeeError::InvalidFrame)?;

    let mut frame = Vec::with_capacity(REQUEST_HEADER_LEN + payload.len());
    frame.push(NxpCommand::for_kind(command.kind()) as u8);
    frame.push(sequence);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn command_payload(command: &BridgeCommand) -> Result<Vec<u8>, ZigbeeError> {
    let mut out = Vec::new();
    match command {
        BridgeCommand::ErasePersistentData
        | BridgeCommand::Reset
        | BridgeCommand::GetVersion
        | BridgeCommand::StartNetwork => {}
        BridgeCommand::SetPanId {
            pan_id,
            extended_pan_id,
        } => {
            out.extend_from_slice(&extended_pan_id.to_be_bytes());
            out.extend_from_slice(&pan_id.to_be_bytes());
        }
        BridgeCommand::SetChannelMask(mask) => out.extend_from_slice(&mask.0.to_be_bytes()),
        BridgeCommand::SetSecurity {
            network_key,
            trust_center_link_key,
            link_key_type,
        } => {
            if trust_center_link_key.len() != LINK_KEY_LEN {
                return Err(ZigbeeError::InvalidFrame);
            }
            let key_type = match link_key_type {
                LinkKeyType::Global => KeyType::GlobalLinkKey,
                LinkKeyType::Unique => KeyType::UniqueLinkKey,
            };
            let network_key_len =
                u8::try_from(network_key.len()).map_err(|_| ZigbeeError::InvalidFrame)?;
            out.push(key_type as u8);
            out.extend_from_slice(trust_center_link_key);
            out.push(network_key_len);
            out.extend_from_slice(network_key);
        }
        BridgeCommand::NodeDescriptorRequest { short_address }
        | BridgeCommand::PowerDescriptorRequest { short_address } => {
            out.extend_from_slice(&short_address.to_be_bytes());
        }
        BridgeCommand::SimpleDescriptorRequest {
            short_address,
            endpoint,
        } => {
            out.extend_from_slice(&short_address.to_be_bytes());
            out.push(*endpoint);
        }
        BridgeCommand::PermitJoin {
            short_address,
            duration,
        } => {
            out.extend_from_slice(&short_address.to_be_bytes());
            out.push(*duration);
        }
        BridgeCommand::ApsDataRequest(request) => {
            match request.destination {
                DestinationAddress::Short(address) => {
                    out.push(ADDRESS_MODE_SHORT);
                    out.extend_from_slice(&address.to_be_bytes());
                }
                DestinationAddress::Group(group) => {
                    out.push(ADDRESS_MODE_GROUP);
                    out.extend_from_slice(&group.to_be_bytes());
                }
                DestinationAddress::Extended(address) => {
                    out.push(ADDRESS_MODE_IEEE);
                    out.extend_from_slice(&address.0.to_be_bytes());
                }
            }
            let payload_len =
                u16::try_from(request.payload.len()).map_err(|_| ZigbeeError::InvalidFrame)?;
            out.push(request.destination_endpoint);
            out.extend_from_slice(&request.profile_id.to_be_bytes());
            out.extend_from_slice(&request.cluster_id.to_be_bytes());
            out.push(request.source_endpoint);
            out.push(request.radius);
            out.extend_from_slice(&payload_len.to_be_bytes());
            out.extend_from_slice(&request.payload);
        }
    }
    Ok(out)
}

/// Parses a frame received from the firmware.
pub fn decode_message(frame: &[u8]) -> Result<BridgeMessage, ZigbeeError> {
    let id = *frame.first().ok_or(ZigbeeError::BufferTooShort)?;
    if id >= NOTIFICATION_ID_MIN {
        decode_notification(frame)
    } else {
        decode_response(frame).map(BridgeMessage::Response)
    }
}

/// Returns the payload after checking it against the length field, which
/// always closes the header.
fn checked_payload(frame: &[u8], header_len: usize) -> Result<&[u8], ZigbeeError> {
    if frame.len() < header_len {
        return Err(ZigbeeError::BufferTooShort);
    }
    let length = u16::from_be_bytes(frame[header_len - 2..header_len].try_into()?) as usize;
    let payload = &frame[header_len..];
    if payload.len() != length {
        debug!(
            "[NXP] Length field {} does not match payload of {} bytes.",
            length,
            payload.len()
        );
        return Err(ZigbeeError::InvalidFrame);
    }
    Ok(payload)
}

fn decode_response(frame: &[u8]) -> Result<BridgeResponse, ZigbeeError> {
    let payload = checked_payload(frame, RESPONSE_HEADER_LEN)?;
    let command = NxpCommand::try_from(frame[0])?;
    let kind = command.kind().ok_or(ZigbeeError::UnexpectedResponse)?;
    let sequence = frame[1];
    let status = BridgeStatus::from(frame[2]);

    let payload = if status.is_success() {
        response_payload(kind, payload)?
    } else {
        ResponsePayload::Empty
    };
    Ok(BridgeResponse {
        kind,
        sequence,
        status,
        payload,
    })
}

fn response_payload(kind: CommandKind, payload: &[u8]) -> Result<ResponsePayload, ZigbeeError> {
    let mut reader = Reader::new(payload);
    let decoded = match kind {
        CommandKind::GetVersion if !payload.is_empty() => {
            ResponsePayload::Version(FirmwareVersion {
                major: reader.u16()?,
                minor: reader.u16()?,
            })
        }
        CommandKind::NodeDescriptorRequest => {
            let short_address = reader.u16()?;
            let descriptor = NodeDescriptor::from_bytes(reader.bytes(NODE_DESCRIPTOR_LEN)?)?;
            let count = reader.u8()? as usize;
            let active_endpoints = reader.bytes(count)?.to_vec();
            ResponsePayload::NodeDescriptor {
                short_address,
                descriptor,
                active_endpoints,
            }
        }
        CommandKind::SimpleDescriptorRequest => ResponsePayload::SimpleDescriptor {
            short_address: reader.u16()?,
            descriptor: SimpleDescriptor::from_bytes(reader.rest())?,
        },
        CommandKind::PowerDescriptorRequest => ResponsePayload::PowerDescriptor {
            short_address: reader.u16()?,
            descriptor: PowerDescriptor::from_bytes(reader.rest())?,
        },
        CommandKind::ApsDataRequest => ResponsePayload::ApsData {
            aps_status: reader.u8()?,
            payload: reader.rest().to_vec(),
        },
        _ if payload.is_empty() => ResponsePayload::Empty,
        _ => ResponsePayload::Raw(payload.to_vec()),
    };
    Ok(decoded)
}

fn decode_notification(frame: &[u8]) -> Result<BridgeMessage, ZigbeeError> {
    let payload = checked_payload(frame, NOTIFICATION_HEADER_LEN)?;
    let notification = NxpNotification::try_from(frame[0])?;
    let sequence = frame[1];
    let mut reader = Reader::new(payload);
    trace!("[NXP] Notification {:?} seq={}", notification, sequence);

    let decoded = match notification {
        NxpNotification::NetworkStarted => {
            let status = BridgeStatus::from(reader.u8()?);
            let payload = if status.is_success() {
                ResponsePayload::NetworkStarted {
                    short_address: reader.u16()?,
                    extended_address: ExtendedAddress(reader.u64()?),
                    channel: reader.u8()?,
                }
            } else {
                ResponsePayload::Empty
            };
            return Ok(BridgeMessage::Response(BridgeResponse {
                kind: CommandKind::StartNetwork,
                sequence,
                status,
                payload,
            }));
        }
        NxpNotification::DeviceStatusChanged => {
            BridgeNotification::ControllerStateChanged(reader.u8()?)
        }
        NxpNotification::DebugMessage => {
            let level = log_level(reader.u8()?);
            let text = String::from_utf8_lossy(reader.rest()).into_owned();
            BridgeNotification::Log { level, text }
        }
        NxpNotification::DeviceAnnounce => BridgeNotification::DeviceAnnounce {
            short_address: reader.u16()?,
            extended_address: ExtendedAddress(reader.u64()?),
            mac_capabilities: MacCapabilities::from_bits_truncate(reader.u8()?),
        },
        NxpNotification::LeaveIndication => BridgeNotification::LeaveIndication {
            extended_address: ExtendedAddress(reader.u64()?),
            rejoin: reader.u8()? != 0,
        },
        NxpNotification::AttributeReport => {
            let source_address = reader.u16()?;
            let endpoint = reader.u8()?;
            let cluster_id = reader.u16()?;
            let attribute_id = reader.u16()?;
            let status = reader.u8()?;
            let data_type = reader.u8()?;
            let length = reader.u16()? as usize;
            let data = reader.rest();
            if data.len() != length {
                return Err(ZigbeeError::InvalidFrame);
            }
            BridgeNotification::AttributeReport(AttributeReport {
                source_address,
                endpoint,
                cluster_id,
                attribute_id,
                status,
                data_type,
                data: data.to_vec(),
            })
        }
        NxpNotification::NodeClusterList => BridgeNotification::NodeClusterList {
            source_address: reader.u16()?,
            endpoint: reader.u8()?,
            profile_id: reader.u16()?,
            direction: match reader.u8()? {
                0 => ClusterDirection::Input,
                _ => ClusterDirection::Output,
            },
            cluster_ids: u16_list(reader.rest())?,
        },
        NxpNotification::NodeAttributeList => BridgeNotification::NodeAttributeList {
            source_address: reader.u16()?,
            endpoint: reader.u8()?,
            profile_id: reader.u16()?,
            cluster_id: reader.u16()?,
            attribute_ids: u16_list(reader.rest())?,
        },
        NxpNotification::NodeCommandIdList => BridgeNotification::NodeCommandIdList {
            source_address: reader.u16()?,
            endpoint: reader.u8()?,
            profile_id: reader.u16()?,
            cluster_id: reader.u16()?,
            command_ids: reader.rest().to_vec(),
        },
    };
    Ok(BridgeMessage::Notification(decoded))
}

fn u16_list(data: &[u8]) -> Result<Vec<u16>, ZigbeeError> {
    if data.len() % 2 != 0 {
        return Err(ZigbeeError::InvalidFrame);
    }
    Ok(data
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use zigbee_rs::ChannelMask;
    use zigbee_rs::network::NetworkRequest;
    use zigbee_rs::zdp::LogicalType;

    fn response_frame(command: u8, sequence: u8, status: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![command, sequence, status];
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    fn notification_frame(id: u8, sequence: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![id, sequence];
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_encode_set_pan_id() {
        let frame = encode_request(
            7,
            &BridgeCommand::SetPanId {
                pan_id: 0x1A62,
                extended_pan_id: 0x0011_2233_4455_6677,
            },
        )
        .unwrap();
        assert_eq!(
            frame,
            vec![
                0x04, 7, 0x00, 0x0A, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x1A, 0x62
            ]
        );
    }

    #[test]
    fn test_encode_channel_mask_and_empty_commands() {
        let frame =
            encode_request(1, &BridgeCommand::SetChannelMask(ChannelMask(1 << 15))).unwrap();
        assert_eq!(frame, vec![0x05, 1, 0x00, 0x04, 0x00, 0x00, 0x80, 0x00]);

        let frame = encode_request(2, &BridgeCommand::ErasePersistentData).unwrap();
        assert_eq!(frame, vec![0x03, 2, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_security_requires_sixteen_byte_link_key() {
        let command = BridgeCommand::SetSecurity {
            network_key: vec![0xAA; 16],
            trust_center_link_key: b"ZigBeeAlliance09".to_vec(),
            link_key_type: LinkKeyType::Unique,
        };
        let frame = encode_request(3, &command).unwrap();
        assert_eq!(&frame[..5], &[0x06, 3, 0x00, 34, KeyType::UniqueLinkKey as u8]);
        assert_eq!(&frame[5..21], b"ZigBeeAlliance09");
        assert_eq!(frame[21], 16);

        let command = BridgeCommand::SetSecurity {
            network_key: vec![],
            trust_center_link_key: vec![1, 2, 3],
            link_key_type: LinkKeyType::Global,
        };
        assert_eq!(encode_request(3, &command), Err(ZigbeeError::InvalidFrame));
    }

    #[test]
    fn test_encode_aps_data_request() {
        let request = NetworkRequest::new(0x1234, 11, 0x0006, vec![0x01, 0x02, 0x01]);
        let frame = encode_request(9, &BridgeCommand::ApsDataRequest(request)).unwrap();
        assert_eq!(
            frame,
            vec![
                0x0D, 9, 0x00, 15, // header
                ADDRESS_MODE_SHORT, 0x12, 0x34, 11, 0x01, 0x04, 0x00, 0x06, 1, 0, 0x00, 0x03,
                0x01, 0x02, 0x01,
            ]
        );
    }

    #[test]
    fn test_decode_version_response() {
        let frame = response_frame(0x00, 4, 0, &[0x00, 0x03, 0x03, 0x20]);
        assert_eq!(
            decode_message(&frame).unwrap(),
            BridgeMessage::Response(BridgeResponse {
                kind: CommandKind::GetVersion,
                sequence: 4,
                status: BridgeStatus::Success,
                payload: ResponsePayload::Version(FirmwareVersion {
                    major: 3,
                    minor: 0x0320
                }),
            })
        );

        // Older firmware answers without a version.
        let frame = response_frame(0x00, 4, 0, &[]);
        match decode_message(&frame).unwrap() {
            BridgeMessage::Response(response) => assert_eq!(response.payload, ResponsePayload::Empty),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_decode_failure_status_drops_payload() {
        let frame = response_frame(0x05, 2, 0x04, &[0xFF]);
        match decode_message(&frame).unwrap() {
            BridgeMessage::Response(response) => {
                assert_eq!(response.kind, CommandKind::SetChannelMask);
                assert_eq!(response.status, BridgeStatus::StackError);
                assert_eq!(response.payload, ResponsePayload::Empty);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_decode_node_descriptor_response() {
        let descriptor = NodeDescriptor {
            logical_type: LogicalType::Router,
            complex_descriptor_available: false,
            user_descriptor_available: false,
            frequency_band: 0x08,
            mac_capabilities: MacCapabilities::FULL_FUNCTION_DEVICE,
            manufacturer_code: 0x1037,
            maximum_buffer_size: 0x7F,
            maximum_rx_size: 0x64,
            server_mask: 0,
            maximum_tx_size: 0x64,
            descriptor_capabilities: 0,
        };
        let mut payload = vec![0x12, 0x34];
        payload.extend_from_slice(&descriptor.to_bytes());
        payload.extend_from_slice(&[2, 11, 242]);

        let frame = response_frame(0x0A, 8, 0, &payload);
        match decode_message(&frame).unwrap() {
            BridgeMessage::Response(response) => assert_eq!(
                response.payload,
                ResponsePayload::NodeDescriptor {
                    short_address: 0x1234,
                    descriptor,
                    active_endpoints: vec![11, 242],
                }
            ),
            other => panic!("unexpected message {:?}", other),
        }

        // Endpoint count larger than the remaining bytes.
        let truncated = response_frame(0x0A, 8, 0, &payload[..payload.len() - 1]);
        assert_eq!(decode_message(&truncated), Err(ZigbeeError::BufferTooShort));
    }

    #[test]
    fn test_network_started_answers_start_network() {
        let mut payload = vec![0x00, 0x00, 0x00];
        payload.extend_from_slice(&0x0015_8D00_0102_0304u64.to_be_bytes());
        payload.push(15);
        let frame = notification_frame(0x7E, 6, &payload);
        assert_eq!(
            decode_message(&frame).unwrap(),
            BridgeMessage::Response(BridgeResponse {
                kind: CommandKind::StartNetwork,
                sequence: 6,
                status: BridgeStatus::Success,
                payload: ResponsePayload::NetworkStarted {
                    short_address: 0,
                    extended_address: ExtendedAddress(0x0015_8D00_0102_0304),
                    channel: 15,
                },
            })
        );
    }

    #[test]
    fn test_decode_attribute_report() {
        let payload = [
            0x12, 0x34, 11, 0x00, 0x06, 0x00, 0x00, 0x00, 0x10, 0x00, 0x01, 0x01,
        ];
        let frame = notification_frame(0x82, 0, &payload);
        assert_eq!(
            decode_message(&frame).unwrap(),
            BridgeMessage::Notification(BridgeNotification::AttributeReport(AttributeReport {
                source_address: 0x1234,
                endpoint: 11,
                cluster_id: 0x0006,
                attribute_id: 0x0000,
                status: 0,
                data_type: 0x10,
                data: vec![0x01],
            }))
        );

        // Inner length says two bytes, only one follows.
        let mut bad = payload;
        bad[10] = 0x02;
        let frame = notification_frame(0x82, 0, &bad);
        assert_eq!(decode_message(&frame), Err(ZigbeeError::InvalidFrame));
    }

    #[test]
    fn test_decode_announce_leave_and_lists() {
        let mut payload = vec![0x56, 0x78];
        payload.extend_from_slice(&0x0012_4B00_01AB_CDEFu64.to_be_bytes());
        payload.push(0x8E);
        match decode_message(&notification_frame(0x80, 0, &payload)).unwrap() {
            BridgeMessage::Notification(BridgeNotification::DeviceAnnounce {
                short_address,
                extended_address,
                mac_capabilities,
            }) => {
                assert_eq!(short_address, 0x5678);
                assert_eq!(extended_address, ExtendedAddress(0x0012_4B00_01AB_CDEF));
                assert_eq!(mac_capabilities.bits(), 0x8E);
            }
            other => panic!("unexpected message {:?}", other),
        }

        let mut payload = 0x0012_4B00_01AB_CDEFu64.to_be_bytes().to_vec();
        payload.push(1);
        assert_eq!(
            decode_message(&notification_frame(0x81, 0, &payload)).unwrap(),
            BridgeMessage::Notification(BridgeNotification::LeaveIndication {
                extended_address: ExtendedAddress(0x0012_4B00_01AB_CDEF),
                rejoin: true,
            })
        );

        let payload = [0x12, 0x34, 11, 0x01, 0x04, 0x01, 0x00, 0x00, 0x00, 0x06];
        assert_eq!(
            decode_message(&notification_frame(0x83, 0, &payload)).unwrap(),
            BridgeMessage::Notification(BridgeNotification::NodeClusterList {
                source_address: 0x1234,
                endpoint: 11,
                profile_id: 0x0104,
                direction: ClusterDirection::Output,
                cluster_ids: vec![0x0000, 0x0006],
            })
        );
        // Odd number of list bytes.
        assert_eq!(
            decode_message(&notification_frame(0x83, 0, &payload[..9])),
            Err(ZigbeeError::InvalidFrame)
        );
    }

    #[test]
    fn test_decode_debug_message() {
        let frame = notification_frame(0xFE, 0, b"\x04link quality low");
        assert_eq!(
            decode_message(&frame).unwrap(),
            BridgeMessage::Notification(BridgeNotification::Log {
                level: log::Level::Warn,
                text: String::from("link quality low"),
            })
        );
    }

    #[test]
    fn test_malformed_frames() {
        assert_eq!(decode_message(&[]), Err(ZigbeeError::BufferTooShort));
        assert_eq!(decode_message(&[0x00, 1, 0, 0x00]), Err(ZigbeeError::BufferTooShort));
        // Length field says 3, payload has 1 byte.
        assert_eq!(
            decode_message(&[0x00, 1, 0, 0x00, 0x03, 0xFF]),
            Err(ZigbeeError::InvalidFrame)
        );
        assert_eq!(
            decode_message(&[0x42, 1, 0, 0x00, 0x00]),
            Err(ZigbeeError::UnknownCommand(0x42))
        );
        assert_eq!(
            decode_message(&[0x90, 1, 0x00, 0x00]),
            Err(ZigbeeError::UnknownNotification(0x90))
        );
        // Never answered: the core does not send it.
        assert_eq!(
            decode_message(&[0x08, 1, 0, 0x00, 0x00]),
            Err(ZigbeeError::UnexpectedResponse)
        );
    }
}
