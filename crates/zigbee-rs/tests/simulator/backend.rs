// crates/zigbee-rs/tests/simulator/backend.rs
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use zigbee_rs::{
    BridgeBackend, BridgeCommand, BridgeMessage, BridgeResponse, BridgeStatus, CommandKind,
    ResponsePayload, ZigbeeError,
};

/// Commands encoded by the back-end, with their sequence numbers, in the
/// order they were sent. Shared with the simulated controller.
pub type CommandLog = Rc<RefCell<VecDeque<(u8, BridgeCommand)>>>;

const KINDS: [CommandKind; 12] = [
    CommandKind::ErasePersistentData,
    CommandKind::Reset,
    CommandKind::GetVersion,
    CommandKind::SetPanId,
    CommandKind::SetChannelMask,
    CommandKind::SetSecurity,
    CommandKind::StartNetwork,
    CommandKind::NodeDescriptorRequest,
    CommandKind::SimpleDescriptorRequest,
    CommandKind::PowerDescriptorRequest,
    CommandKind::PermitJoin,
    CommandKind::ApsDataRequest,
];

pub fn kind_code(kind: CommandKind) -> u8 {
    KINDS.iter().position(|k| *k == kind).unwrap_or(0xFF) as u8
}

pub fn kind_from_code(code: u8) -> Result<CommandKind, ZigbeeError> {
    KINDS
        .get(code as usize)
        .copied()
        .ok_or(ZigbeeError::UnknownCommand(code))
}

/// A test back-end. Commands are encoded as `[kind, sequence]`; the only
/// frames it decodes are bare responses `[kind, sequence, status]`.
pub struct MockBackend {
    pub commands: CommandLog,
}

impl MockBackend {
    pub fn new() -> (Self, CommandLog) {
        let commands: CommandLog = Rc::new(RefCell::new(VecDeque::new()));
        (
            Self {
                commands: commands.clone(),
            },
            commands,
        )
    }
}

impl BridgeBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn encode_command(&self, sequence: u8, command: &BridgeCommand) -> Result<Vec<u8>, ZigbeeError> {
        self.commands
            .borrow_mut()
            .push_back((sequence, command.clone()));
        Ok(vec![kind_code(command.kind()), sequence])
    }

    fn decode_message(&self, frame: &[u8]) -> Result<BridgeMessage, ZigbeeError> {
        match frame {
            [code, sequence, status] => Ok(BridgeMessage::Response(BridgeResponse {
                kind: kind_from_code(*code)?,
                sequence: *sequence,
                status: BridgeStatus::from(*status),
                payload: ResponsePayload::Empty,
            })),
            [] | [_] | [_, _] => Err(ZigbeeError::BufferTooShort),
            _ => Err(ZigbeeError::InvalidFrame),
        }
    }
}
