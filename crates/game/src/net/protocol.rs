use rkyv::{rancor, Archive, Deserialize, Serialize};

use crate::input::{InputAction, InputKind};
use crate::movement::Posture;
use crate::weapon::{FireMode, WeaponState};

pub const MAX_PACKET_SIZE: usize = 1200;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x5354_4E43;

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

#[inline]
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    Reliable,
    Unreliable,
}

/// One replicated property, sent authority to the other peers on change.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ReplicatedField {
    Posture(Posture),
    Sprinting(bool),
    Equipped(Option<u8>),
    Clip(u8),
    FireMode(FireMode),
    WeaponState(WeaponState),
    Aiming(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct WeaponCorrection {
    /// Inventory slot the values were captured from.
    pub slot: u8,
    pub clip: u8,
    pub fire_mode: FireMode,
    pub state: WeaponState,
    pub aiming: bool,
}

/// Authoritative values at send time, for the owning client only.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct CorrectionSnapshot {
    pub posture: Posture,
    pub sprinting: bool,
    pub weapon: Option<WeaponCorrection>,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum NetMessage {
    Input {
        action: InputAction,
        kind: InputKind,
        seed: u32,
    },
    Replicated(ReplicatedField),
    Correction(CorrectionSnapshot),
    FiringChanged {
        firing: bool,
        seed: u32,
    },
    Ping {
        timestamp: u64,
    },
    Pong {
        timestamp: u64,
    },
}

impl NetMessage {
    pub fn reliability(&self) -> Reliability {
        match self {
            Self::Correction(_) | Self::Ping { .. } | Self::Pong { .. } => Reliability::Unreliable,
            Self::Input { .. } | Self::Replicated(_) | Self::FiringChanged { .. } => {
                Reliability::Reliable
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub entity_id: u32,
    pub message: NetMessage,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("packet of {0} bytes exceeds MTU")]
    TooLarge(usize),
    #[error("bad magic or protocol version")]
    InvalidHeader,
}

impl Packet {
    pub fn new(sequence: u32, entity_id: u32, message: NetMessage) -> Self {
        Self {
            header: PacketHeader::new(sequence),
            entity_id,
            message,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        let data = rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)?;

        if data.len() > MAX_PACKET_SIZE {
            return Err(PacketError::TooLarge(data.len()));
        }
        Ok(data)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        let packet =
            rkyv::from_bytes::<Self, rancor::Error>(data).map_err(PacketError::Deserialize)?;

        if !packet.header.is_valid() {
            return Err(PacketError::InvalidHeader);
        }
        Ok(packet)
    }
}
