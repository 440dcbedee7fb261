mod protocol;
mod reconcile;
mod replication;
mod stats;
mod transport;

pub use protocol::{
    sequence_greater_than, ArchivedPacket, CorrectionSnapshot, NetMessage, Packet, PacketError,
    PacketHeader, Reliability, ReplicatedField, WeaponCorrection, MAX_PACKET_SIZE,
    PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
pub use reconcile::{CorrectionTimer, ReconcileConfig, Timestamped};
pub use replication::{route, Outgoing, ReplicatedState, Target};
pub use stats::{NetRng, NetworkStats, PacketLossSimulation, RttEstimator};
pub use transport::{LoopbackEndpoint, LoopbackNetwork, PeerId, Transport, SERVER_PEER};
