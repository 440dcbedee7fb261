use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;

use super::protocol::{NetMessage, Packet, PacketError, Reliability};
use super::stats::{NetRng, NetworkStats, PacketLossSimulation};

pub type PeerId = u32;

pub const SERVER_PEER: PeerId = 0;

/// Datagram-style packet exchange between peers.
pub trait Transport {
    fn local_peer(&self) -> PeerId;

    fn send(&mut self, to: PeerId, packet: &Packet) -> Result<usize, PacketError>;

    /// Drains every packet that has arrived. Undecodable packets are skipped.
    fn receive(&mut self) -> Vec<(PeerId, Packet)>;
}

#[derive(Debug)]
struct DelayedPacket {
    release_time: f32,
    order: u64,
    from: PeerId,
    to: PeerId,
    data: Vec<u8>,
}

impl PartialEq for DelayedPacket {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DelayedPacket {}

impl PartialOrd for DelayedPacket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedPacket {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .release_time
            .total_cmp(&self.release_time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

#[derive(Debug)]
struct Hub {
    now: f32,
    order: u64,
    rng: NetRng,
    conditions: HashMap<PeerId, PacketLossSimulation>,
    in_flight: BinaryHeap<DelayedPacket>,
    arrived: HashMap<PeerId, Vec<(PeerId, Vec<u8>)>>,
    last_reliable_release: HashMap<(PeerId, PeerId), f32>,
    stats: HashMap<PeerId, NetworkStats>,
}

impl Hub {
    fn enqueue(&mut self, from: PeerId, to: PeerId, data: Vec<u8>, reliability: Reliability) {
        let sim = self.conditions.get(&to).cloned().unwrap_or_default();

        if reliability == Reliability::Unreliable && sim.should_drop(&mut self.rng) {
            self.stats.entry(from).or_default().packets_dropped += 1;
            log::trace!("dropped packet {from} -> {to}");
            return;
        }

        let mut release_time = self.now + sim.delay_ms(&mut self.rng) as f32 / 1000.0;
        if reliability == Reliability::Reliable {
            let last = self
                .last_reliable_release
                .entry((from, to))
                .or_insert(f32::NEG_INFINITY);
            release_time = release_time.max(*last);
            *last = release_time;
        }

        self.order += 1;
        self.in_flight.push(DelayedPacket {
            release_time,
            order: self.order,
            from,
            to,
            data,
        });
    }

    fn release_due(&mut self) {
        while self
            .in_flight
            .peek()
            .is_some_and(|delayed| delayed.release_time <= self.now)
        {
            let Some(delayed) = self.in_flight.pop() else {
                break;
            };
            self.arrived
                .entry(delayed.to)
                .or_default()
                .push((delayed.from, delayed.data));
        }
    }
}

/// In-process network connecting any number of peers. Time only moves when
/// `advance` is called, so runs are deterministic for a given seed.
///
/// Reliable packets are never dropped and arrive in send order per peer
/// pair. Unreliable packets may be dropped or overtaken.
#[derive(Debug, Clone)]
pub struct LoopbackNetwork {
    hub: Rc<RefCell<Hub>>,
}

impl LoopbackNetwork {
    pub fn new(seed: u64) -> Self {
        Self {
            hub: Rc::new(RefCell::new(Hub {
                now: 0.0,
                order: 0,
                rng: NetRng::new(seed),
                conditions: HashMap::new(),
                in_flight: BinaryHeap::new(),
                arrived: HashMap::new(),
                last_reliable_release: HashMap::new(),
                stats: HashMap::new(),
            })),
        }
    }

    pub fn endpoint(&self, peer: PeerId) -> LoopbackEndpoint {
        LoopbackEndpoint {
            peer,
            send_sequence: 0,
            hub: Rc::clone(&self.hub),
        }
    }

    /// Conditions applied to packets addressed to `peer`.
    pub fn set_conditions(&self, peer: PeerId, conditions: PacketLossSimulation) {
        let mut hub = self.hub.borrow_mut();
        if conditions.enabled {
            hub.conditions.insert(peer, conditions);
        } else {
            hub.conditions.remove(&peer);
        }
    }

    pub fn advance(&self, dt: f32) {
        let mut hub = self.hub.borrow_mut();
        hub.now += dt;
        hub.release_due();
    }

    pub fn in_flight(&self) -> usize {
        self.hub.borrow().in_flight.len()
    }

    pub fn stats(&self, peer: PeerId) -> NetworkStats {
        self.hub
            .borrow()
            .stats
            .get(&peer)
            .cloned()
            .unwrap_or_default()
    }
}

pub struct LoopbackEndpoint {
    peer: PeerId,
    send_sequence: u32,
    hub: Rc<RefCell<Hub>>,
}

impl LoopbackEndpoint {
    pub fn create_packet(&mut self, entity_id: u32, message: NetMessage) -> Packet {
        let sequence = self.send_sequence;
        self.send_sequence = self.send_sequence.wrapping_add(1);
        Packet::new(sequence, entity_id, message)
    }

    pub fn send_message(
        &mut self,
        to: PeerId,
        entity_id: u32,
        message: NetMessage,
    ) -> Result<usize, PacketError> {
        let packet = self.create_packet(entity_id, message);
        self.send(to, &packet)
    }
}

impl Transport for LoopbackEndpoint {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn send(&mut self, to: PeerId, packet: &Packet) -> Result<usize, PacketError> {
        let data = packet.serialize()?;
        let bytes = data.len();

        let mut hub = self.hub.borrow_mut();
        let stats = hub.stats.entry(self.peer).or_default();
        stats.packets_sent += 1;
        stats.bytes_sent += bytes as u64;

        hub.enqueue(self.peer, to, data, packet.message.reliability());
        hub.release_due();
        Ok(bytes)
    }

    fn receive(&mut self) -> Vec<(PeerId, Packet)> {
        let mut hub = self.hub.borrow_mut();
        let arrived = hub.arrived.remove(&self.peer).unwrap_or_default();

        let mut packets = Vec::with_capacity(arrived.len());
        for (from, data) in arrived {
            match Packet::deserialize(&data) {
                Ok(packet) => {
                    let stats = hub.stats.entry(self.peer).or_default();
                    stats.packets_received += 1;
                    stats.bytes_received += data.len() as u64;
                    packets.push((from, packet));
                }
                Err(e) => log::warn!("peer {} dropped undecodable packet: {e}", self.peer),
            }
        }
        packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(timestamp: u64) -> NetMessage {
        NetMessage::Ping { timestamp }
    }

    #[test]
    fn zero_latency_delivers_immediately() {
        let network = LoopbackNetwork::new(1);
        let mut server = network.endpoint(SERVER_PEER);
        let mut client = network.endpoint(1);

        client.send_message(SERVER_PEER, 1, ping(5)).unwrap();

        let received = server.receive();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, 1);
        assert_eq!(received[0].1.message, ping(5));
    }

    #[test]
    fn latency_holds_packets_until_advanced() {
        let network = LoopbackNetwork::new(1);
        network.set_conditions(
            SERVER_PEER,
            PacketLossSimulation {
                enabled: true,
                min_latency_ms: 50,
                max_latency_ms: 50,
                ..Default::default()
            },
        );
        let mut server = network.endpoint(SERVER_PEER);
        let mut client = network.endpoint(1);

        client.send_message(SERVER_PEER, 1, ping(1)).unwrap();
        assert!(server.receive().is_empty());

        network.advance(0.03);
        assert!(server.receive().is_empty());
        network.advance(0.03);
        assert_eq!(server.receive().len(), 1);
    }

    #[test]
    fn reliable_survives_total_loss_in_order() {
        let network = LoopbackNetwork::new(9);
        network.set_conditions(
            1,
            PacketLossSimulation {
                enabled: true,
                loss_rate: 1.0,
                min_latency_ms: 10,
                max_latency_ms: 80,
                ..Default::default()
            },
        );
        let mut server = network.endpoint(SERVER_PEER);
        let mut client = network.endpoint(1);

        for seed in 0..10 {
            let message = NetMessage::FiringChanged { firing: true, seed };
            server.send_message(1, 1, message).unwrap();
            server.send_message(1, 1, ping(u64::from(seed))).unwrap();
        }
        network.advance(1.0);

        let seeds: Vec<u32> = client
            .receive()
            .into_iter()
            .filter_map(|(_, packet)| match packet.message {
                NetMessage::FiringChanged { seed, .. } => Some(seed),
                _ => None,
            })
            .collect();
        assert_eq!(seeds, (0..10).collect::<Vec<_>>());
        assert_eq!(network.stats(SERVER_PEER).packets_dropped, 10);
    }
}
