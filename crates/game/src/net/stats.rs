use serde::{Deserialize, Serialize};

/// Artificial loss and latency applied by the loopback network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    /// Fraction of unreliable packets dropped, `0.0..=1.0`.
    pub loss_rate: f32,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
}

impl PacketLossSimulation {
    pub fn should_drop(&self, rng: &mut NetRng) -> bool {
        if !self.enabled || self.loss_rate <= 0.0 {
            return false;
        }
        rng.next_unit() < self.loss_rate
    }

    pub fn delay_ms(&self, rng: &mut NetRng) -> u32 {
        if !self.enabled || self.max_latency_ms == 0 {
            return 0;
        }
        let base = self.min_latency_ms;
        let range = self.max_latency_ms.saturating_sub(self.min_latency_ms);
        let jitter = if self.jitter_ms > 0 {
            (rng.next_unit() * self.jitter_ms as f32) as u32
        } else {
            0
        };
        base + (rng.next_unit() * range as f32) as u32 + jitter
    }
}

/// Seeded xorshift so lossy runs are reproducible.
#[derive(Debug, Clone)]
pub struct NetRng(u64);

impl NetRng {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn next_unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Smoothed round trip time in seconds, fed by ping/pong samples.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    srtt: f32,
    rtt_var: f32,
    samples: u32,
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RttEstimator {
    pub fn new() -> Self {
        Self {
            srtt: 0.1,
            rtt_var: 0.05,
            samples: 0,
        }
    }

    pub fn update(&mut self, rtt: f32) {
        const ALPHA: f32 = 0.125;
        const BETA: f32 = 0.25;

        if !rtt.is_finite() || rtt < 0.0 {
            log::warn!("discarding rtt sample {rtt}");
            return;
        }

        if self.samples == 0 {
            self.srtt = rtt;
            self.rtt_var = rtt / 2.0;
        } else {
            let diff = (rtt - self.srtt).abs();
            self.rtt_var = (1.0 - BETA) * self.rtt_var + BETA * diff;
            self.srtt = (1.0 - ALPHA) * self.srtt + ALPHA * rtt;
        }
        self.samples += 1;
    }

    pub fn srtt(&self) -> f32 {
        self.srtt
    }

    pub fn rtt_var(&self) -> f32 {
        self.rtt_var
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}
