/// Timing handed to every state machine for one tick.
///
/// `now` is simulation time and drives lockouts and weapon timers. `real_now`
/// is wall-clock time and is only used to judge how stale a locally
/// predicted value is.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    pub now: f32,
    pub real_now: f32,
    pub dt: f32,
}

impl FrameTime {
    pub fn new(now: f32, real_now: f32, dt: f32) -> Self {
        Self { now, real_now, dt }
    }

    pub fn advance(self, dt: f32) -> Self {
        Self {
            now: self.now + dt,
            real_now: self.real_now + dt,
            dt,
        }
    }
}

pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
    sim_time: f32,
    real_time: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
            sim_time: 0.0,
            real_time: 0.0,
        }
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Feeds wall-clock time. Real time advances unclamped, the simulation
    /// accumulator is clamped so a long stall does not trigger a tick storm.
    pub fn accumulate(&mut self, delta: f32) {
        self.real_time += delta;
        self.accumulator += delta.min(0.25);
    }

    pub fn consume_tick(&mut self) -> Option<FrameTime> {
        if self.accumulator < self.dt {
            return None;
        }

        self.accumulator -= self.dt;
        self.sim_time += self.dt;
        Some(FrameTime::new(self.sim_time, self.real_time, self.dt))
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(60);

        ts.accumulate(1.0 / 30.0);
        assert!(ts.consume_tick().is_some());
        assert!(ts.consume_tick().is_some());
        assert!(ts.consume_tick().is_none());
    }

    #[test]
    fn stall_is_clamped_for_simulation_only() {
        let mut ts = FixedTimestep::new(10);

        ts.accumulate(2.0);
        let mut ticks = 0;
        let mut last = FrameTime::default();
        while let Some(time) = ts.consume_tick() {
            ticks += 1;
            last = time;
        }

        assert_eq!(ticks, 2);
        assert!((last.real_now - 2.0).abs() < 1e-6);
        assert!((last.now - 0.2).abs() < 1e-5);
    }
}
