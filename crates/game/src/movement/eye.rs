/// Eye height relative to the feet, eased toward a target with a cubic
/// curve so posture changes do not snap the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct EyeHeightBlend {
    current: f32,
    prev: f32,
    target: f32,
    alpha: f32,
    blend_time: f32,
}

impl EyeHeightBlend {
    const MIN_BLEND_TIME: f32 = 1e-4;

    pub fn new(height: f32) -> Self {
        Self {
            current: height,
            prev: height,
            target: height,
            alpha: 1.0,
            blend_time: 0.0,
        }
    }

    pub fn blend_to(&mut self, target: f32, blend_time: f32) {
        self.prev = self.current;
        self.target = target;
        self.blend_time = blend_time;

        if blend_time > Self::MIN_BLEND_TIME {
            self.alpha = 0.0;
        } else {
            self.alpha = 1.0;
            self.current = target;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if self.alpha >= 1.0 {
            return;
        }

        self.alpha = (self.alpha + dt / self.blend_time).clamp(0.0, 1.0);
        self.current = cubic_interp(self.prev, self.target, self.alpha);
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_blending(&self) -> bool {
        self.alpha < 1.0
    }
}

/// Hermite interpolation with zero tangents at both ends.
fn cubic_interp(from: f32, to: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    from * (2.0 * t3 - 3.0 * t2 + 1.0) + to * (3.0 * t2 - 2.0 * t3)
}
