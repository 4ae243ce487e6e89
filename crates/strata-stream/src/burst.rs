//! Teleport detection and velocity-based prediction of the observer.

use glam::Vec3;

/// Raises the per-tick budget for a while after the observer jumps.
#[derive(Clone, Debug)]
pub struct BurstController {
    threshold: f32,
    multiplier: u32,
    duration_ticks: u32,
    remaining: u32,
    last_position: Option<Vec3>,
}

impl BurstController {
    /// `threshold` is the per-tick displacement (world units) treated as a
    /// teleport.
    pub fn new(threshold: f32, multiplier: u32, duration_ticks: u32) -> Self {
        Self {
            threshold,
            multiplier: multiplier.max(1),
            duration_ticks,
            remaining: 0,
            last_position: None,
        }
    }

    /// Feeds this tick's observer position. Returns the displacement since
    /// the previous tick and whether it counted as a teleport.
    pub fn observe(&mut self, position: Vec3) -> (Vec3, bool) {
        self.remaining = self.remaining.saturating_sub(1);
        let Some(last) = self.last_position.replace(position) else {
            return (Vec3::ZERO, false);
        };
        let displacement = position - last;
        let teleported = displacement.length() > self.threshold;
        if teleported {
            self.remaining = self.duration_ticks;
        }
        (displacement, teleported)
    }

    /// Returns `true` while a burst is running.
    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Multiplier for this tick's budgets.
    pub fn scale(&self) -> u32 {
        if self.is_active() { self.multiplier } else { 1 }
    }

    /// Ticks left in the current burst.
    pub fn remaining_ticks(&self) -> u32 {
        self.remaining
    }
}

/// Where the observer is expected to be `seconds` from now, travelling at
/// `velocity`, never more than `max_lead` away from `position`.
pub fn predicted_position(position: Vec3, velocity: Vec3, seconds: f32, max_lead: f32) -> Vec3 {
    let lead = velocity * seconds.max(0.0);
    position + lead.clamp_length_max(max_lead.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walking_never_bursts() {
        let mut burst = BurstController::new(10.0, 4, 3);
        for i in 0..20 {
            let (_, teleported) = burst.observe(Vec3::new(i as f32, 0.0, 0.0));
            assert!(!teleported);
        }
        assert_eq!(burst.scale(), 1);
    }

    #[test]
    fn test_teleport_bursts_for_duration() {
        let mut burst = BurstController::new(10.0, 4, 3);
        burst.observe(Vec3::ZERO);
        let (displacement, teleported) = burst.observe(Vec3::new(500.0, 0.0, 0.0));
        assert!(teleported);
        assert_eq!(displacement.x, 500.0);
        assert_eq!(burst.scale(), 4);

        let at = Vec3::new(500.0, 0.0, 0.0);
        burst.observe(at);
        burst.observe(at);
        assert!(burst.is_active());
        burst.observe(at);
        assert!(!burst.is_active(), "burst restores the normal budget afterwards");
        assert_eq!(burst.scale(), 1);
    }

    #[test]
    fn test_first_observation_is_not_a_teleport() {
        let mut burst = BurstController::new(1.0, 2, 5);
        let (_, teleported) = burst.observe(Vec3::splat(1.0e6));
        assert!(!teleported);
    }

    #[test]
    fn test_prediction_is_capped() {
        let p = predicted_position(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), 1.0, 16.0);
        assert_eq!(p, Vec3::new(16.0, 0.0, 0.0));
        let p = predicted_position(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 1.5, 16.0);
        assert_eq!(p, Vec3::new(3.0, 0.0, 0.0));
    }
}
