//! Scripted observer movement.

use glam::Vec3;

/// One leg of the scripted tour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Leg {
    /// Move at constant velocity for `ticks` ticks.
    Walk { velocity: Vec3, ticks: u32 },
    /// Stand still for `ticks` ticks.
    Wait { ticks: u32 },
    /// Jump to `to` in a single tick.
    Teleport { to: Vec3 },
}

impl Leg {
    fn ticks(&self) -> u32 {
        match *self {
            Leg::Walk { ticks, .. } | Leg::Wait { ticks } => ticks,
            Leg::Teleport { .. } => 1,
        }
    }
}

/// Steps an observer through a list of legs at a fixed timestep.
#[derive(Clone, Debug)]
pub struct ObserverPath {
    legs: Vec<Leg>,
    leg: usize,
    tick_in_leg: u32,
    position: Vec3,
    dt: f32,
}

impl ObserverPath {
    pub fn new(start: Vec3, dt: f32, legs: Vec<Leg>) -> Self {
        Self {
            legs,
            leg: 0,
            tick_in_leg: 0,
            position: start,
            dt,
        }
    }

    /// The default tour: walk east, pause, teleport far away, walk back
    /// toward the start, and return home.
    pub fn tour(chunk_world_size: f32, dt: f32) -> Self {
        let start = Vec3::new(0.5, 1.5, 0.5) * chunk_world_size;
        let speed = chunk_world_size * 4.0;
        Self::new(
            start,
            dt,
            vec![
                Leg::Wait { ticks: 60 },
                Leg::Walk {
                    velocity: Vec3::X * speed,
                    ticks: 240,
                },
                Leg::Wait { ticks: 60 },
                Leg::Teleport {
                    to: start + Vec3::new(0.0, 0.0, 64.0 * chunk_world_size),
                },
                Leg::Walk {
                    velocity: Vec3::NEG_Z * speed,
                    ticks: 120,
                },
                Leg::Teleport { to: start },
                Leg::Wait { ticks: 120 },
            ],
        )
    }

    /// Total ticks in the tour.
    pub fn total_ticks(&self) -> u32 {
        self.legs.iter().map(Leg::ticks).sum()
    }
}

impl Iterator for ObserverPath {
    type Item = Vec3;

    fn next(&mut self) -> Option<Vec3> {
        let leg = *self.legs.get(self.leg)?;
        match leg {
            Leg::Walk { velocity, .. } => self.position += velocity * self.dt,
            Leg::Wait { .. } => {}
            Leg::Teleport { to } => self.position = to,
        }
        self.tick_in_leg += 1;
        if self.tick_in_leg >= leg.ticks() {
            self.leg += 1;
            self.tick_in_leg = 0;
        }
        Some(self.position)
    }
}
