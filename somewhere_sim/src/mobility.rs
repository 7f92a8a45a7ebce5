//! Rectangle random walk.

use nalgebra::Vector2;
use rand::Rng;

/// A device walking at constant speed towards uniformly random targets in
/// the square `[0, side]²`, picking a new target each time it arrives.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    position: Vector2<f64>,
    target: Vector2<f64>,
    speed: f64,
    side: f64,

    /// Time the position refers to
    time: f64,
}

impl RandomWalk {
    /// Starts a walk at a uniformly random point at time `time`.
    pub fn new<R: Rng>(rng: &mut R, side: f64, speed: f64, time: f64) -> Self {
        let side = side.max(0.0);
        let position = random_point(rng, side);
        let target = random_point(rng, side);
        Self {
            position,
            target,
            speed: speed.max(0.0),
            side,
            time,
        }
    }

    /// Moves the walk forward to `time`; earlier times are ignored.
    pub fn advance_to<R: Rng>(&mut self, rng: &mut R, time: f64) {
        let dt = time - self.time;
        if dt <= 0.0 {
            return;
        }
        self.time = time;

        let mut budget = self.speed * dt;
        // Bounded so a zero-sized area cannot spin forever
        for _ in 0..1024 {
            if budget <= 0.0 {
                break;
            }
            let to_target = self.target - self.position;
            let distance = to_target.norm();
            if distance > budget {
                self.position += to_target * (budget / distance);
                return;
            }
            self.position = self.target;
            budget -= distance;
            self.target = random_point(rng, self.side);
        }
    }

    pub fn position(&self) -> &Vector2<f64> {
        &self.position
    }

    pub fn target(&self) -> &Vector2<f64> {
        &self.target
    }
}

fn random_point<R: Rng>(rng: &mut R, side: f64) -> Vector2<f64> {
    if side <= 0.0 {
        return Vector2::zeros();
    }
    Vector2::new(rng.gen_range(0.0..=side), rng.gen_range(0.0..=side))
}
