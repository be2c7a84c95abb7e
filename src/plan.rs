//! The committed short-horizon motion plan of a vehicle.

use crate::SimError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A span of constant acceleration within an [OperationalPlan].
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanSegment {
    /// The duration of the segment in s.
    pub duration: f64,
    /// The acceleration held over the segment in m/s^2.
    pub acceleration: f64,
}

/// An immutable short-horizon committed motion profile.
///
/// The profile is a piecewise-constant-acceleration curve starting at a
/// known instant and velocity. Velocity clamps at zero within a braking
/// segment, so the cumulative distance function is monotone and the vehicle
/// never reverses through its own plan.
#[derive(Clone, Debug)]
pub struct OperationalPlan {
    /// The simulated time at which the plan starts in s.
    start_time: f64,
    /// The velocity at the start of the plan in m/s.
    initial_velocity: f64,
    /// The acceleration profile.
    segments: SmallVec<[PlanSegment; 4]>,
}

impl OperationalPlan {
    /// Creates a plan from an acceleration profile.
    pub fn new(start_time: f64, initial_velocity: f64, segments: &[PlanSegment]) -> Self {
        Self {
            start_time,
            initial_velocity,
            segments: SmallVec::from_slice(segments),
        }
    }

    /// Creates a constant-velocity plan.
    pub fn constant_velocity(start_time: f64, velocity: f64, duration: f64) -> Self {
        Self::new(
            start_time,
            velocity,
            &[PlanSegment {
                duration,
                acceleration: 0.0,
            }],
        )
    }

    /// The simulated time at which the plan starts in s.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// The total duration of the plan in s.
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// The simulated time at which the plan ends in s.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    /// The cumulative distance travelled from the start of the plan until
    /// `time`, in m. `time` must lie within the plan's horizon; queries in
    /// the past are valid down to the plan's start.
    pub fn traveled_distance(&self, time: f64) -> Result<f64, SimError> {
        let dt = self.offset(time)?;
        Ok(self.kinematics_at(dt).0)
    }

    /// The velocity at `time` in m/s.
    pub fn velocity_at(&self, time: f64) -> Result<f64, SimError> {
        let dt = self.offset(time)?;
        Ok(self.kinematics_at(dt).1)
    }

    /// The acceleration at `time` in m/s^2. Zero while the plan holds the
    /// vehicle at a standstill inside a braking segment.
    pub fn acceleration_at(&self, time: f64) -> Result<f64, SimError> {
        let dt = self.offset(time)?;
        Ok(self.kinematics_at(dt).2)
    }

    /// The total distance covered over the plan's full duration in m.
    pub fn total_distance(&self) -> f64 {
        self.kinematics_at(self.duration()).0
    }

    /// The absolute time at which the cumulative travelled distance reaches
    /// `target` metres, or `None` if the plan never covers that distance.
    pub fn time_at_distance(&self, target: f64) -> Option<f64> {
        if target <= 0.0 {
            return Some(self.start_time);
        }
        let mut remaining = target;
        let mut elapsed = 0.0;
        let mut vel = self.initial_velocity;
        for seg in &self.segments {
            // Motion stops at the standstill point of a braking segment.
            let t_move = if seg.acceleration < 0.0 && vel > 0.0 {
                (-vel / seg.acceleration).min(seg.duration)
            } else if seg.acceleration <= 0.0 && vel <= 0.0 {
                0.0
            } else {
                seg.duration
            };
            let gained = vel * t_move + 0.5 * seg.acceleration * t_move * t_move;
            if remaining <= gained {
                let x = solve_motion_time(vel, seg.acceleration, remaining)?;
                return Some(self.start_time + elapsed + x);
            }
            remaining -= gained;
            vel = (vel + seg.acceleration * t_move).max(0.0);
            elapsed += seg.duration;
        }
        None
    }

    /// Converts an absolute time to an offset from the plan start,
    /// validating the horizon.
    fn offset(&self, time: f64) -> Result<f64, SimError> {
        let end = self.end_time();
        if time < self.start_time || time > end {
            return Err(SimError::OutsidePlanHorizon {
                time,
                start: self.start_time,
                end,
            });
        }
        Ok(time - self.start_time)
    }

    /// Integrates the profile over `dt` seconds from the plan start.
    /// Returns (distance, velocity, effective acceleration).
    fn kinematics_at(&self, mut dt: f64) -> (f64, f64, f64) {
        let mut vel = self.initial_velocity;
        let mut dist = 0.0;
        let mut acc = 0.0;
        for seg in &self.segments {
            let step = dt.min(seg.duration);
            let (d, v, a) = integrate(vel, seg.acceleration, step);
            dist += d;
            vel = v;
            acc = a;
            dt -= step;
            if dt <= 0.0 {
                break;
            }
        }
        (dist, vel, acc)
    }
}

/// Integrates constant acceleration over `t` seconds, clamping velocity at
/// zero. Returns (distance, end velocity, effective acceleration at `t`).
fn integrate(vel: f64, acc: f64, t: f64) -> (f64, f64, f64) {
    if acc < 0.0 {
        let t_stop = -vel / acc;
        if t >= t_stop {
            // Standstill for the rest of the span.
            return (-vel * vel / (2.0 * acc), 0.0, 0.0);
        }
    }
    (vel * t + 0.5 * acc * t * t, vel + acc * t, acc)
}

/// Time at which `vel * x + acc * x^2 / 2` first reaches `dist`, for a
/// profile known to reach it before any velocity clamp applies.
fn solve_motion_time(vel: f64, acc: f64, dist: f64) -> Option<f64> {
    if acc.abs() < 1e-12 {
        if vel > 0.0 {
            Some(dist / vel)
        } else {
            None
        }
    } else {
        let disc = vel * vel + 2.0 * acc * dist;
        if disc < 0.0 {
            return None;
        }
        Some((-vel + disc.sqrt()) / acc)
    }
}
