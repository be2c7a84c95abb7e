//! Direction of travel on a lane and the sign algebra for lane transitions.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The direction a vehicle travels relative to a lane's design line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Travelling from the lane's start towards its end; positions increase.
    Forward,
    /// Travelling from the lane's end towards its start; positions decrease.
    Backward,
}

impl Direction {
    /// The sign applied to distances travelled in this direction.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }

    /// The opposite direction.
    pub fn flip(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Composes this direction with a topology flip. Two links meeting
    /// tail-to-tail or head-to-head reverse the apparent direction of a
    /// vehicle continuing across the shared node.
    pub fn compose(self, flipped: bool) -> Direction {
        if flipped {
            self.flip()
        } else {
            self
        }
    }
}

/// Distance from a reference position to the lane boundary the vehicle is
/// travelling towards.
pub(crate) fn distance_to_exit(ref_pos: f64, length: f64, dir: Direction) -> f64 {
    match dir {
        Direction::Forward => length - ref_pos,
        Direction::Backward => ref_pos,
    }
}

/// Position of a vehicle's reference point on a lane being entered, measured
/// on the new lane, for a reference point that is still `gap` metres short of
/// the entry boundary. Registering at this position keeps the fractional
/// bookkeeping continuous across the node.
pub(crate) fn entry_position(gap: f64, new_length: f64, new_dir: Direction) -> f64 {
    match new_dir {
        Direction::Forward => -gap,
        Direction::Backward => new_length + gap,
    }
}
