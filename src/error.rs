//! Failure taxonomy of the simulation core.
//!
//! Redundant operations (re-entering an occupied lane, leaving the last lane
//! outside destruction) are deliberately *not* errors; they are reported
//! through the [log] crate and the operation becomes a no-op.

use crate::{LaneId, LinkId, NodeId, VehicleId};
use thiserror::Error;

/// An error raised by the simulation core. All variants are fatal for the
/// affected vehicle's step and propagate to the simulation driver; route and
/// topology failures recur deterministically and must not be retried.
#[derive(Debug, Error)]
pub enum SimError {
    /// A position query named a lane the vehicle is not registered on.
    #[error("vehicle {0:?} is not registered on lane {1:?}")]
    NotOnLane(VehicleId, LaneId),

    /// An occupied lane's parent link has no stored fractional position.
    /// This indicates an invariant violation upstream.
    #[error("no fractional position stored for link {0:?} of vehicle {1:?}")]
    InconsistentState(LinkId, VehicleId),

    /// A projection query named a link none of whose lanes are occupied.
    #[error("vehicle {0:?} occupies no lane of link {1:?}")]
    NotOnAnyLaneOfLink(VehicleId, LinkId),

    /// A vehicle is about to run off a lane that has no usable continuation,
    /// or no continuation matches the route's next node.
    #[error("no continuation from lane {0:?} for vehicle {1:?}")]
    NetworkInconsistency(LaneId, VehicleId),

    /// The vehicle would need a manoeuvre the scheduler does not implement:
    /// several branch continuations match the route node, or the front
    /// would traverse more than one lane boundary in a single step.
    #[error("unsupported manoeuvre at lane {0:?} for vehicle {1:?}: {2}")]
    NotYetSupported(LaneId, VehicleId, &'static str),

    /// The strategical planner could not name a next node.
    #[error("no route beyond node {0:?}")]
    NoRoute(NodeId),

    /// A computed position or distance was NaN or infinite. This flags a
    /// modelling error upstream instead of propagating it silently.
    #[error("non-finite position computed for vehicle {0:?} on lane {1:?}")]
    NonFinitePosition(VehicleId, LaneId),

    /// A plan was queried outside its committed horizon.
    #[error("time {time} s is outside the plan horizon [{start} s, {end} s]")]
    OutsidePlanHorizon { time: f64, start: f64, end: f64 },

    /// Two lanes passed to [Network::connect](crate::Network::connect) do
    /// not share a node.
    #[error("lanes {0:?} and {1:?} are not adjacent")]
    NotAdjacent(LaneId, LaneId),
}
