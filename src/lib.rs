pub use direction::Direction;
pub use error::SimError;
pub use network::{Lane, Link, Network, Node, VehicleClass};
pub use plan::{OperationalPlan, PlanSegment};
pub use route::{
    CruisePlanner, FixedRoutePlanner, ShortestPathPlanner, StrategicalPlanner, TacticalPlanner,
};
pub use simulation::{Detection, Simulation};
pub use slotmap::{Key, KeyData};
pub use vehicle::{RelativePosition, Vehicle, VehicleAttributes};
use slotmap::{new_key_type, SlotMap};

mod direction;
mod error;
mod events;
mod network;
mod plan;
mod route;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Node].
    pub struct NodeId;
    /// Unique ID of a [Link].
    pub struct LinkId;
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type NodeSet = SlotMap<NodeId, Node>;
type LinkSet = SlotMap<LinkId, Link>;
type LaneSet = SlotMap<LaneId, Lane>;
type VehicleSet = SlotMap<VehicleId, Vehicle>;
