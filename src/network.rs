//! The static road network: nodes, links and lanes.
//!
//! The topology is read-only once built; the only mutable state lanes carry
//! at run time is their occupant list, which is maintained through the
//! vehicle registration protocol.

use crate::direction::Direction;
use crate::{LaneId, LaneSet, LinkId, LinkSet, NodeId, NodeSet, SimError, VehicleId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A bit set of vehicle classes. A lane connection permits a vehicle when
/// the two sets intersect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleClass(pub u32);

impl VehicleClass {
    pub const ANY: VehicleClass = VehicleClass(u32::MAX);
    pub const CAR: VehicleClass = VehicleClass(1);
    pub const TRUCK: VehicleClass = VehicleClass(2);
    pub const BUS: VehicleClass = VehicleClass(4);

    /// Whether the two class sets intersect.
    pub fn permits(self, other: VehicleClass) -> bool {
        self.0 & other.0 != 0
    }
}

/// A point where links meet.
#[derive(Clone, Debug, Default)]
pub struct Node {
    /// Every link that starts or ends at this node.
    links: SmallVec<[LinkId; 4]>,
}

impl Node {
    /// The links touching this node.
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }
}

/// A directed graph edge bundling one or more parallel lanes.
#[derive(Clone, Debug)]
pub struct Link {
    /// The node at the start of the link's design line.
    from: NodeId,
    /// The node at the end of the link's design line.
    to: NodeId,
    /// The lanes of the link, in the order they were added.
    lanes: SmallVec<[LaneId; 4]>,
}

impl Link {
    pub fn from_node(&self) -> NodeId {
        self.from
    }

    pub fn to_node(&self) -> NodeId {
        self.to
    }

    /// The lanes of the link.
    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    /// The node at the boundary a vehicle travelling in `dir` moves towards.
    pub fn boundary_node(&self, dir: Direction) -> NodeId {
        match dir {
            Direction::Forward => self.to,
            Direction::Backward => self.from,
        }
    }

    /// Whether the link starts or ends at the given node.
    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

/// A continuation from one lane onto another across a shared node.
#[derive(Clone, Copy, Debug)]
struct LaneConnection {
    /// The lane continued onto.
    lane: LaneId,
    /// The direction a vehicle will travel on that lane.
    dir: Direction,
    /// The vehicle classes permitted to use the connection.
    classes: VehicleClass,
}

/// A single traversable strip of a [Link] with a defined length and
/// directional connectivity to lanes of adjacent links.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The parent link.
    link: LinkId,
    /// The length of the lane in m.
    length: f64,
    /// Continuations for a vehicle travelling forward on this lane.
    next: SmallVec<[LaneConnection; 2]>,
    /// Continuations for a vehicle travelling backward on this lane.
    prev: SmallVec<[LaneConnection; 2]>,
    /// The vehicles currently registered on the lane, in registration order.
    vehicles: Vec<VehicleId>,
    /// Longitudinal positions of lane-resident detectors in m.
    detectors: Vec<f64>,
}

impl Lane {
    /// The parent link of the lane.
    pub fn link(&self) -> LinkId {
        self.link
    }

    /// The length of the lane in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Converts a fraction of the lane's design line to a position in m.
    pub fn position_at_fraction(&self, fraction: f64) -> f64 {
        fraction * self.length
    }

    /// Converts a position in m to a fraction of the lane's design line.
    pub fn fraction(&self, position: f64) -> f64 {
        position / self.length
    }

    /// The vehicles registered on the lane, in registration order.
    pub fn occupants(&self) -> &[VehicleId] {
        &self.vehicles
    }

    /// The detector positions on the lane in m.
    pub fn detectors(&self) -> &[f64] {
        &self.detectors
    }
}

/// A road network. Nodes, links and lanes are built once and treated as a
/// read-only graph by the simulation core.
#[derive(Default)]
pub struct Network {
    nodes: NodeSet,
    links: LinkSet,
    lanes: LaneSet,
}

impl Network {
    /// Creates an empty network.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a node to the network.
    pub fn add_node(&mut self) -> NodeId {
        self.nodes.insert(Node::default())
    }

    /// Adds a link from one node to another.
    pub fn add_link(&mut self, from: NodeId, to: NodeId) -> LinkId {
        let id = self.links.insert(Link {
            from,
            to,
            lanes: SmallVec::new(),
        });
        self.nodes[from].links.push(id);
        self.nodes[to].links.push(id);
        id
    }

    /// Adds a lane of the given length in m to a link.
    pub fn add_lane(&mut self, link: LinkId, length: f64) -> LaneId {
        let id = self.lanes.insert(Lane {
            link,
            length,
            next: SmallVec::new(),
            prev: SmallVec::new(),
            vehicles: vec![],
            detectors: vec![],
        });
        self.links[link].lanes.push(id);
        id
    }

    /// Adds a detector at the given position in m on a lane.
    pub fn add_detector(&mut self, lane: LaneId, position: f64) {
        self.lanes[lane].detectors.push(position);
    }

    /// Declares that a vehicle travelling forward on `from` continues onto
    /// `to` across the shared node. The direction on `to` is derived from
    /// the topology: a head-to-head meeting of the two links flips it.
    /// The reciprocal continuation for the opposite sense of travel is
    /// wired as well.
    pub fn connect(
        &mut self,
        from: LaneId,
        to: LaneId,
        classes: VehicleClass,
    ) -> Result<(), SimError> {
        let shared = self.links[self.lanes[from].link].to;
        let to_link = &self.links[self.lanes[to].link];
        let dir = if to_link.from == shared {
            Direction::Forward
        } else if to_link.to == shared {
            Direction::Backward
        } else {
            return Err(SimError::NotAdjacent(from, to));
        };

        self.lanes[from].next.push(LaneConnection {
            lane: to,
            dir,
            classes,
        });

        // A vehicle traversing `to` in the opposite sense exits at the same
        // shared node and continues onto `from`, always travelling backward
        // relative to `from`'s design line.
        let reciprocal = LaneConnection {
            lane: from,
            dir: Direction::Backward,
            classes,
        };
        match dir {
            Direction::Forward => self.lanes[to].prev.push(reciprocal),
            Direction::Backward => self.lanes[to].next.push(reciprocal),
        }
        Ok(())
    }

    /// Gets a reference to the node with the given ID.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Gets a reference to the link with the given ID.
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id]
    }

    /// Gets a reference to the lane with the given ID.
    pub fn lane(&self, id: LaneId) -> &Lane {
        &self.lanes[id]
    }

    /// Returns an iterator over all the links in the network.
    pub fn iter_links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links.iter()
    }

    /// The lanes a vehicle of the given class may continue onto when
    /// travelling forward on `lane`, with the direction it will have there.
    pub fn next_lanes(
        &self,
        lane: LaneId,
        class: VehicleClass,
    ) -> impl Iterator<Item = (LaneId, Direction)> + '_ {
        self.lanes[lane]
            .next
            .iter()
            .filter(move |c| c.classes.permits(class))
            .map(|c| (c.lane, c.dir))
    }

    /// The lanes a vehicle of the given class may continue onto when
    /// travelling backward on `lane`, with the direction it will have there.
    pub fn prev_lanes(
        &self,
        lane: LaneId,
        class: VehicleClass,
    ) -> impl Iterator<Item = (LaneId, Direction)> + '_ {
        self.lanes[lane]
            .prev
            .iter()
            .filter(move |c| c.classes.permits(class))
            .map(|c| (c.lane, c.dir))
    }

    /// Registers a vehicle on a lane's occupant list.
    pub(crate) fn add_occupant(&mut self, lane: LaneId, vehicle: VehicleId) {
        self.lanes[lane].vehicles.push(vehicle);
    }

    /// Removes a vehicle from a lane's occupant list.
    pub(crate) fn remove_occupant(&mut self, lane: LaneId, vehicle: VehicleId) {
        let vehicles = &mut self.lanes[lane].vehicles;
        if let Some(idx) = vehicles.iter().rposition(|v| *v == vehicle) {
            vehicles.remove(idx);
        }
    }
}
