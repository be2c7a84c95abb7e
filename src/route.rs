//! Planner seams: route choice and plan generation.
//!
//! Both planners are collaborators of the movement core, not part of it.
//! The traits are deliberately thin; the provided implementations are the
//! minimum needed to run a network end to end.

use crate::direction::Direction;
use crate::network::{Network, VehicleClass};
use crate::plan::OperationalPlan;
use crate::{LinkId, NodeId, SimError};
use itertools::Itertools;
use pathfinding::directed::dijkstra::dijkstra;
use std::fmt::Debug;

/// The route-choice service: answers "which node next" at a branch.
pub trait StrategicalPlanner: Debug {
    /// The node to visit after traversing `link` in direction `dir`.
    fn next_node(
        &self,
        network: &Network,
        link: LinkId,
        dir: Direction,
        class: VehicleClass,
    ) -> Result<NodeId, SimError>;
}

/// A planner that follows a fixed sequence of nodes.
#[derive(Clone, Debug)]
pub struct FixedRoutePlanner {
    nodes: Vec<NodeId>,
}

impl FixedRoutePlanner {
    /// Creates a planner visiting the given nodes in order.
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }
}

impl StrategicalPlanner for FixedRoutePlanner {
    fn next_node(
        &self,
        network: &Network,
        link: LinkId,
        dir: Direction,
        _class: VehicleClass,
    ) -> Result<NodeId, SimError> {
        let boundary = network.link(link).boundary_node(dir);
        self.nodes
            .iter()
            .tuple_windows()
            .find(|(node, _)| **node == boundary)
            .map(|(_, next)| *next)
            .ok_or(SimError::NoRoute(boundary))
    }
}

/// A planner that routes towards a destination node along the shortest path
/// by lane length.
#[derive(Clone, Copy, Debug)]
pub struct ShortestPathPlanner {
    destination: NodeId,
}

impl ShortestPathPlanner {
    /// Creates a planner routing towards `destination`.
    pub fn new(destination: NodeId) -> Self {
        Self { destination }
    }
}

impl StrategicalPlanner for ShortestPathPlanner {
    fn next_node(
        &self,
        network: &Network,
        link: LinkId,
        dir: Direction,
        _class: VehicleClass,
    ) -> Result<NodeId, SimError> {
        let boundary = network.link(link).boundary_node(dir);
        if boundary == self.destination {
            return Err(SimError::NoRoute(boundary));
        }
        let result = dijkstra(
            &boundary,
            |node| successors(network, *node),
            |node| *node == self.destination,
        );
        match result {
            Some((path, _)) if path.len() > 1 => Ok(path[1]),
            _ => Err(SimError::NoRoute(boundary)),
        }
    }
}

/// Neighbouring nodes with a length-derived cost, for the shortest path
/// search. Costs are in cm so they can be integral.
///
/// The search runs on the bare link graph: links count as traversable in
/// both directions and cost their first lane's length. Lane connectivity
/// and class filters are not consulted, so a chosen route can still dead
/// end at a branch whose connections do not reach the next node.
fn successors(network: &Network, node: NodeId) -> Vec<(NodeId, u64)> {
    network
        .node(node)
        .links()
        .iter()
        .map(|id| {
            let link = network.link(*id);
            let other = if link.from_node() == node {
                link.to_node()
            } else {
                link.from_node()
            };
            let length = link
                .lanes()
                .first()
                .map(|lane| network.lane(*lane).length())
                .unwrap_or(0.0);
            (other, (100.0 * length) as u64)
        })
        .collect()
}

/// The decision model seam: yields the next committed motion plan.
/// Car following, lane-change utility and the like live behind this trait.
pub trait TacticalPlanner: Debug {
    /// Produces the plan committed at `now` for a vehicle currently moving
    /// at `velocity` m/s.
    fn next_plan(&mut self, now: f64, velocity: f64) -> OperationalPlan;
}

/// A decision model that always cruises at a fixed velocity.
#[derive(Clone, Copy, Debug)]
pub struct CruisePlanner {
    /// The cruising velocity in m/s.
    pub velocity: f64,
    /// The plan horizon in s.
    pub step: f64,
}

impl TacticalPlanner for CruisePlanner {
    fn next_plan(&mut self, now: f64, _velocity: f64) -> OperationalPlan {
        OperationalPlan::constant_velocity(now, self.velocity, self.step)
    }
}
