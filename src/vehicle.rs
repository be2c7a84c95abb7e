//! A simulated vehicle and its lane-occupancy state.

use crate::direction::Direction;
use crate::network::{Network, VehicleClass};
use crate::plan::OperationalPlan;
use crate::route::{StrategicalPlanner, TacticalPlanner};
use crate::{LaneId, LinkId, SimError, VehicleId};
use smallvec::SmallVec;

mod transitions;

/// A fixed offset along a vehicle's body axis, relative to its reference
/// point, in m. Positive offsets point towards the front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativePosition {
    /// The offset from the reference point in m.
    pub dx: f64,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy, Debug)]
pub struct VehicleAttributes {
    /// The vehicle length in m.
    pub length: f64,
    /// Distance from the reference point to the front of the vehicle in m.
    pub front: f64,
    /// The initial velocity in m/s.
    pub velocity: f64,
    /// The vehicle's class, used to filter lane connectivity.
    pub class: VehicleClass,
}

/// A simulated vehicle.
///
/// The vehicle may occupy several lanes at once (while crossing a node or
/// mid lane change). Its occupancy state is mutated only through
/// [enter_lane](Self::enter_lane), [leave_lane](Self::leave_lane) and
/// [destroy](Self::destroy); the core is single-threaded and compound reads
/// are exclusive through the borrow rules, so no runtime guard is needed.
pub struct Vehicle {
    /// The vehicle's ID.
    pub(crate) id: VehicleId,
    /// The vehicle's length in m.
    length: f64,
    /// Offset from the reference point to the front in m.
    front_dx: f64,
    /// Offset from the reference point to the rear in m (usually negative).
    rear_dx: f64,
    /// The vehicle's class.
    class: VehicleClass,
    /// The velocity at the start of the current plan in m/s.
    vel: f64,
    /// Every lane currently occupied with the direction of travel on it,
    /// oldest registration first.
    lanes: Vec<(LaneId, Direction)>,
    /// Fractional position of the reference point per occupied link. One
    /// entry per link however many of its lanes are occupied, so parallel
    /// registrations cannot disagree about where the vehicle is.
    link_fractions: SmallVec<[(LinkId, f64); 4]>,
    /// The committed motion plan. `None` only while a new plan is being
    /// generated; queries then return stored positions without
    /// extrapolation.
    plan: Option<OperationalPlan>,
    /// The route-choice service.
    strategical: Box<dyn StrategicalPlanner>,
    /// The decision model producing committed plans.
    tactical: Box<dyn TacticalPlanner>,
}

impl Vehicle {
    /// Creates a new vehicle. Lane registration happens separately through
    /// [enter_lane](Self::enter_lane).
    pub(crate) fn new(
        id: VehicleId,
        attributes: &VehicleAttributes,
        strategical: Box<dyn StrategicalPlanner>,
        tactical: Box<dyn TacticalPlanner>,
    ) -> Self {
        Self {
            id,
            length: attributes.length,
            front_dx: attributes.front,
            rear_dx: attributes.front - attributes.length,
            class: attributes.class,
            vel: attributes.velocity,
            lanes: vec![],
            link_fractions: SmallVec::new(),
            plan: None,
            strategical,
            tactical,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The vehicle's class.
    pub fn class(&self) -> VehicleClass {
        self.class
    }

    /// The velocity at the start of the current plan in m/s.
    pub fn velocity(&self) -> f64 {
        self.vel
    }

    /// The reference point itself.
    pub fn reference(&self) -> RelativePosition {
        RelativePosition { dx: 0.0 }
    }

    /// The front of the vehicle.
    pub fn front(&self) -> RelativePosition {
        RelativePosition { dx: self.front_dx }
    }

    /// The rear of the vehicle.
    pub fn rear(&self) -> RelativePosition {
        RelativePosition { dx: self.rear_dx }
    }

    /// The currently committed plan, if any.
    pub fn plan(&self) -> Option<&OperationalPlan> {
        self.plan.as_ref()
    }

    /// The occupied lanes with the direction of travel on each, oldest
    /// registration first. Returns a defensive copy.
    pub fn lanes(&self) -> Vec<(LaneId, Direction)> {
        self.lanes.clone()
    }

    /// The number of lanes currently occupied.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Whether the vehicle is registered on the given lane.
    pub fn is_on(&self, lane: LaneId) -> bool {
        self.lanes.iter().any(|(l, _)| *l == lane)
    }

    /// The direction of travel on an occupied lane.
    pub fn direction_on(&self, lane: LaneId) -> Option<Direction> {
        self.lanes
            .iter()
            .find(|(l, _)| *l == lane)
            .map(|(_, dir)| *dir)
    }

    /// The stored fractional position on a link, if the vehicle occupies
    /// any of its lanes. May lie outside [0, 1].
    pub fn fraction_on(&self, link: LinkId) -> Option<f64> {
        self.link_fractions
            .iter()
            .find(|(l, _)| *l == link)
            .map(|(_, f)| *f)
    }

    /// Registers the vehicle on a lane at the given longitudinal position
    /// of its reference point, in m.
    ///
    /// Entering a lane the vehicle already occupies is a no-op with a
    /// diagnostic; duplicate registration never corrupts state. The parent
    /// link's fractional position is seeded only if the link is new to the
    /// vehicle, so a second lane on an already-occupied link cannot make
    /// the stored position jump.
    pub(crate) fn enter_lane(
        &mut self,
        network: &mut Network,
        lane: LaneId,
        position: f64,
        direction: Direction,
    ) {
        if self.is_on(lane) {
            log::info!(
                "vehicle {:?} is already registered on lane {:?}",
                self.id,
                lane
            );
            return;
        }
        let link = network.lane(lane).link();
        if self.fraction_on(link).is_none() {
            let fraction = network.lane(lane).fraction(position);
            self.link_fractions.push((link, fraction));
        }
        self.lanes.push((lane, direction));
        network.add_occupant(lane, self.id);
    }

    /// Deregisters the vehicle from a lane. The parent link's fractional
    /// position is dropped once no other occupied lane shares the link.
    ///
    /// Leaving the last lane outside destruction is anomalous and reported
    /// as a diagnostic; the next move cycle destroys the vehicle.
    pub(crate) fn leave_lane(&mut self, network: &mut Network, lane: LaneId, destroying: bool) {
        let Some(idx) = self.lanes.iter().position(|(l, _)| *l == lane) else {
            log::warn!("vehicle {:?} is not registered on lane {:?}", self.id, lane);
            return;
        };
        self.lanes.remove(idx);
        let link = network.lane(lane).link();
        if !self
            .lanes
            .iter()
            .any(|(l, _)| network.lane(*l).link() == link)
        {
            self.link_fractions.retain(|(l, _)| *l != link);
        }
        network.remove_occupant(lane, self.id);
        if self.lanes.is_empty() && !destroying {
            log::warn!(
                "vehicle {:?} left its last lane outside destruction",
                self.id
            );
        }
    }

    /// Deregisters the vehicle from every occupied lane. The caller then
    /// releases the vehicle's identity from the network.
    pub(crate) fn destroy(&mut self, network: &mut Network) {
        // Snapshot: leave_lane mutates the lane set while we walk it.
        let lanes: Vec<LaneId> = self.lanes.iter().map(|(l, _)| *l).collect();
        for lane in lanes {
            self.leave_lane(network, lane, true);
        }
    }

    /// The longitudinal position of a reference point on an occupied lane
    /// at the given simulated time, in m.
    ///
    /// Combines the stored fractional position with the committed plan's
    /// travelled distance; with no plan committed the stored position plus
    /// the offset is returned without extrapolation.
    pub fn position(
        &self,
        network: &Network,
        lane: LaneId,
        rel: RelativePosition,
        time: f64,
    ) -> Result<f64, SimError> {
        let dir = self
            .direction_on(lane)
            .ok_or(SimError::NotOnLane(self.id, lane))?;
        let lane_ref = network.lane(lane);
        let link = lane_ref.link();
        let fraction = self
            .fraction_on(link)
            .ok_or(SimError::InconsistentState(link, self.id))?;
        let base = lane_ref.position_at_fraction(fraction);
        let loc = match &self.plan {
            None => base + rel.dx,
            Some(plan) => base + dir.sign() * plan.traveled_distance(time)? + rel.dx,
        };
        if !loc.is_finite() {
            return Err(SimError::NonFinitePosition(self.id, lane));
        }
        Ok(loc)
    }

    /// The position as a fraction of the lane's length. May lie outside
    /// [0, 1] for reference points that overhang the lane.
    pub fn fractional_position(
        &self,
        network: &Network,
        lane: LaneId,
        rel: RelativePosition,
        time: f64,
    ) -> Result<f64, SimError> {
        let position = self.position(network, lane, rel, time)?;
        Ok(network.lane(lane).fraction(position))
    }

    /// The position on every occupied lane, in registration order.
    pub fn positions(
        &self,
        network: &Network,
        rel: RelativePosition,
        time: f64,
    ) -> Result<Vec<(LaneId, f64)>, SimError> {
        self.lanes
            .iter()
            .map(|(lane, _)| Ok((*lane, self.position(network, *lane, rel, time)?)))
            .collect()
    }

    /// The fractional position on every occupied lane, in registration
    /// order.
    pub fn fractional_positions(
        &self,
        network: &Network,
        rel: RelativePosition,
        time: f64,
    ) -> Result<Vec<(LaneId, f64)>, SimError> {
        self.lanes
            .iter()
            .map(|(lane, _)| {
                Ok((*lane, self.fractional_position(network, *lane, rel, time)?))
            })
            .collect()
    }

    /// Projects the vehicle onto a lane it does not necessarily occupy but
    /// that belongs to an occupied link: the fraction on the occupied
    /// sibling lane is re-projected onto the projection lane's length.
    pub fn projected_position(
        &self,
        network: &Network,
        projection_lane: LaneId,
        rel: RelativePosition,
        time: f64,
    ) -> Result<f64, SimError> {
        let link = network.lane(projection_lane).link();
        let lane = self
            .lanes
            .iter()
            .map(|(l, _)| *l)
            .find(|l| network.lane(*l).link() == link)
            .ok_or(SimError::NotOnAnyLaneOfLink(self.id, link))?;
        let fraction = self.fractional_position(network, lane, rel, time)?;
        Ok(network.lane(projection_lane).position_at_fraction(fraction))
    }

    /// Re-evaluates the stored fractional position of every occupied link
    /// at `now`, using the plan about to be superseded. Run at the start of
    /// each move cycle, before the next plan is committed.
    pub(crate) fn update_link_fractions(
        &mut self,
        network: &Network,
        now: f64,
    ) -> Result<(), SimError> {
        for idx in 0..self.link_fractions.len() {
            let link = self.link_fractions[idx].0;
            let lane = self
                .lanes
                .iter()
                .map(|(l, _)| *l)
                .find(|l| network.lane(*l).link() == link)
                .ok_or(SimError::InconsistentState(link, self.id))?;
            let position = self.position(network, lane, self.reference(), now)?;
            self.link_fractions[idx].1 = network.lane(lane).fraction(position);
        }
        Ok(())
    }

    /// Commits the tactical planner's next plan at `now` and returns its
    /// duration. The previous plan's end velocity carries over.
    pub(crate) fn replan(&mut self, now: f64) -> Result<f64, SimError> {
        if let Some(plan) = &self.plan {
            self.vel = plan.velocity_at(now)?;
        }
        self.plan = None;
        let plan = self.tactical.next_plan(now, self.vel);
        let duration = plan.duration();
        self.plan = Some(plan);
        Ok(duration)
    }
}
