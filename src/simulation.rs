//! The simulation driver: owns the network, the vehicles, the event queue
//! and the clock, and executes the move cycle.

use crate::events::{EventKind, EventQueue};
use crate::network::Network;
use crate::route::{StrategicalPlanner, TacticalPlanner};
use crate::vehicle::{RelativePosition, Vehicle, VehicleAttributes};
use crate::{Direction, LaneId, SimError, VehicleId, VehicleSet};

/// A detector passage recorded by the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// The simulated time of the passage in s.
    pub time: f64,
    /// The vehicle whose front passed the detector.
    pub vehicle: VehicleId,
    /// The lane carrying the detector.
    pub lane: LaneId,
    /// The detector's position on the lane in m.
    pub position: f64,
}

/// A lane-based traffic simulation.
///
/// Execution is a single discrete-event timeline: vehicle moves, lane
/// departures and detector passages are events on one strictly time-ordered
/// queue, popped in FIFO order within an instant for reproducibility.
pub struct Simulation {
    /// The road network.
    network: Network,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The event queue.
    queue: EventQueue,
    /// The current simulated time in s.
    time: f64,
    /// Detector passages recorded so far.
    detections: Vec<Detection>,
}

impl Simulation {
    /// Creates a simulation over the given network.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            vehicles: VehicleSet::default(),
            queue: EventQueue::new(),
            time: 0.0,
            detections: Vec::new(),
        }
    }

    /// The current simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The road network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The detector passages recorded so far, in firing order.
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    /// The number of events still pending on the queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Adds a vehicle to the simulation, registering it on each of the
    /// given lanes at the given reference-point position and direction.
    /// Its first move is scheduled at the current instant.
    pub fn add_vehicle(
        &mut self,
        attributes: &VehicleAttributes,
        entries: &[(LaneId, f64, Direction)],
        strategical: Box<dyn StrategicalPlanner>,
        tactical: Box<dyn TacticalPlanner>,
    ) -> VehicleId {
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, attributes, strategical, tactical));
        for &(lane, position, direction) in entries {
            self.vehicles[id].enter_lane(&mut self.network, lane, position, direction);
        }
        self.queue.push(self.time, EventKind::Move(id));
        id
    }

    /// Removes a vehicle from the simulation, deregistering it from every
    /// occupied lane. Events already scheduled for it become no-ops.
    pub fn destroy_vehicle(&mut self, id: VehicleId) {
        if let Some(mut vehicle) = self.vehicles.remove(id) {
            vehicle.destroy(&mut self.network);
        }
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, id: VehicleId) -> &Vehicle {
        &self.vehicles[id]
    }

    /// Whether the vehicle still exists.
    pub fn contains_vehicle(&self, id: VehicleId) -> bool {
        self.vehicles.contains_key(id)
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// The occupied lanes of a vehicle, oldest registration first.
    pub fn lanes_of(&self, id: VehicleId) -> Vec<(LaneId, Direction)> {
        self.vehicles[id].lanes()
    }

    /// The position of a reference point of a vehicle on an occupied lane
    /// at the given simulated time, in m.
    pub fn position(
        &self,
        id: VehicleId,
        lane: LaneId,
        rel: RelativePosition,
        time: f64,
    ) -> Result<f64, SimError> {
        self.vehicles[id].position(&self.network, lane, rel, time)
    }

    /// The position of a reference point on every lane a vehicle occupies,
    /// in registration order.
    pub fn positions(
        &self,
        id: VehicleId,
        rel: RelativePosition,
        time: f64,
    ) -> Result<Vec<(LaneId, f64)>, SimError> {
        self.vehicles[id].positions(&self.network, rel, time)
    }

    /// Runs the simulation until the given simulated time, executing every
    /// due event in time order. A failed vehicle step aborts the run; route
    /// and invariant failures recur deterministically and are not retried.
    pub fn run_until(&mut self, time: f64) -> Result<(), SimError> {
        while let Some((t, kind)) = self.queue.pop_until(time) {
            self.time = t;
            match kind {
                EventKind::Move(id) => {
                    // A destroyed vehicle's pending events are no-ops.
                    if self.vehicles.contains_key(id) {
                        self.execute_move(id)?;
                    }
                }
                EventKind::LeaveLane { vehicle, lane } => {
                    if let Some(v) = self.vehicles.get_mut(vehicle) {
                        v.leave_lane(&mut self.network, lane, false);
                    }
                }
                EventKind::Detector {
                    vehicle,
                    lane,
                    position,
                } => {
                    if self.vehicles.contains_key(vehicle) {
                        self.detections.push(Detection {
                            time: t,
                            vehicle,
                            lane,
                            position,
                        });
                    }
                }
            }
        }
        self.time = time;
        Ok(())
    }

    /// One full move cycle for a vehicle: re-evaluate the stored link
    /// fractions under the outgoing plan, commit the next plan, schedule
    /// the step's lane transitions and the next move.
    fn execute_move(&mut self, id: VehicleId) -> Result<(), SimError> {
        let now = self.time;
        if self.vehicles[id].lane_count() == 0 {
            // The rear left the last lane at the end of the previous step;
            // the vehicle has reached the end of its path.
            self.destroy_vehicle(id);
            return Ok(());
        }
        self.vehicles[id].update_link_fractions(&self.network, now)?;
        let duration = self.vehicles[id].replan(now)?;
        let events = self.vehicles[id].schedule_transitions(&mut self.network, now)?;
        for (t, kind) in events {
            self.queue.push(t, kind);
        }
        self.queue.push(now + duration, EventKind::Move(id));
        Ok(())
    }
}
