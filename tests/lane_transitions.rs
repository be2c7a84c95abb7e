//! Tests of the lane-transition scheduler: crossing detection, retroactive
//! registration, rear departures and detector passages.

use assert_approx_eq::assert_approx_eq;
use lane_sim::{
    CruisePlanner, Detection, Direction, FixedRoutePlanner, LaneId, Network, SimError, Simulation,
    VehicleAttributes, VehicleClass,
};

fn attributes() -> VehicleAttributes {
    VehicleAttributes {
        length: 4.0,
        front: 4.0,
        velocity: 10.0,
        class: VehicleClass::CAR,
    }
}

fn cruise(velocity: f64, step: f64) -> Box<CruisePlanner> {
    Box::new(CruisePlanner { velocity, step })
}

fn no_route() -> Box<FixedRoutePlanner> {
    Box::new(FixedRoutePlanner::new(vec![]))
}

/// A 100 m lane feeding a 500 m lane across a shared node.
fn two_lane_network() -> (Network, LaneId, LaneId) {
    let mut net = Network::new();
    let n0 = net.add_node();
    let n1 = net.add_node();
    let n2 = net.add_node();
    let link_a = net.add_link(n0, n1);
    let a = net.add_lane(link_a, 100.0);
    let link_b = net.add_link(n1, n2);
    let b = net.add_lane(link_b, 500.0);
    net.connect(a, b, VehicleClass::ANY).unwrap();
    (net, a, b)
}

/// A vehicle whose front crosses the lane boundary mid-step is registered
/// on the next lane immediately, at a retroactive negative position, so the
/// stored fraction stays continuous across the whole step.
#[test]
fn front_crossing_registers_retroactively() {
    let (mut net, a, b) = two_lane_network();
    net.add_detector(a, 100.0);
    let link_b = net.lane(b).link();

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &attributes(),
        &[(a, 0.0, Direction::Forward)],
        no_route(),
        cruise(10.0, 10.0),
    );

    // The crossing is predicted within the very first step.
    sim.run_until(0.0).unwrap();
    assert_eq!(
        sim.lanes_of(veh),
        vec![(a, Direction::Forward), (b, Direction::Forward)]
    );
    assert_approx_eq!(sim.get_vehicle(veh).fraction_on(link_b).unwrap(), -0.2);

    // The front reaches the start of the next lane exactly when it leaves
    // the previous one.
    let front = sim.get_vehicle(veh).front();
    assert_approx_eq!(sim.position(veh, b, front, 9.6).unwrap(), 0.0);

    // The detector at the end of the first lane fires as the front passes.
    sim.run_until(20.0).unwrap();
    assert_eq!(sim.detections().len(), 1);
    let detection = sim.detections()[0];
    assert_eq!(detection.vehicle, veh);
    assert_eq!(detection.lane, a);
    assert_approx_eq!(detection.time, 9.6);

    // The rear clears the first lane by the end of the second step.
    assert_eq!(sim.lanes_of(veh), vec![(b, Direction::Forward)]);
    assert_approx_eq!(sim.get_vehicle(veh).fraction_on(link_b).unwrap(), 0.2);
}

/// A front that lands exactly on the boundary has not crossed it yet; the
/// crossing is picked up at the start of the following step.
#[test]
fn exact_boundary_landing_crosses_next_step() {
    let (net, a, b) = two_lane_network();
    let link_b = net.lane(b).link();

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &VehicleAttributes {
            velocity: 8.0,
            ..attributes()
        },
        &[(a, 0.0, Direction::Forward)],
        no_route(),
        // 8 m/s over 12 s puts the front at exactly 100 m.
        cruise(8.0, 12.0),
    );

    sim.run_until(11.0).unwrap();
    assert_eq!(sim.lanes_of(veh), vec![(a, Direction::Forward)]);

    sim.run_until(12.0).unwrap();
    assert_eq!(
        sim.lanes_of(veh),
        vec![(a, Direction::Forward), (b, Direction::Forward)]
    );
    // The reference point is 4 m short of the boundary at the crossing.
    assert_approx_eq!(sim.get_vehicle(veh).fraction_on(link_b).unwrap(), -0.008);
}

/// Two crossings onto lanes of the same link within one step must not fight
/// over the link's stored fraction: the first registration seeds it and the
/// second leaves it alone.
#[test]
fn link_fraction_is_seeded_once() {
    let mut net = Network::new();
    let n0 = net.add_node();
    let n1 = net.add_node();
    let n2 = net.add_node();
    let link_a = net.add_link(n0, n1);
    let a1 = net.add_lane(link_a, 100.0);
    let a2 = net.add_lane(link_a, 100.0);
    let link_b = net.add_link(n1, n2);
    let b1 = net.add_lane(link_b, 500.0);
    let b2 = net.add_lane(link_b, 1000.0);
    net.connect(a1, b1, VehicleClass::ANY).unwrap();
    net.connect(a2, b2, VehicleClass::ANY).unwrap();

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &attributes(),
        &[(a1, 0.0, Direction::Forward), (a2, 0.0, Direction::Forward)],
        no_route(),
        cruise(10.0, 10.0),
    );
    sim.run_until(0.0).unwrap();

    assert_eq!(
        sim.lanes_of(veh),
        vec![
            (a1, Direction::Forward),
            (a2, Direction::Forward),
            (b1, Direction::Forward),
            (b2, Direction::Forward),
        ]
    );
    // Seeded from b1 (100 m short of 500 m); a reseed from b2 would have
    // stored -0.1 instead.
    assert_approx_eq!(sim.get_vehicle(veh).fraction_on(link_b).unwrap(), -0.2);
}

/// Backward travel mirrors the forward case: the front exits at position
/// zero and enters the previous lane beyond its far end.
#[test]
fn backward_travel_crosses_onto_previous_lane() {
    let mut net = Network::new();
    let n0 = net.add_node();
    let n1 = net.add_node();
    let n2 = net.add_node();
    let link_p = net.add_link(n0, n1);
    let p = net.add_lane(link_p, 100.0);
    let link_a = net.add_link(n1, n2);
    let a = net.add_lane(link_a, 100.0);
    net.connect(p, a, VehicleClass::ANY).unwrap();

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &VehicleAttributes {
            velocity: 1.0,
            ..attributes()
        },
        &[(a, 10.0, Direction::Backward)],
        no_route(),
        cruise(1.0, 10.0),
    );
    sim.run_until(0.0).unwrap();

    assert_eq!(
        sim.lanes_of(veh),
        vec![(a, Direction::Backward), (p, Direction::Backward)]
    );
    // Reference 10 m short of the exit, so 10 m past the far end of `p`.
    assert_approx_eq!(sim.get_vehicle(veh).fraction_on(link_p).unwrap(), 1.1);

    sim.run_until(20.0).unwrap();
    assert_eq!(sim.lanes_of(veh), vec![(p, Direction::Backward)]);
    assert_approx_eq!(sim.get_vehicle(veh).fraction_on(link_p).unwrap(), 0.9);
}

/// A step long enough to carry the front across more than one boundary is
/// rejected rather than partially applied.
#[test]
fn traversing_two_boundaries_in_one_step_is_rejected() {
    let mut net = Network::new();
    let n0 = net.add_node();
    let n1 = net.add_node();
    let n2 = net.add_node();
    let link_a = net.add_link(n0, n1);
    let a = net.add_lane(link_a, 100.0);
    let link_b = net.add_link(n1, n2);
    let b = net.add_lane(link_b, 50.0);
    net.connect(a, b, VehicleClass::ANY).unwrap();

    let mut sim = Simulation::new(net);
    sim.add_vehicle(
        &VehicleAttributes {
            velocity: 30.0,
            ..attributes()
        },
        &[(a, 80.0, Direction::Forward)],
        no_route(),
        cruise(30.0, 10.0),
    );

    assert!(matches!(
        sim.run_until(0.0),
        Err(SimError::NotYetSupported(..))
    ));
}

/// Events already on the queue for a destroyed vehicle fall through as
/// no-ops instead of resurrecting it.
#[test]
fn destroyed_vehicle_events_are_inert() {
    let (mut net, a, _b) = two_lane_network();
    net.add_detector(a, 100.0);

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &attributes(),
        &[(a, 0.0, Direction::Forward)],
        no_route(),
        cruise(10.0, 10.0),
    );

    // The move at t = 10 has scheduled a departure and the next move.
    sim.run_until(10.0).unwrap();
    sim.destroy_vehicle(veh);
    assert!(!sim.contains_vehicle(veh));

    sim.run_until(40.0).unwrap();
    assert_eq!(sim.detections().len(), 1);
    assert_eq!(sim.pending_events(), 0);
}

/// Entering a lane the vehicle already occupies leaves its state untouched:
/// one registration, one occupant, and the fraction seeded from the first
/// entry.
#[test]
fn duplicate_registration_is_a_noop() {
    let (net, a, _b) = two_lane_network();
    let link_a = net.lane(a).link();

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &attributes(),
        &[(a, 30.0, Direction::Forward), (a, 55.0, Direction::Forward)],
        no_route(),
        cruise(10.0, 10.0),
    );

    let vehicle = sim.get_vehicle(veh);
    assert_eq!(vehicle.lane_count(), 1);
    assert_approx_eq!(vehicle.fraction_on(link_a).unwrap(), 0.3);
    assert_eq!(sim.network().lane(a).occupants(), vec![veh]);
}

/// Two identical runs produce bitwise-identical detections and positions.
#[test]
fn runs_are_deterministic() {
    fn run() -> (Vec<Detection>, Vec<(LaneId, f64)>) {
        let (mut net, a, b) = two_lane_network();
        net.add_detector(a, 30.0);
        net.add_detector(a, 100.0);
        net.add_detector(b, 50.0);

        let mut sim = Simulation::new(net);
        let veh = sim.add_vehicle(
            &attributes(),
            &[(a, 0.0, Direction::Forward)],
            no_route(),
            cruise(10.0, 10.0),
        );
        sim.run_until(30.0).unwrap();

        let vehicle = sim.get_vehicle(veh);
        let fractions = vehicle
            .fractional_positions(sim.network(), vehicle.reference(), 30.0)
            .unwrap();
        (sim.detections().to_vec(), fractions)
    }

    let (detections, fractions) = run();
    assert_eq!(detections.len(), 3);
    assert!(detections.windows(2).all(|w| w[0].time <= w[1].time));
    assert_eq!(run(), (detections, fractions));
}
