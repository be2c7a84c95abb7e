//! Tests of continuation-lane resolution at branches.

use lane_sim::{
    CruisePlanner, Direction, FixedRoutePlanner, LaneId, Network, NodeId, SimError, Simulation,
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

fn cruise() -> Box<CruisePlanner> {
    Box::new(CruisePlanner {
        velocity: 10.0,
        step: 10.0,
    })
}

/// A 100 m entry lane branching into two 500 m lanes at its end node.
/// Returns the network, the entry lane, the branch lanes and the nodes on
/// the path through each branch.
fn branch_network(
    reconverge: bool,
) -> (Network, LaneId, LaneId, LaneId, Vec<NodeId>) {
    let mut net = Network::new();
    let n0 = net.add_node();
    let n1 = net.add_node();
    let n2 = net.add_node();
    let n3 = if reconverge { n2 } else { net.add_node() };
    let link_a = net.add_link(n0, n1);
    let a = net.add_lane(link_a, 100.0);
    let link_c = net.add_link(n1, n2);
    let c = net.add_lane(link_c, 500.0);
    let link_d = net.add_link(n1, n3);
    let d = net.add_lane(link_d, 500.0);
    net.connect(a, c, VehicleClass::ANY).unwrap();
    net.connect(a, d, VehicleClass::ANY).unwrap();
    (net, a, c, d, vec![n0, n1, n2])
}

#[test]
fn route_resolves_a_two_way_branch() {
    let (net, a, c, d, route) = branch_network(false);

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &attributes(),
        &[(a, 0.0, Direction::Forward)],
        Box::new(FixedRoutePlanner::new(route)),
        cruise(),
    );
    sim.run_until(0.0).unwrap();

    // The branch towards the route's next node wins.
    let vehicle = sim.get_vehicle(veh);
    assert!(vehicle.is_on(c));
    assert!(!vehicle.is_on(d));
}

/// Both branches reach the route's next node, so the choice cannot be made
/// from the route alone and must not be made arbitrarily.
#[test]
fn reconverging_branches_are_rejected() {
    let (net, a, _c, _d, route) = branch_network(true);

    let mut sim = Simulation::new(net);
    sim.add_vehicle(
        &attributes(),
        &[(a, 0.0, Direction::Forward)],
        Box::new(FixedRoutePlanner::new(route)),
        cruise(),
    );

    assert!(matches!(
        sim.run_until(0.0),
        Err(SimError::NotYetSupported(..))
    ));
}

#[test]
fn dead_ends_fail_while_moving() {
    let mut net = Network::new();
    let n0 = net.add_node();
    let n1 = net.add_node();
    let link_a = net.add_link(n0, n1);
    let a = net.add_lane(link_a, 100.0);

    let mut sim = Simulation::new(net);
    sim.add_vehicle(
        &attributes(),
        &[(a, 0.0, Direction::Forward)],
        Box::new(FixedRoutePlanner::new(vec![n0, n1])),
        cruise(),
    );

    assert!(matches!(
        sim.run_until(0.0),
        Err(SimError::NetworkInconsistency(..))
    ));
}

/// A branch with no route to consult cannot be resolved.
#[test]
fn branches_need_a_route() {
    let (net, a, _c, _d, _route) = branch_network(false);

    let mut sim = Simulation::new(net);
    sim.add_vehicle(
        &attributes(),
        &[(a, 0.0, Direction::Forward)],
        Box::new(FixedRoutePlanner::new(vec![])),
        cruise(),
    );

    assert!(matches!(sim.run_until(0.0), Err(SimError::NoRoute(..))));
}

/// Lanes the vehicle already occupies are not continuation candidates, so a
/// vehicle mid lane change does not try to re-enter its own lane.
#[test]
fn occupied_candidates_are_excluded() {
    let (net, a, c, d, route) = branch_network(true);

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &attributes(),
        &[(a, 0.0, Direction::Forward), (c, 0.0, Direction::Forward)],
        Box::new(FixedRoutePlanner::new(route)),
        cruise(),
    );
    sim.run_until(0.0).unwrap();

    let vehicle = sim.get_vehicle(veh);
    assert!(vehicle.is_on(d));
    assert_eq!(vehicle.lane_count(), 3);
}

/// Connections closed to the vehicle's class never reach the planner; a
/// branch with a single permitted continuation is taken without a route.
#[test]
fn class_filter_prunes_the_branch() {
    let mut net = Network::new();
    let n0 = net.add_node();
    let n1 = net.add_node();
    let n2 = net.add_node();
    let n3 = net.add_node();
    let link_a = net.add_link(n0, n1);
    let a = net.add_lane(link_a, 100.0);
    let link_c = net.add_link(n1, n2);
    let c = net.add_lane(link_c, 500.0);
    let link_d = net.add_link(n1, n3);
    let d = net.add_lane(link_d, 500.0);
    net.connect(a, c, VehicleClass::TRUCK).unwrap();
    net.connect(a, d, VehicleClass::ANY).unwrap();

    let mut sim = Simulation::new(net);
    let veh = sim.add_vehicle(
        &attributes(),
        &[(a, 0.0, Direction::Forward)],
        Box::new(FixedRoutePlanner::new(vec![])),
        cruise(),
    );
    sim.run_until(0.0).unwrap();

    assert!(sim.get_vehicle(veh).is_on(d));
    assert!(!sim.get_vehicle(veh).is_on(c));
}
