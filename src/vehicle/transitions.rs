//! The lane-transition scheduler.
//!
//! Runs once per move cycle, after a plan has been committed: predicts the
//! instants at which the vehicle's front crosses into new lanes and its
//! rear clears old ones, resolves branches through the strategical planner,
//! and emits the resulting future events.

use super::Vehicle;
use crate::direction::{distance_to_exit, entry_position, Direction};
use crate::events::EventKind;
use crate::network::Network;
use crate::{LaneId, SimError};
use smallvec::SmallVec;

/// Lane departures fire this long before the end of the step, in s, so
/// deregistration happens strictly within the step: after the step's
/// registrations, before the next move.
const LEAVE_MARGIN: f64 = 1e-9;

pub(crate) type ScheduledEvents = SmallVec<[(f64, EventKind); 4]>;

impl Vehicle {
    /// Predicts all lane crossings within the committed plan and returns
    /// the events to schedule. Registration on newly reached lanes happens
    /// immediately and retroactively, keeping the fractional bookkeeping
    /// continuous; departures are deferred to the end of the step.
    pub(crate) fn schedule_transitions(
        &mut self,
        network: &mut Network,
        _now: f64,
    ) -> Result<ScheduledEvents, SimError> {
        let Some(plan) = self.plan.clone() else {
            log::error!("vehicle {:?} has no committed plan to schedule from", self.id);
            return Ok(SmallVec::new());
        };
        // The exact distance the reference point covers during the step,
        // integrated from the committed profile. Monotone by construction.
        let move_si = plan.total_distance();
        let mut out = ScheduledEvents::new();

        // Snapshot: crossings register new lanes mid-loop, and those must
        // not be re-examined within the same step.
        let snapshot = self.lanes.clone();

        for (lane_id, dir) in snapshot {
            let (length, link) = {
                let lane = network.lane(lane_id);
                (lane.length(), lane.link())
            };
            let fraction = self
                .fraction_on(link)
                .ok_or(SimError::InconsistentState(link, self.id))?;
            let ref_start = fraction * length;
            let sign = dir.sign();
            let front_start = ref_start + sign * self.front_dx;
            let front_end = front_start + sign * move_si;

            // Detectors passed by the front while still on this lane.
            for &det in network.lane(lane_id).detectors() {
                let dist = sign * (det - front_start);
                if dist > 0.0 && dist <= move_si {
                    if let Some(t) = plan.time_at_distance(dist) {
                        out.push((
                            t,
                            EventKind::Detector {
                                vehicle: self.id,
                                lane: lane_id,
                                position: det,
                            },
                        ));
                    }
                }
            }

            // Front crossing: inclusive on the near side of the boundary,
            // exclusive on the far side.
            let crossing = match dir {
                Direction::Forward => front_start <= length && front_end > length,
                Direction::Backward => front_start >= 0.0 && front_end < 0.0,
            };
            if crossing {
                let (next_lane, next_dir) = match dir {
                    Direction::Forward => self.determine_next_lane(network, lane_id)?,
                    Direction::Backward => self.determine_prev_lane(network, lane_id)?,
                };
                let next_length = network.lane(next_lane).length();

                // Distance the front travels on the new lane this step.
                let overshoot = match dir {
                    Direction::Forward => front_end - length,
                    Direction::Backward => -front_end,
                };
                if overshoot > next_length {
                    return Err(SimError::NotYetSupported(
                        lane_id,
                        self.id,
                        "front would traverse more than one lane boundary in a single step",
                    ));
                }

                // Retroactive registration: the reference point is `gap`
                // metres short of the boundary at the start of the step.
                let gap = distance_to_exit(ref_start, length, dir);
                let entry = entry_position(gap, next_length, next_dir);
                self.enter_lane(network, next_lane, entry, next_dir);

                // Detectors on the new lane within the remainder of the step.
                let to_boundary = match dir {
                    Direction::Forward => length - front_start,
                    Direction::Backward => front_start,
                };
                for &det in network.lane(next_lane).detectors() {
                    let offset = match next_dir {
                        Direction::Forward => det,
                        Direction::Backward => next_length - det,
                    };
                    if offset >= 0.0 && offset <= overshoot {
                        if let Some(t) = plan.time_at_distance(to_boundary + offset) {
                            out.push((
                                t,
                                EventKind::Detector {
                                    vehicle: self.id,
                                    lane: next_lane,
                                    position: det,
                                },
                            ));
                        }
                    }
                }
            }

            // Rear departure, checked independently per lane.
            let rear_start = ref_start + sign * self.rear_dx;
            let rear_end = rear_start + sign * move_si;
            let leaving = match dir {
                Direction::Forward => rear_start <= length && rear_end > length,
                Direction::Backward => rear_start >= 0.0 && rear_end < 0.0,
            };
            if leaving {
                out.push((
                    plan.end_time() - LEAVE_MARGIN,
                    EventKind::LeaveLane {
                        vehicle: self.id,
                        lane: lane_id,
                    },
                ));
            }
        }
        Ok(out)
    }

    /// The unique lane a forward-travelling vehicle continues onto.
    pub(crate) fn determine_next_lane(
        &self,
        network: &Network,
        lane: LaneId,
    ) -> Result<(LaneId, Direction), SimError> {
        self.determine_continuation(network, lane, Direction::Forward)
    }

    /// The unique lane a backward-travelling vehicle continues onto.
    pub(crate) fn determine_prev_lane(
        &self,
        network: &Network,
        lane: LaneId,
    ) -> Result<(LaneId, Direction), SimError> {
        self.determine_continuation(network, lane, Direction::Backward)
    }

    /// Resolves the continuation of a lane in the given direction of
    /// travel. A single candidate is taken unconditionally; a branch is
    /// resolved through the strategical planner's next node. Zero matching
    /// candidates is a dead end; several matching candidates are an
    /// unsupported simultaneous continuation, never resolved arbitrarily.
    fn determine_continuation(
        &self,
        network: &Network,
        lane: LaneId,
        travel: Direction,
    ) -> Result<(LaneId, Direction), SimError> {
        let candidates: SmallVec<[(LaneId, Direction); 4]> = match travel {
            Direction::Forward => network.next_lanes(lane, self.class).collect(),
            Direction::Backward => network.prev_lanes(lane, self.class).collect(),
        };
        match candidates.as_slice() {
            [] => Err(SimError::NetworkInconsistency(lane, self.id)),
            [only] => Ok(*only),
            _ => {
                let link = network.lane(lane).link();
                let node = self.strategical.next_node(network, link, travel, self.class)?;
                // Lanes already occupied are excluded: mid lane change the
                // vehicle must not re-enter a lane it is on.
                let matching: SmallVec<[(LaneId, Direction); 2]> = candidates
                    .iter()
                    .copied()
                    .filter(|(l, _)| !self.is_on(*l))
                    .filter(|(l, _)| network.link(network.lane(*l).link()).touches(node))
                    .collect();
                match matching.as_slice() {
                    [] => Err(SimError::NetworkInconsistency(lane, self.id)),
                    [only] => Ok(*only),
                    _ => Err(SimError::NotYetSupported(
                        lane,
                        self.id,
                        "several continuations reach the route node",
                    )),
                }
            }
        }
    }
}
