//! Per-agent movement state and recorded trajectories.

use evc_core::EvacueeId;

/// Where an agent stands in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlockStatus {
    /// Waiting for its start time, or entering the network.
    Init,
    Moving,
    /// Held back by the agent in front.
    Stopped,
    /// Ended the step closer than the spacing to the agent in front.
    Collided,
    /// Reached the end of its path.
    End,
}

impl FlockStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FlockStatus::Init     => "Init",
            FlockStatus::Moving   => "Moving",
            FlockStatus::Stopped  => "Stopped",
            FlockStatus::Collided => "Collided",
            FlockStatus::End      => "End",
        }
    }
}

/// The movement state of a single agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    /// Index of the followed path.
    pub path:       usize,
    /// Index of the current segment within the path.
    pub segment:    usize,
    /// Distance travelled along the current segment.
    pub offset:     f64,
    pub speed:      f64,
    pub start_time: f64,
    pub status:     FlockStatus,
}

impl AgentState {
    pub fn is_active(&self, until: f64) -> bool {
        self.status != FlockStatus::End && self.start_time < until
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub time:    f64,
    pub segment: usize,
    pub offset:  f64,
    pub status:  FlockStatus,
}

/// Snapshots of one agent, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub agent:      u32,
    pub evacuee_id: EvacueeId,
    pub points:     Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }
}
