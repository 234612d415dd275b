//! The `FlockStore` — per-agent state and trajectories, indexed by agent.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::{AgentState, FlockConfig, FlockPath, FlockStatus, Trajectory};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Agent state and trajectory vectors, both indexed by agent number.
///
/// Agents are numbered path by path: all agents of path 0 first, then path
/// 1, and so on.  Within a path, agent `k` starts `k * start_spacing` after
/// the path's start time.
pub struct FlockStore {
    pub states:       Vec<AgentState>,
    pub trajectories: Vec<Trajectory>,
}

impl FlockStore {
    pub fn new(paths: &[FlockPath], config: &FlockConfig) -> Self {
        let count: usize = paths.iter().map(FlockPath::agent_count).sum();
        let mut states = Vec::with_capacity(count);
        let mut trajectories = Vec::with_capacity(count);

        for (p, path) in paths.iter().enumerate() {
            for k in 0..path.agent_count() {
                let agent = states.len() as u32;
                states.push(AgentState {
                    path:       p,
                    segment:    0,
                    offset:     0.0,
                    speed:      agent_speed(config, agent),
                    start_time: path.start_time + k as f64 * config.start_spacing,
                    status:     FlockStatus::Init,
                });
                trajectories.push(Trajectory { agent, evacuee_id: path.evacuee_id, points: Vec::new() });
            }
        }
        Self { states, trajectories }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn finished(&self) -> usize {
        self.states.iter().filter(|s| s.status == FlockStatus::End).count()
    }
}

/// Base speed scaled by a uniform factor in `[1 - jitter, 1 + jitter]`,
/// drawn from a generator seeded by the run seed and the agent number.
fn agent_speed(config: &FlockConfig, agent: u32) -> f64 {
    if config.speed_jitter <= 0.0 {
        return config.speed;
    }
    let seed = config.seed ^ (agent as u64).wrapping_mul(MIXING_CONSTANT);
    let mut rng = SmallRng::seed_from_u64(seed);
    config.speed * (1.0 + config.speed_jitter * rng.gen_range(-1.0..=1.0))
}
