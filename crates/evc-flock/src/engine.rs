//! Fixed-step movement of agents along their paths.

use std::collections::HashMap;

use evc_core::EdgeKey;

use crate::{FlockError, FlockPath, FlockResult, FlockStatus, FlockStore, TimedSegment, Trajectory, TrajectoryPoint};

// ── FlockConfig ───────────────────────────────────────────────────────────────

/// Movement parameters.  Times and distances use the units of the paths.
#[derive(Debug, Clone, PartialEq)]
pub struct FlockConfig {
    /// Base speed in distance per time unit.
    pub speed:               f64,
    /// Each agent's speed is drawn from `speed * [1 - jitter, 1 + jitter]`.
    pub speed_jitter:        f64,
    /// Smallest gap an agent keeps to the agent in front on the same edge.
    pub spacing:             f64,
    pub simulation_interval: f64,
    /// Rounded to a whole number of simulation steps.
    pub snapshot_interval:   f64,
    /// Delay between consecutive agents of the same path.
    pub start_spacing:       f64,
    pub max_time:            f64,
    pub seed:                u64,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            speed:               1.0,
            speed_jitter:        0.0,
            spacing:             0.01,
            simulation_interval: 0.1,
            snapshot_interval:   1.0,
            start_spacing:       0.0,
            max_time:            10_000.0,
            seed:                0,
        }
    }
}

impl FlockConfig {
    pub fn validate(&self) -> FlockResult<()> {
        let bad = |what: &str, v: f64| Err(FlockError::Config(format!("{what} = {v}")));
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return bad("speed", self.speed);
        }
        if !(0.0..1.0).contains(&self.speed_jitter) {
            return bad("speed_jitter", self.speed_jitter);
        }
        if !self.spacing.is_finite() || self.spacing < 0.0 {
            return bad("spacing", self.spacing);
        }
        if !self.simulation_interval.is_finite() || self.simulation_interval <= 0.0 {
            return bad("simulation_interval", self.simulation_interval);
        }
        if !self.snapshot_interval.is_finite() || self.snapshot_interval < self.simulation_interval {
            return bad("snapshot_interval", self.snapshot_interval);
        }
        if !self.start_spacing.is_finite() || self.start_spacing < 0.0 {
            return bad("start_spacing", self.start_spacing);
        }
        if self.max_time.is_nan() || self.max_time <= 0.0 {
            return bad("max_time", self.max_time);
        }
        Ok(())
    }
}

// ── FlockReport ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FlockReport {
    pub agents:     usize,
    /// Agents that reached the end of their path.
    pub finished:   usize,
    /// Agent-steps that ended closer than the spacing to the agent in front.
    pub collisions: u64,
    pub end_time:   f64,
}

// ── FlockEngine ───────────────────────────────────────────────────────────────

/// Moves one agent per person along the given paths in fixed time steps.
///
/// Each step, agents on the same edge are moved leaders first.  An agent
/// never passes an agent that was in front of it on its edge: it stops
/// `spacing` behind instead, or stays put if it is already closer.
pub struct FlockEngine {
    config:             FlockConfig,
    paths:              Vec<FlockPath>,
    pub store:          FlockStore,
    time:               f64,
    steps:              u64,
    steps_per_snapshot: u64,
    collisions:         u64,
}

impl FlockEngine {
    pub fn new(config: FlockConfig, paths: Vec<FlockPath>) -> FlockResult<Self> {
        config.validate()?;
        for path in &paths {
            if let Some(s) = path.segments.iter().find(|s| !s.length.is_finite() || s.length < 0.0) {
                return Err(FlockError::Config(format!(
                    "path of evacuee {} has a segment on {} with length {}",
                    path.evacuee_id, s.edge, s.length
                )));
            }
        }

        let store = FlockStore::new(&paths, &config);
        let steps_per_snapshot = (config.snapshot_interval / config.simulation_interval).round().max(1.0) as u64;
        log::debug!("flocking: {} agents on {} paths", store.len(), paths.len());

        Ok(Self { config, paths, store, time: 0.0, steps: 0, steps_per_snapshot, collisions: 0 })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// `true` once every agent has reached the end of its path.
    pub fn is_done(&self) -> bool {
        self.store.states.iter().all(|s| s.status == FlockStatus::End)
    }

    /// Advance every started agent by one simulation interval.
    pub fn step(&mut self) {
        let now = self.time;
        let next = now + self.config.simulation_interval;
        self.steps += 1;
        let snapshot = self.steps % self.steps_per_snapshot == 0;
        let spacing = self.config.spacing;

        let paths = &self.paths;
        let states = &mut self.store.states;
        let trajectories = &mut self.store.trajectories;
        let key_of = |path: usize, segment: usize| paths[path].segments.get(segment).map(|s| s.edge);

        // Leaders first on every edge.
        let mut order: Vec<usize> = (0..states.len()).filter(|&a| states[a].is_active(next)).collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (&states[a], &states[b]);
            key_of(sa.path, sa.segment)
                .cmp(&key_of(sb.path, sb.segment))
                .then(sb.offset.total_cmp(&sa.offset))
                .then(a.cmp(&b))
        });

        let mut placed: HashMap<EdgeKey, Vec<f64>> = HashMap::new();
        let mut collisions = 0;
        for a in order {
            let s = &mut states[a];
            let segments = &paths[s.path].segments;
            if s.status == FlockStatus::Init {
                trajectories[a].points.push(TrajectoryPoint {
                    time:    s.start_time,
                    segment: 0,
                    offset:  0.0,
                    status:  FlockStatus::Init,
                });
            }

            let (before_segment, before_offset) = (s.segment, s.offset);
            let elapsed = next - now.max(s.start_time);
            let leftover = advance(segments, &mut s.segment, &mut s.offset, s.speed * elapsed);

            if s.segment >= segments.len() {
                let (segment, offset) = match segments.last() {
                    Some(last) => (segments.len() - 1, last.length),
                    None => (0, 0.0),
                };
                s.segment = segment;
                s.offset = offset;
                s.status = FlockStatus::End;
                trajectories[a].points.push(TrajectoryPoint {
                    time: next - leftover / s.speed,
                    segment,
                    offset,
                    status: FlockStatus::End,
                });
                continue;
            }

            let key = segments[s.segment].edge;
            let floor = if s.segment == before_segment { before_offset } else { 0.0 };
            let ahead = placed
                .get(&key)
                .and_then(|offsets| offsets.iter().copied().filter(|&o| o >= floor).min_by(f64::total_cmp));

            s.status = FlockStatus::Moving;
            if let Some(ahead) = ahead
                && ahead - s.offset < spacing
            {
                s.offset = (ahead - spacing).max(floor);
                s.status = if ahead - s.offset < spacing {
                    collisions += 1;
                    FlockStatus::Collided
                } else if s.segment == before_segment && s.offset <= before_offset {
                    FlockStatus::Stopped
                } else {
                    FlockStatus::Moving
                };
            }
            placed.entry(key).or_default().push(s.offset);

            if snapshot {
                trajectories[a].points.push(TrajectoryPoint {
                    time:    next,
                    segment: s.segment,
                    offset:  s.offset,
                    status:  s.status,
                });
            }
        }

        self.collisions += collisions;
        self.time = next;
    }

    /// Step until every agent has arrived or `max_time` is reached.
    pub fn run(&mut self) -> FlockReport {
        while !self.is_done() && self.time < self.config.max_time {
            self.step();
        }
        let report = self.report();
        if report.finished < report.agents {
            log::warn!(
                "flocking stopped at time {}: {} of {} agents still on the way",
                report.end_time,
                report.agents - report.finished,
                report.agents
            );
        }
        log::info!(
            "flocking: {} agents arrived by time {:.3}, {} collisions",
            report.finished,
            report.end_time,
            report.collisions
        );
        report
    }

    pub fn report(&self) -> FlockReport {
        FlockReport {
            agents:     self.store.len(),
            finished:   self.store.finished(),
            collisions: self.collisions,
            end_time:   self.time,
        }
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.store.trajectories
    }

    pub fn into_trajectories(self) -> Vec<Trajectory> {
        self.store.trajectories
    }
}

/// Move `distance` along `segments` from (`segment`, `offset`).  Returns the
/// distance left over after the last segment, or 0 if the path continues.
fn advance(segments: &[TimedSegment], segment: &mut usize, offset: &mut f64, distance: f64) -> f64 {
    let mut left = distance;
    while let Some(s) = segments.get(*segment) {
        let room = s.length - *offset;
        if left < room {
            *offset += left;
            return 0.0;
        }
        left -= room;
        *segment += 1;
        *offset = 0.0;
    }
    left
}
