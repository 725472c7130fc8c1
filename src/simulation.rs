use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use epidemic_common::{
    Frame, FrameParticle, Health, History, SimError, SimParams, SimulationConfig, Statistics,
};

use crate::event::Event;
use crate::individual::Individual;
use crate::queue::EventQueue;
use crate::render::{paint_frame, Renderer};
use crate::rng::SimRng;

/// Rejection-sampling cap per population slot before initialization gives
/// up and reports the arena too crowded.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 1000;

/// Counters accumulated over one run. Two runs of the same configuration
/// produce identical summaries, which is what the determinism tests pin.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub events_dispatched: u64,
    pub stale_discarded: u64,
    pub collisions: u64,
    pub wall_bounces: u64,
    pub redraws: u64,
    pub infections: u64,
    pub recoveries: u64,
    pub deaths: u64,
    pub end_time: f64,
    pub final_stats: Statistics,
}

/// Incremental frame persistence. A placeholder count is written up front
/// and patched in once the run knows how many frames it produced.
enum FrameWriter {
    None,
    Bincode { writer: BufWriter<File>, count: u32 },
}

/// The event-driven simulation: owns the population, the event queue, the
/// RNG, and the simulation clock. Nothing else touches these during a run;
/// front-ends only ever see [`Frame`] snapshots.
pub struct Simulation {
    config: SimulationConfig,
    params: SimParams,
    individuals: Vec<Individual>,
    queue: EventQueue,
    rng: SimRng,
    time: f64,
    history: History,
    summary: RunSummary,
    cancel: Arc<AtomicBool>,
    recorded_frames: Vec<Frame>,
    frame_writer: FrameWriter,
}

impl Simulation {
    /// Validates the configuration and builds an idle simulation.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let params = config.params();
        debug!("Simulation parameters: {:?}", params);
        Ok(Simulation {
            individuals: Vec::new(),
            queue: EventQueue::new(params.time_limit),
            rng: SimRng::seeded(params.seed),
            time: 0.0,
            history: History::new(params.time_limit),
            summary: RunSummary::default(),
            cancel: Arc::new(AtomicBool::new(false)),
            recorded_frames: Vec::new(),
            frame_writer: FrameWriter::None,
            params,
            config,
        })
    }

    /// Cooperative cancellation flag, polled at the top of the dispatch
    /// loop. Hand a clone to the thread that owns the stop control.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Frames captured in memory during the last run (empty when frame
    /// saving is off or streaming to disk).
    pub fn recorded_frames(&self) -> &[Frame] {
        &self.recorded_frames
    }

    /// Runs one full simulation: initializes the population and the event
    /// queue, then dispatches events until the queue drains past the time
    /// horizon or the cancel flag is raised.
    pub fn simulate(&mut self, renderer: &mut dyn Renderer) -> Result<RunSummary, SimError> {
        self.initialize()?;
        info!(
            "Dispatching events for {} individuals up to t = {}",
            self.individuals.len(),
            self.params.time_limit
        );

        let mut baseline = Instant::now();
        while !self.cancel.load(Ordering::Relaxed) {
            let Some(event) = self.queue.dequeue() else {
                break;
            };
            if !event.is_valid(&self.individuals) {
                self.summary.stale_discarded += 1;
                continue;
            }

            // Advance every individual to the event instant, then dispatch.
            let dt = event.time() - self.time;
            for individual in &mut self.individuals {
                individual.advance(dt);
            }
            self.time = event.time();
            self.summary.events_dispatched += 1;

            match event {
                Event::Redraw { .. } => self.handle_redraw(renderer, &mut baseline),
                Event::Collision { a, b, .. } => self.handle_collision(a, b),
                Event::VerticalWallCollision { id, .. } => {
                    self.individuals[id].bounce_off_vertical_wall();
                    self.summary.wall_bounces += 1;
                    self.predict_collisions(id);
                }
                Event::HorizontalWallCollision { id, .. } => {
                    self.individuals[id].bounce_off_horizontal_wall();
                    self.summary.wall_bounces += 1;
                    self.predict_collisions(id);
                }
                Event::EndInfection { id, .. } => self.handle_end_infection(id),
            }
        }

        if self.cancel.load(Ordering::Relaxed) {
            info!("Simulation cancelled at t = {:.2}", self.time);
        }
        self.summary.end_time = self.time;
        self.summary.final_stats = self.tally();
        if let Err(e) = self.finalize_frame_writer() {
            warn!("Failed to finalize frame file: {}", e);
        }
        info!(
            "Run finished at t = {:.2}: {} events dispatched, {} stale discarded, final composition {:?}",
            self.summary.end_time,
            self.summary.events_dispatched,
            self.summary.stale_discarded,
            self.summary.final_stats
        );
        Ok(self.summary.clone())
    }

    /// Resets the clock, reseeds the RNG, places the population, infects
    /// patient zero, and precomputes the initial event set.
    fn initialize(&mut self) -> Result<(), SimError> {
        self.queue.clear();
        self.time = 0.0;
        self.rng = SimRng::seeded(self.params.seed);
        self.history.clear();
        self.summary = RunSummary::default();
        self.recorded_frames.clear();
        self.cancel.store(false, Ordering::Relaxed);
        self.frame_writer = self.open_frame_writer();

        self.populate()?;
        info!("Placed {} individuals.", self.individuals.len());

        if !self.individuals.is_empty() {
            let patient_zero = self.rng.pick(self.individuals.len());
            self.individuals[patient_zero].infect();
            self.schedule_end_infection(patient_zero);
            debug!("Individual {} starts out infected", patient_zero);
        }

        for id in 0..self.individuals.len() {
            self.predict_collisions(id);
        }
        if self.params.period.is_finite() {
            self.queue.enqueue(Event::Redraw { time: 0.0 });
        }
        debug!("Initial event queue holds {} events", self.queue.len());
        Ok(())
    }

    /// Places the population by rejection sampling: each slot redraws until
    /// its individual overlaps nobody already placed.
    fn populate(&mut self) -> Result<(), SimError> {
        let requested = self.params.population;
        self.individuals.clear();
        self.individuals.reserve(requested);
        for slot in 0..requested {
            let mut placed = false;
            for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                let candidate = Individual::random(&mut self.rng, &self.params);
                if self.individuals.iter().all(|other| !candidate.collides_with(other)) {
                    self.individuals.push(candidate);
                    placed = true;
                    break;
                }
            }
            if !placed {
                return Err(SimError::Placement {
                    placed: slot,
                    requested,
                    attempts: MAX_PLACEMENT_ATTEMPTS,
                });
            }
        }
        Ok(())
    }

    /// Enqueues every future collision of a live individual: one pair event
    /// against each other individual plus both wall events. Times past the
    /// horizon (including the infinite ones) are dropped at the queue.
    fn predict_collisions(&mut self, id: usize) {
        if self.individuals[id].is_dead() {
            return;
        }
        for other in 0..self.individuals.len() {
            if other == id {
                continue;
            }
            let dt = self.individuals[id].time_to_hit(&self.individuals[other]);
            self.queue
                .enqueue(Event::collision(self.time + dt, id, other, &self.individuals));
        }
        let dt = self.individuals[id].time_to_hit_vertical_wall(&self.params.arena);
        self.queue
            .enqueue(Event::vertical_wall(self.time + dt, id, &self.individuals));
        let dt = self.individuals[id].time_to_hit_horizontal_wall(&self.params.arena);
        self.queue
            .enqueue(Event::horizontal_wall(self.time + dt, id, &self.individuals));
    }

    fn handle_collision(&mut self, a: usize, b: usize) {
        // Transmission is resolved before the impulse so the contact uses
        // the pre-collision health states, in both directions.
        self.try_transmit(a, b);
        self.try_transmit(b, a);

        let (ia, ib) = pair_mut(&mut self.individuals, a, b);
        ia.bounce_off(ib);
        self.summary.collisions += 1;

        self.predict_collisions(a);
        self.predict_collisions(b);
    }

    fn try_transmit(&mut self, source: usize, target: usize) {
        if self.individuals[source].is_infected()
            && self.individuals[target].can_get_infected()
            && self.rng.bernoulli(self.params.prob_infection)
        {
            self.individuals[target].infect();
            self.summary.infections += 1;
            self.schedule_end_infection(target);
            debug!(
                "Individual {} infected individual {} at t = {:.3}",
                source, target, self.time
            );
        }
    }

    /// Schedules the end of a fresh infection at `now + Normal(mean, 1)`,
    /// clamped so the event can never land in the past.
    fn schedule_end_infection(&mut self, id: usize) {
        let duration = self.rng.normal(self.params.time_infectious, 1.0).max(0.0);
        self.queue.enqueue(Event::EndInfection {
            time: self.time + duration,
            id,
        });
    }

    fn handle_end_infection(&mut self, id: usize) {
        let was_infected = self.individuals[id].is_infected();
        let die = self.rng.bernoulli(self.params.prob_dying);
        self.individuals[id].end_infection(die);
        if was_infected {
            if die {
                self.summary.deaths += 1;
                debug!("Individual {} died at t = {:.3}", id, self.time);
            } else {
                self.summary.recoveries += 1;
            }
        }
    }

    fn handle_redraw(&mut self, renderer: &mut dyn Renderer, baseline: &mut Instant) {
        let stats = self.tally();
        self.history.record(self.time, &stats);

        let frame = self.capture_frame(stats);
        self.record_frame(&frame);

        let chart = self.history.up_to(self.time);
        let arena = self.params.arena;
        let radius = self.params.radius;
        let procedure = Box::new(move |ctx: &mut dyn crate::render::GraphicsContext| {
            paint_frame(ctx, &frame, &chart, &arena, radius)
        });
        if let Err(e) = renderer.draw_with(procedure) {
            // A missed frame must not abort the run.
            warn!("Redraw failed: {}", e);
        }
        self.summary.redraws += 1;

        if self.config.output.realtime {
            let elapsed_ms = baseline.elapsed().as_millis() as u64;
            std::thread::sleep(Duration::from_millis(10u64.saturating_sub(elapsed_ms).max(1)));
            *baseline = Instant::now();
        }

        self.queue.enqueue(Event::Redraw {
            time: self.time + self.params.period,
        });
    }

    fn tally(&self) -> Statistics {
        let mut stats = Statistics::default();
        for individual in &self.individuals {
            match individual.health() {
                Health::Susceptible => stats.susceptible += 1,
                Health::Infected => stats.infected += 1,
                Health::Recovered => stats.recovered += 1,
                Health::Dead => stats.dead += 1,
            }
        }
        stats
    }

    /// Publishes the state as of now: positions and health only, detached
    /// from the live population.
    fn capture_frame(&self, stats: Statistics) -> Frame {
        Frame {
            time: self.time,
            stats,
            particles: self
                .individuals
                .iter()
                .map(|i| FrameParticle {
                    x: i.position.x as f32,
                    y: i.position.y as f32,
                    health: i.health(),
                })
                .collect(),
        }
    }

    fn open_frame_writer(&self) -> FrameWriter {
        let output = &self.config.output;
        if !(output.save_frames && output.streaming_frames) {
            return FrameWriter::None;
        }
        let format = output.format.as_deref().unwrap_or("bincode");
        if format != "bincode" {
            warn!("Incremental frame writing is only supported for the bincode format.");
            return FrameWriter::None;
        }
        let filename = format!("{}_frames.bin", output.base_filename);
        match File::create(&filename) {
            Ok(file) => {
                let mut writer = BufWriter::with_capacity(256 * 1024, file);
                // Placeholder count, patched in by finalize.
                match bincode::serialize_into(&mut writer, &0u32) {
                    Ok(()) => {
                        info!("Initialized incremental frame writer to {}", filename);
                        FrameWriter::Bincode { writer, count: 0 }
                    }
                    Err(e) => {
                        error!("Failed to initialize frame writer: {}", e);
                        FrameWriter::None
                    }
                }
            }
            Err(e) => {
                error!("Failed to create frame file '{}': {}", filename, e);
                FrameWriter::None
            }
        }
    }

    fn record_frame(&mut self, frame: &Frame) {
        if !self.config.output.save_frames {
            return;
        }
        match &mut self.frame_writer {
            FrameWriter::Bincode { writer, count } => {
                match bincode::serialize_into(&mut *writer, frame) {
                    Ok(()) => *count += 1,
                    Err(e) => {
                        error!("Failed to write incremental frame: {}", e);
                        self.recorded_frames.push(frame.clone());
                    }
                }
            }
            FrameWriter::None => self.recorded_frames.push(frame.clone()),
        }
    }

    /// Patches the frame count into the header of the streaming frame file.
    fn finalize_frame_writer(&mut self) -> Result<(), SimError> {
        let writer = std::mem::replace(&mut self.frame_writer, FrameWriter::None);
        if let FrameWriter::Bincode { mut writer, count } = writer {
            writer
                .flush()
                .map_err(|e| SimError::Render(format!("flushing frame writer: {}", e)))?;
            let file = writer.get_mut();
            file.seek(SeekFrom::Start(0))
                .map_err(|e| SimError::Render(format!("seeking in frame file: {}", e)))?;
            bincode::serialize_into(&mut *file, &count)
                .map_err(|e| SimError::Render(format!("writing frame count: {}", e)))?;
            info!("Finalized frame file with {} frames", count);
        }
        Ok(())
    }
}

/// Disjoint mutable borrows of two individuals.
fn pair_mut(individuals: &mut [Individual], a: usize, b: usize) -> (&mut Individual, &mut Individual) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = individuals.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = individuals.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullRenderer;
    use epidemic_common::Vec2;

    fn config(population: u32, time_limit: f64) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.population.size = population;
        config.run.time_limit = time_limit;
        config.run.seed = 12;
        config
    }

    #[test]
    fn placement_produces_disjoint_contained_disks() {
        // Stationary population: the final state is the initial placement.
        let mut config = config(200, 1.0);
        config.run.redraw_hz = 0;
        config.population.velocity_sigma = 0.0;
        let mut sim = Simulation::new(config).unwrap();
        sim.simulate(&mut NullRenderer).unwrap();
        let individuals = sim.individuals();
        assert_eq!(individuals.len(), 200);
        for a in 0..individuals.len() {
            assert!(sim.params().arena.contains(individuals[a].position, 8.0, 1e-6));
            for b in (a + 1)..individuals.len() {
                assert!(!individuals[a].collides_with(&individuals[b]));
            }
        }
    }

    #[test]
    fn empty_population_runs_to_completion() {
        let mut sim = Simulation::new(config(0, 5.0)).unwrap();
        let summary = sim.simulate(&mut NullRenderer).unwrap();
        assert_eq!(summary.final_stats, Statistics::default());
        assert_eq!(summary.collisions, 0);
        assert!(summary.redraws > 0, "redraw events still fire");
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut bad = SimulationConfig::default();
        bad.population.size = 5000;
        assert!(matches!(Simulation::new(bad), Err(SimError::Config(_))));
    }

    #[test]
    fn pair_mut_returns_disjoint_borrows() {
        let mut individuals = vec![
            Individual::new(Vec2::zero(), Vec2::zero(), 8.0, 1.0),
            Individual::new(Vec2::new(100.0, 0.0), Vec2::zero(), 8.0, 1.0),
        ];
        let (a, b) = pair_mut(&mut individuals, 1, 0);
        a.position.x = 1.0;
        b.position.x = 2.0;
        assert_eq!(individuals[1].position.x, 1.0);
        assert_eq!(individuals[0].position.x, 2.0);
    }
}
