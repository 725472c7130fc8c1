//! End-to-end runs of the simulation engine against its observable
//! contracts: determinism, epidemic boundary behaviors, redraw cadence,
//! confinement, and cooperative cancellation.

use std::sync::atomic::Ordering;

use epidemic_common::{SimError, SimulationConfig, Vec2};
use epidemic_engine::render::{ChannelRenderer, DrawProcedure, NullRenderer, Renderer};
use epidemic_engine::Simulation;

/// Small, fast baseline configuration for end-to-end runs.
fn base_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.run.seed = 9;
    config.run.time_limit = 20.0;
    config.run.redraw_hz = 8;
    config.population.size = 40;
    config.population.velocity_sigma = 25.0;
    config
}

fn run(config: SimulationConfig) -> (Simulation, epidemic_engine::RunSummary) {
    let mut sim = Simulation::new(config).expect("valid config");
    let summary = sim.simulate(&mut NullRenderer).expect("run succeeds");
    (sim, summary)
}

#[test]
fn identical_configs_produce_identical_runs() {
    let mut config = base_config();
    config.output.save_frames = true;

    let (sim_a, summary_a) = run(config.clone());
    let (sim_b, summary_b) = run(config);

    assert_eq!(summary_a, summary_b);
    assert_eq!(sim_a.individuals(), sim_b.individuals());
    assert_eq!(sim_a.history(), sim_b.history());
    assert_eq!(sim_a.recorded_frames(), sim_b.recorded_frames());
    assert!(summary_a.collisions > 0, "baseline run should be eventful");
}

#[test]
fn zero_infection_probability_never_spreads() {
    let mut config = base_config();
    config.run.time_limit = 30.0;
    config.disease.prob_infection = 0.0;

    let (_, summary) = run(config);
    assert_eq!(summary.infections, 0);
    let stats = summary.final_stats;
    // Only patient zero ever leaves Susceptible.
    assert_eq!(stats.susceptible, 39);
    assert_eq!(stats.infected + stats.recovered + stats.dead, 1);
}

#[test]
fn zero_death_probability_never_kills() {
    let mut config = base_config();
    config.run.time_limit = 60.0;
    config.disease.prob_infection = 1.0;
    config.disease.prob_dying = 0.0;

    let (_, summary) = run(config);
    assert_eq!(summary.deaths, 0);
    assert_eq!(summary.final_stats.dead, 0);
    assert_eq!(summary.recoveries + summary.final_stats.infected as u64, summary.infections + 1);
}

#[test]
fn zero_hz_schedules_no_redraws() {
    let mut config = base_config();
    config.run.redraw_hz = 0;
    config.output.save_frames = true;

    let (sim, summary) = run(config);
    assert_eq!(summary.redraws, 0);
    assert!(sim.recorded_frames().is_empty());
    assert!(sim.history().is_empty());
}

#[test]
fn stationary_pair_never_interacts() {
    let mut config = base_config();
    config.run.seed = 0;
    config.run.redraw_hz = 0;
    config.run.time_limit = 10.0;
    config.population.size = 2;
    config.population.velocity_sigma = 0.0;
    config.disease.prob_infection = 1.0;
    // Far past the horizon, so the infection never ends either.
    config.disease.time_infectious = 100.0;

    let (sim, summary) = run(config);
    assert_eq!(summary.events_dispatched, 0, "no motion, no redraws, nothing to dispatch");
    assert_eq!(summary.collisions, 0);
    let stats = summary.final_stats;
    assert_eq!((stats.infected, stats.susceptible, stats.recovered, stats.dead), (1, 1, 0, 0));
    for individual in sim.individuals() {
        assert_eq!(individual.velocity, Vec2::zero());
    }
}

#[test]
fn lone_individual_dies_and_queue_drains() {
    let mut config = base_config();
    config.run.seed = 1;
    config.run.redraw_hz = 0;
    config.run.time_limit = 100.0;
    config.population.size = 1;
    config.disease.time_infectious = 5.0;
    config.disease.prob_dying = 1.0;

    let (sim, summary) = run(config);
    assert_eq!(summary.deaths, 1);
    assert_eq!(summary.final_stats.dead, 1);
    let lone = &sim.individuals()[0];
    assert!(lone.is_dead());
    assert_eq!(lone.velocity, Vec2::zero());
    // The infection ended near its scheduled mean.
    assert!(summary.end_time > 0.0 && summary.end_time < 10.0);
}

#[test]
fn redraw_cadence_matches_hz() {
    let mut config = base_config();
    config.run.time_limit = 50.0;
    config.run.redraw_hz = 10;
    config.population.size = 5;
    config.population.velocity_sigma = 5.0;

    let (_, summary) = run(config);
    assert!(
        (499..=501).contains(&summary.redraws),
        "expected about Hz * time_limit redraws, got {}",
        summary.redraws
    );
}

#[test]
fn empty_population_dispatches_only_redraws() {
    let mut config = base_config();
    config.run.time_limit = 5.0;
    config.population.size = 0;

    let (_, summary) = run(config);
    assert_eq!(summary.events_dispatched, summary.redraws);
    assert_eq!(summary.final_stats.total(), 0);
}

#[test]
fn certain_transmission_spreads_on_contact() {
    let mut config = base_config();
    config.run.seed = 42;
    config.run.redraw_hz = 0;
    config.run.time_limit = 50.0;
    config.population.velocity_sigma = 50.0;
    config.disease.prob_infection = 1.0;
    // Longer than the horizon: nobody recovers or dies during the run.
    config.disease.time_infectious = 100.0;

    let (_, summary) = run(config);
    assert!(summary.infections >= 1, "a dense fast population must transmit");
    assert_eq!(summary.final_stats.infected as u64, summary.infections + 1);
    assert_eq!(summary.final_stats.recovered, 0);
    assert_eq!(summary.final_stats.dead, 0);
    // Every collision invalidates earlier predictions for the pair.
    assert!(summary.stale_discarded > 0);
}

#[test]
fn frames_stay_confined_and_time_is_monotone() {
    let mut config = base_config();
    config.run.time_limit = 15.0;
    config.run.redraw_hz = 6;
    config.population.velocity_sigma = 30.0;
    config.output.save_frames = true;

    let (sim, summary) = run(config);
    assert!(summary.end_time <= 15.0, "horizon discipline");

    let frames = sim.recorded_frames();
    assert!(!frames.is_empty());
    let mut last_time = f64::NEG_INFINITY;
    for frame in frames {
        assert!(frame.time >= last_time, "redraw times must be non-decreasing");
        last_time = frame.time;
        for particle in &frame.particles {
            // Frame positions are f32, so allow a coarser tolerance than
            // the engine's own root-finding epsilon.
            assert!(f64::from(particle.x.abs()) <= 500.0 - 8.0 + 1e-3);
            assert!(f64::from(particle.y.abs()) <= 250.0 - 8.0 + 1e-3);
        }
    }
}

#[test]
fn cancellation_stops_the_run_early() {
    let mut config = base_config();
    config.run.time_limit = 10_000.0;
    config.run.redraw_hz = 2;
    config.population.size = 100;
    config.population.velocity_sigma = 20.0;

    let mut sim = Simulation::new(config).unwrap();
    let token = sim.cancel_token();
    let (mut renderer, rx) = ChannelRenderer::with_capacity(4);

    let handle = std::thread::spawn(move || sim.simulate(&mut renderer).unwrap());

    // The first delivered procedure proves the dispatch loop is running.
    let _first_frame = rx.recv().expect("initial redraw arrives");
    token.store(true, Ordering::Relaxed);

    let summary = handle.join().unwrap();
    assert!(
        summary.end_time < 10_000.0,
        "run must stop long before the horizon, stopped at {}",
        summary.end_time
    );
}

#[test]
fn renderer_failures_are_not_fatal() {
    struct FailingRenderer;
    impl Renderer for FailingRenderer {
        fn draw_with(&mut self, _procedure: DrawProcedure) -> Result<(), SimError> {
            Err(SimError::Render("display lost".to_string()))
        }
    }

    let mut config = base_config();
    config.run.time_limit = 5.0;
    let mut sim = Simulation::new(config).unwrap();
    let summary = sim.simulate(&mut FailingRenderer).expect("run survives render errors");
    assert!(summary.redraws > 0);
}

#[test]
fn dense_population_still_places() {
    // 800 disks cover about a third of the arena, well below the density
    // where rejection sampling starts thrashing.
    let mut config = base_config();
    config.population.size = 800;
    config.run.time_limit = 0.5;
    config.run.redraw_hz = 0;
    config.population.velocity_sigma = 0.0;

    let mut sim = Simulation::new(config).unwrap();
    let summary = sim.simulate(&mut NullRenderer).unwrap();
    assert_eq!(summary.final_stats.total(), 800);
}
