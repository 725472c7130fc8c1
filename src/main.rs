use anyhow::Result;
use env_logger::Builder;
use log::{debug, error, info, LevelFilter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use epidemic_common::{Frame, History, OutputConfig, SimulationConfig};
use epidemic_engine::render::NullRenderer;
use epidemic_engine::Simulation;

fn main() -> Result<()> {
    // Initialize the logger
    let mut builder = Builder::from_default_env();
    builder
        .format(|buf, record| writeln!(buf, "{} - {}", record.level(), record.args()))
        .filter(None, LevelFilter::Info)
        .init();

    info!("Starting Epidemic Simulation Engine...");

    // Load Configuration
    info!("Loading configuration from config.toml...");
    let config = match SimulationConfig::load("config.toml") {
        Ok(cfg) => {
            info!("Configuration loaded successfully.");
            debug!("Loaded config: {:#?}", cfg);
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            anyhow::bail!("Configuration loading failed.");
        }
    };

    let output = config.output.clone();

    // Initialize Simulation
    let start_init = Instant::now();
    let mut sim = match Simulation::new(config) {
        Ok(s) => {
            info!(
                "Simulation initialized in {:.2} ms.",
                start_init.elapsed().as_secs_f64() * 1000.0
            );
            s
        }
        Err(e) => {
            error!("Failed to initialize simulation: {}", e);
            anyhow::bail!("Simulation initialization failed.");
        }
    };

    // --- Run ---
    let mut renderer = NullRenderer;
    let start_time = Instant::now();
    let summary = match sim.simulate(&mut renderer) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Simulation failed: {}", e);
            anyhow::bail!("Simulation run failed.");
        }
    };
    let total_duration = start_time.elapsed();

    info!(
        "Simulation finished in {:.3} seconds ({} events, {:.0} events/s).",
        total_duration.as_secs_f64(),
        summary.events_dispatched,
        summary.events_dispatched as f64 / total_duration.as_secs_f64().max(1e-9)
    );
    info!(
        "Outcome at t = {:.1}: {} infected, {} non-infected, {} recovered, {} dead \
         ({} collisions, {} wall bounces, {} infections, {} redraws).",
        summary.end_time,
        summary.final_stats.infected,
        summary.final_stats.susceptible,
        summary.final_stats.recovered,
        summary.final_stats.dead,
        summary.collisions,
        summary.wall_bounces,
        summary.infections,
        summary.redraws
    );

    // --- Save Recorded Data ---
    if output.save_history {
        let now = Instant::now();
        save_history(&output, sim.history())?;
        info!("History saved in {:.2} seconds.", now.elapsed().as_secs_f32());
    } else {
        info!("Skipping history output as per config (save_history is false).");
    }

    if output.save_frames {
        let streamed =
            output.streaming_frames && output.format.as_deref().unwrap_or("bincode") == "bincode";
        if streamed {
            // Frames were written incrementally during the run.
            info!("Frame data saved incrementally during the run.");
        } else {
            let now = Instant::now();
            save_frames(&output, sim.recorded_frames())?;
            info!("Frame data saved in {:.2} seconds.", now.elapsed().as_secs_f32());
        }
    }

    if output.save_state {
        save_final_state(&output, &sim)?;
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Writes the history time series in the configured output format.
fn save_history(output: &OutputConfig, history: &History) -> Result<()> {
    let format = output.format.as_deref().unwrap_or("json");
    match format {
        "json" => {
            let filename = format!("{}_history.json", output.base_filename);
            let json_string = serde_json::to_string(history)?;
            std::fs::write(&filename, json_string.as_bytes())?;
            info!("History saved to {}", filename);
        }
        "bincode" => {
            let filename = format!("{}_history.bin", output.base_filename);
            let file = File::create(&filename)?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, history)?;
            writer.flush()?;
            info!("History saved to {} (binary format)", filename);
        }
        "messagepack" => {
            let filename = format!("{}_history.msgpack", output.base_filename);
            let mut file = File::create(&filename)?;
            rmp_serde::encode::write(&mut file, history)?;
            info!("History saved to {} (MessagePack format)", filename);
        }
        other => {
            error!("Unknown output format: {}. Using JSON instead.", other);
            let filename = format!("{}_history.json", output.base_filename);
            std::fs::write(&filename, serde_json::to_string(history)?.as_bytes())?;
            info!("History saved to {}", filename);
        }
    }
    Ok(())
}

/// Writes the in-memory frames with the same count-header layout the
/// streaming writer produces, so the visualizer reads either.
fn save_frames(output: &OutputConfig, frames: &[Frame]) -> Result<()> {
    let format = output.format.as_deref().unwrap_or("bincode");
    match format {
        "json" => {
            let filename = format!("{}_frames.json", output.base_filename);
            std::fs::write(&filename, serde_json::to_string(frames)?.as_bytes())?;
            info!("All {} frames saved to {}", frames.len(), filename);
        }
        "messagepack" => {
            let filename = format!("{}_frames.msgpack", output.base_filename);
            let mut file = File::create(&filename)?;
            rmp_serde::encode::write(&mut file, frames)?;
            info!("All {} frames saved to {} (MessagePack format)", frames.len(), filename);
        }
        _ => {
            let filename = format!("{}_frames.bin", output.base_filename);
            let file = File::create(&filename)?;
            let mut writer = BufWriter::with_capacity(256 * 1024, file);
            bincode::serialize_into(&mut writer, &(frames.len() as u32))?;
            for frame in frames {
                bincode::serialize_into(&mut writer, frame)?;
            }
            writer.flush()?;
            info!("All {} frames saved to {} (binary format)", frames.len(), filename);
        }
    }
    Ok(())
}

/// Writes the final per-individual state as CSV.
fn save_final_state(output: &OutputConfig, sim: &Simulation) -> Result<()> {
    let filename = format!("{}_final_state.csv", output.base_filename);
    let mut writer = csv::Writer::from_path(&filename)?;
    writer.write_record(["x", "y", "vx", "vy", "health", "collisions"])?;
    for individual in sim.individuals() {
        writer.write_record(&[
            format!("{:.4}", individual.position.x),
            format!("{:.4}", individual.position.y),
            format!("{:.4}", individual.velocity.x),
            format!("{:.4}", individual.velocity.y),
            format!("{:?}", individual.health()),
            individual.collisions().to_string(),
        ])?;
    }
    writer.flush()?;
    info!("Final state saved to {}", filename);
    Ok(())
}
