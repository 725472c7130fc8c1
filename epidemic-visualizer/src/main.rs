use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

use epidemic_common::{Frame, ARENA_HEIGHT, ARENA_WIDTH, INDIVIDUAL_RADIUS};

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input frame file path (.bin, as written by the engine)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the numbered PNG frames are written into
    #[arg(short, long, default_value = "frames")]
    output_dir: PathBuf,

    /// Width of the output images in pixels (height follows the arena
    /// aspect ratio plus the chart strip)
    #[arg(long, default_value_t = 1000)]
    width: u32,

    /// Render every Nth frame
    #[arg(long, default_value_t = 1)]
    every: usize,

    /// Optional TTF/OTF font file for the statistics text overlay
    #[arg(long)]
    font: Option<PathBuf>,

    /// Background color name
    #[arg(long, default_value = "white")]
    bg_color: String,

    /// Chunk size for parallel processing
    #[arg(long, default_value_t = 25)]
    chunk_size: usize,
}

// Color definitions for named colors (RGBA format)
const COLOR_MAP: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("gray", [230, 230, 230, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
];

/// Height of the composition chart strip below the arena, in pixels.
const CHART_STRIP_PX: u32 = 100;

/// Parse a color name to RGBA values
fn parse_color(color_name: &str) -> [u8; 4] {
    for &(name, color) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color_name) {
            return color;
        }
    }
    warn!("Color '{}' not recognized, using white.", color_name);
    [255, 255, 255, 255]
}

/// One point of the precomputed composition series.
#[derive(Clone, Copy)]
struct ChartPoint {
    infected: f32,
    susceptible: f32,
}

fn main() -> Result<()> {
    let mut builder = Builder::from_default_env();
    builder
        .format(|buf, record| writeln!(buf, "{} - {}", record.level(), record.args()))
        .filter(None, LevelFilter::Info)
        .init();

    let args = Args::parse();
    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    let bg_color = parse_color(&args.bg_color);

    let font = match &args.font {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read font file: {}", path.display()))?;
            Some(FontVec::try_from_vec(bytes).context("Failed to parse font file")?)
        }
        None => {
            info!("No font supplied; statistics text overlay disabled.");
            None
        }
    };

    // --- Open and Parse Frame File ---
    info!("Opening frame file: {}", args.input.display());
    let input_file = File::open(&args.input)
        .with_context(|| format!("Failed to open input file: {}", args.input.display()))?;
    let mut reader = BufReader::new(input_file);

    let frame_count: u32 = bincode::deserialize_from(&mut reader)
        .context("Failed to read frame count from header")?;
    info!("Found {} frames in the file", frame_count);

    if frame_count == 0 {
        warn!("Input file contains no frames. Exiting.");
        return Ok(());
    }

    let mut frames = Vec::with_capacity(frame_count as usize);
    for i in 0..frame_count {
        let frame: Frame = bincode::deserialize_from(&mut reader)
            .with_context(|| format!("Failed to read frame {}", i))?;
        frames.push(frame);
    }

    // Precompute the composition series once; each image draws its prefix.
    let series: Vec<ChartPoint> = frames
        .iter()
        .map(|f| ChartPoint {
            infected: f.stats.percent_infected(),
            susceptible: f.stats.percent_susceptible(),
        })
        .collect();

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output dir: {}", args.output_dir.display()))?;

    let every = args.every.max(1);
    let selected: Vec<(usize, &Frame)> =
        frames.iter().enumerate().step_by(every).collect();

    let progress_bar = ProgressBar::new(selected.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Rendering frames");

    let start_time = Instant::now();

    // PNG frames are independent files, so chunks render and save in
    // parallel without any ordering machinery.
    let results: Vec<Result<()>> = selected
        .par_chunks(args.chunk_size.max(1))
        .map(|chunk| {
            for &(index, frame) in chunk {
                let image = draw_frame(frame, index, &series, args.width, bg_color, font.as_ref());
                let path = args.output_dir.join(format!("frame_{:05}.png", index));
                image
                    .save(&path)
                    .with_context(|| format!("Failed to save {}", path.display()))?;
            }
            progress_bar.inc(chunk.len() as u64);
            Ok(())
        })
        .collect();
    for result in results {
        result?;
    }

    progress_bar.finish_with_message(format!("Rendered {} frames", selected.len()));
    let duration = start_time.elapsed();
    info!(
        "Rendering completed in {:.2?} ({:.1} frames per second)",
        duration,
        selected.len() as f64 / duration.as_secs_f64().max(1e-9)
    );
    info!("Output saved to: {}", args.output_dir.display());

    Ok(())
}

/// Renders one frame: arena with individuals above, composition chart strip
/// below, optional statistics text.
fn draw_frame(
    frame: &Frame,
    index: usize,
    series: &[ChartPoint],
    width: u32,
    bg_color: [u8; 4],
    font: Option<&FontVec>,
) -> RgbaImage {
    let ppu = width as f64 / ARENA_WIDTH;
    let arena_px_h = (ARENA_HEIGHT * ppu).round() as u32;
    let height = arena_px_h + CHART_STRIP_PX;
    let mut image = RgbaImage::from_pixel(width, height, Rgba(bg_color));

    // World coordinates are centered on the arena; images have y down.
    let to_px = |x: f64, y: f64| -> (i32, i32) {
        (
            ((x + ARENA_WIDTH / 2.0) * ppu).round() as i32,
            ((ARENA_HEIGHT / 2.0 - y) * ppu).round() as i32,
        )
    };

    // Chart strip: stacked composition columns up to the current frame.
    let chart_top = arena_px_h as i32;
    let column_width = (width as f64 / series.len() as f64).ceil().max(1.0) as u32;
    for (k, point) in series.iter().take(index + 1).enumerate() {
        let x = (k as f64 / series.len() as f64 * width as f64) as i32;
        let infected_px = (f64::from(point.infected) / 100.0 * CHART_STRIP_PX as f64) as u32;
        let susceptible_px = (f64::from(point.susceptible) / 100.0 * CHART_STRIP_PX as f64) as u32;
        let removed_px = CHART_STRIP_PX.saturating_sub(infected_px + susceptible_px);

        let mut y = height as i32;
        for (band_px, color) in [
            (infected_px, [255u8, 0, 0, 255]),
            (susceptible_px, [0, 0, 220, 255]),
            (removed_px, [0, 200, 0, 255]),
        ] {
            if band_px == 0 {
                continue;
            }
            y -= band_px as i32;
            draw_filled_rect_mut(
                &mut image,
                Rect::at(x, y.max(chart_top)).of_size(column_width, band_px),
                Rgba(color),
            );
        }
    }

    // Individuals, colored by health state.
    let radius_px = ((INDIVIDUAL_RADIUS * ppu).round() as i32).max(1);
    for particle in &frame.particles {
        let (cx, cy) = to_px(f64::from(particle.x), f64::from(particle.y));
        let [r, g, b] = particle.health.color();
        draw_filled_circle_mut(&mut image, (cx, cy), radius_px, Rgba([r, g, b, 255]));
    }

    // Arena border.
    draw_hollow_rect_mut(
        &mut image,
        Rect::at(0, 0).of_size(width, arena_px_h),
        Rgba([0, 0, 0, 255]),
    );

    // Statistics text overlay.
    if let Some(font) = font {
        let stats = &frame.stats;
        let text = format!(
            "t = {:.1}   infected: {}   non-infected: {}   recovered: {}   dead: {}",
            frame.time, stats.infected, stats.susceptible, stats.recovered, stats.dead
        );
        draw_text_mut(
            &mut image,
            Rgba([0, 0, 0, 255]),
            8,
            8,
            PxScale::from(18.0),
            font,
            &text,
        );
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use epidemic_common::{FrameParticle, Health, Statistics};

    fn frame() -> Frame {
        Frame {
            time: 2.0,
            stats: Statistics { infected: 1, susceptible: 1, recovered: 0, dead: 0 },
            particles: vec![
                FrameParticle { x: 0.0, y: 0.0, health: Health::Infected },
                FrameParticle { x: -480.0, y: 230.0, health: Health::Susceptible },
            ],
        }
    }

    #[test]
    fn rendered_frame_has_expected_dimensions() {
        let series = vec![ChartPoint { infected: 50.0, susceptible: 50.0 }];
        let image = draw_frame(&frame(), 0, &series, 500, [255, 255, 255, 255], None);
        assert_eq!(image.width(), 500);
        assert_eq!(image.height(), 250 + CHART_STRIP_PX);
    }

    #[test]
    fn infected_particle_is_painted_red() {
        let series = vec![ChartPoint { infected: 50.0, susceptible: 50.0 }];
        let image = draw_frame(&frame(), 0, &series, 1000, [255, 255, 255, 255], None);
        // The first particle sits at the arena center, (500, 250) in pixels.
        let px = image.get_pixel(500, 250);
        assert_eq!(px.0, [255, 0, 0, 255]);
    }

    #[test]
    fn unknown_color_falls_back_to_white() {
        assert_eq!(parse_color("chartreuse"), [255, 255, 255, 255]);
        assert_eq!(parse_color("BLACK"), [0, 0, 0, 255]);
    }
}
