use std::sync::mpsc::{Receiver, SyncSender, TrySendError};

use log::debug;

use epidemic_common::{Arena, Frame, History, SimError};

/// Abstract 2D drawing surface handed to draw procedures.
///
/// The renderer guarantees the coordinate system is translated so (0, 0) is
/// the arena center and scaled by its own display factor before a procedure
/// runs.
pub trait GraphicsContext {
    fn set_color(&mut self, rgba: [u8; 4]);
    fn set_font(&mut self, size: f32);
    fn set_stroke(&mut self, width: f32);
    fn draw_string(&mut self, text: &str, x: f64, y: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn draw_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn translate(&mut self, dx: f64, dy: f64);
    fn scale(&mut self, sx: f64, sy: f64);
}

/// A deferred painting routine. It closes over a [`Frame`] snapshot, never
/// over live simulation state, so a renderer is free to run it on its own
/// thread at its own pace.
pub type DrawProcedure = Box<dyn Fn(&mut dyn GraphicsContext) + Send>;

/// Boundary between the simulation and a front-end.
pub trait Renderer {
    /// Registers the current draw procedure and triggers a repaint.
    fn draw_with(&mut self, procedure: DrawProcedure) -> Result<(), SimError>;
}

/// Renderer for headless runs: accepts and discards every procedure.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw_with(&mut self, _procedure: DrawProcedure) -> Result<(), SimError> {
        Ok(())
    }
}

/// Renderer that hands draw procedures to a consumer thread over a bounded
/// channel. When the consumer lags, frames are dropped rather than blocking
/// the simulation; a vanished consumer is reported as a render error.
pub struct ChannelRenderer {
    tx: SyncSender<DrawProcedure>,
}

impl ChannelRenderer {
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<DrawProcedure>) {
        let (tx, rx) = std::sync::mpsc::sync_channel(capacity);
        (ChannelRenderer { tx }, rx)
    }
}

impl Renderer for ChannelRenderer {
    fn draw_with(&mut self, procedure: DrawProcedure) -> Result<(), SimError> {
        match self.tx.try_send(procedure) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                debug!("Renderer busy, dropping frame");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(SimError::Render("renderer thread disconnected".to_string()))
            }
        }
    }
}

const CHART_HEIGHT: f64 = 80.0;
const TEXT_MARGIN: f64 = 12.0;

/// Paints one frame: the history chart, every individual colored by health,
/// the arena border, and the statistics line.
pub fn paint_frame(
    ctx: &mut dyn GraphicsContext,
    frame: &Frame,
    chart: &History,
    arena: &Arena,
    radius: f64,
) {
    paint_chart(ctx, chart, arena);

    for particle in &frame.particles {
        let [r, g, b] = particle.health.color();
        ctx.set_color([r, g, b, 255]);
        ctx.fill_rect(
            f64::from(particle.x) - radius,
            f64::from(particle.y) - radius,
            2.0 * radius,
            2.0 * radius,
        );
    }

    ctx.set_color([0, 0, 0, 255]);
    ctx.set_stroke(2.0);
    ctx.draw_rect(
        arena.left(),
        arena.bottom(),
        2.0 * arena.half_width,
        2.0 * arena.half_height,
    );

    let stats = &frame.stats;
    ctx.set_font(14.0);
    ctx.draw_string(
        &format!(
            "t = {:.1}   infected: {}   non-infected: {}   recovered: {}   dead: {}",
            frame.time, stats.infected, stats.susceptible, stats.recovered, stats.dead
        ),
        arena.left() + TEXT_MARGIN,
        arena.top() - TEXT_MARGIN,
    );
}

/// Stacked composition chart along the bottom of the arena: infected (red)
/// at the base, non-infected (blue) above it, the derived recovered share
/// (green) on top. Columns advance left to right over the run.
fn paint_chart(ctx: &mut dyn GraphicsContext, chart: &History, arena: &Arena) {
    if chart.is_empty() {
        return;
    }
    let column_width = 2.0 * arena.half_width / chart.capacity() as f64;
    let base = arena.bottom();
    for (idx, &infected) in chart.percent_infected().iter().enumerate() {
        let x = arena.left() + idx as f64 * column_width;
        let susceptible = chart.percent_susceptible()[idx];
        let recovered = chart.percent_recovered_at(idx);

        let infected_h = CHART_HEIGHT * f64::from(infected) / 100.0;
        let susceptible_h = CHART_HEIGHT * f64::from(susceptible) / 100.0;
        let recovered_h = CHART_HEIGHT * f64::from(recovered) / 100.0;

        ctx.set_color([255, 0, 0, 255]);
        ctx.fill_rect(x, base, column_width, infected_h);
        ctx.set_color([0, 0, 220, 255]);
        ctx.fill_rect(x, base + infected_h, column_width, susceptible_h);
        ctx.set_color([0, 200, 0, 255]);
        ctx.fill_rect(x, base + infected_h + susceptible_h, column_width, recovered_h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epidemic_common::{FrameParticle, Health, Statistics};

    /// Records the draw calls a procedure makes.
    #[derive(Default)]
    struct RecordingContext {
        fill_rects: usize,
        draw_rects: usize,
        strings: Vec<String>,
    }

    impl GraphicsContext for RecordingContext {
        fn set_color(&mut self, _rgba: [u8; 4]) {}
        fn set_font(&mut self, _size: f32) {}
        fn set_stroke(&mut self, _width: f32) {}
        fn draw_string(&mut self, text: &str, _x: f64, _y: f64) {
            self.strings.push(text.to_string());
        }
        fn fill_rect(&mut self, _x: f64, _y: f64, _w: f64, _h: f64) {
            self.fill_rects += 1;
        }
        fn draw_rect(&mut self, _x: f64, _y: f64, _w: f64, _h: f64) {
            self.draw_rects += 1;
        }
        fn translate(&mut self, _dx: f64, _dy: f64) {}
        fn scale(&mut self, _sx: f64, _sy: f64) {}
    }

    fn sample_frame() -> Frame {
        Frame {
            time: 1.5,
            stats: Statistics { infected: 1, susceptible: 1, recovered: 0, dead: 0 },
            particles: vec![
                FrameParticle { x: 0.0, y: 0.0, health: Health::Infected },
                FrameParticle { x: 50.0, y: -20.0, health: Health::Susceptible },
            ],
        }
    }

    #[test]
    fn paints_border_particles_and_stats() {
        let frame = sample_frame();
        let chart = History::new(10.0);
        let mut ctx = RecordingContext::default();
        paint_frame(&mut ctx, &frame, &chart, &Arena::default(), 8.0);

        assert_eq!(ctx.draw_rects, 1, "one arena border");
        assert_eq!(ctx.fill_rects, 2, "one rect per particle, empty chart");
        assert_eq!(ctx.strings.len(), 1);
        assert!(ctx.strings[0].contains("non-infected: 1"));
    }

    #[test]
    fn chart_adds_three_columns_per_sample() {
        let frame = sample_frame();
        let mut chart = History::new(10.0);
        chart.record(0.0, &frame.stats);
        let mut ctx = RecordingContext::default();
        paint_frame(&mut ctx, &frame, &chart, &Arena::default(), 8.0);
        assert_eq!(ctx.fill_rects, 2 + 3);
    }

    #[test]
    fn channel_renderer_drops_frames_when_full() {
        let (mut renderer, rx) = ChannelRenderer::with_capacity(1);
        assert!(renderer.draw_with(Box::new(|_| {})).is_ok());
        // Channel full: the frame is dropped, not an error.
        assert!(renderer.draw_with(Box::new(|_| {})).is_ok());
        drop(rx);
        // Consumer gone: reported as a render error.
        assert!(renderer.draw_with(Box::new(|_| {})).is_err());
    }

    #[test]
    fn channel_renderer_delivers_procedures() {
        let (mut renderer, rx) = ChannelRenderer::with_capacity(4);
        let frame = sample_frame();
        let chart = History::new(10.0);
        renderer
            .draw_with(Box::new(move |ctx| {
                paint_frame(ctx, &frame, &chart, &Arena::default(), 8.0)
            }))
            .unwrap();

        let procedure = rx.recv().unwrap();
        let mut ctx = RecordingContext::default();
        procedure(&mut ctx);
        assert_eq!(ctx.draw_rects, 1);
    }
}
