//! Headless runner: steps a landscape from the terminal and sketches the
//! final occupancy as ASCII.

use anyhow::{Context, Result};
use clap::Parser;
use mingle_core::agent::{Agent, Temperament};
use mingle_core::config::SimConfig;
use mingle_core::landscape::Landscape;
use mingle_core::render::Surface;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mingle", about = "Crowding-driven agent simulation, headless")]
struct Args {
    /// JSON configuration file; defaults apply for missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of steps to run.
    #[arg(long, default_value_t = 1000)]
    steps: usize,

    /// Override the configured seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Print a progress line every N steps.
    #[arg(long, default_value_t = 50)]
    report_every: usize,

    /// Suppress progress output.
    #[arg(long)]
    quiet: bool,
}

/// Character raster implementing the core's rendering boundary: one glyph
/// per agent, uppercase while the agent moved last step.
struct TextSurface {
    cols: usize,
    rows: usize,
    glyphs: Vec<char>,
}

impl TextSurface {
    fn new(width: f64, height: f64, scale: f64) -> Self {
        let cols = (width * scale).ceil() as usize;
        let rows = (height * scale).ceil() as usize;
        Self {
            cols,
            rows,
            glyphs: vec!['.'; cols * rows],
        }
    }
}

impl Surface for TextSurface {
    fn draw_agent(&mut self, agent: &Agent, scale: f64) {
        let [x, y] = agent.position();
        let col = ((x * scale) as usize).min(self.cols - 1);
        let row = ((y * scale) as usize).min(self.rows - 1);
        let glyph = match (agent.temperament(), agent.moved()) {
            (Temperament::Social, true) => 'O',
            (Temperament::Social, false) => 'o',
            (Temperament::AntiSocial, true) => 'X',
            (Temperament::AntiSocial, false) => 'x',
        };
        self.glyphs[row * self.cols + col] = glyph;
    }

    fn repaint(&mut self) {
        for row in self.glyphs.chunks(self.cols) {
            println!("{}", row.iter().collect::<String>());
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SimConfig::from_json_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut landscape = Landscape::try_new(config)?;
    if !args.quiet {
        println!(
            "{} agents on a {}x{} plane, seed {}",
            landscape.agent_count(),
            landscape.width(),
            landscape.height(),
            landscape.config().seed
        );
    }

    let mut last = None;
    for _ in 0..args.steps {
        let report = landscape.advance();
        if !args.quiet && report.step % args.report_every.max(1) == 0 {
            println!("step {:>6}  moved {:>5}", report.step, report.moved);
        }
        last = Some(report);
        if report.paused {
            println!("settled: nobody moved on step {}", report.step);
            break;
        }
    }
    if let Some(report) = last {
        println!(
            "finished at step {} ({} agents moved on the last step)",
            report.step, report.moved
        );
    }

    // one character per sector cell
    let scale = 1.0 / landscape.config().cell_size;
    let mut surface = TextSurface::new(landscape.width(), landscape.height(), scale);
    landscape.draw(&mut surface, scale);
    surface.repaint();
    Ok(())
}
