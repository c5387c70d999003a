use crate::logging::{self, LogTarget};
use crate::map::geometry::LatLon;
use crate::map::surface::TileLayer;
use crate::map::MapConfig;
use crate::model::{Action, Algorithm, GeneticParams, ResponseSchema, Stage, StatusKind};
use crate::orchestrator::{UiCommand, Workflow};
use crate::service::{HttpRouteService, RouteService};
use crate::status::{StatusMessage, StatusNotifier};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "route-planner",
    version,
    about = "Upload a road network and points of interest, then solve a route against a route-optimization service"
)]
pub struct Cli {
    /// Base URL of the route-optimization service
    #[arg(long, default_value = "http://localhost:5001")]
    pub base_url: String,

    /// Road network file to pre-select (OSM XML)
    #[arg(long)]
    pub network: Option<PathBuf>,

    /// Points file to pre-select (tab-separated X, Y, id)
    #[arg(long)]
    pub points: Option<PathBuf>,

    /// Algorithm to pre-select
    #[arg(long, value_enum)]
    pub algorithm: Option<Algorithm>,

    /// Genetic algorithm: population size
    #[arg(long, default_value_t = 50)]
    pub population_size: u32,

    /// Genetic algorithm: number of generations
    #[arg(long, default_value_t = 100)]
    pub generations: u32,

    /// Genetic algorithm: mutation rate in percent (0-100)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub mutation_rate: u8,

    /// Field names the service uses for upload counts
    #[arg(long, value_enum, default_value_t = ResponseSchema::Stats)]
    pub upload_schema: ResponseSchema,

    /// Initial map center as LAT,LON
    #[arg(long, default_value = "0,0", value_parser = parse_lat_lon, allow_hyphen_values = true)]
    pub map_center: LatLon,

    /// Initial map zoom level
    #[arg(long, default_value_t = 2)]
    pub map_zoom: u8,

    /// Run all three stages, print the result as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Run all three stages, print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Log file used while the TUI is running
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Tracing filter directive (defaults to `info` for the TUI, `warn` headless)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text
    }

    pub fn map_config(&self) -> MapConfig {
        MapConfig {
            center: self.map_center,
            zoom: self.map_zoom,
            tiles: TileLayer::default(),
        }
    }

    pub fn genetic_params(&self) -> GeneticParams {
        GeneticParams {
            population_size: self.population_size,
            generations: self.generations,
            mutation_rate_percent: self.mutation_rate,
        }
    }

    /// Commands that apply the pre-selections given on the command line.
    pub fn preselection(&self) -> Vec<UiCommand> {
        let mut cmds = vec![UiCommand::SetParams(self.genetic_params())];
        if let Some(p) = &self.network {
            cmds.push(UiCommand::SelectNetworkFile(Some(p.clone())));
        }
        if let Some(p) = &self.points {
            cmds.push(UiCommand::SelectPointsFile(Some(p.clone())));
        }
        if let Some(a) = self.algorithm {
            cmds.push(UiCommand::SelectAlgorithm(Some(a)));
        }
        cmds
    }
}

fn parse_lat_lon(s: &str) -> std::result::Result<LatLon, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {s:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("{lat},{lon} is outside the valid range"));
    }
    Ok(LatLon::new(lat, lon))
}

pub async fn run(args: Cli) -> Result<()> {
    let headless = args.is_headless();
    let (directive, target) = if headless {
        (args.log_level.as_deref().unwrap_or("warn"), LogTarget::Stderr)
    } else {
        let path = args.log_file.clone().unwrap_or_else(logging::default_log_file);
        (args.log_level.as_deref().unwrap_or("info"), LogTarget::File(path))
    };
    logging::init(directive, &target)?;

    let service = Arc::new(
        HttpRouteService::new(&args.base_url)
            .with_context(|| format!("invalid --base-url {}", args.base_url))?,
    );
    tracing::info!(base_url = %args.base_url, headless, "starting");

    if !headless {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, service).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, service).await;
        }
    }

    run_headless(args, service).await
}

fn format_status(msg: &StatusMessage) -> String {
    let tag = match msg.kind {
        StatusKind::Progress => "started",
        StatusKind::Success => "ok",
        StatusKind::Error => "error",
    };
    format!("[{}] {tag}: {}", msg.posted_at, msg.text)
}

/// Run upload network, upload points and solve in order, stopping at the
/// first failure.
async fn run_headless<S: RouteService>(args: Cli, service: Arc<S>) -> Result<()> {
    if args.network.is_none() || args.points.is_none() || args.algorithm.is_none() {
        anyhow::bail!("--text and --json require --network, --points and --algorithm");
    }

    let (out_tx, out_handle) = spawn_output_writer();
    let (echo_tx, mut echo_rx) = mpsc::unbounded_channel::<StatusMessage>();
    let mut workflow = Workflow::new(
        service,
        args.upload_schema,
        args.map_config(),
        StatusNotifier::with_echo(echo_tx),
    );
    for cmd in args.preselection() {
        workflow.handle(cmd);
    }

    let mut failure = None;
    for action in [Action::LoadNetwork, Action::LoadPoints, Action::Solve] {
        let res = workflow.perform(action).await;
        while let Ok(msg) = echo_rx.try_recv() {
            let _ = out_tx.send(OutputLine::Stderr(format_status(&msg)));
        }
        if let Err(e) = res {
            failure = Some(anyhow::Error::new(e).context(format!("{action} failed")));
            break;
        }
    }

    if failure.is_none() {
        if args.json {
            let out = serde_json::to_string_pretty(&workflow.last_result())?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        } else if let Some(card) = workflow.results().card() {
            let uploads: Vec<_> = [Stage::Network, Stage::Points]
                .into_iter()
                .filter_map(|s| workflow.summary(s))
                .collect();
            let summary =
                crate::text_summary::build_text_summary(&uploads, card, workflow.map().map());
            for line in summary.lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    failure.map_or(Ok(()), Err)
}
