use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sandtable::{
    init_logging, list_ports, Config, PlannerRequest, SvgImporter, Transport, Worker,
    WorkerConfig, BUILD_DATE, VERSION,
};
use std::path::PathBuf;
use std::time::Duration;

/// How often progress is logged while waiting for a drawing to finish
const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Sand table host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial port of the table's controller (overrides the config file)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports a controller may be attached to
    Ports,

    /// Draw the labelled path of an SVG file
    Draw {
        /// SVG file
        svg: PathBuf,

        /// Accuracy target in mm² (config default when omitted)
        #[arg(long)]
        accuracy: Option<f64>,

        /// Rotation between passes in degrees
        #[arg(long, default_value_t = 5.0)]
        rotate: f64,

        /// Number of passes
        #[arg(long, default_value_t = 1)]
        passes: u32,

        /// Motor speed in steps per second
        #[arg(long)]
        speed: Option<i64>,

        /// inkscape:label of the path to draw
        #[arg(long, default_value = "img_path")]
        label: String,
    },

    /// Draw a spiral about the center
    Spiral {
        /// Start radius in mm
        #[arg(long, default_value_t = 0.0)]
        r0: f64,

        /// End radius in mm
        #[arg(long, default_value_t = 200.0)]
        r1: f64,

        /// Number of revolutions
        #[arg(long, default_value_t = 20.0)]
        revolutions: f64,
    },

    /// Run the homing routine
    Home,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load_or_default()?,
    };
    Ok(config)
}

fn connect(cli: &Cli, config: &Config) -> anyhow::Result<Worker> {
    let params = config.serial_params(cli.port.as_deref());
    if params.port.is_empty() {
        bail!("no serial port given; pass --port or set connection.port in the config file");
    }

    let transport = Transport::open(&params, config.transport_config())?;
    let worker = Worker::new(transport, WorkerConfig::from(config));
    worker.start_worker()?;
    Ok(worker)
}

fn run_job(worker: &Worker, request: &PlannerRequest) -> anyhow::Result<()> {
    worker.start()?;
    worker.home()?;
    let id = worker.submit(request)?;
    tracing::info!("Submitted job {}", id);

    while !worker.wait_idle(PROGRESS_INTERVAL)? {
        tracing::info!(
            "Still drawing: {} positions in flight, {} jobs queued",
            worker.transport().motion_queue_len(),
            worker.pending_jobs()
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging()?;
    tracing::debug!("sandtable {} built {}", VERSION, BUILD_DATE);

    let config = load_config(cli.config.as_ref())?;

    match &cli.command {
        Command::Ports => {
            for port in list_ports()? {
                println!("{}\t{}", port.port_name, port.description);
            }
        }
        Command::Draw {
            svg,
            accuracy,
            rotate,
            passes,
            speed,
            label,
        } => {
            let waypoints = SvgImporter::new(label.as_str())
                .import_file(svg)
                .with_context(|| format!("importing {}", svg.display()))?;
            let request = PlannerRequest::General {
                waypoints: waypoints.iter().map(|p| [p.x, p.y]).collect(),
                accuracy: *accuracy,
                rotate_deg: *rotate,
                passes: *passes,
            };

            let worker = connect(&cli, &config)?;
            if let Some(speed) = speed {
                worker.speed(*speed)?;
            }
            run_job(&worker, &request)?;
            worker.end_workers()?;
        }
        Command::Spiral {
            r0,
            r1,
            revolutions,
        } => {
            let request = PlannerRequest::Spiral {
                r0: *r0,
                r1: *r1,
                revolutions: *revolutions,
            };
            let worker = connect(&cli, &config)?;
            run_job(&worker, &request)?;
            worker.end_workers()?;
        }
        Command::Home => {
            let worker = connect(&cli, &config)?;
            worker.home()?;
            worker.wait_idle(PROGRESS_INTERVAL)?;
            worker.end_workers()?;
        }
    }

    Ok(())
}
