// SortLine command line interface
// Runs the sorter and offers bench tools for the actuator link

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{RunOptions, SendTarget};
use config::SorterConfig;
use sortline_cns::{SendOutcome, StopSignal};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sortline")]
#[command(about = "Camera-driven sorter: confirm a class, then tell the actuator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs and reports as JSON
    #[arg(long, global = true)]
    json: bool,
}

/// Overrides for the actuator link
#[derive(Args, Debug, Default)]
struct LinkArgs {
    /// Serial port of the actuator controller
    #[arg(long, short)]
    port: Option<String>,

    /// Baud rate
    #[arg(long, short)]
    baud: Option<u32>,
}

impl LinkArgs {
    fn apply(&self, config: &mut SorterConfig) {
        if let Some(port) = &self.port {
            config.link.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.link.baud_rate = baud;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sorter
    Run {
        #[command(flatten)]
        link: LinkArgs,

        /// Camera index
        #[arg(long)]
        camera: Option<u32>,

        /// Classifier model (ONNX)
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Replay the images in this directory instead of using the camera
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Log commands instead of writing them to the serial port
        #[arg(long)]
        dry_run: bool,

        /// With --dry-run, act as a controller that is always ready
        #[arg(long, requires = "dry_run")]
        auto_ready: bool,

        /// Do not open a preview window
        #[arg(long)]
        headless: bool,
    },

    /// Log every line the controller sends
    Listen {
        #[command(flatten)]
        link: LinkArgs,

        /// Stop after this many seconds
        #[arg(long, short)]
        duration: Option<u64>,
    },

    /// Wait for the controller to be ready and send one command
    Send {
        /// Class id to send
        #[arg(required_unless_present = "no_match", conflicts_with = "no_match")]
        class: Option<u8>,

        /// Send the no-match code instead of a class
        #[arg(long)]
        no_match: bool,

        #[command(flatten)]
        link: LinkArgs,

        /// Seconds to wait for the ready signal
        #[arg(long, short, default_value = "10")]
        timeout: u64,

        /// Log the command instead of writing it to the serial port
        #[arg(long)]
        dry_run: bool,
    },

    /// List serial ports
    Ports,

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {:?}", level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Exit status when a second signal arrives before the loop has stopped
const FORCED_EXIT_STATUS: i32 = 130;

/// Raise `stop` on SIGINT / SIGTERM. A second signal terminates the process.
fn install_stop_handler(stop: &StopSignal) -> Result<()> {
    for &signal in signal_hook::consts::TERM_SIGNALS {
        // Registered first, so it only sees a flag raised by an earlier signal.
        signal_hook::flag::register_conditional_shutdown(signal, FORCED_EXIT_STATUS, stop.handle())
            .with_context(|| format!("installing shutdown handler for signal {}", signal))?;
        signal_hook::flag::register(signal, stop.handle())
            .with_context(|| format!("installing handler for signal {}", signal))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json)?;

    let mut config = SorterConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let stop = StopSignal::new();

    match cli.command {
        Commands::Run {
            link,
            camera,
            model,
            replay,
            dry_run,
            auto_ready,
            headless,
        } => {
            link.apply(&mut config);
            if let Some(camera) = camera {
                config.vision.camera_id = camera;
            }
            if let Some(model) = model {
                config.vision.model_path = model;
            }
            config.validate()?;
            install_stop_handler(&stop)?;

            let opts = RunOptions {
                replay,
                dry_run,
                auto_ready,
                headless,
            };
            let report = commands::run(&config, &opts, stop)?;

            if cli.json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("Stopped: {:?}", report.reason);
                println!(
                    "Frames: {}  inference failures: {}  confirmations: {}  no match: {}",
                    report.stats.frames,
                    report.stats.inference_failures,
                    report.stats.confirmations,
                    report.stats.no_match
                );
                println!(
                    "Commands sent: {}  dropped: {}  write failures: {}",
                    report.stats.sent, report.stats.dropped, report.stats.write_failures
                );
            }
        }

        Commands::Listen { link, duration } => {
            link.apply(&mut config);
            config.validate()?;
            install_stop_handler(&stop)?;

            let ready = commands::listen(&config, duration.map(Duration::from_secs), &stop)?;
            info!("Controller reported ready {} times", ready);
        }

        Commands::Send {
            class,
            no_match,
            link,
            timeout,
            dry_run,
        } => {
            link.apply(&mut config);
            config.validate()?;
            install_stop_handler(&stop)?;

            let target = match class {
                Some(id) if !no_match => SendTarget::Class(id),
                _ => SendTarget::NoMatch,
            };
            let outcome =
                commands::send(&config, target, dry_run, Duration::from_secs(timeout), &stop)?;
            match outcome {
                SendOutcome::Sent => println!("Sent"),
                other => anyhow::bail!("command not sent ({:?})", other),
            }
        }

        Commands::Ports => {
            let ports = commands::ports()?;
            if ports.is_empty() {
                println!("No serial ports found");
            }
            for port in ports {
                println!("{}", port);
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
