//! Subcommand implementations

use crate::config::SorterConfig;
use anyhow::{bail, Context, Result};
use sortline_cns::{
    Command, CommandSink, DryRunSink, HandshakeCoordinator, ReadinessFlag, SendOutcome, SerialLink,
    StopSignal,
};
use sortline_core::ClassId;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Options of the `run` subcommand beyond the config file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub replay: Option<PathBuf>,
    pub dry_run: bool,
    pub auto_ready: bool,
    pub headless: bool,
}

/// Serial link, or a logging sink for dry runs
pub fn open_sink(
    config: &SorterConfig,
    dry_run: bool,
    auto_ready: bool,
    flag: &ReadinessFlag,
) -> Result<Box<dyn CommandSink>> {
    if dry_run {
        info!("Dry run: commands are logged, not sent");
        let sink = if auto_ready {
            DryRunSink::with_auto_ready(flag.clone())
        } else {
            DryRunSink::new()
        };
        return Ok(Box::new(sink));
    }

    let link = SerialLink::open(&config.link, &config.protocol, flag.clone())
        .with_context(|| format!("opening actuator link on {}", config.link.port))?;
    Ok(Box::new(link))
}

#[cfg(feature = "onnx")]
pub fn run(config: &SorterConfig, opts: &RunOptions, stop: StopSignal) -> Result<sortline_cns::LoopReport> {
    use sortline_core::ConfirmationWindow;
    use sortline_eye::{ImageSequenceSource, LogOverlay, OnnxClassifier};

    let model = OnnxClassifier::load(&config.vision)
        .with_context(|| format!("loading classifier {}", config.vision.model_path.display()))?;
    let window = ConfirmationWindow::new(&config.window)?;

    let flag = ReadinessFlag::new();
    let sink = open_sink(config, opts.dry_run, opts.auto_ready, &flag)?;
    let coordinator = HandshakeCoordinator::new(flag, sink, config.protocol.clone());
    let num_classes = config.window.num_classes;

    if let Some(dir) = &opts.replay {
        let source = ImageSequenceSource::open(dir)
            .with_context(|| format!("opening replay directory {}", dir.display()))?;
        return Ok(drive::drive(source, model, LogOverlay::new(), window, coordinator, num_classes, stop));
    }

    drive::camera(config, opts, model, window, coordinator, stop)
}

#[cfg(not(feature = "onnx"))]
pub fn run(_config: &SorterConfig, _opts: &RunOptions, _stop: StopSignal) -> Result<sortline_cns::LoopReport> {
    bail!("sortline was built without the `onnx` feature; rebuild with `--features onnx` to run the classifier")
}

#[cfg(feature = "onnx")]
mod drive {
    use super::*;
    use sortline_cns::{ControlLoop, LoopReport};
    use sortline_core::{ConfirmationWindow, FrameSource, Overlay};
    use sortline_eye::{OnnxClassifier, TensorInput};

    type Coordinator = HandshakeCoordinator<Box<dyn CommandSink>>;

    pub fn drive<Src, Ov>(
        source: Src,
        model: OnnxClassifier,
        overlay: Ov,
        window: ConfirmationWindow,
        coordinator: Coordinator,
        num_classes: u8,
        stop: StopSignal,
    ) -> LoopReport
    where
        Src: FrameSource,
        Src::Frame: TensorInput,
        Ov: Overlay<Src::Frame>,
    {
        ControlLoop::new(source, model, overlay, window, coordinator, stop)
            .with_num_classes(num_classes)
            .run()
    }

    #[cfg(feature = "camera")]
    pub fn camera(
        config: &SorterConfig,
        opts: &RunOptions,
        model: OnnxClassifier,
        window: ConfirmationWindow,
        coordinator: Coordinator,
        stop: StopSignal,
    ) -> Result<LoopReport> {
        use sortline_eye::{CameraManager, LogOverlay, WindowOverlay};

        let source = CameraManager::open(&config.vision).context("opening camera")?;
        let num_classes = config.window.num_classes;
        let report = if opts.headless {
            drive(source, model, LogOverlay::new(), window, coordinator, num_classes, stop)
        } else {
            let overlay = WindowOverlay::new(&config.vision);
            drive(source, model, overlay, window, coordinator, num_classes, stop)
        };
        Ok(report)
    }

    #[cfg(not(feature = "camera"))]
    pub fn camera(
        _config: &SorterConfig,
        _opts: &RunOptions,
        _model: OnnxClassifier,
        _window: ConfirmationWindow,
        _coordinator: Coordinator,
        _stop: StopSignal,
    ) -> Result<LoopReport> {
        bail!("sortline was built without the `camera` feature; pass `--replay <dir>` or rebuild with `--features camera`")
    }
}

/// Log every line from the controller until stopped or `duration` elapses
pub fn listen(config: &SorterConfig, duration: Option<Duration>, stop: &StopSignal) -> Result<u64> {
    let flag = ReadinessFlag::new();
    let link = SerialLink::open(&config.link, &config.protocol, flag.clone())
        .with_context(|| format!("opening actuator link on {}", config.link.port))?;
    info!("Listening on {} (Ctrl+C to stop)", link.port_name());

    let started = Instant::now();
    let mut ready_signals = 0u64;
    while !stop.is_requested() && duration.map_or(true, |d| started.elapsed() < d) {
        if flag.take() {
            ready_signals += 1;
            info!("Controller ready ({} so far)", ready_signals);
        }
        if !link.is_listening() {
            warn!("Reader stopped; the port was disconnected");
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    link.close();
    Ok(ready_signals)
}

/// What `send` should put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    Class(u8),
    NoMatch,
}

/// Wait for one ready signal, then send a single command
pub fn send(
    config: &SorterConfig,
    target: SendTarget,
    dry_run: bool,
    timeout: Duration,
    stop: &StopSignal,
) -> Result<SendOutcome> {
    let command = match target {
        SendTarget::Class(id) => {
            if id >= config.window.num_classes {
                warn!("Class {} is outside the configured {} classes", id, config.window.num_classes);
            }
            Command::for_class(ClassId(id), &config.protocol)?
        }
        SendTarget::NoMatch => Command::NoIdentification,
    };

    let flag = ReadinessFlag::new();
    let sink = open_sink(config, dry_run, dry_run, &flag)?;
    let mut coordinator = HandshakeCoordinator::new(flag.clone(), sink, config.protocol.clone());

    info!("Waiting up to {:?} for the controller to report ready", timeout);
    let started = Instant::now();
    while !flag.is_ready() {
        if stop.is_requested() {
            coordinator.close();
            bail!("interrupted while waiting for the controller");
        }
        if started.elapsed() >= timeout {
            coordinator.close();
            bail!("controller did not report ready within {:?}", timeout);
        }
        thread::sleep(POLL_INTERVAL);
    }

    let outcome = coordinator.send_command(command);
    coordinator.close();
    Ok(outcome)
}

/// Names of the serial ports on this machine
pub fn ports() -> Result<Vec<String>> {
    sortline_cns::serial::available_ports().context("enumerating serial ports")
}
