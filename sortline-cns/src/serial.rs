//! Serial link to the actuator controller
//!
//! The link owns two independent halves of one connection. The write half
//! stays with the control loop; the read half moves into a background
//! thread that listens for the ready token and raises the shared
//! [`ReadinessFlag`]. The reader never writes.
//!
//! Shutdown is cooperative: reads are bounded by the port timeout and the
//! reader checks the shutdown token between reads, so [`SerialLink::close`]
//! joins the reader within one timeout.

use crate::config::ProtocolConfig;
#[cfg(feature = "serial-transport")]
use crate::config::LinkConfig;
use crate::error::CnsError;
use crate::protocol::{decode_line, is_ready_line};
use crate::readiness::ReadinessFlag;
use crate::transport::CommandSink;
use parking_lot::Mutex;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause after a read error that leaves the port open
const READ_ERROR_PAUSE: Duration = Duration::from_millis(50);

pub struct SerialLink {
    port_name: String,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl SerialLink {
    /// Open the configured port, wait for the controller to boot and start
    /// the reader thread.
    #[cfg(feature = "serial-transport")]
    pub fn open(
        config: &LinkConfig,
        protocol: &ProtocolConfig,
        flag: ReadinessFlag,
    ) -> Result<Self, CnsError> {
        config.validate().map_err(CnsError::Config)?;
        protocol.validate().map_err(CnsError::Config)?;

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| {
                CnsError::Transport(format!("Failed to open {}: {}", config.port, e))
            })?;

        info!(
            "Serial port {} opened at {} baud, settling for {:?}",
            config.port,
            config.baud_rate,
            config.settle_delay()
        );
        thread::sleep(config.settle_delay());

        let read_half = port.try_clone().map_err(|e| {
            CnsError::Transport(format!("Failed to clone {} for reading: {}", config.port, e))
        })?;

        Self::from_parts(config.port.clone(), read_half, port, protocol, flag)
    }

    /// Build a link from an already open read half and write half.
    ///
    /// The read half should time out periodically (`TimedOut` or
    /// `WouldBlock`) so the reader can notice shutdown; end of stream also
    /// ends the reader.
    pub fn from_parts<R, W>(
        port_name: impl Into<String>,
        read_half: R,
        write_half: W,
        protocol: &ProtocolConfig,
        flag: ReadinessFlag,
    ) -> Result<Self, CnsError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let port_name = port_name.into();
        let shutdown = Arc::new(AtomicBool::new(false));

        let reader = {
            let port_name = port_name.clone();
            let protocol = protocol.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("sortline-serial-reader".to_string())
                .spawn(move || read_loop(read_half, &port_name, &protocol, &flag, &shutdown))?
        };

        Ok(Self {
            port_name,
            writer: Mutex::new(Some(Box::new(write_half))),
            reader: Mutex::new(Some(reader)),
            shutdown,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Whether the background reader is still running
    pub fn is_listening(&self) -> bool {
        self.reader
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl CommandSink for SerialLink {
    fn write_command(&self, payload: &[u8]) -> Result<(), CnsError> {
        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| CnsError::SerialWrite(format!("{} is closed", self.port_name)))?;

        writer
            .write_all(payload)
            .and_then(|_| writer.flush())
            .map_err(|e| CnsError::SerialWrite(format!("{}: {}", self.port_name, e)))
    }

    fn close(&self) -> bool {
        let writer = self.writer.lock().take();
        let Some(mut writer) = writer else {
            return false;
        };

        self.shutdown.store(true, Ordering::Release);
        if let Err(e) = writer.flush() {
            debug!("Flush on close of {} failed: {}", self.port_name, e);
        }
        drop(writer);

        if let Some(handle) = self.reader.lock().take() {
            if handle.join().is_err() {
                error!("Serial reader for {} panicked", self.port_name);
            }
        }

        info!("Serial link {} closed", self.port_name);
        true
    }

    fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Body of the reader thread
fn read_loop<R: Read>(
    read_half: R,
    port_name: &str,
    protocol: &ProtocolConfig,
    flag: &ReadinessFlag,
    shutdown: &AtomicBool,
) {
    let mut reader = BufReader::new(read_half);
    // Bytes of a partially received line survive read timeouts.
    let mut line = Vec::new();

    debug!("Serial reader for {} started", port_name);
    loop {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                debug!("Serial link {} reached end of stream", port_name);
                break;
            }
            Ok(_) => {
                handle_line(&line, port_name, protocol, flag);
                line.clear();
            }
            Err(e) if is_transient(&e) => continue,
            Err(e) if shutdown.load(Ordering::Acquire) => {
                debug!("Serial reader for {} stopping after {}", port_name, e);
                break;
            }
            Err(e) if is_disconnect(&e) => {
                warn!("Serial link {} disconnected: {}", port_name, e);
                break;
            }
            Err(e) => {
                let err = CnsError::SerialRead(format!("{}: {}", port_name, e));
                warn!("{}; still listening", err);
                thread::sleep(READ_ERROR_PAUSE);
            }
        }
    }
    debug!("Serial reader for {} stopped", port_name);
}

fn handle_line(raw: &[u8], port_name: &str, protocol: &ProtocolConfig, flag: &ReadinessFlag) {
    let line = decode_line(raw);
    if line.is_empty() {
        return;
    }

    info!("Controller on {}: {}", port_name, line);
    if is_ready_line(&line, protocol) {
        let already = flag.signal();
        debug!("Controller ready (flag was {})", if already { "set" } else { "clear" });
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::UnexpectedEof
    )
}

/// Names of the serial ports present on this machine
#[cfg(feature = "serial-transport")]
pub fn available_ports() -> Result<Vec<String>, CnsError> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
