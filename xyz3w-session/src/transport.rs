//! Session transport (spec component H): owns one serial port connection,
//! serializes all traffic to it behind a mutex, and runs a background
//! status poller thread. No async runtime — the poller is a `std::thread`
//! and commands block up to their timeout, per spec §5/§9.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};

use crate::error::SessionError;
use crate::status::{parse_status, PrinterStatus};

const BAUD_RATE: u32 = 115_200;
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE_TIME: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Outcome of `Session::connect`: either a live session plus identity
/// fields read off the first status query, or a reason it failed.
pub struct ConnectResult {
    pub session: Session,
    pub model: String,
    pub model_number: String,
    pub firmware: String,
}

/// A live connection owning exclusive access to one serial port. Dropping
/// it (or calling `disconnect`) stops the poller and closes the handle.
/// This is an explicitly owned value, not a process-wide singleton — the
/// caller decides how many (zero or one, in practice) exist at a time.
pub struct Session {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    status: Arc<Mutex<PrinterStatus>>,
    upload_in_progress: Arc<AtomicBool>,
    poller_running: Arc<AtomicBool>,
    poller_handle: Option<JoinHandle<()>>,
    device: String,
    command_timeout: Duration,
}

impl Session {
    /// Open `device` with the default command timeout and poll interval.
    pub fn connect(device: &str) -> Result<ConnectResult, SessionError> {
        Self::connect_with_timeouts(device, COMMAND_TIMEOUT, POLL_INTERVAL)
    }

    /// Open `device`, drain its buffers, let it settle, then spawn the
    /// background status poller. `command_timeout` and `poll_interval` let
    /// an operator override the wire-level defaults (e.g. for a slow USB-
    /// serial bridge) without touching the protocol's framing.
    pub fn connect_with_timeouts(device: &str, command_timeout: Duration, poll_interval: Duration) -> Result<ConnectResult, SessionError> {
        let mut opened = serialport::new(device, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(command_timeout)
            .open()
            .map_err(|source| SessionError::PortOpenFailed { port: device.to_string(), source })?;

        opened.clear(ClearBuffer::All).ok();
        thread::sleep(SETTLE_TIME);

        let port = Arc::new(Mutex::new(opened));
        let status = Arc::new(Mutex::new(PrinterStatus::default()));
        let upload_in_progress = Arc::new(AtomicBool::new(false));
        let poller_running = Arc::new(AtomicBool::new(true));

        tracing::info!(device, "connected to printer");

        let initial_reply = {
            let mut guard = port.lock().unwrap();
            send_command_locked(guard.as_mut(), "XYZv3/query=a", command_timeout)
        };
        let initial_status = match initial_reply {
            Ok(reply) => parse_status(&reply, PrinterStatus::default(), Utc::now()),
            Err(e) => {
                tracing::warn!(error = %e, "initial status query failed");
                PrinterStatus::default()
            }
        };
        *status.lock().unwrap() = initial_status.clone();

        let poller_handle =
            spawn_poller(port.clone(), status.clone(), upload_in_progress.clone(), poller_running.clone(), command_timeout, poll_interval);

        let session = Session {
            port,
            status,
            upload_in_progress,
            poller_running,
            poller_handle: Some(poller_handle),
            device: device.to_string(),
            command_timeout,
        };

        Ok(ConnectResult {
            model: initial_status.display_name,
            model_number: initial_status.model_number,
            firmware: initial_status.firmware_version,
            session,
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// The most recent status snapshot, updated by the background poller.
    pub fn status(&self) -> PrinterStatus {
        self.status.lock().unwrap().clone()
    }

    /// Send a command and wait for the `$`-terminated response. Serializes
    /// with the poller and any in-progress upload via the shared port mutex.
    pub fn send_command(&self, text: &str) -> Result<String, SessionError> {
        let mut guard = self.port.lock().unwrap();
        send_command_locked(guard.as_mut(), text, self.command_timeout)
    }

    /// Hand the caller exclusive access to the raw port and a marker that
    /// tells the poller to skip its tick — used by the upload engine, which
    /// needs to frame raw binary blocks rather than `$`-terminated text.
    pub(crate) fn lock_for_upload(&self) -> (std::sync::MutexGuard<'_, Box<dyn SerialPort>>, UploadGuard<'_>) {
        self.upload_in_progress.store(true, Ordering::SeqCst);
        (self.port.lock().unwrap(), UploadGuard { flag: &self.upload_in_progress })
    }

    /// Stop the poller and close the serial handle. The handle is
    /// guaranteed closed before this returns.
    pub fn disconnect(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.poller_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.poller_handle.take() {
            let _ = handle.join();
        }
        tracing::info!(device = %self.device, "disconnected");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// RAII marker that clears the upload-in-progress flag when the upload
/// engine is done with the port, letting the poller resume its ticks.
pub(crate) struct UploadGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn spawn_poller(
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    status: Arc<Mutex<PrinterStatus>>,
    upload_in_progress: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    command_timeout: Duration,
    poll_interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            thread::sleep(poll_interval);
            if !running.load(Ordering::SeqCst) {
                break;
            }
            if upload_in_progress.load(Ordering::SeqCst) {
                continue;
            }

            let reply = {
                let mut guard = port.lock().unwrap();
                send_command_locked(guard.as_mut(), "XYZv3/query=a", command_timeout)
            };
            match reply {
                Ok(text) => {
                    let base = status.lock().unwrap().clone();
                    let updated = parse_status(&text, base, Utc::now());
                    *status.lock().unwrap() = updated;
                }
                Err(e) => tracing::warn!(error = %e, "status poll failed"),
            }
        }
    })
}

/// Write `text + '\n'` and read until `'$'` appears or `timeout` elapses.
/// Returns the response with the terminator and surrounding whitespace
/// stripped.
fn send_command_locked(port: &mut dyn SerialPort, text: &str, timeout: Duration) -> Result<String, SessionError> {
    let mut cmd = text.as_bytes().to_vec();
    cmd.push(b'\n');
    port.write_all(&cmd)?;
    port.flush()?;
    tracing::debug!(tx = text, "sent command");

    let mut response = Vec::new();
    let mut byte = [0u8; 1];
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        match port.read(&mut byte) {
            Ok(0) => continue,
            Ok(_) => {
                response.push(byte[0]);
                if byte[0] == b'$' {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => return Err(SessionError::Transport(e)),
        }
    }

    if !response.contains(&b'$') {
        return Err(SessionError::CommandTimeout);
    }

    let text = String::from_utf8_lossy(&response);
    let trimmed = text.replace('$', "");
    tracing::debug!(rx = %trimmed.trim(), "received response");
    Ok(trimmed.trim().to_string())
}
