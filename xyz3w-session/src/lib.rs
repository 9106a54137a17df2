//! Serial port discovery, V3 protocol session transport, status parsing
//! and the chunked upload engine for XYZprinting da Vinci printers.

pub mod commands;
pub mod discovery;
pub mod error;
pub mod status;
pub mod transport;
pub mod upload;

pub use commands::{Axis, Commands};
pub use discovery::{scan_ports, PortCandidate};
pub use error::SessionError;
pub use status::{parse_status, PrinterStatus, StateCode};
pub use transport::{ConnectResult, Session};
pub use upload::{upload_file, upload_file_with_timeout, UploadProgress, UPLOAD_CHUNK_SIZE};
