//! Upload engine (spec component J): chunked binary upload with per-block
//! acknowledgment and progress reporting. Holds the transport mutex for
//! its entire duration so the status poller cannot interleave.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;

use crate::error::SessionError;
use crate::transport::Session;

pub const UPLOAD_CHUNK_SIZE: usize = 8192;
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const INITIATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Reported after each block: `{bytes_sent, total_bytes, percent}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    pub bytes_sent: usize,
    pub total_bytes: usize,
    pub percent: f64,
}

/// Upload `data` under `filename` using the V3 chunked protocol (spec
/// §4.J) with the default 30s per-block acknowledgment timeout.
pub fn upload_file(
    session: &Session,
    filename: &str,
    data: &[u8],
    progress_sink: Option<&mut dyn FnMut(UploadProgress)>,
) -> Result<(), SessionError> {
    upload_file_with_timeout(session, filename, data, UPLOAD_TIMEOUT, progress_sink)
}

/// Same as [`upload_file`], but lets the caller override the per-block
/// acknowledgment timeout (e.g. a slower USB-serial bridge needs more than
/// 30s per 8KiB block). `progress_sink`, if given, is called after every
/// acknowledged block — a callback rather than a channel, since there is
/// no task runtime to hand a receiver to.
pub fn upload_file_with_timeout(
    session: &Session,
    filename: &str,
    data: &[u8],
    block_ack_timeout: Duration,
    mut progress_sink: Option<&mut dyn FnMut(UploadProgress)>,
) -> Result<(), SessionError> {
    let (mut port_guard, _upload_guard) = session.lock_for_upload();
    let port: &mut dyn SerialPort = port_guard.as_mut();

    let total_bytes = data.len();
    tracing::info!(filename, total_bytes, "starting upload");

    let initiation = format!("XYZv3/upload={filename},{total_bytes}\n");
    port.write_all(initiation.as_bytes())?;
    port.flush()?;

    if !wait_for_ok(port, INITIATION_TIMEOUT)? {
        tracing::warn!(filename, "printer rejected upload initiation");
        return Err(SessionError::UploadRejected);
    }

    let mut block_index: u32 = 0;
    let mut offset = 0usize;
    while offset < total_bytes {
        let end = (offset + UPLOAD_CHUNK_SIZE).min(total_bytes);
        let chunk = &data[offset..end];

        let mut frame = Vec::with_capacity(8 + chunk.len() + 4);
        frame.extend_from_slice(&block_index.to_be_bytes());
        frame.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
        frame.extend_from_slice(chunk);
        frame.extend_from_slice(&[0u8; 4]);

        port.write_all(&frame)?;
        port.flush()?;

        if !wait_for_ok(port, block_ack_timeout)? {
            tracing::warn!(block_index, "no acknowledgment for upload block");
            return Err(SessionError::BlockAckTimeout(block_index));
        }

        offset = end;
        block_index += 1;

        if let Some(sink) = progress_sink.as_deref_mut() {
            sink(UploadProgress {
                bytes_sent: offset,
                total_bytes,
                percent: (offset as f64 / total_bytes as f64) * 100.0,
            });
        }
    }

    port.write_all(b"XYZv3/uploadDidFinish\n")?;
    port.flush()?;
    if !wait_for_ok(port, INITIATION_TIMEOUT)? {
        tracing::warn!(filename, "no final ack; print may still start");
    }

    tracing::info!(filename, blocks = block_index, "upload complete");
    Ok(())
}

/// Build the frames `upload_file` would write, without any I/O. Used by
/// tests to check exact frame shape (spec §8 properties 7/8, scenario S6).
pub fn frame_chunks(data: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut block_index: u32 = 0;
    let mut offset = 0usize;
    while offset < data.len() {
        let end = (offset + UPLOAD_CHUNK_SIZE).min(data.len());
        let chunk = &data[offset..end];
        let mut frame = Vec::with_capacity(8 + chunk.len() + 4);
        frame.extend_from_slice(&block_index.to_be_bytes());
        frame.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
        frame.extend_from_slice(chunk);
        frame.extend_from_slice(&[0u8; 4]);
        frames.push(frame);
        offset = end;
        block_index += 1;
    }
    frames
}

fn wait_for_ok(port: &mut dyn SerialPort, timeout: Duration) -> Result<bool, SessionError> {
    let deadline = Instant::now() + timeout;
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];

    while Instant::now() < deadline {
        match port.read(&mut byte) {
            Ok(0) => continue,
            Ok(_) => {
                buf.push(byte[0]);
                let text = String::from_utf8_lossy(&buf).to_ascii_lowercase();
                if text.contains("ok") {
                    return Ok(true);
                }
                if text.contains("err") || text.contains("error") {
                    tracing::warn!(response = %text, "printer reported an error during upload");
                    return Ok(false);
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => return Err(SessionError::Transport(e)),
        }
    }

    tracing::warn!("timed out waiting for ok");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_7_single_full_chunk() {
        let data = vec![0xABu8; UPLOAD_CHUNK_SIZE];
        let frames = frame_chunks(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 8 + UPLOAD_CHUNK_SIZE + 4);
        assert_eq!(&frames[0][0..4], &0u32.to_be_bytes());
        assert_eq!(&frames[0][4..8], &(UPLOAD_CHUNK_SIZE as u32).to_be_bytes());
    }

    #[test]
    fn property_8_two_chunks_for_one_byte_over() {
        let data = vec![0u8; UPLOAD_CHUNK_SIZE + 1];
        let frames = frame_chunks(&data);
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][0..4], &0u32.to_be_bytes());
        assert_eq!(&frames[0][4..8], &(UPLOAD_CHUNK_SIZE as u32).to_be_bytes());
        assert_eq!(&frames[1][0..4], &1u32.to_be_bytes());
        assert_eq!(&frames[1][4..8], &1u32.to_be_bytes());
    }

    #[test]
    fn scenario_s6_upload_framing() {
        let data = b"ABCDE";
        let frames = frame_chunks(data);
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0],
            vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, b'A', b'B', b'C', b'D', b'E', 0x00, 0x00, 0x00, 0x00]
        );
    }
}
