/// Errors from printer discovery, the serial session transport, and the
/// upload engine.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("port discovery failed: {0}")]
    Discovery(String),

    #[error("failed to open port {port}: {source}")]
    PortOpenFailed {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("timed out waiting for a response")]
    CommandTimeout,

    #[error("printer rejected the upload")]
    UploadRejected,

    #[error("no acknowledgment for block {0}")]
    BlockAckTimeout(u32),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}
