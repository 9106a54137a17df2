/// Errors from the container codec (G-code preprocessing, AES encryption,
/// `.3w` header construction/parsing).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("input is too large to fit a .3w container ({0} bytes)")]
    FileTooLarge(usize),

    #[error("not a .3w file: magic signature did not match")]
    NotA3wFile,

    #[error("file too small to contain a .3w header ({0} bytes, need at least 8192)")]
    TooSmallForHeader(usize),

    #[error("header claims encrypted body of {encrypted_size} bytes but file only has {available} bytes after the header")]
    BodyOutOfBounds {
        encrypted_size: u32,
        available: usize,
    },

    #[error("header body_offset was {0}, expected 8192")]
    BadBodyOffset(u32),

    #[error("ciphertext length {0} is not a multiple of the 16-byte AES block size")]
    UnalignedCiphertext(usize),

    #[error("zip packing failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
