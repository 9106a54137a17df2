//! G-code preprocessing and `.3w` encrypted container codec for XYZprinting
//! da Vinci 3D printers. No I/O, no serial transport — see `xyz3w-session`
//! for that.

pub mod catalog;
pub mod cipher;
pub mod container;
pub mod error;
pub mod header;
pub mod preprocess;
pub mod printinfo;
pub mod zipbody;

pub use catalog::{cipher_class_for, lookup, CipherClass, ModelInfo, PRINTER_DB};
pub use container::{decode_3w, encode_3w};
pub use error::CodecError;
pub use header::{Header, HEADER_SIZE};
pub use preprocess::preprocess;
pub use printinfo::{extract_info, PrintInfo};
