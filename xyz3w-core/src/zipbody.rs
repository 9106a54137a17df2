//! Zip body packer (spec component B). Older, `Cbc128Zip`-class models
//! expect the G-code wrapped in a single-entry Deflate zip named
//! `model.gcode` before it gets AES-128-CBC encrypted.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::CodecError;

const ENTRY_NAME: &str = "model.gcode";

/// Wrap `gcode` as the single `model.gcode` entry of a Deflate zip.
pub fn pack(gcode: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(&mut cursor);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(ENTRY_NAME, options)?;
    writer.write_all(gcode)?;
    writer.finish()?;
    Ok(cursor.into_inner())
}

/// Try to read the first entry out of `data` as a zip. Returns `None`
/// rather than an error on any malformed-zip condition — callers fall
/// back to treating `data` as raw G-code (spec §4.B's tolerated quirk).
pub fn try_unpack(data: &[u8]) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(data)).ok()?;
    let mut entry = archive.by_index(0).ok()?;
    let mut out = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut out).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_then_unpack_round_trips() {
        let gcode = b"G1 X1 Y1\nG1 X2 Y2\n";
        let zipped = pack(gcode).unwrap();
        let unzipped = try_unpack(&zipped).unwrap();
        assert_eq!(unzipped, gcode);
    }

    #[test]
    fn unpack_rejects_non_zip_data() {
        assert!(try_unpack(b"not a zip file at all").is_none());
    }
}
