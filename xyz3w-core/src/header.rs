//! `.3w` header codec (spec component E): the fixed 8192-byte header that
//! precedes every encrypted body.

use crate::error::CodecError;

pub const HEADER_SIZE: usize = 8192;
const MAGIC: &[u8; 16] = b"3DPFNKG00000000\x00";
const FORMAT_VERSION: u32 = 2;

const OFF_VERSION: usize = 16;
const OFF_MODEL: usize = 32;
const MODEL_FIELD_LEN: usize = 32;
const OFF_BODY_OFFSET: usize = 80;
const OFF_ENCRYPTED_SIZE: usize = 84;
const OFF_ORIGINAL_SIZE: usize = 88;
const OFF_PRINT_TIME: usize = 96;
const OFF_FILAMENT_MM: usize = 100;
const OFF_ENC_TYPE: usize = 104;

/// Everything the header carries, decoded from raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: u32,
    pub model_id: String,
    pub body_offset: u32,
    pub encrypted_size: u32,
    pub original_size: u32,
    pub print_time_sec: u32,
    pub filament_mm: u32,
    pub enc_type: u32,
}

/// Build the 8192-byte header. `encrypted_size` and `original_size` are the
/// encrypted body's length and the pre-encryption (post zip-wrap, if any)
/// body length respectively.
pub fn encode(
    model_id: &str,
    encrypted_size: u32,
    original_size: u32,
    print_time_sec: u64,
    filament_mm: f64,
    enc_type: u32,
) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..MAGIC.len()].copy_from_slice(MAGIC);
    header[OFF_VERSION..OFF_VERSION + 4].copy_from_slice(&FORMAT_VERSION.to_le_bytes());

    let model_bytes = model_id.as_bytes();
    let n = model_bytes.len().min(MODEL_FIELD_LEN);
    header[OFF_MODEL..OFF_MODEL + n].copy_from_slice(&model_bytes[..n]);

    header[OFF_BODY_OFFSET..OFF_BODY_OFFSET + 4].copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
    header[OFF_ENCRYPTED_SIZE..OFF_ENCRYPTED_SIZE + 4].copy_from_slice(&encrypted_size.to_le_bytes());
    header[OFF_ORIGINAL_SIZE..OFF_ORIGINAL_SIZE + 4].copy_from_slice(&original_size.to_le_bytes());
    header[OFF_PRINT_TIME..OFF_PRINT_TIME + 4].copy_from_slice(&(print_time_sec as u32).to_le_bytes());
    header[OFF_FILAMENT_MM..OFF_FILAMENT_MM + 4].copy_from_slice(&(filament_mm as u32).to_le_bytes());
    header[OFF_ENC_TYPE..OFF_ENC_TYPE + 4].copy_from_slice(&enc_type.to_le_bytes());

    header
}

/// Parse an 8192-byte (or longer) header prefix. `file_len` is the total
/// length of the container the header came from, used to bounds-check the
/// encrypted body size.
pub fn decode(data: &[u8], file_len: usize) -> Result<Header, CodecError> {
    if data.len() < HEADER_SIZE {
        return Err(CodecError::TooSmallForHeader(data.len()));
    }
    if &data[..MAGIC.len()] != MAGIC.as_slice() {
        return Err(CodecError::NotA3wFile);
    }

    let version = read_u32(data, OFF_VERSION);
    let body_offset = read_u32(data, OFF_BODY_OFFSET);
    let encrypted_size = read_u32(data, OFF_ENCRYPTED_SIZE);
    let original_size = read_u32(data, OFF_ORIGINAL_SIZE);
    let print_time_sec = read_u32(data, OFF_PRINT_TIME);
    let filament_mm = read_u32(data, OFF_FILAMENT_MM);
    let enc_type = read_u32(data, OFF_ENC_TYPE);

    if body_offset as usize != HEADER_SIZE {
        return Err(CodecError::BadBodyOffset(body_offset));
    }
    let available = file_len.saturating_sub(HEADER_SIZE);
    if encrypted_size as usize > available {
        return Err(CodecError::BodyOutOfBounds { encrypted_size, available });
    }

    let model_field = &data[OFF_MODEL..OFF_MODEL + MODEL_FIELD_LEN];
    let model_end = model_field.iter().position(|&b| b == 0).unwrap_or(MODEL_FIELD_LEN);
    let model_id = String::from_utf8_lossy(&model_field[..model_end]).into_owned();

    Ok(Header {
        version,
        model_id,
        body_offset,
        encrypted_size,
        original_size,
        print_time_sec,
        filament_mm,
        enc_type,
    })
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_matches_scenario_s1() {
        let header = encode("dv1MX0A000", 16, 16, 60, 1000.0, 2);
        assert_eq!(
            &header[..16],
            &[0x33, 0x44, 0x50, 0x46, 0x4E, 0x4B, 0x47, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x30, 0x00]
        );
    }

    #[test]
    fn offsets_match_scenario_s2() {
        let header = encode("dv1MX0A000", 16, 16, 3600, 1234.7, 2);
        assert_eq!(read_u32(&header, OFF_PRINT_TIME), 0x00000E10);
        assert_eq!(read_u32(&header, OFF_FILAMENT_MM), 0x000004D2);
    }

    #[test]
    fn header_is_exactly_8192_bytes() {
        let header = encode("dv1MX0A000", 16, 16, 60, 1000.0, 2);
        assert_eq!(header.len(), HEADER_SIZE);
    }

    #[test]
    fn decode_round_trips_encode() {
        let header = encode("dv1JP0A000", 48, 40, 120, 500.5, 1);
        let mut file = header.to_vec();
        file.extend(std::iter::repeat(0u8).take(48));
        let decoded = decode(&file, file.len()).unwrap();
        assert_eq!(decoded.model_id, "dv1JP0A000");
        assert_eq!(decoded.encrypted_size, 48);
        assert_eq!(decoded.original_size, 40);
        assert_eq!(decoded.print_time_sec, 120);
        assert_eq!(decoded.filament_mm, 500);
        assert_eq!(decoded.enc_type, 1);
        assert_eq!(decoded.version, 2);
    }

    #[test]
    fn rejects_bad_magic() {
        let data = vec![0u8; HEADER_SIZE];
        assert!(matches!(decode(&data, HEADER_SIZE), Err(CodecError::NotA3wFile)));
    }

    #[test]
    fn rejects_body_larger_than_file() {
        let header = encode("dv1MX0A000", 100, 100, 60, 1000.0, 2);
        let file = header.to_vec(); // no body bytes appended at all
        let err = decode(&file, file.len()).unwrap_err();
        assert!(matches!(err, CodecError::BodyOutOfBounds { .. }));
    }
}
