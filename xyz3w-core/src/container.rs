//! Container orchestrator (spec component F): ties the preprocessor,
//! cipher, zip packer and header codec together into `encode_3w` /
//! `decode_3w`.

use crate::catalog::{self, CipherClass};
use crate::cipher::{strip_pkcs7_lenient, Cipher};
use crate::error::CodecError;
use crate::header;
use crate::preprocess::preprocess;
use crate::printinfo::PrintInfo;
use crate::zipbody;

/// Preprocess `gcode`, encrypt it for `model_id`'s cipher class, and wrap
/// it in a `.3w` header. Returns the complete container bytes.
pub fn encode_3w(gcode: &str, info: &PrintInfo, model_id: &str) -> Result<Vec<u8>, CodecError> {
    let processed = preprocess(gcode, info.print_time_sec, info.filament_mm, model_id);
    let body_bytes = processed.into_bytes();

    let class = catalog::cipher_class_for(model_id);
    let to_encrypt = match class {
        CipherClass::Ecb256 => body_bytes.clone(),
        CipherClass::Cbc128Zip => zipbody::pack(&body_bytes)?,
    };

    let encrypted = Cipher::new(class).encrypt(&to_encrypt)?;
    let header = header::encode(
        model_id,
        encrypted.len() as u32,
        body_bytes.len() as u32,
        info.print_time_sec,
        info.filament_mm,
        class.enc_type(),
    );

    let mut out = Vec::with_capacity(header::HEADER_SIZE + encrypted.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&encrypted);

    tracing::info!(
        total_bytes = out.len(),
        body_bytes = body_bytes.len(),
        encrypted_bytes = encrypted.len(),
        model = model_id,
        "encoded .3w container"
    );
    Ok(out)
}

/// Decrypt a `.3w` container back to G-code text, for diagnostics. This is
/// lenient by design (spec §4.F / §7): padding and zip anomalies degrade
/// to a best-effort result rather than failing outright. Only a bad magic
/// or an out-of-bounds body size are treated as hard errors.
pub fn decode_3w(data: &[u8]) -> Result<String, CodecError> {
    let hdr = header::decode(data, data.len())?;
    let body_start = hdr.body_offset as usize;
    let body_end = body_start + hdr.encrypted_size as usize;
    let encrypted = &data[body_start..body_end];

    let mut plain = match CipherClass::from_enc_type(hdr.enc_type) {
        Some(class) => {
            let decrypted = Cipher::new(class).decrypt_raw(encrypted)?;
            let unpadded = strip_pkcs7_lenient(&decrypted);
            match class {
                CipherClass::Cbc128Zip => zipbody::try_unpack(unpadded).unwrap_or_else(|| unpadded.to_vec()),
                CipherClass::Ecb256 => unpadded.to_vec(),
            }
        }
        // Unknown enc_type: the original doesn't decrypt in this case either,
        // it passes the body through untouched.
        None => encrypted.to_vec(),
    };

    let original_size = hdr.original_size as usize;
    if original_size <= plain.len() {
        plain.truncate(original_size);
    }

    Ok(String::from_utf8_lossy(&plain).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_is_always_present() {
        for model in catalog::PRINTER_DB {
            let info = PrintInfo { print_time_sec: 60, filament_mm: 100.0, layer_count: 0 };
            let out = encode_3w("G1 X1 Y1\n", &info, model.model_id).unwrap();
            assert_eq!(&out[..16], b"3DPFNKG00000000\x00");
        }
    }

    #[test]
    fn body_length_is_pkcs7_padded_16_multiple() {
        for model in catalog::PRINTER_DB {
            let info = PrintInfo { print_time_sec: 60, filament_mm: 100.0, layer_count: 0 };
            let gcode = "G1 X1 Y1\nG1 X2 Y2\n";
            let out = encode_3w(gcode, &info, model.model_id).unwrap();
            let body = &out[header::HEADER_SIZE..];
            assert_eq!(body.len() % 16, 0);
            assert!(!body.is_empty());
        }
    }

    #[test]
    fn ecb_round_trip_matches_preprocessed_input() {
        let info = PrintInfo { print_time_sec: 60, filament_mm: 100.0, layer_count: 0 };
        let gcode = "G0 X10 Y20\nG1 Z0.2\n";
        let model = "dv1MX0A000";
        let container = encode_3w(gcode, &info, model).unwrap();
        let decoded = decode_3w(&container).unwrap();
        assert_eq!(decoded, preprocess(gcode, info.print_time_sec, info.filament_mm, model));
    }

    #[test]
    fn cbc_zip_round_trip_matches_preprocessed_input() {
        let info = PrintInfo { print_time_sec: 60, filament_mm: 100.0, layer_count: 0 };
        let gcode = "G0 X10 Y20\nG1 Z0.2\n";
        let model = "dv1JP0A000";
        let container = encode_3w(gcode, &info, model).unwrap();
        let decoded = decode_3w(&container).unwrap();
        assert_eq!(decoded, preprocess(gcode, info.print_time_sec, info.filament_mm, model));
    }

    #[test]
    fn cipher_selection_matches_scenario_s3() {
        let info = PrintInfo { print_time_sec: 60, filament_mm: 100.0, layer_count: 0 };
        let ecb = encode_3w("G1 X1\n", &info, "dv1MX0A000").unwrap();
        let cbc = encode_3w("G1 X1\n", &info, "dv1JP0A000").unwrap();
        let header_enc_type = |data: &[u8]| u32::from_le_bytes(data[104..108].try_into().unwrap());
        assert_eq!(header_enc_type(&ecb), 2);
        assert_eq!(header_enc_type(&cbc), 1);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let data = vec![0u8; header::HEADER_SIZE];
        assert!(matches!(decode_3w(&data), Err(CodecError::NotA3wFile)));
    }

    #[test]
    fn decode_passes_through_unknown_enc_type_untouched() {
        let body = b"not encrypted at all".to_vec();
        let header = header::encode("dv1MX0A000", body.len() as u32, body.len() as u32, 60, 100.0, 99);
        let mut container = header.to_vec();
        container.extend_from_slice(&body);
        let decoded = decode_3w(&container).unwrap();
        assert_eq!(decoded, String::from_utf8(body).unwrap());
    }
}
