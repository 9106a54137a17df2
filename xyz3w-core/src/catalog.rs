//! Static model catalog: model identifier -> printer metadata, and the
//! cipher class each model family uses for its `.3w` body.

use serde::{Deserialize, Serialize};

/// Which AES construction a model's `.3w` body is encrypted with.
///
/// A two-variant tagged union selected from the model catalog, per the
/// re-architecture guidance against subclassing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherClass {
    /// AES-256-ECB, no compression. miniMaker and newer.
    Ecb256,
    /// AES-128-CBC over a single-entry zip, IV all zero. Older Jr/Pro family.
    Cbc128Zip,
}

impl CipherClass {
    /// The header's `enc_type` tag for this cipher class (spec offset 104).
    pub const fn enc_type(self) -> u32 {
        match self {
            CipherClass::Cbc128Zip => 1,
            CipherClass::Ecb256 => 2,
        }
    }

    /// Resolve a cipher class from the raw header `enc_type` value, if known.
    pub const fn from_enc_type(enc_type: u32) -> Option<Self> {
        match enc_type {
            1 => Some(CipherClass::Cbc128Zip),
            2 => Some(CipherClass::Ecb256),
            _ => None,
        }
    }
}

/// Static metadata for one printer model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: &'static str,
    pub display_name: &'static str,
    pub width_mm: u32,
    pub depth_mm: u32,
    pub height_mm: u32,
    pub heated_bed: bool,
    pub wifi: bool,
    pub cipher_class: CipherClass,
}

macro_rules! model {
    ($id:expr, $name:expr, $w:expr, $d:expr, $h:expr, $bed:expr, $wifi:expr, $cipher:expr) => {
        ModelInfo {
            model_id: $id,
            display_name: $name,
            width_mm: $w,
            depth_mm: $d,
            height_mm: $h,
            heated_bed: $bed,
            wifi: $wifi,
            cipher_class: $cipher,
        }
    };
}

use CipherClass::{Cbc128Zip, Ecb256};

/// The full da Vinci model catalog, reverse-engineered from miniMover's
/// printer list. ECB256 models are the miniMaker/nano family; everything
/// else (Jr, Pro) uses CBC128Zip.
pub static PRINTER_DB: &[ModelInfo] = &[
    model!("dv1MX0A000", "da Vinci miniMaker", 150, 150, 150, false, false, Ecb256),
    model!("dv1MW0A000", "da Vinci mini w", 150, 150, 150, false, true, Ecb256),
    model!("dv1MW0B000", "da Vinci mini wA", 150, 150, 150, false, true, Ecb256),
    model!("dv1MW0C000", "da Vinci mini w+", 150, 150, 150, false, true, Ecb256),
    model!("dv1NX0A000", "da Vinci nano", 120, 120, 120, false, false, Ecb256),
    model!("dv1NW0A000", "da Vinci nano w", 120, 120, 120, false, true, Ecb256),
    model!("dv1JP0A000", "da Vinci Jr. 1.0", 150, 150, 150, false, false, Cbc128Zip),
    model!("dv1JW0A000", "da Vinci Jr. 1.0W", 150, 150, 150, false, true, Cbc128Zip),
    model!("dv1JA0A000", "da Vinci Jr. 1.0A", 175, 175, 175, false, false, Cbc128Zip),
    model!("dv1JS0A000", "da Vinci Jr. 1.0 3in1", 150, 150, 150, false, false, Cbc128Zip),
    model!("dv1JO0A000", "da Vinci Jr. 1.0 3in1 (Open)", 150, 150, 150, false, false, Cbc128Zip),
    model!("dv1JPWA000", "da Vinci Jr. 1.0 Pro", 150, 150, 150, false, false, Cbc128Zip),
    model!("dv1JWWA000", "da Vinci Jr. 1.0W Pro", 150, 150, 150, false, true, Cbc128Zip),
    model!("dv2JX0A000", "da Vinci Jr. 2.0 Mix", 150, 150, 150, false, false, Cbc128Zip),
    model!("dv1PA0A000", "da Vinci 1.0 Pro", 200, 200, 200, true, false, Cbc128Zip),
    model!("dv1PS0A000", "da Vinci 1.0 Pro 3in1", 200, 200, 200, true, false, Cbc128Zip),
    model!("dv1SA0A000", "da Vinci 1.0 Super", 300, 300, 300, true, false, Cbc128Zip),
];

/// Look up a model by its 10-character identifier.
pub fn lookup(model_id: &str) -> Option<&'static ModelInfo> {
    PRINTER_DB.iter().find(|m| m.model_id == model_id)
}

/// Resolve the cipher class for a model identifier. Only the models listed
/// in `PRINTER_DB` as `Ecb256` use ECB; every other identifier, known or
/// not, falls back to `Cbc128Zip` (the original only turns ECB on for its
/// fixed `_ECB_MODELS` list and otherwise leaves `use_ecb` false).
pub fn cipher_class_for(model_id: &str) -> CipherClass {
    lookup(model_id).map(|m| m.cipher_class).unwrap_or(CipherClass::Cbc128Zip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimaker_is_ecb() {
        assert_eq!(cipher_class_for("dv1MX0A000"), CipherClass::Ecb256);
    }

    #[test]
    fn jr_is_cbc_zip() {
        assert_eq!(cipher_class_for("dv1JP0A000"), CipherClass::Cbc128Zip);
    }

    #[test]
    fn unknown_model_falls_back_to_cbc() {
        assert_eq!(cipher_class_for("zzUNKNOWN0"), CipherClass::Cbc128Zip);
    }

    #[test]
    fn enc_type_round_trips() {
        assert_eq!(CipherClass::from_enc_type(CipherClass::Ecb256.enc_type()), Some(CipherClass::Ecb256));
        assert_eq!(CipherClass::from_enc_type(CipherClass::Cbc128Zip.enc_type()), Some(CipherClass::Cbc128Zip));
        assert_eq!(CipherClass::from_enc_type(0), None);
    }

    #[test]
    fn catalog_has_all_seventeen_models() {
        assert_eq!(PRINTER_DB.len(), 17);
    }
}
