//! Print-info extractor (spec component D): pulls slicer-reported print
//! time, filament usage and layer count out of G-code comments, with
//! fallback estimates when no slicer hint is present.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Derived print metadata used both to fill the `.3w` header and to inject
/// the preprocessor's header comment block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintInfo {
    pub print_time_sec: u64,
    pub filament_mm: f64,
    pub layer_count: u64,
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^;\s*TIME\s*[:=]\s*(\d+)").unwrap())
}

fn prusa_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^;\s*estimated printing time.*?=\s*(.*)").unwrap())
}

fn hours_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*h").unwrap())
}

fn mins_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*m").unwrap())
}

fn secs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*s").unwrap())
}

fn filament_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^;\s*(?:Filament\s*used|MATERIAL)\s*[:=]\s*([\d.]+)\s*(mm|m)?").unwrap()
    })
}

fn layer_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^;\s*LAYER[_\s]*COUNT\s*[:=]\s*(\d+)").unwrap())
}

fn layer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^;\s*LAYER\s*[:=]\s*\d+").unwrap())
}

fn e_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"E([\d.]+)").unwrap())
}

/// Extract `PrintInfo` from G-code text. Pure and idempotent: calling this
/// twice on the same input (or on `preprocess`'s output) yields the same
/// result as long as the slicer comments survive.
pub fn extract_info(gcode: &str) -> PrintInfo {
    let mut print_time_sec: u64 = 0;
    let mut filament_mm: f64 = 0.0;
    let mut explicit_layer_count: Option<u64> = None;
    let mut layer_tally: u64 = 0;

    for raw_line in gcode.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = time_re().captures(line) {
            print_time_sec = caps[1].parse().unwrap_or(print_time_sec);
            continue;
        }

        if let Some(caps) = prusa_time_re().captures(line) {
            let time_str = &caps[1];
            let hours: u64 = hours_re().captures(time_str).and_then(|c| c[1].parse().ok()).unwrap_or(0);
            let mins: u64 = mins_re().captures(time_str).and_then(|c| c[1].parse().ok()).unwrap_or(0);
            let secs: u64 = secs_re().captures(time_str).and_then(|c| c[1].parse().ok()).unwrap_or(0);
            print_time_sec = hours * 3600 + mins * 60 + secs;
            continue;
        }

        if let Some(caps) = filament_re().captures(line) {
            if let Ok(val) = caps[1].parse::<f64>() {
                let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("mm").to_ascii_lowercase();
                filament_mm = if unit == "m" { val * 1000.0 } else { val };
            }
            continue;
        }

        if let Some(caps) = layer_count_re().captures(line) {
            explicit_layer_count = caps[1].parse().ok();
            continue;
        }

        if layer_re().is_match(line) {
            layer_tally += 1;
        }
    }

    if print_time_sec == 0 {
        let move_lines = gcode
            .lines()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with("G1 ") || t.starts_with("G0 ")
            })
            .count() as u64;
        print_time_sec = (move_lines / 10).max(60);
    }

    if filament_mm == 0.0 {
        let max_e = gcode
            .lines()
            .filter_map(|line| e_token_re().captures(line))
            .filter_map(|caps| caps[1].parse::<f64>().ok())
            .fold(0.0_f64, f64::max);
        filament_mm = if max_e > 0.0 { max_e } else { 1000.0 };
    }

    PrintInfo {
        print_time_sec,
        filament_mm,
        layer_count: explicit_layer_count.unwrap_or(layer_tally),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_uses_fallbacks() {
        let info = extract_info("");
        assert_eq!(info, PrintInfo { print_time_sec: 60, filament_mm: 1000.0, layer_count: 0 });
    }

    #[test]
    fn cura_time_comment() {
        let info = extract_info(";TIME:1234\n");
        assert_eq!(info.print_time_sec, 1234);
    }

    #[test]
    fn prusa_time_comment_sums_components() {
        let info = extract_info("; estimated printing time (normal mode) = 1h 23m 45s\n");
        assert_eq!(info.print_time_sec, 1 * 3600 + 23 * 60 + 45);
    }

    #[test]
    fn filament_used_in_meters() {
        let info = extract_info(";Filament used: 2.5m\n");
        assert_eq!(info.filament_mm, 2500.0);
    }

    #[test]
    fn material_comment_defaults_to_mm() {
        let info = extract_info(";MATERIAL:450.2\n");
        assert_eq!(info.filament_mm, 450.2);
    }

    #[test]
    fn explicit_layer_count_wins_over_tally() {
        let info = extract_info(";LAYER_COUNT:5\n;LAYER:0\n;LAYER:1\n");
        assert_eq!(info.layer_count, 5);
    }

    #[test]
    fn layer_tally_used_when_no_explicit_count() {
        let info = extract_info(";LAYER:0\n;LAYER:1\n;LAYER:2\n");
        assert_eq!(info.layer_count, 3);
    }

    #[test]
    fn fallback_filament_from_max_e_value() {
        let info = extract_info("G1 X1 E1.5\nG1 X2 E3.25\nG1 X3 E2.0\n");
        assert_eq!(info.filament_mm, 3.25);
    }

    #[test]
    fn fallback_time_from_move_line_count() {
        let gcode: String = (0..100).map(|_| "G1 X1 Y1\n").collect();
        let info = extract_info(&gcode);
        assert_eq!(info.print_time_sec, 10);
    }
}
