//! Status parser (spec component I): tokenizes and interprets
//! `XYZv3/query=a` replies into a `PrinterStatus` snapshot.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use xyz3w_core::catalog;

/// Integer state code in firmware's ~30-value enumeration (9000-9530).
/// Unknown codes surface verbatim rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCode {
    Known(u32, &'static str),
    Unknown(u32),
}

impl StateCode {
    pub fn label(self) -> &'static str {
        match self {
            StateCode::Known(_, label) => label,
            StateCode::Unknown(_) => "Unknown",
        }
    }

    pub fn code(self) -> u32 {
        match self {
            StateCode::Known(code, _) => code,
            StateCode::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match state_label(code) {
            Some(label) => StateCode::Known(code, label),
            None => StateCode::Unknown(code),
        }
    }
}

/// Firmware's full state-code -> label table, duplicate labels included,
/// from the miniMover protocol notes.
fn state_label(code: u32) -> Option<&'static str> {
    Some(match code {
        9000 => "Initial",
        9001 => "Heating",
        9002 => "Printing",
        9003 | 9004 => "Calibrating",
        9005 => "Cooling Down",
        9006 => "Print Complete",
        9007 => "Idle (Cooled)",
        9008 => "Homing",
        9009 => "Unloading Filament",
        9010 => "Loading Filament",
        9011 => "Idle (Cooled)",
        9012 => "Calibrating",
        9021 => "Loading Filament",
        9029 => "Homing",
        9030 | 9031 | 9032 | 9033 => "Calibrating",
        9034 => "Idle",
        9039 => "Printing",
        9040 => "Paused",
        9050 => "Cancelling",
        9060 => "Error",
        9070 => "Busy",
        9080 => "Scanning",
        9090 => "Cleaning Nozzle",
        9100 => "Updating Firmware",
        9500 => "Ready",
        9510 | 9511 => "Idle",
        9520 | 9530 => "Busy",
        _ => return None,
    })
}

/// A snapshot of printer status as reported by `XYZv3/query=a`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterStatus {
    pub model_number: String,
    pub display_name: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub state: u32,
    pub sub_state: u32,
    pub extruder_temp: i32,
    pub extruder_target: i32,
    pub bed_temp: i32,
    pub bed_target: i32,
    pub print_pct: u32,
    pub print_elapsed_min: u32,
    pub print_remaining_min: u32,
    pub error_code: i32,
    pub filament_remaining_mm: i64,
    pub z_offset: i32,
    pub auto_level: bool,
    pub queried_at: DateTime<Utc>,
}

impl Default for PrinterStatus {
    fn default() -> Self {
        PrinterStatus {
            model_number: String::new(),
            display_name: String::new(),
            serial_number: String::new(),
            firmware_version: String::new(),
            state: 0,
            sub_state: 0,
            extruder_temp: 0,
            extruder_target: 0,
            bed_temp: 0,
            bed_target: 0,
            print_pct: 0,
            print_elapsed_min: 0,
            print_remaining_min: 0,
            error_code: 0,
            filament_remaining_mm: 0,
            z_offset: 0,
            auto_level: false,
            queried_at: DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is a valid timestamp"),
        }
    }
}

impl PrinterStatus {
    pub fn state_code(&self) -> StateCode {
        StateCode::from_code(self.state)
    }
}

fn segment_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.(?=[a-zA-Z]:)").unwrap())
}

/// Parse a raw `XYZv3/query=a` reply into a `PrinterStatus`, starting from
/// `base` (usually the previous snapshot, or `PrinterStatus::default()`).
/// Each `<letter>:<value>` segment is an independent fallible step — a
/// malformed segment is logged and skipped, never poisoning the rest.
pub fn parse_status(reply: &str, mut base: PrinterStatus, queried_at: DateTime<Utc>) -> PrinterStatus {
    for raw_line in reply.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        for seg in segment_split_re().split(line) {
            let seg = seg.trim();
            parse_segment(&mut base, seg);
        }
    }
    base.queried_at = queried_at;
    base
}

fn parse_segment(status: &mut PrinterStatus, seg: &str) {
    if seg.len() < 2 || seg.as_bytes()[1] != b':' {
        return;
    }
    let key = seg.as_bytes()[0] as char;
    let val = &seg[2..];

    match key {
        'j' => {
            let mut parts = val.split(',');
            match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                Some(state) => status.state = state,
                None => {
                    tracing::debug!(segment = seg, "failed to parse j: state");
                    return;
                }
            }
            if let Some(sub) = parts.next() {
                if let Ok(sub_state) = sub.parse() {
                    status.sub_state = sub_state;
                }
            }
        }
        't' => {
            let parts: Vec<&str> = val.split(',').collect();
            if let Some(cur) = parts.get(1).and_then(|s| s.parse().ok()) {
                status.extruder_temp = cur;
            }
            if let Some(bed) = parts.get(2).and_then(|s| s.parse().ok()) {
                status.bed_temp = bed;
            }
            if let Some(target) = parts.get(3).and_then(|s| s.parse().ok()) {
                status.extruder_target = target;
            }
        }
        'n' => {
            status.model_number = val.trim().to_string();
            if let Some(info) = catalog::lookup(&status.model_number) {
                status.display_name = info.display_name.to_string();
            }
        }
        's' => status.serial_number = val.trim().to_string(),
        'v' => status.firmware_version = val.trim().to_string(),
        'e' => match val.parse() {
            Ok(code) => status.error_code = code,
            Err(_) => tracing::debug!(segment = seg, "failed to parse e: error_code"),
        },
        'd' => {
            let parts: Vec<&str> = val.split(',').collect();
            if let Some(pct) = parts.first().and_then(|s| s.parse().ok()) {
                status.print_pct = pct;
            }
            if let Some(elapsed) = parts.get(1).and_then(|s| s.parse().ok()) {
                status.print_elapsed_min = elapsed;
            }
            if let Some(remaining) = parts.get(2).and_then(|s| s.parse().ok()) {
                status.print_remaining_min = remaining;
            }
        }
        'f' => {
            if let Some(mm) = val.split(',').next().and_then(|s| s.parse().ok()) {
                status.filament_remaining_mm = mm;
            } else {
                tracing::debug!(segment = seg, "failed to parse f: filament_remaining_mm");
            }
        }
        'o' => match val.parse() {
            Ok(offset) => status.z_offset = offset,
            Err(_) => tracing::debug!(segment = seg, "failed to parse o: z_offset"),
        },
        'l' => status.auto_level = val.trim() == "1",
        _ => tracing::debug!(segment = seg, "unknown status key"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s5_status_parse() {
        let reply = "j:9002,1\nt:1,205,0,210\nn:dv1MX0A000\nv:1.3.5\n";
        let status = parse_status(reply, PrinterStatus::default(), Utc::now());
        assert_eq!(status.state, 9002);
        assert_eq!(status.sub_state, 1);
        assert_eq!(status.extruder_temp, 205);
        assert_eq!(status.bed_temp, 0);
        assert_eq!(status.extruder_target, 210);
        assert_eq!(status.model_number, "dv1MX0A000");
        assert_eq!(status.firmware_version, "1.3.5");
    }

    #[test]
    fn firmware_version_dots_survive_the_split() {
        let reply = "v:1.3.5.j:9002,0\n";
        let status = parse_status(reply, PrinterStatus::default(), Utc::now());
        assert_eq!(status.firmware_version, "1.3.5");
        assert_eq!(status.state, 9002);
    }

    #[test]
    fn malformed_segment_does_not_poison_siblings() {
        let reply = "e:not_a_number\nn:dv1MX0A000\n";
        let status = parse_status(reply, PrinterStatus::default(), Utc::now());
        assert_eq!(status.error_code, 0);
        assert_eq!(status.model_number, "dv1MX0A000");
    }

    #[test]
    fn unknown_state_code_passes_through() {
        assert_eq!(StateCode::from_code(12345), StateCode::Unknown(12345));
        assert_eq!(StateCode::from_code(9002), StateCode::Known(9002, "Printing"));
    }

    #[test]
    fn unknown_key_is_ignored() {
        let reply = "z:something_unrecognized\nn:dv1MX0A000\n";
        let status = parse_status(reply, PrinterStatus::default(), Utc::now());
        assert_eq!(status.model_number, "dv1MX0A000");
    }
}
