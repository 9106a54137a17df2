//! Command surface (spec component K): one method per printer action, each
//! issuing a predetermined wire string and applying the dual `ok`/`E0`
//! success heuristic (spec §4.K, Open Question 4).

use crate::error::SessionError;
use crate::transport::Session;

/// Axis a jog command moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }
}

/// Success iff the response contains `ok` (case-insensitive) or lacks an
/// `E0`-prefixed error token.
fn is_success(response: &str) -> bool {
    response.to_ascii_lowercase().contains("ok") || !response.contains("E0")
}

/// One method per spec §4.K action, all returning `Ok(true)`/`Ok(false)`
/// for the printer's accept/reject response and `Err` only on a transport
/// failure (timeout, I/O error, not connected).
pub trait Commands {
    fn home(&self) -> Result<bool, SessionError>;
    fn load_filament_start(&self) -> Result<bool, SessionError>;
    fn load_filament_cancel(&self) -> Result<bool, SessionError>;
    fn unload_filament_start(&self) -> Result<bool, SessionError>;
    fn unload_filament_cancel(&self) -> Result<bool, SessionError>;
    fn cancel_print(&self) -> Result<bool, SessionError>;
    fn pause_print(&self) -> Result<bool, SessionError>;
    fn resume_print(&self) -> Result<bool, SessionError>;
    fn calibrate_start(&self) -> Result<bool, SessionError>;
    fn clean_nozzle_start(&self) -> Result<bool, SessionError>;
    fn clean_nozzle_cancel(&self) -> Result<bool, SessionError>;
    /// Jog a single axis by a signed distance in mm.
    fn jog(&self, axis: Axis, signed_mm: i32) -> Result<bool, SessionError>;
    /// Convenience wrapper over `jog`: direction (`1`/`-1`) times distance.
    fn jog_direction(&self, axis: Axis, direction: i32, distance_mm: u32) -> Result<bool, SessionError>;
    fn z_offset_get(&self) -> Result<i32, SessionError>;
    fn z_offset_set(&self, value: i32) -> Result<bool, SessionError>;
    fn auto_level_on(&self) -> Result<bool, SessionError>;
    fn auto_level_off(&self) -> Result<bool, SessionError>;
    fn buzzer_on(&self) -> Result<bool, SessionError>;
    fn buzzer_off(&self) -> Result<bool, SessionError>;
}

impl Commands for Session {
    fn home(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=home")?))
    }

    fn load_filament_start(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=loadfilament")?))
    }

    fn load_filament_cancel(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=loadfilamentcancel")?))
    }

    fn unload_filament_start(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=unloadfilament")?))
    }

    fn unload_filament_cancel(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=unloadfilamentcancel")?))
    }

    fn cancel_print(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=cancel")?))
    }

    fn pause_print(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=pause")?))
    }

    fn resume_print(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=resume")?))
    }

    fn calibrate_start(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=calibratejr")?))
    }

    fn clean_nozzle_start(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=cleannozzle")?))
    }

    fn clean_nozzle_cancel(&self) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command("XYZv3/action=cleannozzlecancel")?))
    }

    fn jog(&self, axis: Axis, signed_mm: i32) -> Result<bool, SessionError> {
        let cmd = format!("XYZv3/action=jog:{{{}:{}}}", axis.letter(), signed_mm);
        Ok(is_success(&self.send_command(&cmd)?))
    }

    fn jog_direction(&self, axis: Axis, direction: i32, distance_mm: u32) -> Result<bool, SessionError> {
        self.jog(axis, distance_mm as i32 * direction)
    }

    fn z_offset_get(&self) -> Result<i32, SessionError> {
        let resp = self.send_command("XYZv3/config=zoffset:get")?;
        Ok(zoffset_re().captures(&resp).and_then(|c| c[1].parse().ok()).unwrap_or(0))
    }

    fn z_offset_set(&self, value: i32) -> Result<bool, SessionError> {
        Ok(is_success(&self.send_command(&format!("XYZv3/config=zoffset:{value}"))?))
    }

    fn auto_level_on(&self) -> Result<bool, SessionError> {
        Ok(self.send_command("XYZv3/config=autolevel:on")?.to_ascii_lowercase().contains("ok"))
    }

    fn auto_level_off(&self) -> Result<bool, SessionError> {
        Ok(self.send_command("XYZv3/config=autolevel:off")?.to_ascii_lowercase().contains("ok"))
    }

    fn buzzer_on(&self) -> Result<bool, SessionError> {
        Ok(self.send_command("XYZv3/config=buzzer:on")?.to_ascii_lowercase().contains("ok"))
    }

    fn buzzer_off(&self) -> Result<bool, SessionError> {
        Ok(self.send_command("XYZv3/config=buzzer:off")?.to_ascii_lowercase().contains("ok"))
    }
}

fn zoffset_re() -> &'static regex::Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"zoffset[=:](-?\d+)").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_heuristic_accepts_ok() {
        assert!(is_success("ok"));
        assert!(is_success("OK\n"));
    }

    #[test]
    fn success_heuristic_accepts_no_e0() {
        assert!(is_success("something unrelated"));
    }

    #[test]
    fn success_heuristic_rejects_e0() {
        assert!(!is_success("E0 home failed"));
    }

    #[test]
    fn zoffset_regex_parses_negative_values() {
        let caps = zoffset_re().captures("zoffset:-15").unwrap();
        assert_eq!(&caps[1], "-15");
    }

    #[test]
    fn jog_wire_string_matches_spec() {
        assert_eq!(Axis::X.letter(), 'x');
        assert_eq!(Axis::Z.letter(), 'z');
    }
}
