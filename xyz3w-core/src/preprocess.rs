//! G-code preprocessor (spec component C): normalizes `G0` rapid moves to
//! `G1` (XYZ firmwares do not recognize `G0`) and injects the header
//! comment block the firmware's slicer-info parser expects.

/// Apply the three preprocessing rules, in order, and return the result.
/// Idempotent: running this twice produces the same text as running it once.
pub fn preprocess(gcode: &str, print_time_sec: u64, filament_mm: f64, model_id: &str) -> String {
    let lines: Vec<&str> = gcode.lines().collect();
    let has_machine = lines
        .iter()
        .take(50)
        .any(|line| line.to_ascii_lowercase().contains("; machine"));

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 8);
    if !has_machine {
        out.push(format!("; machine = {model_id}"));
        out.push(format!("; print_time = {print_time_sec}"));
        out.push(format!("; total_filament = {filament_mm:.1}"));
        out.push("; nozzle_diameter = 0.4".to_string());
        out.push("; layer_height = 0.2".to_string());
        out.push("; filament_diameter = 1.75".to_string());
        out.push("; filament_type = PLA".to_string());
        out.push(String::new());
    }

    out.extend(lines.iter().map(|line| convert_g0_to_g1(line)));

    let mut joined = out
        .iter()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    joined.push('\n');
    joined
}

/// Replace a leading `G0` token with `G1`, keeping any leading whitespace
/// and the rest of the line untouched. Lines like `G02` or `G10` are not
/// `G0` tokens and are left alone.
fn convert_g0_to_g1(line: &str) -> String {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];

    if trimmed == "G0" {
        return format!("{indent}G1");
    }
    if let Some(rest) = trimmed.strip_prefix("G0") {
        if rest.starts_with(' ') || rest.starts_with('\t') {
            return format!("{indent}G1{rest}");
        }
    }
    line.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_header_when_missing() {
        let out = preprocess("G0 X10 Y20\nG1 Z0.2\n", 3600, 1234.7, "dv1MX0A000");
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("; machine = dv1MX0A000"));
        assert_eq!(lines.next(), Some("; print_time = 3600"));
        assert_eq!(lines.next(), Some("; total_filament = 1234.7"));
        assert_eq!(lines.next(), Some("; nozzle_diameter = 0.4"));
        assert_eq!(lines.next(), Some("; layer_height = 0.2"));
        assert_eq!(lines.next(), Some("; filament_diameter = 1.75"));
        assert_eq!(lines.next(), Some("; filament_type = PLA"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("G1 X10 Y20"));
        assert_eq!(lines.next(), Some("G1 Z0.2"));
    }

    #[test]
    fn skips_header_when_present() {
        let input = "; machine = dv1MX0A000\nG1 X1 Y1\n";
        let out = preprocess(input, 60, 1000.0, "dv1MX0A000");
        assert_eq!(out, "; machine = dv1MX0A000\nG1 X1 Y1\n");
    }

    #[test]
    fn converts_g0_with_tab_separator() {
        let out = preprocess("G0\tX1\n", 60, 1000.0, "dv1MX0A000");
        assert!(out.lines().any(|l| l == "G1\tX1"));
    }

    #[test]
    fn does_not_touch_g02_or_g10() {
        let out = preprocess("G02 X1\nG10\n", 60, 1000.0, "dv1MX0A000");
        assert!(out.lines().any(|l| l == "G02 X1"));
        assert!(out.lines().any(|l| l == "G10"));
    }

    #[test]
    fn is_idempotent() {
        let once = preprocess("G0 X1\nG1 Y2\n", 60, 1000.0, "dv1MX0A000");
        let twice = preprocess(&once, 60, 1000.0, "dv1MX0A000");
        assert_eq!(once, twice);
    }

    #[test]
    fn never_leaves_leading_g0_on_noncomment_lines() {
        let out = preprocess("G0 X1\nG0\nG0\tY2\n; G0 in a comment is untouched\n", 60, 1000.0, "m");
        for line in out.lines() {
            if !line.trim_start().starts_with(';') {
                assert!(!line.trim_start().starts_with("G0 "));
                assert_ne!(line.trim_start(), "G0");
                assert!(!line.trim_start().starts_with("G0\t"));
            }
        }
    }
}
