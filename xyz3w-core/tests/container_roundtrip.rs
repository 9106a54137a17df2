use xyz3w_core::{decode_3w, encode_3w, extract_info, preprocess, PrintInfo};

#[test]
fn full_pipeline_from_raw_slicer_gcode() {
    let gcode = ";TIME:120\n;Filament used: 2.5m\n;LAYER_COUNT:3\nG0 X0 Y0\nG1 X10 Y10 E1.0\n";
    let info = extract_info(gcode);
    assert_eq!(info, PrintInfo { print_time_sec: 120, filament_mm: 2500.0, layer_count: 3 });

    for model in ["dv1MX0A000", "dv1JP0A000"] {
        let container = encode_3w(gcode, &info, model).unwrap();
        assert_eq!(&container[..16], b"3DPFNKG00000000\x00");
        let decoded = decode_3w(&container).unwrap();
        assert_eq!(decoded, preprocess(gcode, info.print_time_sec, info.filament_mm, model));
    }
}

#[test]
fn decode_tolerates_truncated_garbage_body() {
    let gcode = "G1 X1 Y1\n";
    let info = PrintInfo { print_time_sec: 60, filament_mm: 1000.0, layer_count: 0 };
    let mut container = encode_3w(gcode, &info, "dv1MX0A000").unwrap();
    let last = container.len() - 1;
    container[last] ^= 0xFF;
    // Corrupting the final ciphertext byte must not panic; decode degrades.
    let _ = decode_3w(&container);
}
