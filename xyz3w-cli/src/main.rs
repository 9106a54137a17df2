mod config;

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use xyz3w_core::{decode_3w, encode_3w, extract_info};
use xyz3w_session::{scan_ports, upload_file_with_timeout, Axis, Commands, Session};

#[derive(Parser)]
#[command(name = "xyz3w", about = "Operator CLI for da Vinci .3w containers and printer sessions")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Serial port to use. Falls back to XYZ3W_PORT if unset.
    #[arg(long, short, global = true)]
    port: Option<String>,

    /// Emit command output as JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List candidate serial ports.
    Scan,
    /// Connect to a printer and print its identity.
    Connect,
    /// Query and print the current printer status.
    Status,
    /// Build a .3w container from a G-code file.
    Encode {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        model: Option<String>,
    },
    /// Decrypt a .3w container back to G-code text (diagnostic-only).
    Decode { input: PathBuf, output: PathBuf },
    /// Upload a .3w file to a connected printer.
    Upload { file: PathBuf },
    Home,
    LoadFilamentStart,
    LoadFilamentCancel,
    UnloadFilamentStart,
    UnloadFilamentCancel,
    Cancel,
    Pause,
    Resume,
    Calibrate,
    CleanNozzleStart,
    CleanNozzleCancel,
    Jog { axis: String, signed_mm: i32 },
    ZOffsetGet,
    ZOffsetSet { value: i32 },
    AutoLevelOn,
    AutoLevelOff,
    BuzzerOn,
    BuzzerOff,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "xyz3w=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let cli = Cli::parse();

    match &cli.command {
        Command::Scan => return cmd_scan(cli.json),
        Command::Encode { input, output, model } => {
            return cmd_encode(input, output, model.clone().unwrap_or(config.default_model))
        }
        Command::Decode { input, output } => return cmd_decode(input, output),
        _ => {}
    }

    let port = resolve_port(cli.port, &config)?;

    match cli.command {
        Command::Scan | Command::Encode { .. } | Command::Decode { .. } => unreachable!("handled above"),
        Command::Connect => cmd_connect(&port, &config),
        Command::Status => cmd_status(&port, &config, cli.json),
        Command::Upload { file } => cmd_upload(&port, &config, &file),
        Command::Home => run_action(&port, &config, |s| s.home()),
        Command::LoadFilamentStart => run_action(&port, &config, |s| s.load_filament_start()),
        Command::LoadFilamentCancel => run_action(&port, &config, |s| s.load_filament_cancel()),
        Command::UnloadFilamentStart => run_action(&port, &config, |s| s.unload_filament_start()),
        Command::UnloadFilamentCancel => run_action(&port, &config, |s| s.unload_filament_cancel()),
        Command::Cancel => run_action(&port, &config, |s| s.cancel_print()),
        Command::Pause => run_action(&port, &config, |s| s.pause_print()),
        Command::Resume => run_action(&port, &config, |s| s.resume_print()),
        Command::Calibrate => run_action(&port, &config, |s| s.calibrate_start()),
        Command::CleanNozzleStart => run_action(&port, &config, |s| s.clean_nozzle_start()),
        Command::CleanNozzleCancel => run_action(&port, &config, |s| s.clean_nozzle_cancel()),
        Command::Jog { axis, signed_mm } => cmd_jog(&port, &config, &axis, signed_mm),
        Command::ZOffsetGet => cmd_zoffset_get(&port, &config),
        Command::ZOffsetSet { value } => run_action(&port, &config, move |s| s.z_offset_set(value)),
        Command::AutoLevelOn => run_action(&port, &config, |s| s.auto_level_on()),
        Command::AutoLevelOff => run_action(&port, &config, |s| s.auto_level_off()),
        Command::BuzzerOn => run_action(&port, &config, |s| s.buzzer_on()),
        Command::BuzzerOff => run_action(&port, &config, |s| s.buzzer_off()),
    }
}

fn resolve_port(cli_port: Option<String>, config: &Config) -> Result<String> {
    cli_port
        .or_else(|| config.default_port.clone())
        .ok_or_else(|| anyhow::anyhow!("no serial port given; pass --port or set XYZ3W_PORT"))
}

fn cmd_scan(json: bool) -> Result<()> {
    let ports = scan_ports()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else {
        for p in &ports {
            println!("{}\t{}", p.device, p.description);
        }
    }
    Ok(())
}

fn cmd_connect(port: &str, config: &Config) -> Result<()> {
    let result = connect(port, config).with_context(|| format!("connecting to {port}"))?;
    println!("connected: model={} model_number={} firmware={}", result.model, result.model_number, result.firmware);
    result.session.disconnect();
    Ok(())
}

fn cmd_status(port: &str, config: &Config, json: bool) -> Result<()> {
    let result = connect(port, config)?;
    let status = result.session.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!(
            "state={} ({}) extruder={}C/{}C bed={}C/{}C pct={}",
            status.state,
            status.state_code().label(),
            status.extruder_temp,
            status.extruder_target,
            status.bed_temp,
            status.bed_target,
            status.print_pct
        );
    }
    result.session.disconnect();
    Ok(())
}

fn cmd_encode(input: &PathBuf, output: &PathBuf, model: String) -> Result<()> {
    let gcode = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let info = extract_info(&gcode);
    let container = encode_3w(&gcode, &info, &model)?;
    fs::write(output, container).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "wrote {} ({} bytes, print_time={}s, filament={}mm)",
        output.display(),
        fs::metadata(output)?.len(),
        info.print_time_sec,
        info.filament_mm
    );
    Ok(())
}

fn cmd_decode(input: &PathBuf, output: &PathBuf) -> Result<()> {
    let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let gcode = decode_3w(&data)?;
    fs::write(output, gcode).with_context(|| format!("writing {}", output.display()))?;
    println!("wrote {}", output.display());
    Ok(())
}

fn cmd_upload(port: &str, config: &Config, file: &PathBuf) -> Result<()> {
    let result = connect(port, config)?;
    let data = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let filename = file.file_name().and_then(|n| n.to_str()).unwrap_or("upload.3w");
    let mut last_pct = -1.0f64;
    upload_file_with_timeout(
        &result.session,
        filename,
        &data,
        config.upload_timeout,
        Some(&mut |progress| {
            if progress.percent - last_pct >= 5.0 || progress.percent >= 100.0 {
                println!("{:.1}%", progress.percent);
                last_pct = progress.percent;
            }
        }),
    )?;
    result.session.disconnect();
    Ok(())
}

fn cmd_jog(port: &str, config: &Config, axis: &str, signed_mm: i32) -> Result<()> {
    let axis = match axis.to_ascii_lowercase().as_str() {
        "x" => Axis::X,
        "y" => Axis::Y,
        "z" => Axis::Z,
        other => bail!("unknown axis '{other}', expected x, y or z"),
    };
    run_action(port, config, move |s| s.jog(axis, signed_mm))
}

fn cmd_zoffset_get(port: &str, config: &Config) -> Result<()> {
    let result = connect(port, config)?;
    let value = result.session.z_offset_get()?;
    println!("{value}");
    result.session.disconnect();
    Ok(())
}

/// Open a session using the configured command timeout and poll interval.
fn connect(port: &str, config: &Config) -> Result<xyz3w_session::ConnectResult, xyz3w_session::SessionError> {
    Session::connect_with_timeouts(port, config.command_timeout, config.poll_interval)
}

fn run_action(port: &str, config: &Config, action: impl FnOnce(&Session) -> Result<bool, xyz3w_session::SessionError>) -> Result<()> {
    let result = connect(port, config)?;
    let ok = action(&result.session)?;
    println!("{}", if ok { "ok" } else { "rejected" });
    result.session.disconnect();
    if !ok {
        bail!("printer rejected the command");
    }
    Ok(())
}
