//! Lissabon Calibrate - ledstrip calibration sweeps
//!
//! This is the CLI entry point for the lissabon-calibrate tool.
//! Run with: cargo run --bin lissabon-calibrate -- sweep --measurement white

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use lissabon_calibrate::calibration::{
    CalibrationConfig, Calibrator, Measurement, DEFAULT_STEPS,
};
use lissabon_calibrate::data::Table;
use lissabon_calibrate::devices::{DeviceError, IotsaModule, Ledstrip, Sensor};
use lissabon_calibrate::iotsa::{IotsaConfig, Protocol, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
use lissabon_calibrate::plot::{plot_lines, save_png, ChromaticityPlot, PlotOptions};
use lissabon_calibrate::AppSettings;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Calibrate lissabon RGBW ledstrips with an iotsa light sensor
#[derive(Parser, Debug)]
#[command(name = "lissabon-calibrate", version)]
#[command(about = "Sweep ledstrip output, measure it, and plot the results")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a calibration sweep and store the measurements as CSV
    Sweep(SweepArgs),
    /// Line plot of CSV columns
    Plot(PlotArgs),
    /// Chromaticity diagram of the colors in a CSV file
    Colorplot(ColorplotArgs),
    /// Show or save persisted defaults
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct DeviceArgs {
    /// Sensor hostname
    #[arg(long, env = "LISSABON_SENSOR")]
    sensor: Option<String>,

    /// Ledstrip hostname
    #[arg(long, env = "LISSABON_LEDSTRIP")]
    ledstrip: Option<String>,

    /// iotsa HTTP port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Use HTTPS instead of HTTP
    #[arg(long)]
    https: bool,

    /// Bearer token for devices that require one
    #[arg(long, env = "LISSABON_TOKEN")]
    bearer_token: Option<String>,

    /// HTTP request timeout (s)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

impl DeviceArgs {
    fn iotsa_config(&self) -> IotsaConfig {
        let mut config = IotsaConfig::default()
            .with_port(self.port)
            .with_timeout(self.timeout);
        if self.https {
            config = config.with_protocol(Protocol::Https);
        }
        if let Some(token) = &self.bearer_token {
            config = config.with_bearer_token(token.clone());
        }
        config
    }
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[command(flatten)]
    devices: DeviceArgs,

    /// What to measure: white, rgbw-lux, channels or temperature
    #[arg(long, default_value = "white")]
    measurement: Measurement,

    /// Number of steps (the sweep visits steps + 1 values)
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: usize,

    /// Settling time between setting a color and reading the sensor (s)
    #[arg(long)]
    interval: Option<f64>,

    /// Gamma applied to the white channel
    #[arg(long, default_value_t = 1.0)]
    w_gamma: f64,

    /// Gamma applied to the R, G and B channels
    #[arg(long, default_value_t = 1.0)]
    rgb_gamma: f64,

    /// Mix RGB to this color temperature (K) instead of equal parts
    #[arg(long)]
    rgb_temperature: Option<f64>,

    /// Brightness of the white LED relative to RGB white
    #[arg(long)]
    w_brightness: Option<f64>,

    /// Extra factor for the green channel
    #[arg(long)]
    g_hack: Option<f64>,

    /// Extra factor for the blue channel
    #[arg(long)]
    b_hack: Option<f64>,

    /// White LED color temperature (K); default from the strip
    #[arg(long)]
    white_temperature: Option<f64>,

    /// White LED relative brightness; default from the strip
    #[arg(long)]
    white_brightness: Option<f64>,

    /// Lowest temperature of a temperature sweep (K)
    #[arg(long, default_value_t = 2200.0)]
    min_temperature: f64,

    /// Highest temperature of a temperature sweep (K)
    #[arg(long, default_value_t = 6500.0)]
    max_temperature: f64,

    /// Brightness of a temperature sweep
    #[arg(long, default_value_t = 0.5)]
    brightness: f64,

    /// CSV output file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write a line plot PNG
    #[arg(long)]
    plot: Option<PathBuf>,

    /// TrueType font replacing the built-in plot font
    #[arg(long, env = "LISSABON_FONT")]
    font: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PlotArgs {
    /// CSV file written by `sweep`
    #[arg(long)]
    input: PathBuf,

    /// X column (default depends on the measurement)
    #[arg(long)]
    x: Option<String>,

    /// Y columns, as regular expressions matched against whole column names
    #[arg(long)]
    y: Vec<String>,

    /// PNG output file
    #[arg(long)]
    output: PathBuf,

    /// TrueType font replacing the built-in plot font
    #[arg(long, env = "LISSABON_FONT")]
    font: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ColorplotArgs {
    /// CSV file written by `sweep`
    #[arg(long)]
    input: PathBuf,

    /// PNG output file
    #[arg(long)]
    output: PathBuf,

    /// TrueType font replacing the built-in plot font
    #[arg(long, env = "LISSABON_FONT")]
    font: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current defaults
    Show,
    /// Update and save defaults
    Save {
        #[arg(long)]
        sensor: Option<String>,
        #[arg(long)]
        ledstrip: Option<String>,
        #[arg(long)]
        output: Option<String>,
        #[arg(long)]
        font: Option<String>,
        #[arg(long)]
        interval: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = AppSettings::load();

    match cli.command {
        Command::Sweep(args) => sweep(args, &settings).await,
        Command::Plot(args) => plot(args, &settings),
        Command::Colorplot(args) => colorplot(args, &settings),
        Command::Config { action } => config(action, settings),
    }
}

/// Abort with exit code -1 when a device cannot be reached at all.
fn exit_if_unreachable(result: Result<(), &DeviceError>, hostname: &str) {
    if let Err(e) = result {
        if e.is_open_failure() {
            eprintln!("❌ Cannot open {}: {}", hostname, e);
            std::process::exit(-1);
        }
    }
}

async fn sweep(args: SweepArgs, settings: &AppSettings) -> anyhow::Result<()> {
    let sensor_host = args
        .devices
        .sensor
        .clone()
        .unwrap_or_else(|| settings.sensor.clone());
    let ledstrip_host = args
        .devices
        .ledstrip
        .clone()
        .unwrap_or_else(|| settings.ledstrip.clone());
    let iotsa_config = args.devices.iotsa_config();

    println!("💡 Lissabon Calibrate");
    println!("================================================");
    println!("Sensor: {}", sensor_host);
    println!("Ledstrip: {}", ledstrip_host);
    println!("Measurement: {}", args.measurement);
    println!("================================================\n");

    let sensor = Sensor::open(&sensor_host, iotsa_config.clone()).await;
    exit_if_unreachable(sensor.as_ref().map(|_| ()), &sensor_host);
    let sensor = sensor.with_context(|| format!("Failed to open sensor {}", sensor_host))?;

    let ledstrip = Ledstrip::open(&ledstrip_host, iotsa_config).await;
    exit_if_unreachable(ledstrip.as_ref().map(|_| ()), &ledstrip_host);
    let ledstrip =
        ledstrip.with_context(|| format!("Failed to open ledstrip {}", ledstrip_host))?;

    let info = match ledstrip.info().await {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("Cannot read ledstrip settings: {}", e);
            Default::default()
        }
    };
    let white_temperature = args
        .white_temperature
        .or(info.white_temperature)
        .unwrap_or(4000.0);
    let white_brightness = args
        .white_brightness
        .or(info.white_brightness)
        .unwrap_or(1.0);

    let mut config = CalibrationConfig::default()
        .with_measurement(args.measurement)
        .with_steps(args.steps)
        .with_interval(args.interval.unwrap_or(settings.interval))
        .with_gamma(args.w_gamma, args.rgb_gamma)
        .with_hacks(args.g_hack, args.b_hack)
        .with_white_led(white_temperature, white_brightness)
        .with_temperature_range(args.min_temperature, args.max_temperature)
        .with_brightness(args.brightness);
    if let Some(kelvin) = args.rgb_temperature {
        config = config.with_rgb_temperature(kelvin);
    }
    if let Some(brightness) = args.w_brightness {
        config = config.with_w_brightness(brightness);
    }

    let result = Calibrator::new(&sensor, &ledstrip, config).run().await;

    // Always hand the strip back, even after a failed sweep
    if let Err(e) = ledstrip.close().await {
        tracing::warn!("Closing ledstrip failed: {}", e);
    }
    if let Err(e) = sensor.close().await {
        tracing::warn!("Closing sensor failed: {}", e);
    }

    let table = result.context("Calibration sweep failed")?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&settings.output));
    table
        .write_csv(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("\n✅ {} records written to {}", table.len(), output.display());

    if let Some(plot_path) = args.plot {
        let (x, ys) = default_columns(&table);
        let options = plot_options(args.font, settings);
        let image = plot_lines(&table, &x, &ys, &options)?;
        save_png(&image, &plot_path)?;
        println!("📈 Plot written to {}", plot_path.display());
    }

    Ok(())
}

fn plot_options(font: Option<PathBuf>, settings: &AppSettings) -> PlotOptions {
    PlotOptions::default().with_font(font.or_else(|| settings.font_path()))
}

/// X and Y columns for a table: the measurement's defaults, else the first
/// column against all others.
fn default_columns(table: &Table) -> (String, Vec<String>) {
    let measurement = table
        .parameter("measurement")
        .and_then(|m| m.to_string().parse::<Measurement>().ok());
    if let Some(measurement) = measurement {
        let (x, ys) = measurement.plot_columns();
        if table.has_column(x) && ys.iter().all(|y| table.has_column(y)) {
            return (x.to_string(), ys.iter().map(|y| y.to_string()).collect());
        }
    }
    let x = table.keys.first().cloned().unwrap_or_default();
    let ys = table.keys.iter().skip(1).cloned().collect();
    (x, ys)
}

fn read_table(path: &Path) -> anyhow::Result<Table> {
    let table =
        Table::read_csv(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!("📄 {} records from {}", table.len(), path.display());
    Ok(table)
}

fn plot(args: PlotArgs, settings: &AppSettings) -> anyhow::Result<()> {
    let table = read_table(&args.input)?;
    let (default_x, default_ys) = default_columns(&table);

    let x = args.x.unwrap_or(default_x);
    let ys = if args.y.is_empty() {
        default_ys
    } else {
        let selected = table
            .select_columns(&args.y)
            .context("Invalid --y pattern")?;
        if selected.is_empty() {
            bail!(
                "No column matches {:?}; columns are {}",
                args.y,
                table.keys.join(", ")
            );
        }
        selected
    };

    let options = plot_options(args.font, settings);
    let image = plot_lines(&table, &x, &ys, &options)?;
    save_png(&image, &args.output)?;
    println!("📈 Plot of {} against {} written to {}", ys.join(", "), x, args.output.display());
    Ok(())
}

fn colorplot(args: ColorplotArgs, settings: &AppSettings) -> anyhow::Result<()> {
    let table = read_table(&args.input)?;
    let plot = ChromaticityPlot::from_table(&table)?;

    let options = plot_options(args.font, settings);
    let image = plot.render(&options)?;
    save_png(&image, &args.output)?;
    println!(
        "🎨 {} points plotted, written to {}",
        plot.point_count(),
        args.output.display()
    );
    Ok(())
}

fn config(action: ConfigAction, mut settings: AppSettings) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            if let Some(path) = AppSettings::settings_path() {
                println!("# {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Save {
            sensor,
            ledstrip,
            output,
            font,
            interval,
        } => {
            if let Some(sensor) = sensor {
                settings.sensor = sensor;
            }
            if let Some(ledstrip) = ledstrip {
                settings.ledstrip = ledstrip;
            }
            if let Some(output) = output {
                settings.output = output;
            }
            if let Some(font) = font {
                settings.font = font;
            }
            if let Some(interval) = interval {
                settings.interval = interval;
            }
            let path = settings.save().map_err(anyhow::Error::msg)?;
            println!("✅ Settings saved to {}", path.display());
        }
    }
    Ok(())
}
