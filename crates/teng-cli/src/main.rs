use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use teng_lib::{
    io::{
        config as config_io,
        waveform::{self as waveform_io, Delimiter, TimeUnit, WaveformFormat},
    },
    metrics::charging::charging_profile,
    pipeline::{run_analysis, AnalysisConfig},
    plot::{figure_from_charging, figures_from_analysis, Figure, PlotBackend, Series},
    report::{render_charging, render_text},
    signal::Waveform,
};
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "teng",
    version,
    about = "TENG waveform analysis: peaks, event energy and charging curves"
)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TimeUnitArg {
    #[value(name = "s")]
    Seconds,
    #[value(name = "ms")]
    Milliseconds,
}

/// Overrides for the file layout preset of each command.
#[derive(Args, Debug)]
struct FormatArgs {
    /// Field delimiter: one character, or "whitespace"
    #[arg(long)]
    delimiter: Option<String>,
    /// Numbers use ',' as decimal separator
    #[arg(long, overrides_with = "no_decimal_comma")]
    decimal_comma: bool,
    #[arg(long, overrides_with = "decimal_comma")]
    no_decimal_comma: bool,
    /// First row holds column names
    #[arg(long, overrides_with = "no_header")]
    has_header: bool,
    #[arg(long, overrides_with = "has_header")]
    no_header: bool,
    #[arg(long, value_enum)]
    time_unit: Option<TimeUnitArg>,
    #[arg(long)]
    time_col: Option<usize>,
    #[arg(long)]
    voltage_col: Option<usize>,
}

impl FormatArgs {
    fn apply(&self, mut format: WaveformFormat) -> Result<WaveformFormat> {
        if let Some(delimiter) = self.delimiter.as_deref() {
            format.delimiter = parse_delimiter(delimiter)?;
        }
        if self.decimal_comma {
            format.decimal_comma = true;
        } else if self.no_decimal_comma {
            format.decimal_comma = false;
        }
        if self.has_header {
            format.has_header = true;
        } else if self.no_header {
            format.has_header = false;
        }
        if let Some(unit) = self.time_unit {
            format.time_unit = match unit {
                TimeUnitArg::Seconds => TimeUnit::Seconds,
                TimeUnitArg::Milliseconds => TimeUnit::Milliseconds,
            };
        }
        if let Some(col) = self.time_col {
            format.time_column = col;
        }
        if let Some(col) = self.voltage_col {
            format.voltage_column = col;
        }
        Ok(format)
    }
}

/// Command-line overrides for the analysis config.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// TOML file with analysis parameters
    #[arg(long)]
    config: Option<PathBuf>,
    /// Load resistance in ohms
    #[arg(long)]
    load_resistance: Option<f64>,
    #[arg(long)]
    voltage_min_height_pos: Option<f64>,
    #[arg(long)]
    voltage_min_height_neg: Option<f64>,
    #[arg(long)]
    current_min_height_pos: Option<f64>,
    #[arg(long)]
    current_min_height_neg: Option<f64>,
    #[arg(long)]
    power_min_height: Option<f64>,
    #[arg(long)]
    voltage_min_separation: Option<usize>,
    #[arg(long)]
    current_min_separation: Option<usize>,
    #[arg(long)]
    power_min_separation: Option<usize>,
    /// Fraction of each power peak the event window descends through
    #[arg(long)]
    relative_height: Option<f64>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<AnalysisConfig> {
        let mut cfg = match &self.config {
            Some(path) => config_io::read_config(path)?,
            None => AnalysisConfig::default(),
        };
        let floats = [
            (self.load_resistance, &mut cfg.load_resistance),
            (self.voltage_min_height_pos, &mut cfg.voltage_min_height_pos),
            (self.voltage_min_height_neg, &mut cfg.voltage_min_height_neg),
            (self.current_min_height_pos, &mut cfg.current_min_height_pos),
            (self.current_min_height_neg, &mut cfg.current_min_height_neg),
            (self.power_min_height, &mut cfg.power_min_height),
            (self.relative_height, &mut cfg.relative_height),
        ];
        for (value, slot) in floats {
            if let Some(value) = value {
                *slot = value;
            }
        }
        let separations = [
            (self.voltage_min_separation, &mut cfg.voltage_min_separation),
            (self.current_min_separation, &mut cfg.current_min_separation),
            (self.power_min_separation, &mut cfg.power_min_separation),
        ];
        for (value, slot) in separations {
            if let Some(value) = value {
                *slot = value;
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Peaks, per-event energy and cycle energy of a generator output trace
    Analyze {
        /// Waveform export; read from stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        layout: FormatArgs,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Render voltage/current/power panels to a PNG
        #[arg(long)]
        plot: Option<PathBuf>,
        #[arg(long, default_value_t = 4000)]
        max_points: usize,
    },
    /// Maximum voltage and time to a fraction of it for capacitor charging curves
    Charging {
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,
        /// Curve labels, in input order; file names are used when missing
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Samples before this time (ms) are dropped as start-up noise
        #[arg(long, default_value_t = 500.0)]
        start_ms: f64,
        #[arg(long, default_value_t = 0.9)]
        fraction: f64,
        #[command(flatten)]
        layout: FormatArgs,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Render the overlaid curves to a PNG
        #[arg(long)]
        plot: Option<PathBuf>,
        #[arg(long, default_value_t = 4000)]
        max_points: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();
    match cli.command {
        Commands::Analyze {
            input,
            config,
            layout,
            format,
            plot,
            max_points,
        } => cmd_analyze(
            input.as_deref(),
            &config,
            &layout,
            format,
            plot.as_deref(),
            max_points,
        )?,
        Commands::Charging {
            inputs,
            labels,
            start_ms,
            fraction,
            layout,
            format,
            plot,
            max_points,
        } => cmd_charging(
            &inputs,
            &labels,
            start_ms,
            fraction,
            &layout,
            format,
            plot.as_deref(),
            max_points,
        )?,
    }
    Ok(())
}

fn parse_delimiter(value: &str) -> Result<Delimiter> {
    match value {
        "whitespace" | "ws" => Ok(Delimiter::Whitespace),
        "tab" | "\\t" => Ok(Delimiter::Char(b'\t')),
        _ if value.len() == 1 => Ok(Delimiter::Char(value.as_bytes()[0])),
        _ => bail!("delimiter must be a single character or 'whitespace', got {:?}", value),
    }
}

fn read_waveform(input: Option<&Path>, format: &WaveformFormat) -> Result<Waveform> {
    match input {
        Some(path) => waveform_io::read_waveform(path, format),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            waveform_io::parse_waveform(&buf, format)
        }
    }
}

fn cmd_analyze(
    input: Option<&Path>,
    config: &ConfigArgs,
    layout: &FormatArgs,
    output: OutputFormat,
    plot: Option<&Path>,
    max_points: usize,
) -> Result<()> {
    let cfg = config.resolve()?;
    let format = layout.apply(WaveformFormat::oscilloscope_csv())?;
    let waveform = read_waveform(input, &format)?;
    info!(
        "loaded {} samples spanning {:.3} s",
        waveform.len(),
        waveform.duration()
    );
    let analysis = run_analysis(&waveform.time, &waveform.values, &cfg)?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&analysis.summary)?),
        OutputFormat::Text => print!("{}", render_text(&analysis.summary)),
    }
    if let Some(path) = plot {
        let figs = figures_from_analysis(&analysis, max_points);
        PngBackend::new(path, (1000, 800)).draw_all(&figs)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_charging(
    inputs: &[PathBuf],
    labels: &[String],
    start_ms: f64,
    fraction: f64,
    layout: &FormatArgs,
    output: OutputFormat,
    plot: Option<&Path>,
    max_points: usize,
) -> Result<()> {
    let mut format = layout.apply(WaveformFormat::logger_export())?;
    format.start_time = (start_ms > 0.0).then_some(start_ms / 1000.0);

    let mut curves = Vec::with_capacity(inputs.len());
    for (i, path) in inputs.iter().enumerate() {
        let label = labels.get(i).cloned().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("curve {}", i + 1))
        });
        let waveform = waveform_io::read_waveform(path, &format)?;
        let profile = charging_profile(&waveform, fraction)
            .with_context(|| format!("charging profile of {}", path.display()))?;
        match output {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({ "label": label, "profile": profile })
            ),
            OutputFormat::Text => println!("{}", render_charging(&label, &profile)),
        }
        curves.push((label, waveform, profile));
    }
    if let Some(path) = plot {
        let fig = figure_from_charging(&curves, max_points);
        PngBackend::new(path, (1000, 500)).draw(&fig)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

struct PngBackend<'a> {
    path: &'a Path,
    size: (u32, u32),
}

impl<'a> PngBackend<'a> {
    fn new(path: &'a Path, size: (u32, u32)) -> Self {
        Self { path, size }
    }

    /// Stack figures vertically in one bitmap.
    fn draw_all(&mut self, figs: &[Figure]) -> Result<()> {
        let root = BitMapBackend::new(self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let panels = root.split_evenly((figs.len().max(1), 1));
        for (area, fig) in panels.iter().zip(figs) {
            draw_figure(area, fig)?;
        }
        root.present()
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        self.draw_all(std::slice::from_ref(fig))
    }
}

fn padded(min: f64, max: f64) -> (f64, f64) {
    if !(max > min) {
        return (min - 0.5, max + 0.5);
    }
    let pad = 0.05 * (max - min);
    (min - pad, max + pad)
}

fn draw_figure(area: &DrawingArea<BitMapBackend<'_>, Shift>, fig: &Figure) -> Result<()> {
    let (x_min, x_max, y_min, y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    let (y_min, y_max) = padded(y_min.min(0.0), y_max);
    let x_range = if x_max > x_min {
        x_min..x_max
    } else {
        x_min - 0.5..x_max + 0.5
    };
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 20),
        )
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;

    let mut labelled = false;
    for series in &fig.series {
        let (r, g, b) = series.inner().style.color.rgb();
        let color = RGBColor(r, g, b);
        match series {
            Series::Line(line) => {
                let width = line.style.width.round().max(1.0) as u32;
                chart
                    .draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        color.stroke_width(width),
                    ))?
                    .label(line.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
                labelled = true;
            }
            Series::Markers(markers) => {
                let radius = markers.style.width.round().max(1.0) as i32;
                chart
                    .draw_series(
                        markers
                            .points
                            .iter()
                            .map(|p| Circle::new((p[0], p[1]), radius, color.filled())),
                    )?
                    .label(markers.name.clone())
                    .legend(move |(x, y)| Circle::new((x + 10, y), radius, color.filled()));
                labelled = true;
            }
            Series::Band(band) => {
                chart.draw_series(AreaSeries::new(
                    band.points.iter().map(|p| (p[0], p[1])),
                    0.0,
                    color.mix(band.style.alpha as f64),
                ))?;
            }
        }
    }
    if labelled {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}
