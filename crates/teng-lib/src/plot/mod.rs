use crate::{
    detectors::peaks::Peak,
    metrics::charging::ChargingProfile,
    pipeline::Analysis,
    signal::{ChannelKind, Channels, Waveform},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
    /// Fill opacity for bands, 0..=1
    pub alpha: f32,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLUE: Color = Color(0x0000FF);
    pub const RED: Color = Color(0xFF0000);
    pub const GREEN: Color = Color(0x008000);
    pub const PURPLE: Color = Color(0x800080);
    pub const DARK_GREEN: Color = Color(0x006400);
    pub const ORANGE: Color = Color(0xFFA500);
    pub const BLACK: Color = Color(0x000000);

    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    /// Isolated points, e.g. detected peaks
    Markers(LineSeries),
    /// Area between the curve and zero
    Band(LineSeries),
}

impl Series {
    pub fn inner(&self) -> &LineSeries {
        match self {
            Series::Line(s) | Series::Markers(s) | Series::Band(s) => s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_labels(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over all series, `None` when empty.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.inner().points.iter());
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points == 0 {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

fn style(width: f32, color: Color) -> Style {
    Style {
        width,
        color,
        alpha: 1.0,
    }
}

fn trace(
    name: &str,
    time: &[f64],
    values: &[f64],
    scale: f64,
    max_points: usize,
    color: Color,
) -> Series {
    let points: Vec<[f64; 2]> = time
        .iter()
        .zip(values)
        .map(|(t, v)| [*t, v * scale])
        .collect();
    Series::Line(LineSeries {
        name: name.into(),
        points: decimate_points(&points, max_points),
        style: style(1.4, color),
    })
}

fn markers(name: &str, peaks: &[Peak], scale: f64, color: Color) -> Series {
    Series::Markers(LineSeries {
        name: name.into(),
        points: peaks.iter().map(|p| [p.time, p.value * scale]).collect(),
        style: style(4.0, color),
    })
}

/// Channel trace with its positive (and optionally negative) peaks; values
/// are multiplied by `scale` and the unit is shown with `prefix`.
fn channel_panel(
    channels: &Channels,
    kind: ChannelKind,
    scale: f64,
    prefix: &str,
    color: Color,
    peaks: (&[Peak], &[Peak]),
    max_points: usize,
) -> Figure {
    let y_label = format!("{} ({}{})", kind.label(), prefix, kind.unit());
    let mut fig = Figure::new(Some(kind.label().into())).with_labels("Time (s)", &y_label);
    fig.add_series(trace(
        kind.label(),
        &channels.time,
        channels.values(kind),
        scale,
        max_points,
        color,
    ));
    fig.add_series(markers("Max Peaks", peaks.0, scale, Color::RED));
    if !peaks.1.is_empty() {
        fig.add_series(markers("Min Peaks", peaks.1, scale, Color::GREEN));
    }
    fig
}

/// Voltage, current (µA) and power (µW) panels with detected peaks; the
/// power panel also shades every integrated event window.
pub fn figures_from_analysis(analysis: &Analysis, max_points: usize) -> Vec<Figure> {
    let ch = &analysis.channels;
    let peaks = &analysis.summary.peaks;

    let voltage = channel_panel(
        ch,
        ChannelKind::Voltage,
        1.0,
        "",
        Color::BLUE,
        (&peaks.voltage_positive, &peaks.voltage_negative),
        max_points,
    );
    let current = channel_panel(
        ch,
        ChannelKind::Current,
        1e6,
        "µ",
        Color::PURPLE,
        (&peaks.current_positive, &peaks.current_negative),
        max_points,
    );
    let mut power = channel_panel(
        ch,
        ChannelKind::Power,
        1e6,
        "µ",
        Color::DARK_GREEN,
        (&peaks.power, &[]),
        max_points,
    );
    for (i, event) in analysis.summary.events.iter().enumerate() {
        let (left, right) = (event.window.left_index, event.window.right_index);
        let points = ch.time[left..right]
            .iter()
            .zip(&ch.power[left..right])
            .map(|(t, p)| [*t, p * 1e6])
            .collect();
        power.add_series(Series::Band(LineSeries {
            name: format!("Event {}", i + 1),
            points,
            style: Style {
                width: 0.0,
                color: Color::ORANGE,
                alpha: 0.3,
            },
        }));
    }

    vec![voltage, current, power]
}

/// Overlay of charging curves, each with its maximum marked.
pub fn figure_from_charging(
    curves: &[(String, Waveform, ChargingProfile)],
    max_points: usize,
) -> Figure {
    const PALETTE: [Color; 4] = [Color::BLUE, Color::RED, Color::GREEN, Color::PURPLE];
    let mut fig =
        Figure::new(Some("Capacitor charging".into())).with_labels("Time (s)", "Voltage (V)");
    for (i, (label, waveform, profile)) in curves.iter().enumerate() {
        fig.add_series(Series::Line(LineSeries {
            name: label.clone(),
            points: decimate_points(&waveform.points(), max_points),
            style: style(1.4, PALETTE[i % PALETTE.len()]),
        }));
        fig.add_series(Series::Markers(LineSeries {
            name: format!("{} max", label),
            points: vec![[profile.time_at_max, profile.max_voltage]],
            style: style(5.0, Color::BLACK),
        }));
    }
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::charging::charging_profile;
    use crate::pipeline::{run_analysis, AnalysisConfig};

    #[test]
    fn decimation_caps_point_count() {
        let points: Vec<[f64; 2]> = (0..1000).map(|i| [i as f64, 0.0]).collect();
        let out = decimate_points(&points, 100);
        assert_eq!(out.len(), 100);
        assert_eq!(out[1], [10.0, 0.0]);
        assert_eq!(decimate_points(&points[..5], 100).len(), 5);
    }

    #[test]
    fn analysis_panels_carry_peaks_and_event_bands() {
        let n = 3_000;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 1e-4).collect();
        let voltage: Vec<f64> = time
            .iter()
            .map(|t| 120.0 * (2.0 * std::f64::consts::PI * 10.0 * t).sin())
            .collect();
        let cfg = AnalysisConfig {
            voltage_min_separation: 200,
            current_min_separation: 200,
            power_min_separation: 200,
            ..AnalysisConfig::default()
        };
        let analysis = run_analysis(&time, &voltage, &cfg).unwrap();
        let figs = figures_from_analysis(&analysis, 500);
        assert_eq!(figs.len(), 3);
        assert!(figs.iter().all(|f| f.bounds().is_some()));
        let bands = figs[2]
            .series
            .iter()
            .filter(|s| matches!(s, Series::Band(_)))
            .count();
        assert_eq!(bands, analysis.summary.events.len());
        assert!(bands > 0);
        match &figs[0].series[0] {
            Series::Line(line) => assert_eq!(line.points.len(), 500),
            other => panic!("unexpected series {:?}", other),
        }
    }

    #[test]
    fn charging_overlay_marks_maxima() {
        let wf = Waveform::new(vec![0.0, 1.0, 2.0], vec![0.0, 2.0, 1.0]).unwrap();
        let profile = charging_profile(&wf, 0.9).unwrap();
        let fig = figure_from_charging(&[("1uF".into(), wf, profile)], 100);
        assert_eq!(fig.series.len(), 2);
        assert_eq!(fig.series[1].inner().points, vec![[1.0, 2.0]]);
        assert_eq!(fig.bounds(), Some((0.0, 2.0, 0.0, 2.0)));
    }
}
