use crate::{metrics::charging::ChargingProfile, pipeline::AnalysisSummary};

/// Plain-text summary of an output-performance run.
pub fn render_text(summary: &AnalysisSummary) -> String {
    let peaks = &summary.peaks;
    let mut out = String::new();
    out.push_str("--- Peak Summary ---\n");
    out.push_str(&format!(
        "Voltage peaks: {} max, {} min\n",
        peaks.voltage_positive.len(),
        peaks.voltage_negative.len()
    ));
    out.push_str(&format!(
        "Average peak voltage: {:.3} V\n\n",
        summary.average_voltage
    ));
    out.push_str(&format!(
        "Current peaks: {} max, {} min\n",
        peaks.current_positive.len(),
        peaks.current_negative.len()
    ));
    out.push_str(&format!(
        "Average peak current: {:.3e} A\n\n",
        summary.average_current
    ));
    out.push_str(&format!("Power peaks: {} positive only\n", peaks.power.len()));
    out.push_str(&format!(
        "Average power peak (adjusted): {:.3e} W{}\n",
        summary.average_power,
        if summary.power_peaks_unpaired {
            " (odd peak count)"
        } else {
            ""
        }
    ));

    out.push_str("\n--- Power Peak Integration ---\n");
    for (i, event) in summary.events.iter().enumerate() {
        out.push_str(&format!(
            "Power Peak {}: Energy = {:.2e} J, Duration = {:.4} s\n",
            i + 1,
            event.energy,
            event.duration
        ));
    }
    out.push_str(&format!(
        "\nTotal energy from power peaks: {:.2e} J\n\n",
        summary.total_energy
    ));

    for (i, cycle) in summary.cycles.cycles.iter().enumerate() {
        out.push_str(&format!("Cycle {}: Energy = {:.2e} J\n", i + 1, cycle.energy));
    }
    if let Some(idx) = summary.cycles.excluded_event {
        out.push_str(&format!(
            "Power Peak {} has no partner and is excluded\n",
            idx + 1
        ));
    }
    match summary.cycles.average_cycle_energy.value() {
        Some(avg) => out.push_str(&format!(
            "Average energy per cycle (2 peaks): {:.2e} J\n",
            avg
        )),
        None => out.push_str("Not enough power peaks to compute energy per cycle.\n"),
    }
    out
}

/// One line per charging curve.
pub fn render_charging(label: &str, profile: &ChargingProfile) -> String {
    format!(
        "{}: max {:.3} V at {:.3} s, {:.0}% reached at {:.3} s",
        label,
        profile.max_voltage,
        profile.time_at_max,
        profile.fraction * 100.0,
        profile.time_to_fraction
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::estimate::Estimate;
    use crate::pipeline::{run_analysis, AnalysisConfig};

    #[test]
    fn empty_run_says_not_enough_peaks() {
        let time: Vec<f64> = (0..100).map(|i| i as f64 * 1e-3).collect();
        let voltage = vec![0.0; 100];
        let s = run_analysis(&time, &voltage, &AnalysisConfig::default())
            .unwrap()
            .summary;
        let text = render_text(&s);
        assert!(text.contains("Voltage peaks: 0 max, 0 min"));
        assert!(text.contains("Average peak voltage: n/a V"));
        assert!(text.contains("Not enough power peaks"));
    }

    #[test]
    fn charging_line_marks_missing_fraction() {
        let profile = ChargingProfile {
            max_voltage: 4.0,
            max_index: 10,
            time_at_max: 1.5,
            fraction: 0.9,
            time_to_fraction: Estimate::Unavailable,
        };
        assert_eq!(
            render_charging("1uF", &profile),
            "1uF: max 4.000 V at 1.500 s, 90% reached at n/a s"
        );
    }
}
