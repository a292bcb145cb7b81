use super::estimate::Estimate;

/// Mean peak-to-peak magnitude: `(Σpos + Σ|neg|) / len(pos)`.
///
/// Needs matching, non-zero counts; otherwise positive and negative peaks
/// cannot be paired and the result is [`Estimate::Unavailable`].
pub fn average_peak_magnitude(pos: &[f64], neg: &[f64]) -> Estimate {
    if pos.is_empty() || pos.len() != neg.len() {
        return Estimate::Unavailable;
    }
    let total = pos.iter().sum::<f64>() + neg.iter().map(|v| v.abs()).sum::<f64>();
    Estimate::Value(total / pos.len() as f64)
}

/// Power peaks summed per mechanical cycle: `Σp / (len(p) / 2)`.
///
/// Each actuation yields two power peaks (contact and separation). The
/// divisor is the real half-count, so an odd count still gives twice the mean
/// peak value; callers report the unpaired peak separately.
pub fn average_power_peak(peaks: &[f64]) -> Estimate {
    if peaks.is_empty() {
        return Estimate::Unavailable;
    }
    Estimate::Value(peaks.iter().sum::<f64>() / (peaks.len() as f64 / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_positive_and_negative_peaks() {
        let avg = average_peak_magnitude(&[10.0, 8.0], &[-6.0, -4.0]);
        assert_eq!(avg, Estimate::Value(14.0));
    }

    #[test]
    fn mismatched_counts_are_unavailable() {
        assert_eq!(
            average_peak_magnitude(&[10.0, 8.0], &[-6.0]),
            Estimate::Unavailable
        );
        assert_eq!(average_peak_magnitude(&[], &[]), Estimate::Unavailable);
    }

    #[test]
    fn power_peaks_scale_by_pairs() {
        assert_eq!(average_power_peak(&[2.0, 4.0]), Estimate::Value(6.0));
        assert_eq!(average_power_peak(&[3.0]), Estimate::Value(6.0));
        assert_eq!(average_power_peak(&[]), Estimate::Unavailable);
    }
}
