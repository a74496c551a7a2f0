// src/analysis/binning.rs
//! Event-density binning
//!
//! The session's time span is probed at evenly spaced points. Each probe gets
//! the number of events at or before it, and the range `(0, max]` of those
//! cumulative counts is split into equal windows. A bin's count is the number
//! of probes whose cumulative value falls in its window, so quiet stretches of
//! the night show up as bins with many probes and busy stretches as bins with
//! few.

use crate::analysis::events::events_at_or_before;
use serde::Serialize;

/// One equal-width window over the cumulative event count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub index: usize,
    /// Cumulative-count window `(lo, hi]`
    pub lo: f64,
    pub hi: f64,
    pub count: u32,
    /// First and last probe time that landed in this bin
    pub span: Option<(f64, f64)>,
}

/// `count` evenly spaced points over `[first, last]`, both ends included
pub fn probe_times(first: f64, last: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![first],
        _ => {
            let steps = (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        last
                    } else {
                        first + (last - first) * i as f64 / steps
                    }
                })
                .collect()
        }
    }
}

/// Cumulative event count at every probe
pub fn cumulative_counts(events: &[f64], probes: &[f64]) -> Vec<usize> {
    probes
        .iter()
        .map(|&probe| events_at_or_before(events, probe))
        .collect()
}

/// Window index of a positive cumulative value; integer arithmetic keeps the
/// `(lo, hi]` boundaries exact
fn window_index(value: usize, max: usize, bins: usize) -> usize {
    ((value * bins + max - 1) / max - 1).min(bins - 1)
}

/// Split `(0, max]` into `bins` windows and count probes per window.
///
/// Always returns exactly `bins` bins; all counts are zero when no probe saw
/// an event.
pub fn bin_counts(cumulative: &[usize], probes: &[f64], bins: usize) -> Vec<Bin> {
    let max = cumulative.iter().copied().max().unwrap_or(0);
    let width = max as f64 / bins as f64;
    let mut result: Vec<Bin> = (0..bins)
        .map(|index| Bin {
            index,
            lo: width * index as f64,
            hi: width * (index + 1) as f64,
            count: 0,
            span: None,
        })
        .collect();
    if max == 0 || bins == 0 {
        return result;
    }

    for (&value, &time) in cumulative.iter().zip(probes) {
        if value == 0 {
            continue;
        }
        let bin = &mut result[window_index(value, max, bins)];
        bin.count += 1;
        bin.span = Some(match bin.span {
            Some((start, end)) => (start.min(time), end.max(time)),
            None => (time, time),
        });
    }
    result
}

/// Probe, accumulate and bin one channel's events
pub fn bin_events(events: &[f64], first: f64, last: f64, bins: usize, probe_count: usize) -> Vec<Bin> {
    let probes = probe_times(first, last, probe_count);
    let cumulative = cumulative_counts(events, &probes);
    bin_counts(&cumulative, &probes, bins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(bins: &[Bin]) -> Vec<u32> {
        bins.iter().map(|bin| bin.count).collect()
    }

    #[test]
    fn test_probe_times_include_both_ends() {
        let probes = probe_times(10.0, 20.0, 5);
        assert_eq!(probes, vec![10.0, 12.5, 15.0, 17.5, 20.0]);
    }

    #[test]
    fn test_two_bins() {
        let bins = bin_events(&[5.0, 12.0, 19.0, 47.0], 0.0, 50.0, 2, 1000);
        assert_eq!(bins.len(), 2);
        assert_eq!(counts(&bins), vec![280, 620]);
        assert!(bins.iter().map(|b| b.count).sum::<u32>() <= 1000);
        assert_eq!(bins[0].lo, 0.0);
        assert_eq!(bins[0].hi, 2.0);
        assert_eq!(bins[1].hi, 4.0);
    }

    #[test]
    fn test_four_bins_follow_event_gaps() {
        let bins = bin_events(&[5.0, 12.0, 19.0, 47.0], 0.0, 50.0, 4, 1000);
        assert_eq!(counts(&bins), vec![140, 140, 560, 60]);
        let (start, end) = bins[3].span.unwrap();
        assert!(start >= 47.0);
        assert_eq!(end, 50.0);
    }

    #[test]
    fn test_span_starts_at_first_event() {
        let bins = bin_events(&[5.0, 12.0, 19.0, 47.0], 5.0, 47.0, 2, 1000);
        assert_eq!(counts(&bins), vec![333, 667]);
        assert_eq!(bins[0].span.unwrap().0, 5.0);
        assert_eq!(bins[1].span.unwrap().1, 47.0);
    }

    #[test]
    fn test_no_events_gives_empty_bins() {
        let bins = bin_events(&[], 0.0, 10.0, 20, 1000);
        assert_eq!(bins.len(), 20);
        assert!(bins.iter().all(|bin| bin.count == 0 && bin.span.is_none()));
    }

    #[test]
    fn test_top_window_is_closed() {
        // one event: every probe from it onward has the maximum value
        let bins = bin_events(&[3.0], 0.0, 9.0, 3, 10);
        assert_eq!(counts(&bins), vec![0, 0, 7]);
    }
}
