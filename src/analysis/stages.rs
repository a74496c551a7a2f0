// src/analysis/stages.rs
//! Sleep-stage classification and text rendering

use crate::analysis::binning::Bin;
use crate::config::constants::aggregation::{DEEP_SLEEP_MAX_COUNT, LIGHT_SLEEP_MAX_COUNT};
use crate::error::{ImuError, ImuResult};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Deep,
    Light,
    Awake,
}

impl Stage {
    /// Classify one bin from both channels' counts
    pub fn classify(accel: u32, gyro: u32) -> Stage {
        if accel <= DEEP_SLEEP_MAX_COUNT || gyro <= DEEP_SLEEP_MAX_COUNT {
            Stage::Deep
        } else if accel <= LIGHT_SLEEP_MAX_COUNT && gyro <= LIGHT_SLEEP_MAX_COUNT {
            Stage::Light
        } else {
            Stage::Awake
        }
    }

    /// 1 = deep, 2 = light, 3 = awake
    pub fn level(&self) -> u8 {
        match self {
            Stage::Deep => 1,
            Stage::Light => 2,
            Stage::Awake => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Deep => write!(f, "deep sleep"),
            Stage::Light => write!(f, "light sleep"),
            Stage::Awake => write!(f, "awake"),
        }
    }
}

/// Classify paired bins; both channels must have the same number of bins
pub fn classify_bins(accel: &[Bin], gyro: &[Bin]) -> ImuResult<Vec<Stage>> {
    if accel.len() != gyro.len() {
        return Err(ImuError::BinMismatch {
            accel: accel.len(),
            gyro: gyro.len(),
        });
    }
    Ok(accel
        .iter()
        .zip(gyro)
        .map(|(a, g)| Stage::classify(a.count, g.count))
        .collect())
}

const HEADER: &str = "--------- sleep stages ---------";
const MARK: &str = "||";
const GAP: &str = "  ";

/// Three-row chart, awake on top, one column per bin
pub fn render_stages(stages: &[Stage]) -> String {
    let mut chart = String::from(HEADER);
    for (label, stage) in [
        ("awake:        ", Stage::Awake),
        ("light sleep:  ", Stage::Light),
        ("deep sleep:   ", Stage::Deep),
    ] {
        chart.push('\n');
        chart.push_str(label);
        for current in stages {
            chart.push_str(if *current == stage { MARK } else { GAP });
        }
    }
    chart
}
