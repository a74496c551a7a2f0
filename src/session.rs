// src/session.rs
//! Session identity and on-disk layout

use crate::config::constants::storage::SESSIONS_DIR;
use crate::error::{ImuResult, IoResultExt};
use crate::hal::types::SensorKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata of one recording session, owned by the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: u64,
    pub user_id: u64,
    pub device_id: u64,
    /// Unix seconds
    pub started_at: i64,
    #[serde(default)]
    pub processed: bool,
}

/// The two CSV files of a session: `<data_dir>/sessions/<id>_<acc|gyro>_data.csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    session_id: u64,
    accelerometer: PathBuf,
    gyroscope: PathBuf,
}

impl SessionPaths {
    pub fn new(data_dir: impl AsRef<Path>, session_id: u64) -> Self {
        let dir = data_dir.as_ref().join(SESSIONS_DIR);
        let file = |kind: SensorKind| dir.join(format!("{}_{}_data.csv", session_id, kind.short_name()));
        Self {
            session_id,
            accelerometer: file(SensorKind::Accelerometer),
            gyroscope: file(SensorKind::Gyroscope),
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn path(&self, kind: SensorKind) -> &Path {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Gyroscope => &self.gyroscope,
        }
    }

    /// Create the sessions directory if needed
    pub fn ensure_dirs(&self) -> ImuResult<()> {
        for kind in SensorKind::ALL {
            if let Some(parent) = self.path(kind).parent() {
                std::fs::create_dir_all(parent).with_path(parent)?;
            }
        }
        Ok(())
    }
}
