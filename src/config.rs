//! # Time data configuration
//!
//! Where the leap-second and Earth orientation files live, and the numerical settings of the
//! converter built from them.
//!
//! A configuration is either built in code:
//!
//! ```rust,ignore
//! use ephem_timecore::config::TimeDataConfig;
//! use ephem_timecore::time_system::earth_orientation::EopFileFormat;
//!
//! let config = TimeDataConfig::new("data/tai-utc.dat")
//!     .with_eop_file("data/finals.data", EopFileFormat::Finals);
//! ```
//!
//! or loaded from JSON, every field being optional:
//!
//! ```json
//! {
//!   "leap_second_file": "data/tai-utc.dat",
//!   "eop_file": "data/eopc04_08.62-now",
//!   "eop_format": "C04",
//!   "ref_jd": 2400000.5,
//!   "ut1_tolerance": 1e-9,
//!   "ut1_max_iterations": 50
//! }
//! ```
//!
//! Missing file paths fall back to the user data directory
//! (`<data dir>/ephem_timecore/tai-utc.dat`, …).
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{JulianDate, JD_NOV_17_1858},
    time_system::{
        converter::{DEFAULT_UT1_MAX_ITERATIONS, DEFAULT_UT1_TOLERANCE},
        earth_orientation::EopFileFormat,
    },
    timecore_errors::TimeCoreError,
};

/// Default leap-second file name inside the data directory.
pub const DEFAULT_LEAP_SECOND_FILE: &str = "tai-utc.dat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDataConfig {
    pub leap_second_file: Option<Utf8PathBuf>,
    pub eop_file: Option<Utf8PathBuf>,
    pub eop_format: EopFileFormat,
    /// Origin of the modified julian dates handed to the converter.
    pub ref_jd: JulianDate,
    /// Convergence threshold of the UT1 → TAI iteration, in days.
    pub ut1_tolerance: f64,
    pub ut1_max_iterations: usize,
}

impl Default for TimeDataConfig {
    fn default() -> Self {
        TimeDataConfig {
            leap_second_file: None,
            eop_file: None,
            eop_format: EopFileFormat::default(),
            ref_jd: JD_NOV_17_1858,
            ut1_tolerance: DEFAULT_UT1_TOLERANCE,
            ut1_max_iterations: DEFAULT_UT1_MAX_ITERATIONS,
        }
    }
}

impl TimeDataConfig {
    pub fn new(leap_second_file: impl Into<Utf8PathBuf>) -> Self {
        TimeDataConfig {
            leap_second_file: Some(leap_second_file.into()),
            ..Default::default()
        }
    }

    pub fn with_eop_file(mut self, path: impl Into<Utf8PathBuf>, format: EopFileFormat) -> Self {
        self.eop_file = Some(path.into());
        self.eop_format = format;
        self
    }

    pub fn with_ref_jd(mut self, ref_jd: JulianDate) -> Self {
        self.ref_jd = ref_jd;
        self
    }

    pub fn with_ut1_iteration(mut self, tolerance: f64, max_iterations: usize) -> Self {
        self.ut1_tolerance = tolerance;
        self.ut1_max_iterations = max_iterations;
        self
    }

    /// Parse a JSON configuration.
    ///
    /// Return
    /// ----------
    /// * The checked configuration, [`TimeCoreError::ConfigParseError`] for malformed JSON or
    ///   [`TimeCoreError::InvalidConfiguration`] for out-of-range settings.
    pub fn from_json_str(content: &str) -> Result<Self, TimeCoreError> {
        let config: TimeDataConfig = serde_json::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    ///
    /// Relative file paths inside the configuration are resolved against the directory of the
    /// configuration file.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, TimeCoreError> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&content)?;

        if let Some(base) = path.parent() {
            for file in [&mut config.leap_second_file, &mut config.eop_file]
                .into_iter()
                .flatten()
            {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
        }
        Ok(config)
    }

    /// Reject settings the converter cannot work with.
    pub fn check(&self) -> Result<(), TimeCoreError> {
        if !self.ref_jd.is_finite() {
            return Err(TimeCoreError::InvalidConfiguration(format!(
                "ref_jd must be finite, got {}",
                self.ref_jd
            )));
        }
        if self.ut1_tolerance.is_nan() || self.ut1_tolerance <= 0.0 {
            return Err(TimeCoreError::InvalidConfiguration(format!(
                "ut1_tolerance must be positive, got {}",
                self.ut1_tolerance
            )));
        }
        if self.ut1_max_iterations == 0 {
            return Err(TimeCoreError::InvalidConfiguration(
                "ut1_max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// `<user data dir>/ephem_timecore`, when the platform has one.
    pub fn default_data_dir() -> Option<Utf8PathBuf> {
        let base_dir = BaseDirs::new()?;
        let data_dir = Utf8Path::from_path(base_dir.data_dir())?;
        Some(data_dir.join("ephem_timecore"))
    }

    /// Configured leap-second file, or the default one of the data directory.
    pub fn leap_second_path(&self) -> Result<Utf8PathBuf, TimeCoreError> {
        if let Some(path) = &self.leap_second_file {
            return Ok(path.clone());
        }
        Self::default_data_dir()
            .map(|dir| dir.join(DEFAULT_LEAP_SECOND_FILE))
            .ok_or_else(|| {
                TimeCoreError::InvalidConfiguration(
                    "no leap second file configured and no user data directory".into(),
                )
            })
    }

    /// Configured EOP file, or the default one of the data directory for the configured format.
    pub fn eop_path(&self) -> Option<Utf8PathBuf> {
        self.eop_file.clone().or_else(|| {
            let name = match self.eop_format {
                EopFileFormat::C04 => "eopc04_08.62-now",
                EopFileFormat::Finals => "finals.data",
            };
            Self::default_data_dir().map(|dir| dir.join(name))
        })
    }
}
