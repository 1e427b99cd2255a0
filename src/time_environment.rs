//! # Time environment
//!
//! [`TimeEnvironment`] owns a [`TimeDataConfig`] and the tables loaded from it, and hands out
//! [`TimeConverter`] handles sharing those tables.
//!
//! Tables are loaded lazily, once, in dependency order:
//!
//! ```text
//! leap-second table ─► leap-only converter ─► EOP table ─► full converter
//! ```
//!
//! The environment is `Sync`: it can be shared between threads, and concurrent first accesses
//! load each table exactly once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ephem_timecore::{config::TimeDataConfig, time_environment::TimeEnvironment};
//! use ephem_timecore::time_system::TimeSystem;
//!
//! let env = TimeEnvironment::new(TimeDataConfig::new("data/tai-utc.dat"))?;
//! let converter = env.converter()?;
//! let utc = converter.convert(58849.0, TimeSystem::TAI, TimeSystem::UTC, env.ref_jd())?;
//! ```
use std::sync::Arc;

use camino::Utf8Path;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{
    config::TimeDataConfig,
    constants::MJD,
    time_system::{
        converter::TimeConverter, earth_orientation::EarthOrientationTable,
        leap_seconds::LeapSecondTable, Epoch, TimeSystem,
    },
    timecore_errors::TimeCoreError,
};

#[derive(Debug)]
pub struct TimeEnvironment {
    config: TimeDataConfig,
    leap_seconds: OnceCell<Arc<LeapSecondTable>>,
    eop: OnceCell<Arc<EarthOrientationTable>>,
}

impl TimeEnvironment {
    /// An environment over a checked configuration. No file is read yet.
    pub fn new(config: TimeDataConfig) -> Result<Self, TimeCoreError> {
        config.check()?;
        Ok(TimeEnvironment {
            config,
            leap_seconds: OnceCell::new(),
            eop: OnceCell::new(),
        })
    }

    /// An environment over a JSON configuration file.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, TimeCoreError> {
        Self::new(TimeDataConfig::from_json_file(path)?)
    }

    pub fn config(&self) -> &TimeDataConfig {
        &self.config
    }

    /// Origin of the modified julian dates of this environment.
    pub fn ref_jd(&self) -> f64 {
        self.config.ref_jd
    }

    /// The leap-second table, loaded on first access.
    ///
    /// Return
    /// ----------
    /// * The shared table, or the configuration, I/O or format error of the load.
    pub fn leap_seconds(&self) -> Result<&Arc<LeapSecondTable>, TimeCoreError> {
        self.leap_seconds.get_or_try_init(|| {
            let path = self.config.leap_second_path()?;
            LeapSecondTable::from_file(&path).map(Arc::new)
        })
    }

    /// The Earth orientation table, loaded on first access after the leap-second table.
    ///
    /// Return
    /// ----------
    /// * The shared table, [`TimeCoreError::InvalidConfiguration`] when no EOP file can be
    ///   located, or the load error.
    pub fn eop(&self) -> Result<&Arc<EarthOrientationTable>, TimeCoreError> {
        self.eop.get_or_try_init(|| {
            let path = self.config.eop_path().ok_or_else(|| {
                TimeCoreError::InvalidConfiguration(
                    "no EOP file configured and no user data directory".into(),
                )
            })?;
            let leap_converter = self.utc_converter()?;
            EarthOrientationTable::from_file(&path, self.config.eop_format, &leap_converter)
                .map(Arc::new)
        })
    }

    /// A converter for every system except UT1.
    pub fn utc_converter(&self) -> Result<TimeConverter, TimeCoreError> {
        let leap = self.leap_seconds()?.clone();
        Ok(TimeConverter::with_leap_seconds_only(leap)
            .with_ut1_iteration(self.config.ut1_tolerance, self.config.ut1_max_iterations))
    }

    /// A converter for every system.
    ///
    /// The EOP table is attached when an EOP file is configured, or when the default one exists
    /// in the data directory; otherwise UT1 conversions report a missing table.
    pub fn converter(&self) -> Result<TimeConverter, TimeCoreError> {
        let leap = self.leap_seconds()?.clone();

        let eop_available = self.config.eop_file.is_some()
            || self.config.eop_path().is_some_and(|path| path.exists());
        let eop = if eop_available {
            Some(self.eop()?.clone())
        } else {
            debug!("no EOP file available, UT1 conversions disabled");
            None
        };

        Ok(TimeConverter::new(Some(leap), eop)
            .with_ut1_iteration(self.config.ut1_tolerance, self.config.ut1_max_iterations))
    }

    /// An epoch using the origin of this environment.
    pub fn epoch(&self, mjd: MJD, system: TimeSystem) -> Epoch {
        Epoch::with_ref_jd(mjd, system, self.config.ref_jd)
    }
}
