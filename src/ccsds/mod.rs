//! # Segmented ephemeris messages
//!
//! Orbit and attitude ephemeris messages split their data into segments, each with its own
//! metadata (frame, time span, usable span, interpolation settings). This module parses such
//! messages and evaluates the state of a segment at any covered epoch.
//!
//! ## Structure
//!
//! ```text
//! ccsds
//! ├── epoch          YYYY-MM-DDThh:mm:ss / YYYY-DOYThh:mm:ss → A1 MJD
//! ├── interpolation  Lagrange and SLERP over (epoch, DVector) samples
//! ├── segment        EphemerisSegment: metadata, validation, data store, DetermineState
//! └── reader         EphemerisMessageReader: OEM / AEM files
//! ```
//!
//! All epochs handled here are A1 modified julian dates (standard origin). Message texts are
//! UTC, so a [`TimeConverter`](crate::time_system::converter::TimeConverter) with a leap-second
//! table is required to read them.
pub mod epoch;
pub mod interpolation;
pub mod reader;
pub mod segment;

pub use epoch::parse_ccsds_epoch;
pub use reader::{EphemerisMessageReader, MessageKind};
pub use segment::{EphemerisSegment, SegmentKind};
