//! # Code500 binary ephemeris files
//!
//! A Code500 file is a sequence of fixed 2800-byte records:
//!
//! ```text
//! record 1   header 1   (identification, time span, element set at epoch)
//! record 2   header 2   (harmonics text, blank)
//! record 3.. data       (50 states each, sentinel filled when partial)
//! ```
//!
//! Numeric fields are IEEE doubles (plus two 4-byte integers in header 1) in the byte order
//! of the producing machine. The tape id and source id fields of header 1 are EBCDIC text.
//! States are stored in internal units (DUL, DUL/DUT), epochs as DUT elapsed since
//! 18 Sep 1957 00:00 A1.
//!
//! ## Structure
//!
//! ```text
//! code500
//! ├── byte_order   FileByteOrder, swaps, fixed-offset field access (nom)
//! ├── ebcdic       ASCII ↔ EBCDIC tables
//! ├── units        DUL/DUT scale factors
//! ├── header       Code500Header1 / Code500Header2, CentralBody, CoordSystemIndicator
//! ├── data_record  Code500DataRecord
//! └── file         Code500EphemerisFile read and write sessions
//! ```
pub mod byte_order;
pub mod data_record;
pub mod ebcdic;
pub mod file;
pub mod header;
pub mod units;

/// Size in bytes of every Code500 record.
pub const RECORD_SIZE: usize = 2800;

pub use byte_order::FileByteOrder;
pub use file::{
    BadRecordPolicy, Code500EphemerisFile, Code500WriteOptions, InitialAndFinalStates,
    SessionState,
};
pub use header::{CentralBody, CoordSystemIndicator};
