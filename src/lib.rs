//! Automatic test pattern generation for gate-level netlists: stuck-at
//! and transition-delay ATPG over a structural `Netlist`, built on a
//! bit-parallel fault simulator (`Fsim`) and a SAT-based test generator
//! (`Dtpg`).
//!
//! This crate is a direct descendant of a logic-synthesis tool built
//! around And-Inverter-Graphs; the AIG/optimization/tech-mapping layers
//! below are kept as reference while the ATPG-specific modules above
//! them are brought up to completeness, and are trimmed once no longer
//! needed.

pub mod config;
pub mod dtpg;
pub mod error;
pub mod fsim;
pub mod io;
pub mod netlist;
pub mod rtpg;
pub mod sat;
pub mod untest;
pub mod value;
pub mod verify;

pub use config::Config;
pub use dtpg::{Dtpg, Verdict};
pub use error::{AtpgError, Result};
pub use fsim::Fsim;
pub use netlist::{Netlist, ParsedGate};
pub use rtpg::Rtpg;
pub use untest::{UntestOp, UopBase, UopDummy, UopSkip};
pub use value::{PackedValue, Value3};
pub use verify::Verifier;