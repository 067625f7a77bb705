//! Netlist file I/O: ISCAS-89 `.bench` and BLIF readers/writers.
//!
//! Common shape across both formats: collect statements, build a name
//! table, then resolve gate dependencies into the flat
//! [`crate::netlist::ParsedGate`]/[`crate::netlist::GateKind`] pair this
//! crate's `Netlist` needs. Ambient file-format plumbing around the ATPG
//! core, not part of it.

mod bench;
mod blif;
mod utils;

pub use bench::{read_bench, write_bench};
pub use blif::{read_blif, write_blif};

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{AtpgError, Result};
use crate::netlist::{Netlist, ParsedGate};

/// Read a netlist from `path`, dispatching on its extension (`.bench` or
/// `.blif`).
pub fn read_netlist_file(path: impl AsRef<Path>) -> Result<Netlist> {
    let path = path.as_ref();
    let gates = read_gates_file(path)?;
    Netlist::build(gates)
}

/// Parse `path` into a flat gate list without building the `Netlist` yet
/// (used by callers who want to inspect the parse before construction
/// fails on a structural check).
pub fn read_gates_file(path: impl AsRef<Path>) -> Result<Vec<ParsedGate>> {
    let path = path.as_ref();
    let f = File::open(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("bench") => read_bench(f),
        Some("blif") => read_blif(f),
        other => Err(AtpgError::NetlistInvalid(format!(
            "unrecognized netlist file extension: {:?}",
            other
        ))),
    }
}

/// Write `net` to `path`, dispatching on its extension.
pub fn write_netlist_file(path: impl AsRef<Path>, net: &Netlist) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path)?;
    let mut w = BufWriter::new(f);
    match path.extension().and_then(|e| e.to_str()) {
        Some("bench") => write_bench(&mut w, net),
        Some("blif") => write_blif(&mut w, net),
        other => Err(AtpgError::NetlistInvalid(format!(
            "unrecognized netlist file extension: {:?}",
            other
        ))),
    }
}
