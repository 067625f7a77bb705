//! Error taxonomy shared by every module.

use thiserror::Error;

/// Errors surfaced by netlist construction, fault simulation, DTPG and IO.
#[derive(Error, Debug)]
pub enum AtpgError {
    /// The parsed gate list does not form a valid netlist (dangling
    /// reference, duplicate output driver, a feedback loop outside a
    /// declared DFF, ...).
    #[error("invalid netlist: {0}")]
    NetlistInvalid(String),

    /// A gate kind appeared that this crate does not implement a kernel
    /// or CNF encoding for.
    #[error("unsupported gate kind: {0}")]
    UnsupportedGate(String),

    /// A fault referenced a node id, pin index or fault kind that does
    /// not exist on the netlist it names.
    #[error("invalid fault site: {0}")]
    FaultSiteInvalid(String),

    /// The SAT backend reported an internal failure distinct from UNSAT
    /// (resource limit, solver crash, ...).
    #[error("SAT solver failed: {0}")]
    SolverFailed(String),

    /// The justifier could not back-trace a satisfying assignment to a
    /// full PPI assignment. Debug builds additionally `debug_assert!`
    /// at the call site; this variant is the release-mode fallback.
    #[error("failed to justify test vector: {0}")]
    JustifyFailed(String),

    /// Wraps any I/O failure while reading or writing netlist files.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AtpgError>;
