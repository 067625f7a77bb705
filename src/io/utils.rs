//! Shared helpers for the `.bench`/BLIF readers and writers.

use crate::netlist::GateKind;

/// Split a statement line on a set of delimiters, trimming and dropping
/// empty tokens. Both `.bench` and BLIF statement lines tokenize this
/// way once their outer keyword has been stripped.
pub fn split_tokens(line: &str, delims: &[char]) -> Vec<String> {
    line.split(delims)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The `.bench` keyword for a [`GateKind`]. Source kinds and pseudo I/O
/// are written by the caller directly (`INPUT`/`OUTPUT`/`DFF`/constant).
pub fn bench_keyword(kind: GateKind) -> &'static str {
    match kind {
        GateKind::Buf => "BUF",
        GateKind::Not => "NOT",
        GateKind::And => "AND",
        GateKind::Nand => "NAND",
        GateKind::Or => "OR",
        GateKind::Nor => "NOR",
        GateKind::Xor => "XOR",
        GateKind::Xnor => "XNOR",
        _ => unreachable!("bench_keyword called on a source/pseudo-IO kind"),
    }
}
