//! Independent confirmation that a generated test set actually detects
//! the faults it claims to.
//!
//! Owns an [`Fsim`], registers the fault list, runs `ppsfp` over every
//! vector once, marks whichever faults any vector's callback fires for,
//! then reports whichever faults never got marked. A `RunReport`
//! summary (Detected/Untestable/Undecided counts) preserves the
//! three-way distinction `Dtpg` verdicts carry, rather than collapsing
//! it to pass/fail.

use std::collections::HashSet;

use crate::dtpg::Verdict;
use crate::fsim::Fsim;
use crate::netlist::{Fault, FaultId, Netlist, TestVector};

/// Aggregate counters over a set of [`Verdict`]s, as produced by a
/// `Dtpg` sweep and then cross-checked by a [`Verifier`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub detected: usize,
    pub untestable: usize,
    pub undecided: usize,
    /// Faults `Dtpg` reported `Detected` for, but whose test vector
    /// `Verifier::check` could not confirm: a correctness bug in the
    /// CNF/extractor/justifier chain, never expected to be non-empty.
    pub unconfirmed: Vec<FaultId>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.detected + self.untestable + self.undecided
    }

    /// Fold a `(Fault, Verdict)` pair into the counters.
    pub fn record(&mut self, verdict: &Verdict) {
        match verdict {
            Verdict::Detected(_) => self.detected += 1,
            Verdict::Untestable(_) => self.untestable += 1,
            Verdict::Undecided(_) => self.undecided += 1,
        }
    }
}

/// Re-simulates a batch of `(fault, TestVector)` pairs through a fresh
/// [`Fsim`] instance to confirm detection independently of whatever
/// `Dtpg` internals produced them.
pub struct Verifier<'a> {
    fsim: Fsim<'a>,
}

impl<'a> Verifier<'a> {
    pub fn new(net: &'a Netlist, has_previous_state: bool, has_x: bool) -> Verifier<'a> {
        Verifier {
            fsim: Fsim::initialize(net, has_previous_state, has_x),
        }
    }

    /// Check that every fault in `faults` is detected by some vector in
    /// `patterns`. Returns the subset that is NOT detected by any
    /// vector (empty iff every fault in `faults` is confirmed).
    pub fn check(&mut self, faults: &[Fault], patterns: &[TestVector]) -> Vec<FaultId> {
        let mut marked: HashSet<FaultId> = HashSet::new();
        self.fsim.set_fault_list(faults.to_vec());
        self.fsim.ppsfp(patterns, |_index, _tv, f| {
            marked.insert(f.id);
            true
        });

        faults
            .iter()
            .map(|f| f.id)
            .filter(|fid| !marked.contains(fid))
            .collect()
    }

    /// Convenience form for a one-fault-per-vector DTPG sweep: `pairs`
    /// is `(fault, test vector)`, one entry per `Detected` verdict.
    /// Builds a `RunReport` whose `unconfirmed` lists any fault the
    /// re-simulation disagrees with `Dtpg` about.
    pub fn check_pairs(&mut self, pairs: &[(Fault, TestVector)]) -> RunReport {
        let faults: Vec<Fault> = pairs.iter().map(|(f, _)| f.clone()).collect();
        let patterns: Vec<TestVector> = pairs.iter().map(|(_, tv)| tv.clone()).collect();
        let unconfirmed = self.check(&faults, &patterns);
        RunReport {
            detected: faults.len() - unconfirmed.len(),
            untestable: 0,
            undecided: 0,
            unconfirmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{FaultKind, GateKind, ParsedGate};
    use crate::value::Value3;

    fn g(name: &str, kind: GateKind, fanin: &[&str]) -> ParsedGate {
        ParsedGate::new(name, kind, fanin.iter().map(|s| s.to_string()).collect())
    }

    fn and_net() -> Netlist {
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("b", GateKind::PrimaryInput, &[]),
            g("y", GateKind::And, &["a", "b"]),
            g("o", GateKind::PrimaryOutput, &["y"]),
        ];
        Netlist::build(gates).unwrap()
    }

    #[test]
    fn test_confirms_good_vector() {
        let net = and_net();
        let y = net
            .nodes()
            .iter()
            .find(|n| n.name.as_deref() == Some("y"))
            .unwrap()
            .id;
        let fault = net
            .faults()
            .iter()
            .find(|f| f.node == y && f.kind == FaultKind::StuckAt0)
            .unwrap()
            .clone();
        let tv = TestVector::from_values(vec![Value3::One, Value3::One]);
        let mut verifier = Verifier::new(&net, false, true);
        let unconfirmed = verifier.check(&[fault], &[tv]);
        assert!(unconfirmed.is_empty());
    }

    #[test]
    fn test_flags_vector_that_does_not_detect() {
        let net = and_net();
        let y = net
            .nodes()
            .iter()
            .find(|n| n.name.as_deref() == Some("y"))
            .unwrap()
            .id;
        let fault = net
            .faults()
            .iter()
            .find(|f| f.node == y && f.kind == FaultKind::StuckAt0)
            .unwrap()
            .clone();
        let tv = TestVector::from_values(vec![Value3::Zero, Value3::One]);
        let mut verifier = Verifier::new(&net, false, true);
        let unconfirmed = verifier.check(&[fault.clone()], &[tv]);
        assert_eq!(unconfirmed, vec![fault.id]);
    }
}
