//! Pluggable behavior when DTPG proves a fault untestable.
//!
//! A small functor-style trait with three implementations: `base` just
//! records, `skip` additionally propagates to collapsed faults on the
//! same node past a threshold, `dummy` does nothing at all.

use crate::netlist::{Fault, FaultId, Netlist};

/// Invoked by [`crate::dtpg::Dtpg`] whenever a fault's verdict is
/// `Untestable`. Implementations record the fault and, optionally,
/// propagate that knowledge to other faults the caller need not bother
/// solving for.
pub trait UntestOp {
    /// `fault` has just been proven untestable. Returns the ids of any
    /// *other* faults this call additionally wants the caller to treat
    /// as skipped (never includes `fault.id` itself).
    fn on_untestable(&mut self, net: &Netlist, fault: &Fault) -> Vec<FaultId>;

    /// All faults this policy has recorded as untestable so far,
    /// including those only ever passed to [`on_untestable`] directly
    /// (not the ones it additionally skipped).
    fn recorded(&self) -> &[FaultId];
}

/// `base`: just records the fault, propagates nothing.
#[derive(Default)]
pub struct UopBase {
    recorded: Vec<FaultId>,
}

impl UopBase {
    pub fn new() -> UopBase {
        UopBase::default()
    }
}

impl UntestOp for UopBase {
    fn on_untestable(&mut self, _net: &Netlist, fault: &Fault) -> Vec<FaultId> {
        self.recorded.push(fault.id);
        Vec::new()
    }

    fn recorded(&self) -> &[FaultId] {
        &self.recorded
    }
}

/// `skip`: records the fault, and once `threshold` faults sited on the
/// same node have been proven untestable, also skips every other
/// representative fault still on that node (the remaining site/branch
/// faults collapsed into the same structural location are likely
/// redundant for the same reason).
pub struct UopSkip {
    threshold: usize,
    recorded: Vec<FaultId>,
    per_node_hits: std::collections::HashMap<crate::netlist::NodeId, usize>,
}

impl UopSkip {
    pub fn new(threshold: usize) -> UopSkip {
        UopSkip {
            threshold,
            recorded: Vec::new(),
            per_node_hits: std::collections::HashMap::new(),
        }
    }
}

impl UntestOp for UopSkip {
    fn on_untestable(&mut self, net: &Netlist, fault: &Fault) -> Vec<FaultId> {
        self.recorded.push(fault.id);
        let hits = self.per_node_hits.entry(fault.node).or_insert(0);
        *hits += 1;
        if *hits < self.threshold {
            return Vec::new();
        }
        net.faults()
            .iter()
            .filter(|f| f.node == fault.node && f.id != fault.id)
            .map(|f| f.id)
            .collect()
    }

    fn recorded(&self) -> &[FaultId] {
        &self.recorded
    }
}

/// `dummy`: does nothing at all.
#[derive(Default)]
pub struct UopDummy;

impl UopDummy {
    pub fn new() -> UopDummy {
        UopDummy
    }
}

impl UntestOp for UopDummy {
    fn on_untestable(&mut self, _net: &Netlist, _fault: &Fault) -> Vec<FaultId> {
        Vec::new()
    }

    fn recorded(&self) -> &[FaultId] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{FaultKind, GateKind, ParsedGate};

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
    fn test_base_just_records() {
        let net = and_net();
        let fault = net
            .faults()
            .iter()
            .find(|f| f.kind == FaultKind::StuckAt0 && f.pin.is_none())
            .unwrap()
            .clone();
        let mut op = UopBase::new();
        let extra = op.on_untestable(&net, &fault);
        assert!(extra.is_empty());
        assert_eq!(op.recorded(), &[fault.id]);
    }

    #[test]
    fn test_skip_propagates_after_threshold() {
        let net = and_net();
        let fault = net
            .faults()
            .iter()
            .find(|f| f.kind == FaultKind::StuckAt0 && f.pin.is_none())
            .unwrap()
            .clone();
        let mut op = UopSkip::new(1);
        let extra = op.on_untestable(&net, &fault);
        let other_on_same_node = net
            .faults()
            .iter()
            .filter(|f| f.node == fault.node && f.id != fault.id)
            .count();
        assert_eq!(extra.len(), other_on_same_node);
    }

    #[test]
    fn test_dummy_does_nothing() {
        let net = and_net();
        let fault = net.faults()[0].clone();
        let mut op = UopDummy::new();
        assert!(op.on_untestable(&net, &fault).is_empty());
        assert!(op.recorded().is_empty());
    }
}
