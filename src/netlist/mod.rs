//! The test-pattern graph: an immutable, simulation- and CNF-ready view
//! of a gate-level netlist with fanin/fanout adjacency, structural
//! levels, FFR/MFFC partitioning and a representative fault list.
//!
//! Dense id vectors, a topological construction pass, and fanout
//! adjacency computed once at construction, over the flat [`GateKind`]
//! representation ATPG fault sites require (see `DESIGN.md`'s Gate
//! representation decision).

mod build;
mod fault;
mod ffr;
mod gate;
mod node;
mod stats;
mod testvector;

pub use build::ParsedGate;
pub use fault::{derive_transition_faults, Fault, FaultId, FaultKind};
pub use ffr::{Ffr, FfrId, Mffc, MffcId};
pub use gate::GateKind;
pub use node::{Node, NodeId};
pub use stats::NetlistStats;
pub use testvector::{PpiIndex, TestVector};

use crate::error::{AtpgError, Result};

/// An immutable, fully derived netlist: nodes, fanin/fanout adjacency,
/// levels, FFR/MFFC partition and the representative fault list.
///
/// Construction is the only place any of this is computed; every other
/// component (`Fsim`, `Dtpg`) treats a `&Netlist` as read-only and
/// read-shared.
#[derive(Debug)]
pub struct Netlist {
    nodes: Vec<Node>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    /// `(DffInput, DffOutput)` pairs, one per register, sorted by the
    /// `DffInput` id for determinism.
    dffs: Vec<(NodeId, NodeId)>,
    ffrs: Vec<Ffr>,
    mffcs: Vec<Mffc>,
    node_ffr: Vec<FfrId>,
    node_mffc: Vec<MffcId>,
    faults: Vec<Fault>,
}

impl Netlist {
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        inputs: Vec<NodeId>,
        outputs: Vec<NodeId>,
        dffs: Vec<(NodeId, NodeId)>,
    ) -> Result<Netlist> {
        let mut net = Netlist {
            nodes,
            inputs,
            outputs,
            dffs,
            ffrs: Vec::new(),
            mffcs: Vec::new(),
            node_ffr: Vec::new(),
            node_mffc: Vec::new(),
            faults: Vec::new(),
        };
        net.check_structure()?;
        net.derive_partition();
        net.check_partition();
        net.faults = fault::enumerate_representative_faults(&net);
        Ok(net)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn dffs(&self) -> &[(NodeId, NodeId)] {
        &self.dffs
    }

    /// Pseudo-primary inputs: real primary inputs followed by DFF
    /// outputs, in a fixed deterministic order. This is the order a
    /// [`TestVector`] indexes its assignments by.
    pub fn ppis(&self) -> Vec<NodeId> {
        let mut v: Vec<NodeId> = self.inputs.clone();
        v.extend(self.dffs.iter().map(|&(_, q)| q));
        v
    }

    /// Pseudo-primary outputs: real primary outputs followed by DFF
    /// inputs (the D pins, which are this time frame's combinational
    /// sinks), in a fixed deterministic order.
    pub fn ppos(&self) -> Vec<NodeId> {
        let mut v: Vec<NodeId> = self.outputs.clone();
        v.extend(self.dffs.iter().map(|&(d, _)| d));
        v
    }

    pub fn ffrs(&self) -> &[Ffr] {
        &self.ffrs
    }

    pub fn mffcs(&self) -> &[Mffc] {
        &self.mffcs
    }

    pub fn ffr(&self, id: FfrId) -> &Ffr {
        &self.ffrs[id.0 as usize]
    }

    pub fn mffc(&self, id: MffcId) -> &Mffc {
        &self.mffcs[id.0 as usize]
    }

    /// FFR a node belongs to. Panics for PPI nodes, which are never FFR
    /// members.
    pub fn node_ffr(&self, id: NodeId) -> FfrId {
        self.node_ffr[id.index()]
    }

    pub fn node_mffc(&self, id: NodeId) -> MffcId {
        self.node_mffc[id.index()]
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    pub fn fault(&self, id: FaultId) -> &Fault {
        &self.faults[id.0 as usize]
    }

    pub fn stats(&self) -> NetlistStats {
        stats::compute(self)
    }

    /// Transitive fanout of `root`, including `root` itself, in
    /// ascending-level order. This is the fault cone a `Dtpg` CNF build
    /// needs to allocate faulty-circuit variables for.
    pub fn transitive_fanout(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = vec![false; self.nb_nodes()];
        let mut stack = vec![root];
        visited[root.index()] = true;
        let mut out = Vec::new();
        while let Some(n) = stack.pop() {
            out.push(n);
            for &u in &self.node(n).fanout {
                if !visited[u.index()] {
                    visited[u.index()] = true;
                    stack.push(u);
                }
            }
        }
        out.sort_by_key(|n| self.node(*n).level);
        out
    }

    /// Transitive fanin of `root`, including `root` itself, in
    /// ascending-level order.
    pub fn transitive_fanin(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = vec![false; self.nb_nodes()];
        let mut stack = vec![root];
        visited[root.index()] = true;
        let mut out = Vec::new();
        while let Some(n) = stack.pop() {
            out.push(n);
            for &f in &self.node(n).fanin {
                if !visited[f.index()] {
                    visited[f.index()] = true;
                    stack.push(f);
                }
            }
        }
        out.sort_by_key(|n| self.node(*n).level);
        out
    }

    /// Side inputs of a cone: nodes that feed some member of `cone` but
    /// are not themselves in `cone`.
    pub fn side_inputs(&self, cone: &[NodeId]) -> Vec<NodeId> {
        let in_cone: std::collections::HashSet<NodeId> = cone.iter().copied().collect();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for &n in cone {
            for &f in &self.node(n).fanin {
                if !in_cone.contains(&f) && seen.insert(f) {
                    out.push(f);
                }
            }
        }
        out
    }

    /// Structural invariants: levelization, fanin ids below node ids,
    /// reciprocated fanout edges. Always run at construction time;
    /// cheap relative to the rest of the build.
    fn check_structure(&self) -> Result<()> {
        for node in &self.nodes {
            if node.fanin.len() < node.kind.min_arity() {
                return Err(AtpgError::NetlistInvalid(format!(
                    "{} ({}) has too few fanin",
                    node.id, node.kind
                )));
            }
            for &f in &node.fanin {
                if f.index() >= self.nodes.len() {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "{} has an out-of-range fanin",
                        node.id
                    )));
                }
                // Every edge (u -> v) must have level[u] < level[v].
                if self.node(f).level >= node.level {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "levelization violated between {} and {}",
                        f, node.id
                    )));
                }
                if !self.node(f).fanout.contains(&node.id) {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "fanout edge {} -> {} is not reciprocated",
                        f, node.id
                    )));
                }
            }
            if node.kind.is_source() && !node.fanin.is_empty() {
                return Err(AtpgError::NetlistInvalid(format!(
                    "{} ({}) is a source kind but has fanin",
                    node.id, node.kind
                )));
            }
        }
        Ok(())
    }

    fn derive_partition(&mut self) {
        let (ffrs, node_ffr) = ffr::derive_ffrs(self);
        self.ffrs = ffrs;
        self.node_ffr = node_ffr;
        let (mffcs, node_mffc) = ffr::derive_mffcs(self);
        self.mffcs = mffcs;
        self.node_mffc = node_mffc;
    }

    /// Every non-PPI node belongs to exactly one FFR and exactly one
    /// MFFC; the FFRs partition the non-PPI nodes. Only
    /// `debug_assert!`ed, as the construction itself cannot produce a
    /// violation short of a bug in `ffr::derive_ffrs`/`derive_mffcs`.
    fn check_partition(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let mut seen = vec![false; self.nb_nodes()];
        for ffr in &self.ffrs {
            for &m in &ffr.members {
                debug_assert!(!seen[m.index()], "node {} claimed by two FFRs", m);
                seen[m.index()] = true;
            }
        }
        for node in &self.nodes {
            if node.kind.is_source() {
                continue;
            }
            debug_assert!(seen[node.id.index()], "node {} belongs to no FFR", node.id);
        }
        let mut mffc_seen = vec![false; self.ffrs.len()];
        for mffc in &self.mffcs {
            for &f in &mffc.ffrs {
                debug_assert!(
                    !mffc_seen[f.0 as usize],
                    "FFR {:?} claimed by two MFFCs",
                    f
                );
                mffc_seen[f.0 as usize] = true;
            }
        }
        debug_assert!(mffc_seen.iter().all(|&b| b), "some FFR belongs to no MFFC");
    }
}

#[cfg(test)]
mod tests {
    use super::build::ParsedGate;
    use super::*;

    fn g(name: &str, kind: GateKind, fanin: &[&str]) -> ParsedGate {
        ParsedGate::new(name, kind, fanin.iter().map(|s| s.to_string()).collect())
    }

    fn small_comb() -> Netlist {
        // a, b -> and1 -> and2(with c) -> o1
        //                \-> not1 -> o2
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("b", GateKind::PrimaryInput, &[]),
            g("c", GateKind::PrimaryInput, &[]),
            g("and1", GateKind::And, &["a", "b"]),
            g("and2", GateKind::And, &["and1", "c"]),
            g("not1", GateKind::Not, &["and1"]),
            g("o1", GateKind::PrimaryOutput, &["and2"]),
            g("o2", GateKind::PrimaryOutput, &["not1"]),
        ];
        Netlist::build(gates).unwrap()
    }

    #[test]
    fn test_ppis_ppos() {
        let net = small_comb();
        assert_eq!(net.ppis().len(), 3);
        assert_eq!(net.ppos().len(), 2);
    }

    #[test]
    fn test_transitive_fanout() {
        let net = small_comb();
        let and1 = net
            .nodes()
            .iter()
            .find(|n| n.name.as_deref() == Some("and1"))
            .unwrap()
            .id;
        let tfo = net.transitive_fanout(and1);
        // and1, and2, not1, o1, o2
        assert_eq!(tfo.len(), 5);
    }

    #[test]
    fn test_ffr_stem_splits() {
        let net = small_comb();
        // and1 has fanout 2 (and2, not1): it is a stem, so it is its own
        // FFR root, and it does NOT join and2's or not1's FFR.
        let and1 = net
            .nodes()
            .iter()
            .find(|n| n.name.as_deref() == Some("and1"))
            .unwrap()
            .id;
        let and2 = net
            .nodes()
            .iter()
            .find(|n| n.name.as_deref() == Some("and2"))
            .unwrap()
            .id;
        assert_ne!(net.node_ffr(and1), net.node_ffr(and2));
    }
}
