//! Fault representation and representative-fault enumeration.
//!
//! The full stuck-at/transition-delay fault model, with equivalence
//! collapsing via a local gate's controlling-value table: an AND-input
//! stuck-at-0 is equivalent to its output stuck-at-0, and so on for
//! every gate family with a controlling value.

use std::collections::HashMap;
use std::fmt;

use super::gate::GateKind;
use super::node::NodeId;
use super::Netlist;

/// A dense fault index, stable for the lifetime of the `Netlist` (or of
/// whatever `Vec<Fault>` the fault belongs to; transition faults derived
/// from a stuck-at list get their own fresh numbering).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaultId(pub u32);

/// The fault model applied at a [`Fault`]'s site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    StuckAt0,
    StuckAt1,
    /// Slow-to-rise: the site should settle to 1 in the second time
    /// frame but is stuck low.
    TransitionRise,
    /// Slow-to-fall: the site should settle to 0 in the second time
    /// frame but is stuck high.
    TransitionFall,
}

impl FaultKind {
    /// The static stuck value this fault forces, for fault models where
    /// that is meaningful in the current time frame (both stuck-at
    /// kinds, and — in the second time frame only — both transition
    /// kinds, which behave exactly like the stuck-at fault on the
    /// opposite value while the first frame establishes the
    /// transition's starting value).
    pub fn stuck_value(self) -> bool {
        matches!(self, FaultKind::StuckAt1 | FaultKind::TransitionFall)
    }

    pub fn is_transition(self) -> bool {
        matches!(self, FaultKind::TransitionRise | FaultKind::TransitionFall)
    }

    /// The value the site must be driven to in the first ("launch")
    /// time frame for a transition fault to have a chance of being
    /// activated; `None` for the two static stuck-at kinds.
    pub fn launch_value(self) -> Option<bool> {
        match self {
            FaultKind::TransitionRise => Some(false),
            FaultKind::TransitionFall => Some(true),
            _ => None,
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            FaultKind::StuckAt0 => "SA0",
            FaultKind::StuckAt1 => "SA1",
            FaultKind::TransitionRise => "TR",
            FaultKind::TransitionFall => "TF",
        };
        write!(f, "{}", s)
    }
}

/// A single fault: a kind and a site. A site with `pin = None` is a
/// stem/output fault; `pin = Some(i)` is a branch fault on fanin pin `i`
/// of `node`, only meaningful when that pin's driver fans out to more
/// than one place (otherwise the branch collapses into the driver's own
/// output fault and is never enumerated as a separate site).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fault {
    pub id: FaultId,
    pub kind: FaultKind,
    pub node: NodeId,
    pub pin: Option<usize>,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.pin {
            Some(p) => write!(f, "{}/{}@{}", self.node, p, self.kind),
            None => write!(f, "{}@{}", self.node, self.kind),
        }
    }
}

/// Minimal union-find used to collapse structurally equivalent faults
/// during enumeration.
struct Dsu {
    parent: Vec<u32>,
}

impl Dsu {
    fn new(n: usize) -> Dsu {
        Dsu {
            parent: (0..n as u32).collect(),
        }
    }

    fn find(&mut self, x: u32) -> u32 {
        if self.parent[x as usize] != x {
            let root = self.find(self.parent[x as usize]);
            self.parent[x as usize] = root;
        }
        self.parent[x as usize]
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller index wins: output faults near the PIs are
            // enumerated with smaller candidate indices than the gates
            // downstream of them, so this keeps the most "upstream"
            // site as the representative, a deterministic and stable
            // choice independent of traversal order.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi as usize] = lo;
        }
    }
}

/// Gate kinds with a controlling-input table: an input at its
/// controlling value determines the output, independent of the other
/// inputs, so an input-stuck-at-controlling-value fault collapses into
/// the gate's own output fault.
fn controlling_merges(kind: GateKind) -> &'static [(bool, bool)] {
    // Each entry is (input value that triggers the merge, resulting
    // output value). `PrimaryOutput`/`DffInput` behave like a
    // non-inverting wire (they are pure observation/sink points with a
    // single fanin and no boolean function of their own).
    match kind {
        GateKind::And => &[(false, false)],
        GateKind::Nand => &[(false, true)],
        GateKind::Or => &[(true, true)],
        GateKind::Nor => &[(true, false)],
        GateKind::Buf | GateKind::PrimaryOutput | GateKind::DffInput => &[(false, false), (true, true)],
        GateKind::Not => &[(false, true), (true, false)],
        _ => &[],
    }
}

/// Enumerate the representative stuck-at fault set for `net`, collapsing
/// structurally equivalent faults per gate-local controlling-value
/// tables: conservative in that every vector detecting the
/// representative also detects every fault it absorbed.
pub(super) fn enumerate_representative_faults(net: &Netlist) -> Vec<Fault> {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    enum CandKey {
        Output(NodeId, bool),
        Branch(NodeId, usize, bool),
    }

    fn add(
        key: CandKey,
        index: &mut HashMap<(NodeId, Option<usize>, bool), u32>,
        keys: &mut Vec<CandKey>,
    ) {
        let lookup = match key {
            CandKey::Output(n, v) => (n, None, v),
            CandKey::Branch(n, i, v) => (n, Some(i), v),
        };
        index.entry(lookup).or_insert_with(|| {
            let idx = keys.len() as u32;
            keys.push(key);
            idx
        });
    }

    let mut keys: Vec<CandKey> = Vec::new();
    let mut index: HashMap<(NodeId, Option<usize>, bool), u32> = HashMap::new();

    for node in net.nodes() {
        if node.kind == GateKind::Const0 || node.kind == GateKind::Const1 {
            continue;
        }
        add(CandKey::Output(node.id, false), &mut index, &mut keys);
        add(CandKey::Output(node.id, true), &mut index, &mut keys);
    }
    for node in net.nodes() {
        for (i, &driver) in node.fanin.iter().enumerate() {
            if net.node(driver).fanout.len() > 1 {
                add(CandKey::Branch(node.id, i, false), &mut index, &mut keys);
                add(CandKey::Branch(node.id, i, true), &mut index, &mut keys);
            }
        }
    }

    let mut dsu = Dsu::new(keys.len());

    let output_idx = |index: &HashMap<(NodeId, Option<usize>, bool), u32>, n: NodeId, v: bool| -> u32 {
        index[&(n, None, v)]
    };
    let edge_idx = |index: &HashMap<(NodeId, Option<usize>, bool), u32>,
                    net: &Netlist,
                    consumer: NodeId,
                    pin: usize,
                    driver: NodeId,
                    v: bool|
     -> u32 {
        if net.node(driver).fanout.len() > 1 {
            index[&(consumer, Some(pin), v)]
        } else {
            index[&(driver, None, v)]
        }
    };

    for node in net.nodes() {
        let merges = controlling_merges(node.kind);
        if merges.is_empty() {
            continue;
        }
        for (i, &driver) in node.fanin.iter().enumerate() {
            for &(in_val, out_val) in merges {
                let e = edge_idx(&index, net, node.id, i, driver, in_val);
                let o = output_idx(&index, node.id, out_val);
                dsu.union(e, o);
            }
        }
    }

    let mut root_to_rep: HashMap<u32, u32> = HashMap::new();
    let mut roots: Vec<u32> = Vec::with_capacity(keys.len());
    for i in 0..keys.len() {
        let r = dsu.find(i as u32);
        roots.push(r);
        root_to_rep.entry(r).or_insert(i as u32);
    }

    let mut rep_indices: Vec<u32> = root_to_rep.values().copied().collect();
    rep_indices.sort_unstable();

    let mut faults = Vec::with_capacity(rep_indices.len() * 2);
    let mut next_id = 0u32;
    for &idx in &rep_indices {
        let (node, pin) = match keys[idx as usize] {
            CandKey::Output(n, _) => (n, None),
            CandKey::Branch(n, i, _) => (n, Some(i)),
        };
        // Both polarities of the same site are always separate DSU
        // classes (they never merge into each other), but we still want
        // exactly one StuckAt0 and one StuckAt1 representative per
        // surviving site; re-derive the value from the key itself.
        let value = match keys[idx as usize] {
            CandKey::Output(_, v) | CandKey::Branch(_, _, v) => v,
        };
        let kind = if value {
            FaultKind::StuckAt1
        } else {
            FaultKind::StuckAt0
        };
        faults.push(Fault {
            id: FaultId(next_id),
            kind,
            node,
            pin,
        });
        next_id += 1;
    }
    faults.sort_by_key(|f| (net.node(f.node).level, f.node, f.pin, f.kind == FaultKind::StuckAt1));
    for (i, f) in faults.iter_mut().enumerate() {
        f.id = FaultId(i as u32);
    }
    faults
}

/// Derive the transition-delay fault set from a representative stuck-at
/// list: each `StuckAt0` site can also be tested as slow-to-rise, each
/// `StuckAt1` site as slow-to-fall, pairing a representative stuck-at
/// with a time-frame-0 activation condition.
pub fn derive_transition_faults(stuck_faults: &[Fault]) -> Vec<Fault> {
    stuck_faults
        .iter()
        .enumerate()
        .map(|(i, f)| Fault {
            id: FaultId(i as u32),
            kind: match f.kind {
                FaultKind::StuckAt0 => FaultKind::TransitionRise,
                FaultKind::StuckAt1 => FaultKind::TransitionFall,
                other => other,
            },
            node: f.node,
            pin: f.pin,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::build::ParsedGate;
    use super::*;

    fn g(name: &str, kind: GateKind, fanin: &[&str]) -> ParsedGate {
        ParsedGate::new(name, kind, fanin.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_and_input_collapses_to_output() {
        // a, b -> and -> o, with `a` a stem (also feeding a second
        // consumer) so a branch fault candidate actually exists.
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("b", GateKind::PrimaryInput, &[]),
            g("y", GateKind::And, &["a", "b"]),
            g("z", GateKind::Buf, &["a"]),
            g("o1", GateKind::PrimaryOutput, &["y"]),
            g("o2", GateKind::PrimaryOutput, &["z"]),
        ];
        let net = Netlist::build(gates).unwrap();
        // `a` SA0 (the controlling value for AND) must have collapsed
        // into `y`'s own output SA0: there must be no surviving fault
        // whose site is the branch (y, pin=0).
        let has_branch_sa0 = net
            .faults()
            .iter()
            .any(|f| f.node == net_node_id(&net, "y") && f.pin == Some(0) && f.kind == FaultKind::StuckAt0);
        assert!(!has_branch_sa0);
    }

    #[test]
    fn test_xor_does_not_collapse() {
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("b", GateKind::PrimaryInput, &[]),
            g("y", GateKind::Xor, &["a", "b"]),
            g("z", GateKind::Buf, &["a"]),
            g("o1", GateKind::PrimaryOutput, &["y"]),
            g("o2", GateKind::PrimaryOutput, &["z"]),
        ];
        let net = Netlist::build(gates).unwrap();
        let n_faults_on_a_branch = net
            .faults()
            .iter()
            .filter(|f| f.node == net_node_id(&net, "y") && f.pin == Some(0))
            .count();
        assert_eq!(n_faults_on_a_branch, 2);
    }

    fn net_node_id(net: &Netlist, name: &str) -> NodeId {
        net.nodes().iter().find(|n| n.name.as_deref() == Some(name)).unwrap().id
    }

    #[test]
    fn test_transition_derivation() {
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("o", GateKind::PrimaryOutput, &["a"]),
        ];
        let net = Netlist::build(gates).unwrap();
        let trans = derive_transition_faults(net.faults());
        assert_eq!(trans.len(), net.faults().len());
        assert!(trans.iter().any(|f| f.kind == FaultKind::TransitionRise));
        assert!(trans.iter().any(|f| f.kind == FaultKind::TransitionFall));
    }
}
