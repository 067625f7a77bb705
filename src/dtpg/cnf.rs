//! Dual-rail CNF encoder: a good-circuit view over the full transitive
//! fanin of a fault cone, and a faulty-circuit view restricted to the
//! cone itself, joined at the fault site by forcing a divergence and
//! requiring it to reach some cone-internal PPO.
//!
//! Standard Tseitin encoding per [`GateKind`], duplicated into a
//! good/faulty pair over one shared CNF build per fault cone so every
//! fault sited within it can be solved by toggling only the assumption
//! set. [`CnfBuilder::build`] builds one fault's own cone;
//! [`CnfBuilder::build_shared`] builds the union cone of an entire
//! FFR or MFFC once, wiring every branch fault's override behind its
//! own selector variable so the whole site set shares one CNF and is
//! told apart only by which literals `Dtpg` assumes.

use std::collections::{HashMap, HashSet};

use crate::netlist::{Fault, GateKind, Netlist, NodeId};
use crate::sat::{Lit, SatBackend, Var};

/// Maps netlist nodes to SAT variables, separately for the good-circuit
/// ("g") and faulty-circuit ("f") views. A node outside the fault cone
/// has only a "g" entry: no divergence can occur downstream of a node
/// the fault never reaches, so it needs no faulty-circuit variable of
/// its own.
#[derive(Clone, Debug, Default)]
pub struct VidMap {
    g: HashMap<NodeId, Var>,
    f: HashMap<NodeId, Var>,
}

impl VidMap {
    pub fn gvar(&self, n: NodeId) -> Var {
        self.g[&n]
    }

    pub fn fvar(&self, n: NodeId) -> Var {
        *self.f.get(&n).unwrap_or(&self.g[&n])
    }

    pub fn glit(&self, n: NodeId) -> Lit {
        Lit::pos(self.gvar(n))
    }

    pub fn flit(&self, n: NodeId) -> Lit {
        Lit::pos(self.fvar(n))
    }

    pub fn has_fvar(&self, n: NodeId) -> bool {
        self.f.contains_key(&n)
    }
}

/// The cone a single CNF build serves: every node whose faulty value
/// can differ from its good value (the fault's transitive fanout), plus
/// the literal that activates the divergence at the fault's own site.
pub struct FaultCone {
    pub nodes: Vec<NodeId>,
    /// `d[n]` for every node in `nodes`, in the same order: true when
    /// the SAT model has `g[n] != f[n]`.
    pub diff: HashMap<NodeId, Var>,
}

/// One selector variable per `(node, pin, stuck_value)` branch fault
/// folded into a [`CnfBuilder::build_shared`] build. Assuming the
/// selector true overrides that pin to `stuck_value` in the faulty
/// view; assuming it false (the default `Dtpg` asserts for every
/// selector but the one fault under test) falls through to the
/// driver's own faulty-view value, exactly as if the override were not
/// there at all.
#[derive(Clone, Debug, Default)]
pub struct BranchSelectors {
    sel: HashMap<(NodeId, usize, bool), Var>,
}

impl BranchSelectors {
    pub fn get(&self, node: NodeId, pin: usize, stuck: bool) -> Option<Var> {
        self.sel.get(&(node, pin, stuck)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(NodeId, usize, bool), &Var)> {
        self.sel.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.sel.is_empty()
    }
}

/// Builds the dual-rail CNF for one fault cone into `solver`, returning
/// the variable maps and difference literals a [`super::extractor::Extractor`]
/// needs to read the model back.
pub struct CnfBuilder<'a> {
    net: &'a Netlist,
}

impl<'a> CnfBuilder<'a> {
    pub fn new(net: &'a Netlist) -> CnfBuilder<'a> {
        CnfBuilder { net }
    }

    /// Build the dual-rail CNF for `fault`'s propagation cone
    /// (`net.transitive_fanout(fault.node)`) into `solver`. Returns the
    /// variable maps and the fault's own
    /// activation literal pair (forced-good, forced-faulty) at its
    /// site, plus the propagation clause
    /// `∨_{o ∈ PPO ∩ cone} d[o]`.
    pub fn build(
        &self,
        solver: &mut dyn SatBackend,
        fault: &Fault,
    ) -> (VidMap, FaultCone, Vec<Lit>) {
        let cone = self.net.transitive_fanout(fault.node);
        // The good-circuit view must reach every PPI that feeds the
        // cone, not just the fault site itself: recompute support as
        // the union of the transitive fanin of every cone member.
        let mut support_set: std::collections::HashSet<NodeId> = std::collections::HashSet::new();
        for &n in &cone {
            for u in self.net.transitive_fanin(n) {
                support_set.insert(u);
            }
        }
        let mut support: Vec<NodeId> = support_set.into_iter().collect();
        support.sort_by_key(|n| self.net.node(*n).level);

        let mut vid = VidMap::default();
        for &n in &support {
            vid.g.insert(n, solver.new_var());
        }
        for &n in &cone {
            vid.f.insert(n, solver.new_var());
        }

        // Good-circuit view: every node in `support` (which contains
        // `cone` too, since cone nodes feed themselves trivially).
        for &n in &support {
            self.emit_gate(solver, &vid, n, false, None);
        }
        // Faulty-circuit view: only the cone. The fault's own branch
        // (if it is a branch/pin fault rather than a node/stem fault)
        // is wired in here as a fixed constant at the one consuming
        // pin it sites on, per `emit_gate`'s `branch_override`.
        for &n in &cone {
            let branch_override = if n == fault.node {
                fault.pin.map(|pin| (pin, fault.kind.stuck_value()))
            } else {
                None
            };
            self.emit_gate(solver, &vid, n, true, branch_override);
        }

        // Difference-activation literal per cone node.
        let mut diff = HashMap::new();
        for &n in &cone {
            let d = solver.new_var();
            emit_xor2(solver, vid.glit(n), vid.flit(n), Lit::pos(d));
            diff.insert(n, d);
        }

        let ppos = self.net.ppos();
        let prop_clause: Vec<Lit> = cone
            .iter()
            .filter(|n| ppos.contains(n))
            .map(|n| Lit::pos(diff[n]))
            .collect();
        if !prop_clause.is_empty() {
            solver.add_clause(&prop_clause);
        }

        (
            vid,
            FaultCone {
                nodes: cone,
                diff,
            },
            prop_clause,
        )
    }

    /// Build good-circuit-only clauses for *every* node in the netlist
    /// (no fault, no faulty view). Used as the "frame 0" (launch) view
    /// when justifying a transition fault's two-time-frame requirement:
    /// `Dtpg` links this view's `DffInput` values to the capture
    /// frame's `DffOutput` variables via [`link_equal`].
    pub fn build_full_good(&self, solver: &mut dyn SatBackend) -> VidMap {
        let mut vid = VidMap::default();
        for node in self.net.nodes() {
            vid.g.insert(node.id, solver.new_var());
        }
        for node in self.net.nodes() {
            self.emit_gate(solver, &vid, node.id, false, None);
        }
        vid
    }

    /// Build the dual-rail CNF once for an entire FFR or MFFC, so every
    /// fault sited at any of `sites` (an FFR's `members` or an MFFC's
    /// `nodes`) can be solved later by toggling assumptions alone. The
    /// union cone is `sites` itself plus `root`'s own transitive
    /// fanout: every site's individual propagation cone is already a
    /// subset of that (each site reaches `root` via the single-fanout
    /// chain the region is built from, then continues through `root`'s
    /// own downstream fanout).
    ///
    /// `branch_faults` are the branch (pin) faults sited on any node in
    /// `sites`; each gets its own selector variable (see
    /// [`BranchSelectors`]) instead of the permanent constant
    /// [`CnfBuilder::build`] wires in for a single fault, so the same
    /// CNF serves every branch fault in the set too.
    pub fn build_shared(
        &self,
        solver: &mut dyn SatBackend,
        sites: &[NodeId],
        root: NodeId,
        branch_faults: &[Fault],
    ) -> (VidMap, FaultCone, Vec<Lit>, BranchSelectors) {
        let mut cone_set: HashSet<NodeId> = sites.iter().copied().collect();
        cone_set.extend(self.net.transitive_fanout(root));
        let mut cone: Vec<NodeId> = cone_set.iter().copied().collect();
        cone.sort_by_key(|n| self.net.node(*n).level);

        let mut support_set: HashSet<NodeId> = HashSet::new();
        for &n in &cone {
            for u in self.net.transitive_fanin(n) {
                support_set.insert(u);
            }
        }
        let mut support: Vec<NodeId> = support_set.into_iter().collect();
        support.sort_by_key(|n| self.net.node(*n).level);

        let mut vid = VidMap::default();
        for &n in &support {
            vid.g.insert(n, solver.new_var());
        }
        for &n in &cone {
            vid.f.insert(n, solver.new_var());
        }

        let mut selectors = BranchSelectors::default();
        for bf in branch_faults {
            if let Some(pin) = bf.pin {
                if cone_set.contains(&bf.node) {
                    let var = solver.new_var();
                    selectors
                        .sel
                        .insert((bf.node, pin, bf.kind.stuck_value()), var);
                }
            }
        }

        for &n in &support {
            self.emit_gate_shared(solver, &vid, &selectors, n, false);
        }
        for &n in &cone {
            self.emit_gate_shared(solver, &vid, &selectors, n, true);
        }

        let mut diff = HashMap::new();
        for &n in &cone {
            let d = solver.new_var();
            emit_xor2(solver, vid.glit(n), vid.flit(n), Lit::pos(d));
            diff.insert(n, d);
        }

        let ppos = self.net.ppos();
        let prop_clause: Vec<Lit> = cone
            .iter()
            .filter(|n| ppos.contains(n))
            .map(|n| Lit::pos(diff[n]))
            .collect();
        if !prop_clause.is_empty() {
            solver.add_clause(&prop_clause);
        }

        (vid, FaultCone { nodes: cone, diff }, prop_clause, selectors)
    }

    /// Like [`CnfBuilder::emit_gate`], but a branch fault's override is
    /// wired as a multiplexer keyed on its [`BranchSelectors`] variable
    /// rather than a permanent constant: `Dtpg` picks which fault (if
    /// any) is "live" per solve by which selector it assumes true.
    fn emit_gate_shared(
        &self,
        solver: &mut dyn SatBackend,
        vid: &VidMap,
        selectors: &BranchSelectors,
        n: NodeId,
        faulty: bool,
    ) {
        let node = self.net.node(n);
        if node.kind.is_source() {
            match node.kind {
                GateKind::Const0 => {
                    solver.add_clause(&[!lit_of(vid, n, faulty)]);
                }
                GateKind::Const1 => {
                    solver.add_clause(&[lit_of(vid, n, faulty)]);
                }
                _ => {}
            }
            return;
        }
        let fanin: Vec<Lit> = node
            .fanin
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let normal = lit_of(vid, f, faulty);
                if !faulty {
                    return normal;
                }
                let mut acc = normal;
                for stuck in [false, true] {
                    if let Some(sel) = selectors.get(n, i, stuck) {
                        let out = solver.new_var();
                        emit_mux(solver, Lit::pos(sel), Lit::constant(stuck), acc, Lit::pos(out));
                        acc = Lit::pos(out);
                    }
                }
                acc
            })
            .collect();
        let out = lit_of(vid, n, faulty);
        match node.kind {
            GateKind::Buf | GateKind::PrimaryOutput | GateKind::DffInput => {
                emit_buf(solver, fanin[0], out);
            }
            GateKind::Not => emit_buf(solver, fanin[0], !out),
            GateKind::And => emit_and(solver, &fanin, out),
            GateKind::Nand => emit_and(solver, &fanin, !out),
            GateKind::Or => emit_or(solver, &fanin, out),
            GateKind::Nor => emit_or(solver, &fanin, !out),
            GateKind::Xor => emit_xor_chain(solver, &fanin, out),
            GateKind::Xnor => emit_xor_chain(solver, &fanin, !out),
            GateKind::PrimaryInput | GateKind::DffOutput | GateKind::Const0 | GateKind::Const1 => {
                unreachable!()
            }
        }
    }

    /// Emit Tseitin clauses for `n`'s gate function into either the
    /// good (`faulty = false`) or faulty (`faulty = true`) view.
    /// `branch_override`, only ever `Some` in the faulty view and only
    /// for the one node a branch (pin) fault sites on, forces that
    /// single fanin pin to a constant instead of reading the driver's
    /// faulty-view variable — the CNF counterpart of the simulator's
    /// `eval_gate_with_pin_forced` branch injection.
    fn emit_gate(
        &self,
        solver: &mut dyn SatBackend,
        vid: &VidMap,
        n: NodeId,
        faulty: bool,
        branch_override: Option<(usize, bool)>,
    ) {
        let node = self.net.node(n);
        if node.kind.is_source() {
            match node.kind {
                GateKind::Const0 => {
                    solver.add_clause(&[!lit_of(vid, n, faulty)]);
                }
                GateKind::Const1 => {
                    solver.add_clause(&[lit_of(vid, n, faulty)]);
                }
                _ => {}
            }
            return;
        }
        let fanin: Vec<Lit> = node
            .fanin
            .iter()
            .enumerate()
            .map(|(i, &f)| match branch_override {
                Some((pin, stuck)) if pin == i => Lit::constant(stuck),
                _ => lit_of(vid, f, faulty),
            })
            .collect();
        let out = lit_of(vid, n, faulty);
        match node.kind {
            GateKind::Buf | GateKind::PrimaryOutput | GateKind::DffInput => {
                emit_buf(solver, fanin[0], out);
            }
            GateKind::Not => emit_buf(solver, fanin[0], !out),
            GateKind::And => emit_and(solver, &fanin, out),
            GateKind::Nand => emit_and(solver, &fanin, !out),
            GateKind::Or => emit_or(solver, &fanin, out),
            GateKind::Nor => emit_or(solver, &fanin, !out),
            GateKind::Xor => emit_xor_chain(solver, &fanin, out),
            GateKind::Xnor => emit_xor_chain(solver, &fanin, !out),
            GateKind::PrimaryInput | GateKind::DffOutput | GateKind::Const0 | GateKind::Const1 => {
                unreachable!()
            }
        }
    }
}

fn lit_of(vid: &VidMap, n: NodeId, faulty: bool) -> Lit {
    if faulty {
        vid.flit(n)
    } else {
        vid.glit(n)
    }
}

/// `out <-> in`.
fn emit_buf(solver: &mut dyn SatBackend, inp: Lit, out: Lit) {
    solver.add_clause(&[!out, inp]);
    solver.add_clause(&[out, !inp]);
}

/// Assert `a <-> b` between two literals from otherwise independent CNF
/// builds (`Dtpg`'s frame-0/frame-1 DFF linking).
pub fn link_equal(solver: &mut dyn SatBackend, a: Lit, b: Lit) {
    emit_buf(solver, a, b);
}

/// `out <-> (sel AND if_true) OR (!sel AND if_false)`: the standard
/// 4-clause multiplexer encoding, used to fold a branch fault's
/// override behind a selector variable instead of a permanent constant.
fn emit_mux(solver: &mut dyn SatBackend, sel: Lit, if_true: Lit, if_false: Lit, out: Lit) {
    solver.add_clause(&[!sel, !if_true, out]);
    solver.add_clause(&[!sel, if_true, !out]);
    solver.add_clause(&[sel, !if_false, out]);
    solver.add_clause(&[sel, if_false, !out]);
}

/// `out <-> x1 XOR x2`: the standard 4-clause Tseitin encoding of a
/// binary XOR.
fn emit_xor2(solver: &mut dyn SatBackend, a: Lit, b: Lit, out: Lit) {
    solver.add_clause(&[a, b, !out]);
    solver.add_clause(&[!a, !b, !out]);
    solver.add_clause(&[!a, b, out]);
    solver.add_clause(&[a, !b, out]);
}

/// `out <-> AND(inputs)`: `out -> xi` for each input, plus one
/// backward clause `(!x1 | ... | !xn | out)`.
fn emit_and(solver: &mut dyn SatBackend, inputs: &[Lit], out: Lit) {
    for &x in inputs {
        solver.add_clause(&[!out, x]);
    }
    let mut backward: Vec<Lit> = inputs.iter().map(|&x| !x).collect();
    backward.push(out);
    solver.add_clause(&backward);
}

/// `out <-> OR(inputs)`: `xi -> out` for each input, plus one backward
/// clause `(!out | x1 | ... | xn)`.
fn emit_or(solver: &mut dyn SatBackend, inputs: &[Lit], out: Lit) {
    for &x in inputs {
        solver.add_clause(&[!x, out]);
    }
    let mut backward: Vec<Lit> = vec![!out];
    backward.extend(inputs.iter().copied());
    solver.add_clause(&backward);
}

/// `out <-> x1 XOR x2 XOR ... XOR xn`, built as a chain of binary XORs
/// through fresh auxiliary variables so the clause count stays linear
/// in `n` (a full parity expansion is exponential in `n`).
fn emit_xor_chain(solver: &mut dyn SatBackend, inputs: &[Lit], out: Lit) {
    debug_assert!(inputs.len() >= 2);
    if inputs.len() == 2 {
        emit_xor2(solver, inputs[0], inputs[1], out);
        return;
    }
    let mut acc = inputs[0];
    for &x in &inputs[1..inputs.len() - 1] {
        let t = solver.new_var();
        emit_xor2(solver, acc, x, Lit::pos(t));
        acc = Lit::pos(t);
    }
    emit_xor2(solver, acc, inputs[inputs.len() - 1], out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{FaultKind, GateKind as GK, ParsedGate};
    use crate::sat::CadicalBackend;

    fn g(name: &str, kind: GK, fanin: &[&str]) -> ParsedGate {
        ParsedGate::new(name, kind, fanin.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_build_runs_without_panicking() {
        let gates = vec![
            g("a", GK::PrimaryInput, &[]),
            g("b", GK::PrimaryInput, &[]),
            g("y", GK::And, &["a", "b"]),
            g("o", GK::PrimaryOutput, &["y"]),
        ];
        let net = Netlist::build(gates).unwrap();
        let fault = net
            .faults()
            .iter()
            .find(|f| f.kind == FaultKind::StuckAt0 && f.pin.is_none())
            .unwrap()
            .clone();
        let mut solver = CadicalBackend::new();
        let builder = CnfBuilder::new(&net);
        let (vid, cone, prop) = builder.build(&mut solver, &fault);
        assert!(vid.has_fvar(fault.node) || !cone.nodes.is_empty());
        assert!(!prop.is_empty());
    }
}
