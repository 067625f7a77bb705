//! Justifier: back-traces a [`NodeValList`] of internal required
//! assignments into a PPI-only [`TestVector`].
//!
//! Two back-trace policies, `just1` and `just2`; ties among equal-cost
//! candidate fanin break on ascending `NodeId`, a deterministic and
//! traceable default.

use std::collections::HashMap;

use crate::netlist::{GateKind, Netlist, NodeId, PpiIndex, TestVector};
use crate::value::Value3;

use super::extractor::NodeValList;

/// Which back-trace policy `Dtpg` uses to turn a [`NodeValList`] into a
/// full PPI assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JustPolicy {
    /// Greedy per-node back-trace, one requirement at a time, with no
    /// memoization across requirements.
    Just1,
    /// Level-sorted back-trace: process requirements in descending
    /// level order, reusing already-resolved values so two
    /// requirements that share fanin are not re-derived.
    Just2,
}

impl JustPolicy {
    pub fn parse(s: &str) -> Option<JustPolicy> {
        match s {
            "just1" => Some(JustPolicy::Just1),
            "just2" => Some(JustPolicy::Just2),
            _ => None,
        }
    }
}

pub struct Justifier<'a> {
    net: &'a Netlist,
    ppi_index: &'a PpiIndex,
}

impl<'a> Justifier<'a> {
    pub fn new(net: &'a Netlist, ppi_index: &'a PpiIndex) -> Justifier<'a> {
        Justifier { net, ppi_index }
    }

    /// Back-trace `reqs` into a `TestVector`, X everywhere the
    /// sufficient condition leaves free.
    pub fn justify(&self, reqs: &NodeValList, policy: JustPolicy) -> TestVector {
        let mut resolved: HashMap<NodeId, bool> = HashMap::new();
        match policy {
            JustPolicy::Just1 => {
                for &(n, v) in &reqs.0 {
                    self.backtrace_one(n, v, &mut resolved);
                }
            }
            JustPolicy::Just2 => {
                let mut worklist: Vec<(NodeId, bool)> = reqs.0.clone();
                loop {
                    worklist.sort_by(|a, b| {
                        let la = self.net.node(a.0).level;
                        let lb = self.net.node(b.0).level;
                        lb.cmp(&la).then(a.0.cmp(&b.0))
                    });
                    let Some(&(n, v)) = worklist.iter().find(|&&(n, _)| !resolved.contains_key(&n))
                    else {
                        break;
                    };
                    let new_reqs = self.backtrace_step(n, v, &mut resolved);
                    worklist.extend(new_reqs);
                }
            }
        }

        let mut values = vec![Value3::X; self.ppi_index.len()];
        for (&n, &v) in &resolved {
            if let Some(pos) = self.ppi_index.position(n) {
                values[pos] = Value3::from_bool(v);
            }
        }
        TestVector::from_values(values)
    }

    /// `just1`: fully recursive back-trace of one requirement, with a
    /// fresh `resolved` lookup shared only within this one call tree
    /// (earlier requirements' resolutions are still visible and reused,
    /// matching "per-node back-trace" rather than "per-requirement
    /// isolated back-trace").
    fn backtrace_one(&self, n: NodeId, v: bool, resolved: &mut HashMap<NodeId, bool>) {
        if let Some(&existing) = resolved.get(&n) {
            debug_assert_eq!(existing, v, "conflicting requirement on {}", n);
            return;
        }
        resolved.insert(n, v);
        if self.ppi_index.position(n).is_some() {
            return;
        }
        for (fin, fv) in self.choose_fanin_assignment(n, v) {
            self.backtrace_one(fin, fv, resolved);
        }
    }

    /// `just2`: resolve one requirement without recursing, returning the
    /// fresh child requirements it generates so the caller's worklist
    /// can re-sort them by level before continuing.
    fn backtrace_step(&self, n: NodeId, v: bool, resolved: &mut HashMap<NodeId, bool>) -> Vec<(NodeId, bool)> {
        resolved.insert(n, v);
        if self.ppi_index.position(n).is_some() {
            return Vec::new();
        }
        self.choose_fanin_assignment(n, v)
            .into_iter()
            .filter(|&(fin, _)| !resolved.contains_key(&fin))
            .collect()
    }

    /// Given that node `n` must evaluate to `v`, pick the fanin
    /// assignment that realizes it. Controlling-value gates (And/Nand/
    /// Or/Nor) need only one input driven to the controlling value when
    /// `v` is the controlled output, and need every input at the
    /// non-controlling value when `v` is the uncontrolled output;
    /// Xor/Xnor and Buf/Not always need every input resolved. Ties
    /// (equal-cost candidate inputs) break on ascending `NodeId`.
    fn choose_fanin_assignment(&self, n: NodeId, v: bool) -> Vec<(NodeId, bool)> {
        let node = self.net.node(n);
        match node.kind {
            GateKind::PrimaryInput | GateKind::DffOutput | GateKind::Const0 | GateKind::Const1 => {
                Vec::new()
            }
            GateKind::Buf | GateKind::PrimaryOutput | GateKind::DffInput => vec![(node.fanin[0], v)],
            GateKind::Not => vec![(node.fanin[0], !v)],
            GateKind::And | GateKind::Nand => {
                let out = if node.kind == GateKind::Nand { !v } else { v };
                self.controlling_or_all(node.fanin.clone(), out, false)
            }
            GateKind::Or | GateKind::Nor => {
                let out = if node.kind == GateKind::Nor { !v } else { v };
                self.controlling_or_all(node.fanin.clone(), out, true)
            }
            GateKind::Xor | GateKind::Xnor => {
                // Any fanin assignment whose parity matches is valid;
                // picking all-but-the-last fanin at a fixed value (here
                // `false`) and solving the last for the required parity
                // is deterministic and cheap.
                let want = if node.kind == GateKind::Xnor { !v } else { v };
                let mut fanin = node.fanin.clone();
                fanin.sort();
                let mut out: Vec<(NodeId, bool)> =
                    fanin[..fanin.len() - 1].iter().map(|&fin| (fin, false)).collect();
                let last = *fanin.last().unwrap();
                out.push((last, want));
                out
            }
        }
    }

    /// `controlling`: the gate's controlling value (the one where a
    /// single input at that value determines `And`/`Or`'s output).
    /// `want_controlled`: whether the gate's required output equals its
    /// *controlled* value (`false` for And, `true` for Or). When it
    /// does, the cheapest realization drives the lowest-id fanin to
    /// `controlling` and leaves the rest free; otherwise every fanin
    /// must be driven to the non-controlling value.
    fn controlling_or_all(&self, mut fanin: Vec<NodeId>, want_controlled: bool, controlling: bool) -> Vec<(NodeId, bool)> {
        fanin.sort();
        if want_controlled == controlling {
            vec![(fanin[0], controlling)]
        } else {
            fanin.into_iter().map(|f| (f, !controlling)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::ParsedGate;

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
    fn test_just1_and_output_one_requires_both_inputs() {
        let net = and_net();
        let y = net.nodes().iter().find(|n| n.name.as_deref() == Some("y")).unwrap().id;
        let ppis = net.ppis();
        let idx = PpiIndex::build(&ppis);
        let justifier = Justifier::new(&net, &idx);
        let reqs = NodeValList(vec![(y, true)]);
        let tv = justifier.justify(&reqs, JustPolicy::Just1);
        assert_eq!(tv.get(0), Value3::One);
        assert_eq!(tv.get(1), Value3::One);
    }

    #[test]
    fn test_just1_and_output_zero_requires_one_input() {
        let net = and_net();
        let y = net.nodes().iter().find(|n| n.name.as_deref() == Some("y")).unwrap().id;
        let ppis = net.ppis();
        let idx = PpiIndex::build(&ppis);
        let justifier = Justifier::new(&net, &idx);
        let reqs = NodeValList(vec![(y, false)]);
        let tv = justifier.justify(&reqs, JustPolicy::Just1);
        // Only the lowest-id fanin (a) is forced; b stays X.
        assert_eq!(tv.get(0), Value3::Zero);
        assert_eq!(tv.get(1), Value3::X);
    }

    #[test]
    fn test_just2_matches_just1_on_same_input() {
        let net = and_net();
        let y = net.nodes().iter().find(|n| n.name.as_deref() == Some("y")).unwrap().id;
        let ppis = net.ppis();
        let idx = PpiIndex::build(&ppis);
        let justifier = Justifier::new(&net, &idx);
        let reqs = NodeValList(vec![(y, true)]);
        let tv1 = justifier.justify(&reqs, JustPolicy::Just1);
        let tv2 = justifier.justify(&reqs, JustPolicy::Just2);
        assert_eq!(tv1, tv2);
    }
}
