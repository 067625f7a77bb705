//! Netlist construction from a flat, unordered gate list.
//!
//! Dense id vectors, a single validation pass, a dedicated topological
//! sort, building the flat [`super::GateKind`] representation and
//! additionally computing the fanout adjacency and per-node level up
//! front rather than recomputing them on demand.

use std::collections::HashMap;

use crate::error::{AtpgError, Result};

use super::gate::GateKind;
use super::node::{Node, NodeId};
use super::Netlist;

/// A single gate as read off an input file, before ids have been
/// assigned. Fanin is expressed by name; `io::bench`/`io::blif` build a
/// `Vec<ParsedGate>` and hand it to [`Netlist::build`].
#[derive(Clone, Debug)]
pub struct ParsedGate {
    pub name: String,
    pub kind: GateKind,
    pub fanin: Vec<String>,
    /// Register name pairing a `DffInput`/`DffOutput` together. Required
    /// for those two kinds (and only those), `None` otherwise. Pairing
    /// is by this field, not by `name`: a DFF's D-pin and Q-pin are
    /// different signals with their own names.
    pub reg: Option<String>,
}

impl ParsedGate {
    pub fn new(name: impl Into<String>, kind: GateKind, fanin: Vec<String>) -> ParsedGate {
        ParsedGate {
            name: name.into(),
            kind,
            fanin,
            reg: None,
        }
    }

    pub fn new_dff(
        name: impl Into<String>,
        kind: GateKind,
        fanin: Vec<String>,
        reg: impl Into<String>,
    ) -> ParsedGate {
        ParsedGate {
            name: name.into(),
            kind,
            fanin,
            reg: Some(reg.into()),
        }
    }
}

impl Netlist {
    /// Build a netlist from a flat list of named gates. Every name used
    /// in a fanin list must appear exactly once as some gate's `name`.
    pub fn build(gates: Vec<ParsedGate>) -> Result<Netlist> {
        let mut name_to_index: HashMap<String, usize> = HashMap::new();
        for (i, g) in gates.iter().enumerate() {
            if name_to_index.insert(g.name.clone(), i).is_some() {
                return Err(AtpgError::NetlistInvalid(format!(
                    "duplicate gate name '{}'",
                    g.name
                )));
            }
        }

        let n = gates.len();
        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(n);
        for g in &gates {
            let mut d = Vec::with_capacity(g.fanin.len());
            for fi in &g.fanin {
                let idx = *name_to_index.get(fi).ok_or_else(|| {
                    AtpgError::NetlistInvalid(format!(
                        "gate '{}' references undefined signal '{}'",
                        g.name, fi
                    ))
                })?;
                d.push(idx);
            }
            if d.len() < g.kind.min_arity() {
                return Err(AtpgError::NetlistInvalid(format!(
                    "gate '{}' ({}) has {} fanin, needs at least {}",
                    g.name,
                    g.kind,
                    d.len(),
                    g.kind.min_arity()
                )));
            }
            if (g.kind == GateKind::DffInput || g.kind == GateKind::DffOutput) && g.reg.is_none() {
                return Err(AtpgError::NetlistInvalid(format!(
                    "DFF pin '{}' has no register name",
                    g.name
                )));
            }
            deps.push(d);
        }

        // Kahn's algorithm: sources (zero-dependency gates) first, each gate becomes ready
        // once all of its fanin has been assigned an id. Sorting the
        // newly-ready batch keeps construction deterministic.
        let mut indeg: Vec<usize> = deps.iter().map(|d| d.len()).collect();
        let mut users: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, d) in deps.iter().enumerate() {
            for &dep in d {
                users[dep].push(i);
            }
        }
        let mut ready: Vec<usize> = (0..n).filter(|&i| indeg[i] == 0).collect();
        ready.sort_unstable();
        let mut order = Vec::with_capacity(n);
        let mut queue_pos = 0;
        while queue_pos < ready.len() {
            let i = ready[queue_pos];
            queue_pos += 1;
            order.push(i);
            let mut newly_ready = Vec::new();
            for &u in &users[i] {
                indeg[u] -= 1;
                if indeg[u] == 0 {
                    newly_ready.push(u);
                }
            }
            newly_ready.sort_unstable();
            ready.extend(newly_ready);
        }
        if order.len() != n {
            return Err(AtpgError::NetlistInvalid(
                "netlist contains a combinational cycle outside a declared DFF".to_string(),
            ));
        }

        let mut old_to_new = vec![0u32; n];
        for (new_id, &old_id) in order.iter().enumerate() {
            old_to_new[old_id] = new_id as u32;
        }

        let mut nodes: Vec<Node> = Vec::with_capacity(n);
        for &old_id in &order {
            let g = &gates[old_id];
            let fanin: Vec<NodeId> = deps[old_id]
                .iter()
                .map(|&d| NodeId(old_to_new[d]))
                .collect();
            let level = fanin
                .iter()
                .map(|f| nodes[f.index()].level + 1)
                .max()
                .unwrap_or(0);
            nodes.push(Node {
                id: NodeId(old_to_new[old_id]),
                kind: g.kind,
                fanin,
                fanout: Vec::new(),
                level,
                name: Some(g.name.clone()),
                reg: g.reg.clone(),
            });
        }

        for i in 0..nodes.len() {
            let fanin = nodes[i].fanin.clone();
            for f in fanin {
                nodes[f.index()].fanout.push(NodeId(i as u32));
            }
        }

        let inputs: Vec<NodeId> = nodes
            .iter()
            .filter(|n| n.kind == GateKind::PrimaryInput)
            .map(|n| n.id)
            .collect();
        let outputs: Vec<NodeId> = nodes
            .iter()
            .filter(|n| n.kind == GateKind::PrimaryOutput)
            .map(|n| n.id)
            .collect();

        let mut dff_in_by_reg: HashMap<String, NodeId> = HashMap::new();
        let mut dff_out_by_reg: HashMap<String, NodeId> = HashMap::new();
        for node in &nodes {
            if node.kind == GateKind::DffInput {
                let reg = node.reg.clone().unwrap();
                if dff_in_by_reg.insert(reg.clone(), node.id).is_some() {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "register '{}' has more than one DFF input",
                        reg
                    )));
                }
            } else if node.kind == GateKind::DffOutput {
                let reg = node.reg.clone().unwrap();
                if dff_out_by_reg.insert(reg.clone(), node.id).is_some() {
                    return Err(AtpgError::NetlistInvalid(format!(
                        "register '{}' has more than one DFF output",
                        reg
                    )));
                }
            }
        }
        let mut dffs = Vec::new();
        for (reg, &d_in) in &dff_in_by_reg {
            let d_out = *dff_out_by_reg.get(reg).ok_or_else(|| {
                AtpgError::NetlistInvalid(format!("register '{}' has no DFF output", reg))
            })?;
            dffs.push((d_in, d_out));
        }
        for reg in dff_out_by_reg.keys() {
            if !dff_in_by_reg.contains_key(reg) {
                return Err(AtpgError::NetlistInvalid(format!(
                    "register '{}' has no DFF input",
                    reg
                )));
            }
        }
        dffs.sort();

        Netlist::from_parts(nodes, inputs, outputs, dffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(name: &str, kind: GateKind, fanin: &[&str]) -> ParsedGate {
        ParsedGate::new(name, kind, fanin.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_build_simple_comb() {
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("b", GateKind::PrimaryInput, &[]),
            g("o", GateKind::PrimaryOutput, &["y"]),
            g("y", GateKind::And, &["a", "b"]),
        ];
        let net = Netlist::build(gates).unwrap();
        assert_eq!(net.inputs().len(), 2);
        assert_eq!(net.outputs().len(), 1);
        let and_id = net
            .nodes()
            .iter()
            .find(|n| n.kind == GateKind::And)
            .unwrap()
            .id;
        assert_eq!(net.node(and_id).level, 1);
    }

    #[test]
    fn test_build_detects_cycle() {
        let gates = vec![g("a", GateKind::Buf, &["b"]), g("b", GateKind::Buf, &["a"])];
        assert!(Netlist::build(gates).is_err());
    }

    #[test]
    fn test_build_detects_dangling_ref() {
        let gates = vec![g("o", GateKind::PrimaryOutput, &["missing"])];
        assert!(Netlist::build(gates).is_err());
    }

    #[test]
    fn test_build_with_dff() {
        let gates = vec![
            g("clk_in", GateKind::PrimaryInput, &[]),
            ParsedGate::new_dff("q", GateKind::DffOutput, vec![], "r0"),
            ParsedGate::new_dff("d", GateKind::DffInput, vec!["clk_in".to_string()], "r0"),
        ];
        let net = Netlist::build(gates).unwrap();
        assert_eq!(net.dffs().len(), 1);
    }

    #[test]
    fn test_build_detects_unpaired_dff() {
        let gates = vec![ParsedGate::new_dff("q", GateKind::DffOutput, vec![], "r0")];
        assert!(Netlist::build(gates).is_err());
    }
}
