//! Netlist statistics: a plain struct built by one pass over `nodes`,
//! with a `Display` impl for the CLI's `Show` subcommand.

use std::collections::HashMap;
use std::fmt;

use super::gate::GateKind;
use super::Netlist;

/// Aggregate counters over a [`Netlist`], computed on demand (never
/// cached, since it is only ever needed by diagnostics/CLI code).
#[derive(Clone, Debug, Default)]
pub struct NetlistStats {
    pub nb_nodes: usize,
    pub nb_inputs: usize,
    pub nb_outputs: usize,
    pub nb_dffs: usize,
    pub nb_ppis: usize,
    pub nb_ppos: usize,
    pub nb_ffrs: usize,
    pub nb_mffcs: usize,
    pub nb_faults: usize,
    pub max_level: u32,
    pub gate_counts: HashMap<GateKind, usize>,
}

pub(super) fn compute(net: &Netlist) -> NetlistStats {
    let mut gate_counts: HashMap<GateKind, usize> = HashMap::new();
    let mut max_level = 0;
    for node in net.nodes() {
        *gate_counts.entry(node.kind).or_insert(0) += 1;
        max_level = max_level.max(node.level);
    }
    NetlistStats {
        nb_nodes: net.nb_nodes(),
        nb_inputs: net.inputs().len(),
        nb_outputs: net.outputs().len(),
        nb_dffs: net.dffs().len(),
        nb_ppis: net.ppis().len(),
        nb_ppos: net.ppos().len(),
        nb_ffrs: net.ffrs().len(),
        nb_mffcs: net.mffcs().len(),
        nb_faults: net.faults().len(),
        max_level,
        gate_counts,
    }
}

impl fmt::Display for NetlistStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Nodes:   {}", self.nb_nodes)?;
        writeln!(f, "Inputs:  {}", self.nb_inputs)?;
        writeln!(f, "Outputs: {}", self.nb_outputs)?;
        writeln!(f, "DFFs:    {}", self.nb_dffs)?;
        writeln!(f, "PPIs:    {}", self.nb_ppis)?;
        writeln!(f, "PPOs:    {}", self.nb_ppos)?;
        writeln!(f, "FFRs:    {}", self.nb_ffrs)?;
        writeln!(f, "MFFCs:   {}", self.nb_mffcs)?;
        writeln!(f, "Faults:  {}", self.nb_faults)?;
        writeln!(f, "Levels:  {}", self.max_level)?;
        let mut kinds: Vec<_> = self.gate_counts.iter().collect();
        kinds.sort_by_key(|(k, _)| format!("{}", k));
        for (kind, count) in kinds {
            writeln!(f, "  {:10}: {}", kind.to_string(), count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::build::ParsedGate;
    use super::*;
    use crate::netlist::Netlist;

    #[test]
    fn test_stats_basic() {
        let gates = vec![
            ParsedGate::new("a", GateKind::PrimaryInput, vec![]),
            ParsedGate::new("b", GateKind::PrimaryInput, vec![]),
            ParsedGate::new("y", GateKind::And, vec!["a".into(), "b".into()]),
            ParsedGate::new("o", GateKind::PrimaryOutput, vec!["y".into()]),
        ];
        let net = Netlist::build(gates).unwrap();
        let stats = net.stats();
        assert_eq!(stats.nb_nodes, 4);
        assert_eq!(stats.nb_inputs, 2);
        assert_eq!(stats.nb_outputs, 1);
        assert_eq!(*stats.gate_counts.get(&GateKind::And).unwrap(), 1);
    }
}
