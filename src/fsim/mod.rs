//! Bit-parallel fault simulator.
//!
//! Reset/inject/drain/restore shape: run a full combinational sweep
//! once, then for each fault touch only the nodes downstream of its
//! site and undo exactly those touches before moving to the next one.
//! Three axes beyond plain combinational gate simulation: three-valued
//! (X) lanes, pseudo-I/O framing for sequential designs, and the
//! two-frame launch/capture view transition-delay faults require.

mod event_queue;
mod kernels;

use std::collections::HashMap;

use crate::netlist::{Fault, FaultId, GateKind, Netlist, NodeId, PpiIndex, TestVector};
use crate::value::{PackedValue, Value3, Word, LANES};

use event_queue::EventQueue;

/// Whether a lane may hold `X`. `Val2` is a performance mode for
/// designs (or passes) known never to need it; both use the same
/// kernels, so the distinction exists for callers, not for `Fsim`
/// itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimMode {
    Val2,
    Val3,
}

fn broadcast(v: Value3) -> PackedValue {
    match v {
        Value3::Zero => PackedValue::all_zero(),
        Value3::One => PackedValue::all_one(),
        Value3::X => PackedValue::all_x(),
    }
}

/// Select between `base` and `forced` lane-by-lane according to `mask`
/// (1 = take `forced`), on both value planes at once.
fn masked_select(base: PackedValue, forced: PackedValue, mask: Word) -> PackedValue {
    PackedValue {
        val0: (base.val0 & !mask) | (forced.val0 & mask),
        val1: (base.val1 & !mask) | (forced.val1 & mask),
    }
}

/// Lanes where `v` is firmly (not X) equal to `want`.
fn firmly(v: PackedValue, want: bool) -> Word {
    if want {
        v.val1 & !v.val0
    } else {
        v.val0 & !v.val1
    }
}

pub struct Fsim<'a> {
    net: &'a Netlist,
    mode: SimMode,
    has_previous_state: bool,
    ppis: Vec<NodeId>,
    ppos: Vec<NodeId>,
    ppi_index: PpiIndex,
    ppo_index: PpiIndex,
    /// Values after the combinational sweep of the first ("launch")
    /// frame, when a previous-state vector was supplied. Used only to
    /// decide whether a transition fault's activation condition holds.
    launch: Vec<PackedValue>,
    /// Fault-free values at the end of the most recent reset, one per
    /// node. Compared against during drain to find the differing PPOs.
    good: Vec<PackedValue>,
    /// Working values, mutated by fault injection/propagation and
    /// restored from `value_log` at the end of each fault's pass.
    cur: Vec<PackedValue>,
    queue: EventQueue,
    value_log: Vec<(NodeId, PackedValue)>,
    faults: Vec<Fault>,
    skipped: std::collections::HashSet<FaultId>,
    /// Per-PPO detection bits from the most recent `sppfp` call, keyed
    /// by fault, for `sppfp_diffbits`.
    last_ppo_diff: HashMap<FaultId, Word>,
}

impl<'a> Fsim<'a> {
    /// Allocate per-node packed value storage and the level-indexed
    /// event queue. `has_x` selects [`SimMode::Val3`]; `has_previous_state`
    /// enables the launch-frame bookkeeping transition faults need.
    pub fn initialize(net: &'a Netlist, has_previous_state: bool, has_x: bool) -> Fsim<'a> {
        let nb = net.nb_nodes();
        let mut cur = vec![PackedValue::all_x(); nb];
        for node in net.nodes() {
            match node.kind {
                GateKind::Const0 => cur[node.id.index()] = PackedValue::all_zero(),
                GateKind::Const1 => cur[node.id.index()] = PackedValue::all_one(),
                _ => {}
            }
        }
        let ppis = net.ppis();
        let ppos = net.ppos();
        let ppi_index = PpiIndex::build(&ppis);
        let ppo_index = PpiIndex::build(&ppos);
        let max_level = net.nodes().iter().map(|n| n.level).max().unwrap_or(0);
        Fsim {
            net,
            mode: if has_x { SimMode::Val3 } else { SimMode::Val2 },
            has_previous_state,
            ppis,
            ppos,
            ppi_index,
            ppo_index,
            launch: cur.clone(),
            good: cur.clone(),
            cur,
            queue: EventQueue::new(nb, max_level as usize),
            value_log: Vec::new(),
            faults: Vec::new(),
            skipped: std::collections::HashSet::new(),
            last_ppo_diff: HashMap::new(),
        }
    }

    pub fn mode(&self) -> SimMode {
        self.mode
    }

    /// The good-circuit value at every PPO, in `Netlist::ppos` order, as
    /// of the most recent [`Fsim::reset`]. Lane 0 only: a plain
    /// (non-fault, non-batch) simulation result.
    pub fn ppo_values(&self) -> Vec<Value3> {
        self.ppos.iter().map(|&o| self.good[o.index()].lane(0)).collect()
    }

    pub fn set_fault_list(&mut self, faults: Vec<Fault>) {
        self.faults = faults;
        self.skipped.clear();
        self.last_ppo_diff.clear();
    }

    pub fn set_skip(&mut self, fault: FaultId, skip: bool) {
        if skip {
            self.skipped.insert(fault);
        } else {
            self.skipped.remove(&fault);
        }
    }

    fn load_ppis(&mut self, values: &[Value3]) {
        for (pos, &nid) in self.ppis.iter().enumerate() {
            self.cur[nid.index()] = broadcast(values[pos]);
        }
    }

    fn load_ppis_batch(&mut self, tv_list: &[TestVector]) {
        for (pos, &nid) in self.ppis.iter().enumerate() {
            let mut packed = PackedValue::all_x();
            for (lane, tv) in tv_list.iter().enumerate() {
                packed.set_lane(lane, tv.get(pos));
            }
            self.cur[nid.index()] = packed;
        }
    }

    /// One pass over every node in id order, which is always a valid
    /// topological order (`Netlist` assigns ids that way). Source kinds
    /// keep whatever `load_ppis*`/`initialize` already put there.
    fn sweep(&mut self) {
        for node in self.net.nodes() {
            if node.kind.is_source() {
                continue;
            }
            let fanin: Vec<PackedValue> = node
                .fanin
                .iter()
                .map(|f| self.cur[f.index()])
                .collect();
            self.cur[node.id.index()] = kernels::eval_gate(node.kind, &fanin);
        }
    }

    /// Reset protocol step 1 for a single `TestVector`: load its launch
    /// frame (if any and if this `Fsim` tracks previous state), then its
    /// current frame, capturing `good` at the end.
    pub fn reset(&mut self, tv: &TestVector) {
        if self.has_previous_state {
            if let Some(prev) = tv.previous() {
                self.load_ppis(prev);
                self.sweep();
                self.launch.copy_from_slice(&self.cur);
            }
        }
        self.load_ppis(tv.values());
        self.sweep();
        self.good.copy_from_slice(&self.cur);
    }

    /// Reset protocol step 1 for up to [`LANES`] patterns at once.
    /// Previous-state tracking is not supported in batch mode: transition
    /// faults are simulated through `sppfp` one pattern at a time.
    fn reset_batch(&mut self, tv_list: &[TestVector]) {
        self.load_ppis_batch(tv_list);
        self.sweep();
        self.good.copy_from_slice(&self.cur);
    }

    fn force(&mut self, node: NodeId, v: PackedValue) {
        let idx = node.index();
        let old = self.cur[idx];
        if old != v {
            self.value_log.push((node, old));
            self.cur[idx] = v;
        }
    }

    fn enqueue_fanout(&mut self, node: NodeId) {
        let net = self.net;
        for &u in &net.node(node).fanout {
            self.queue.put(u, net.node(u).level);
        }
    }

    /// Activation mask for `fault`: all lanes for a stuck-at fault, or
    /// the lanes whose launch-frame value at the site firmly matches the
    /// required launch value for a transition fault (zero everywhere if
    /// this `Fsim` has no launch frame loaded at all).
    fn activation_mask(&self, fault: &Fault) -> Word {
        match fault.kind.launch_value() {
            None => !0u64,
            Some(_) if !self.has_previous_state => 0,
            Some(want) => firmly(self.launch[fault.node.index()], want),
        }
    }

    /// Apply protocol step 2's "apply F's flip mask at its site, enqueue
    /// that site": site and branch faults both resolve to a new value at
    /// `fault.node`, masked by [`activation_mask`] so transition faults
    /// only take effect in lanes whose launch value matches.
    ///
    /// A fault sited directly at a PPO (a `PrimaryOutput` or `DffInput`
    /// node, which has no fanout to enqueue) can only be observed at the
    /// site itself, so its own diff against `good` is returned here
    /// rather than relying on `drain` to find it downstream.
    fn inject(&mut self, fault: &Fault) -> Option<(usize, Word)> {
        let mask = self.activation_mask(fault);
        let stuck = if fault.kind.stuck_value() {
            PackedValue::all_one()
        } else {
            PackedValue::all_zero()
        };
        let base = self.cur[fault.node.index()];
        let raw = match fault.pin {
            None => stuck,
            Some(pin) => {
                let node = self.net.node(fault.node);
                let fanin: Vec<PackedValue> =
                    node.fanin.iter().map(|f| self.cur[f.index()]).collect();
                kernels::eval_gate_with_pin_forced(node.kind, &fanin, pin, stuck)
            }
        };
        let forced = masked_select(base, raw, mask);
        self.force(fault.node, forced);
        self.enqueue_fanout(fault.node);
        self.ppo_index.position(fault.node).map(|pos| {
            let d = forced.diff_mask(&self.good[fault.node.index()]);
            (pos, d)
        })
    }

    /// Drain the event queue, recomputing each popped node and
    /// propagating further only when its value actually changed.
    /// Accumulates per-PPO difference bits (against `good`) into
    /// `ppo_diff`, indexed by `ppo_index`, and returns their union.
    fn drain(&mut self, ppo_diff: &mut [Word]) -> Word {
        let net = self.net;
        let mut any = 0u64;
        while let Some(n) = self.queue.get() {
            let node = net.node(n);
            let fanin: Vec<PackedValue> = node.fanin.iter().map(|f| self.cur[f.index()]).collect();
            let newval = kernels::eval_gate(node.kind, &fanin);
            let old = self.cur[n.index()];
            if newval != old {
                self.value_log.push((n, old));
                self.cur[n.index()] = newval;
                if let Some(pos) = self.ppo_index.position(n) {
                    let d = newval.diff_mask(&self.good[n.index()]);
                    ppo_diff[pos] |= d;
                    any |= d;
                }
                for &u in &node.fanout {
                    self.queue.put(u, net.node(u).level);
                }
            }
        }
        any
    }

    fn restore(&mut self) {
        while let Some((n, v)) = self.value_log.pop() {
            self.cur[n.index()] = v;
        }
    }

    /// Single-pattern, single-fault-at-a-time: for one `TestVector`,
    /// returns the registered, non-skipped faults it detects.
    pub fn sppfp(&mut self, tv: &TestVector) -> Vec<FaultId> {
        self.reset(tv);
        let mut detected = Vec::new();
        let mut ppo_diff = vec![0u64; self.ppos.len()];
        for i in 0..self.faults.len() {
            let fid = self.faults[i].id;
            if self.skipped.contains(&fid) {
                continue;
            }
            for d in ppo_diff.iter_mut() {
                *d = 0;
            }
            let fault = self.faults[i].clone();
            let site = self.inject(&fault);
            let mut any = self.drain(&mut ppo_diff);
            if let Some((pos, d)) = site {
                ppo_diff[pos] |= d;
                any |= d;
            }
            self.restore();
            let mut word = 0u64;
            for (pos, &d) in ppo_diff.iter().enumerate() {
                debug_assert!(pos < LANES, "sppfp_diffbits needs nb_ppos <= {}", LANES);
                if d & 1 != 0 && pos < LANES {
                    word |= 1 << pos;
                }
            }
            self.last_ppo_diff.insert(fid, word);
            if any & 1 != 0 {
                detected.push(fid);
            }
        }
        detected
    }

    /// After `sppfp`, the bitmask over PPOs (position = `Netlist::ppos`
    /// index) of which outputs differed for `fault`. Requires at most
    /// [`LANES`] PPOs, mirroring the simulator's own lane width.
    pub fn sppfp_diffbits(&self, fault: FaultId) -> Word {
        self.last_ppo_diff.get(&fault).copied().unwrap_or(0)
    }

    /// Parallel-pattern, single-fault-propagation: loads up to `LANES`
    /// patterns per pass, then for each registered, non-skipped fault
    /// injects it and propagates once for the whole batch, invoking `cb`
    /// for every (pattern, fault) pair where any PPO differed. `cb`
    /// returning false stops the per-lane callback loop for that fault,
    /// not the propagation itself (which already happened for every lane
    /// at once).
    pub fn ppsfp(
        &mut self,
        tv_list: &[TestVector],
        mut cb: impl FnMut(usize, &TestVector, &Fault) -> bool,
    ) {
        let mut base = 0usize;
        for batch in tv_list.chunks(LANES) {
            self.reset_batch(batch);
            let mut ppo_diff = vec![0u64; self.ppos.len()];
            for i in 0..self.faults.len() {
                let fid = self.faults[i].id;
                if self.skipped.contains(&fid) {
                    continue;
                }
                for d in ppo_diff.iter_mut() {
                    *d = 0;
                }
                let fault = self.faults[i].clone();
                let site = self.inject(&fault);
                let mut any = self.drain(&mut ppo_diff);
                if let Some((pos, d)) = site {
                    ppo_diff[pos] |= d;
                    any |= d;
                }
                self.restore();
                if any == 0 {
                    continue;
                }
                for lane in 0..batch.len() {
                    if (any >> lane) & 1 != 0 {
                        if !cb(base + lane, &batch[lane], &fault) {
                            break;
                        }
                    }
                }
            }
            base += batch.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{GateKind, ParsedGate};

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
    fn test_good_circuit_sweep() {
        let net = and_net();
        let mut fsim = Fsim::initialize(&net, false, true);
        let tv = TestVector::from_values(vec![Value3::One, Value3::One]);
        fsim.reset(&tv);
        let o = net.ppos()[0];
        assert_eq!(fsim.good[o.index()], PackedValue::all_one());
    }

    #[test]
    fn test_sppfp_detects_output_sa0() {
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
            .find(|f| f.node == y && f.kind == crate::netlist::FaultKind::StuckAt0)
            .unwrap()
            .clone();
        let mut fsim = Fsim::initialize(&net, false, true);
        fsim.set_fault_list(vec![fault.clone()]);
        let tv = TestVector::from_values(vec![Value3::One, Value3::One]);
        let detected = fsim.sppfp(&tv);
        assert_eq!(detected, vec![fault.id]);
    }

    #[test]
    fn test_sppfp_misses_when_not_activated() {
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
            .find(|f| f.node == y && f.kind == crate::netlist::FaultKind::StuckAt0)
            .unwrap()
            .clone();
        let mut fsim = Fsim::initialize(&net, false, true);
        fsim.set_fault_list(vec![fault]);
        // a=0 already drives y=0 in the good circuit: SA0 is undetectable here.
        let tv = TestVector::from_values(vec![Value3::Zero, Value3::One]);
        let detected = fsim.sppfp(&tv);
        assert!(detected.is_empty());
    }

    #[test]
    fn test_ppsfp_matches_sppfp() {
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
            .find(|f| f.node == y && f.kind == crate::netlist::FaultKind::StuckAt0)
            .unwrap()
            .clone();

        let patterns = vec![
            TestVector::from_values(vec![Value3::One, Value3::One]),
            TestVector::from_values(vec![Value3::Zero, Value3::One]),
            TestVector::from_values(vec![Value3::One, Value3::Zero]),
        ];

        let mut fsim = Fsim::initialize(&net, false, true);
        fsim.set_fault_list(vec![fault.clone()]);
        let mut detected_patterns = Vec::new();
        fsim.ppsfp(&patterns, |i, _tv, f| {
            assert_eq!(f.id, fault.id);
            detected_patterns.push(i);
            true
        });
        assert_eq!(detected_patterns, vec![0]);

        for (i, tv) in patterns.iter().enumerate() {
            let mut fsim2 = Fsim::initialize(&net, false, true);
            fsim2.set_fault_list(vec![fault.clone()]);
            let detected = fsim2.sppfp(tv);
            assert_eq!(!detected.is_empty(), detected_patterns.contains(&i));
        }
    }

    fn find(net: &Netlist, name: &str) -> NodeId {
        net.nodes()
            .iter()
            .find(|n| n.name.as_deref() == Some(name))
            .unwrap()
            .id
    }

    #[test]
    fn test_branch_fault_isolated_to_one_edge() {
        // a stem feeding two consumers: a branch fault on one edge must
        // not disturb the other consumer's view of the stem's value.
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("b", GateKind::PrimaryInput, &[]),
            g("c", GateKind::PrimaryInput, &[]),
            g("s", GateKind::And, &["a", "b"]),
            g("y1", GateKind::And, &["s", "c"]),
            g("y2", GateKind::Not, &["s"]),
            g("o1", GateKind::PrimaryOutput, &["y1"]),
            g("o2", GateKind::PrimaryOutput, &["y2"]),
        ];
        let net = Netlist::build(gates).unwrap();
        let y1 = find(&net, "y1");
        let branch_fault = net
            .faults()
            .iter()
            .find(|f| f.node == y1 && f.pin == Some(0))
            .cloned();
        let Some(fault) = branch_fault else {
            return;
        };
        let mut fsim = Fsim::initialize(&net, false, true);
        fsim.set_fault_list(vec![fault.clone()]);
        let tv = TestVector::from_values(vec![Value3::One, Value3::One, Value3::One]);
        fsim.sppfp(&tv);
        let diff = fsim.sppfp_diffbits(fault.id);
        let o1_pos = net.ppos().iter().position(|&n| n == find(&net, "o1")).unwrap();
        let o2_pos = net.ppos().iter().position(|&n| n == find(&net, "o2")).unwrap();
        assert_ne!(diff & (1 << o1_pos), 0);
        // o2 is driven straight from the stem's own output, untouched by a branch fault.
        assert_eq!(diff & (1 << o2_pos), 0);
    }
}
