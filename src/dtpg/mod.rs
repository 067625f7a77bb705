//! SAT-based test-pattern generation.
//!
//! `dtpg_ffr`/`dtpg_mffc` build the dual-rail CNF once per FFR/MFFC
//! ([`cnf::CnfBuilder::build_shared`]) and cache the live solver
//! instance, so every fault sited within it is solved by toggling only
//! the assumption set — the site's own activation literals, plus (for a
//! branch fault) its own selector literal with every other branch
//! selector in the region pinned false. `dtpg_fault`, used when there
//! is no FFR/MFFC context to share across (direct calls, the
//! transition-fault path), falls back to a fresh per-fault build.

pub mod cnf;
pub mod extractor;
pub mod justifier;

use std::cell::RefCell;
use std::collections::HashMap;

use crate::netlist::{Fault, Ffr, FfrId, Mffc, MffcId, Netlist, NodeId, PpiIndex, TestVector};
use crate::sat::{CadicalBackend, Lit, SatBackend, SatResult};

use cnf::CnfBuilder;
use extractor::Extractor;
use justifier::{JustPolicy, Justifier};

/// The outcome of a single fault's `solve`.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Detected(TestVector),
    /// UNSAT under the chosen model and encoding: the fault is
    /// redundant. Carries a short human-readable proof-obligation
    /// label.
    Untestable(String),
    /// UNKNOWN (timeout/resource limit) or a solver-internal error.
    Undecided(String),
}

impl Verdict {
    /// The coarse class used to compare `dtpg_ffr` and `dtpg_mffc`
    /// verdicts for the same fault.
    pub fn class(&self) -> &'static str {
        match self {
            Verdict::Detected(_) => "Detected",
            Verdict::Untestable(_) => "Untestable",
            Verdict::Undecided(_) => "Undecided",
        }
    }
}

/// A CNF build shared across every fault sited in one FFR or MFFC: a
/// live solver plus the variable maps [`Extractor`] and
/// [`Dtpg::activation_literals`] need to read and drive it.
struct SharedBuild {
    solver: Box<dyn SatBackend>,
    vid: cnf::VidMap,
    cone: cnf::FaultCone,
    prop: Vec<Lit>,
    selectors: cnf::BranchSelectors,
}

pub struct Dtpg<'a> {
    net: &'a Netlist,
    ppi_index: PpiIndex,
    just_policy: JustPolicy,
    ffr_cache: RefCell<HashMap<FfrId, SharedBuild>>,
    mffc_cache: RefCell<HashMap<MffcId, SharedBuild>>,
}

impl<'a> Dtpg<'a> {
    pub fn new(net: &'a Netlist, just_policy: JustPolicy) -> Dtpg<'a> {
        Dtpg {
            net,
            ppi_index: PpiIndex::build(&net.ppis()),
            just_policy,
            ffr_cache: RefCell::new(HashMap::new()),
            mffc_cache: RefCell::new(HashMap::new()),
        }
    }

    /// `dtpg_ffr(ffr, fault) -> Verdict`: FFR-scoped DTPG. The dual-rail
    /// CNF for the whole FFR is built once, the first time any of its
    /// faults is solved, and kept alive for every later fault in the
    /// same FFR; only the assumption set changes between them.
    pub fn dtpg_ffr(&self, ffr: &Ffr, fault: &Fault) -> Verdict {
        debug_assert_eq!(self.net.node_ffr(fault.node), ffr.id);
        if fault.kind.is_transition() {
            return self.dtpg_transition_fault(fault);
        }
        let mut cache = self.ffr_cache.borrow_mut();
        let shared = cache
            .entry(ffr.id)
            .or_insert_with(|| self.build_shared(&ffr.members, ffr.root));
        self.solve_shared(shared, fault)
    }

    /// `dtpg_mffc(mffc, fault) -> Verdict`: MFFC-scoped DTPG, the same
    /// one-build-many-faults sharing as `dtpg_ffr` but over the whole
    /// MFFC's node set (every FFR it absorbed) at once.
    pub fn dtpg_mffc(&self, mffc: &Mffc, fault: &Fault) -> Verdict {
        debug_assert_eq!(self.net.node_mffc(fault.node), mffc.id);
        if fault.kind.is_transition() {
            return self.dtpg_transition_fault(fault);
        }
        let mut cache = self.mffc_cache.borrow_mut();
        let shared = cache
            .entry(mffc.id)
            .or_insert_with(|| self.build_shared(&mffc.nodes, mffc.root));
        self.solve_shared(shared, fault)
    }

    /// Build the shared CNF for one FFR/MFFC's site set, gathering the
    /// region's branch faults from the netlist's full fault list so
    /// [`cnf::CnfBuilder::build_shared`] can give each its own selector.
    fn build_shared(&self, sites: &[NodeId], root: NodeId) -> SharedBuild {
        let site_set: std::collections::HashSet<NodeId> = sites.iter().copied().collect();
        let branch_faults: Vec<Fault> = self
            .net
            .faults()
            .iter()
            .filter(|f| f.pin.is_some() && site_set.contains(&f.node))
            .cloned()
            .collect();
        let mut solver: Box<dyn SatBackend> = Box::new(CadicalBackend::new());
        let builder = CnfBuilder::new(self.net);
        let (vid, cone, prop, selectors) =
            builder.build_shared(solver.as_mut(), sites, root, &branch_faults);
        SharedBuild {
            solver,
            vid,
            cone,
            prop,
            selectors,
        }
    }

    /// Solve one fault against an already-built [`SharedBuild`]: the
    /// fault's own activation literals, plus — since every branch
    /// selector in the region lives in the same CNF — this fault's own
    /// selector (if it has one) assumed true and every other selector
    /// assumed false, so only the intended site can sensitize.
    fn solve_shared(&self, shared: &mut SharedBuild, fault: &Fault) -> Verdict {
        if shared.prop.is_empty() {
            return Verdict::Untestable(
                "fault cone reaches no primary output (zero-PPO boundary case)".to_string(),
            );
        }
        let mut assumptions = self.activation_literals(&shared.vid, fault);
        for (&(node, pin, stuck), &sel) in shared.selectors.iter() {
            let is_this =
                fault.pin == Some(pin) && fault.node == node && fault.kind.stuck_value() == stuck;
            assumptions.push(if is_this { Lit::pos(sel) } else { !Lit::pos(sel) });
        }
        shared.solver.reset_assumptions();
        match shared.solver.solve(&assumptions) {
            SatResult::Unsat => {
                Verdict::Untestable(format!("UNSAT under {} activation", fault.kind))
            }
            SatResult::Unknown => Verdict::Undecided("solver returned UNKNOWN".to_string()),
            SatResult::Sat => {
                let extractor = Extractor::new(self.net);
                let classes = extractor.classify(&shared.cone, &shared.vid, shared.solver.as_ref());
                let mut reqs =
                    extractor.extract(&shared.cone, &shared.vid, shared.solver.as_ref(), &classes);
                if fault.pin.is_none() {
                    reqs.0.push((fault.node, !fault.kind.stuck_value()));
                    reqs.0.sort();
                }
                let justifier = Justifier::new(self.net, &self.ppi_index);
                let tv = justifier.justify(&reqs, self.just_policy);
                Verdict::Detected(tv)
            }
        }
    }

    /// A single fault's solve with no FFR/MFFC to share a CNF build
    /// across: build the dual-rail CNF fresh, assume activation, solve,
    /// and — on SAT — extract and justify a `TestVector`.
    pub fn dtpg_fault(&self, fault: &Fault) -> Verdict {
        if fault.kind.is_transition() {
            return self.dtpg_transition_fault(fault);
        }
        let mut solver = CadicalBackend::new();
        let builder = CnfBuilder::new(self.net);
        let (vid, cone, prop) = builder.build(&mut solver, fault);
        if prop.is_empty() {
            return Verdict::Untestable(
                "fault cone reaches no primary output (zero-PPO boundary case)".to_string(),
            );
        }
        let assumptions = self.activation_literals(&vid, fault);
        match solver.solve(&assumptions) {
            SatResult::Unsat => {
                Verdict::Untestable(format!("UNSAT under {} activation", fault.kind))
            }
            SatResult::Unknown => {
                Verdict::Undecided("solver returned UNKNOWN".to_string())
            }
            SatResult::Sat => {
                let extractor = Extractor::new(self.net);
                let classes = extractor.classify(&cone, &vid, &solver);
                let mut reqs = extractor.extract(&cone, &vid, &solver, &classes);
                if fault.pin.is_none() {
                    // The site itself is part of the sufficient
                    // condition for a node/stem fault (a branch fault's
                    // site is wired as a CNF constant, not a free var).
                    reqs.0.push((fault.node, !fault.kind.stuck_value()));
                    reqs.0.sort();
                }
                let justifier = Justifier::new(self.net, &self.ppi_index);
                let tv = justifier.justify(&reqs, self.just_policy);
                Verdict::Detected(tv)
            }
        }
    }

    /// Two-time-frame solve for `TransitionRise`/`TransitionFall`
    /// faults: a "frame 0" (launch) good-circuit-only view of the whole
    /// netlist, linked to the capture frame's dual-rail cone through
    /// each DFF's `(DffInput, DffOutput)` pair, modeling each DFF as a
    /// (PPO, PPI) pair between time frames, with the launch value
    /// asserted at the fault site in frame 0.
    fn dtpg_transition_fault(&self, fault: &Fault) -> Verdict {
        let mut solver = CadicalBackend::new();
        let builder = CnfBuilder::new(self.net);
        let frame0 = builder.build_full_good(&mut solver);
        let (vid1, cone, prop) = builder.build(&mut solver, fault);
        if prop.is_empty() {
            return Verdict::Untestable(
                "fault cone reaches no primary output (zero-PPO boundary case)".to_string(),
            );
        }
        for &(d_in, d_out) in self.net.dffs() {
            cnf::link_equal(&mut solver, frame0.glit(d_in), vid1.glit(d_out));
        }
        let launch = fault
            .kind
            .launch_value()
            .expect("dtpg_transition_fault only handles transition-delay faults");
        let mut assumptions = vec![if launch {
            frame0.glit(fault.node)
        } else {
            !frame0.glit(fault.node)
        }];
        assumptions.extend(self.activation_literals(&vid1, fault));

        match solver.solve(&assumptions) {
            SatResult::Unsat => {
                Verdict::Untestable(format!("UNSAT under {} activation", fault.kind))
            }
            SatResult::Unknown => Verdict::Undecided("solver returned UNKNOWN".to_string()),
            SatResult::Sat => {
                let extractor = Extractor::new(self.net);
                let classes = extractor.classify(&cone, &vid1, &solver);
                let mut reqs = extractor.extract(&cone, &vid1, &solver, &classes);
                if fault.pin.is_none() {
                    reqs.0.push((fault.node, !fault.kind.stuck_value()));
                    reqs.0.sort();
                }
                let justifier = Justifier::new(self.net, &self.ppi_index);
                let current = justifier.justify(&reqs, self.just_policy);

                let previous: Vec<_> = self
                    .net
                    .ppis()
                    .iter()
                    .map(|&n| {
                        crate::value::Value3::from_bool(solver.value(frame0.gvar(n)).unwrap_or(false))
                    })
                    .collect();
                Verdict::Detected(TestVector::with_previous(current.values().to_vec(), previous))
            }
        }
    }

    /// The fault-activation assumption set: at the site, force
    /// `g != f`. A branch (pin) fault needs no activation assumption of
    /// its own here: a fresh per-fault build (`dtpg_fault`,
    /// `dtpg_transition_fault`) wires its divergence in as a permanent
    /// CNF constant, and a shared build (`solve_shared`) drives it
    /// through its own selector literal instead.
    fn activation_literals(&self, vid: &cnf::VidMap, fault: &Fault) -> Vec<Lit> {
        if fault.pin.is_some() {
            return Vec::new();
        }
        let stuck = fault.kind.stuck_value();
        if stuck {
            vec![!vid.glit(fault.node), vid.flit(fault.node)]
        } else {
            vec![vid.glit(fault.node), !vid.flit(fault.node)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{FaultKind, GateKind, ParsedGate};

    fn g(name: &str, kind: GateKind, fanin: &[&str]) -> ParsedGate {
        ParsedGate::new(name, kind, fanin.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_and_output_sa0_is_detected() {
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("b", GateKind::PrimaryInput, &[]),
            g("y", GateKind::And, &["a", "b"]),
            g("o", GateKind::PrimaryOutput, &["y"]),
        ];
        let net = Netlist::build(gates).unwrap();
        let fault = net
            .faults()
            .iter()
            .find(|f| f.kind == FaultKind::StuckAt0 && f.pin.is_none())
            .unwrap()
            .clone();
        let dtpg = Dtpg::new(&net, JustPolicy::Just1);
        let verdict = dtpg.dtpg_fault(&fault);
        match verdict {
            Verdict::Detected(tv) => {
                // Detecting an AND output SA0 requires driving both
                // inputs to 1.
                assert_eq!(tv.get(0), crate::value::Value3::One);
                assert_eq!(tv.get(1), crate::value::Value3::One);
                let mut fsim = crate::fsim::Fsim::initialize(&net, false, true);
                fsim.set_fault_list(vec![fault.clone()]);
                let detected = fsim.sppfp(&tv);
                assert!(detected.contains(&fault.id), "Detected(tv) must be confirmed by Fsim");
            }
            other => panic!("expected Detected, got {:?}", other),
        }
    }

    #[test]
    fn test_redundant_fault_is_untestable() {
        // `o2`'s SA1 can never be excited: `z` is hardwired to gnd via
        // a constant AND with itself off the critical path? Simplest
        // redundant case: an AND gate fed by the same signal twice,
        // `and1(a, a)`, has no branch fault distinguishing the two
        // pins (both collapse), but feeding a constant gives a clean
        // redundancy: `y = AND(a, const0)` always outputs 0, so `y`
        // stuck-at-1 is untestable.
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("z", GateKind::Const0, &[]),
            g("y", GateKind::And, &["a", "z"]),
            g("o", GateKind::PrimaryOutput, &["y"]),
        ];
        let net = Netlist::build(gates).unwrap();
        let fault = net
            .faults()
            .iter()
            .find(|f| f.kind == FaultKind::StuckAt1 && f.node == {
                net.nodes().iter().find(|n| n.name.as_deref() == Some("y")).unwrap().id
            } && f.pin.is_none())
            .unwrap()
            .clone();
        let dtpg = Dtpg::new(&net, JustPolicy::Just1);
        let verdict = dtpg.dtpg_fault(&fault);
        assert_eq!(verdict.class(), "Untestable");
    }

    #[test]
    fn test_ffr_and_mffc_agree_on_verdict_class() {
        let gates = vec![
            g("a", GateKind::PrimaryInput, &[]),
            g("b", GateKind::PrimaryInput, &[]),
            g("y", GateKind::And, &["a", "b"]),
            g("o", GateKind::PrimaryOutput, &["y"]),
        ];
        let net = Netlist::build(gates).unwrap();
        let fault = net
            .faults()
            .iter()
            .find(|f| f.kind == FaultKind::StuckAt0 && f.pin.is_none())
            .unwrap()
            .clone();
        let dtpg = Dtpg::new(&net, JustPolicy::Just2);
        let ffr = net.ffr(net.node_ffr(fault.node)).clone();
        let mffc = net.mffc(net.node_mffc(fault.node)).clone();
        let v1 = dtpg.dtpg_ffr(&ffr, &fault);
        let v2 = dtpg.dtpg_mffc(&mffc, &fault);
        assert_eq!(v1.class(), v2.class());
    }
}
