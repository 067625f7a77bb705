//! Random test-pattern generation (RTPG): a cheap pre-pass filling PPIs
//! with uniform random bits, before the more expensive SAT-based
//! `Dtpg` is invoked on whatever the random fill leaves undetected.
//!
//! `SmallRng::seed_from_u64` plus per-bit `rng.gen()`, PPI-indexed into
//! [`TestVector`]s: generate a batch, simulate it with
//! [`crate::fsim::Fsim`], drop whatever it already detects from the
//! fault list, repeat.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::fsim::Fsim;
use crate::netlist::{FaultId, Netlist, TestVector};
use crate::value::Value3;

/// Uniform-random PPI fill, one draw per call; callers generate a batch
/// by calling this in a loop with a single shared [`SmallRng`].
fn random_vector(net: &Netlist, rng: &mut SmallRng) -> TestVector {
    let n = net.ppis().len();
    let values: Vec<Value3> = (0..n)
        .map(|_| Value3::from_bool(rng.gen()))
        .collect();
    TestVector::from_values(values)
}

/// Aggregate outcome of an [`Rtpg`] run: the patterns generated and the
/// faults each newly detected, in generation order.
pub struct RtpgReport {
    pub patterns: Vec<TestVector>,
    /// Faults detected by `patterns[i]` that no earlier pattern in this
    /// run had already detected.
    pub newly_detected: Vec<Vec<FaultId>>,
}

/// Drives [`Fsim::sppfp`] over `nb_patterns` uniformly random vectors,
/// seeded deterministically from `seed`. No global state: the RNG lives
/// only for the duration of one `run` call.
pub struct Rtpg<'a> {
    net: &'a Netlist,
    rng: SmallRng,
}

impl<'a> Rtpg<'a> {
    pub fn new(net: &'a Netlist, seed: u64) -> Rtpg<'a> {
        Rtpg {
            net,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Generate `nb_patterns` random vectors and simulate each against
    /// `fsim`'s currently registered fault list, skipping already-
    /// detected faults as `fsim.set_skip` marks them after each pattern:
    /// a fault already detected need not keep being simulated.
    pub fn run(&mut self, fsim: &mut Fsim, nb_patterns: usize) -> RtpgReport {
        let mut patterns = Vec::with_capacity(nb_patterns);
        let mut newly_detected = Vec::with_capacity(nb_patterns);
        for _ in 0..nb_patterns {
            let tv = random_vector(self.net, &mut self.rng);
            let detected = fsim.sppfp(&tv);
            for &fid in &detected {
                fsim.set_skip(fid, true);
            }
            patterns.push(tv);
            newly_detected.push(detected);
        }
        RtpgReport {
            patterns,
            newly_detected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{FaultKind, GateKind, Netlist, ParsedGate};

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
    fn test_deterministic_with_same_seed() {
        let net = and_net();
        let mut rtpg1 = Rtpg::new(&net, 42);
        let mut fsim1 = Fsim::initialize(&net, false, true);
        fsim1.set_fault_list(net.faults().to_vec());
        let report1 = rtpg1.run(&mut fsim1, 8);

        let mut rtpg2 = Rtpg::new(&net, 42);
        let mut fsim2 = Fsim::initialize(&net, false, true);
        fsim2.set_fault_list(net.faults().to_vec());
        let report2 = rtpg2.run(&mut fsim2, 8);

        for (a, b) in report1.patterns.iter().zip(report2.patterns.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_eventually_detects_and_output_fault() {
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
            .find(|f| f.node == y && f.kind == FaultKind::StuckAt0)
            .unwrap()
            .clone();
        let mut fsim = Fsim::initialize(&net, false, true);
        fsim.set_fault_list(vec![fault.clone()]);
        let mut rtpg = Rtpg::new(&net, 7);
        let report = rtpg.run(&mut fsim, 64);
        let found = report.newly_detected.iter().any(|d| d.contains(&fault.id));
        assert!(found, "64 random AND-input patterns should hit SA0 on the output at least once");
    }
}
