//! Command line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kdam::tqdm;

use crate::config::Config;
use crate::dtpg::justifier::JustPolicy;
use crate::dtpg::{Dtpg, Verdict};
use crate::fsim::Fsim;
use crate::io::{read_netlist_file, write_netlist_file};
use crate::netlist::{FaultId, Netlist, TestVector};
use crate::rtpg::Rtpg;
use crate::untest::{UntestOp, UopBase, UopSkip};
use crate::value::Value3;
use crate::verify::Verifier;

/// Command line arguments.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Command line arguments.
#[derive(Subcommand)]
pub enum Commands {
    /// Show statistics about a gate-level netlist
    ///
    /// Prints the node/input/output/DFF/FFR/MFFC/fault counts computed
    /// at construction time.
    #[clap()]
    Show(ShowArgs),

    /// Simulate a netlist over a list of test vectors
    ///
    /// Reads one pattern per line (one character per PPI, in
    /// `Netlist::ppis` order: `0`/`1`/`x`) and writes the corresponding
    /// PPO values, in the same format.
    #[clap(alias = "sim")]
    Simulate(SimulateArgs),

    /// Generate test patterns for all stuck-at (or transition-delay)
    /// faults
    ///
    /// Runs an optional random pre-pass (`Rtpg`), then SAT-based `Dtpg`
    /// FFR by FFR for whatever faults remain undetected.
    #[clap()]
    Atpg(AtpgArgs),

    /// Verify that a set of test vectors detects the faults claimed for
    /// them
    ///
    /// Re-simulates every (fault, vector) pair through a fresh `Fsim`
    /// and reports any the original claim could not be confirmed for.
    #[clap()]
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct ShowArgs {
    /// Netlist file (.bench or .blif)
    file: PathBuf,
}

impl ShowArgs {
    pub fn run(&self) {
        let net = read_netlist_file(&self.file).expect("failed to read netlist");
        println!("{}", net.stats());
    }
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Netlist file (.bench or .blif)
    network: PathBuf,

    /// Input pattern file, one vector per line
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Output file for the simulated PPO values
    #[arg(short = 'o', long)]
    output: PathBuf,
}

impl SimulateArgs {
    pub fn run(&self) {
        let net = read_netlist_file(&self.network).expect("failed to read netlist");
        let patterns = read_vector_file(&self.input, net.ppis().len());
        let mut fsim = Fsim::initialize(&net, false, true);
        let mut lines = Vec::with_capacity(patterns.len());
        for tv in &patterns {
            fsim.reset(tv);
            let line: String = fsim.ppo_values().into_iter().map(value_char).collect();
            lines.push(line);
        }
        std::fs::write(&self.output, lines.join("\n") + "\n").expect("failed to write output");
    }
}

fn value_char(v: Value3) -> char {
    match v {
        Value3::Zero => '0',
        Value3::One => '1',
        Value3::X => 'x',
    }
}

fn parse_value_char(c: char) -> Value3 {
    match c {
        '0' => Value3::Zero,
        '1' => Value3::One,
        _ => Value3::X,
    }
}

fn read_vector_file(path: &PathBuf, n_ppis: usize) -> Vec<TestVector> {
    let text = std::fs::read_to_string(path).expect("failed to read pattern file");
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            let values: Vec<Value3> = l.trim().chars().map(parse_value_char).collect();
            assert_eq!(values.len(), n_ppis, "pattern line has the wrong width");
            TestVector::from_values(values)
        })
        .collect()
}

#[derive(Args)]
pub struct AtpgArgs {
    /// Netlist file to generate test patterns for
    network: PathBuf,

    /// Output file for the generated test patterns
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Fault model: "stuck-at" or "transition-delay"
    #[arg(long, default_value = "stuck-at")]
    fault_type: String,

    /// CNF scope: "ffr" or "mffc"
    #[arg(long, default_value = "ffr")]
    dtpg_type: String,

    /// Back-trace policy: "just1" or "just2"
    #[arg(long, default_value = "just1")]
    just_type: String,

    /// Random seed for the Rtpg pre-pass
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of random patterns to try before falling back to SAT
    #[arg(short = 'r', long, default_value_t = 32)]
    num_random: usize,

    /// Skip additional faults at the same site once one is proven
    /// untestable (the `skip` UntestOp policy); `base` otherwise
    #[arg(long)]
    skip_dominated: bool,
}

impl AtpgArgs {
    pub fn run(&self) {
        let net = read_netlist_file(&self.network).expect("failed to read netlist");
        let just_policy = match self.just_type.as_str() {
            "just2" => JustPolicy::Just2,
            _ => JustPolicy::Just1,
        };
        let is_transition = self.fault_type == "transition-delay";
        let stuck_faults = net.faults().to_vec();
        let faults = if is_transition {
            crate::netlist::derive_transition_faults(&stuck_faults)
        } else {
            stuck_faults
        };

        let mut fsim = Fsim::initialize(&net, is_transition, true);
        fsim.set_fault_list(faults.clone());

        let mut rtpg = Rtpg::new(&net, self.seed);
        let report = rtpg.run(&mut fsim, self.num_random);
        let mut patterns: Vec<TestVector> = Vec::new();
        let mut detected: std::collections::HashSet<FaultId> = std::collections::HashSet::new();
        for (tv, newly) in report.patterns.into_iter().zip(report.newly_detected) {
            if !newly.is_empty() {
                patterns.push(tv);
                detected.extend(newly);
            }
        }
        log::info!(
            "Rtpg pre-pass detected {}/{} faults with {} random patterns",
            detected.len(),
            faults.len(),
            self.num_random
        );

        let dtpg = Dtpg::new(&net, just_policy);
        let use_mffc = self.dtpg_type == "mffc";
        let mut untest_op: Box<dyn UntestOp> = if self.skip_dominated {
            Box::new(UopSkip::new(1))
        } else {
            Box::new(UopBase::new())
        };
        let mut skipped: std::collections::HashSet<FaultId> = std::collections::HashSet::new();

        for fault in tqdm!(faults.iter(), desc = "dtpg") {
            if detected.contains(&fault.id) || skipped.contains(&fault.id) {
                continue;
            }
            let verdict = if use_mffc {
                let mffc = net.mffc(net.node_mffc(fault.node)).clone();
                dtpg.dtpg_mffc(&mffc, fault)
            } else {
                let ffr = net.ffr(net.node_ffr(fault.node)).clone();
                dtpg.dtpg_ffr(&ffr, fault)
            };
            match verdict {
                Verdict::Detected(tv) => {
                    detected.insert(fault.id);
                    patterns.push(tv);
                }
                Verdict::Untestable(reason) => {
                    log::debug!("fault {} untestable: {}", fault, reason);
                    for extra in untest_op.on_untestable(&net, fault) {
                        skipped.insert(extra);
                    }
                }
                Verdict::Undecided(reason) => {
                    log::warn!("fault {} undecided: {}", fault, reason);
                }
            }
        }

        log::info!(
            "generated {} patterns detecting {}/{} faults ({} untestable, {} skipped)",
            patterns.len(),
            detected.len(),
            faults.len(),
            untest_op.recorded().len(),
            skipped.len(),
        );

        let lines: Vec<String> = patterns
            .iter()
            .map(|tv| tv.values().iter().map(|&v| value_char(v)).collect::<String>())
            .collect();
        std::fs::write(&self.output, lines.join("\n") + "\n").expect("failed to write output");
    }
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Netlist file
    network: PathBuf,

    /// Test pattern file to verify (one vector per line, PPI order)
    #[arg(short = 'i', long)]
    input: PathBuf,
}

impl VerifyArgs {
    pub fn run(&self) {
        let net = read_netlist_file(&self.network).expect("failed to read netlist");
        let patterns = read_vector_file(&self.input, net.ppis().len());
        let mut verifier = Verifier::new(&net, false, true);
        let faults = net.faults().to_vec();
        let unconfirmed = verifier.check(&faults, &patterns);
        if unconfirmed.is_empty() {
            println!("All {} faults detected by the {} supplied patterns", faults.len(), patterns.len());
        } else {
            println!(
                "{}/{} faults are NOT detected by the supplied patterns",
                unconfirmed.len(),
                faults.len()
            );
            std::process::exit(1);
        }
    }
}

/// Build a [`Config`] from a JSON file path, falling back to defaults
/// when no path is given. Exposed for `main` (unused directly by any
/// subcommand above, which take their knobs straight from the CLI
/// flags, but kept as the entry point a future `--config` flag would
/// call).
#[allow(dead_code)]
pub fn load_config(path: Option<&PathBuf>) -> Config {
    match path {
        Some(p) => Config::from_json_file(p).expect("failed to parse config file"),
        None => Config::default(),
    }
}

pub fn write_netlist(path: &PathBuf, net: &Netlist) {
    write_netlist_file(path, net).expect("failed to write netlist");
}
