//! Binary for the ATPG engine.

mod cmd;

pub mod config;
pub mod dtpg;
pub mod error;
pub mod fsim;
pub mod io;
pub mod netlist;
pub mod rtpg;
pub mod sat;
pub mod untest;
pub mod value;
pub mod verify;

use clap::Parser;

#[doc(hidden)]
fn main() {
    env_logger::init();
    let cli = cmd::Cli::parse();

    match cli.command {
        cmd::Commands::Show(a) => a.run(),
        cmd::Commands::Simulate(a) => a.run(),
        cmd::Commands::Atpg(a) => a.run(),
        cmd::Commands::Verify(a) => a.run(),
    }
}
