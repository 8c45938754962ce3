// src/cli/args.rs

use clap::{Args, Parser, Subcommand};

use crate::harness::{MAX_LEVELS, parse_bounds};

/// Nested join-loop composer and JIT oracle sweep
#[derive(Parser)]
#[command(name = "joinloop")]
#[command(version = "0.1.0")]
#[command(about = "Nested join-loop composer and JIT oracle sweep", long_about = None)]
pub struct Cli {
    /// Compile without Cranelift's internal verifier (nests are still verified
    /// before compilation)
    #[arg(long, global = true)]
    pub release: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile, run and check every scan/probe combination
    #[command(visible_alias = "s")]
    Sweep {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Echo every recorded tuple to stdout as "a, b, c"
        #[arg(long)]
        emit: bool,

        /// Print each compiled nest's Cranelift IR to stderr
        #[arg(long)]
        dump_ir: bool,

        /// Print each compiled nest's disassembly to stderr
        #[arg(long)]
        disasm: bool,
    },
    /// Print the reference tuples for every combination, in sweep order
    Reference {
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

/// Which nests to enumerate.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Comma-separated scan bounds, one per level, outermost first ("" for no
    /// levels)
    #[arg(
        long,
        value_name = "LIST",
        default_value = "5,3,9",
        value_parser = parse_bounds,
        conflicts_with = "random_levels"
    )]
    // Fully qualified so clap parses one list instead of repeated values
    pub bounds: ::std::vec::Vec<i64>,

    /// Use N levels with random bounds in 0..=6 instead of --bounds
    #[arg(long, value_name = "N", value_parser = parse_levels)]
    pub random_levels: Option<usize>,

    /// Seed for --random-levels
    #[arg(long, default_value_t = 0, requires = "random_levels")]
    pub seed: u64,

    /// Stop after N combinations
    #[arg(short = 'x', long, value_name = "N")]
    pub max_combinations: Option<usize>,
}

fn parse_levels(s: &str) -> Result<usize, String> {
    let levels: usize = s.parse().map_err(|_| format!("invalid level count '{s}'"))?;
    if levels > MAX_LEVELS {
        return Err(format!("at most {MAX_LEVELS} levels are supported, got {levels}"));
    }
    Ok(levels)
}
