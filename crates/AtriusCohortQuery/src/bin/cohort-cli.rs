//! Cohort query CLI executable
//!
//! Translates a structured query into the FHIRPath filters of a `count()`
//! aggregation, using a mapping table and an optional concept tree.
//!
//! See the cli module documentation for detailed usage information.

use atrius_cohort_query::cli::{Args, run_cli};
use clap::Parser;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    run_cli(args)?;
    Ok(())
}
