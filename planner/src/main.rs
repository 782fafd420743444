/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the M3 layout planner.

--*/

use anyhow::Context;
use clap::Parser;
use m3_planner::{PlanSummary, PlannerArgs, SystemPlan, Topology};
use std::fs::File;
use std::io::BufWriter;
use std::process::exit;

fn main() -> anyhow::Result<()> {
    let cli = PlannerArgs::parse();
    simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init()?;

    // A misconfigured system must never reach the simulator.
    let plan = match plan(&cli) {
        Ok(plan) => plan,
        Err(err) => {
            log::error!("{}", err);
            exit(1);
        }
    };

    print!(
        "{}",
        PlanSummary::new(&plan, &cli.cpu_type.to_string(), &cli.mem_type)
    );

    if let Some(path) = &cli.output {
        let file = File::create(path)
            .with_context(|| format!("Unable to create file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &plan)
            .with_context(|| format!("Unable to write plan to {}", path.display()))?;
        log::info!("Wrote plan to {}", path.display());
    }
    Ok(())
}

fn plan(cli: &PlannerArgs) -> m3_planner::PlanResult<SystemPlan> {
    let topology = Topology::parse_file(&cli.topology)?;
    log::info!(
        "Loaded {} PEs from {}",
        topology.len(),
        cli.topology.display()
    );
    SystemPlan::build(
        cli.memory_map()?,
        &topology.tiles,
        cli.num_fs,
        cli.sim_params(),
    )
}
