use std::time::Instant;

use dieplan::diag::StrResult;
use tracing::info;

use crate::args::LegalfloorCommand;
use crate::load;

/// Execute the `legalfloor` command.
pub fn legalfloor(command: &LegalfloorCommand) -> StrResult<()> {
    let netlist = load::read_netlist(&command.common.netlist)?;
    let die = load::read_die(&command.common.die, &netlist)?;

    let options = dieplan_legalfloor::Options {
        max_ratio: command.max_ratio,
        ..dieplan_legalfloor::Options::default()
    };

    let start = Instant::now();
    let legalized = dieplan_legalfloor::legalfloor(&netlist, &die, &options)?;
    info!(elapsed = ?start.elapsed(), "legalfloor finished");

    if let Some(path) = &command.common.out_netlist {
        load::write(path, &legalized.to_yaml())?;
    }
    Ok(())
}
