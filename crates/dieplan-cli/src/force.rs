use std::time::Instant;

use dieplan::diag::StrResult;
use tracing::info;

use crate::args::ForceCommand;
use crate::load;

/// Execute the `force` command.
pub fn force(command: &ForceCommand) -> StrResult<()> {
    let mut netlist = load::read_netlist(&command.common.netlist)?;
    let die = load::read_die(&command.common.die, &netlist)?;

    let options = dieplan_force::Options {
        max_iter: command.max_iter,
        ..dieplan_force::Options::default()
    };

    let start = Instant::now();
    dieplan_force::force_layout(&mut netlist, &die, &options);
    info!(elapsed = ?start.elapsed(), "force finished");

    if let Some(path) = &command.common.out_netlist {
        load::write(path, &netlist.to_yaml())?;
    }
    Ok(())
}
