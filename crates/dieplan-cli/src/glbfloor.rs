use std::time::Instant;

use dieplan::diag::{bail, StrResult};
use tracing::info;

use crate::args::GlbfloorCommand;
use crate::load;

/// Execute the `glbfloor` command.
pub fn glbfloor(command: &GlbfloorCommand) -> StrResult<()> {
    let mut netlist = load::read_netlist(&command.common.netlist)?;
    let die = load::read_die(&command.common.die, &netlist)?;

    let grid = match &command.grid {
        Some(spec) => match load::parse_pair(spec) {
            Some((rows, cols)) if rows.fract() == 0.0 && cols.fract() == 0.0 => {
                Some((rows as usize, cols as usize))
            }
            _ => bail!("the grid must be ROWSxCOLS with positive integers"),
        },
        None => None,
    };

    let options = dieplan_glbfloor::Options {
        alpha: command.alpha,
        threshold: command.threshold,
        max_iter: command.max_iter,
        grid,
        max_aspect: command.aspect_ratio,
        num_rectangles: command.num_rectangles,
        solver: dieplan_nlp::SolveOptions::default(),
    };

    let start = Instant::now();
    let allocation = dieplan_glbfloor::glbfloor(&mut netlist, &die, &options)?;
    info!(elapsed = ?start.elapsed(), cells = allocation.num_cells(), "glbfloor finished");

    if let Some(path) = &command.common.out_netlist {
        load::write(path, &netlist.to_yaml())?;
    }
    if let Some(path) = &command.out_allocation {
        load::write(path, &allocation.to_yaml())?;
    }
    Ok(())
}
