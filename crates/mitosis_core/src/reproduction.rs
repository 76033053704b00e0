//! Asexual division and sexual rendezvous.
//!
//! Both protocols run inside the reproducing cell's own task and only call back into the
//! [`PopulationManager`] for delays, partner lookup and the final commit.

use crate::cell::{Cell, Step};
use crate::manager::PopulationManager;
use mitosis_data::{LifeEvent, Variant};

/// Runs the protocol of the cell's variant. The caller has already raised the cell's
/// reproduction flag.
pub(crate) async fn attempt(cell: &Cell, manager: &PopulationManager) -> Step {
    match cell.variant() {
        Variant::Asexual => divide(cell, manager).await,
        Variant::Sexual => rendezvous(cell, manager).await,
    }
}

/// Waits the division delay, then hands two offspring to the manager, which retires
/// the parent in the same commit.
async fn divide(cell: &Cell, manager: &PopulationManager) -> Step {
    manager
        .delay(cell, manager.timing().division_delay_ms)
        .await?;

    let Some(litter) = manager.reproduce(cell, None) else {
        // The run was reset under us; the cell is already dead.
        return Ok(());
    };
    tracing::info!(
        parent = cell.id(),
        offspring = ?litter.offspring,
        alive = litter.alive,
        divisions = litter.count,
        "Cell divided"
    );
    manager.emit(LifeEvent::Divided {
        parent: cell.id(),
        offspring: litter.offspring,
        alive: litter.alive,
        divisions: litter.count,
        food: litter.food,
    });
    Ok(())
}

/// Looks for a willing partner up to `mating_attempts` times.
///
/// The search also ends early once another cell has consumed this one's reproduction
/// flag: the winner of that rendezvous already reset both parents.
async fn rendezvous(cell: &Cell, manager: &PopulationManager) -> Step {
    let timing = manager.timing();
    let mut attempts = 0;
    let mut partner = None;

    while attempts < timing.mating_attempts
        && partner.is_none()
        && cell.is_alive()
        && cell.wants_to_reproduce()
    {
        manager.delay(cell, timing.mating_delay_ms).await?;
        partner = manager.find_mating_partner(cell);
        attempts += 1;
    }

    settle(cell, manager, partner.as_deref(), attempts);
    Ok(())
}

/// Ends a search: commits with `partner`, or abandons and resets the cell.
///
/// A cell whose flag is already down (another cell committed with it) or that died
/// meanwhile is left as it is.
fn settle(cell: &Cell, manager: &PopulationManager, partner: Option<&Cell>, attempts: u32) {
    if let Some(partner) = partner {
        if manager.consummate(cell, partner).is_some() {
            return;
        }
    }
    if !cell.is_alive() || !cell.wants_to_reproduce() {
        return;
    }

    cell.reset_after_reproduction();
    tracing::debug!(cell = cell.id(), attempts, "Mating abandoned");
    manager.emit(LifeEvent::MatingAbandoned {
        id: cell.id(),
        attempts,
    });
}
