mod common;

use common::RunBuilder;
use mitosis_data::{DeathCause, LifeEvent, Variant};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_asexual_division_scenario() {
    // Sexual cells search later than the asexual ones divide.
    let mut run = RunBuilder::new()
        .with_food(20)
        .with_timing(|t| t.mating_delay_ms = 1500)
        .with_cells(Variant::Asexual, 2)
        .with_cells(Variant::Sexual, 2)
        .start();
    assert_eq!(run.manager.divisions(), 0);

    let (event, seen) = run
        .wait_for(Duration::from_secs(30), |e| {
            matches!(e, LifeEvent::Divided { .. })
        })
        .await;
    let LifeEvent::Divided {
        parent,
        offspring,
        alive,
        divisions,
        food,
    } = event
    else {
        unreachable!()
    };

    assert_eq!(alive, 5, "four cells, one parent retired, two offspring");
    assert_eq!(divisions, 1);
    assert_eq!(food, 12, "every cell ate twice");
    assert_eq!(offspring.len(), 2);

    let meals = seen
        .iter()
        .filter(|e| matches!(e, LifeEvent::Ate { id, .. } if *id == parent))
        .count();
    assert_eq!(meals, 2);

    let retired = run.manager.cell(parent).expect("parent stays registered");
    assert!(!retired.is_alive());
    assert_eq!(retired.death_cause(), Some(DeathCause::Division));
    for child in offspring {
        let cell = run.manager.cell(child).expect("offspring registered");
        assert_eq!(cell.variant(), Variant::Asexual);
    }
}

#[tokio::test(start_paused = true)]
async fn test_sexual_rendezvous_scenario() {
    let mut run = RunBuilder::new()
        .with_food(20)
        .with_cells(Variant::Sexual, 2)
        .start();

    let (event, _) = run
        .wait_for(Duration::from_secs(30), |e| {
            matches!(e, LifeEvent::Reproduced { .. })
        })
        .await;
    let LifeEvent::Reproduced {
        parents,
        offspring,
        alive,
        reproductions,
        ..
    } = event
    else {
        unreachable!()
    };

    assert_eq!(alive, 3);
    assert_eq!(reproductions, 1);
    assert_eq!(run.manager.reproductions(), 1);
    assert_eq!(run.manager.divisions(), 0);

    for id in parents {
        let parent = run.manager.cell(id).expect("parent registered");
        assert!(parent.is_alive());
        assert_eq!(parent.meals_eaten(), 0);
        assert!(!parent.wants_to_reproduce());
    }
    let child = run.manager.cell(offspring).expect("offspring registered");
    assert_eq!(child.variant(), Variant::Sexual);

    // The partner's own search must not produce a second offspring.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(run.manager.reproductions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lonely_sexual_cell_abandons_after_all_attempts() {
    let mut run = RunBuilder::new()
        .with_food(20)
        .with_cells(Variant::Sexual, 1)
        .start();

    let (event, _) = run
        .wait_for(Duration::from_secs(30), |e| {
            matches!(e, LifeEvent::MatingAbandoned { .. })
        })
        .await;
    assert_eq!(
        event,
        LifeEvent::MatingAbandoned { id: 1, attempts: 5 }
    );

    let cell = run.manager.cell(1).expect("cell registered");
    assert!(cell.is_alive());
    assert_eq!(cell.meals_eaten(), 0);
    assert!(cell.is_hungry());
    assert_eq!(run.manager.reproductions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sexual_cell_ignores_asexual_partners() {
    let mut run = RunBuilder::new()
        .with_food(20)
        .with_timing(|t| t.division_delay_ms = 60_000)
        .with_cells(Variant::Sexual, 1)
        .with_cells(Variant::Asexual, 1)
        .start();

    let (event, _) = run
        .wait_for(Duration::from_secs(30), |e| {
            matches!(e, LifeEvent::MatingAbandoned { .. })
        })
        .await;
    assert!(matches!(event, LifeEvent::MatingAbandoned { id: 1, .. }));
    assert_eq!(run.manager.reproductions(), 0);
}
