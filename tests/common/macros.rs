/// Asserts the number of living cells in a manager.
#[macro_export]
macro_rules! assert_alive {
    ($manager:expr, $count:expr) => {
        assert_eq!(
            $manager.alive_count(),
            $count,
            "Alive count mismatch"
        );
    };
}

/// Asserts that a cell with the given id exists and is dead.
#[macro_export]
macro_rules! assert_cell_dead {
    ($manager:expr, $id:expr) => {
        let cell = $manager.cell($id).expect("Cell not found in population");
        assert!(!cell.is_alive(), "Cell {} should be dead but is alive", $id);
    };
}

/// Asserts that the pool holds exactly what its ledger says it should.
#[macro_export]
macro_rules! assert_pool_balanced {
    ($pool:expr) => {
        let ledger = $pool.ledger();
        assert_eq!(
            $pool.available(),
            ledger.expected_available(),
            "Pool out of balance: {:?}",
            ledger
        );
    };
}
