use proptest::prelude::*;
use rstest::rstest;
use scent_core::mocks::MemoryStore;
use scent_core::{
    BlendError, FileStore, InventoryCfg, InventoryLedger, LedgerError, Recipe, Step,
};

fn ledger_with(rows: &[(u32, u32)]) -> (InventoryLedger, MemoryStore) {
    let store = MemoryStore::with_rows(rows);
    let ledger = InventoryLedger::open(
        &InventoryCfg::uniform(12, 500, 500, 50),
        Box::new(store.clone()),
    )
    .unwrap();
    (ledger, store)
}

fn recipe(steps: &[(u32, u32)]) -> Recipe {
    Recipe::new(
        steps.iter().map(|&(s, p)| Step::new(s, p)).collect(),
        None,
        20,
    )
    .unwrap()
}

#[test]
fn commit_subtracts_and_persists() {
    let (l, store) = ledger_with(&[(1, 500), (3, 500)]);
    let t = l.check_and_reserve(&recipe(&[(1, 20), (3, 10)])).unwrap();
    l.commit(t).unwrap();
    assert_eq!(l.query(1), Ok(480));
    assert_eq!(l.query(3), Ok(490));
    let rows = store.rows().unwrap();
    assert!(rows.contains(&(1, 480)) && rows.contains(&(3, 490)));
    assert_eq!(rows.len(), 12);
}

#[rstest]
#[case(&[(1, 20), (2, 600)], LedgerError::InsufficientStock { slot_id: 2, required: 600, available: 500 })]
#[case(&[(1, 20), (13, 1)], LedgerError::InvalidSlot { slot_id: 13 })]
#[case(&[(4, 60), (4, 60)], LedgerError::InsufficientStock { slot_id: 4, required: 120, available: 100 })]
fn failed_check_changes_nothing(#[case] steps: &[(u32, u32)], #[case] expected: LedgerError) {
    let (l, store) = ledger_with(&[(1, 500), (2, 500), (4, 100)]);
    let before = l.snapshot();
    let saves = store.saves();
    assert_eq!(l.check_and_reserve(&recipe(steps)).unwrap_err(), expected);
    assert_eq!(l.snapshot(), before);
    assert_eq!(store.saves(), saves);
    assert!(!l.has_outstanding());
}

#[test]
fn second_reservation_waits_for_commit() {
    let (l, _) = ledger_with(&[(1, 500)]);
    let t = l.check_and_reserve(&recipe(&[(1, 10)])).unwrap();
    assert_eq!(
        l.check_and_reserve(&recipe(&[(1, 10)])).unwrap_err(),
        LedgerError::ReservationOutstanding
    );
    l.release(t).unwrap();
    assert_eq!(l.query(1), Ok(500));
    let t = l.check_and_reserve(&recipe(&[(1, 10)])).unwrap();
    l.commit(t).unwrap();
    assert_eq!(l.query(1), Ok(490));
}

#[test]
fn persistence_failure_keeps_memory_authoritative() {
    let (l, store) = ledger_with(&[(1, 500)]);
    store.set_failing(true);
    let t = l.check_and_reserve(&recipe(&[(1, 25)])).unwrap();
    let err = l.commit(t).unwrap_err();
    assert!(matches!(err, BlendError::Persistence(_)));
    assert_eq!(l.query(1), Ok(475));
    assert!(store.rows().unwrap().contains(&(1, 500)));
    assert!(!l.has_outstanding());
}

#[test]
fn missing_store_is_initialised_with_defaults() {
    let store = MemoryStore::new();
    let l = InventoryLedger::open(
        &InventoryCfg::uniform(12, 500, 500, 50),
        Box::new(store.clone()),
    )
    .unwrap();
    let rows = store.rows().unwrap();
    assert_eq!(rows.len(), 12);
    assert!(rows.iter().all(|&(_, ml)| ml == 500));
    assert_eq!(l.query(12), Ok(500));
}

#[test]
fn loaded_values_are_clamped_and_unknown_rows_ignored() {
    let (l, _) = ledger_with(&[(1, 900), (40, 10)]);
    assert_eq!(l.query(1), Ok(500));
    assert_eq!(l.query(40), Err(LedgerError::InvalidSlot { slot_id: 40 }));
}

#[test]
fn updates_apply_valid_rows_and_report_the_rest() {
    let (l, store) = ledger_with(&[(1, 100), (2, 100)]);
    let report = l.apply_updates(&[(1, 300), (2, 900), (3, -5), (99, 10)]).unwrap();
    assert_eq!(report.applied, vec![1]);
    assert_eq!(report.rejected.len(), 3);
    assert!(matches!(
        report.rejected[2],
        LedgerError::InvalidSlot { slot_id: 99 }
    ));
    assert_eq!(l.query(1), Ok(300));
    assert_eq!(l.query(2), Ok(100));
    assert!(store.rows().unwrap().contains(&(1, 300)));
}

#[test]
fn low_stock_lists_slots_at_threshold() {
    let (l, _) = ledger_with(&[(1, 70), (2, 500)]);
    let t = l.check_and_reserve(&recipe(&[(1, 20)])).unwrap();
    l.commit(t).unwrap();
    let low: Vec<u32> = l.low_stock().iter().map(|i| i.id).collect();
    assert_eq!(low, vec![1]);
}

#[test]
fn file_store_round_trips_through_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("base_storage.txt");
    let cfg = InventoryCfg::uniform(3, 500, 500, 50);
    {
        let l = InventoryLedger::open(&cfg, Box::new(FileStore::new(&path))).unwrap();
        let t = l.check_and_reserve(&recipe(&[(2, 40)])).unwrap();
        l.commit(t).unwrap();
    }
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "1 500\n2 460\n3 500\n"
    );
    let l = InventoryLedger::open(&cfg, Box::new(FileStore::new(&path))).unwrap();
    assert_eq!(l.query(2), Ok(460));
}

#[test]
fn corrupt_file_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("base_storage.txt");
    std::fs::write(&path, "1 500\nnot a row\n").unwrap();
    let err = InventoryLedger::open(
        &InventoryCfg::uniform(3, 500, 500, 50),
        Box::new(FileStore::new(&path)),
    )
    .unwrap_err();
    assert!(matches!(err, BlendError::Persistence(m) if m.contains("line 2")));
}

proptest! {
    #[test]
    fn committed_stock_is_conserved(
        stock in proptest::collection::vec(0u32..=500, 12),
        steps in proptest::collection::vec((1u32..=12, 0u32..=100), 1..10),
    ) {
        let rows: Vec<(u32, u32)> = stock.iter().enumerate().map(|(i, &ml)| (i as u32 + 1, ml)).collect();
        let (l, _) = ledger_with(&rows);
        let r = recipe(&steps);
        let needs = r.requirements();
        let before = l.snapshot();
        match l.check_and_reserve(&r) {
            Ok(t) => {
                l.commit(t).unwrap();
                for item in l.snapshot() {
                    let prev = before.iter().find(|b| b.id == item.id).unwrap().current_ml;
                    let need = needs.get(&item.id).copied().unwrap_or(0);
                    prop_assert_eq!(item.current_ml, prev - need);
                    prop_assert!(item.current_ml <= item.max_ml);
                }
            }
            Err(_) => {
                prop_assert_eq!(l.snapshot(), before);
                let short = needs.iter().any(|(id, need)| l.query(*id).unwrap() < *need);
                prop_assert!(short);
            }
        }
    }
}
