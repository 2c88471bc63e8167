use proptest::prelude::*;
use sst_core::clock::ManualClock;
use sst_core::model::{GlobalSnapshot, ModifiedAt};
use sst_core::store::{LocalStore, MemoryStore};
use sst_core::sync::merge::{merge_into_store, merge_snapshot};
use sst_core::sync::{SharedRemote, SyncEngine, bundle, sync_status};

use generators::*;

fn store_with(snapshot: &GlobalSnapshot) -> LocalStore<MemoryStore> {
    let mut store = LocalStore::new(MemoryStore::new());
    merge_into_store(&mut store, snapshot).expect("seed store");
    store
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn merging_own_bundle_is_a_noop(snapshot in arb_snapshot()) {
        let mut store = store_with(&snapshot);
        let own = bundle(&store).expect("bundle");
        let writes = store.documents().writes();

        let report = merge_into_store(&mut store, &own).expect("merge");
        prop_assert!(report.is_noop());
        prop_assert_eq!(store.documents().writes(), writes);
        prop_assert_eq!(bundle(&store).expect("bundle"), own);
    }

    #[test]
    fn newer_stamp_wins_each_record(local in arb_snapshot(), remote in arb_snapshot()) {
        let mut merged = local.clone();
        merge_snapshot(&mut merged, &remote);

        for (date, records) in &remote.dates {
            for (unit, theirs) in records {
                let result = merged.record(*date, *unit).expect("merged record exists");
                match local.record(*date, *unit) {
                    None => prop_assert_eq!(result, theirs),
                    Some(ours) if theirs.last_modified > ours.last_modified => {
                        prop_assert_eq!(result, theirs);
                    }
                    Some(ours) => prop_assert_eq!(result, ours),
                }
            }
        }
        for (date, records) in &local.dates {
            for unit in records.keys() {
                prop_assert!(merged.record(*date, *unit).is_some());
            }
        }
    }

    #[test]
    fn merge_is_idempotent_on_snapshots(local in arb_snapshot(), remote in arb_snapshot()) {
        let mut once = local;
        merge_snapshot(&mut once, &remote);
        let mut twice = once.clone();
        let report = merge_snapshot(&mut twice, &remote);
        prop_assert_eq!(report.records.changed(), 0);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn pending_counts_records_after_last_sync(snapshot in arb_snapshot(), offset in 0i64..20) {
        let clock = ManualClock::new(base_instant() + chrono::TimeDelta::seconds(offset));
        let mut engine = SyncEngine::new(store_with(&snapshot), SharedRemote::new(), clock);
        let outcome = engine.sync_now().expect("sync");

        let expected = snapshot.count_modified_after(outcome.status.last_sync);
        prop_assert_eq!(outcome.status.pending, expected);
        prop_assert_eq!(sync_status(engine.store()).expect("status").pending, expected);
        prop_assert!(!outcome.status.last_sync.is_never());
        prop_assert!(outcome.status.last_sync > ModifiedAt::Never);
    }
}
