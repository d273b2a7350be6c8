#![cfg(test)]

// Property tests for ProbeTable kept inside the crate so they can check
// the internal probe-chain and counter invariants, not just the public
// behavior.

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use crate::error::StoreError;
use crate::table::{ProbeTable, TOMBSTONE_KEY};

// Small key pool so sequences revisit keys: updates, deletes of live keys
// and tombstone reuse all happen often. Ops shrink in list length, keys
// shrink toward the low end of the pool.
#[derive(Clone, Debug)]
enum Op {
    Set(i32, u16),
    Delete(i32),
    Get(i32),
    Clear,
    Iterate,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let key = 0i32..16;
    let op = prop_oneof![
        8 => (key.clone(), any::<u16>()).prop_map(|(k, v)| Op::Set(k, v)),
        4 => key.clone().prop_map(Op::Delete),
        4 => key.prop_map(Op::Get),
        1 => Just(Op::Clear),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..120)
}

fn run_scenario(initial_capacity: usize, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut sut = ProbeTable::with_capacity(initial_capacity).unwrap();
    let mut model: HashMap<i32, String> = HashMap::new();

    for op in ops {
        match op {
            Op::Set(k, v) => {
                let value = format!("v{v}");
                let previous = sut.set(k, value.clone()).unwrap();
                let model_previous = model.insert(k, value);
                prop_assert_eq!(previous, model_previous);
            }
            Op::Delete(k) => match (sut.delete(k), model.remove(&k)) {
                (Ok(value), Some(model_value)) => prop_assert_eq!(value, model_value),
                (Err(StoreError::KeyNotFound), None) => {}
                (sut_result, model_result) => {
                    return Err(TestCaseError::fail(format!(
                        "delete({k}) diverged: sut {sut_result:?}, model {model_result:?}"
                    )));
                }
            },
            Op::Get(k) => match (sut.get(k), model.get(&k)) {
                (Ok(value), Some(model_value)) => prop_assert_eq!(value, model_value.as_str()),
                (Err(StoreError::KeyNotFound), None) => {}
                (sut_result, model_result) => {
                    return Err(TestCaseError::fail(format!(
                        "get({k}) diverged: sut {sut_result:?}, model {model_result:?}"
                    )));
                }
            },
            Op::Clear => {
                sut.clear();
                model.clear();
            }
            Op::Iterate => {
                let sut_entries: BTreeSet<(i32, String)> =
                    sut.iter().map(|(k, v)| (k, v.to_string())).collect();
                let model_entries: BTreeSet<(i32, String)> =
                    model.iter().map(|(&k, v)| (k, v.clone())).collect();
                prop_assert_eq!(sut_entries, model_entries);
            }
        }

        // Post-conditions after every op.
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.counters_consistent());
        prop_assert!(sut.probe_chains_intact());
        prop_assert!(
            sut.len() + sut.tombstones() <= sut.capacity(),
            "occupancy exceeded capacity"
        );
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap,
// with the internal invariants re-checked after every operation.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        run_scenario(0, ops)?;
    }
}

// Property: the same equivalence starting from a capacity-2 table, so
// nearly every run forces multiple resizes while tombstones are present.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_under_forced_resizes(ops in arb_ops()) {
        run_scenario(2, ops)?;
    }
}

// Property: the reserved key is rejected no matter the surrounding state.
proptest! {
    #[test]
    fn prop_reserved_key_always_rejected(ops in arb_ops()) {
        let mut sut = ProbeTable::with_capacity(0).unwrap();
        for op in ops {
            if let Op::Set(k, v) = op {
                sut.set(k, format!("v{v}")).unwrap();
            }
            prop_assert!(matches!(sut.set(TOMBSTONE_KEY, "x"), Err(StoreError::InvalidParam)));
            prop_assert!(matches!(sut.get(TOMBSTONE_KEY), Err(StoreError::InvalidParam)));
            prop_assert!(matches!(sut.delete(TOMBSTONE_KEY), Err(StoreError::InvalidParam)));
        }
    }
}
