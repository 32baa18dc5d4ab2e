//! Property-Based Tests for Reconciliation
//!
//! # Test Properties
//!
//! 1. **Weight-step bound**: one rebalance never moves a weight by more
//!    than the step, and always moves it toward the model weight
//! 2. **Drive name stability**: drive names depend only on declaration
//!    order, so repeated runs name every device the same way

#![cfg(test)]

use std::collections::BTreeSet;

use proptest::prelude::*;

use super::reconcile::{initial_weight, step_toward};
use crate::model::servers::tests::servers_model;
use crate::model::Weight;

// =============================================================================
// Property Strategies
// =============================================================================

/// Weights in hundredths, up to 20000.00
fn weight_strategy() -> impl Strategy<Value = Weight> {
    (0u32..=2_000_000).prop_map(|h| Weight::new(f64::from(h) / 100.0))
}

/// Positive steps in hundredths
fn step_strategy() -> impl Strategy<Value = f64> {
    (1u32..=500_000).prop_map(|h| f64::from(h) / 100.0)
}

const RINGS: [&str; 3] = ["account", "container", "object-0"];

/// Device groups: for each group, its device count and ring selection
fn disk_model_strategy() -> impl Strategy<Value = Vec<(usize, Vec<usize>)>> {
    prop::collection::vec(
        (1usize..=4, prop::collection::btree_set(0usize..RINGS.len(), 1..=3)),
        1..=5,
    )
    .prop_map(|groups| {
        groups
            .into_iter()
            .map(|(devices, rings)| (devices, rings.into_iter().collect()))
            .collect()
    })
}

fn servers_yaml(groups: &[(usize, Vec<usize>)]) -> String {
    let mut yaml = String::from(
        "- name: standard-ccp-c1-m1-mgmt\n  \
         network_names: [standard-ccp-c1-m1-mgmt, standard-ccp-c1-m1-obj]\n  \
         disk_model:\n    name: GENERATED\n    device_groups:\n",
    );
    let mut next_device = 0;
    for (index, (devices, rings)) in groups.iter().enumerate() {
        let names: Vec<String> = (0..*devices)
            .map(|_| {
                next_device += 1;
                format!("{{name: /dev/d{}}}", next_device - 1)
            })
            .collect();
        let rings: Vec<&str> = rings.iter().map(|r| RINGS[*r]).collect();
        yaml.push_str(&format!(
            "      - name: group{}\n        devices: [{}]\n        consumer: {{name: swift, attrs: {{rings: [{}]}}}}\n",
            index,
            names.join(", "),
            rings.join(", ")
        ));
    }
    yaml
}

// =============================================================================
// Weight Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the target is never further than one step from the current weight.
    #[test]
    fn prop_step_is_bounded(
        current in weight_strategy(),
        model in weight_strategy(),
        step in step_strategy(),
    ) {
        let target = step_toward(current, model, Some(step));
        let moved = (target.value() - current.value()).abs();
        prop_assert!(moved <= step + 0.005, "moved {} with step {}", moved, step);
    }

    /// Property: the target lies between the current and the model weight.
    #[test]
    fn prop_step_moves_toward_model(
        current in weight_strategy(),
        model in weight_strategy(),
        step in step_strategy(),
    ) {
        let target = step_toward(current, model, Some(step));
        prop_assert!(target >= current.min(model));
        prop_assert!(target <= current.max(model));
    }

    /// Property: a model further than one step away is approached by exactly one step.
    #[test]
    fn prop_full_step_when_far(
        current in weight_strategy(),
        model in weight_strategy(),
        step in step_strategy(),
    ) {
        prop_assume!((model.value() - current.value()).abs() > step);
        let target = step_toward(current, model, Some(step));
        let expected = if model > current {
            Weight::new(current.value() + step)
        } else {
            Weight::new(current.value() - step)
        };
        prop_assert_eq!(target, expected);
    }

    /// Property: without a step the model weight is reached in one go.
    #[test]
    fn prop_no_step_reaches_model(current in weight_strategy(), model in weight_strategy()) {
        prop_assert_eq!(step_toward(current, model, None), model);
    }

    /// Property: new drives never start above one step.
    #[test]
    fn prop_new_drive_capped(model in weight_strategy(), step in step_strategy()) {
        let initial = initial_weight(model, Some(step));
        prop_assert!(initial <= model);
        prop_assert!(initial.value() <= step + 0.005);
    }
}

// =============================================================================
// Drive Name Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: iterating twice yields identical records.
    #[test]
    fn prop_iteration_is_repeatable(groups in disk_model_strategy()) {
        let model = servers_model(&servers_yaml(&groups));
        let first: Vec<_> = model.iter_devices().collect();
        let second: Vec<_> = model.iter_devices().collect();
        prop_assert_eq!(first, second);
    }

    /// Property: the n-th declared device is `disk<n>` in every ring it serves.
    #[test]
    fn prop_names_follow_declaration_order(groups in disk_model_strategy()) {
        let model = servers_model(&servers_yaml(&groups));
        let total: usize = groups.iter().map(|(devices, _)| devices).sum();
        let mut names = BTreeSet::new();
        for device in model.iter_devices() {
            let device_name = device.device_name.clone().unwrap_or_default();
            let index = device_name.trim_start_matches("/dev/d");
            prop_assert_eq!(&device.swift_drive_name, &format!("disk{}", index));
            names.insert(device.swift_drive_name);
        }
        prop_assert_eq!(names.len(), total);
    }
}
