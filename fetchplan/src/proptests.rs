//! Property-based tests for plan declarations and scoped activation.

use proptest::prelude::*;

use crate::condition::{Condition, PropertyValue};
use crate::ident::{PatternId, PropertyId};
use crate::options::{ElementMode, TreeScope};
use crate::plan::FetchPlan;
use crate::schema::PlanSchema;

// Strategy for generating valid identifier values (zero excluded)
fn id_strategy() -> impl Strategy<Value = u32> {
    1u32..=100_000
}

fn scope_strategy() -> impl Strategy<Value = TreeScope> {
    prop_oneof![
        Just(TreeScope::Element),
        Just(TreeScope::Children),
        Just(TreeScope::Descendants),
        Just(TreeScope::Subtree),
        Just(TreeScope::Ancestors),
    ]
}

fn mode_strategy() -> impl Strategy<Value = ElementMode> {
    prop_oneof![Just(ElementMode::Full), Just(ElementMode::Reference)]
}

fn value_strategy() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        any::<bool>().prop_map(PropertyValue::Bool),
        any::<i64>().prop_map(PropertyValue::Int),
        "[a-z]{0,8}".prop_map(PropertyValue::Text),
    ]
}

// Strategy for generating condition trees of bounded depth
fn condition_strategy() -> impl Strategy<Value = Condition> {
    let leaf = prop_oneof![
        Just(Condition::True),
        Just(Condition::False),
        (id_strategy(), value_strategy()).prop_map(|(id, value)| {
            Condition::property(PropertyId::try_from(id).unwrap(), value)
        }),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Condition::And),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Condition::Or),
            inner.prop_map(|c| c.not()),
        ]
    })
}

// Strategy for a node: a small property table conditions are evaluated against
fn node_strategy() -> impl Strategy<Value = std::collections::BTreeMap<u32, PropertyValue>> {
    prop::collection::btree_map(id_strategy(), value_strategy(), 0..8)
}

fn schema_strategy() -> impl Strategy<Value = PlanSchema> {
    (
        prop::collection::vec(id_strategy(), 0..8),
        prop::collection::vec(id_strategy(), 0..8),
        prop::option::of(condition_strategy()),
        prop::option::of(scope_strategy()),
        prop::option::of(mode_strategy()),
    )
        .prop_map(
            |(properties, patterns, tree_filter, tree_scope, element_mode)| PlanSchema {
                properties,
                patterns,
                tree_filter,
                tree_scope,
                element_mode,
            },
        )
}

proptest! {
    // Double negation never changes what a condition matches
    #[test]
    fn prop_condition_double_negation(cond in condition_strategy(), node in node_strategy()) {
        let lookup = |id: PropertyId| node.get(&id.value()).cloned();
        prop_assert_eq!(
            cond.matches(&lookup),
            cond.clone().not().not().matches(&lookup)
        );
    }

    // De Morgan: !(a && b) == !a || !b under evaluation
    #[test]
    fn prop_condition_de_morgan(
        a in condition_strategy(),
        b in condition_strategy(),
        node in node_strategy()
    ) {
        let lookup = |id: PropertyId| node.get(&id.value()).cloned();
        let lhs = a.clone().and(b.clone()).not();
        let rhs = a.not().or(b.not());
        prop_assert_eq!(lhs.matches(&lookup), rhs.matches(&lookup));
    }

    // Conditions survive a YAML round-trip
    #[test]
    fn prop_condition_yaml_roundtrip(cond in condition_strategy()) {
        let yaml = serde_yaml::to_string(&cond).unwrap();
        let back: Condition = serde_yaml::from_str(&yaml).unwrap();
        prop_assert_eq!(back, cond);
    }

    // A duplicate carries the source's declaration and starts inactive
    #[test]
    fn prop_duplicate_fidelity(
        properties in prop::collection::btree_set(id_strategy(), 0..8),
        patterns in prop::collection::btree_set(id_strategy(), 0..8),
        scope in scope_strategy(),
        mode in mode_strategy()
    ) {
        let plan = FetchPlan::new();
        for &id in &properties {
            plan.add_property(PropertyId::try_from(id).unwrap()).unwrap();
        }
        for &id in &patterns {
            plan.add_pattern(PatternId::try_from(id).unwrap()).unwrap();
        }
        plan.set_tree_scope(scope).unwrap();
        plan.set_element_mode(mode).unwrap();

        let scope_guard = plan.activate().unwrap();
        let copy = plan.duplicate().unwrap();
        scope_guard.end().unwrap();

        prop_assert_eq!(copy.active_count(), 0);
        prop_assert_eq!(copy.properties().unwrap(), plan.properties().unwrap());
        prop_assert_eq!(copy.patterns().unwrap(), plan.patterns().unwrap());
        prop_assert_eq!(copy.tree_scope().unwrap(), scope);
        prop_assert_eq!(copy.element_mode().unwrap(), mode);
    }

    // Balanced nested activation always restores the prior current plan
    #[test]
    fn prop_balanced_activation_restores_current(depth in 1usize..6) {
        let before = FetchPlan::current();

        let plans: Vec<FetchPlan> = (0..depth).map(|_| FetchPlan::new()).collect();
        let mut scopes = Vec::with_capacity(depth);
        for plan in &plans {
            scopes.push(plan.activate().unwrap());
            prop_assert_eq!(&FetchPlan::current(), plan);
        }
        for (scope, plan) in scopes.into_iter().zip(plans.iter()).rev() {
            prop_assert_eq!(&FetchPlan::current(), plan);
            scope.end().unwrap();
        }

        prop_assert_eq!(FetchPlan::current(), before);
    }

    // Schemas survive YAML and JSON round-trips
    #[test]
    fn prop_schema_roundtrip(schema in schema_strategy()) {
        let yaml = serde_yaml::to_string(&schema).unwrap();
        prop_assert_eq!(&PlanSchema::from_yaml(&yaml).unwrap(), &schema);

        let json = serde_json::to_string(&schema).unwrap();
        prop_assert_eq!(&PlanSchema::from_json(&json).unwrap(), &schema);
    }
}
