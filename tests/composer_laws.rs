//! Property-based tests for composition laws.
//!
//! ## Composition Law
//! - For every nonempty stage list `s1..sn` and input `x`,
//!   `Composer::new(steps![s1, .., sn])` called with `x` equals
//!   `s1(s2(..sn(x)))` — the last declared stage runs first.
//!
//! ## Flattening Law
//! - Splitting a stage list anywhere and nesting the prefix as an inner
//!   composer yields the same exposed sequence and the same results as the
//!   flat construction.
//!
//! Using proptest, random operator chains and inputs exercise the laws
//! across a wide range of shapes.

use std::sync::Arc;

use catena::composer::{Composer, Step};
use catena::stage::{Callable, Outcome, func};
use catena::value::Value;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Add(i64),
    Mul(i64),
    Neg,
}

impl Op {
    fn apply(self, value: i64) -> i64 {
        match self {
            Self::Add(operand) => value.wrapping_add(operand),
            Self::Mul(operand) => value.wrapping_mul(operand),
            Self::Neg => value.wrapping_neg(),
        }
    }

    fn stage(self) -> Arc<dyn Callable> {
        match self {
            Self::Add(operand) => func(format!("add_{operand}"), move |value: i64| {
                value.wrapping_add(operand)
            }),
            Self::Mul(operand) => func(format!("mul_{operand}"), move |value: i64| {
                value.wrapping_mul(operand)
            }),
            Self::Neg => func("neg", |value: i64| value.wrapping_neg()),
        }
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i64>().prop_map(Op::Add),
        any::<i64>().prop_map(Op::Mul),
        Just(Op::Neg),
    ]
}

fn call_ready(composer: &Composer, input: i64) -> i64 {
    let outcome = composer.call(Value::new(input)).unwrap();
    let Outcome::Ready(value) = outcome else {
        panic!("pure stages never suspend");
    };
    value.downcast::<i64>().unwrap()
}

// =============================================================================
// Composition Law
// =============================================================================

proptest! {
    /// `Composer(s1, .., sn)(x) == s1(s2(..sn(x)))`.
    #[test]
    fn prop_composition_equals_nested_application(
        ops in proptest::collection::vec(op_strategy(), 1..8),
        input in any::<i64>(),
    ) {
        let declared: Vec<Step> = ops.iter().map(|op| Step::from(op.stage())).collect();
        let composer = Composer::new(declared).unwrap();

        let expected = ops.iter().rev().fold(input, |value, op| op.apply(value));
        prop_assert_eq!(call_ready(&composer, input), expected);
    }

    /// A single-stage composition behaves exactly like its stage.
    #[test]
    fn prop_single_stage_composition_is_transparent(
        op in op_strategy(),
        input in any::<i64>(),
    ) {
        let composer = Composer::new(vec![Step::from(op.stage())]).unwrap();
        prop_assert_eq!(call_ready(&composer, input), op.apply(input));
    }
}

// =============================================================================
// Flattening Law
// =============================================================================

proptest! {
    /// Nesting a prefix composer exposes the same leaf sequence and computes
    /// the same results as the flat construction.
    #[test]
    fn prop_flattening_preserves_sequence_and_results(
        ops in proptest::collection::vec(op_strategy(), 2..8),
        split_seed in any::<usize>(),
        input in any::<i64>(),
    ) {
        let split = split_seed % (ops.len() - 1) + 1;
        let stages: Vec<Arc<dyn Callable>> = ops.iter().map(|op| op.stage()).collect();

        let flat = Composer::new(
            stages.iter().cloned().map(Step::from).collect::<Vec<_>>(),
        )
        .unwrap();

        let inner = Composer::new(
            stages[..split].iter().cloned().map(Step::from).collect::<Vec<_>>(),
        )
        .unwrap();
        let mut declared = vec![Step::from(inner)];
        declared.extend(stages[split..].iter().cloned().map(Step::from));
        let nested = Composer::new(declared).unwrap();

        prop_assert_eq!(nested.stages().count(), flat.stages().count());
        for (left, right) in nested.stages().zip(flat.stages()) {
            prop_assert!(Arc::ptr_eq(left, right));
        }
        prop_assert_eq!(call_ready(&nested, input), call_ready(&flat, input));
    }
}
