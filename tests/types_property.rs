//! Property tests for the type lattice: sum normalization laws, the
//! supertype relation's order properties, and the type-syntax round trip.

use proptest::prelude::*;
use rill::lexer::tokenize;
use rill::parser::Parser;
use rill::source::FileId;
use rill::types::Type;

fn arb_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        Just(Type::INT),
        Just(Type::STR),
        Just(Type::BOOL),
        Just(Type::UNIT),
        Just(Type::ANY),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::list),
            prop::collection::btree_map("[a-c]", inner.clone(), 0..3).prop_map(Type::Object),
            (prop::collection::vec(inner.clone(), 0..3), inner.clone())
                .prop_map(|(args, ret)| Type::func(args, ret)),
            prop::collection::vec(inner, 2..4).prop_map(Type::sum),
        ]
    })
}

/// Parses a type from its display form through the real pipeline.
fn reparse(ty: &Type) -> Type {
    let text = ty.to_string();
    let toks = tokenize(FileId::default(), &[text.clone()])
        .unwrap_or_else(|e| panic!("display form {:?} failed to lex: {}", text, e));
    Parser::new(toks)
        .parse_type()
        .unwrap_or_else(|e| panic!("display form {:?} failed to parse: {}", text, e))
}

fn equivalent(a: &Type, b: &Type) -> bool {
    a.is_supertype_of(b) && b.is_supertype_of(a)
}

proptest! {
    #[test]
    fn supertype_is_reflexive(t in arb_type()) {
        prop_assert!(t.is_supertype_of(&t));
    }

    #[test]
    fn supertype_is_transitive(a in arb_type(), b in arb_type(), c in arb_type()) {
        if a.is_supertype_of(&b) && b.is_supertype_of(&c) {
            prop_assert!(a.is_supertype_of(&c), "{} ≽ {} ≽ {}", a, b, c);
        }
    }

    #[test]
    fn any_tops_everything(t in arb_type()) {
        prop_assert!(Type::ANY.is_supertype_of(&t));
    }

    #[test]
    fn sum_is_idempotent(t in arb_type()) {
        prop_assert_eq!(Type::sum([t.clone(), t.clone()]), t.clone());
        prop_assert_eq!(Type::sum([t.clone()]), t);
    }

    #[test]
    fn sum_absorbs_any(t in arb_type()) {
        prop_assert_eq!(Type::sum([t.clone(), Type::ANY]), Type::ANY);
        prop_assert_eq!(Type::sum([Type::ANY, t]), Type::ANY);
    }

    #[test]
    fn sum_is_commutative_up_to_order(ts in prop::collection::vec(arb_type(), 0..5)) {
        let forward = Type::sum(ts.clone());
        let backward = Type::sum(ts.into_iter().rev());
        prop_assert!(
            equivalent(&forward, &backward),
            "{} vs {}",
            forward,
            backward
        );
    }

    #[test]
    fn sum_result_is_normalized(ts in prop::collection::vec(arb_type(), 0..6)) {
        let result = Type::sum(ts);
        if let Type::Sum(branches) = &result {
            for branch in branches {
                prop_assert!(!matches!(branch, Type::Sum(_)), "nested sum in {}", result);
                prop_assert!(*branch != Type::ANY, "any branch in {}", result);
            }
            for (i, a) in branches.iter().enumerate() {
                for (j, b) in branches.iter().enumerate() {
                    if i != j {
                        prop_assert!(
                            !a.is_supertype_of(b),
                            "redundant branches {} and {} in {}",
                            a,
                            b,
                            result
                        );
                    }
                }
            }
            prop_assert!(branches.len() >= 2, "unwrapped singleton in {}", result);
        }
    }

    #[test]
    fn sum_covers_every_argument(ts in prop::collection::vec(arb_type(), 1..5)) {
        let sum = Type::sum(ts.clone());
        for t in &ts {
            prop_assert!(sum.is_supertype_of(t), "{} should cover {}", sum, t);
        }
    }

    #[test]
    fn sum_is_a_least_upper_bound(
        ts in prop::collection::vec(arb_type(), 1..4),
        upper in arb_type(),
    ) {
        if ts.iter().all(|t| upper.is_supertype_of(t)) {
            let sum = Type::sum(ts);
            prop_assert!(upper.is_supertype_of(&sum), "{} should cover {}", upper, sum);
        }
    }

    #[test]
    fn display_form_reparses_to_the_same_type(t in arb_type()) {
        prop_assert_eq!(&reparse(&t), &t);
    }

    #[test]
    fn subtyping_never_panics(a in arb_type(), b in arb_type()) {
        let _ = a.is_supertype_of(&b);
        let _ = b.is_supertype_of(&a);
        let _ = Type::sum([a, b]);
    }
}
