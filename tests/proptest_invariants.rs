
use fluent_grammar::{CompileError, FluentError, Value};
use proptest::prelude::*;
use strategies::{arb_any_grammar, arb_rooted_grammar, arity, rule_name, GenGrammar};

/// Helper: walk a compiled grammar, choosing methods by index, and return the
/// number of calls made.
fn walk(gen: &GenGrammar, choices: &[usize]) -> Result<usize, TestCaseError> {
    let fluent = gen.compile().map_err(|e| TestCaseError::fail(e.to_string()))?;
    let mut chain = fluent.start();
    let mut calls = 0;
    for &choice in choices {
        let methods: Vec<String> = chain.methods().into_iter().map(str::to_owned).collect();
        if methods.is_empty() {
            break;
        }
        let method = &methods[choice % methods.len()];
        let args: Vec<Value> = (0..arity(method)).map(|i| Value::from(i as i64)).collect();
        chain = chain
            .call(method, &args)
            .map_err(|e| TestCaseError::fail(format!("offered method failed: {e}")))?;
        calls += 1;
    }
    prop_assert_eq!(chain.into_inner().calls().len(), calls);
    Ok(calls)
}

// ---------------------------------------------------------------------------
// Invariant 1: Compilation is total
//
// Authored grammars never panic the compiler. With every reference resolvable
// and no empty definitions, the only possible failure is a missing entry point.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn compile_fails_only_without_entry_point(gen in arb_any_grammar()) {
        match gen.compile() {
            Ok(fluent) => prop_assert!(!fluent.entry_points().is_empty()),
            Err(FluentError::Compile(CompileError::NoEntryPoint { cycle })) => {
                prop_assert!(cycle.len() >= 2);
                prop_assert_eq!(cycle.first(), cycle.last());
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn rooted_grammars_always_compile(gen in arb_rooted_grammar()) {
        let fluent = gen.compile();
        prop_assert!(fluent.is_ok(), "{:?}", fluent.err());
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: Top rules
//
// A top rule is referenced by no other rule, and exactly the top rules become
// entry points, in authoring order.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn top_rules_are_unreferenced(gen in arb_any_grammar()) {
        let grammar = gen.author();
        let rules = grammar.rules();
        for top in grammar.top_rules() {
            for rule in rules.iter().filter(|r| r.name() != top) {
                prop_assert!(
                    !rule.references_rule(&top),
                    "top rule {} is referenced by {}", top, rule.name()
                );
            }
        }
    }

    #[test]
    fn entry_points_match_top_rules(gen in arb_rooted_grammar()) {
        let grammar = gen.author();
        let top = grammar.top_rules();
        prop_assert_eq!(&top[0], &rule_name(0));
        let fluent = grammar.compile().unwrap();
        prop_assert_eq!(fluent.entry_points(), top.iter().map(String::as_str).collect::<Vec<_>>());
    }
}

// ---------------------------------------------------------------------------
// Invariant 3: Idempotence
//
// Authoring and compiling the same description twice yields the same tree.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn compilation_is_repeatable(gen in arb_rooted_grammar()) {
        let first = gen.compile().unwrap();
        let second = gen.compile().unwrap();
        prop_assert_eq!(first.to_string(), second.to_string());
        prop_assert_eq!(first.tree().method_names(), second.tree().method_names());
    }
}

// ---------------------------------------------------------------------------
// Invariant 4: Offered methods are callable
//
// Every method a chain offers can be invoked with its declared arity, and
// every invocation is recorded exactly once.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn random_walks_never_fail(
        gen in arb_rooted_grammar(),
        choices in prop::collection::vec(any::<usize>(), 0..24),
    ) {
        let calls = walk(&gen, &choices)?;
        prop_assert!(calls <= choices.len());
    }
}
