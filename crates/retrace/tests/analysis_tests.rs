//! Well-formedness analysis: left recursion, nullable repetition and the
//! per-kind rule tables.

use retrace::{
    AnalysisKind, CustomParser, FatalError, GrammarBuilder, GrammarError, NodeRules, ParseSession,
    ParserId, TrailingSeparator, code_points,
};
use smallvec::{SmallVec, smallvec};

fn malformed(error: &GrammarError) -> Vec<(AnalysisKind, Option<String>)> {
    error
        .violations()
        .iter()
        .map(|v| (v.analysis, v.name.clone()))
        .collect()
}

#[test]
fn test_direct_left_recursion_is_rejected() {
    // rule = (rule "a") / "a"
    let mut g = GrammarBuilder::<char, ()>::new();
    let rule = g.declare("rule");
    let a = g.item('a');
    let recursive = g.seq([rule, a]);
    let body = g.choice([recursive, a]);
    g.define(rule, body).unwrap();

    let error = g.build(rule).unwrap_err();
    assert_eq!(
        malformed(&error),
        vec![(AnalysisKind::LeftRecursion, Some("rule".to_string()))]
    );
    assert!(error.to_string().contains("left recursion in `rule`"));
}

#[test]
fn test_indirect_left_recursion_is_reported_once() {
    // a = b "x"; b = a "y" / "z"
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.declare("a");
    let b = g.declare("b");
    let x = g.item('x');
    let y = g.item('y');
    let z = g.item('z');
    let a_body = g.seq([b, x]);
    let a_then_y = g.seq([a, y]);
    let b_body = g.choice([a_then_y, z]);
    g.define(a, a_body).unwrap();
    g.define(b, b_body).unwrap();

    let error = g.build(a).unwrap_err();
    let found = malformed(&error);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], (AnalysisKind::LeftRecursion, Some("a".to_string())));
}

#[test]
fn test_left_recursion_through_nullable_prefix() {
    // rule = "x"? rule "y" / "y"
    let mut g = GrammarBuilder::<char, ()>::new();
    let rule = g.declare("rule");
    let x = g.item('x');
    let y = g.item('y');
    let maybe_x = g.opt(x);
    let recursive = g.seq([maybe_x, rule, y]);
    let body = g.choice([recursive, y]);
    g.define(rule, body).unwrap();

    let error = g.build(rule).unwrap_err();
    assert_eq!(error.violations()[0].analysis, AnalysisKind::LeftRecursion);
}

#[test]
fn test_right_recursion_is_accepted() {
    // rule = "a" rule / "a"
    let mut g = GrammarBuilder::<char, ()>::new();
    let rule = g.declare("rule");
    let a = g.item('a');
    let recursive = g.seq([a, rule]);
    let body = g.choice([recursive, a]);
    g.define(rule, body).unwrap();

    let grammar = g.build(rule).unwrap();
    assert!(grammar.parse(&code_points("aaaa")).unwrap().full_match);
    assert!(!grammar.analyze().is_left_recursive(rule));
}

#[test]
fn test_repeat_of_nullable_body_is_rejected() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let maybe = g.opt(a);
    let root = g.repeat(maybe, 0);
    let error = g.build(root).unwrap_err();

    let violations = error.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].analysis, AnalysisKind::NullableRepetition);
    assert_eq!(violations[0].node, root);
}

#[test]
fn test_bounded_repeat_of_nullable_body_is_accepted() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let maybe = g.opt(a);
    let root = g.repeat_range(maybe, 0, 3);
    let grammar = g.build(root).unwrap();
    assert!(grammar.parse(&code_points("aaa")).unwrap().full_match);
}

#[test]
fn test_around_needs_a_consuming_item_or_separator() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let comma = g.item(',');
    let maybe_a = g.opt(a);
    let maybe_comma = g.opt(comma);
    let root = g.around(maybe_a, maybe_comma, 0, TrailingSeparator::Allow);
    let error = g.build(root).unwrap_err();
    assert_eq!(error.violations()[0].analysis, AnalysisKind::NullableRepetition);

    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let comma = g.item(',');
    let maybe_a = g.opt(a);
    let root = g.around(maybe_a, comma, 0, TrailingSeparator::Allow);
    let grammar = g.build(root).unwrap();
    assert!(grammar.parse(&code_points(",a,,")).unwrap().full_match);
}

#[test]
fn test_unreachable_nodes_are_not_checked() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let maybe = g.opt(a);
    let spinning = g.repeat(maybe, 0);
    let grammar = g.build(a).unwrap();
    assert!(!grammar.analyze().is_reachable(spinning));
}

#[test]
fn test_reports_every_problem() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let rule = g.declare("rule");
    let a = g.item('a');
    let recursive = g.seq([rule, a]);
    g.define(rule, recursive).unwrap();
    let maybe = g.opt(a);
    let spinning = g.repeat(maybe, 0);
    let root = g.choice([rule, spinning]);

    let error = g.build(root).unwrap_err();
    let kinds: Vec<AnalysisKind> = error.violations().iter().map(|v| v.analysis).collect();
    assert_eq!(
        kinds,
        vec![AnalysisKind::LeftRecursion, AnalysisKind::NullableRepetition]
    );
}

#[test]
fn test_nullability_of_builtin_nodes() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let empty = g.empty();
    let end = g.end();
    let literal = g.text("ab");
    let no_text = g.text("");
    let maybe = g.opt(a);
    let star = g.repeat(a, 0);
    let plus = g.repeat(a, 1);
    let peek = g.lookahead(a);
    let not = g.not(a);
    let both = g.seq([maybe, star]);
    let mixed = g.seq([maybe, a]);
    let either = g.choice([a, empty]);
    let root = g.seq([empty, end, literal, no_text, both, mixed, either, plus, peek, not]);
    let analysis = g.build(root).unwrap().analyze();

    for nullable in [empty, end, no_text, maybe, star, peek, not, both, either] {
        assert!(analysis.is_nullable(nullable), "{nullable} should be nullable");
    }
    for consuming in [a, literal, plus, mixed, root] {
        assert!(!analysis.is_nullable(consuming), "{consuming} should consume");
    }
}

#[test]
fn test_first_sets_stop_at_consuming_child() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let b = g.item('b');
    let c = g.item('c');
    let maybe_a = g.opt(a);
    let root = g.seq([maybe_a, b, c]);
    let analysis = g.build(root).unwrap().analyze();

    let first = analysis.first_set(root);
    assert!(first.contains(&maybe_a));
    assert!(first.contains(&a));
    assert!(first.contains(&b));
    assert!(!first.contains(&c));
}

/// Wraps a child and always succeeds, like an optional.
#[derive(Debug)]
struct Attempt(ParserId);

impl CustomParser<char, ()> for Attempt {
    fn kind(&self) -> &'static str {
        "attempt"
    }

    fn children(&self) -> SmallVec<[ParserId; 4]> {
        smallvec![self.0]
    }

    fn parse(&self, session: &mut ParseSession<'_, char, ()>) -> Result<bool, FatalError> {
        session.attempt(self.0)?;
        Ok(true)
    }
}

#[test]
fn test_custom_kind_defaults_to_opaque() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let custom = g.custom(Attempt(a));
    let root = g.repeat(custom, 0);
    let grammar = g.build(root).unwrap();

    let analysis = grammar.analyze();
    assert!(!analysis.is_nullable(custom));
    assert!(analysis.first_set(custom).contains(&a));
}

#[test]
fn test_registered_custom_rules_are_used() {
    let mut g = GrammarBuilder::<char, ()>::new();
    g.register_rules(
        "attempt",
        NodeRules {
            nullable: |_, _| true,
            ..NodeRules::opaque()
        },
    );
    let a = g.item('a');
    let custom = g.custom(Attempt(a));
    let root = g.repeat(custom, 0);
    let error = g.build(root).unwrap_err();
    assert_eq!(error.violations()[0].node, root);
}

#[test]
fn test_left_recursion_through_custom_child() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let rule = g.declare("rule");
    let wrapped = g.custom(Attempt(rule));
    let a = g.item('a');
    let body = g.seq([wrapped, a]);
    g.define(rule, body).unwrap();
    let error = g.build(rule).unwrap_err();
    assert_eq!(error.violations()[0].analysis, AnalysisKind::LeftRecursion);
}

#[test]
fn test_reference_errors() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let missing = g.declare("missing");
    assert!(matches!(
        g.build(missing),
        Err(GrammarError::UndefinedReference { name, .. }) if name == "missing"
    ));

    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let rule = g.declare("rule");
    g.define(rule, a).unwrap();
    assert!(matches!(g.define(rule, a), Err(GrammarError::Redefined { .. })));
    assert_eq!(
        g.define(a, rule),
        Err(GrammarError::NotAReference { node: a })
    );

    let mut g = GrammarBuilder::<char, ()>::new();
    let first = g.declare("first");
    let second = g.declare("second");
    g.define(first, second).unwrap();
    g.define(second, first).unwrap();
    assert!(matches!(
        g.build(first),
        Err(GrammarError::ReferenceCycle { .. })
    ));
}
