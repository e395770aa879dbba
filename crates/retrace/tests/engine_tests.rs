//! Node semantics, rollback and failure reporting.

use retrace::{
    AssocOperator, FatalError, FoldArgs, GrammarBuilder, ParseConfig, TrailingSeparator,
    code_points,
};

fn chars(text: &str) -> Vec<char> {
    code_points(text)
}

#[test]
fn test_sequence_matches_and_reports_furthest_failure() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let b = g.item('b');
    let c = g.item('c');
    let root = g.seq([a, b, c]);
    let grammar = g.build(root).unwrap();

    let ok = grammar.parse(&chars("abc")).unwrap();
    assert!(ok.full_match);
    assert_eq!(ok.end_position, 3);

    let failed = grammar.parse(&chars("abx")).unwrap();
    assert!(!failed.full_match);
    assert!(!failed.matched);
    assert_eq!(failed.furthest_failure, 2);
}

#[test]
fn test_repeat_with_minimum() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let root = g.repeat(a, 1);
    let grammar = g.build(root).unwrap();

    let ok = grammar.parse(&chars("aaa")).unwrap();
    assert!(ok.full_match);
    assert_eq!(ok.end_position, 3);

    let empty = grammar.parse(&chars("")).unwrap();
    assert!(!empty.matched);
}

#[test]
fn test_repeat_range_stops_at_maximum() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let root = g.repeat_range(a, 2, 3);
    let grammar = g.build(root).unwrap();

    assert!(!grammar.parse(&chars("a")).unwrap().matched);
    assert!(grammar.parse(&chars("aaa")).unwrap().full_match);
    let long = grammar.parse(&chars("aaaa")).unwrap();
    assert!(long.matched);
    assert!(!long.full_match);
    assert_eq!(long.end_position, 3);
}

#[test]
fn test_bounded_repeat_of_nullable_child_meets_minimum_on_empty_match() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let maybe_a = g.opt(a);
    let root = g.repeat_range(maybe_a, 2, 3);
    let grammar = g.build(root).unwrap();
    assert!(grammar.analyze().is_nullable(root));

    let empty = grammar.parse(&chars("")).unwrap();
    assert!(empty.full_match);
    assert_eq!(empty.end_position, 0);

    let one = grammar.parse(&chars("a")).unwrap();
    assert!(one.full_match);
    assert_eq!(one.end_position, 1);

    let long = grammar.parse(&chars("aaaa")).unwrap();
    assert!(long.matched);
    assert_eq!(long.end_position, 3);
}

fn list_grammar(trailing: TrailingSeparator) -> retrace::Grammar<char, ()> {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let comma = g.item(',');
    let root = g.around(a, comma, 0, trailing);
    g.build(root).unwrap()
}

#[test]
fn test_around_allows_trailing_separator() {
    let grammar = list_grammar(TrailingSeparator::Allow);

    let trailing = grammar.parse(&chars("a,a,")).unwrap();
    assert!(trailing.full_match);
    assert_eq!(trailing.end_position, 4);

    let lone = grammar.parse(&chars(",")).unwrap();
    assert!(!lone.full_match);
    assert_eq!(lone.end_position, 0);
    assert_eq!(lone.furthest_failure, 0);
}

#[test]
fn test_around_forbids_trailing_separator() {
    let grammar = list_grammar(TrailingSeparator::Forbid);

    assert!(grammar.parse(&chars("a,a")).unwrap().full_match);

    let dangling = grammar.parse(&chars("a,")).unwrap();
    assert!(!dangling.full_match);
    assert_eq!(dangling.end_position, 1);
    assert_eq!(dangling.furthest_failure, 2);
}

#[test]
fn test_around_requires_trailing_separator() {
    let grammar = list_grammar(TrailingSeparator::Require);

    assert!(grammar.parse(&chars("a,a,")).unwrap().full_match);
    assert!(grammar.parse(&chars("")).unwrap().full_match);
    assert!(!grammar.parse(&chars("a,a")).unwrap().matched);
}

#[test]
fn test_around_with_minimum() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let comma = g.item(',');
    let root = g.around(a, comma, 2, TrailingSeparator::Forbid);
    let grammar = g.build(root).unwrap();

    assert!(!grammar.parse(&chars("a")).unwrap().matched);
    assert!(grammar.parse(&chars("a,a")).unwrap().full_match);
}

#[test]
fn test_choice_is_ordered_and_rolls_back() {
    let mut g = GrammarBuilder::<char, String>::new();
    let a = g.item('a');
    let b = g.item('b');
    let pushed_a = g.reduce(a, |_| Ok("a".to_string()));
    let ab = g.seq([pushed_a, b]);
    let first = g.reduce(ab, |cx| Ok(format!("ab{}", cx.items().len())));
    let second = g.reduce(a, |_| Ok("just a".to_string()));
    let root = g.choice([first, second]);
    let grammar = g.build(root).unwrap();

    let result = grammar.parse(&chars("ab")).unwrap();
    assert_eq!(result.stack, vec!["ab1".to_string()]);

    // The first alternative pushes "a" before failing on 'b'; it must not leak.
    let result = grammar.parse(&chars("ac")).unwrap();
    assert!(result.matched);
    assert_eq!(result.stack, vec!["just a".to_string()]);
}

#[test]
fn test_longest_picks_the_longest_alternative() {
    let mut g = GrammarBuilder::<char, &'static str>::new();
    let short = g.text("if");
    let long = g.text("ifx");
    let short = g.reduce(short, |_| Ok("short"));
    let long = g.reduce(long, |_| Ok("long"));
    let root = g.longest([short, long]);
    let grammar = g.build(root).unwrap();

    let result = grammar.parse(&chars("ifx")).unwrap();
    assert!(result.full_match);
    assert_eq!(result.stack, vec!["long"]);

    let result = grammar.parse(&chars("if")).unwrap();
    assert_eq!(result.stack, vec!["short"]);
}

#[test]
fn test_lookahead_and_not_consume_nothing() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let b = g.item('b');
    let peek_a = g.lookahead(a);
    let not_b = g.not(b);
    let any = g.any();
    let root = g.seq([peek_a, not_b, any]);
    let grammar = g.build(root).unwrap();

    let result = grammar.parse(&chars("a")).unwrap();
    assert!(result.full_match);
    assert_eq!(result.end_position, 1);
    assert!(!grammar.parse(&chars("b")).unwrap().matched);
}

#[test]
fn test_failures_under_not_are_not_reported() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let keyword = g.text("let");
    let not_keyword = g.not(keyword);
    let any = g.any();
    let root = g.seq([not_keyword, any]);
    let grammar = g.build(root).unwrap();

    let result = grammar.parse(&chars("lex")).unwrap();
    assert!(result.matched);
    // `let` failed at offset 2 inside the negation; only the trailing input counts.
    assert_eq!(result.furthest_failure, 1);
}

#[test]
fn test_literal_failure_points_at_mismatch() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let root = g.text("hello");
    let grammar = g.build(root).unwrap();

    let result = grammar.parse(&chars("help")).unwrap();
    assert!(!result.matched);
    assert_eq!(result.furthest_failure, 3);
}

#[test]
fn test_prefix_match_without_full_match_requirement() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let root = g.text("ab");
    let grammar = g.build(root).unwrap();
    let config = ParseConfig {
        require_full_match: false,
        ..ParseConfig::default()
    };

    let result = grammar.parse_with(&chars("abc"), config).unwrap();
    assert!(result.full_match);
    assert_eq!(result.end_position, 2);

    let strict = grammar.parse(&chars("abc")).unwrap();
    assert!(!strict.full_match);
    assert_eq!(strict.furthest_failure, 2);
}

fn arithmetic(right: bool) -> retrace::Grammar<char, i64> {
    let mut g = GrammarBuilder::<char, i64>::new();
    let digit = g.char_range('0', '9');
    let number = g.reduce(digit, |cx| {
        let text = cx.text();
        text.parse::<i64>()
            .map_err(|e| FatalError::action(e.to_string()))
    });
    let minus = g.item('-');
    let caret = g.item('^');
    let rows = vec![
        AssocOperator::new(minus, |args: FoldArgs<i64>| Ok(args.lhs[0] - args.rhs[0])),
        AssocOperator::new(caret, |args: FoldArgs<i64>| {
            let exponent = u32::try_from(args.rhs[0]).map_err(|e| FatalError::action(e.to_string()))?;
            Ok(args.lhs[0].pow(exponent))
        }),
    ];
    let root = if right {
        g.right_assoc(number, rows)
    } else {
        g.left_assoc(number, rows)
    };
    g.build(root).unwrap()
}

#[test]
fn test_left_assoc_folds_left() {
    let grammar = arithmetic(false);
    let result = grammar.parse(&chars("9-3-2")).unwrap();
    assert!(result.full_match);
    assert_eq!(result.stack, vec![4]);
}

#[test]
fn test_right_assoc_folds_right() {
    let grammar = arithmetic(true);
    let result = grammar.parse(&chars("9-3-2")).unwrap();
    assert_eq!(result.stack, vec![8]);

    let result = grammar.parse(&chars("2^3^2")).unwrap();
    assert_eq!(result.stack, vec![512]);
}

#[test]
fn test_assoc_leaves_dangling_operator_unconsumed() {
    let grammar = arithmetic(false);
    let result = grammar.parse(&chars("7-")).unwrap();
    assert!(result.matched);
    assert!(!result.full_match);
    assert_eq!(result.end_position, 1);
    assert_eq!(result.stack, vec![7]);
}

#[test]
fn test_fold_receives_span() {
    let mut g = GrammarBuilder::<char, (usize, usize)>::new();
    let x = g.item('x');
    let operand = g.reduce(x, |cx| Ok((cx.span().start(), cx.span().end())));
    let plus = g.item('+');
    let root = g.left_assoc(
        operand,
        vec![AssocOperator::new(plus, |args: FoldArgs<(usize, usize)>| {
            Ok((args.span.start(), args.span.end()))
        })],
    );
    let grammar = g.build(root).unwrap();
    let result = grammar.parse(&chars("x+x+x")).unwrap();
    assert_eq!(result.stack, vec![(0, 5)]);
}

#[test]
fn test_predicate_rejects_and_rolls_back() {
    let mut g = GrammarBuilder::<char, u32>::new();
    let digit = g.char_range('0', '9');
    let value = g.reduce(digit, |cx| Ok(cx.text().parse().unwrap_or(0)));
    let small = g.predicate(value, |cx| Ok(cx.items()[0] < 5));
    let any = g.any();
    let fallback = g.reduce(any, |_| Ok(99));
    let root = g.choice([small, fallback]);
    let grammar = g.build(root).unwrap();

    assert_eq!(grammar.parse(&chars("3")).unwrap().stack, vec![3]);
    assert_eq!(grammar.parse(&chars("7")).unwrap().stack, vec![99]);
}

#[test]
fn test_consume_sees_matched_input_without_touching_stack() {
    let mut g = GrammarBuilder::<char, u8>::new();
    let seen = g.slot_with_default::<String, _>("seen", String::new);
    let word = g.text("hi");
    let marked = g.reduce(word, |_| Ok(1));
    let root = g.consume(marked, move |cx| {
        let text = cx.text();
        cx.write(&seen, text)
    });
    let grammar = g.build(root).unwrap();

    let input = chars("hi");
    let mut session = grammar.session(&input, ParseConfig::default());
    let result = session.run(root).unwrap();
    assert_eq!(result.stack, vec![1]);
    assert_eq!(session.read(&seen).unwrap().as_str(), "hi");
}

#[test]
fn test_fatal_error_is_not_backtracked() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let a = g.item('a');
    let boom = g.consume(a, |_| Err(FatalError::action("boom")));
    let also_a = g.item('a');
    let root = g.choice([boom, also_a]);
    let grammar = g.build(root).unwrap();

    assert_eq!(
        grammar.parse(&chars("a")).unwrap_err(),
        FatalError::action("boom")
    );
}

#[test]
fn test_attempt_restores_session_on_failure() {
    let mut g = GrammarBuilder::<char, u8>::new();
    let a = g.item('a');
    let b = g.item('b');
    let one = g.reduce(a, |_| Ok(1));
    let root = g.seq([one, one, b]);
    let grammar = g.build(root).unwrap();

    let input = chars("aac");
    let mut session = grammar.session(&input, ParseConfig::default());
    let before = session.snapshot();
    assert!(!session.attempt(root).unwrap());
    assert_eq!(session.snapshot(), before);
    assert!(session.stack().is_empty());
    assert_eq!(session.furthest_failure(), 2);
}

#[test]
fn test_each_run_starts_fresh() {
    let mut g = GrammarBuilder::<char, usize>::new();
    let depth = g.slot_with_default::<usize, _>("depth", || 0);
    let a = g.item('a');
    let deeper = g.consume(a, move |cx| {
        let current = *cx.read(&depth)?;
        cx.write(&depth, current + 1)
    });
    let tagged = g.reduce(deeper, move |cx| Ok(*cx.read(&depth)?));
    let items = g.repeat(tagged, 0);
    let b = g.item('b');
    let root = g.seq([items, b]);
    let grammar = g.build(root).unwrap();

    let input = chars("aac");
    let mut session = grammar.session(&input, ParseConfig::default());
    let first = session.run(root).unwrap();
    assert!(!first.matched);
    assert_eq!(first.furthest_failure, 2);

    let second = session.run(root).unwrap();
    assert_eq!(second, first);
    assert!(session.stack().is_empty());
    assert_eq!(*session.read(&depth).unwrap(), 0);

    let input = chars("aab");
    let mut session = grammar.session(&input, ParseConfig::default());
    let once = session.run(root).unwrap();
    assert_eq!(once.stack, vec![1, 2]);
    assert_eq!(session.run(root).unwrap(), once);
}

#[test]
fn test_unknown_parser_is_fatal() {
    let mut g = GrammarBuilder::<char, ()>::new();
    let root = g.empty();
    let grammar = g.build(root).unwrap();
    let input = chars("");
    let mut session = grammar.session(&input, ParseConfig::default());
    let foreign = {
        let mut other = GrammarBuilder::<char, ()>::new();
        for _ in 0..5 {
            other.empty();
        }
        other.empty()
    };
    assert_eq!(
        session.attempt(foreign),
        Err(FatalError::UnknownParser { node: foreign })
    );
}
