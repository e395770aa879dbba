#![no_main]
use libfuzzer_sys::fuzz_target;
use retrace::context::{learn, recall};
use retrace::{
    AssocOperator, FailureReport, FoldArgs, Grammar, GrammarBuilder, MemoStrategy, ParseConfig,
    TrailingSeparator,
};
use std::sync::OnceLock;

/// Lists of sums and tagged blocks, memoized, so every node kind that
/// backtracks gets exercised. The parenthesized memo node is also entered
/// under a negative lookahead.
fn grammar() -> &'static Grammar<char, i64> {
    static GRAMMAR: OnceLock<Grammar<char, i64>> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        let mut g = GrammarBuilder::<char, i64>::new();
        let expr = g.declare("expr");
        let digit = g.char_range('0', '9');
        let number = g.reduce(digit, |cx| Ok(i64::from(cx.text().as_bytes()[0] - b'0')));
        let lparen = g.item('(');
        let rparen = g.item(')');
        let paren = g.seq([lparen, expr, rparen]);
        let table = g.memo_table(MemoStrategy::bounded(4));
        let paren = g.memo_in(paren, table);
        let not_paren = g.not(paren);
        let bare = g.seq([not_paren, number]);
        let atom = g.choice([bare, paren]);
        let plus = g.item('+');
        let sum = g.left_assoc(
            atom,
            vec![AssocOperator::new(plus, |args: FoldArgs<i64>| {
                Ok(args.lhs[0].wrapping_add(args.rhs[0]))
            })],
        );
        g.define(expr, sum)
            .unwrap_or_else(|e| panic!("expr is not a forward reference: {e}"));

        let letter = g.char_range('a', 'c');
        let open = learn(&mut g, letter, "tag");
        let close = recall(&mut g, "tag");
        let block = g.seq([open, expr, close]);
        let item = g.choice([block, expr]);
        let item = g.memo(item);
        let comma = g.item(',');
        let root = g.around(item, comma, 0, TrailingSeparator::Allow);
        g.build(root).unwrap_or_else(|e| panic!("fuzz grammar rejected: {e}"))
    })
}

fuzz_target!(|data: &[u8]| {
    let alphabet = ['0', '1', '9', '(', ')', '+', ',', 'a', 'b', 'c'];
    let input: Vec<char> = data
        .iter()
        .map(|b| alphabet[usize::from(*b) % alphabet.len()])
        .collect();

    let grammar = grammar();
    let memoized = grammar.parse(&input).expect("grammar has no fatal paths");
    let plain = grammar
        .parse_with(
            &input,
            ParseConfig {
                memoization: false,
                ..ParseConfig::default()
            },
        )
        .expect("grammar has no fatal paths");
    assert_eq!(memoized, plain);
    assert!(memoized.end_position <= input.len());
    assert!(memoized.furthest_failure <= input.len());
    if let Some(report) = FailureReport::new(&memoized, &input) {
        assert_eq!(report.offset, memoized.furthest_failure);
    }
});
