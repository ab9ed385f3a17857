//! Grammars that plain recursive descent can't handle: ambiguous, mutually
//! recursive and left recursive ones.

use fixparse::chars::{char, one_of, text, CharParser, ParseError};
use fixparse::{alt, fail, fixpoint, map2, map3, parse, pure, Fix, ParserResult};
use pretty_assertions::assert_eq;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn values<R: Clone>(result: &ParserResult<ParseError, R>) -> Vec<R> {
    result.values().map(|v| v.to_vec()).unwrap_or_default()
}

fn errors<R>(result: &ParserResult<ParseError, R>) -> Vec<ParseError> {
    result
        .errors()
        .map(|e| e.iter().cloned().collect())
        .unwrap_or_default()
}

fn push(mut s: String, c: char) -> String {
    s.push(c);
    s
}

fn digit() -> CharParser<i64> {
    one_of("0123456789").map(|c| i64::from(c as u8 - b'0'))
}

/// S = S S | 'a', building a bracketed derivation.
fn catalan() -> CharParser<String> {
    fixpoint("s", |s| {
        alt(vec![
            map2(|l: String, r: String| format!("({}{})", l, r), s.clone(), s),
            text("a"),
        ])
    })
}

/// E = E '+' T | T ; T = T '*' F | F ; F = digit
fn arithmetic() -> CharParser<i64> {
    let mut fix = Fix::new();
    let expr = fix.declare::<i64>("expr");
    let term = fix.declare::<i64>("term");
    fix.define(expr, move |g| {
        alt(vec![
            map3(|a, _, b| a + b, g.get(expr), char('+'), g.get(term)),
            g.get(term),
        ])
    });
    fix.define(term, move |g| {
        alt(vec![
            map3(|a, _, b| a * b, g.get(term), char('*'), digit()),
            digit(),
        ])
    });
    fix.finish().unwrap().get(expr)
}

#[test]
fn collects_trailing_letters() {
    init();
    let ba = fixpoint("ba", |ba| {
        alt(vec![
            pure(String::new()),
            map2(push, ba.clone(), char('b')),
            map2(push, ba, char('a')),
        ])
    });
    assert_eq!(values(&parse(&ba, "abba".chars())), vec!["abba"]);
    assert_eq!(values(&parse(&ba, "".chars())), vec![""]);
}

#[test]
fn left_recursion_with_empty_seed() {
    init();
    let e = fixpoint("e", |e| {
        alt(vec![pure(String::new()), map2(push, e, char('a'))])
    });

    struct TestCase {
        input: &'static str,
        out: Result<Vec<&'static str>, Vec<ParseError>>,
    }

    let tests = vec![
        TestCase {
            input: "",
            out: Ok(vec![""]),
        },
        TestCase {
            input: "a",
            out: Ok(vec!["a"]),
        },
        TestCase {
            input: "aaa",
            out: Ok(vec!["aaa"]),
        },
        TestCase {
            input: "aab",
            out: Err(vec![ParseError::new("a", "b")]),
        },
    ];

    for t in tests {
        let result = parse(&e, t.input.chars());
        match t.out {
            Ok(out) => assert_eq!(values(&result), out, "input: {:?}", t.input),
            Err(out) => assert_eq!(errors(&result), out, "input: {:?}", t.input),
        }
    }
}

#[test]
fn keeps_every_derivation() {
    init();
    let s = catalan();
    let counts: Vec<usize> = (1..=5)
        .map(|n| {
            let input = "a".repeat(n);
            values(&parse(&s, input.chars())).len()
        })
        .collect();
    assert_eq!(counts, vec![1, 1, 2, 5, 14]);

    let mut derivations = values(&parse(&s, "aaa".chars()));
    derivations.sort();
    assert_eq!(derivations, vec!["((aa)a)", "(a(aa))"]);
}

#[test]
fn ambiguous_sums() {
    init();
    let sum: CharParser<String> = fixpoint("sum", |sum| {
        alt(vec![
            map3(
                |l: String, _, r: String| format!("({}+{})", l, r),
                sum.clone(),
                char('+'),
                sum,
            ),
            one_of("0123456789").map(String::from),
        ])
    });

    let mut got = values(&parse(&sum, "1+2+3".chars()));
    got.sort();
    assert_eq!(got, vec!["((1+2)+3)", "(1+(2+3))"]);

    assert_eq!(values(&parse(&sum, "1+2+3+4".chars())).len(), 5);
}

#[test]
fn precedence_through_left_recursion() {
    init();
    let expr = arithmetic();
    let tests = vec![("7", 7), ("1+2*3", 7), ("2*3+4*5", 26), ("1*2*3*4", 24)];
    for (input, want) in tests {
        assert_eq!(values(&parse(&expr, input.chars())), vec![want], "input: {}", input);
    }

    let result = parse(&expr, "1+".chars());
    assert!(!result.is_success());
    assert_eq!(errors(&result), vec![ParseError::new("*", "+")]);
}

#[test]
fn mutual_left_recursion() {
    init();
    let mut fix = Fix::new();
    let a = fix.declare::<String>("a");
    let b = fix.declare::<String>("b");
    fix.define(a, move |g| alt(vec![map2(push, g.get(b), char('a')), text("x")]));
    fix.define(b, move |g| alt(vec![map2(push, g.get(a), char('b')), text("y")]));
    let a = fix.finish().unwrap().get(a);

    for input in &["x", "ya", "xba", "yaba", "xbaba"] {
        assert_eq!(values(&parse(&a, input.chars())), vec![input.to_string()]);
    }

    // Incomplete, nothing was rejected yet.
    let result = parse(&a, "xb".chars());
    assert!(!result.is_success());
    assert_eq!(errors(&result), vec![]);

    let result = parse(&a, "y".chars());
    assert_eq!(errors(&result), vec![]);
    assert!(!result.is_success());
}

#[test]
fn errors_in_declaration_order() {
    init();
    let p = alt(vec![char('x'), char('b'), char('c')]);
    assert_eq!(
        errors(&parse(&p, "a".chars())),
        vec![
            ParseError::new("x", "a"),
            ParseError::new("b", "a"),
            ParseError::new("c", "a"),
        ]
    );
}

#[test]
fn success_dominates_failure() {
    init();
    let nope = || fail(ParseError::new("nothing", "anything"));

    let p: CharParser<u8> = alt(vec![pure(1), nope()]);
    assert_eq!(values(&parse(&p, "".chars())), vec![1]);

    let p: CharParser<u8> = alt(vec![nope(), pure(1)]);
    assert_eq!(values(&parse(&p, "".chars())), vec![1]);

    let p: CharParser<u8> = alt(vec![nope(), fail(ParseError::new("else", "anything"))]);
    let result = parse(&p, "".chars());
    assert!(result.values().is_none());
    assert_eq!(
        errors(&result),
        vec![
            ParseError::new("nothing", "anything"),
            ParseError::new("else", "anything"),
        ]
    );
}

#[test]
fn results_enumerate_in_declaration_order() {
    init();
    let p: CharParser<&str> = alt(vec![
        char('a').map(|_| "first"),
        text("a").map(|_| "second"),
        one_of("abc").map(|_| "third"),
    ]);
    assert_eq!(values(&parse(&p, "a".chars())), vec!["first", "second", "third"]);
}

#[test]
fn groups_can_be_shared_between_parses() {
    init();
    let expr = arithmetic();
    // The same parser, used as a building block twice in one grammar.
    let pair = map3(|a, _, b| (a, b), expr.clone(), char(';'), expr);
    assert_eq!(values(&parse(&pair, "1+2;3*4".chars())), vec![(3, 12)]);
}
