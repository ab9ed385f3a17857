//! A very simple csv grammar that acts only on numbers.

use ebnf::{CompiledGrammar, Tree};
use pretty_assertions::assert_eq;

const CSV: &str = r#"
    csv = { record } ;
    record = fields , "\n" ;
    fields = field , [ "," , fields ] ;
    field = digit , { digit } ;
    digit = "0" | "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9" ;
"#;

fn grammar() -> CompiledGrammar {
    let _ = env_logger::builder().is_test(true).try_init();
    CompiledGrammar::new(&CSV.parse().unwrap()).unwrap()
}

fn texts<'a>(tree: &'a Tree, rule: &str) -> Vec<&'a str> {
    tree.find_all(rule).iter().map(|t| t.text.as_str()).collect()
}

#[test]
fn digit() {
    let input = "7";
    let tree = grammar().parse_tree("digit", input).unwrap();

    assert_eq!(tree.rule, "digit");
    assert_eq!(tree.text, input);
    assert!(tree.children.is_empty(), "unexpected children: {:?}", tree);
}

#[test]
fn field() {
    let input = "789";
    let tree = grammar().parse_tree("field", input).unwrap();

    assert_eq!(texts(&tree, "field"), vec![input]);
    assert_eq!(texts(&tree, "digit"), vec!["7", "8", "9"]);
}

#[test]
fn fields() {
    let input = "123,789";
    let tree = grammar().parse_tree("fields", input).unwrap();

    assert_eq!(texts(&tree, "field"), vec!["123", "789"]);
    assert_eq!(texts(&tree, "fields"), vec!["123,789", "789"]);
}

#[test]
fn record() {
    let input = "123,789\n";
    let tree = grammar().parse_tree("record", input).unwrap();

    assert_eq!(texts(&tree, "record"), vec![input]);
}

#[test]
fn csv() {
    let input = "184,754\n33,22222\n";
    let tree = grammar().parse_tree("csv", input).unwrap();

    assert_eq!(texts(&tree, "record"), vec!["184,754\n", "33,22222\n"]);
    assert_eq!(texts(&tree, "field"), vec!["184", "754", "33", "22222"]);
}

#[test]
fn missing_newline() {
    let g = grammar();
    let result = g.parse("csv", "1,2").unwrap();
    assert!(!result.is_success());

    let err = g.parse_tree("record", "1,x\n").unwrap_err();
    assert!(err.to_string().starts_with("parsing failed"), "{}", err);
}
