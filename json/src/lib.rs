//! A JSON parser built on `fixparse`, decoding to `serde_json::Value`.
//!
//! ```
//! use serde_json::json;
//!
//! let value = json::from_str(r#"{"a": [1, true, null], "b": "x"}"#).unwrap();
//! assert_eq!(value, json!({"a": [1, true, null], "b": "x"}));
//! ```

use anyhow::{anyhow, Result};
use fixparse::chars::{char, one_of, text, CharParser, ParseError};
use fixparse::{
    alt, bind, fail, fixpoint, map2, map3, map5, pure, read, Fix, FixError, List, ParserResult,
};
use log::debug;
use serde_json::{Map, Number, Value};

fn whitespace() -> CharParser<()> {
    fixpoint("whitespace", |whitespace| {
        alt(vec![
            pure(()),
            map2(|_, _| (), whitespace, one_of(" \n\r\t")),
        ])
    })
}

fn digit() -> CharParser<String> {
    one_of("0123456789").map(String::from)
}

fn onenine() -> CharParser<String> {
    one_of("123456789").map(String::from)
}

fn digits() -> CharParser<String> {
    fixpoint("digits", |digits| {
        alt(vec![
            digit(),
            map2(|a: String, b: String| a + &b, digits, digit()),
        ])
    })
}

fn integer() -> CharParser<String> {
    let join = |a: String, b: String| a + &b;
    alt(vec![
        digit(),
        map2(join, onenine(), digits()),
        map2(join, text("-"), digit()),
        map3(
            |a: String, b: String, c: String| a + &b + &c,
            text("-"),
            onenine(),
            digits(),
        ),
    ])
}

fn fraction() -> CharParser<String> {
    alt(vec![
        pure(String::new()),
        map2(|a: String, b: String| a + &b, text("."), digits()),
    ])
}

fn exponent() -> CharParser<String> {
    let sign = alt(vec![pure(String::new()), one_of("+-").map(String::from)]);
    alt(vec![
        pure(String::new()),
        map3(
            |e: char, s: String, d: String| format!("{}{}{}", e, s, d),
            one_of("Ee"),
            sign,
            digits(),
        ),
    ])
}

/// Integers without fraction or exponent stay integers when they fit. `-0`
/// has no integer spelling and keeps its sign as a float.
fn to_number(integer: String, fraction: String, exponent: String) -> CharParser<Value> {
    if fraction.is_empty() && exponent.is_empty() && integer != "-0" {
        if let Ok(n) = integer.parse::<i64>() {
            return pure(Value::from(n));
        }
        if let Ok(n) = integer.parse::<u64>() {
            return pure(Value::from(n));
        }
    }
    let literal = integer + &fraction + &exponent;
    match literal.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => pure(Value::Number(n)),
        None => fail(ParseError::new("finite number", literal)),
    }
}

fn number() -> CharParser<Value> {
    let parts = map3(
        |i: String, f: String, e: String| (i, f, e),
        integer(),
        fraction(),
        exponent(),
    );
    bind(parts, |(i, f, e)| to_number(i, f, e))
}

fn hex() -> CharParser<u16> {
    one_of("0123456789ABCDEFabcdef").map(|c| c.to_digit(16).map_or(0, |d| d as u16))
}

/// One string character as UTF-16 code units. Escapes may produce half of a
/// surrogate pair, so strings are assembled from code units.
fn character() -> CharParser<Vec<u16>> {
    let unescaped = read(|c: char| {
        if (c as u32) < 0x20 || c == '"' || c == '\\' {
            fail(ParseError::new("character", c))
        } else {
            pure(c)
        }
    })
    .map(|c| c.encode_utf16(&mut [0; 2]).to_vec());

    let simple = one_of("\"\\/bfnrt").map(|c| {
        let unescaped = match c {
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            other => other,
        };
        vec![unescaped as u16]
    });
    let unicode = map5(
        |_, a: u16, b: u16, c: u16, d: u16| vec![a << 12 | b << 8 | c << 4 | d],
        char('u'),
        hex(),
        hex(),
        hex(),
        hex(),
    );
    let escaped = map2(|_, units| units, char('\\'), alt(vec![simple, unicode]));

    alt(vec![unescaped, escaped])
}

fn string() -> CharParser<String> {
    let characters = fixpoint("characters", |characters| {
        alt(vec![
            pure(List::new()),
            map2(
                |list: List<u16>, units: Vec<u16>| units.into_iter().fold(list, |l, u| l.cons(u)),
                characters,
                character(),
            ),
        ])
    });
    let units = map3(|_, units, _| units, char('"'), characters, char('"'));
    bind(units, |units: List<u16>| {
        let mut units: Vec<u16> = units.iter().copied().collect();
        units.reverse();
        match String::from_utf16(&units) {
            Ok(s) => pure(s),
            Err(_) => fail(ParseError::new(
                "paired surrogates",
                String::from_utf16_lossy(&units),
            )),
        }
    })
}

fn to_vec<A: Clone>(list: &List<A>) -> Vec<A> {
    let mut items: Vec<A> = list.iter().cloned().collect();
    items.reverse();
    items
}

/// Parser for JSON text.
pub struct JsonParser {
    element: CharParser<Value>,
}

impl JsonParser {
    pub fn new() -> Result<Self, FixError> {
        let ws = whitespace();
        let string = string();
        let number = number();

        let mut fix = Fix::new();
        let value = fix.declare::<Value>("value");
        let element = fix.declare::<Value>("element");
        let elements = fix.declare::<List<Value>>("elements");
        let array = fix.declare::<Vec<Value>>("array");
        let member = fix.declare::<(String, Value)>("member");
        let members = fix.declare::<List<(String, Value)>>("members");
        let object = fix.declare::<Map<String, Value>>("object");

        let s = string.clone();
        fix.define(value, move |g| {
            alt(vec![
                g.get(object).map(Value::Object),
                g.get(array).map(Value::Array),
                s.clone().map(Value::String),
                number.clone(),
                text("true").map(|_| Value::Bool(true)),
                text("false").map(|_| Value::Bool(false)),
                text("null").map(|_| Value::Null),
            ])
        });

        let w = ws.clone();
        fix.define(element, move |g| {
            map3(|_, v, _| v, w.clone(), g.get(value), w.clone())
        });

        fix.define(elements, move |g| {
            alt(vec![
                g.get(element).map(|v| List::new().cons(v)),
                map3(
                    |list: List<Value>, _, v| list.cons(v),
                    g.get(elements),
                    char(','),
                    g.get(element),
                ),
            ])
        });

        let w = ws.clone();
        fix.define(array, move |g| {
            alt(vec![
                map3(|_, _, _| Vec::new(), char('['), w.clone(), char(']')),
                map3(|_, list, _| to_vec(&list), char('['), g.get(elements), char(']')),
            ])
        });

        let w = ws.clone();
        fix.define(member, move |g| {
            map5(
                |_, key, _, _, v| (key, v),
                w.clone(),
                string.clone(),
                w.clone(),
                char(':'),
                g.get(element),
            )
        });

        fix.define(members, move |g| {
            alt(vec![
                g.get(member).map(|m| List::new().cons(m)),
                map3(
                    |list: List<(String, Value)>, _, m| list.cons(m),
                    g.get(members),
                    char(','),
                    g.get(member),
                ),
            ])
        });

        fix.define(object, move |g| {
            alt(vec![
                map3(|_, _, _| Map::new(), char('{'), ws.clone(), char('}')),
                map3(
                    |_, list, _| to_vec(&list).into_iter().collect(),
                    char('{'),
                    g.get(members),
                    char('}'),
                ),
            ])
        });

        let group = fix.finish()?;
        Ok(JsonParser {
            element: group.get(element),
        })
    }

    /// Parses `input`, keeping every derivation and every error.
    pub fn parse(&self, input: &str) -> ParserResult<ParseError, Value> {
        fixparse::parse(&self.element, input.chars())
    }

    /// Parses `input` into a single value.
    pub fn to_value(&self, input: &str) -> Result<Value> {
        match self.parse(input) {
            ParserResult::Success { values } if values.len() == 1 => {
                debug!("parsed {} bytes of json", input.len());
                Ok(values.first().clone())
            }
            ParserResult::Success { values } => {
                Err(anyhow!("ambiguous json: {} derivations", values.len()))
            }
            ParserResult::Failure { errors } => match errors.head() {
                Some(error) => Err(anyhow!("invalid json: {}", error)),
                None => Err(anyhow!("invalid json: unexpected end of input")),
            },
        }
    }
}

pub fn from_str(input: &str) -> Result<Value> {
    JsonParser::new()?.to_value(input)
}
