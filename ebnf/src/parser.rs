use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{alpha1, alphanumeric1, multispace0},
    combinator::{map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};

use crate::{Grammar, Identifier, Lhs, Production, Rhs, Terminal};

/// Matches `s` after any amount of whitespace.
fn symbol<'a>(s: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(multispace0, tag(s))
}

pub fn terminal(input: &str) -> IResult<&str, Terminal> {
    let (rem, matched) = alt((
        delimited(tag("\""), take_until("\""), tag("\"")),
        delimited(tag("\'"), take_until("\'"), tag("\'")),
    ))(input)?;
    Ok((rem, Terminal(matched.to_owned())))
}

pub fn identifier(input: &str) -> IResult<&str, Identifier> {
    let (rem, matched) = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)?;
    Ok((rem, Identifier(matched.to_owned())))
}

pub fn lhs(input: &str) -> IResult<&str, Lhs> {
    let (rem, matched) = identifier(input)?;
    Ok((rem, Lhs(matched)))
}

/// Parses a rhs. Operators bind, loosest first: `|`, `,`, `-`. Chains of
/// the same operator nest to the right.
pub fn rhs(input: &str) -> IResult<&str, Rhs> {
    alternation(input)
}

pub fn production(input: &str) -> IResult<&str, Production> {
    let (rem, (lhs, rhs)) = terminated(
        separated_pair(preceded(multispace0, lhs), symbol("="), rhs),
        symbol(";"),
    )(input)?;
    Ok((rem, Production { lhs, rhs }))
}

pub fn grammar(input: &str) -> IResult<&str, Grammar> {
    let (rem, rules) = terminated(many0(production), multispace0)(input)?;
    Ok((rem, Grammar { rules }))
}

fn binary(first: Rhs, rest: Option<Rhs>, op: fn(Box<Rhs>, Box<Rhs>) -> Rhs) -> Rhs {
    match rest {
        Some(rest) => op(Box::new(first), Box::new(rest)),
        None => first,
    }
}

fn alternation(input: &str) -> IResult<&str, Rhs> {
    let (rem, (first, rest)) =
        pair(concatenation, opt(preceded(symbol("|"), alternation)))(input)?;
    Ok((rem, binary(first, rest, Rhs::Alternation)))
}

fn concatenation(input: &str) -> IResult<&str, Rhs> {
    let (rem, (first, rest)) = pair(exception, opt(preceded(symbol(","), concatenation)))(input)?;
    Ok((rem, binary(first, rest, Rhs::Concatenation)))
}

fn exception(input: &str) -> IResult<&str, Rhs> {
    let (rem, (first, rest)) = pair(primary, opt(preceded(symbol("-"), exception)))(input)?;
    Ok((rem, binary(first, rest, Rhs::Exception)))
}

fn primary(input: &str) -> IResult<&str, Rhs> {
    preceded(
        multispace0,
        alt((
            rhs_group,
            rhs_repetition,
            rhs_optional,
            map(terminal, Rhs::Terminal),
            map(identifier, Rhs::Identifier),
        )),
    )(input)
}

fn rhs_group(input: &str) -> IResult<&str, Rhs> {
    delimited(tag("("), rhs, symbol(")"))(input)
}

fn rhs_repetition(input: &str) -> IResult<&str, Rhs> {
    let (rem, inner) = delimited(tag("{"), rhs, symbol("}"))(input)?;
    Ok((rem, Rhs::Repeat(Box::new(inner))))
}

fn rhs_optional(input: &str) -> IResult<&str, Rhs> {
    let (rem, inner) = delimited(tag("["), rhs, symbol("]"))(input)?;
    Ok((rem, Rhs::Optional(Box::new(inner))))
}
