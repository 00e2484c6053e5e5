use nom::combinator::complete;
use nom::error::ParseError;
use nom::multi::many0;
use nom::{Input, Parser};

/// Applies the parser zero or more times until the input is exhausted,
/// treating incomplete input as end-of-input.
pub fn many0_complete<I, O, E, F>(parser: F) -> impl Parser<I, Output = Vec<O>, Error = E>
where
    I: Clone + Input,
    E: ParseError<I>,
    F: Parser<I, Output = O, Error = E>,
{
    many0(complete(parser))
}
