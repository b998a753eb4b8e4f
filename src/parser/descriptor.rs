// Descriptor shorthand: family(var, "quoted var", ...) "optional description"
//
// Several descriptors may be separated by `;`.

use super::lexer::{identifier, string_literal, ws};
use crate::descriptor::VisualizationDescriptor;
use nom::{
    branch::alt,
    character::complete::char,
    combinator::{eof, opt},
    multi::separated_list0,
    sequence::{delimited, terminated},
    IResult,
};

fn variable(input: &str) -> IResult<&str, String> {
    ws(alt((string_literal, identifier)))(input)
}

/// One descriptor; the family name is not validated here
pub fn parse_descriptor(input: &str) -> IResult<&str, VisualizationDescriptor> {
    let (input, family) = ws(identifier)(input)?;
    let (input, variables) = delimited(
        ws(char('(')),
        terminated(separated_list0(ws(char(',')), variable), opt(ws(char(',')))),
        ws(char(')')),
    )(input)?;
    let (input, description) = opt(ws(string_literal))(input)?;

    Ok((
        input,
        VisualizationDescriptor::new(family, variables).with_description(description.unwrap_or_default()),
    ))
}

/// A `;`-separated list of descriptors running to end of input
pub fn parse_descriptor_list(input: &str) -> IResult<&str, Vec<VisualizationDescriptor>> {
    let (input, list) = terminated(
        separated_list0(ws(char(';')), parse_descriptor),
        opt(ws(char(';'))),
    )(input)?;
    let (input, _) = ws(eof)(input)?;
    Ok((input, list))
}

/// Parse exactly one descriptor, rejecting trailing input
pub fn parse_one(input: &str) -> IResult<&str, VisualizationDescriptor> {
    terminated(parse_descriptor, ws(eof))(input)
}
