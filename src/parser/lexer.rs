// Lexical helpers for the descriptor shorthand

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{char, multispace0, satisfy},
    combinator::{map, recognize, value},
    multi::many0_count,
    sequence::{delimited, pair},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Bare names: a letter or underscore, then letters, digits, `_`, `.` or `-`
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            satisfy(|c| c.is_alphabetic() || c == '_'),
            many0_count(satisfy(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))),
        )),
        String::from,
    )(input)
}

/// Double-quoted text with `\"` and `\\` escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        // escaped_transform fails on an empty body
        value(String::new(), tag("\"\"")),
        delimited(
            char('"'),
            escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", char('\\')), value("\"", char('"')))),
            ),
            char('"'),
        ),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("sales_2024 rest"), Ok((" rest", "sales_2024".to_string())));
        assert_eq!(identifier("order.total"), Ok(("", "order.total".to_string())));
        assert!(identifier("9lives").is_err());
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal(r#""unit price""#), Ok(("", "unit price".to_string())));
        assert_eq!(string_literal(r#""say \"hi\"""#), Ok(("", "say \"hi\"".to_string())));
        assert_eq!(string_literal(r#""""#), Ok(("", String::new())));
        assert!(string_literal("unquoted").is_err());
    }

    #[test]
    fn test_ws() {
        let mut parser = ws(identifier);
        assert_eq!(parser("  name  ,"), Ok((",", "name".to_string())));
    }
}
