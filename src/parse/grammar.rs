use winnow::ascii::dec_int;
use winnow::combinator::{alt, cut_err, opt, preceded, repeat, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::Value;

use super::parser::{CallExpr, ParsedChain};

// -- Whitespace -------------------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_' || c == '$'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
    )
        .take()
        .parse_next(input)
}

// -- Values -----------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    let quote = alt(('"', '\'')).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\'' => s.push('\''),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn negative_number(input: &mut &str) -> ModalResult<Value> {
    let neg_str = (
        '-',
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.'),
    )
        .take()
        .parse_next(input)?;
    if neg_str.contains('.') {
        let f: f64 = neg_str
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Float(f))
    } else {
        let i: i64 = neg_str
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Int(i))
    }
}

fn float_literal(input: &mut &str) -> ModalResult<f64> {
    // Only match floats that contain a decimal point
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        '.',
        take_while(1.., |c: char| c.is_ascii_digit()),
    )
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .parse_next(input)
}

fn value(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    alt((
        string_literal.map(Value::String),
        "true".value(Value::Bool(true)),
        "false".value(Value::Bool(false)),
        negative_number,
        float_literal.map(Value::Float),
        dec_int::<_, i64, _>.map(Value::Int),
    ))
    .context(StrContext::Expected(StrContextValue::Description("value")))
    .parse_next(input)
}

// -- Calls ------------------------------------------------------------------

fn args(input: &mut &str) -> ModalResult<Vec<Value>> {
    '('.parse_next(input)?;
    let values: Vec<Value> = separated(0.., value, (ws, ',')).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err(')')
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .parse_next(input)?;
    Ok(values)
}

fn call(input: &mut &str) -> ModalResult<CallExpr> {
    ws.parse_next(input)?;
    let method = ident
        .context(StrContext::Expected(StrContextValue::Description(
            "method name",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    let args = cut_err(args)
        .context(StrContext::Expected(StrContextValue::Description(
            "argument list",
        )))
        .parse_next(input)?;
    Ok(CallExpr {
        method: method.to_owned(),
        args,
    })
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_chain(input: &mut &str) -> ModalResult<ParsedChain> {
    ws.parse_next(input)?;
    opt('.').void().parse_next(input)?;
    let first = call.parse_next(input)?;
    let rest: Vec<CallExpr> = repeat(0.., preceded((ws, '.'), cut_err(call))).parse_next(input)?;
    ws.parse_next(input)?;

    let mut calls = vec![first];
    calls.extend(rest);
    Ok(ParsedChain { calls })
}

/// Number of calls that parse completely at the start of `input`.
pub fn leading_calls(input: &mut &str) -> usize {
    if (ws, opt('.')).void().parse_next(input).is_err() {
        return 0;
    }
    let mut count = 0;
    while call.parse_next(input).is_ok() {
        count += 1;
        if (ws, '.').void().parse_next(input).is_err() {
            break;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use crate::parse::parse;

    use super::*;

    #[test]
    fn parse_single_call() {
        let result = parse("select()").unwrap();
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].method, "select");
        assert!(result.calls[0].args.is_empty());
    }

    #[test]
    fn parse_chained_calls() {
        let result = parse(r#"select("order").where('address').is(1234)"#).unwrap();
        let methods: Vec<&str> = result.calls.iter().map(|c| c.method.as_str()).collect();
        assert_eq!(methods, vec!["select", "where", "is"]);
        assert_eq!(result.calls[1].args, vec![Value::String("address".into())]);
        assert_eq!(result.calls[2].args, vec![Value::Int(1234)]);
    }

    #[test]
    fn parse_leading_dot_and_whitespace() {
        let result = parse("  .where ( 'a' ) \n  .isNot( 2 )  ").unwrap();
        assert_eq!(result.calls.len(), 2);
        assert_eq!(result.calls[1].method, "isNot");
    }

    #[test]
    fn parse_all_value_types() {
        let result = parse(r#"f(42, 2.5, -3, -1.5, true, false, "s")"#).unwrap();
        assert_eq!(
            result.calls[0].args,
            vec![
                Value::Int(42),
                Value::Float(2.5),
                Value::Int(-3),
                Value::Float(-1.5),
                Value::Bool(true),
                Value::Bool(false),
                Value::String("s".into()),
            ]
        );
    }

    #[test]
    fn parse_string_with_escapes() {
        let result = parse(r#"f("a\"b\\c", 'it\'s')"#).unwrap();
        assert_eq!(
            result.calls[0].args,
            vec![Value::String("a\"b\\c".into()), Value::String("it's".into())]
        );
    }

    #[test]
    fn missing_parentheses_fail() {
        assert!(parse("select.where()").is_err());
    }

    #[test]
    fn unclosed_argument_list_fails() {
        assert!(parse("select(1, 2").is_err());
    }

    #[test]
    fn empty_input_fails() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn trailing_dot_fails() {
        assert!(parse("select().").is_err());
    }

    #[test]
    fn leading_calls_stops_at_the_broken_call() {
        assert_eq!(leading_calls(&mut "a(1).b(2).c("), 2);
        assert_eq!(leading_calls(&mut "a(1) b()"), 1);
        assert_eq!(leading_calls(&mut "(1)"), 0);
    }

    #[test]
    fn error_reports_call_index() {
        assert_eq!(parse(r#"where("a").is(1, ).then()"#).unwrap_err().call_index(), 1);
        assert_eq!(parse("").unwrap_err().call_index(), 0);
    }
}
