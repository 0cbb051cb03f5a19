use crate::{
    wire::{self, ExecuteStatement, NamedArg},
    Params, ResultsError, Statement, Value,
};

pub(crate) fn build_execute_statement(
    statement: Statement,
) -> Result<ExecuteStatement, ResultsError> {
    let want_rows = statement.wants_rows();
    let mut stmt = ExecuteStatement {
        sql: statement.sql,
        args: None,
        named_args: None,
        want_rows,
    };

    match statement.params {
        Params::Empty => {}
        Params::Positional(values) => {
            let args = values
                .into_iter()
                .map(encode_value)
                .collect::<Result<Vec<_>, _>>()?;
            stmt.args = (!args.is_empty()).then_some(args);
        }
        Params::Named(values) => {
            let named_args = values
                .into_iter()
                .map(|(name, value)| {
                    let name = normalize_named_parameter_name(&name)?;
                    let value = encode_value(value)?;
                    Ok(NamedArg { name, value })
                })
                .collect::<Result<Vec<_>, ResultsError>>()?;
            stmt.named_args = (!named_args.is_empty()).then_some(named_args);
        }
    }

    Ok(stmt)
}

/// Decodes one row, cutting text values down to `max_field_size` bytes when
/// it is non-zero.
pub(crate) fn decode_row(
    row: Vec<wire::Value>,
    max_field_size: usize,
) -> Result<Vec<Value>, ResultsError> {
    row.into_iter()
        .map(|value| {
            decode_value(value).map(|value| match value {
                Value::Text(text) if max_field_size > 0 => {
                    Value::Text(truncate_field(text, max_field_size))
                }
                other => other,
            })
        })
        .collect()
}

pub(crate) fn decode_value(value: wire::Value) -> Result<Value, ResultsError> {
    match value {
        wire::Value::Null {} => Ok(Value::Null),
        wire::Value::Integer { value } => value
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|err| ResultsError::Decode(format!("invalid integer value '{value}': {err}"))),
        wire::Value::Float { value } => value
            .parse::<f64>()
            .map_err(|err| ResultsError::Decode(format!("invalid float value '{value}': {err}")))
            .and_then(|parsed| {
                if parsed.is_finite() {
                    Ok(Value::Float(parsed))
                } else {
                    Err(ResultsError::Decode(format!(
                        "non-finite float value '{value}' is unsupported"
                    )))
                }
            }),
        wire::Value::Text { value } => Ok(Value::Text(value)),
        wire::Value::Blob { base64 } => Ok(Value::BlobBase64(base64)),
    }
}

/// First id generated by an insert of `count` rows, given the id of its last
/// row.
pub(crate) fn first_generated_id(
    last_insert_rowid: Option<&str>,
    count: u64,
    step: i64,
) -> Result<Option<i64>, ResultsError> {
    let Some(raw) = last_insert_rowid else {
        return Ok(None);
    };
    let last = raw.parse::<i64>().map_err(|err| {
        ResultsError::Decode(format!("invalid last_insert_rowid '{raw}': {err}"))
    })?;
    if count <= 1 {
        return Ok(Some(last));
    }
    let span = i64::try_from(count - 1)
        .unwrap_or(i64::MAX)
        .saturating_mul(step);
    Ok(Some(last.saturating_sub(span)))
}

fn truncate_field(mut text: String, max_field_size: usize) -> String {
    if text.len() > max_field_size {
        let mut end = max_field_size;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

fn encode_value(value: Value) -> Result<wire::Value, ResultsError> {
    match value {
        Value::Null => Ok(wire::Value::Null {}),
        Value::Integer(value) => Ok(wire::Value::Integer {
            value: value.to_string(),
        }),
        Value::Float(value) => {
            if !value.is_finite() {
                return Err(ResultsError::Decode(format!(
                    "non-finite float value '{value}' is unsupported"
                )));
            }
            Ok(wire::Value::Float {
                value: value.to_string(),
            })
        }
        Value::Text(value) => Ok(wire::Value::Text { value }),
        Value::BlobBase64(base64) => Ok(wire::Value::Blob { base64 }),
    }
}

fn normalize_named_parameter_name(name: &str) -> Result<String, ResultsError> {
    let normalized = name.trim_start_matches([':', '@', '$']);
    if normalized.is_empty() {
        return Err(ResultsError::Decode(
            "named parameter name cannot be empty".to_owned(),
        ));
    }
    Ok(normalized.to_owned())
}

#[cfg(test)]
mod tests {
    use crate::{decode, wire, ResultsError, Statement, Value};

    #[test]
    fn build_named_stmt_strips_prefix() {
        let stmt = decode::build_execute_statement(Statement::query(
            "SELECT :name",
            [(":name", Value::text("kit"))],
        ))
        .expect("must build statement");

        assert!(stmt.want_rows);
        let args = stmt.named_args.expect("must contain named args");
        assert_eq!(args[0].name, "name");
    }

    #[test]
    fn build_update_without_params() {
        let stmt = decode::build_execute_statement(Statement::update("DELETE FROM t", ()))
            .expect("must build statement");
        assert!(!stmt.want_rows);
        assert!(stmt.args.is_none());
        assert!(stmt.named_args.is_none());
    }

    #[test]
    fn build_rejects_non_finite_float() {
        let err = decode::build_execute_statement(Statement::update(
            "UPDATE t SET x = ?",
            [Value::Float(f64::NAN)],
        ))
        .expect_err("must fail");

        assert!(matches!(err, ResultsError::Decode(_)));
    }

    #[test]
    fn decode_integer_parse_error() {
        let value = wire::Value::Integer {
            value: "nope".to_owned(),
        };
        let err = decode::decode_value(value).expect_err("must fail");
        assert!(matches!(err, ResultsError::Decode(_)));
    }

    #[test]
    fn decode_row_truncates_text_on_char_boundary() {
        let row = vec![
            wire::Value::Text {
                value: "héllo".to_owned(),
            },
            wire::Value::Integer {
                value: "12345".to_owned(),
            },
        ];
        let decoded = decode::decode_row(row, 2).expect("must decode");

        assert_eq!(decoded[0], Value::text("h"));
        assert_eq!(decoded[1], Value::Integer(12345));
    }

    #[test]
    fn first_generated_id_walks_back_from_last_row() {
        assert_eq!(decode::first_generated_id(None, 3, 1).unwrap(), None);
        assert_eq!(decode::first_generated_id(Some("42"), 1, 1).unwrap(), Some(42));
        assert_eq!(decode::first_generated_id(Some("42"), 3, 1).unwrap(), Some(40));
        assert_eq!(decode::first_generated_id(Some("42"), 3, 5).unwrap(), Some(32));
        assert!(decode::first_generated_id(Some("x"), 1, 1).is_err());
    }
}
