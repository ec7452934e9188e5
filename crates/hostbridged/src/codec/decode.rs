//! Tolerant parser for JSON-like request bodies.

use std::str::Chars;

use super::value::{Map, Number, Value};

/// Deepest container nesting decoded structurally. Deeper containers are
/// kept as their raw text.
pub const MAX_DEPTH: usize = 64;

/// Decodes an object body into a [`Map`].
///
/// Text that does not start with `{` after trimming yields an empty map.
/// Members are split on top-level commas and then at their first top-level
/// colon; members without a colon are skipped.
#[must_use]
pub fn decode_map(text: &str) -> Map {
    decode_map_at(text, 0)
}

/// Decodes a single value.
///
/// Recognises `null`, `true` and `false`, quoted strings, objects, lists, and
/// numbers. Anything else is returned as the trimmed raw text, as are
/// containers nested more than [`MAX_DEPTH`] levels deep.
#[must_use]
pub fn decode_value(text: &str) -> Value {
    decode_value_at(text, 0)
}

fn decode_map_at(text: &str, depth: usize) -> Map {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix('{') else {
        return Map::new();
    };
    let body = inner.strip_suffix('}').unwrap_or(inner);

    let mut map = Map::new();
    for member in split_top_level(body, ',') {
        let Some(colon) = top_level_positions(member, ':').first().copied() else {
            continue;
        };
        let Some((raw_key, rest)) = member.split_at_checked(colon) else {
            continue;
        };
        let raw_value = rest.strip_prefix(':').unwrap_or(rest);
        map.insert(decode_key(raw_key), decode_value_at(raw_value, depth + 1));
    }
    map
}

fn decode_value_at(text: &str, depth: usize) -> Value {
    let trimmed = text.trim();
    match trimmed {
        "" | "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Some(inner) = quoted_inner(trimmed) {
        return Value::String(unescape(inner));
    }
    let is_container = trimmed.starts_with('{') || trimmed.starts_with('[');
    if is_container && depth >= MAX_DEPTH {
        return Value::String(trimmed.to_owned());
    }
    if trimmed.starts_with('{') {
        return Value::Map(decode_map_at(trimmed, depth));
    }
    if let Some(inner) = trimmed.strip_prefix('[') {
        let body = inner.strip_suffix(']').unwrap_or(inner);
        let items = split_top_level(body, ',')
            .into_iter()
            .map(|item| decode_value_at(item, depth + 1))
            .collect();
        return Value::List(items);
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(Number::Int(int));
    }
    if looks_numeric(trimmed)
        && let Ok(float) = trimmed.parse::<f64>()
        && float.is_finite()
    {
        return Value::Number(Number::Float(float));
    }
    Value::String(trimmed.to_owned())
}

fn decode_key(raw: &str) -> String {
    let trimmed = raw.trim();
    quoted_inner(trimmed).map_or_else(|| trimmed.to_owned(), unescape)
}

fn quoted_inner(text: &str) -> Option<&str> {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
}

// `str::parse::<f64>` accepts words such as `inf` and `NaN`; those stay text.
fn looks_numeric(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|first| first.is_ascii_digit() || matches!(first, '-' | '+' | '.'))
}

/// Splits `body` on top-level occurrences of `delimiter`, dropping blank parts.
fn split_top_level(body: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for position in top_level_positions(body, delimiter) {
        parts.extend(body.get(start..position));
        start = position + delimiter.len_utf8();
    }
    parts.extend(body.get(start..));
    parts.retain(|part| !part.trim().is_empty());
    parts
}

/// Byte offsets of `delimiter` outside strings and nested brackets.
fn top_level_positions(text: &str, delimiter: char) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            _ if ch == delimiter && depth == 0 => positions.push(index),
            _ => {}
        }
    }
    positions
}

fn unescape(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => output.push('"'),
            Some('\\') => output.push('\\'),
            Some('/') => output.push('/'),
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('t') => output.push('\t'),
            Some('b') => output.push('\u{8}'),
            Some('f') => output.push('\u{c}'),
            Some('u') => push_unicode_escape(&mut chars, &mut output),
            Some(other) => {
                output.push('\\');
                output.push(other);
            }
            None => output.push('\\'),
        }
    }
    output
}

fn push_unicode_escape(chars: &mut Chars<'_>, output: &mut String) {
    let Some(unit) = read_hex4(chars) else {
        output.push_str("\\u");
        return;
    };

    if (0xD800..0xDC00).contains(&unit) {
        let mut lookahead = chars.clone();
        if lookahead.next() == Some('\\')
            && lookahead.next() == Some('u')
            && let Some(low) = read_hex4(&mut lookahead)
            && (0xDC00..0xE000).contains(&low)
        {
            *chars = lookahead;
            let combined = 0x1_0000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
            output.push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
            return;
        }
    }
    output.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
}

fn read_hex4(chars: &mut Chars<'_>) -> Option<u32> {
    let mut lookahead = chars.clone();
    let mut unit = 0_u32;
    for _ in 0..4 {
        let digit = lookahead.next()?.to_digit(16)?;
        unit = unit * 16 + digit;
    }
    *chars = lookahead;
    Some(unit)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::super::encode;
    use super::*;

    #[rstest]
    #[case::plain_text("hello")]
    #[case::array("[1,2]")]
    #[case::empty("")]
    #[case::whitespace("   ")]
    #[case::unterminated_string("\"tool")]
    fn non_object_input_yields_empty_map(#[case] text: &str) {
        assert!(decode_map(text).is_empty());
    }

    #[test]
    fn decodes_tool_request_body() {
        let map = decode_map(r#"{"tool":"echo","arguments":{"message":"hi"}}"#);
        assert_eq!(map.get_str("tool"), Some("echo"));
        let arguments = map.get_map("arguments").expect("arguments map");
        assert_eq!(arguments.get_str("message"), Some("hi"));
    }

    #[test]
    fn structural_characters_inside_strings_are_ignored() {
        let map = decode_map(r#"{"text":"a, b: {c} [d] \"e\"","n":1}"#);
        assert_eq!(map.get_str("text"), Some(r#"a, b: {c} [d] "e""#));
        assert_eq!(map.get_i64("n"), Some(1));
    }

    #[test]
    fn members_without_colon_are_skipped() {
        let map = decode_map(r#"{"a":1, junk ,"b":2}"#);
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn duplicate_keys_keep_the_last_value() {
        let map = decode_map(r#"{"a":1,"a":2}"#);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_i64("a"), Some(2));
    }

    #[rstest]
    #[case::null("null", Value::Null)]
    #[case::truthy(" true ", Value::Bool(true))]
    #[case::falsy("false", Value::Bool(false))]
    #[case::int("42", Value::from(42))]
    #[case::negative("-7", Value::from(-7))]
    #[case::float("2.5", Value::from(2.5))]
    #[case::integral_float("3.0", Value::from(3.0))]
    #[case::exponent("1e3", Value::from(1000.0))]
    #[case::overflowing_int("99999999999999999999", Value::from(1e20))]
    #[case::bare_word("hello", Value::from("hello"))]
    #[case::capitalised_literal("True", Value::from("True"))]
    #[case::not_a_number("NaN", Value::from("NaN"))]
    #[case::infinity("inf", Value::from("inf"))]
    fn decodes_scalars(#[case] text: &str, #[case] expected: Value) {
        assert_eq!(decode_value(text), expected);
    }

    #[test]
    fn unescapes_strings() {
        let value = decode_value(r#""line\nquote\"slash\/tab\tuni\u00e9pair\ud83d\ude00""#);
        assert_eq!(value, Value::from("line\nquote\"slash/tab\tuniépair😀"));
    }

    #[test]
    fn decodes_nested_lists() {
        let value = decode_value(r#"[1, "two", [3, {"four": 4}], null]"#);
        let expected = Value::List(vec![
            Value::from(1),
            Value::from("two"),
            Value::List(vec![
                Value::from(3),
                Value::from(Map::new().with("four", 4)),
            ]),
            Value::Null,
        ]);
        assert_eq!(value, expected);
    }

    #[test]
    fn deeply_nested_input_degrades_to_text() {
        let depth = 100_000;
        let body = format!(
            r#"{{"tool":"echo","arguments":{{"a":{}{}}}}}"#,
            "[".repeat(depth),
            "]".repeat(depth)
        );
        let map = decode_map(&body);
        assert_eq!(map.get_str("tool"), Some("echo"));
        let mut cursor = map.get_map("arguments").and_then(|arguments| arguments.get("a"));
        let mut levels = 0;
        while let Some(Value::List(items)) = cursor {
            levels += 1;
            cursor = items.first();
        }
        assert_eq!(levels, MAX_DEPTH - 2);
        assert!(matches!(cursor, Some(Value::String(text)) if text.starts_with("[[")));
    }

    #[test]
    fn nesting_within_the_limit_is_decoded() {
        let depth = MAX_DEPTH - 2;
        let text = format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        let mut cursor = Some(decode_value(&text));
        let mut levels = 0;
        while let Some(Value::List(items)) = cursor {
            levels += 1;
            cursor = items.into_iter().next();
        }
        assert_eq!(levels, depth);
        assert_eq!(cursor, Some(Value::from(1)));
    }

    #[test]
    fn round_trips_nested_values() {
        let value = Value::from(
            Map::new()
                .with("name", "Main Camera")
                .with("count", 3)
                .with("scale", 1.0)
                .with("ratio", 0.25)
                .with("flags", Value::List(vec![Value::from(true), Value::Null]))
                .with("escaped", "quote \" comma , brace } newline \n")
                .with("nested", Map::new().with("inner", Value::List(Vec::new())))
                .with("empty", Map::new()),
        );
        assert_eq!(decode_value(&encode(&value)), value);
    }
}
