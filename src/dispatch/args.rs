/*!
args.rs - CLI tokens -> `RawArguments`.

Token rules:
  - `key=value`  named (split on the first `=`, last write wins)
  - anything else positional, order preserved

Value coercion, first match wins:
  1. `true` / `false` / `null`          -> bool / null (exact, case-sensitive)
  2. numeric string                     -> int, or float when it contains `.`
  3. starts with `{` or `[`             -> parsed JSON, literal string if malformed
  4. `@path`                            -> file contents when readable (invalid
                                           UTF-8 replaced), literal otherwise
  5. anything else                      -> unchanged string
*/

use serde_json::{Map, Number, Value};
use std::path::Path;

/// Outcome of an attempt to read a token as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOrLiteral {
    Parsed(Value),
    Literal(String),
}

/// Positional and named arguments of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArguments {
    pub positional: Vec<Value>,
    pub named: Map<String, Value>,
}

impl RawArguments {
    /// Split tokens on the first `=`; `@file` references resolve against `cwd`.
    pub fn parse_in<I, S>(tokens: I, cwd: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = RawArguments::default();
        for token in tokens {
            let token = token.as_ref();
            match token.split_once('=') {
                Some((key, raw)) => {
                    args.named.insert(key.to_string(), coerce_value(raw, cwd));
                }
                None => args.positional.push(coerce_value(token, cwd)),
            }
        }
        args
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Remove up to `n` positional values from the front.
    pub fn take_positional(&mut self, n: usize) -> Vec<Value> {
        let n = n.min(self.positional.len());
        self.positional.drain(..n).collect()
    }

    pub fn take_named(&mut self, key: &str) -> Option<Value> {
        self.named.remove(key)
    }

    pub fn named_keys(&self) -> Vec<String> {
        self.named.keys().cloned().collect()
    }

    /// Fill named arguments from a parameter file; values already present win.
    pub fn merge_named_defaults(&mut self, defaults: Map<String, Value>) {
        for (k, v) in defaults {
            self.named.entry(k).or_insert(v);
        }
    }
}

/// Coerce one raw token value.
pub fn coerce_value(raw: &str, cwd: &Path) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Some(n) = parse_numeric(raw) {
        return n;
    }
    if raw.starts_with('{') || raw.starts_with('[') {
        return match try_json(raw) {
            ParsedOrLiteral::Parsed(v) => v,
            ParsedOrLiteral::Literal(s) => Value::String(s),
        };
    }
    if let Some(path) = raw.strip_prefix('@')
        && let Some(contents) = read_file_reference(path, cwd)
    {
        return Value::String(contents);
    }
    Value::String(raw.to_string())
}

pub fn try_json(raw: &str) -> ParsedOrLiteral {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) => ParsedOrLiteral::Parsed(v),
        Err(_) => ParsedOrLiteral::Literal(raw.to_string()),
    }
}

fn read_file_reference(path: &str, cwd: &Path) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    let literal = Path::new(path);
    let resolved = if literal.exists() {
        literal.to_path_buf()
    } else {
        cwd.join(literal)
    };
    if !resolved.is_file() {
        return None;
    }
    let bytes = std::fs::read(&resolved).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Numeric-string test: optional leading whitespace and sign, digits with an
/// optional fraction, optional exponent. `.5` and `5.` qualify; `inf`,
/// `nan`, hex and empty strings do not.
pub fn is_numeric(raw: &str) -> bool {
    let s = raw.trim_start().trim_end_matches([' ', '\t', '\n', '\r']);
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

fn parse_numeric(raw: &str) -> Option<Value> {
    if !is_numeric(raw) {
        return None;
    }
    let s = raw.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.contains('.') {
        return s
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    // Exponent notation or out of i64 range.
    let f = s.parse::<f64>().ok()?;
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        return Some(Value::Number((f as i64).into()));
    }
    Number::from_f64(f).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coerce(raw: &str) -> Value {
        coerce_value(raw, Path::new("/nonexistent-cwd"))
    }

    #[test]
    fn literals() {
        assert_eq!(coerce("true"), json!(true));
        assert_eq!(coerce("false"), json!(false));
        assert_eq!(coerce("null"), Value::Null);
        assert_eq!(coerce("True"), json!("True"), "case-sensitive");
    }

    #[test]
    fn numbers_keep_int_float_distinction() {
        assert_eq!(coerce("42"), json!(42));
        assert!(coerce("42").is_i64());
        assert_eq!(coerce("4.2"), json!(4.2));
        assert!(coerce("4.2").is_f64());
        assert_eq!(coerce("-7"), json!(-7));
        assert_eq!(coerce("1e3"), json!(1000));
        assert_eq!(coerce(".5"), json!(0.5));
        assert_eq!(coerce("12abc"), json!("12abc"));
        assert_eq!(coerce("inf"), json!("inf"));
    }

    #[test]
    fn json_values() {
        assert_eq!(coerce(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(coerce("[1,2]"), json!([1, 2]));
        assert_eq!(coerce("{not json"), json!("{not json"), "lenient on malformed");
        assert_eq!(try_json("[oops"), ParsedOrLiteral::Literal("[oops".into()));
    }

    #[test]
    fn plain_string_unchanged() {
        assert_eq!(coerce("plain"), json!("plain"));
        assert_eq!(coerce(""), json!(""));
    }

    #[test]
    fn file_reference_reads_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.txt"), "hello\nworld").unwrap();
        let v = coerce_value("@note.txt", dir.path());
        assert_eq!(v, json!("hello\nworld"));

        let abs = dir.path().join("note.txt");
        let v = coerce_value(&format!("@{}", abs.display()), Path::new("/"));
        assert_eq!(v, json!("hello\nworld"));
    }

    #[test]
    fn binary_file_reference_is_read_lossily() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.dat"), [b'o', b'k', 0xff, 0xfe]).unwrap();
        let v = coerce_value("@bin.dat", dir.path());
        assert_eq!(v, json!("ok\u{fffd}\u{fffd}"));
    }

    #[test]
    fn integers_past_i64_stay_floats() {
        let v = coerce("9223372036854775808");
        assert!(v.is_f64());
        assert_eq!(v.as_f64(), Some(9223372036854775808.0));
        assert_eq!(coerce("9223372036854775807"), json!(i64::MAX));
        assert_eq!(coerce("-9223372036854775808"), json!(i64::MIN));
        assert_eq!(coerce("1e18"), json!(1_000_000_000_000_000_000i64));
    }

    #[test]
    fn missing_file_reference_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(coerce_value("@missing.txt", dir.path()), json!("@missing.txt"));
        assert_eq!(coerce_value("@", dir.path()), json!("@"));
    }

    #[test]
    fn tokens_split_on_first_equals() {
        let args = RawArguments::parse_in(
            ["a", "filter=x=y", "b", "n=1", "n=2", "c"],
            Path::new("/"),
        );
        assert_eq!(args.positional, vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(args.named.get("filter"), Some(&json!("x=y")));
        assert_eq!(args.named.get("n"), Some(&json!(2)), "last write wins");
        assert_eq!(args.positional.len() + args.named.len(), 5);
    }

    #[test]
    fn take_positional_from_front() {
        let mut args = RawArguments::parse_in(["1", "2", "3"], Path::new("/"));
        assert_eq!(args.take_positional(2), vec![json!(1), json!(2)]);
        assert_eq!(args.take_positional(5), vec![json!(3)]);
        assert!(args.is_empty());
    }

    #[test]
    fn param_file_values_do_not_override_cli() {
        let mut args = RawArguments::parse_in(["b=cli"], Path::new("/"));
        let file = json!({"a": 1, "b": "file"}).as_object().cloned().unwrap();
        args.merge_named_defaults(file);
        assert_eq!(args.named.get("a"), Some(&json!(1)));
        assert_eq!(args.named.get("b"), Some(&json!("cli")));
    }
}
