// cio - CLI for the Customer.io App API
// Copyright (C) 2024 The cio contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::filter::{Filter, FilterError};
use serde_json::Value;
use std::io::{self, Write};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Two-space indented JSON, optionally projected through a filter
    #[default]
    Pretty,
    /// Single-line JSON
    Plain,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("jq parse error: {0}")]
    FilterSyntax(FilterError),
    #[error("json unmarshal error: {0}")]
    Payload(serde_json::Error),
    #[error("jq error: {0}")]
    FilterEval(FilterError),
    #[error("response is not valid JSON: {0}")]
    Format(serde_json::Error),
    #[error("writing output: {0}")]
    Io(#[from] io::Error),
}

/// Request-scoped rendering settings.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub mode: OutputMode,
    pub filter: Option<String>,
}

impl OutputOptions {
    pub fn render<W: Write>(&self, out: &mut W, payload: &[u8]) -> Result<(), RenderError> {
        match self.mode {
            OutputMode::Plain => render_plain(out, payload),
            OutputMode::Pretty => render(out, payload, self.filter.as_deref()),
        }
    }
}

/// Pretty-print `payload`, or run it through `expression` and print each result.
pub fn render<W: Write>(
    out: &mut W,
    payload: &[u8],
    expression: Option<&str>,
) -> Result<(), RenderError> {
    match expression.filter(|e| !e.trim().is_empty()) {
        None => render_pretty(out, payload),
        Some(expr) => render_filtered(out, payload, expr),
    }
}

fn render_pretty<W: Write>(out: &mut W, payload: &[u8]) -> Result<(), RenderError> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value).map_err(RenderError::Format)?;
            writeln!(out, "{text}")?;
            Ok(())
        }
        Err(err) => {
            write_raw(out, payload)?;
            Err(RenderError::Format(err))
        }
    }
}

/// Compact single-line JSON. Payloads that do not parse are written unchanged.
pub fn render_plain<W: Write>(out: &mut W, payload: &[u8]) -> Result<(), RenderError> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) => {
            let text = serde_json::to_string(&value).map_err(RenderError::Format)?;
            writeln!(out, "{text}")?;
            Ok(())
        }
        Err(err) => {
            write_raw(out, payload)?;
            Err(RenderError::Format(err))
        }
    }
}

fn write_raw<W: Write>(out: &mut W, payload: &[u8]) -> io::Result<()> {
    out.write_all(payload)?;
    out.write_all(b"\n")
}

fn render_filtered<W: Write>(out: &mut W, payload: &[u8], expr: &str) -> Result<(), RenderError> {
    let filter = Filter::compile(expr).map_err(RenderError::FilterSyntax)?;
    let input: Value = serde_json::from_slice(payload).map_err(RenderError::Payload)?;
    let results = filter.run(&input).map_err(RenderError::FilterEval)?;
    debug!(filter = filter.source(), results = results.len(), "applied filter");

    let mut buffer = String::new();
    for result in &results {
        match result {
            Value::String(s) => buffer.push_str(s),
            other => buffer.push_str(
                &serde_json::to_string_pretty(other).map_err(RenderError::Format)?,
            ),
        }
        buffer.push('\n');
    }
    out.write_all(buffer.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(payload: &str, expr: Option<&str>) -> (String, Result<(), RenderError>) {
        let mut out = Vec::new();
        let result = render(&mut out, payload.as_bytes(), expr);
        (String::from_utf8(out).unwrap(), result)
    }

    #[test]
    fn pretty_prints_with_two_space_indent() {
        let (out, result) = rendered(r#"{"name":"test","count":1}"#, None);
        result.unwrap();
        assert!(out.contains("  \"name\": \"test\""));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn pretty_prints_simple_object() {
        let (out, result) = rendered(r#"{"a":1}"#, None);
        result.unwrap();
        assert_eq!(out, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn pretty_keeps_key_order() {
        let (out, _) = rendered(r#"{"z":1,"a":2}"#, None);
        assert!(out.find("\"z\"").unwrap() < out.find("\"a\"").unwrap());
    }

    #[test]
    fn empty_object_and_arrays() {
        let (out, _) = rendered("{}", None);
        assert_eq!(out.trim(), "{}");
        let (out, _) = rendered("[1,2,3]", None);
        assert!(out.contains("[\n"));
    }

    #[test]
    fn empty_expression_means_pretty() {
        let (out, result) = rendered(r#"{"a":1}"#, Some(""));
        result.unwrap();
        assert!(out.contains("\"a\": 1"));
    }

    #[test]
    fn invalid_json_is_written_raw_and_reported() {
        let (out, result) = rendered("not json", None);
        assert_eq!(out, "not json\n");
        assert!(matches!(result, Err(RenderError::Format(_))));
    }

    #[test]
    fn string_results_print_unquoted() {
        let (out, result) = rendered(r#"{"name":"hello","count":5}"#, Some(".name"));
        result.unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn numeric_and_null_results() {
        let (out, _) = rendered(r#"{"count":42}"#, Some(".count"));
        assert_eq!(out, "42\n");
        let (out, _) = rendered(r#"{"a":1}"#, Some(".missing"));
        assert_eq!(out, "null\n");
    }

    #[test]
    fn multiple_results_print_on_successive_lines() {
        let (out, result) = rendered(r#"{"items":["x","y"]}"#, Some(".items[]"));
        result.unwrap();
        assert_eq!(out, "x\ny\n");
    }

    #[test]
    fn object_results_are_indented() {
        let (out, _) = rendered(r#"{"a":{"b":1}}"#, Some(".a"));
        assert_eq!(out, "{\n  \"b\": 1\n}\n");
    }

    #[test]
    fn nested_access_and_select() {
        let (out, _) = rendered(r#"{"segments":[{"name":"vip"}]}"#, Some(".segments[0].name"));
        assert_eq!(out, "vip\n");

        let (out, result) = rendered(
            r#"{"items":[{"n":1},{"n":2},{"n":3}]}"#,
            Some("[.items[] | select(.n > 1)]"),
        );
        result.unwrap();
        assert!(out.contains("\"n\": 2"));
        assert!(out.contains("\"n\": 3"));
        assert!(!out.contains("\"n\": 1"));
    }

    #[test]
    fn invalid_expression_writes_nothing() {
        let (out, result) = rendered("{}", Some("..invalid["));
        assert!(out.is_empty());
        let err = result.unwrap_err();
        assert!(matches!(err, RenderError::FilterSyntax(_)));
        assert!(err.to_string().starts_with("jq parse error"));
    }

    #[test]
    fn invalid_payload_under_filter() {
        let (out, result) = rendered("not json", Some(".foo"));
        assert!(out.is_empty());
        let err = result.unwrap_err();
        assert!(matches!(err, RenderError::Payload(_)));
        assert!(err.to_string().starts_with("json unmarshal error"));
    }

    #[test]
    fn evaluation_error_aborts_without_partial_output() {
        let (out, result) = rendered(r#"{"items":[1,"x"]}"#, Some(".items[] | . + 1"));
        assert!(out.is_empty());
        assert!(matches!(result, Err(RenderError::FilterEval(_))));
    }

    #[test]
    fn plain_mode_is_single_line() {
        let options = OutputOptions {
            mode: OutputMode::Plain,
            filter: None,
        };
        let mut out = Vec::new();
        options
            .render(&mut out, br#"{ "a": [1, 2], "b": {"c": null} }"#)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":[1,2],\"b\":{\"c\":null}}\n");
    }

    #[test]
    fn numbers_keep_their_source_text() {
        let payload = r#"{"big":12345678901234567890123,"exp":1E2,"frac":1.50}"#;

        let (out, result) = rendered(payload, None);
        result.unwrap();
        assert!(out.contains("\"big\": 12345678901234567890123"));
        assert!(out.contains("\"exp\": 1E2"));
        assert!(out.contains("\"frac\": 1.50"));

        let mut plain = Vec::new();
        render_plain(&mut plain, payload.as_bytes()).unwrap();
        assert_eq!(String::from_utf8(plain).unwrap(), format!("{payload}\n"));

        let (out, result) = rendered(payload, Some(".big"));
        result.unwrap();
        assert_eq!(out, "12345678901234567890123\n");
    }
}
