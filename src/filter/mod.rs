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

//! jq-style filter language for projecting JSON responses
//!
//! Supports:
//! - `.`, `.foo.bar`, `."quoted key"`: field access
//! - `.items[0]`, `.items[-1]`, `.items[1:3]`: indexing and slices
//! - `.items[]`: iterate array elements or object values
//! - `a | b`, `a, b`, `a // b`: pipe, multiple outputs, alternative
//! - `select(cond)`, `map(f)`, `length`, `keys`, ...: builtins
//! - `[...]`, `{key: value}`, `"\(interpolation)"`: constructors
//! - `expr?`: suppress errors

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use serde_json::{Number, Value};
use thiserror::Error;

pub use ast::Expr;
pub use eval::evaluate;
pub use parser::parse;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("{message} at offset {offset}")]
    Syntax { message: String, offset: usize },
    #[error("{0}")]
    Eval(String),
}

impl FilterError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        FilterError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        FilterError::Eval(message.into())
    }
}

/// A compiled filter, ready to run against any number of inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    source: String,
    expr: Expr,
}

impl Filter {
    pub fn compile(source: &str) -> Result<Self, FilterError> {
        Ok(Self {
            source: source.to_string(),
            expr: parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate eagerly; an error anywhere discards all results.
    pub fn run(&self, input: &Value) -> Result<Vec<Value>, FilterError> {
        evaluate(&self.expr, input)
    }
}

/// Integral values become JSON integers so `1 + 1` prints `2`, not `2.0`.
pub(crate) fn number(n: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiles_once_and_runs_many_times() {
        let filter = Filter::compile(".name").unwrap();
        assert_eq!(filter.source(), ".name");
        assert_eq!(filter.run(&json!({"name": "a"})).unwrap(), vec![json!("a")]);
        assert_eq!(filter.run(&json!({"name": "b"})).unwrap(), vec![json!("b")]);
    }

    #[test]
    fn syntax_errors_carry_offsets() {
        let err = Filter::compile(".a | ]").unwrap_err();
        assert_eq!(
            err,
            FilterError::Syntax {
                message: "unexpected ']'".into(),
                offset: 5,
            }
        );
    }

    #[test]
    fn numbers_normalize_integral_floats() {
        assert_eq!(number(2.0), json!(2));
        assert_eq!(number(-3.0), json!(-3));
        assert_eq!(number(0.5), json!(0.5));
        assert_eq!(number(f64::NAN), Value::Null);
    }
}
