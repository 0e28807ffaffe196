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

//! Filter expression AST

use serde_json::Value;

/// A parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `.`
    Identity,
    /// `..`
    Recurse,
    /// A constant value: number, string, `true`, `false`, `null`
    Literal(Value),
    /// String with `\(expr)` interpolations
    Template(Vec<TemplatePart>),
    /// `target[index]`, also `.foo` and `."foo"`
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `target[from:to]`
    Slice {
        target: Box<Expr>,
        from: Option<Box<Expr>>,
        to: Option<Box<Expr>>,
    },
    /// `target[]`
    Iterate(Box<Expr>),
    /// `expr?`
    Try(Box<Expr>),
    /// `[expr]` or `[]`
    Array(Option<Box<Expr>>),
    /// `{key: value, ...}`
    Object(Vec<(ObjectKey, Expr)>),
    /// `lhs | rhs`
    Pipe(Box<Expr>, Box<Expr>),
    /// `lhs, rhs`
    Comma(Box<Expr>, Box<Expr>),
    /// `lhs // rhs`
    Alternative(Box<Expr>, Box<Expr>),
    /// `lhs or rhs`
    Or(Box<Expr>, Box<Expr>),
    /// `lhs and rhs`
    And(Box<Expr>, Box<Expr>),
    /// Arithmetic and comparison
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `-expr`
    Neg(Box<Expr>),
    /// `if cond then a elif cond then b else c end`
    If {
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    /// Builtin function call
    Call(Builtin, Vec<Expr>),
}

impl Expr {
    pub fn boxed(self) -> Box<Expr> {
        Box::new(self)
    }

    /// `.name` on the identity
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Index {
            target: Expr::Identity.boxed(),
            index: Expr::Literal(Value::String(name.into())).boxed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Interpolate(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKey {
    /// `{a: ...}` or `{"a": ...}`
    Name(String),
    /// `{(expr): ...}` or an interpolated string key
    Computed(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// Builtin functions known to the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Empty,
    Not,
    Length,
    Keys,
    Values,
    Type,
    Add,
    First,
    Last,
    Reverse,
    Sort,
    Unique,
    Min,
    Max,
    ToString,
    ToNumber,
    ToJson,
    ToEntries,
    FromEntries,
    AsciiDowncase,
    AsciiUpcase,
    Any,
    All,
    Error,
    Select,
    Map,
    Has,
    FirstOf,
    SortBy,
    Join,
    Contains,
    StartsWith,
    EndsWith,
    Split,
    Range,
    RangeBetween,
    ErrorWith,
}

impl Builtin {
    /// Resolve a function by name and argument count.
    pub fn lookup(name: &str, arity: usize) -> Option<Self> {
        let builtin = match (name, arity) {
            ("empty", 0) => Builtin::Empty,
            ("not", 0) => Builtin::Not,
            ("length", 0) => Builtin::Length,
            ("keys", 0) => Builtin::Keys,
            ("values", 0) => Builtin::Values,
            ("type", 0) => Builtin::Type,
            ("add", 0) => Builtin::Add,
            ("first", 0) => Builtin::First,
            ("last", 0) => Builtin::Last,
            ("reverse", 0) => Builtin::Reverse,
            ("sort", 0) => Builtin::Sort,
            ("unique", 0) => Builtin::Unique,
            ("min", 0) => Builtin::Min,
            ("max", 0) => Builtin::Max,
            ("tostring", 0) => Builtin::ToString,
            ("tonumber", 0) => Builtin::ToNumber,
            ("tojson", 0) => Builtin::ToJson,
            ("to_entries", 0) => Builtin::ToEntries,
            ("from_entries", 0) => Builtin::FromEntries,
            ("ascii_downcase", 0) => Builtin::AsciiDowncase,
            ("ascii_upcase", 0) => Builtin::AsciiUpcase,
            ("any", 0) => Builtin::Any,
            ("all", 0) => Builtin::All,
            ("error", 0) => Builtin::Error,
            ("select", 1) => Builtin::Select,
            ("map", 1) => Builtin::Map,
            ("has", 1) => Builtin::Has,
            ("first", 1) => Builtin::FirstOf,
            ("sort_by", 1) => Builtin::SortBy,
            ("join", 1) => Builtin::Join,
            ("contains", 1) => Builtin::Contains,
            ("startswith", 1) => Builtin::StartsWith,
            ("endswith", 1) => Builtin::EndsWith,
            ("split", 1) => Builtin::Split,
            ("range", 1) => Builtin::Range,
            ("range", 2) => Builtin::RangeBetween,
            ("error", 1) => Builtin::ErrorWith,
            _ => return None,
        };
        Some(builtin)
    }
}
