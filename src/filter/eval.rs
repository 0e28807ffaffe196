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

//! Filter evaluator over `serde_json::Value`
//!
//! Evaluation is eager: every expression pushes its outputs into a caller
//! supplied vector, so a failing expression keeps whatever it emitted before
//! the error (which `?` relies on).

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::FilterError;
use super::ast::{BinaryOp, Builtin, Expr, ObjectKey, TemplatePart};
use super::number;

type EvalResult = Result<(), FilterError>;

/// Run `expr` against `input`, collecting every output in order.
pub fn evaluate(expr: &Expr, input: &Value) -> Result<Vec<Value>, FilterError> {
    let mut out = Vec::new();
    run(expr, input, &mut out)?;
    Ok(out)
}

fn collect(expr: &Expr, input: &Value) -> Result<Vec<Value>, FilterError> {
    evaluate(expr, input)
}

fn run(expr: &Expr, input: &Value, out: &mut Vec<Value>) -> EvalResult {
    match expr {
        Expr::Identity => out.push(input.clone()),
        Expr::Recurse => recurse(input, out),
        Expr::Literal(value) => out.push(value.clone()),
        Expr::Template(parts) => {
            let mut rendered = vec![String::new()];
            for part in parts {
                match part {
                    TemplatePart::Text(text) => {
                        for s in rendered.iter_mut() {
                            s.push_str(text);
                        }
                    }
                    TemplatePart::Interpolate(inner) => {
                        let values = collect(inner, input)?;
                        let mut next = Vec::with_capacity(rendered.len() * values.len());
                        for prefix in &rendered {
                            for value in &values {
                                let mut s = prefix.clone();
                                s.push_str(&to_text(value));
                                next.push(s);
                            }
                        }
                        rendered = next;
                    }
                }
            }
            out.extend(rendered.into_iter().map(Value::String));
        }
        Expr::Index { target, index } => {
            let keys = collect(index, input)?;
            for container in collect(target, input)? {
                for key in &keys {
                    out.push(index_value(&container, key)?);
                }
            }
        }
        Expr::Slice { target, from, to } => {
            let froms = match from {
                Some(e) => collect(e, input)?,
                None => vec![Value::Null],
            };
            let tos = match to {
                Some(e) => collect(e, input)?,
                None => vec![Value::Null],
            };
            for container in collect(target, input)? {
                for f in &froms {
                    for t in &tos {
                        out.push(slice_value(&container, f, t)?);
                    }
                }
            }
        }
        Expr::Iterate(target) => {
            for container in collect(target, input)? {
                iterate(&container, out)?;
            }
        }
        Expr::Try(inner) => {
            // outputs produced before an error are kept
            let _ = run(inner, input, out);
        }
        Expr::Array(inner) => {
            let items = match inner {
                Some(e) => collect(e, input)?,
                None => Vec::new(),
            };
            out.push(Value::Array(items));
        }
        Expr::Object(entries) => {
            let mut objects = vec![Map::new()];
            for (key, value) in entries {
                let keys = match key {
                    ObjectKey::Name(name) => vec![name.clone()],
                    ObjectKey::Computed(e) => collect(e, input)?
                        .into_iter()
                        .map(|k| match k {
                            Value::String(s) => Ok(s),
                            other => Err(FilterError::eval(format!(
                                "object keys must be strings, got {}",
                                type_name(&other)
                            ))),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                };
                let values = collect(value, input)?;
                let mut next = Vec::with_capacity(objects.len() * keys.len() * values.len());
                for object in &objects {
                    for k in &keys {
                        for v in &values {
                            let mut o = object.clone();
                            o.insert(k.clone(), v.clone());
                            next.push(o);
                        }
                    }
                }
                objects = next;
            }
            out.extend(objects.into_iter().map(Value::Object));
        }
        Expr::Pipe(lhs, rhs) => {
            for value in collect(lhs, input)? {
                run(rhs, &value, out)?;
            }
        }
        Expr::Comma(lhs, rhs) => {
            run(lhs, input, out)?;
            run(rhs, input, out)?;
        }
        Expr::Alternative(lhs, rhs) => {
            let mut left = Vec::new();
            let _ = run(lhs, input, &mut left);
            let truthy: Vec<Value> = left.into_iter().filter(is_truthy).collect();
            if truthy.is_empty() {
                run(rhs, input, out)?;
            } else {
                out.extend(truthy);
            }
        }
        Expr::Or(lhs, rhs) => {
            for l in collect(lhs, input)? {
                if is_truthy(&l) {
                    out.push(Value::Bool(true));
                } else {
                    for r in collect(rhs, input)? {
                        out.push(Value::Bool(is_truthy(&r)));
                    }
                }
            }
        }
        Expr::And(lhs, rhs) => {
            for l in collect(lhs, input)? {
                if !is_truthy(&l) {
                    out.push(Value::Bool(false));
                } else {
                    for r in collect(rhs, input)? {
                        out.push(Value::Bool(is_truthy(&r)));
                    }
                }
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let rights = collect(rhs, input)?;
            let lefts = collect(lhs, input)?;
            for r in &rights {
                for l in &lefts {
                    out.push(binary(*op, l, r)?);
                }
            }
        }
        Expr::Neg(inner) => {
            for value in collect(inner, input)? {
                match value.as_f64() {
                    Some(n) => out.push(number(-n)),
                    None => {
                        return Err(FilterError::eval(format!(
                            "{} cannot be negated",
                            type_name(&value)
                        )));
                    }
                }
            }
        }
        Expr::If {
            branches,
            otherwise,
        } => run_if(branches, otherwise.as_deref(), input, out)?,
        Expr::Call(builtin, args) => call(*builtin, args, input, out)?,
    }
    Ok(())
}

fn run_if(
    branches: &[(Expr, Expr)],
    otherwise: Option<&Expr>,
    input: &Value,
    out: &mut Vec<Value>,
) -> EvalResult {
    let Some(((cond, body), rest)) = branches.split_first() else {
        return match otherwise {
            Some(e) => run(e, input, out),
            None => {
                out.push(input.clone());
                Ok(())
            }
        };
    };
    for c in collect(cond, input)? {
        if is_truthy(&c) {
            run(body, input, out)?;
        } else {
            run_if(rest, otherwise, input, out)?;
        }
    }
    Ok(())
}

fn recurse(value: &Value, out: &mut Vec<Value>) {
    out.push(value.clone());
    match value {
        Value::Array(items) => items.iter().for_each(|v| recurse(v, out)),
        Value::Object(map) => map.values().for_each(|v| recurse(v, out)),
        _ => {}
    }
}

fn iterate(value: &Value, out: &mut Vec<Value>) -> EvalResult {
    match value {
        Value::Array(items) => out.extend(items.iter().cloned()),
        Value::Object(map) => out.extend(map.values().cloned()),
        other => {
            return Err(FilterError::eval(format!(
                "cannot iterate over {}",
                describe(other)
            )));
        }
    }
    Ok(())
}

fn index_value(container: &Value, key: &Value) -> Result<Value, FilterError> {
    match (container, key) {
        (Value::Object(map), Value::String(k)) => Ok(map.get(k).cloned().unwrap_or(Value::Null)),
        (Value::Array(items), Value::Number(n)) => {
            let Some(idx) = n.as_f64() else {
                return Ok(Value::Null);
            };
            Ok(resolve_index(idx.floor() as i64, items.len())
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null))
        }
        (Value::Null, Value::String(_) | Value::Number(_)) => Ok(Value::Null),
        (_, Value::String(k)) => Err(FilterError::eval(format!(
            "cannot index {} with \"{k}\"",
            type_name(container)
        ))),
        _ => Err(FilterError::eval(format!(
            "cannot index {} with {}",
            type_name(container),
            type_name(key)
        ))),
    }
}

fn resolve_index(idx: i64, len: usize) -> Option<usize> {
    if idx < 0 {
        len.checked_sub(idx.unsigned_abs() as usize)
    } else {
        Some(idx as usize)
    }
}

fn slice_bound(bound: &Value, len: usize, default: usize) -> Result<usize, FilterError> {
    match bound {
        Value::Null => Ok(default),
        Value::Number(n) => {
            let raw = n.as_f64().unwrap_or(0.0).floor() as i64;
            let resolved = if raw < 0 {
                (len as i64 + raw).max(0)
            } else {
                raw
            };
            Ok((resolved as usize).min(len))
        }
        other => Err(FilterError::eval(format!(
            "slice bounds must be numbers, got {}",
            type_name(other)
        ))),
    }
}

fn slice_value(container: &Value, from: &Value, to: &Value) -> Result<Value, FilterError> {
    match container {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            let start = slice_bound(from, items.len(), 0)?;
            let end = slice_bound(to, items.len(), items.len())?;
            Ok(Value::Array(if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            }))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let start = slice_bound(from, chars.len(), 0)?;
            let end = slice_bound(to, chars.len(), chars.len())?;
            Ok(Value::String(if start < end {
                chars[start..end].iter().collect()
            } else {
                String::new()
            }))
        }
        other => Err(FilterError::eval(format!(
            "cannot slice {}",
            type_name(other)
        ))),
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, FilterError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(compare(l, r) == Ordering::Equal)),
        BinaryOp::Ne => Ok(Value::Bool(compare(l, r) != Ordering::Equal)),
        BinaryOp::Lt => Ok(Value::Bool(compare(l, r) == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(compare(l, r) != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(compare(l, r) == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(compare(l, r) != Ordering::Less)),
        BinaryOp::Add => add(l, r),
        BinaryOp::Sub => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Ok(arith(a, b, |x, y| x - y)),
            (Value::Array(a), Value::Array(b)) => Ok(Value::Array(
                a.iter()
                    .filter(|x| !b.iter().any(|y| compare(x, y) == Ordering::Equal))
                    .cloned()
                    .collect(),
            )),
            _ => Err(operand_error(op, l, r)),
        },
        BinaryOp::Mul => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Ok(arith(a, b, |x, y| x * y)),
            (Value::Object(a), Value::Object(b)) => Ok(Value::Object(deep_merge(a, b))),
            _ => Err(operand_error(op, l, r)),
        },
        BinaryOp::Div => match (l, r) {
            (Value::Number(a), Value::Number(b)) => {
                if b.as_f64() == Some(0.0) {
                    return Err(FilterError::eval(format!(
                        "{} and {} cannot be divided because the divisor is zero",
                        describe(l),
                        describe(r)
                    )));
                }
                Ok(arith(a, b, |x, y| x / y))
            }
            (Value::String(a), Value::String(b)) => Ok(split(a, b)),
            _ => Err(operand_error(op, l, r)),
        },
        BinaryOp::Rem => match (l, r) {
            (Value::Number(a), Value::Number(b)) => {
                let divisor = b.as_f64().unwrap_or(0.0) as i64;
                if divisor == 0 {
                    return Err(FilterError::eval(format!(
                        "{} and {} cannot be divided because the divisor is zero",
                        describe(l),
                        describe(r)
                    )));
                }
                let dividend = a.as_f64().unwrap_or(0.0) as i64;
                Ok(Value::from(dividend.wrapping_rem(divisor)))
            }
            _ => Err(operand_error(op, l, r)),
        },
    }
}

fn add(l: &Value, r: &Value) -> Result<Value, FilterError> {
    match (l, r) {
        (Value::Null, other) | (other, Value::Null) => Ok(other.clone()),
        (Value::Number(a), Value::Number(b)) => Ok(arith(a, b, |x, y| x + y)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut merged = a.clone();
            for (k, v) in b {
                merged.insert(k.clone(), v.clone());
            }
            Ok(Value::Object(merged))
        }
        _ => Err(operand_error(BinaryOp::Add, l, r)),
    }
}

fn arith(
    a: &serde_json::Number,
    b: &serde_json::Number,
    f: impl Fn(f64, f64) -> f64,
) -> Value {
    number(f(a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0)))
}

fn deep_merge(a: &Map<String, Value>, b: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = a.clone();
    for (k, v) in b {
        let next = match (merged.get(k), v) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(deep_merge(existing, incoming))
            }
            _ => v.clone(),
        };
        merged.insert(k.clone(), next);
    }
    merged
}

fn split(s: &str, sep: &str) -> Value {
    if s.is_empty() {
        return Value::Array(Vec::new());
    }
    if sep.is_empty() {
        return Value::Array(s.chars().map(|c| Value::String(c.to_string())).collect());
    }
    Value::Array(s.split(sep).map(|p| Value::String(p.to_string())).collect())
}

fn operand_error(op: BinaryOp, l: &Value, r: &Value) -> FilterError {
    let verb = match op {
        BinaryOp::Add => "added",
        BinaryOp::Sub => "subtracted",
        BinaryOp::Mul => "multiplied",
        BinaryOp::Div | BinaryOp::Rem => "divided",
        _ => "compared",
    };
    FilterError::eval(format!(
        "{} and {} cannot be {verb} ({})",
        describe(l),
        describe(r),
        op.symbol()
    ))
}

fn call(builtin: Builtin, args: &[Expr], input: &Value, out: &mut Vec<Value>) -> EvalResult {
    match builtin {
        Builtin::Empty => {}
        Builtin::Not => out.push(Value::Bool(!is_truthy(input))),
        Builtin::Length => out.push(length(input)?),
        Builtin::Keys => out.push(keys(input)?),
        Builtin::Values => {
            if !input.is_null() {
                out.push(input.clone());
            }
        }
        Builtin::Type => out.push(Value::String(type_name(input).to_string())),
        Builtin::Add => {
            let mut items = Vec::new();
            iterate(input, &mut items)?;
            let mut acc = Value::Null;
            for item in &items {
                acc = add(&acc, item)?;
            }
            out.push(acc);
        }
        Builtin::First => out.push(index_value(input, &Value::from(0))?),
        Builtin::Last => out.push(index_value(input, &Value::from(-1))?),
        Builtin::Reverse => out.push(match input {
            Value::Array(items) => Value::Array(items.iter().rev().cloned().collect()),
            Value::String(s) => Value::String(s.chars().rev().collect()),
            Value::Null => Value::Array(Vec::new()),
            other => {
                return Err(FilterError::eval(format!(
                    "cannot reverse {}",
                    describe(other)
                )));
            }
        }),
        Builtin::Sort => {
            let mut items = array_of(input, "sorted")?.clone();
            items.sort_by(compare);
            out.push(Value::Array(items));
        }
        Builtin::Unique => {
            let mut items = array_of(input, "sorted")?.clone();
            items.sort_by(compare);
            items.dedup_by(|a, b| compare(a, b) == Ordering::Equal);
            out.push(Value::Array(items));
        }
        Builtin::Min => {
            let items = array_of(input, "searched")?;
            out.push(items.iter().min_by(|a, b| compare(a, b)).cloned().unwrap_or(Value::Null));
        }
        Builtin::Max => {
            let items = array_of(input, "searched")?;
            out.push(items.iter().max_by(|a, b| compare(a, b)).cloned().unwrap_or(Value::Null));
        }
        Builtin::ToString => out.push(Value::String(to_text(input))),
        Builtin::ToNumber => out.push(match input {
            Value::Number(_) => input.clone(),
            Value::String(s) => s.trim().parse::<f64>().map(number).map_err(|_| {
                FilterError::eval(format!("cannot parse '{s}' as a number"))
            })?,
            other => {
                return Err(FilterError::eval(format!(
                    "{} cannot be parsed as a number",
                    describe(other)
                )));
            }
        }),
        Builtin::ToJson => out.push(Value::String(input.to_string())),
        Builtin::ToEntries => match input {
            Value::Object(map) => out.push(Value::Array(
                map.iter()
                    .map(|(k, v)| {
                        let mut entry = Map::new();
                        entry.insert("key".into(), Value::String(k.clone()));
                        entry.insert("value".into(), v.clone());
                        Value::Object(entry)
                    })
                    .collect(),
            )),
            other => {
                return Err(FilterError::eval(format!(
                    "{} has no keys",
                    describe(other)
                )));
            }
        },
        Builtin::FromEntries => out.push(from_entries(input)?),
        Builtin::AsciiDowncase => out.push(Value::String(
            string_of(input, "ascii_downcase")?.to_ascii_lowercase(),
        )),
        Builtin::AsciiUpcase => out.push(Value::String(
            string_of(input, "ascii_upcase")?.to_ascii_uppercase(),
        )),
        Builtin::Any => {
            let mut items = Vec::new();
            iterate(input, &mut items)?;
            out.push(Value::Bool(items.iter().any(is_truthy)));
        }
        Builtin::All => {
            let mut items = Vec::new();
            iterate(input, &mut items)?;
            out.push(Value::Bool(items.iter().all(is_truthy)));
        }
        Builtin::Error => return Err(raised(input)),
        Builtin::ErrorWith => {
            if let Some(message) = collect(&args[0], input)?.first() {
                return Err(raised(message));
            }
        }
        Builtin::Select => {
            for cond in collect(&args[0], input)? {
                if is_truthy(&cond) {
                    out.push(input.clone());
                }
            }
        }
        Builtin::Map => {
            let mut items = Vec::new();
            iterate(input, &mut items)?;
            let mut mapped = Vec::new();
            for item in &items {
                run(&args[0], item, &mut mapped)?;
            }
            out.push(Value::Array(mapped));
        }
        Builtin::FirstOf => {
            let mut produced = Vec::new();
            run(&args[0], input, &mut produced)?;
            if let Some(first) = produced.into_iter().next() {
                out.push(first);
            }
        }
        Builtin::SortBy => {
            let items = array_of(input, "sorted")?;
            let mut keyed = Vec::with_capacity(items.len());
            for item in items {
                keyed.push((Value::Array(collect(&args[0], item)?), item.clone()));
            }
            keyed.sort_by(|a, b| compare(&a.0, &b.0));
            out.push(Value::Array(keyed.into_iter().map(|(_, v)| v).collect()));
        }
        Builtin::Has => {
            for key in collect(&args[0], input)? {
                let found = match (input, &key) {
                    (Value::Object(map), Value::String(k)) => map.contains_key(k),
                    (Value::Array(items), Value::Number(n)) => n
                        .as_f64()
                        .is_some_and(|i| i >= 0.0 && (i as usize) < items.len()),
                    _ => {
                        return Err(FilterError::eval(format!(
                            "cannot check whether {} has a {} key",
                            type_name(input),
                            type_name(&key)
                        )));
                    }
                };
                out.push(Value::Bool(found));
            }
        }
        Builtin::Join => {
            let items = array_of(input, "joined")?;
            for sep in collect(&args[0], input)? {
                let sep = string_of(&sep, "join")?;
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(match item {
                        Value::Null => String::new(),
                        Value::String(s) => s.clone(),
                        Value::Number(_) | Value::Bool(_) => item.to_string(),
                        other => {
                            return Err(FilterError::eval(format!(
                                "cannot join with {}",
                                describe(other)
                            )));
                        }
                    });
                }
                out.push(Value::String(parts.join(sep)));
            }
        }
        Builtin::Contains => {
            for needle in collect(&args[0], input)? {
                out.push(Value::Bool(contains(input, &needle)?));
            }
        }
        Builtin::StartsWith | Builtin::EndsWith => {
            let subject = string_of(input, "startswith/endswith")?;
            for affix in collect(&args[0], input)? {
                let affix = string_of(&affix, "startswith/endswith")?;
                out.push(Value::Bool(if builtin == Builtin::StartsWith {
                    subject.starts_with(affix)
                } else {
                    subject.ends_with(affix)
                }));
            }
        }
        Builtin::Split => {
            let subject = string_of(input, "split")?;
            for sep in collect(&args[0], input)? {
                out.push(split(subject, string_of(&sep, "split")?));
            }
        }
        Builtin::Range => {
            for upto in collect(&args[0], input)? {
                range(&Value::from(0), &upto, out)?;
            }
        }
        Builtin::RangeBetween => {
            let froms = collect(&args[0], input)?;
            for upto in collect(&args[1], input)? {
                for from in &froms {
                    range(from, &upto, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Upper bound on the values a single filter run may generate with `range`.
const MAX_RANGE: usize = 10_000_000;

fn range(from: &Value, upto: &Value, out: &mut Vec<Value>) -> EvalResult {
    let (Some(start), Some(end)) = (from.as_f64(), upto.as_f64()) else {
        return Err(FilterError::eval("range bounds must be numbers"));
    };
    let span = (end - start).ceil();
    if span.is_nan() || span <= 0.0 {
        return Ok(());
    }
    if span > (MAX_RANGE - out.len().min(MAX_RANGE)) as f64 {
        return Err(FilterError::eval(format!(
            "range({start}; {end}) would produce more than {MAX_RANGE} values"
        )));
    }
    for step in 0..span as usize {
        out.push(number(start + step as f64));
    }
    Ok(())
}

fn length(value: &Value) -> Result<Value, FilterError> {
    Ok(match value {
        Value::Null => Value::from(0),
        Value::Number(n) => number(n.as_f64().unwrap_or(0.0).abs()),
        Value::String(s) => Value::from(s.chars().count()),
        Value::Array(items) => Value::from(items.len()),
        Value::Object(map) => Value::from(map.len()),
        Value::Bool(_) => {
            return Err(FilterError::eval(format!(
                "{} has no length",
                describe(value)
            )));
        }
    })
}

fn keys(value: &Value) -> Result<Value, FilterError> {
    match value {
        Value::Object(map) => {
            let mut names: Vec<&String> = map.keys().collect();
            names.sort();
            Ok(Value::Array(
                names.into_iter().map(|k| Value::String(k.clone())).collect(),
            ))
        }
        Value::Array(items) => Ok(Value::Array((0..items.len()).map(Value::from).collect())),
        other => Err(FilterError::eval(format!("{} has no keys", describe(other)))),
    }
}

fn from_entries(value: &Value) -> Result<Value, FilterError> {
    let items = array_of(value, "converted from entries")?;
    let mut map = Map::new();
    for item in items {
        let Value::Object(entry) = item else {
            return Err(FilterError::eval(format!(
                "cannot use {} as an object entry",
                describe(item)
            )));
        };
        let key = ["key", "k", "name", "Name", "Key", "K"]
            .iter()
            .find_map(|k| entry.get(*k).filter(|v| !v.is_null()))
            .cloned()
            .unwrap_or(Value::Null);
        let key = match key {
            Value::String(s) => s,
            Value::Number(_) | Value::Bool(_) => key.to_string(),
            other => {
                return Err(FilterError::eval(format!(
                    "cannot use {} as object key",
                    describe(&other)
                )));
            }
        };
        let value = ["value", "v", "Value", "V"]
            .iter()
            .find_map(|k| entry.get(*k))
            .cloned()
            .unwrap_or(Value::Null);
        map.insert(key, value);
    }
    Ok(Value::Object(map))
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, FilterError> {
    match (haystack, needle) {
        (Value::String(a), Value::String(b)) => Ok(a.contains(b.as_str())),
        (Value::Array(a), Value::Array(b)) => {
            for wanted in b {
                let mut found = false;
                for candidate in a {
                    if contains(candidate, wanted).unwrap_or(false) {
                        found = true;
                        break;
                    }
                }
                if !found {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Object(a), Value::Object(b)) => {
            for (k, wanted) in b {
                match a.get(k) {
                    Some(candidate) if contains(candidate, wanted)? => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        _ if std::mem::discriminant(haystack) == std::mem::discriminant(needle) => {
            Ok(compare(haystack, needle) == Ordering::Equal)
        }
        _ => Err(FilterError::eval(format!(
            "{} and {} cannot have their containment checked",
            describe(haystack),
            describe(needle)
        ))),
    }
}

fn raised(value: &Value) -> FilterError {
    match value {
        Value::String(s) => FilterError::eval(s.clone()),
        other => FilterError::eval(format!("{other} (not a string)")),
    }
}

fn array_of<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, FilterError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(FilterError::eval(format!(
            "{} cannot be {what}, as it is not an array",
            describe(other)
        ))),
    }
}

fn string_of<'a>(value: &'a Value, function: &str) -> Result<&'a str, FilterError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(FilterError::eval(format!(
            "{function} input must be a string, got {}",
            describe(other)
        ))),
    }
}

/// Strings as-is, everything else as compact JSON.
fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > 30 {
        let cut = (0..=27).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        text.truncate(cut);
        text.push_str("...");
    }
    format!("{} ({text})", type_name(value))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order used by comparisons and sorting:
/// null < false < true < numbers < strings < arrays < objects.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            let mut xk: Vec<&String> = x.keys().collect();
            let mut yk: Vec<&String> = y.keys().collect();
            xk.sort();
            yk.sort();
            let ord = xk.cmp(&yk);
            if ord != Ordering::Equal {
                return ord;
            }
            for k in xk {
                let ord = compare(&x[k.as_str()], &y[k.as_str()]);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}
