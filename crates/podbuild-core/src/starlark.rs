//! A small Starlark AST and its pretty-printer.
//!
//! Only the constructs a generated BUILD file needs are modelled: calls,
//! literals, identifiers, `+` concatenation, `name = value` assignments and
//! statement sequencing. The printer never reorders anything; output order is
//! the order nodes were built in.

use podbuild_schema::{Attr, Platform, PlatformValue};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Call { name: String, args: Vec<Arg> },
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    Ident(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    /// `a + b + c`
    Concat(Vec<Expr>),
    /// `ident = value`, used to stage values a call argument cannot build
    /// inline.
    Assign { ident: String, value: Box<Expr> },
    Comment(String),
    Lines(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

impl Arg {
    pub fn named(name: &str, value: Expr) -> Self {
        Self {
            name: Some(name.to_owned()),
            value,
        }
    }

    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }
}

impl Expr {
    pub fn call(name: &str, args: Vec<Arg>) -> Self {
        Expr::Call {
            name: name.to_owned(),
            args,
        }
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    pub fn ident(value: impl Into<String>) -> Self {
        Expr::Ident(value.into())
    }

    pub fn assign(ident: impl Into<String>, value: Expr) -> Self {
        Expr::Assign {
            ident: ident.into(),
            value: Box::new(value),
        }
    }

    pub fn str_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::List(items.into_iter().map(|s| Expr::Str(s.into())).collect())
    }

    pub fn str_dict(entries: &BTreeMap<String, String>) -> Self {
        Expr::Dict(
            entries
                .iter()
                .map(|(k, v)| (Expr::str(k.clone()), Expr::str(v.clone())))
                .collect(),
        )
    }

    /// Whether a call to `name` appears anywhere in this tree.
    pub fn contains_call(&self, name: &str) -> bool {
        match self {
            Expr::Call { name: n, args } => {
                n == name || args.iter().any(|a| a.value.contains_call(name))
            }
            Expr::List(items) | Expr::Concat(items) | Expr::Lines(items) => {
                items.iter().any(|e| e.contains_call(name))
            }
            Expr::Dict(entries) => entries
                .iter()
                .any(|(k, v)| k.contains_call(name) || v.contains_call(name)),
            Expr::Assign { value, .. } => value.contains_call(name),
            _ => false,
        }
    }

    fn is_simple(&self) -> bool {
        match self {
            Expr::Str(_) | Expr::Int(_) | Expr::Bool(_) | Expr::None | Expr::Ident(_) => true,
            Expr::List(items) => items.is_empty(),
            Expr::Dict(entries) => entries.is_empty(),
            _ => false,
        }
    }
}

/// Conversion of resolved attribute values into Starlark expressions.
pub trait ToStarlark {
    fn to_starlark(&self) -> Expr;

    /// Rendering used inside a `select` branch.
    fn to_starlark_slot(&self) -> Expr {
        self.to_starlark()
    }
}

impl ToStarlark for String {
    fn to_starlark(&self) -> Expr {
        Expr::Str(self.clone())
    }

    fn to_starlark_slot(&self) -> Expr {
        if self.is_empty() {
            Expr::None
        } else {
            self.to_starlark()
        }
    }
}

impl ToStarlark for Vec<String> {
    fn to_starlark(&self) -> Expr {
        Expr::str_list(self.iter().cloned())
    }
}

/// Sets render sorted, which keeps output reproducible.
impl ToStarlark for BTreeSet<String> {
    fn to_starlark(&self) -> Expr {
        Expr::str_list(self.iter().cloned())
    }
}

/// Uniform values render directly; per-platform values become a `select`
/// keyed by the platform config settings, iOS being the default branch.
/// Empty slots render as `None` for strings and `[]` for collections.
impl<T: ToStarlark + Attr> ToStarlark for PlatformValue<T> {
    fn to_starlark(&self) -> Expr {
        match self {
            PlatformValue::Uniform(v) => v.to_starlark(),
            PlatformValue::PerPlatform(_) => {
                select(|platform| Some(self.for_platform(platform).to_starlark_slot()))
            }
        }
    }
}

/// Build a `select()` over every platform from a per-platform renderer.
pub fn select(mut branch: impl FnMut(Platform) -> Option<Expr>) -> Expr {
    let entries = Platform::ALL
        .into_iter()
        .map(|platform| {
            (
                Expr::str(select_key(platform)),
                branch(platform).unwrap_or(Expr::None),
            )
        })
        .collect();
    Expr::call("select", vec![Arg::positional(Expr::Dict(entries))])
}

/// Name of the `config_setting` matching a platform. iOS is the default.
pub fn config_setting_name(platform: Platform) -> Option<String> {
    match platform {
        Platform::Ios => None,
        other => Some(format!("{other}Case")),
    }
}

/// A valid Starlark identifier for `raw`: characters outside
/// `[A-Za-z0-9_]` become `_`, and a leading digit gets a `_` prefix.
pub fn identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn select_key(platform: Platform) -> String {
    config_setting_name(platform).map_or_else(
        || "//conditions:default".to_owned(),
        |name| format!(":{name}"),
    )
}

/// Render one expression tree.
pub fn compile(expr: &Expr) -> String {
    let mut out = String::new();
    write_statement(&mut out, expr, 0);
    out
}

/// Render top-level groups separated by blank lines.
pub fn compile_file(groups: &[Expr]) -> String {
    groups
        .iter()
        .map(compile)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_statement(out: &mut String, expr: &Expr, indent: usize) {
    match expr {
        Expr::Lines(items) => {
            for item in items {
                write_statement(out, item, indent);
            }
        }
        Expr::Comment(text) => {
            for line in text.lines() {
                pad(out, indent);
                if line.is_empty() {
                    out.push_str("#\n");
                } else {
                    let _ = writeln!(out, "# {line}");
                }
            }
        }
        other => {
            pad(out, indent);
            write_expr(out, other, indent);
            out.push('\n');
        }
    }
}

fn write_expr(out: &mut String, expr: &Expr, indent: usize) {
    match expr {
        Expr::Str(s) => write_quoted(out, s),
        Expr::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Expr::Bool(b) => out.push_str(if *b { "True" } else { "False" }),
        Expr::None => out.push_str("None"),
        Expr::Ident(name) => out.push_str(name),
        Expr::List(items) => write_list(out, items, indent),
        Expr::Dict(entries) => write_dict(out, entries, indent),
        Expr::Concat(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push_str(" + ");
                }
                write_expr(out, part, indent);
            }
        }
        Expr::Assign { ident, value } => {
            let _ = write!(out, "{ident} = ");
            write_expr(out, value, indent);
        }
        Expr::Call { name, args } => write_call(out, name, args, indent),
        Expr::Comment(_) | Expr::Lines(_) => {
            panic!("statement node used in expression position: {expr:?}")
        }
    }
}

fn write_call(out: &mut String, name: &str, args: &[Arg], indent: usize) {
    assert!(!name.is_empty(), "function call with an empty name");

    let multiline = args.len() > 1 && args.iter().any(|a| a.name.is_some());
    out.push_str(name);
    out.push('(');
    if multiline {
        out.push('\n');
        for arg in args {
            pad(out, indent + 1);
            write_arg(out, arg, indent + 1);
            out.push_str(",\n");
        }
        pad(out, indent);
    } else {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_arg(out, arg, indent);
        }
    }
    out.push(')');
}

fn write_arg(out: &mut String, arg: &Arg, indent: usize) {
    if let Some(name) = &arg.name {
        assert!(!name.is_empty(), "named argument with an empty name");
        let _ = write!(out, "{name} = ");
    }
    write_expr(out, &arg.value, indent);
}

fn write_list(out: &mut String, items: &[Expr], indent: usize) {
    if items.is_empty() {
        out.push_str("[]");
        return;
    }
    if items.len() == 1 && items[0].is_simple() {
        out.push('[');
        write_expr(out, &items[0], indent);
        out.push(']');
        return;
    }
    out.push_str("[\n");
    for item in items {
        pad(out, indent + 1);
        write_expr(out, item, indent + 1);
        out.push_str(",\n");
    }
    pad(out, indent);
    out.push(']');
}

fn write_dict(out: &mut String, entries: &[(Expr, Expr)], indent: usize) {
    if entries.is_empty() {
        out.push_str("{}");
        return;
    }
    if entries.len() == 1 && entries[0].0.is_simple() && entries[0].1.is_simple() {
        out.push('{');
        write_expr(out, &entries[0].0, indent);
        out.push_str(": ");
        write_expr(out, &entries[0].1, indent);
        out.push('}');
        return;
    }
    out.push_str("{\n");
    for (key, value) in entries {
        pad(out, indent + 1);
        write_expr(out, key, indent + 1);
        out.push_str(": ");
        write_expr(out, value, indent + 1);
        out.push_str(",\n");
    }
    pad(out, indent);
    out.push('}');
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}

fn pad(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
}
