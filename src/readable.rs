// src/readable.rs

//! Recognizers for common Church encodings and the term printer.
//!
//! The recognizers are meant for terms already in normal form. Each returns a
//! definite answer or "not this shape"; overlapping encodings are resolved
//! purely by the order in which [`Printer`] tries them.

use std::fmt::{self, Write};

use crate::ast::{grow_stack, Term, TermKind};

/// Display settings read by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Print every parenthesis instead of only the required ones.
    pub show_parens: bool,
    /// Use `λ` instead of `\`.
    pub greek_lambda: bool,
    /// Decode numerals, booleans, strings, pairs, options and lists.
    pub readable: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions { show_parens: false, greek_lambda: false, readable: true }
    }
}

impl DisplayOptions {
    /// Plain structural output.
    pub fn raw() -> Self {
        DisplayOptions { show_parens: false, greek_lambda: false, readable: false }
    }
}

// --- Recognizers ---

fn abs_parts(term: &Term) -> Option<(&str, &Term)> {
    match &term.kind {
        TermKind::Abs(param, body) => Some((param.as_str(), &**body)),
        _ => None,
    }
}

fn app_parts(term: &Term) -> Option<(&Term, &Term)> {
    match &term.kind {
        TermKind::App { left, right, .. } => Some((&**left, &**right)),
        _ => None,
    }
}

fn var_name(term: &Term) -> Option<&str> {
    match &term.kind {
        TermKind::Var(name) => Some(name.as_str()),
        _ => None,
    }
}

fn is_var_named(term: &Term, name: &str) -> bool {
    var_name(term) == Some(name)
}

/// `\x.x`
pub fn is_identity(term: &Term) -> bool {
    matches!(abs_parts(term), Some((param, body)) if is_var_named(body, param))
}

// \f.\x.<body> with f != x
fn two_binders(term: &Term) -> Option<(&str, &str, &Term)> {
    let (f, inner) = abs_parts(term)?;
    let (x, body) = abs_parts(inner)?;
    (f != x).then_some((f, x, body))
}

/// `\f.\x.f` is true, `\f.\x.x` is false.
pub fn boolean(term: &Term) -> Option<bool> {
    let (f, x, body) = two_binders(term)?;
    match var_name(body)? {
        name if name == f => Some(true),
        name if name == x => Some(false),
        _ => None,
    }
}

/// `n` for a Church numeral `\f.\x.f^n(x)`.
pub fn natural(term: &Term) -> Option<usize> {
    let (f, x, mut current) = two_binders(term)?;
    let mut n = 0;
    loop {
        if is_var_named(current, x) {
            return Some(n);
        }
        let (head, rest) = app_parts(current)?;
        if !is_var_named(head, f) {
            return None;
        }
        current = rest;
        n += 1;
    }
}

// \s.s A B
fn pair_parts(term: &Term) -> Option<(&Term, &Term)> {
    let (s, body) = abs_parts(term)?;
    let (inner, second) = app_parts(body)?;
    let (head, first) = app_parts(inner)?;
    is_var_named(head, s).then_some((first, second))
}

/// `\s.s A B`
pub fn is_pair(term: &Term) -> bool {
    pair_parts(term).is_some()
}

fn byte(term: &Term) -> Option<u8> {
    natural(term).and_then(|n| u8::try_from(n).ok())
}

// \z.\x.\y.x
fn is_string_end(term: &Term) -> bool {
    let Some((_, inner)) = abs_parts(term) else {
        return false;
    };
    let Some((x, innermost)) = abs_parts(inner) else {
        return false;
    };
    matches!(abs_parts(innermost), Some((_, body)) if is_var_named(body, x))
}

/// Nested pairs of 8-bit numerals ending in `\z.\x.\y.x`.
pub fn string_bytes(term: &Term) -> Option<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut current = term;
    loop {
        if is_string_end(current) {
            return Some(bytes);
        }
        let (head, tail) = pair_parts(current)?;
        bytes.push(byte(head)?);
        current = tail;
    }
}

pub fn is_string(term: &Term) -> bool {
    string_bytes(term).is_some()
}

// \s.s A where A is an abstraction
fn just_payload(term: &Term) -> Option<&Term> {
    let (s, body) = abs_parts(term)?;
    let (head, payload) = app_parts(body)?;
    (is_var_named(head, s) && payload.is_abs()).then_some(payload)
}

/// Option value: false-shaped `Nothing`, or `\s.s A` for `Just A`.
pub fn is_maybe(term: &Term) -> bool {
    boolean(term) == Some(false) || just_payload(term).is_some()
}

/// Elements of a foldr-encoded list `\c.\n.c A (c B n)`.
///
/// The empty list is false-shaped. A single-element list may appear
/// eta-reduced as `\c.c A`.
pub fn list_elements(term: &Term) -> Option<Vec<&Term>> {
    if boolean(term) == Some(false) {
        return Some(Vec::new());
    }
    if let Some(element) = just_payload(term) {
        return Some(vec![element]);
    }

    let (c, n, mut current) = two_binders(term)?;
    let mut elements = Vec::new();
    while let Some((cons, rest)) = app_parts(current) {
        let (head, element) = app_parts(cons)?;
        if !is_var_named(head, c) || !element.is_abs() {
            return None;
        }
        elements.push(element);
        current = rest;
    }
    is_var_named(current, n).then_some(elements)
}

pub fn is_list(term: &Term) -> bool {
    list_elements(term).is_some()
}

// --- Printer ---

/// Writes terms to a character sink according to [`DisplayOptions`].
pub struct Printer<'o> {
    options: &'o DisplayOptions,
}

impl<'o> Printer<'o> {
    pub fn new(options: &'o DisplayOptions) -> Self {
        Printer { options }
    }

    /// `most_right` is set when nothing follows the term in its enclosing
    /// expression, so a trailing abstraction needs no parentheses.
    pub fn print<W: Write>(&self, out: &mut W, term: &Term, most_right: bool) -> fmt::Result {
        grow_stack(|| self.print_node(out, term, most_right))
    }

    fn print_node<W: Write>(&self, out: &mut W, term: &Term, most_right: bool) -> fmt::Result {
        match &term.kind {
            TermKind::Var(name) | TermKind::Alias(name) => out.write_str(name),

            TermKind::Abs(param, body) => {
                if self.options.readable && self.print_readable(out, term)? {
                    return Ok(());
                }
                let parens = self.options.show_parens || !most_right;
                if parens {
                    out.write_char('(')?;
                }
                out.write_str(if self.options.greek_lambda { "\u{03BB}" } else { "\\" })?;
                out.write_str(param)?;
                out.write_char('.')?;
                self.print(out, body, true)?;
                if parens {
                    out.write_char(')')?;
                }
                Ok(())
            }

            TermKind::App { left, right, .. } => {
                let show_parens = self.options.show_parens;
                if show_parens {
                    out.write_char('(')?;
                }
                self.print(out, left, false)?;
                out.write_char(' ')?;

                let wrap_right = !show_parens && right.is_app();
                if wrap_right {
                    out.write_char('(')?;
                }
                self.print(out, right, most_right)?;
                if wrap_right {
                    out.write_char(')')?;
                }

                if show_parens {
                    out.write_char(')')?;
                }
                Ok(())
            }
        }
    }

    // Tries the decoders in priority order; returns whether one matched.
    fn print_readable<W: Write>(&self, out: &mut W, term: &Term) -> Result<bool, fmt::Error> {
        if is_identity(term) {
            out.write_char('1')?;
        } else if let Some(value) = boolean(term) {
            out.write_str(if value { "True" } else { "0" })?;
        } else if let Some(n) = natural(term) {
            write!(out, "{}", n)?;
        } else if let Some(bytes) = string_bytes(term) {
            out.write_char('"')?;
            for b in bytes {
                out.write_char(char::from(b))?;
            }
            out.write_char('"')?;
        } else if let Some((first, second)) = pair_parts(term) {
            out.write_char('(')?;
            self.print(out, first, true)?;
            out.write_str(", ")?;
            self.print(out, second, true)?;
            out.write_char(')')?;
        } else if is_maybe(term) {
            match just_payload(term) {
                Some(payload) => {
                    out.write_str("Just ")?;
                    self.print(out, payload, true)?;
                }
                None => out.write_str("Nothing")?,
            }
        } else if let Some(elements) = list_elements(term) {
            out.write_char('[')?;
            for (i, element) in elements.into_iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                self.print(out, element, true)?;
            }
            out.write_char(']')?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}
