//! # Canonicalization
//!
//! Two answers that differ only in the spelling of their bound variables, or
//! in the order of the operands of a commutative operator, should be stored
//! as the same answer. [`canonicalize`] rewrites a raw tree so that such
//! answers become structurally identical.

use crate::producer::VARIABLE_SIGIL;
use crate::tree::Tree;

use indexmap::IndexMap;
use std::borrow::Cow;

/// Operators whose operand order does not matter (compared case-insensitively).
pub const COMMUTATIVE: &[&str] =
    &["and", "or", "&&", "||", "&", "=", "!=", "<=>", "iff", "+"];

pub fn is_commutative(label: &str) -> bool {
    COMMUTATIVE.iter().any(|op| op.eq_ignore_ascii_case(label))
}

/// The canonical form of a raw tree.
///
/// Operands are sorted before variables are numbered, so the numbering
/// follows the sorted order rather than the source order.
pub fn canonicalize(t: Tree) -> Tree {
    let t = sort_commutative(t);
    let mut names = IndexMap::new();
    anonymize(t, &mut names)
}

fn is_anonymous(name: &str) -> bool {
    name.strip_prefix("var")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

// `$x/T` and `var3/T` both become `var/T`.
fn masked_label(label: &str) -> Cow<'_, str> {
    let (name, ty) = match label.split_once('/') {
        Some((name, ty)) => (name, Some(ty)),
        None => (label, None),
    };
    if !name.starts_with(VARIABLE_SIGIL) && !is_anonymous(name) {
        return Cow::Borrowed(label);
    }
    match ty {
        Some(ty) => Cow::Owned(format!("var/{}", ty)),
        None => Cow::Borrowed("var"),
    }
}

// Bracket form with variable names masked
fn sort_key(t: &Tree, out: &mut String) {
    out.push('{');
    out.push_str(&masked_label(t.label()));
    for c in t.children() {
        sort_key(c, out);
    }
    out.push('}');
}

fn anonymous_label(label: &str, names: &mut IndexMap<String, usize>) -> String {
    let Some(raw) = label.strip_prefix(VARIABLE_SIGIL) else {
        return label.to_owned();
    };
    let (name, ty) = match raw.split_once('/') {
        Some((name, ty)) => (name, Some(ty)),
        None => (raw, None),
    };
    let next = names.len();
    let id = *names.entry(name.to_owned()).or_insert(next);
    match ty {
        Some(ty) => format!("var{}/{}", id, ty),
        None => format!("var{}", id),
    }
}

// Pre-order, so that numbering follows first appearance left to right.
fn anonymize(t: Tree, names: &mut IndexMap<String, usize>) -> Tree {
    let (label, children) = t.into_parts();
    let label = anonymous_label(&label, names);
    let children = children.into_iter().map(|c| anonymize(c, names)).collect();
    Tree::new(label, children)
}

fn sort_commutative(t: Tree) -> Tree {
    t.map_bottom_up(&mut |node| {
        if !is_commutative(node.label()) {
            return node;
        }
        let (label, children) = node.into_parts();
        let mut keyed: Vec<(String, Tree)> = children
            .into_iter()
            .map(|c| {
                let mut key = String::new();
                sort_key(&c, &mut key);
                (key, c)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Tree::new(label, keyed.into_iter().map(|(_, c)| c).collect())
    })
}
