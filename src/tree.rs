//! # Expression trees
//!
//! This module defines the labeled, ordered trees that every other part of
//! the crate works on. A tree owns its children outright; there are no parent
//! pointers. Algorithms that need parent or position information build a
//! [`PostOrder`] index over a borrowed tree instead.
//!
//! Trees have a textual bracket form, `{label{child}{child}}`, which is used
//! both as the canonical comparison key for commutative sorting and as the
//! serialized form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The label of the synthetic node that wraps every stored answer.
pub const ROOT_LABEL: &str = "root";

/// A child-index path from the root of a tree (the empty path is the root).
pub type Path = Vec<usize>;

////////////////////////////////////////////////////////////////////////////////
// Trees

/// A labeled, ordered tree.
///
/// Equality, ordering and hashing are structural. The label is never empty.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Tree {
    label: String,
    children: Vec<Tree>,
}

impl Tree {
    pub fn new(label: impl Into<String>, children: Vec<Tree>) -> Self {
        let label = label.into();
        debug_assert!(!label.is_empty(), "tree labels must be nonempty");
        Tree { label, children }
    }

    pub fn leaf(label: impl Into<String>) -> Self {
        Self::new(label, vec![])
    }

    /// Wraps the given top-level expressions in a synthetic root node.
    pub fn root(children: Vec<Tree>) -> Self {
        Self::new(ROOT_LABEL, children)
    }

    /// The tree of the empty answer: a bare synthetic root.
    pub fn empty() -> Self {
        Self::root(vec![])
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn children(&self) -> &[Tree] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Tree::node_count).sum::<usize>()
    }

    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Returns the subtree at the given path, if any.
    pub fn get(&self, path: &[usize]) -> Option<&Tree> {
        match path.split_first() {
            None => Some(self),
            Some((i, rest)) => self.children.get(*i)?.get(rest),
        }
    }

    pub fn into_parts(self) -> (String, Vec<Tree>) {
        (self.label, self.children)
    }

    pub(crate) fn get_mut(&mut self, path: &[usize]) -> Option<&mut Tree> {
        match path.split_first() {
            None => Some(self),
            Some((i, rest)) => self.children.get_mut(*i)?.get_mut(rest),
        }
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Tree> {
        &mut self.children
    }

    /// Rebuilds the tree bottom-up, applying `f` to every node after its
    /// children have been rebuilt.
    pub fn map_bottom_up(self, f: &mut impl FnMut(Tree) -> Tree) -> Tree {
        let Tree { label, children } = self;
        let children =
            children.into_iter().map(|c| c.map_bottom_up(f)).collect();
        f(Tree { label, children })
    }

    /// A colored, indented rendering of the tree for terminal output.
    pub fn pretty(&self) -> termtree::Tree<String> {
        use ansi_term::Color::*;

        let mut gp = termtree::GlyphPalette::new();
        gp.item_indent = "─";
        gp.skip_indent = " ";
        gp.middle_item = Fixed(8).paint(gp.middle_item).to_string().leak();
        gp.last_item = Fixed(8).paint(gp.last_item).to_string().leak();
        gp.item_indent = Fixed(8).paint(gp.item_indent).to_string().leak();
        gp.middle_skip = Fixed(8).paint(gp.middle_skip).to_string().leak();
        gp.last_skip = Fixed(8).paint(gp.last_skip).to_string().leak();
        gp.skip_indent = Fixed(8).paint(gp.skip_indent).to_string().leak();

        self.termtree(gp)
    }

    fn termtree(&self, gp: termtree::GlyphPalette) -> termtree::Tree<String> {
        use ansi_term::Color::*;

        let head = if self.is_leaf() {
            format!("{} {}", Purple.paint("•"), Yellow.paint(self.label.as_str()))
        } else {
            format!("{} {}", Green.paint("•"), Green.paint(self.label.as_str()))
        };
        let mut t = termtree::Tree::new(head).with_glyphs(gp);
        for child in &self.children {
            t.push(child.termtree(gp));
        }
        t
    }
}

fn escape_label(label: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for c in label.chars() {
        if matches!(c, '{' | '}' | '\\') {
            write!(f, "\\")?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        escape_label(&self.label, f)?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "}}")
    }
}

impl std::str::FromStr for Tree {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse::tree(s)
    }
}

impl TryFrom<String> for Tree {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Tree> for String {
    fn from(t: Tree) -> Self {
        t.to_string()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Post-order indexing

/// A post-order index over a borrowed tree.
///
/// Nodes are numbered `1..=len()` in post-order, so the root is always
/// `len()`. Index `0` is reserved as the "no node" sentinel and never refers
/// to a real node.
#[derive(Debug)]
pub struct PostOrder<'a> {
    nodes: Vec<&'a Tree>,
    parents: Vec<usize>,
    children: Vec<Vec<usize>>,
    leftmost: Vec<usize>,
}

impl<'a> PostOrder<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        let mut po = PostOrder {
            nodes: vec![],
            parents: vec![0],
            children: vec![vec![]],
            leftmost: vec![0],
        };
        po.visit(tree);
        po
    }

    fn visit(&mut self, t: &'a Tree) -> usize {
        let kids: Vec<usize> = t.children.iter().map(|c| self.visit(c)).collect();
        self.nodes.push(t);
        let id = self.nodes.len();
        let leftmost = kids.first().map(|&c| self.leftmost[c]).unwrap_or(id);
        for &c in &kids {
            self.parents[c] = id;
        }
        self.parents.push(0);
        self.leftmost.push(leftmost);
        self.children.push(kids);
        id
    }

    /// The number of nodes, which is also the index of the root.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> usize {
        self.len()
    }

    pub fn node(&self, i: usize) -> &'a Tree {
        self.nodes[i - 1]
    }

    pub fn label(&self, i: usize) -> &'a str {
        self.nodes[i - 1].label()
    }

    pub fn parent(&self, i: usize) -> Option<usize> {
        match self.parents[i] {
            0 => None,
            p => Some(p),
        }
    }

    pub fn children(&self, i: usize) -> &[usize] {
        &self.children[i]
    }

    /// The post-order index of the leftmost leaf below `i`.
    pub fn leftmost(&self, i: usize) -> usize {
        self.leftmost[i]
    }

    /// The position of `i` among its siblings (0 for the root).
    pub fn position(&self, i: usize) -> usize {
        match self.parent(i) {
            Some(p) => self.children[p].iter().position(|&c| c == i).unwrap_or(0),
            None => 0,
        }
    }

    /// Whether `d` lies in the subtree rooted at `i` (inclusive).
    pub fn is_descendant(&self, d: usize, i: usize) -> bool {
        self.leftmost[i] <= d && d <= i
    }

    /// All indices of the subtree rooted at `i`, in post-order.
    pub fn subtree(&self, i: usize) -> std::ops::RangeInclusive<usize> {
        self.leftmost[i]..=i
    }

    /// All indices in pre-order (parents before children, left to right).
    pub fn pre_order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack = vec![self.root()];
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.children[i].iter().rev());
        }
        out
    }
}
