//! # Edit scripts
//!
//! Turns a node alignment into an ordered list of [`EditAction`]s that, when
//! applied one after the other, rewrite the source tree into the target tree.
//! The generator follows Chawathe et al., "Change Detection in Hierarchically
//! Structured Information" (1996): it walks the target tree top-down, keeping
//! a working copy of the source tree in sync, and records every insertion,
//! relabeling and move it performs; whatever is left unmatched in the working
//! copy at the end is deleted.
//!
//! Both trees are placed under a virtual document node while the script is
//! built, so the root of the source tree has path `[0]` and every action
//! addresses nodes by child-index paths from the document node. This makes
//! scripts applicable even when the two roots differ.

use crate::ted::Alignment;
use crate::tree::{Path, PostOrder, Tree, ROOT_LABEL};

use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////
// Actions

/// A single high-level edit.
///
/// Paths are resolved against the tree as it stands when the action is
/// applied. For a [`EditAction::Move`], `path` is resolved before the node is
/// detached and `new_parent_path` after.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum EditAction {
    /// Insert `node` (a single leaf, or a whole subtree) as child number
    /// `position` of the node at `parent_path`.
    Insert {
        node: Tree,
        parent_label: String,
        position: usize,
        parent_path: Path,
    },

    /// Delete the subtree `node` found at `path`.
    Delete { node: Tree, path: Path },

    /// Relabel the node at `path` from `old_value` to `new_value`.
    Update {
        node_label: String,
        old_value: String,
        new_value: String,
        path: Path,
    },

    /// Move the subtree `node` at `path` to child number `new_position` of
    /// the node at `new_parent_path`.
    Move {
        node: Tree,
        new_parent_label: String,
        new_position: usize,
        path: Path,
        new_parent_path: Path,
    },
}

impl EditAction {
    pub fn kind(&self) -> &'static str {
        match self {
            EditAction::Insert { .. } => "Insert",
            EditAction::Delete { .. } => "Delete",
            EditAction::Update { .. } => "Update",
            EditAction::Move { .. } => "Move",
        }
    }
}

impl std::fmt::Display for EditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditAction::Insert {
                node,
                parent_label,
                position,
                ..
            } => write!(f, "insert {} into '{}' at {}", node, parent_label, position),
            EditAction::Delete { node, .. } => write!(f, "delete {}", node),
            EditAction::Update {
                old_value,
                new_value,
                ..
            } => write!(f, "update '{}' to '{}'", old_value, new_value),
            EditAction::Move {
                node,
                new_parent_label,
                new_position,
                ..
            } => write!(
                f,
                "move {} into '{}' at {}",
                node, new_parent_label, new_position
            ),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Working copy

#[derive(Debug, Clone)]
struct Node {
    label: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// An arena holding the working copy; node `0` is the document node.
#[derive(Debug)]
struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    fn add(&mut self, label: String) -> usize {
        self.nodes.push(Node {
            label,
            parent: None,
            children: vec![],
        });
        self.nodes.len() - 1
    }

    fn attach(&mut self, id: usize, parent: usize, position: usize) {
        self.nodes[parent].children.insert(position, id);
        self.nodes[id].parent = Some(parent);
    }

    fn detach(&mut self, id: usize) {
        if let Some(p) = self.nodes[id].parent.take() {
            self.nodes[p].children.retain(|&c| c != id);
        }
    }

    fn position(&self, id: usize) -> usize {
        match self.nodes[id].parent {
            Some(p) => self.nodes[p]
                .children
                .iter()
                .position(|&c| c == id)
                .unwrap_or(0),
            None => 0,
        }
    }

    fn path(&self, id: usize) -> Path {
        let mut path = vec![];
        let mut cur = id;
        while let Some(p) = self.nodes[cur].parent {
            path.push(self.position(cur));
            cur = p;
        }
        path.reverse();
        path
    }

    fn tree(&self, id: usize) -> Tree {
        let node = &self.nodes[id];
        Tree::new(
            node.label.clone(),
            node.children.iter().map(|&c| self.tree(c)).collect(),
        )
    }

    fn post_order(&self, id: usize, out: &mut Vec<usize>) {
        for &c in &self.nodes[id].children {
            self.post_order(c, out);
        }
        out.push(id);
    }
}

////////////////////////////////////////////////////////////////////////////////
// Script generation

struct Generator<'a> {
    target: PostOrder<'a>,
    arena: Arena,
    // Working-copy id -> target index, and target index -> working-copy id.
    // Target index 0 is the target's document node.
    w_partner: Vec<Option<usize>>,
    t_partner: Vec<Option<usize>>,
    w_in_order: Vec<bool>,
    t_in_order: Vec<bool>,
    actions: Vec<EditAction>,
}

impl<'a> Generator<'a> {
    fn new(t1: &Tree, t2: &'a Tree, alignment: &Alignment) -> Self {
        let source = PostOrder::new(t1);
        let target = PostOrder::new(t2);

        let mut arena = Arena {
            nodes: vec![Node {
                label: ROOT_LABEL.to_owned(),
                parent: None,
                children: vec![],
            }],
        };
        let mut w_of_source = vec![0; source.len() + 1];
        for i in source.pre_order() {
            let id = arena.add(source.label(i).to_owned());
            w_of_source[i] = id;
            let parent = source.parent(i).map_or(0, |p| w_of_source[p]);
            let position = arena.nodes[parent].children.len();
            arena.attach(id, parent, position);
        }

        let mut w_partner = vec![None; arena.nodes.len()];
        let mut t_partner = vec![None; target.len() + 1];
        w_partner[0] = Some(0);
        t_partner[0] = Some(0);
        for (i, j) in alignment.pairs() {
            w_partner[w_of_source[i]] = Some(j);
            t_partner[j] = Some(w_of_source[i]);
        }

        Self {
            w_in_order: vec![false; arena.nodes.len()],
            t_in_order: vec![false; target.len() + 1],
            target,
            arena,
            w_partner,
            t_partner,
            actions: vec![],
        }
    }

    fn t_parent(&self, x: usize) -> usize {
        self.target.parent(x).unwrap_or(0)
    }

    fn t_children(&self, x: usize) -> Vec<usize> {
        if x == 0 {
            vec![self.target.root()]
        } else {
            self.target.children(x).to_vec()
        }
    }

    fn pair(&mut self, w: usize, x: usize) {
        self.w_partner[w] = Some(x);
        self.t_partner[x] = Some(w);
    }

    fn new_node(&mut self, label: String) -> usize {
        let id = self.arena.add(label);
        self.w_partner.push(None);
        self.w_in_order.push(false);
        id
    }

    fn mark_in_order(&mut self, w: usize, x: usize) {
        self.w_in_order[w] = true;
        self.t_in_order[x] = true;
    }

    /// The position in the working copy at which the partner of `x` belongs:
    /// just right of the partner of its nearest in-order left sibling.
    fn find_pos(&self, x: usize) -> usize {
        let siblings = self.t_children(self.t_parent(x));
        let left = siblings.iter().take_while(|&&s| s != x);
        match left
            .filter(|&&s| self.t_in_order[s])
            .last()
            .and_then(|&v| self.t_partner[v])
        {
            Some(u) => self.arena.position(u) + 1,
            None => 0,
        }
    }

    fn subtree_unmatched(&self, x: usize) -> bool {
        self.target.subtree(x).all(|d| self.t_partner[d].is_none())
    }

    fn insert_subtree(&mut self, x: usize, parent: usize, position: usize) {
        let id = self.new_node(self.target.label(x).to_owned());
        self.arena.attach(id, parent, position);
        self.pair(id, x);
        for (k, c) in self.t_children(x).into_iter().enumerate() {
            self.insert_subtree(c, id, k);
        }
    }

    fn insert(&mut self, x: usize, z: usize) {
        let position = self.find_pos(x);
        let parent_path = self.arena.path(z);
        let parent_label = self.arena.nodes[z].label.clone();

        let node = if self.subtree_unmatched(x) {
            self.insert_subtree(x, z, position);
            self.target.node(x).clone()
        } else {
            let id = self.new_node(self.target.label(x).to_owned());
            self.arena.attach(id, z, position);
            self.pair(id, x);
            Tree::leaf(self.target.label(x))
        };

        log::trace!("insert {} under '{}' at {}", node, parent_label, position);
        self.actions.push(EditAction::Insert {
            node,
            parent_label,
            position,
            parent_path,
        });
    }

    /// Moves `w` (the partner of `x`) under `z`.
    fn relocate(&mut self, w: usize, x: usize, z: usize) {
        let path = self.arena.path(w);
        self.arena.detach(w);
        let new_position = self.find_pos(x);
        let new_parent_path = self.arena.path(z);
        self.arena.attach(w, z, new_position);

        let node = self.arena.tree(w);
        let new_parent_label = self.arena.nodes[z].label.clone();
        log::trace!("move {} under '{}' at {}", node, new_parent_label, new_position);
        self.actions.push(EditAction::Move {
            node,
            new_parent_label,
            new_position,
            path,
            new_parent_path,
        });
    }

    fn update(&mut self, w: usize, x: usize) {
        let new_value = self.target.label(x).to_owned();
        if self.arena.nodes[w].label == new_value {
            return;
        }
        let old_value =
            std::mem::replace(&mut self.arena.nodes[w].label, new_value.clone());
        self.actions.push(EditAction::Update {
            node_label: old_value.clone(),
            old_value,
            new_value,
            path: self.arena.path(w),
        });
    }

    fn lcs(&self, s1: &[usize], s2: &[usize]) -> Vec<(usize, usize)> {
        let (n, m) = (s1.len(), s2.len());
        let mut table = vec![vec![0usize; m + 1]; n + 1];
        for a in (0..n).rev() {
            for b in (0..m).rev() {
                table[a][b] = if self.w_partner[s1[a]] == Some(s2[b]) {
                    table[a + 1][b + 1] + 1
                } else {
                    table[a + 1][b].max(table[a][b + 1])
                };
            }
        }

        let mut pairs = vec![];
        let (mut a, mut b) = (0, 0);
        while a < n && b < m {
            if self.w_partner[s1[a]] == Some(s2[b]) {
                pairs.push((s1[a], s2[b]));
                a += 1;
                b += 1;
            } else if table[a + 1][b] >= table[a][b + 1] {
                a += 1;
            } else {
                b += 1;
            }
        }
        pairs
    }

    fn align_children(&mut self, w: usize, x: usize) {
        let w_children = self.arena.nodes[w].children.clone();
        let x_children = self.t_children(x);
        for &c in &w_children {
            self.w_in_order[c] = false;
        }
        for &c in &x_children {
            self.t_in_order[c] = false;
        }

        let s1: Vec<usize> = w_children
            .iter()
            .copied()
            .filter(|&c| {
                self.w_partner[c].is_some_and(|p| x_children.contains(&p))
            })
            .collect();
        let s2: Vec<usize> = x_children
            .iter()
            .copied()
            .filter(|&c| self.t_partner[c].is_some_and(|p| w_children.contains(&p)))
            .collect();

        let lcs = self.lcs(&s1, &s2);
        for &(a, b) in &lcs {
            self.mark_in_order(a, b);
        }

        for &b in &s2 {
            let Some(a) = self.t_partner[b] else {
                continue;
            };
            if lcs.contains(&(a, b)) {
                continue;
            }
            self.relocate(a, b, w);
            self.mark_in_order(a, b);
        }
    }

    fn run(mut self) -> Vec<EditAction> {
        for x in self.target.pre_order() {
            let y = self.t_parent(x);
            let Some(z) = self.t_partner[y] else {
                // parents are always paired before their children
                continue;
            };

            let w = match self.t_partner[x] {
                None => {
                    self.insert(x, z);
                    let w = self.t_partner[x].unwrap_or(0);
                    self.mark_in_order(w, x);
                    w
                }
                Some(w) => {
                    self.update(w, x);
                    if self.arena.nodes[w].parent != Some(z) {
                        self.relocate(w, x, z);
                        self.mark_in_order(w, x);
                    }
                    w
                }
            };

            self.align_children(w, x);
        }

        // Every unmatched node now sits in a fully unmatched subtree.
        let mut order = vec![];
        self.arena.post_order(0, &mut order);
        for id in order {
            if id == 0 || self.w_partner[id].is_some() {
                continue;
            }
            let parent = self.arena.nodes[id].parent;
            if parent.is_some_and(|p| self.w_partner[p].is_none()) {
                continue;
            }
            let path = self.arena.path(id);
            let node = self.arena.tree(id);
            log::trace!("delete {}", node);
            self.arena.detach(id);
            self.actions.push(EditAction::Delete { node, path });
        }

        self.actions
    }
}

/// The edit script rewriting `t1` into `t2` along `alignment`, which pairs
/// post-order indices of `t1` with post-order indices of `t2`.
pub fn build_script(t1: &Tree, t2: &Tree, alignment: &Alignment) -> Vec<EditAction> {
    let actions = Generator::new(t1, t2, alignment).run();
    log::debug!("built edit script with {} action(s)", actions.len());
    actions
}

////////////////////////////////////////////////////////////////////////////////
// Application

/// An action that does not fit the tree it is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    NoSuchPath(Path),
    BadPosition { path: Path, position: usize },
    Mismatch { path: Path, expected: String, found: String },
    NotATree(usize),
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyError::NoSuchPath(path) => write!(f, "no node at path {:?}", path),
            ApplyError::BadPosition { path, position } => write!(
                f,
                "node at path {:?} has no child position {}",
                path, position
            ),
            ApplyError::Mismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "expected {} at path {:?} but found {}",
                expected, path, found
            ),
            ApplyError::NotATree(n) => {
                write!(f, "script leaves {} top-level nodes instead of one", n)
            }
        }
    }
}

impl std::error::Error for ApplyError {}

fn children_at<'t>(doc: &'t mut Tree, path: &[usize]) -> Result<&'t mut Vec<Tree>, ApplyError> {
    doc.get_mut(path)
        .map(Tree::children_mut)
        .ok_or_else(|| ApplyError::NoSuchPath(path.to_vec()))
}

fn remove_at(doc: &mut Tree, path: &[usize]) -> Result<Tree, ApplyError> {
    let Some((&last, parent)) = path.split_last() else {
        return Err(ApplyError::NoSuchPath(path.to_vec()));
    };
    let siblings = children_at(doc, parent)?;
    if last >= siblings.len() {
        return Err(ApplyError::NoSuchPath(path.to_vec()));
    }
    Ok(siblings.remove(last))
}

fn insert_at(
    doc: &mut Tree,
    parent: &[usize],
    position: usize,
    node: Tree,
) -> Result<(), ApplyError> {
    let siblings = children_at(doc, parent)?;
    if position > siblings.len() {
        return Err(ApplyError::BadPosition {
            path: parent.to_vec(),
            position,
        });
    }
    siblings.insert(position, node);
    Ok(())
}

fn apply_one(doc: &mut Tree, action: &EditAction) -> Result<(), ApplyError> {
    match action {
        EditAction::Insert {
            node,
            position,
            parent_path,
            ..
        } => insert_at(doc, parent_path, *position, node.clone()),
        EditAction::Delete { node, path } => {
            let removed = remove_at(doc, path)?;
            if &removed != node {
                return Err(ApplyError::Mismatch {
                    path: path.clone(),
                    expected: node.to_string(),
                    found: removed.to_string(),
                });
            }
            Ok(())
        }
        EditAction::Update {
            old_value,
            new_value,
            path,
            ..
        } => {
            let target = doc
                .get_mut(path)
                .ok_or_else(|| ApplyError::NoSuchPath(path.clone()))?;
            if target.label() != old_value {
                return Err(ApplyError::Mismatch {
                    path: path.clone(),
                    expected: old_value.clone(),
                    found: target.label().to_owned(),
                });
            }
            target.set_label(new_value.clone());
            Ok(())
        }
        EditAction::Move {
            new_position,
            path,
            new_parent_path,
            ..
        } => {
            let moved = remove_at(doc, path)?;
            insert_at(doc, new_parent_path, *new_position, moved)
        }
    }
}

/// Applies a script to a tree, in order.
pub fn apply(t: &Tree, actions: &[EditAction]) -> Result<Tree, ApplyError> {
    let mut doc = Tree::new(ROOT_LABEL, vec![t.clone()]);
    for action in actions {
        apply_one(&mut doc, action)?;
    }
    let (_, mut children) = doc.into_parts();
    match children.len() {
        1 => Ok(children.remove(0)),
        n => Err(ApplyError::NotATree(n)),
    }
}
