//! # Tree edit distance
//!
//! Zhang and Shasha's algorithm for the edit distance between ordered
//! labeled trees under unit costs (insert a node, delete a node, relabel a
//! node). Only keyroot pairs are solved with a full forest-distance table,
//! which keeps the work near `O(n·m·min(depth, leaves))` on the shallow,
//! bushy trees that expressions produce.
//!
//! Besides the scalar distance, [`compute_distance`] recovers an optimal
//! [`Alignment`] by backtracking through the forest-distance tables.

use crate::tree::{PostOrder, Tree};

////////////////////////////////////////////////////////////////////////////////
// Alignments

/// A partial one-to-one pairing between the nodes of two trees.
///
/// Nodes are identified by their 1-based post-order index (see
/// [`PostOrder`]); `0` is the "no node" sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    a_to_b: Vec<usize>,
    b_to_a: Vec<usize>,
    pairs: Vec<(usize, usize)>,
}

impl Alignment {
    /// An empty alignment between trees with `len_a` and `len_b` nodes.
    pub fn new(len_a: usize, len_b: usize) -> Self {
        Self {
            a_to_b: vec![0; len_a + 1],
            b_to_a: vec![0; len_b + 1],
            pairs: vec![],
        }
    }

    /// Pairs `a` with `b`. Both must be unpaired.
    pub fn add(&mut self, a: usize, b: usize) {
        debug_assert!(a != 0 && b != 0, "the sentinel cannot be aligned");
        debug_assert!(!self.contains_a(a) && !self.contains_b(b));
        self.a_to_b[a] = b;
        self.b_to_a[b] = a;
        self.pairs.push((a, b));
    }

    pub fn contains_a(&self, a: usize) -> bool {
        self.get_b(a).is_some()
    }

    pub fn contains_b(&self, b: usize) -> bool {
        self.get_a(b).is_some()
    }

    pub fn get_b(&self, a: usize) -> Option<usize> {
        match self.a_to_b.get(a).copied() {
            None | Some(0) => None,
            Some(b) => Some(b),
        }
    }

    pub fn get_a(&self, b: usize) -> Option<usize> {
        match self.b_to_a.get(b).copied() {
            None | Some(0) => None,
            Some(a) => Some(a),
        }
    }

    /// All aligned pairs, in the order they were added.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pairs.iter().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }

    /// The unit cost of the edit sequence this alignment induces.
    pub fn cost(&self, a: &PostOrder, b: &PostOrder) -> usize {
        let relabels = self
            .pairs()
            .filter(|&(i, j)| a.label(i) != b.label(j))
            .count();
        (a.len() - self.len()) + (b.len() - self.len()) + relabels
    }
}

////////////////////////////////////////////////////////////////////////////////
// Zhang–Shasha

fn keyroots(po: &PostOrder) -> Vec<usize> {
    let mut seen = vec![false; po.len() + 1];
    let mut roots = vec![];
    for i in (1..=po.len()).rev() {
        let l = po.leftmost(i);
        if !seen[l] {
            seen[l] = true;
            roots.push(i);
        }
    }
    roots.reverse();
    roots
}

struct Solver<'a> {
    a: PostOrder<'a>,
    b: PostOrder<'a>,
    td: Vec<Vec<usize>>,
}

impl<'a> Solver<'a> {
    fn new(t1: &'a Tree, t2: &'a Tree) -> Self {
        let a = PostOrder::new(t1);
        let b = PostOrder::new(t2);
        let td = vec![vec![0; b.len() + 1]; a.len() + 1];
        let mut solver = Self { a, b, td };
        for &i in &keyroots(&solver.a) {
            for &j in &keyroots(&solver.b) {
                solver.forest(i, j);
            }
        }
        solver
    }

    fn relabel(&self, i: usize, j: usize) -> usize {
        if self.a.label(i) == self.b.label(j) {
            0
        } else {
            1
        }
    }

    /// Fills the forest-distance table for the subtrees rooted at `i` and
    /// `j`, recording tree distances for every pair of subtrees that share
    /// their leftmost leaves with `i` and `j`. Row `x` stands for the forest
    /// `leftmost(i)..=leftmost(i) + x - 1` (likewise for columns).
    fn forest(&mut self, i: usize, j: usize) -> Vec<Vec<usize>> {
        let li = self.a.leftmost(i);
        let lj = self.b.leftmost(j);
        let (ioff, joff) = (li - 1, lj - 1);
        let rows = i - ioff + 1;
        let cols = j - joff + 1;

        let mut fd = vec![vec![0; cols]; rows];
        for x in 1..rows {
            fd[x][0] = fd[x - 1][0] + 1;
        }
        for y in 1..cols {
            fd[0][y] = fd[0][y - 1] + 1;
        }

        for x in 1..rows {
            for y in 1..cols {
                let (xi, yj) = (x + ioff, y + joff);
                let delete = fd[x - 1][y] + 1;
                let insert = fd[x][y - 1] + 1;
                if self.a.leftmost(xi) == li && self.b.leftmost(yj) == lj {
                    let relabel = fd[x - 1][y - 1] + self.relabel(xi, yj);
                    fd[x][y] = delete.min(insert).min(relabel);
                    self.td[xi][yj] = fd[x][y];
                } else {
                    let p = self.a.leftmost(xi) - 1 - ioff;
                    let q = self.b.leftmost(yj) - 1 - joff;
                    let subtree = fd[p][q] + self.td[xi][yj];
                    fd[x][y] = delete.min(insert).min(subtree);
                }
            }
        }

        fd
    }

    fn distance(&self) -> usize {
        self.td[self.a.root()][self.b.root()]
    }

    // Prefers aligning over deleting over inserting whenever several moves
    // are optimal, which keeps the alignment as large as possible.
    fn alignment(&mut self) -> Alignment {
        let mut alignment = Alignment::new(self.a.len(), self.b.len());
        let mut stack = vec![(self.a.root(), self.b.root())];

        while let Some((i, j)) = stack.pop() {
            let fd = self.forest(i, j);
            let li = self.a.leftmost(i);
            let lj = self.b.leftmost(j);
            let (ioff, joff) = (li - 1, lj - 1);
            let (mut x, mut y) = (i - ioff, j - joff);

            while x > 0 || y > 0 {
                let (xi, yj) = (x + ioff, y + joff);
                if x > 0 && y > 0 {
                    if self.a.leftmost(xi) == li && self.b.leftmost(yj) == lj {
                        if fd[x][y] == fd[x - 1][y - 1] + self.relabel(xi, yj) {
                            alignment.add(xi, yj);
                            x -= 1;
                            y -= 1;
                            continue;
                        }
                    } else {
                        let p = self.a.leftmost(xi) - 1 - ioff;
                        let q = self.b.leftmost(yj) - 1 - joff;
                        if fd[x][y] == fd[p][q] + self.td[xi][yj] {
                            stack.push((xi, yj));
                            x = p;
                            y = q;
                            continue;
                        }
                    }
                }
                if x > 0 && fd[x][y] == fd[x - 1][y] + 1 {
                    x -= 1;
                } else {
                    y -= 1;
                }
            }
        }

        alignment.pairs.sort_unstable();
        alignment
    }
}

/// The edit distance between two trees.
pub fn distance(t1: &Tree, t2: &Tree) -> usize {
    Solver::new(t1, t2).distance()
}

/// The edit distance between two trees together with an optimal alignment
/// of their post-order indices.
pub fn compute_distance(t1: &Tree, t2: &Tree) -> (usize, Alignment) {
    let mut solver = Solver::new(t1, t2);
    let cost = solver.distance();
    let alignment = solver.alignment();
    log::trace!("distance {} with {} aligned nodes", cost, alignment.len());
    (cost, alignment)
}
