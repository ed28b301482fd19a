//! # Grouping
//!
//! Union–find over dense indices, used to collect answers into groups of
//! structurally identical trees.

#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// All groups, each listed in increasing index order; groups are ordered
    /// by their smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let len = self.parent.len();
        let mut slot_of_root = vec![usize::MAX; len];
        let mut groups: Vec<Vec<usize>> = vec![];
        for x in 0..len {
            let r = self.find(x);
            if slot_of_root[r] == usize::MAX {
                slot_of_root[r] = groups.len();
                groups.push(vec![]);
            }
            groups[slot_of_root[r]].push(x);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_in_first_member_order() {
        let mut uf = UnionFind::new(6);
        uf.union(4, 1);
        uf.union(5, 2);
        uf.union(2, 4);
        assert_eq!(uf.groups(), vec![vec![0], vec![1, 2, 4, 5], vec![3]]);
        assert_eq!(uf.find(5), uf.find(1));
        assert_ne!(uf.find(0), uf.find(3));
    }
}
