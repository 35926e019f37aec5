use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint-set forest keyed by arbitrary hashable values.
///
/// Unknown keys become singleton sets on first use. `find` compresses
/// paths by halving; there is no union by rank.
#[derive(Debug, Clone, Default)]
pub struct UnionFind<K> {
    parent: HashMap<K, K>,
}

impl<K> UnionFind<K>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
        }
    }

    pub fn find(&mut self, key: &K) -> K {
        if !self.parent.contains_key(key) {
            self.parent.insert(key.clone(), key.clone());
            return key.clone();
        }
        let mut x = key.clone();
        loop {
            let p = self.parent[&x].clone();
            if p == x {
                return x;
            }
            let grandparent = self.parent[&p].clone();
            self.parent.insert(x, grandparent.clone());
            x = grandparent;
        }
    }

    pub fn union(&mut self, a: &K, b: &K) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }

    pub fn connected(&mut self, a: &K, b: &K) -> bool {
        self.find(a) == self.find(b)
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
