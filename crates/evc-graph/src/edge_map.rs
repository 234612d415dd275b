//! Closed lists and edge sets keyed by traversal.
//!
//! | Type            | Contents                                            |
//! |-----------------|-----------------------------------------------------|
//! | `EdgeMap`       | traversal → `EdgeIdx`, one table per direction      |
//! | `EdgeMapTwoGen` | old/new generation pair of `EdgeMap`s for CARMA     |
//! | `EdgeContainer` | set of traversals as `EdgeId` → direction bitmask   |
//!
//! Scans return edges sorted by key so results do not depend on hash order.

use evc_core::{Direction, EdgeId, EdgeKey};

use crate::edge::{EdgeCache, EdgeIdx};
use crate::Map;

// ── EdgeMap ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct EdgeMap {
    along:   Map<EdgeId, EdgeIdx>,
    against: Map<EdgeId, EdgeIdx>,
}

impl EdgeMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn table(&self, dir: Direction) -> &Map<EdgeId, EdgeIdx> {
        match dir {
            Direction::Along   => &self.along,
            Direction::Against => &self.against,
        }
    }

    #[inline]
    fn table_mut(&mut self, dir: Direction) -> &mut Map<EdgeId, EdgeIdx> {
        match dir {
            Direction::Along   => &mut self.along,
            Direction::Against => &mut self.against,
        }
    }

    /// Insert a traversal.  Returns `false` if it was already present.
    pub fn insert(&mut self, key: EdgeKey, idx: EdgeIdx) -> bool {
        self.table_mut(key.dir).insert(key.id, idx).is_none()
    }

    #[inline]
    pub fn contains(&self, key: EdgeKey) -> bool {
        self.table(key.dir).contains_key(&key.id)
    }

    pub fn get(&self, key: EdgeKey) -> Option<EdgeIdx> {
        self.table(key.dir).get(&key.id).copied()
    }

    pub fn remove(&mut self, key: EdgeKey) -> Option<EdgeIdx> {
        self.table_mut(key.dir).remove(&key.id)
    }

    pub fn len(&self) -> usize {
        self.along.len() + self.against.len()
    }

    pub fn is_empty(&self) -> bool {
        self.along.is_empty() && self.against.is_empty()
    }

    pub fn clear(&mut self) {
        self.along.clear();
        self.against.clear();
    }

    /// All entries, sorted by key.
    pub fn entries(&self) -> Vec<(EdgeKey, EdgeIdx)> {
        let mut out: Vec<(EdgeKey, EdgeIdx)> = self
            .along
            .iter()
            .map(|(&id, &i)| (EdgeKey::along(id), i))
            .chain(self.against.iter().map(|(&id, &i)| (EdgeKey::against(id), i)))
            .collect();
        out.sort_unstable_by_key(|&(k, _)| k);
        out
    }

    /// Move every entry of `other` into `self`.
    pub fn absorb(&mut self, other: &mut EdgeMap) {
        self.along.extend(other.along.drain());
        self.against.extend(other.against.drain());
    }

    /// Edges in both direction tables that resolve to dirty for `min_pop`.
    pub fn dirty_edges(&self, cache: &mut EdgeCache, min_pop: f64) -> Vec<EdgeIdx> {
        self.entries()
            .into_iter()
            .filter_map(|(_, idx)| cache.is_dirty(idx, min_pop).then_some(idx))
            .collect()
    }
}

// ── EdgeMapTwoGen ─────────────────────────────────────────────────────────────

/// Which generation(s) an `EdgeMapTwoGen` operation applies to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Generation {
    #[default]
    New,
    Old,
    All,
}

/// Closed list of the CARMA search.  Edges settled by the current loop go
/// into the new generation; promoting moves them to the old one so the next
/// loop can reuse their clean parts.
#[derive(Clone, Debug, Default)]
pub struct EdgeMapTwoGen {
    old: EdgeMap,
    new: EdgeMap,
}

impl EdgeMapTwoGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn old(&self) -> &EdgeMap {
        &self.old
    }

    pub fn old_mut(&mut self) -> &mut EdgeMap {
        &mut self.old
    }

    pub fn new_gen(&self) -> &EdgeMap {
        &self.new
    }

    /// Move every new-generation entry into the old generation.
    pub fn promote_all(&mut self) {
        self.old.absorb(&mut self.new);
    }

    pub fn insert(&mut self, key: EdgeKey, idx: EdgeIdx, generation: Generation) -> bool {
        match generation {
            Generation::New | Generation::All => self.new.insert(key, idx),
            Generation::Old                   => self.old.insert(key, idx),
        }
    }

    pub fn contains(&self, key: EdgeKey, generation: Generation) -> bool {
        match generation {
            Generation::New => self.new.contains(key),
            Generation::Old => self.old.contains(key),
            Generation::All => self.new.contains(key) || self.old.contains(key),
        }
    }

    pub fn remove(&mut self, key: EdgeKey, generation: Generation) {
        if matches!(generation, Generation::New | Generation::All) {
            self.new.remove(key);
        }
        if matches!(generation, Generation::Old | Generation::All) {
            self.old.remove(key);
        }
    }

    pub fn clear(&mut self, generation: Generation) {
        if matches!(generation, Generation::New | Generation::All) {
            self.new.clear();
        }
        if matches!(generation, Generation::Old | Generation::All) {
            self.old.clear();
        }
    }

    pub fn len(&self, generation: Generation) -> usize {
        match generation {
            Generation::New => self.new.len(),
            Generation::Old => self.old.len(),
            Generation::All => self.new.len() + self.old.len(),
        }
    }

    pub fn dirty_edges(&self, cache: &mut EdgeCache, min_pop: f64, generation: Generation) -> Vec<EdgeIdx> {
        match generation {
            Generation::New => self.new.dirty_edges(cache, min_pop),
            Generation::Old => self.old.dirty_edges(cache, min_pop),
            Generation::All => {
                let mut v = self.old.dirty_edges(cache, min_pop);
                v.extend(self.new.dirty_edges(cache, min_pop));
                v
            }
        }
    }
}

// ── EdgeContainer ─────────────────────────────────────────────────────────────

/// Compact set of traversals.
#[derive(Clone, Debug, Default)]
pub struct EdgeContainer {
    dirs: Map<EdgeId, u8>,
}

impl EdgeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EdgeKey) {
        *self.dirs.entry(key.id).or_insert(0) |= key.dir.bit();
    }

    pub fn contains(&self, key: EdgeKey) -> bool {
        self.dirs.get(&key.id).is_some_and(|&m| m & key.dir.bit() != 0)
    }

    pub fn remove(&mut self, key: EdgeKey) {
        if let Some(m) = self.dirs.get_mut(&key.id) {
            *m &= !key.dir.bit();
            if *m == 0 {
                self.dirs.remove(&key.id);
            }
        }
    }

    pub fn extend_from(&mut self, other: &EdgeContainer) {
        for (&id, &m) in &other.dirs {
            *self.dirs.entry(id).or_insert(0) |= m;
        }
    }

    /// Number of traversals held.
    pub fn len(&self) -> usize {
        self.dirs.values().map(|m| m.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    /// Traversals in key order.
    pub fn keys(&self) -> Vec<EdgeKey> {
        let mut out = Vec::with_capacity(self.dirs.len() * 2);
        for (&id, &m) in &self.dirs {
            if m & Direction::Along.bit() != 0 {
                out.push(EdgeKey::along(id));
            }
            if m & Direction::Against.bit() != 0 {
                out.push(EdgeKey::against(id));
            }
        }
        out.sort_unstable();
        out
    }
}
