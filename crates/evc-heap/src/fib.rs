//! Fibonacci heap keyed by `f64`.
//!
//! # Complexity
//!
//! | Operation      | Amortized         |
//! |----------------|-------------------|
//! | `insert`       | O(1)              |
//! | `peek_min`     | O(1)              |
//! | `decrease_key` | O(1)              |
//! | `extract_min`  | O(log n)          |
//! | `delete`       | O(log n)          |
//! | `merge`        | O(m) arena copy, O(1) root splice |
//!
//! Equal keys pop in insertion order: every entry carries a sequence number
//! and comparisons use `(key, seq)`.  Decreasing a key keeps the original
//! sequence number.

use crate::{HeapError, HeapResult};

const NIL: u32 = u32::MAX;

// ── Handles ───────────────────────────────────────────────────────────────────

/// Stable reference to one heap entry, valid until that entry is removed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct HeapHandle {
    slot:       u32,
    generation: u32,
}

/// Translates handles of a heap that was merged into another.
#[derive(Copy, Clone, Debug)]
pub struct MergeOffset(u32);

impl MergeOffset {
    pub fn remap(self, h: HeapHandle) -> HeapHandle {
        HeapHandle { slot: h.slot + self.0, generation: h.generation }
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Node<T> {
    key:        f64,
    seq:        u64,
    item:       Option<T>,
    parent:     u32,
    child:      u32,
    left:       u32,
    right:      u32,
    degree:     u32,
    marked:     bool,
    generation: u32,
}

impl<T> Node<T> {
    fn is_live(&self) -> bool {
        self.item.is_some()
    }
}

// ── FibHeap ───────────────────────────────────────────────────────────────────

/// Min-heap over `(f64 key, T item)` pairs.
#[derive(Clone, Debug)]
pub struct FibHeap<T> {
    nodes:        Vec<Node<T>>,
    free:         Vec<u32>,
    min:          u32,
    len:          usize,
    next_seq:     u64,
    max_inserted: f64,
}

impl<T> Default for FibHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FibHeap<T> {
    pub fn new() -> Self {
        Self {
            nodes:        Vec::new(),
            free:         Vec::new(),
            min:          NIL,
            len:          0,
            next_seq:     0,
            max_inserted: f64::NEG_INFINITY,
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self { nodes: Vec::with_capacity(n), ..Self::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Largest key passed to `insert` since construction, `clear`, or
    /// `reset_max`.  `-inf` when nothing was inserted.
    #[inline]
    pub fn max_inserted_key(&self) -> f64 {
        self.max_inserted
    }

    pub fn reset_max(&mut self) {
        self.max_inserted = f64::NEG_INFINITY;
    }

    /// Drop every entry.  All outstanding handles become stale.
    pub fn clear(&mut self) {
        // Bump generations instead of truncating so old handles stay stale
        // even after their slots are reused.
        self.free.clear();
        for (i, n) in self.nodes.iter_mut().enumerate() {
            n.item = None;
            n.generation = n.generation.wrapping_add(1);
            self.free.push(i as u32);
        }
        self.min = NIL;
        self.len = 0;
        self.max_inserted = f64::NEG_INFINITY;
    }

    pub fn contains(&self, h: HeapHandle) -> bool {
        self.nodes
            .get(h.slot as usize)
            .is_some_and(|n| n.generation == h.generation && n.is_live())
    }

    /// Current key of a live entry.
    pub fn key(&self, h: HeapHandle) -> Option<f64> {
        self.contains(h).then(|| self.nodes[h.slot as usize].key)
    }

    pub fn get(&self, h: HeapHandle) -> Option<&T> {
        if self.contains(h) { self.nodes[h.slot as usize].item.as_ref() } else { None }
    }

    // ── Core operations ───────────────────────────────────────────────────

    pub fn insert(&mut self, key: f64, item: T) -> HeapHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        if key > self.max_inserted {
            self.max_inserted = key;
        }

        let slot = match self.free.pop() {
            Some(s) => {
                let n = &mut self.nodes[s as usize];
                n.key = key;
                n.seq = seq;
                n.item = Some(item);
                n.parent = NIL;
                n.child = NIL;
                n.degree = 0;
                n.marked = false;
                s
            }
            None => {
                self.nodes.push(Node {
                    key,
                    seq,
                    item: Some(item),
                    parent: NIL,
                    child: NIL,
                    left: NIL,
                    right: NIL,
                    degree: 0,
                    marked: false,
                    generation: 0,
                });
                (self.nodes.len() - 1) as u32
            }
        };
        self.add_root(slot);
        self.len += 1;
        HeapHandle { slot, generation: self.nodes[slot as usize].generation }
    }

    pub fn peek_min(&self) -> Option<(f64, &T)> {
        if self.min == NIL {
            return None;
        }
        let n = &self.nodes[self.min as usize];
        n.item.as_ref().map(|item| (n.key, item))
    }

    pub fn peek_min_key(&self) -> Option<f64> {
        (self.min != NIL).then(|| self.nodes[self.min as usize].key)
    }

    pub fn extract_min(&mut self) -> Option<(f64, T)> {
        if self.min == NIL {
            return None;
        }
        let z = self.min;

        // Promote every child of z to the root list.
        let first_child = self.nodes[z as usize].child;
        if first_child != NIL {
            let children = self.ring(first_child);
            for c in children {
                self.unlink(c);
                self.nodes[c as usize].parent = NIL;
                self.nodes[c as usize].marked = false;
                self.splice_after(z, c);
            }
            self.nodes[z as usize].child = NIL;
        }

        let next = self.nodes[z as usize].right;
        self.unlink(z);
        if next == z {
            self.min = NIL;
        } else {
            self.min = next;
            self.consolidate();
        }
        self.len -= 1;
        self.release(z)
    }

    /// Lower the key of a live entry.  Raising a key is an error.
    pub fn decrease_key(&mut self, h: HeapHandle, key: f64) -> HeapResult<()> {
        if !self.contains(h) {
            return Err(HeapError::StaleHandle(h));
        }
        let old = self.nodes[h.slot as usize].key;
        if key > old {
            return Err(HeapError::KeyIncrease { old, new: key });
        }
        self.set_key_and_sift(h.slot, key);
        Ok(())
    }

    /// Remove an arbitrary live entry and return its key and item.
    pub fn delete(&mut self, h: HeapHandle) -> HeapResult<(f64, T)> {
        if !self.contains(h) {
            return Err(HeapError::StaleHandle(h));
        }
        let x = h.slot;
        let original = self.nodes[x as usize].key;
        self.nodes[x as usize].key = f64::NEG_INFINITY;
        let y = self.nodes[x as usize].parent;
        if y != NIL {
            self.cut(x, y);
            self.cascading_cut(y);
        }
        // Another -inf entry could already sit at min; force ours.
        self.min = x;
        let (_, item) = self.extract_min().ok_or(HeapError::StaleHandle(h))?;
        Ok((original, item))
    }

    /// Move every entry of `other` into `self`.
    ///
    /// Entries of `other` keep their relative insertion order and sort after
    /// existing entries of equal key.  Handles into `other` are translated
    /// with the returned [`MergeOffset`].
    pub fn merge(&mut self, other: FibHeap<T>) -> MergeOffset {
        let offset = self.nodes.len() as u32;
        let seq_shift = self.next_seq;
        let shift = |i: u32| if i == NIL { NIL } else { i + offset };

        if other.max_inserted > self.max_inserted {
            self.max_inserted = other.max_inserted;
        }
        self.next_seq += other.next_seq;
        self.len += other.len;
        self.free.extend(other.free.iter().map(|&i| i + offset));

        let other_min = shift(other.min);
        for mut n in other.nodes {
            n.parent = shift(n.parent);
            n.child = shift(n.child);
            n.left = shift(n.left);
            n.right = shift(n.right);
            n.seq += seq_shift;
            self.nodes.push(n);
        }

        if other_min != NIL {
            if self.min == NIL {
                self.min = other_min;
            } else {
                // Splice the two circular root lists together.
                let a = self.min;
                let b = other_min;
                let a_right = self.nodes[a as usize].right;
                let b_left = self.nodes[b as usize].left;
                self.nodes[a as usize].right = b;
                self.nodes[b as usize].left = a;
                self.nodes[b_left as usize].right = a_right;
                self.nodes[a_right as usize].left = b_left;
                if self.less(b, a) {
                    self.min = b;
                }
            }
        }
        MergeOffset(offset)
    }

    /// Drain in ascending `(key, insertion)` order.
    pub fn drain_sorted(&mut self) -> Vec<(f64, T)> {
        let mut out = Vec::with_capacity(self.len);
        while let Some(e) = self.extract_min() {
            out.push(e);
        }
        out
    }

    // ── Internals ─────────────────────────────────────────────────────────

    #[inline]
    fn less(&self, a: u32, b: u32) -> bool {
        let (na, nb) = (&self.nodes[a as usize], &self.nodes[b as usize]);
        na.key < nb.key || (na.key == nb.key && na.seq < nb.seq)
    }

    fn release(&mut self, slot: u32) -> Option<(f64, T)> {
        let n = &mut self.nodes[slot as usize];
        n.generation = n.generation.wrapping_add(1);
        let key = n.key;
        let item = n.item.take()?;
        self.free.push(slot);
        Some((key, item))
    }

    fn set_key_and_sift(&mut self, x: u32, key: f64) {
        self.nodes[x as usize].key = key;
        let y = self.nodes[x as usize].parent;
        if y != NIL && self.less(x, y) {
            self.cut(x, y);
            self.cascading_cut(y);
        }
        if self.less(x, self.min) {
            self.min = x;
        }
    }

    /// All members of the circular list containing `start`.
    fn ring(&self, start: u32) -> Vec<u32> {
        let mut out = vec![start];
        let mut cur = self.nodes[start as usize].right;
        while cur != start {
            out.push(cur);
            cur = self.nodes[cur as usize].right;
        }
        out
    }

    fn unlink(&mut self, x: u32) {
        let (l, r) = (self.nodes[x as usize].left, self.nodes[x as usize].right);
        self.nodes[l as usize].right = r;
        self.nodes[r as usize].left = l;
        self.nodes[x as usize].left = x;
        self.nodes[x as usize].right = x;
    }

    fn splice_after(&mut self, anchor: u32, x: u32) {
        let r = self.nodes[anchor as usize].right;
        self.nodes[x as usize].left = anchor;
        self.nodes[x as usize].right = r;
        self.nodes[anchor as usize].right = x;
        self.nodes[r as usize].left = x;
    }

    fn add_root(&mut self, x: u32) {
        self.nodes[x as usize].parent = NIL;
        if self.min == NIL {
            self.nodes[x as usize].left = x;
            self.nodes[x as usize].right = x;
            self.min = x;
        } else {
            self.splice_after(self.min, x);
            if self.less(x, self.min) {
                self.min = x;
            }
        }
    }

    /// Make `y` a child of `x`.
    fn link(&mut self, y: u32, x: u32) {
        self.unlink(y);
        let c = self.nodes[x as usize].child;
        if c == NIL {
            self.nodes[x as usize].child = y;
        } else {
            self.splice_after(c, y);
        }
        self.nodes[y as usize].parent = x;
        self.nodes[y as usize].marked = false;
        self.nodes[x as usize].degree += 1;
    }

    fn consolidate(&mut self) {
        let roots = self.ring(self.min);
        let mut by_degree: Vec<u32> = Vec::new();

        for w in roots {
            let mut x = w;
            let mut d = self.nodes[x as usize].degree as usize;
            loop {
                if by_degree.len() <= d {
                    by_degree.resize(d + 1, NIL);
                }
                let y = by_degree[d];
                if y == NIL {
                    break;
                }
                let (keep, sink) = if self.less(y, x) { (y, x) } else { (x, y) };
                self.link(sink, keep);
                x = keep;
                by_degree[d] = NIL;
                d += 1;
            }
            by_degree[d] = x;
        }

        self.min = NIL;
        for x in by_degree.into_iter().filter(|&x| x != NIL) {
            self.nodes[x as usize].left = x;
            self.nodes[x as usize].right = x;
            self.add_root(x);
        }
    }

    fn cut(&mut self, x: u32, y: u32) {
        if self.nodes[y as usize].child == x {
            let r = self.nodes[x as usize].right;
            self.nodes[y as usize].child = if r == x { NIL } else { r };
        }
        self.unlink(x);
        self.nodes[y as usize].degree -= 1;
        self.nodes[x as usize].marked = false;
        self.add_root(x);
    }

    fn cascading_cut(&mut self, mut y: u32) {
        loop {
            let z = self.nodes[y as usize].parent;
            if z == NIL {
                return;
            }
            if !self.nodes[y as usize].marked {
                self.nodes[y as usize].marked = true;
                return;
            }
            self.cut(y, z);
            y = z;
        }
    }
}
