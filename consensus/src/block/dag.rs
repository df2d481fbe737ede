//! Pending block DAG.
//!
//! Vertices are kept in a map keyed by block hash. Parent and child links are
//! lists of hashes, children being only a lookup index maintained by the DAG.
//!
//! A parent which is not pending when its child is inserted stays outside of the
//! DAG for the lifetime of the child. Therefore every vertex is inserted after all
//! its linked parents and insertion order (`seq`) is a topological order.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::block::types::{BlockHash, BlockHeader, ConciliumId};

#[derive(Debug, Clone)]
pub struct Vertex<P> {
    header: BlockHeader,
    patch: P,
    seq: u64,
    /// Parents present in the DAG, in header order.
    parents: Vec<BlockHash>,
    children: Vec<BlockHash>,
    /// Concilium ids along the primary parent walk, own id included.
    witnesses_below: BTreeSet<ConciliumId>,
    /// Longest pending chain below, this vertex included.
    height: usize,
}

impl<P> Vertex<P> {
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn patch(&self) -> &P {
        &self.patch
    }

    pub fn hash(&self) -> BlockHash {
        self.header.hash
    }

    pub fn concilium_id(&self) -> ConciliumId {
        self.header.concilium_id
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty
    }

    pub fn parents(&self) -> &[BlockHash] {
        &self.parents
    }

    pub fn children(&self) -> &[BlockHash] {
        &self.children
    }

    pub fn witness_below(&self) -> usize {
        self.witnesses_below.len()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn into_parts(self) -> (BlockHeader, P) {
        (self.header, self.patch)
    }
}

#[derive(Debug)]
pub struct BlockDag<P> {
    vertices: HashMap<BlockHash, Vertex<P>>,
    next_seq: u64,
}

impl<P> Default for BlockDag<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> BlockDag<P> {
    pub fn new() -> Self {
        Self {
            vertices: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Number of vertices.
    pub fn order(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn has_vertex(&self, hash: &BlockHash) -> bool {
        self.vertices.contains_key(hash)
    }

    pub fn vertex(&self, hash: &BlockHash) -> Option<&Vertex<P>> {
        self.vertices.get(hash)
    }

    /// Inserts a vertex linking it to the parents that are already present.
    /// Caller makes sure the hash is not present yet.
    pub(crate) fn insert(&mut self, header: BlockHeader, patch: P) {
        let hash = header.hash;
        let parents = header
            .parent_hashes
            .iter()
            .filter(|parent| self.vertices.contains_key(*parent))
            .copied()
            .collect::<Vec<_>>();
        let (witnesses_below, height) = self.derive(header.concilium_id, &parents);

        for parent in &parents {
            if let Some(vertex) = self.vertices.get_mut(parent) {
                vertex.children.push(hash);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.vertices.insert(
            hash,
            Vertex {
                header,
                patch,
                seq,
                parents,
                children: vec![],
                witnesses_below,
                height,
            },
        );
    }

    /// Removes the vertex and unlinks it from its neighbours.
    /// Former children keep the hash in their header as an external parent.
    pub(crate) fn remove(&mut self, hash: &BlockHash) -> Option<Vertex<P>> {
        let vertex = self.vertices.remove(hash)?;
        for parent in &vertex.parents {
            if let Some(parent) = self.vertices.get_mut(parent) {
                parent.children.retain(|child| child != hash);
            }
        }
        for child in &vertex.children {
            if let Some(child) = self.vertices.get_mut(child) {
                child.parents.retain(|parent| parent != hash);
            }
        }
        Some(vertex)
    }

    /// Recomputes memoized witness counts and heights after vertices were removed.
    pub(crate) fn refresh(&mut self) {
        for hash in self.hashes_in_order() {
            let (concilium_id, parents) = match self.vertices.get(&hash) {
                Some(vertex) => (vertex.concilium_id(), vertex.parents.clone()),
                None => continue,
            };
            let (witnesses_below, height) = self.derive(concilium_id, &parents);
            if let Some(vertex) = self.vertices.get_mut(&hash) {
                vertex.witnesses_below = witnesses_below;
                vertex.height = height;
            }
        }
    }

    fn derive(
        &self,
        concilium_id: ConciliumId,
        parents: &[BlockHash],
    ) -> (BTreeSet<ConciliumId>, usize) {
        let mut witnesses_below = parents
            .first()
            .and_then(|primary| self.vertices.get(primary))
            .map(|primary| primary.witnesses_below.clone())
            .unwrap_or_default();
        witnesses_below.insert(concilium_id);

        let height = parents
            .iter()
            .filter_map(|parent| self.vertices.get(parent))
            .map(|parent| parent.height)
            .max()
            .unwrap_or(0)
            + 1;
        (witnesses_below, height)
    }

    /// Vertices without children, in insertion order.
    pub fn tips(&self) -> Vec<BlockHash> {
        self.vertices_in_order()
            .into_iter()
            .filter(|vertex| vertex.is_tip())
            .map(Vertex::hash)
            .collect()
    }

    pub fn vertices_in_order(&self) -> Vec<&Vertex<P>> {
        let mut vertices = self.vertices.values().collect::<Vec<_>>();
        vertices.sort_by_key(|vertex| vertex.seq);
        vertices
    }

    pub fn hashes_in_order(&self) -> Vec<BlockHash> {
        self.vertices_in_order()
            .into_iter()
            .map(Vertex::hash)
            .collect()
    }

    /// Pending ancestors of `hash`, `hash` itself excluded.
    pub fn ancestors(&self, hash: &BlockHash) -> HashSet<BlockHash> {
        self.ancestors_of_all([hash])
    }

    /// Pending descendants of `hash`, `hash` itself excluded.
    pub fn descendants(&self, hash: &BlockHash) -> HashSet<BlockHash> {
        self.descendants_of_all([hash])
    }

    /// Union of the pending ancestors of `hashes`. A hash from `hashes` is included
    /// only when it is an ancestor of another one.
    pub fn ancestors_of_all<'a, I>(&self, hashes: I) -> HashSet<BlockHash>
    where
        I: IntoIterator<Item = &'a BlockHash>,
    {
        self.walk(hashes, |vertex| &vertex.parents)
    }

    /// Union of the pending descendants of `hashes`. A hash from `hashes` is included
    /// only when it is a descendant of another one.
    pub fn descendants_of_all<'a, I>(&self, hashes: I) -> HashSet<BlockHash>
    where
        I: IntoIterator<Item = &'a BlockHash>,
    {
        self.walk(hashes, |vertex| &vertex.children)
    }

    fn walk<'a, I, F>(&self, hashes: I, next: F) -> HashSet<BlockHash>
    where
        I: IntoIterator<Item = &'a BlockHash>,
        F: Fn(&Vertex<P>) -> &Vec<BlockHash>,
    {
        let mut visited = HashSet::new();
        let mut stack = hashes
            .into_iter()
            .filter_map(|hash| self.vertices.get(hash))
            .flat_map(|vertex| next(vertex).iter().copied())
            .collect::<Vec<_>>();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(vertex) = self.vertices.get(&current) {
                stack.extend(next(vertex).iter().copied());
            }
        }
        visited
    }
}
