//! The book domain hierarchy as an in-memory graph.
//!
//! Nodes are domain ids; every domain with a parent contributes one edge
//! pointing from the child to its parent. The storage layer accepts any
//! `ParentDomainId`, so every parent change is checked here for cycles
//! before it is written.

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Bfs, Reversed};
use petgraph::Direction;
use rusqlite::Connection;

use crate::error::Result;
use crate::model::BookDomainId;

#[derive(Debug, Clone, Default)]
pub struct DomainTree {
    graph: DiGraphMap<BookDomainId, ()>,
}

impl DomainTree {
    /// Build a tree from `(domain, parent)` pairs.
    pub fn from_links(
        links: impl IntoIterator<Item = (BookDomainId, Option<BookDomainId>)>,
    ) -> Self {
        let mut graph = DiGraphMap::new();
        for (id, parent) in links {
            graph.add_node(id);
            if let Some(parent) = parent {
                graph.add_edge(id, parent, ());
            }
        }
        Self { graph }
    }

    /// Load the current hierarchy from the `BookDomains` table.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt =
            conn.prepare("SELECT \"Id\", \"ParentDomainId\" FROM \"BookDomains\" ORDER BY \"Id\"")?;
        let links = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(BookDomainId, Option<BookDomainId>)>>>()?;
        Ok(Self::from_links(links))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    #[must_use]
    pub fn contains(&self, id: BookDomainId) -> bool {
        self.graph.contains_node(id)
    }

    #[must_use]
    pub fn parent(&self, id: BookDomainId) -> Option<BookDomainId> {
        self.graph.neighbors_directed(id, Direction::Outgoing).next()
    }

    /// Direct subdomains, ordered by id.
    #[must_use]
    pub fn children(&self, id: BookDomainId) -> Vec<BookDomainId> {
        let mut children: Vec<_> = self
            .graph
            .neighbors_directed(id, Direction::Incoming)
            .collect();
        children.sort_unstable();
        children
    }

    /// Domains without a parent, ordered by id.
    #[must_use]
    pub fn roots(&self) -> Vec<BookDomainId> {
        let mut roots: Vec<_> = self
            .graph
            .nodes()
            .filter(|&id| self.parent(id).is_none())
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Parent, grandparent, ... up to the root.
    ///
    /// The walk stops after visiting every node once, so a hierarchy that was
    /// corrupted outside this crate cannot loop forever.
    #[must_use]
    pub fn ancestors(&self, id: BookDomainId) -> Vec<BookDomainId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == id || ancestors.len() >= self.len() {
                break;
            }
            ancestors.push(node);
            current = self.parent(node);
        }
        ancestors
    }

    /// Every domain below `id`, breadth first.
    #[must_use]
    pub fn descendants(&self, id: BookDomainId) -> Vec<BookDomainId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, id);
        let mut found = Vec::new();
        while let Some(node) = bfs.next(reversed) {
            if node != id {
                found.push(node);
            }
        }
        found
    }

    /// Whether making `parent` the parent of `id` would close a cycle.
    ///
    /// That is the case when `parent` is `id` itself or one of its descendants.
    #[must_use]
    pub fn would_create_cycle(&self, id: BookDomainId, parent: BookDomainId) -> bool {
        if id == parent {
            return true;
        }
        if !self.contains(id) || !self.contains(parent) {
            return false;
        }
        petgraph::algo::has_path_connecting(&self.graph, parent, id, None)
    }
}
