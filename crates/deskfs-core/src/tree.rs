//! Tree store: the canonical node index and its structural invariants.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult};
use crate::node::{Node, NodeId, Timestamps};

/// Name of the root folder.
pub const ROOT_NAME: &str = "/";

/// Folders seeded under the root by [`FsTree::with_default_layout`].
pub const DEFAULT_LAYOUT: [&str; 6] = [
    "Desktop",
    "Documents",
    "Downloads",
    "Pictures",
    "Music",
    "Videos",
];

/// What to do when a name is already taken by a sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Fail with [`FsError::NameCollision`].
    #[default]
    Reject,
    /// Pick the lowest free "name (n)" with n >= 2.
    AutoSuffix,
}

/// Format the n-th collision-free variant of a name.
pub fn suffixed_name(base: &str, n: u32) -> CompactString {
    format_compact!("{base} ({n})")
}

/// Summary statistics for a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Number of files.
    pub files: u64,
    /// Number of folders, not counting the root.
    pub folders: u64,
    /// Sum of file sizes.
    pub total_size: u64,
    /// Deepest level below the root.
    pub max_depth: u32,
}

/// A detached copy of a node and all its descendants, in pre-order.
///
/// Used for delete snapshots (so undo restores the exact ids) and for copy
/// clones (with fresh ids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtree {
    nodes: Vec<Node>,
}

impl Subtree {
    /// Build a subtree from pre-ordered nodes, checking its shape.
    pub fn from_nodes(nodes: Vec<Node>) -> FsResult<Self> {
        let subtree = Self { nodes };
        subtree.check_shape()?;
        Ok(subtree)
    }

    /// A subtree holding a single detached node.
    pub fn single(node: Node) -> FsResult<Self> {
        Self::from_nodes(vec![node])
    }

    /// The topmost node.
    pub fn top(&self) -> &Node {
        &self.nodes[0]
    }

    /// Id of the topmost node.
    pub fn top_id(&self) -> NodeId {
        self.top().id
    }

    /// All nodes, top first.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every node in the subtree.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Rename the topmost node.
    pub fn set_top_name(&mut self, name: impl Into<CompactString>) {
        if let Some(top) = self.nodes.first_mut() {
            top.name = name.into();
        }
    }

    /// Check that the nodes form one well-linked tree rooted at `nodes[0]`.
    fn check_shape(&self) -> FsResult<()> {
        let Some(top) = self.nodes.first() else {
            return Err(FsError::corrupted("subtree is empty"));
        };

        let by_id: HashMap<NodeId, &Node> = self.nodes.iter().map(|n| (n.id, n)).collect();
        if by_id.len() != self.nodes.len() {
            return Err(FsError::corrupted("subtree repeats an id"));
        }

        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut stack = vec![top.id];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(FsError::corrupted(format!("{id} is reachable twice")));
            }
            let node = by_id[&id];
            for child in node.children() {
                let Some(child_node) = by_id.get(child) else {
                    return Err(FsError::corrupted(format!("{id} lists missing child {child}")));
                };
                if child_node.parent != Some(id) {
                    return Err(FsError::corrupted(format!(
                        "{child} does not point back to {id}"
                    )));
                }
                stack.push(*child);
            }
        }

        if visited.len() != self.nodes.len() {
            return Err(FsError::corrupted("subtree contains unreachable nodes"));
        }
        Ok(())
    }
}

/// The canonical node tree: an id index plus parent pointers.
///
/// Every mutator validates before touching anything, so a failed call leaves
/// the tree exactly as it was.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "TreeRecord", try_from = "TreeRecord")]
pub struct FsTree {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
}

impl Default for FsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FsTree {
    /// Create a tree holding only the root folder.
    pub fn new() -> Self {
        let root = Node::new_folder(NodeId::new(0), ROOT_NAME);
        let mut nodes = HashMap::new();
        nodes.insert(root.id, root);
        Self {
            root: NodeId::new(0),
            nodes,
            next_id: 1,
        }
    }

    /// Create a tree with the usual home folders under the root.
    pub fn with_default_layout() -> Self {
        Self::with_folders(&DEFAULT_LAYOUT)
    }

    /// Create a tree with the given folders under the root.
    ///
    /// Duplicate names are auto-suffixed.
    pub fn with_folders(names: &[&str]) -> Self {
        let mut tree = Self::new();
        for name in names {
            let id = tree.allocate_id();
            let root = tree.root;
            // Only a name clash can fail here and AutoSuffix resolves it.
            let _ = tree.insert(
                Node::new_folder(id, *name),
                root,
                None,
                CollisionPolicy::AutoSuffix,
            );
        }
        tree
    }

    /// Id of the root folder.
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// The root folder.
    pub fn root(&self) -> &Node {
        &self.nodes[&self.root]
    }

    /// Number of live nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if an id is live.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a node, failing with `NotFound`.
    pub fn node(&self, id: NodeId) -> FsResult<&Node> {
        self.nodes.get(&id).ok_or(FsError::NotFound { id })
    }

    /// Look up a folder, failing with `NotFound` or `NotAFolder`.
    pub fn folder(&self, id: NodeId) -> FsResult<&Node> {
        let node = self.node(id)?;
        if !node.is_folder() {
            return Err(FsError::NotAFolder { id });
        }
        Ok(node)
    }

    /// Ordered child ids of a folder.
    pub fn children(&self, id: NodeId) -> FsResult<&[NodeId]> {
        Ok(self.folder(id)?.children())
    }

    /// Iterate over all live nodes in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Reserve a fresh id. Ids are never handed out twice.
    pub fn allocate_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Parent chain of a node, nearest first, excluding the node itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.get(id).and_then(|n| n.parent);
        std::iter::from_fn(move || {
            let id = current?;
            current = self.get(id).and_then(|n| n.parent);
            Some(id)
        })
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Ids of a node and all its descendants, in pre-order.
    pub fn subtree_ids(&self, id: NodeId) -> FsResult<Vec<NodeId>> {
        self.node(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.get(current) {
                stack.extend(node.children().iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Position of a node among its siblings.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.get(id)?.parent?;
        self.get(parent)?.children().iter().position(|c| *c == id)
    }

    /// Find a direct child by exact name.
    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent)?
            .children()
            .iter()
            .copied()
            .find(|c| self.get(*c).is_some_and(|n| n.name == name))
    }

    /// Check whether a sibling other than `except` already uses `name`.
    pub fn name_taken(&self, parent: NodeId, name: &str, except: Option<NodeId>) -> bool {
        self.get(parent).is_some_and(|p| {
            p.children()
                .iter()
                .filter(|c| Some(**c) != except)
                .any(|c| self.get(*c).is_some_and(|n| n.name == name))
        })
    }

    /// `base` if free, otherwise the lowest free "base (n)" with n >= 2.
    pub fn unique_child_name(
        &self,
        parent: NodeId,
        base: &str,
        except: Option<NodeId>,
    ) -> CompactString {
        if !self.name_taken(parent, base, except) {
            return CompactString::from(base);
        }
        let mut n = 2;
        loop {
            let candidate = suffixed_name(base, n);
            if !self.name_taken(parent, &candidate, except) {
                return candidate;
            }
            n += 1;
        }
    }

    /// The name a node would get under `parent` according to `policy`.
    pub fn settle_name(
        &self,
        parent: NodeId,
        name: &str,
        except: Option<NodeId>,
        policy: CollisionPolicy,
    ) -> FsResult<CompactString> {
        if !self.name_taken(parent, name, except) {
            return Ok(CompactString::from(name));
        }
        match policy {
            CollisionPolicy::Reject => Err(FsError::NameCollision {
                name: CompactString::from(name),
                parent,
            }),
            CollisionPolicy::AutoSuffix => Ok(self.unique_child_name(parent, name, except)),
        }
    }

    /// Insert a detached node (a file or an empty folder) under `parent`.
    ///
    /// The node's name may be changed under [`CollisionPolicy::AutoSuffix`].
    pub fn insert(
        &mut self,
        node: Node,
        parent: NodeId,
        index: Option<usize>,
        policy: CollisionPolicy,
    ) -> FsResult<NodeId> {
        if !node.children().is_empty() {
            return Err(FsError::corrupted(
                "insert expects a node without children; use insert_subtree",
            ));
        }
        self.insert_subtree(Subtree { nodes: vec![node] }, parent, index, policy)
    }

    /// Insert a whole subtree under `parent`, keeping every id it carries.
    ///
    /// Returns the id of the subtree's top node.
    pub fn insert_subtree(
        &mut self,
        subtree: Subtree,
        parent: NodeId,
        index: Option<usize>,
        policy: CollisionPolicy,
    ) -> FsResult<NodeId> {
        subtree.check_shape()?;
        self.folder(parent)?;
        if let Some(id) = subtree.ids().find(|id| self.contains(*id)) {
            return Err(FsError::DuplicateId { id });
        }
        let name = self.settle_name(parent, &subtree.top().name, None, policy)?;

        let top_id = subtree.top_id();
        let max_id = subtree.ids().map(|id| id.0).max().unwrap_or(0);
        for (i, mut node) in subtree.nodes.into_iter().enumerate() {
            if i == 0 {
                node.parent = Some(parent);
                node.name = name.clone();
            }
            self.nodes.insert(node.id, node);
        }
        self.next_id = self.next_id.max(max_id + 1);

        self.attach(top_id, parent, index);
        self.touch(parent);
        self.debug_check();
        Ok(top_id)
    }

    /// Copy of a node and its descendants, sharing ids with the live tree.
    pub fn snapshot(&self, id: NodeId) -> FsResult<Subtree> {
        let ids = self.subtree_ids(id)?;
        let nodes = ids.iter().map(|id| self.nodes[id].clone()).collect();
        Ok(Subtree { nodes })
    }

    /// Deep clone of a node's subtree with fresh ids throughout.
    ///
    /// The clone is detached; its top node keeps the source name.
    pub fn clone_subtree(&mut self, id: NodeId) -> FsResult<Subtree> {
        let source = self.snapshot(id)?;
        let mapping: HashMap<NodeId, NodeId> = source
            .ids()
            .map(|old| (old, self.allocate_id()))
            .collect();

        let stamps = Timestamps::now();
        let nodes = source
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, mut node)| {
                node.id = mapping[&node.id];
                node.parent = if i == 0 {
                    None
                } else {
                    node.parent.map(|p| mapping[&p])
                };
                if let Some(children) = node.children_mut() {
                    for child in children.iter_mut() {
                        *child = mapping[&*child];
                    }
                }
                node.timestamps = stamps;
                node
            })
            .collect();
        Ok(Subtree { nodes })
    }

    /// Remove a node and its whole subtree, returning what was removed.
    pub fn remove(&mut self, id: NodeId) -> FsResult<Subtree> {
        if id == self.root {
            return Err(FsError::RootImmutable);
        }
        let ids = self.subtree_ids(id)?;
        let parent = self.nodes[&id].parent;

        if let Some(parent) = parent {
            self.detach(id, parent);
            self.touch(parent);
        }
        let nodes = ids.iter().filter_map(|id| self.nodes.remove(id)).collect();

        self.debug_check();
        Ok(Subtree { nodes })
    }

    /// Move a node under a new parent, keeping its name.
    pub fn reparent(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        index: Option<usize>,
        policy: CollisionPolicy,
    ) -> FsResult<CompactString> {
        let name = self.node(id)?.name.clone();
        self.reparent_as(id, new_parent, index, &name, policy)
    }

    /// Move a node under a new parent and give it `name` there.
    ///
    /// Returns the name the node ends up with.
    pub fn reparent_as(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        index: Option<usize>,
        name: &str,
        policy: CollisionPolicy,
    ) -> FsResult<CompactString> {
        if id == self.root {
            return Err(FsError::RootImmutable);
        }
        let old_parent = self.node(id)?.parent.ok_or(FsError::RootImmutable)?;
        self.node(new_parent)?;
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(FsError::CyclicMove {
                source_id: id,
                target: new_parent,
            });
        }
        self.folder(new_parent)?;
        let name = self.settle_name(new_parent, name, Some(id), policy)?;

        self.detach(id, old_parent);
        self.attach(id, new_parent, index);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
            node.name = name.clone();
            node.timestamps.touch();
        }
        self.touch(old_parent);
        self.touch(new_parent);

        self.debug_check();
        Ok(name)
    }

    /// Rename a node in place. Returns the name it ends up with.
    pub fn rename(
        &mut self,
        id: NodeId,
        new_name: &str,
        policy: CollisionPolicy,
    ) -> FsResult<CompactString> {
        if id == self.root {
            return Err(FsError::RootImmutable);
        }
        let parent = self.node(id)?.parent.ok_or(FsError::RootImmutable)?;
        let name = self.settle_name(parent, new_name, Some(id), policy)?;

        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = name.clone();
            node.timestamps.touch();
        }
        self.touch(parent);
        Ok(name)
    }

    /// Verify invariants 1-4: single root, consistent parent/child links,
    /// acyclicity and unique sibling names.
    pub fn check_integrity(&self) -> FsResult<()> {
        let root = self
            .get(self.root)
            .ok_or_else(|| FsError::corrupted("root is missing"))?;
        if root.parent.is_some() || !root.is_folder() {
            return Err(FsError::corrupted("root must be a folder without parent"));
        }

        for (id, node) in &self.nodes {
            if *id != node.id {
                return Err(FsError::corrupted(format!("{id} indexes node {}", node.id)));
            }
            if id.0 >= self.next_id {
                return Err(FsError::corrupted(format!("{id} is beyond the id counter")));
            }
            match node.parent {
                None if *id != self.root => {
                    return Err(FsError::corrupted(format!("{id} has no parent")));
                }
                None => {}
                Some(parent) => {
                    let parent_node = self.get(parent).ok_or_else(|| {
                        FsError::corrupted(format!("{id} points at missing parent {parent}"))
                    })?;
                    let listed = parent_node.children().iter().filter(|c| **c == *id).count();
                    if !parent_node.is_folder() || listed != 1 {
                        return Err(FsError::corrupted(format!(
                            "{parent} lists {id} {listed} times"
                        )));
                    }
                }
            }

            let mut names = HashSet::with_capacity(node.child_count());
            for child in node.children() {
                let child_node = self.get(*child).ok_or_else(|| {
                    FsError::corrupted(format!("{id} lists missing child {child}"))
                })?;
                if child_node.parent != Some(*id) {
                    return Err(FsError::corrupted(format!(
                        "{child} does not point back to {id}"
                    )));
                }
                if !names.insert(child_node.name.as_str()) {
                    return Err(FsError::corrupted(format!(
                        "duplicate name '{}' in {id}",
                        child_node.name
                    )));
                }
            }
        }

        let reachable = self.subtree_ids(self.root)?;
        if reachable.len() != self.nodes.len() {
            return Err(FsError::corrupted("tree contains unreachable nodes"));
        }
        Ok(())
    }

    /// Compute summary statistics.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut stack = vec![(self.root, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            stats.max_depth = stats.max_depth.max(depth);
            if node.is_folder() {
                if id != self.root {
                    stats.folders += 1;
                }
                stack.extend(node.children().iter().map(|c| (*c, depth + 1)));
            } else {
                stats.files += 1;
                stats.total_size += node.size;
            }
        }
        stats
    }

    fn attach(&mut self, id: NodeId, parent: NodeId, index: Option<usize>) {
        if let Some(children) = self.nodes.get_mut(&parent).and_then(Node::children_mut) {
            let at = index.unwrap_or(children.len()).min(children.len());
            children.insert(at, id);
        }
    }

    fn detach(&mut self, id: NodeId, parent: NodeId) {
        if let Some(children) = self.nodes.get_mut(&parent).and_then(Node::children_mut) {
            children.retain(|c| *c != id);
        }
    }

    fn touch(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.timestamps.modified = Utc::now();
        }
    }

    fn debug_check(&self) {
        debug_assert!(
            self.check_integrity().is_ok(),
            "tree invariant broken: {:?}",
            self.check_integrity()
        );
    }
}

/// Plain-data form of a tree used for serialization.
#[derive(Serialize, Deserialize)]
struct TreeRecord {
    root: NodeId,
    next_id: u64,
    nodes: Vec<Node>,
}

impl From<FsTree> for TreeRecord {
    fn from(tree: FsTree) -> Self {
        let order = tree.subtree_ids(tree.root).unwrap_or_default();
        let mut nodes = tree.nodes;
        Self {
            root: tree.root,
            next_id: tree.next_id,
            nodes: order.iter().filter_map(|id| nodes.remove(id)).collect(),
        }
    }
}

impl TryFrom<TreeRecord> for FsTree {
    type Error = FsError;

    fn try_from(record: TreeRecord) -> FsResult<Self> {
        let count = record.nodes.len();
        let nodes: HashMap<NodeId, Node> = record.nodes.into_iter().map(|n| (n.id, n)).collect();
        if nodes.len() != count {
            return Err(FsError::corrupted("snapshot repeats an id"));
        }
        let tree = Self {
            root: record.root,
            nodes,
            next_id: record.next_id,
        };
        tree.check_integrity()?;
        Ok(tree)
    }
}
