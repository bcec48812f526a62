//! Path resolution: id paths and name paths to live nodes.
//!
//! A path is the ordered list of node ids from the root down to a target.
//! The leading root id is optional. Resolution never mutates the tree.

use crate::error::{FsError, FsResult};
use crate::node::{Node, NodeId};
use crate::tree::FsTree;

impl FsTree {
    /// Walk an id path from the root and return the terminal node.
    ///
    /// Fails with `NotFound` at the first segment that is not a child of the
    /// previous one, or `NotAFolder` when a file appears before the end.
    /// The empty path is the root.
    pub fn resolve(&self, path: &[NodeId]) -> FsResult<&Node> {
        let segments = match path.split_first() {
            Some((first, rest)) if *first == self.root_id() => rest,
            _ => path,
        };

        let mut current = self.root();
        for segment in segments {
            if !current.is_folder() {
                return Err(FsError::NotAFolder { id: current.id });
            }
            if !current.children().contains(segment) {
                return Err(FsError::NotFound { id: *segment });
            }
            current = self.node(*segment)?;
        }
        Ok(current)
    }

    /// Resolve a path that must end at a folder.
    pub fn resolve_folder(&self, path: &[NodeId]) -> FsResult<&Node> {
        let node = self.resolve(path)?;
        if !node.is_folder() {
            return Err(FsError::NotAFolder { id: node.id });
        }
        Ok(node)
    }

    /// Resolve a slash-separated name path such as `Desktop/todo.txt`.
    ///
    /// Leading, trailing and repeated slashes are ignored, so `/` and the
    /// empty string are the root.
    pub fn resolve_names(&self, path: &str) -> FsResult<&Node> {
        let mut current = self.root();
        for name in path.split('/').filter(|s| !s.is_empty()) {
            if !current.is_folder() {
                return Err(FsError::NotAFolder { id: current.id });
            }
            let child = self
                .child_by_name(current.id, name)
                .ok_or_else(|| FsError::PathNotFound {
                    path: path.to_string(),
                })?;
            current = self.node(child)?;
        }
        Ok(current)
    }

    /// Id path of a name path, root first.
    pub fn parse_path(&self, path: &str) -> FsResult<Vec<NodeId>> {
        let id = self.resolve_names(path)?.id;
        self.path_of(id)
    }

    /// Id path from the root to `id`, both included.
    pub fn path_of(&self, id: NodeId) -> FsResult<Vec<NodeId>> {
        self.node(id)?;
        let mut path: Vec<NodeId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);
        Ok(path)
    }

    /// Human-readable path such as `/Desktop/todo.txt`.
    pub fn display_path(&self, id: NodeId) -> FsResult<String> {
        let path = self.path_of(id)?;
        let names: Vec<&str> = path
            .iter()
            .skip(1)
            .filter_map(|id| self.get(*id))
            .map(|n| n.name.as_str())
            .collect();
        Ok(format!("/{}", names.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Content, Node};
    use crate::tree::CollisionPolicy;

    fn sample() -> (FsTree, NodeId, NodeId) {
        let mut tree = FsTree::new();
        let root = tree.root_id();
        let desktop = tree.allocate_id();
        tree.insert(Node::new_folder(desktop, "Desktop"), root, None, CollisionPolicy::Reject)
            .unwrap();
        let todo = tree.allocate_id();
        tree.insert(
            Node::new_file(todo, "todo.txt", Some(Content::Text("milk".into()))),
            desktop,
            None,
            CollisionPolicy::Reject,
        )
        .unwrap();
        (tree, desktop, todo)
    }

    #[test]
    fn test_resolve_with_and_without_root() {
        let (tree, desktop, todo) = sample();
        let root = tree.root_id();
        assert_eq!(tree.resolve(&[root, desktop, todo]).unwrap().id, todo);
        assert_eq!(tree.resolve(&[desktop, todo]).unwrap().id, todo);
        assert_eq!(tree.resolve(&[]).unwrap().id, root);
        assert_eq!(tree.resolve(&[root]).unwrap().id, root);
    }

    #[test]
    fn test_resolve_broken_segment() {
        let (tree, desktop, _) = sample();
        let ghost = NodeId::new(999);
        assert_eq!(
            tree.resolve(&[desktop, ghost]).unwrap_err(),
            FsError::NotFound { id: ghost }
        );
    }

    #[test]
    fn test_resolve_through_file() {
        let (tree, desktop, todo) = sample();
        assert_eq!(
            tree.resolve(&[desktop, todo, desktop]).unwrap_err(),
            FsError::NotAFolder { id: todo }
        );
    }

    #[test]
    fn test_resolve_skipping_level_fails() {
        let (tree, _, todo) = sample();
        assert_eq!(
            tree.resolve(&[todo]).unwrap_err(),
            FsError::NotFound { id: todo }
        );
    }

    #[test]
    fn test_resolve_folder_rejects_file() {
        let (tree, desktop, todo) = sample();
        assert!(tree.resolve_folder(&[desktop]).is_ok());
        assert_eq!(
            tree.resolve_folder(&[desktop, todo]).unwrap_err(),
            FsError::NotAFolder { id: todo }
        );
    }

    #[test]
    fn test_names_round_trip() {
        let (tree, desktop, todo) = sample();
        assert_eq!(tree.resolve_names("/Desktop/todo.txt").unwrap().id, todo);
        assert_eq!(tree.resolve_names("Desktop/").unwrap().id, desktop);
        assert_eq!(
            tree.parse_path("Desktop/todo.txt").unwrap(),
            vec![tree.root_id(), desktop, todo]
        );
        assert_eq!(tree.display_path(todo).unwrap(), "/Desktop/todo.txt");
        assert_eq!(tree.display_path(tree.root_id()).unwrap(), "/");
        assert!(matches!(
            tree.resolve_names("Desktop/missing"),
            Err(FsError::PathNotFound { .. })
        ));
    }
}
