//! Directory listing with search and sort.
//!
//! Every call recomputes from the live tree and returns owned copies, so a
//! listing can never go stale behind the caller's back.

use std::cmp::Ordering;

use derive_builder::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use deskfs_core::{FsResult, FsTree, Node, NodeId};

/// Sort key for listings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Name,
    Size,
    /// Last modification time.
    Date,
    /// Folders first, then files grouped by type hint.
    Kind,
}

/// Sort direction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Options for [`list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), default)]
pub struct ListOptions {
    /// Case-insensitive substring filter on names.
    #[builder(setter(into, strip_option))]
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub sort_by: SortBy,

    #[serde(default)]
    pub sort_order: SortOrder,

    /// Include every descendant instead of direct children only.
    #[serde(default)]
    pub recursive: bool,
}

impl ListOptions {
    /// Create a new options builder.
    pub fn builder() -> ListOptionsBuilder {
        ListOptionsBuilder::default()
    }

    fn matches(&self, node: &Node) -> bool {
        match self.search.as_deref() {
            None | Some("") => true,
            Some(query) => node
                .name
                .to_lowercase()
                .contains(&query.to_lowercase()),
        }
    }
}

/// List the contents of the folder at `folder_path`.
pub fn list(tree: &FsTree, folder_path: &[NodeId], options: &ListOptions) -> FsResult<Vec<Node>> {
    let folder = tree.resolve_folder(folder_path)?;

    let candidates: Vec<NodeId> = if options.recursive {
        let mut ids = tree.subtree_ids(folder.id)?;
        ids.remove(0);
        ids
    } else {
        folder.children().to_vec()
    };

    let nodes = candidates
        .into_iter()
        .filter_map(|id| tree.get(id))
        .filter(|node| options.matches(node))
        .cloned()
        .sorted_by(|a, b| compare(a, b, options.sort_by, options.sort_order))
        .collect::<Vec<_>>();

    tracing::trace!(
        folder = %folder.id,
        count = nodes.len(),
        recursive = options.recursive,
        "listed folder"
    );
    Ok(nodes)
}

/// Search every descendant of a folder by name, sorted by name.
pub fn search(tree: &FsTree, folder_path: &[NodeId], query: &str) -> FsResult<Vec<Node>> {
    let options = ListOptions {
        search: Some(query.to_string()),
        recursive: true,
        ..ListOptions::default()
    };
    list(tree, folder_path, &options)
}

/// Sort nodes in place.
pub fn sort_nodes(nodes: &mut [Node], by: SortBy, order: SortOrder) {
    nodes.sort_by(|a, b| compare(a, b, by, order));
}

fn compare(a: &Node, b: &Node, by: SortBy, order: SortOrder) -> Ordering {
    let primary = match by {
        SortBy::Name => Ordering::Equal,
        SortBy::Size => a.size.cmp(&b.size),
        SortBy::Date => a.timestamps.modified.cmp(&b.timestamps.modified),
        SortBy::Kind => b
            .is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.file_type().cmp(&b.file_type())),
    };
    let ordering = primary.then_with(|| compare_names(a, b)).then(a.id.cmp(&b.id));

    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn compare_names(a: &Node, b: &Node) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}
