//! Read-only queries over a deskfs tree.
//!
//! - **Listing** - the children of a folder, filtered and sorted
//! - **Search** - a case-insensitive name search across a whole subtree
//!
//! ```rust,ignore
//! use deskfs_core::FsTree;
//! use deskfs_query::{list, ListOptions, SortBy, SortOrder};
//!
//! let tree = FsTree::with_default_layout();
//! let options = ListOptions::builder()
//!     .sort_by(SortBy::Name)
//!     .sort_order(SortOrder::Desc)
//!     .build()
//!     .unwrap();
//!
//! for node in list(&tree, &[], &options).unwrap() {
//!     println!("{}", node.name);
//! }
//! ```

mod list;

pub use list::{ListOptions, ListOptionsBuilder, SortBy, SortOrder, list, search, sort_nodes};
