use chrono::{Duration, Utc};
use deskfs_core::{CollisionPolicy, Content, FsError, FsTree, Node, NodeId, Timestamps};
use deskfs_query::{ListOptions, SortBy, SortOrder, list, search, sort_nodes};

struct Fixture {
    tree: FsTree,
    docs: NodeId,
    report: NodeId,
}

fn add(tree: &mut FsTree, parent: NodeId, mut node: Node, age_days: i64) -> NodeId {
    let stamp = Utc::now() - Duration::days(age_days);
    node.timestamps = Timestamps {
        created: stamp,
        modified: stamp,
    };
    tree.insert(node, parent, None, CollisionPolicy::Reject).unwrap()
}

fn fixture() -> Fixture {
    let mut tree = FsTree::new();
    let root = tree.root_id();

    let id = tree.allocate_id();
    let docs = add(&mut tree, root, Node::new_folder(id, "Docs"), 1);

    let id = tree.allocate_id();
    let text = Content::Text("a".repeat(300));
    let report = add(&mut tree, docs, Node::new_file(id, "Report.txt", Some(text)), 3);

    let id = tree.allocate_id();
    let photo = Content::Reference {
        uri: "blob:photo".into(),
        size: 10_000,
    };
    add(&mut tree, docs, Node::new_file(id, "annual photo.png", Some(photo)), 10);

    let id = tree.allocate_id();
    let archive = add(&mut tree, docs, Node::new_folder(id, "archive"), 30);

    let id = tree.allocate_id();
    let old = Content::Text("old".into());
    add(&mut tree, archive, Node::new_file(id, "old report.md", Some(old)), 400);

    Fixture { tree, docs, report }
}

fn names(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.name.as_str()).collect()
}

#[test]
fn test_list_sorted_by_name_case_insensitive() {
    let f = fixture();
    let nodes = list(&f.tree, &[f.docs], &ListOptions::default()).unwrap();
    assert_eq!(names(&nodes), ["annual photo.png", "archive", "Report.txt"]);
}

#[test]
fn test_list_sorted_by_name_desc() {
    let f = fixture();
    let options = ListOptions::builder()
        .sort_order(SortOrder::Desc)
        .build()
        .unwrap();
    let nodes = list(&f.tree, &[f.docs], &options).unwrap();
    assert_eq!(names(&nodes), ["Report.txt", "archive", "annual photo.png"]);
}

#[test]
fn test_list_sorted_by_size() {
    let f = fixture();
    let options = ListOptions::builder().sort_by(SortBy::Size).build().unwrap();
    let nodes = list(&f.tree, &[f.docs], &options).unwrap();
    assert_eq!(names(&nodes), ["archive", "Report.txt", "annual photo.png"]);
}

#[test]
fn test_list_sorted_by_date() {
    let f = fixture();
    let options = ListOptions::builder()
        .sort_by(SortBy::Date)
        .sort_order(SortOrder::Desc)
        .build()
        .unwrap();
    let nodes = list(&f.tree, &[f.docs], &options).unwrap();
    // Adding "old report.md" touched the archive folder.
    assert_eq!(names(&nodes), ["archive", "Report.txt", "annual photo.png"]);
}

#[test]
fn test_list_sorted_by_kind_puts_folders_first() {
    let f = fixture();
    let options = ListOptions::builder().sort_by(SortBy::Kind).build().unwrap();
    let nodes = list(&f.tree, &[f.docs], &options).unwrap();
    assert_eq!(names(&nodes), ["archive", "Report.txt", "annual photo.png"]);
}

#[test]
fn test_list_search_filters_children_only() {
    let f = fixture();
    let options = ListOptions::builder().search("REPORT").build().unwrap();
    let nodes = list(&f.tree, &[f.docs], &options).unwrap();
    assert_eq!(names(&nodes), ["Report.txt"]);
}

#[test]
fn test_search_everywhere_descends() {
    let f = fixture();
    let nodes = search(&f.tree, &[], "report").unwrap();
    assert_eq!(names(&nodes), ["old report.md", "Report.txt"]);
}

#[test]
fn test_search_keeps_surrounding_spaces() {
    let f = fixture();
    assert!(search(&f.tree, &[], "report ").unwrap().is_empty());
    let nodes = search(&f.tree, &[], "OLD ").unwrap();
    assert_eq!(names(&nodes), ["old report.md"]);
}

#[test]
fn test_list_is_a_snapshot() {
    let mut f = fixture();
    let nodes = list(&f.tree, &[f.docs], &ListOptions::default()).unwrap();
    f.tree
        .rename(f.report, "Renamed.txt", CollisionPolicy::Reject)
        .unwrap();

    assert!(nodes.iter().any(|n| n.name == "Report.txt"));
    let fresh = list(&f.tree, &[f.docs], &ListOptions::default()).unwrap();
    assert!(fresh.iter().any(|n| n.name == "Renamed.txt"));
}

#[test]
fn test_list_of_file_fails() {
    let f = fixture();
    let err = list(&f.tree, &[f.docs, f.report], &ListOptions::default()).unwrap_err();
    assert_eq!(err, FsError::NotAFolder { id: f.report });
}

#[test]
fn test_sort_nodes_in_place() {
    let f = fixture();
    let mut nodes = list(&f.tree, &[f.docs], &ListOptions::default()).unwrap();
    sort_nodes(&mut nodes, SortBy::Size, SortOrder::Desc);
    assert_eq!(names(&nodes), ["annual photo.png", "Report.txt", "archive"]);
}
