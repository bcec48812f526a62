use deskfs_core::{CollisionPolicy, EngineConfig, FsResult, FsTree, NodeId};
use deskfs_ops::{ItemKind, VirtualFs};
use proptest::prelude::*;

const NAMES: [&str; 4] = ["a", "b", "New Folder", "notes.txt"];

#[derive(Debug, Clone)]
enum Step {
    CreateFolder(usize, usize),
    CreateFile(usize, usize),
    Delete(usize),
    DeleteMany(usize, usize),
    Rename(usize, usize),
    RenameAuto(usize, usize),
    Move(usize, usize),
    Copy(usize, usize),
    CutPaste(usize, usize),
    CopyPaste(usize, usize),
    Undo,
    Redo,
}

fn step() -> impl Strategy<Value = Step> {
    let name = 0..NAMES.len();
    prop_oneof![
        (any::<usize>(), name.clone()).prop_map(|(p, n)| Step::CreateFolder(p, n)),
        (any::<usize>(), name.clone()).prop_map(|(p, n)| Step::CreateFile(p, n)),
        any::<usize>().prop_map(Step::Delete),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Step::DeleteMany(a, b)),
        (any::<usize>(), name.clone()).prop_map(|(t, n)| Step::Rename(t, n)),
        (any::<usize>(), name).prop_map(|(t, n)| Step::RenameAuto(t, n)),
        (any::<usize>(), any::<usize>()).prop_map(|(s, t)| Step::Move(s, t)),
        (any::<usize>(), any::<usize>()).prop_map(|(s, t)| Step::Copy(s, t)),
        (any::<usize>(), any::<usize>()).prop_map(|(s, t)| Step::CutPaste(s, t)),
        (any::<usize>(), any::<usize>()).prop_map(|(s, t)| Step::CopyPaste(s, t)),
        Just(Step::Undo),
        Just(Step::Redo),
    ]
}

type Structure = Vec<(NodeId, String, Option<NodeId>, Vec<NodeId>)>;

fn structure(tree: &FsTree) -> Structure {
    let mut out: Structure = tree
        .iter()
        .map(|n| (n.id, n.name.to_string(), n.parent, n.children().to_vec()))
        .collect();
    out.sort_by_key(|entry| entry.0);
    out
}

/// Path of the i-th live node, in id order.
fn pick(fs: &VirtualFs, i: usize) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = fs.tree().iter().map(|n| n.id).collect();
    ids.sort();
    let id = ids[i % ids.len()];
    fs.tree().path_of(id).unwrap()
}

fn run(fs: &mut VirtualFs, step: &Step) -> FsResult<()> {
    match *step {
        Step::CreateFolder(p, n) => {
            let parent = pick(fs, p);
            fs.create_item(ItemKind::Folder, NAMES[n], &parent)?;
        }
        Step::CreateFile(p, n) => {
            let parent = pick(fs, p);
            fs.create_item(ItemKind::File, NAMES[n], &parent)?;
        }
        Step::Delete(t) => {
            let target = pick(fs, t);
            fs.delete_item(&target)?;
        }
        Step::DeleteMany(a, b) => {
            let paths = [pick(fs, a), pick(fs, b)];
            fs.delete_items(&paths)?;
        }
        Step::Rename(t, n) => {
            let target = pick(fs, t);
            fs.rename_item(&target, NAMES[n])?;
        }
        Step::RenameAuto(t, n) => {
            let target = pick(fs, t);
            fs.rename_item_with(&target, NAMES[n], CollisionPolicy::AutoSuffix)?;
        }
        Step::Move(s, t) => {
            let (source, target) = (pick(fs, s), pick(fs, t));
            fs.move_item(&source, &target)?;
        }
        Step::Copy(s, t) => {
            let (source, target) = (pick(fs, s), pick(fs, t));
            fs.copy_item(&source, &target)?;
        }
        Step::CutPaste(s, t) => {
            let (source, target) = (pick(fs, s), pick(fs, t));
            fs.cut_to_clipboard(&[source])?;
            fs.paste_from_clipboard(&target)?;
        }
        Step::CopyPaste(s, t) => {
            let (source, target) = (pick(fs, s), pick(fs, t));
            fs.copy_to_clipboard(&[source])?;
            fs.paste_from_clipboard(&target)?;
        }
        Step::Undo => {
            fs.undo_last_operation()?;
        }
        Step::Redo => {
            fs.redo_last_operation()?;
        }
    }
    Ok(())
}

fn references_are_live(fs: &VirtualFs) -> bool {
    let tree = fs.tree();
    let clipboard_ok = fs
        .clipboard()
        .intent()
        .is_none_or(|i| i.node_ids.iter().all(|id| tree.contains(*id)));
    clipboard_ok && fs.selection().iter().all(|id| tree.contains(*id))
}

fn seeded() -> VirtualFs {
    VirtualFs::new(
        EngineConfig::builder()
            .history_limit(500usize)
            .build()
            .unwrap(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Structural invariants and live references hold after every step, and
    /// a failed step changes nothing.
    #[test]
    fn prop_invariants_hold(steps in prop::collection::vec(step(), 1..40)) {
        let mut fs = seeded();
        for step in &steps {
            let before = structure(fs.tree());
            let result = run(&mut fs, step);

            prop_assert!(fs.tree().check_integrity().is_ok(), "broken after {:?}", step);
            prop_assert!(references_are_live(&fs), "stale reference after {:?}", step);
            if result.is_err() {
                prop_assert_eq!(structure(fs.tree()), before, "failed {:?} mutated the tree", step);
            }
        }
    }

    /// Undoing a freshly recorded operation restores the previous structure
    /// exactly, and redoing it restores the result.
    #[test]
    fn prop_undo_redo_round_trip(steps in prop::collection::vec(step(), 1..30)) {
        let mut fs = seeded();
        for step in &steps {
            if matches!(step, Step::Undo | Step::Redo) {
                continue;
            }
            let before = structure(fs.tree());
            let last = fs.history().peek().map(|e| e.id);
            if run(&mut fs, step).is_err() {
                continue;
            }
            if fs.history().peek().map(|e| e.id) == last {
                continue;
            }

            let after = structure(fs.tree());
            prop_assert!(fs.undo_last_operation().is_ok());
            prop_assert_eq!(structure(fs.tree()), before, "undo of {:?}", step);
            prop_assert!(fs.redo_last_operation().is_ok());
            prop_assert_eq!(structure(fs.tree()), after, "redo of {:?}", step);
        }
    }

    /// Moving a folder into itself or any descendant is always rejected.
    #[test]
    fn prop_move_into_descendant_rejected(depth in 1usize..6, pick_at in any::<usize>()) {
        let mut fs = seeded();
        let mut path = Vec::new();
        for level in 0..depth {
            let id = fs
                .create_item(ItemKind::Folder, &format!("level {level}"), &path)
                .unwrap();
            path.push(id);
        }
        let source = &path[..1];
        let target = &path[..1 + pick_at % depth];
        let err = fs.move_item(source, target).unwrap_err();
        prop_assert!(matches!(err, deskfs_core::FsError::CyclicMove { .. }), "expected CyclicMove, got {:?}", err);
    }
}
