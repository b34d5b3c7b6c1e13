use branchnote_core::{MemoryKvRepository, NodeFilter, NodeId, OutlineStore};

fn setup() -> OutlineStore<MemoryKvRepository> {
    OutlineStore::load(MemoryKvRepository::new())
}

fn contents(store: &OutlineStore<MemoryKvRepository>, tree_index: usize) -> Vec<String> {
    store.trees()[tree_index]
        .nodes
        .iter()
        .map(|node| node.content.clone())
        .collect()
}

fn levels(store: &OutlineStore<MemoryKvRepository>, tree_index: usize) -> Vec<u32> {
    store.trees()[tree_index]
        .nodes
        .iter()
        .map(|node| node.level)
        .collect()
}

#[test]
fn fresh_store_has_only_empty_main_tree() {
    let store = setup();
    assert_eq!(store.trees().len(), 1);
    assert!(store.trees()[0].is_main());
    assert!(store.trees()[0].nodes.is_empty());
    assert_eq!(store.active_tree_index(), 0);
    assert_eq!(store.current_filter(), NodeFilter::All);
}

#[test]
fn add_without_anchor_appends() {
    let mut store = setup();
    store.add_node("A", 0, None, 0).unwrap();
    store.add_node("B", 0, None, 3).unwrap();

    assert_eq!(contents(&store, 0), vec!["A", "B"]);
    assert_eq!(levels(&store, 0), vec![0, 3]);
}

#[test]
fn add_with_unknown_anchor_appends() {
    let mut store = setup();
    store.add_node("A", 0, None, 0).unwrap();
    store.add_node("B", 0, Some(NodeId::new_v4()), 0).unwrap();

    assert_eq!(contents(&store, 0), vec!["A", "B"]);
}

#[test]
fn add_to_unknown_tree_is_noop() {
    let mut store = setup();
    assert!(store.add_node("A", 3, None, 0).is_none());
    assert!(store.trees()[0].nodes.is_empty());
    assert!(store.repo().is_empty());
}

#[test]
fn add_after_anchor_skips_its_children() {
    let mut store = setup();
    let a = store.add_node("A", 0, None, 0).unwrap();
    store.add_node("B", 0, None, 1).unwrap();
    store.add_node("C", 0, None, 1).unwrap();

    store.add_node("D", 0, Some(a), 1).unwrap();

    assert_eq!(contents(&store, 0), vec!["A", "B", "C", "D"]);
}

#[test]
fn add_after_anchor_stops_before_next_sibling() {
    let mut store = setup();
    let a = store.add_node("A", 0, None, 0).unwrap();
    store.add_node("A.1", 0, None, 1).unwrap();
    store.add_node("A.1.1", 0, None, 2).unwrap();
    store.add_node("B", 0, None, 0).unwrap();

    store.add_node("A.2", 0, Some(a), 1).unwrap();

    assert_eq!(contents(&store, 0), vec!["A", "A.1", "A.1.1", "A.2", "B"]);
}

#[test]
fn add_after_leaf_inserts_directly_after_it() {
    let mut store = setup();
    store.add_node("A", 0, None, 0).unwrap();
    let b = store.add_node("B", 0, None, 1).unwrap();
    store.add_node("C", 0, None, 1).unwrap();

    store.add_node("B.1", 0, Some(b), 2).unwrap();

    assert_eq!(contents(&store, 0), vec!["A", "B", "B.1", "C"]);
}

#[test]
fn delete_keeps_children_in_place() {
    let mut store = setup();
    let a = store.add_node("A", 0, None, 0).unwrap();
    store.add_node("A.1", 0, None, 1).unwrap();
    store.add_node("A.1.1", 0, None, 2).unwrap();

    assert!(store.delete_node(a, 0));

    assert_eq!(contents(&store, 0), vec!["A.1", "A.1.1"]);
    assert_eq!(levels(&store, 0), vec![1, 2]);
}

#[test]
fn delete_unknown_node_or_tree_is_noop() {
    let mut store = setup();
    let a = store.add_node("A", 0, None, 0).unwrap();

    assert!(!store.delete_node(NodeId::new_v4(), 0));
    assert!(!store.delete_node(a, 7));
    assert_eq!(contents(&store, 0), vec!["A"]);
}

#[test]
fn update_applies_mutation_and_keeps_identity() {
    let mut store = setup();
    let a = store.add_node("draft", 0, None, 0).unwrap();

    assert!(store.update_node(a, 0, |node| {
        node.content = "final".to_string();
        node.id = NodeId::new_v4();
    }));

    let node = &store.trees()[0].nodes[0];
    assert_eq!(node.content, "final");
    assert_eq!(node.id, a);
}

#[test]
fn update_unknown_node_is_noop() {
    let mut store = setup();
    store.add_node("A", 0, None, 0).unwrap();
    let mut called = false;
    assert!(!store.update_node(NodeId::new_v4(), 0, |_| called = true));
    assert!(!called);
}

#[test]
fn indent_and_outdent_floor_at_zero() {
    let mut store = setup();
    let a = store.add_node("A", 0, None, 0).unwrap();

    assert!(store.indent_node(a, 0));
    assert!(store.indent_node(a, 0));
    assert_eq!(levels(&store, 0), vec![2]);

    assert!(store.outdent_node(a, 0));
    assert!(store.outdent_node(a, 0));
    assert!(store.outdent_node(a, 0));
    assert_eq!(levels(&store, 0), vec![0]);
}

#[test]
fn toggling_task_off_clears_completion() {
    let mut store = setup();
    let a = store.add_node("ship it", 0, None, 0).unwrap();

    assert!(!store.toggle_completed(a, 0), "plain nodes cannot complete");
    assert!(store.toggle_task(a, 0));
    assert!(store.toggle_completed(a, 0));
    assert!(store.trees()[0].nodes[0].is_done());

    assert!(store.toggle_task(a, 0));
    let node = &store.trees()[0].nodes[0];
    assert!(!node.is_task);
    assert!(!node.is_completed);
}

#[test]
fn filters_project_active_tree_in_order() {
    let mut store = setup();
    let a = store.add_node("A", 0, None, 0).unwrap();
    let b = store.add_node("B", 0, None, 0).unwrap();
    let c = store.add_node("C", 0, None, 0).unwrap();
    let d = store.add_node("D", 0, None, 0).unwrap();
    store.toggle_task(a, 0);
    store.toggle_task(c, 0);
    store.set_note(b, 0, "remember the receipt");
    store.set_note(d, 0, "  \n\t");

    store.set_filter(NodeFilter::Tasks);
    let tasks: Vec<_> = store.visible_nodes().iter().map(|n| n.id).collect();
    assert_eq!(tasks, vec![a, c]);

    store.set_filter(NodeFilter::Notes);
    let notes: Vec<_> = store.visible_nodes().iter().map(|n| n.id).collect();
    assert_eq!(notes, vec![b]);

    store.set_filter(NodeFilter::All);
    assert_eq!(store.visible_nodes().len(), 4);
}

#[test]
fn branched_filter_keeps_branch_origins() {
    let mut store = setup();
    store.add_node("A", 0, None, 0).unwrap();
    let b = store.add_node("B", 0, None, 0).unwrap();
    store.branch_out(b, 0).unwrap();

    store.set_filter(NodeFilter::Branched);
    let main_nodes = store.trees()[0].nodes.clone();
    let kept: Vec<_> = store
        .filtered_nodes(&main_nodes)
        .iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(kept, vec![b]);
    assert!(store.is_node_branched_out(b));
}

#[test]
fn editing_branch_origin_is_refused() {
    let mut store = setup();
    let a = store.add_node("A", 0, None, 0).unwrap();
    let b = store.add_node("B", 0, None, 0).unwrap();
    store.branch_out(a, 0).unwrap();

    assert!(!store.edit_node_content(a, 0, "renamed"));
    assert_eq!(store.trees()[0].nodes[0].content, "A");

    assert!(store.edit_node_content(b, 0, "B2"));
    assert_eq!(store.trees()[0].nodes[1].content, "B2");

    assert!(
        store.edit_node_content(a, 1, "root inside branch"),
        "the branch copy itself stays editable"
    );
}

#[test]
fn set_active_tree_rejects_out_of_range() {
    let mut store = setup();
    assert!(!store.set_active_tree(1));
    assert!(store.set_active_tree(0));
    assert_eq!(store.active_tree_index(), 0);
}

#[test]
fn clear_all_resets_to_fresh_main() {
    let mut store = setup();
    let a = store.add_node("A", 0, None, 0).unwrap();
    store.branch_out(a, 0).unwrap();
    assert_eq!(store.active_tree_index(), 1);

    store.clear_all();

    assert_eq!(store.trees().len(), 1);
    assert!(store.trees()[0].is_main());
    assert!(store.trees()[0].nodes.is_empty());
    assert_eq!(store.active_tree_index(), 0);
}

#[test]
fn indent_at_level_ceiling_is_noop() {
    let mut store = setup();
    let a = store.add_node("deep", 0, None, u32::MAX).unwrap();

    assert!(!store.indent_node(a, 0));
    assert_eq!(levels(&store, 0), vec![u32::MAX]);
    assert!(store.outdent_node(a, 0));
    assert_eq!(levels(&store, 0), vec![u32::MAX - 1]);
}
