//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `branchnote_core` linkage.
//! - Exercise one branch-out/close round trip against an in-memory store.
//! - Keep output deterministic apart from generated ids.

use branchnote_core::{MemoryKvRepository, OutlineStore, Tree};

fn main() {
    println!("branchnote_core ping={}", branchnote_core::ping());
    println!("branchnote_core version={}", branchnote_core::core_version());

    let mut store = OutlineStore::load(MemoryKvRepository::new());
    let trip = store.add_node("Plan the trip itinerary", 0, None, 0);
    store.add_node("Book flights", 0, None, 1);
    store.add_node("Reserve hotel", 0, None, 1);
    store.add_node("Groceries", 0, None, 0);

    let Some(trip) = trip else {
        eprintln!("branchnote_cli: failed to seed outline");
        std::process::exit(1);
    };
    if store.branch_out(trip, 0).is_none() {
        eprintln!("branchnote_cli: branch out failed");
        std::process::exit(1);
    }
    for tree in store.trees() {
        print_tree(tree);
    }

    let closed = store.close_tree(1);
    println!("close_tree ok={closed} trees={}", store.trees().len());
    print_tree(store.active_tree());
}

fn print_tree(tree: &Tree) {
    let mut trail = tree.breadcrumb.clone();
    trail.push(tree.title.clone());
    println!("[{}] {}", tree.id, trail.join(" > "));
    for node in &tree.nodes {
        let indent = "  ".repeat(node.level as usize);
        println!("{indent}- {}", node.content);
    }
}
