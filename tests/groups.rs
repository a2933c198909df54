//! Group hierarchy resolution and authority ranking

mod common;

use accessrules::{Access, MemoryStore};
use common::*;

fn setup() -> Access<MemoryStore> {
    Access::new(memory_store())
}

// ============================================================================
// Paths and ancestry
// ============================================================================

#[test]
fn group_paths_are_root_first() {
    let mut a = setup();
    assert_eq!(a.get_group_path(PUBLISHER).unwrap(), vec![PUBLIC, REGISTERED, AUTHOR, EDITOR, PUBLISHER]);
    assert_eq!(a.get_group_path(ADMIN).unwrap(), vec![PUBLIC, MANAGER, ADMIN]);
    assert_eq!(a.get_group_path(PUBLIC).unwrap(), vec![PUBLIC]);
    assert!(a.get_group_path(99).unwrap().is_empty());
}

#[test]
fn remove_descendent_groups_keeps_eldest() {
    let mut a = setup();
    assert_eq!(a.remove_descendent_groups(&[PUBLISHER, EDITOR, AUTHOR]).unwrap(), vec![AUTHOR]);
    assert_eq!(
        a.remove_descendent_groups(&[INV_AUTHOR, ADMIN, CUSTOMER, MANAGER]).unwrap(),
        vec![MANAGER, INV_AUTHOR, CUSTOMER]
    );
    assert_eq!(a.remove_descendent_groups(&group_ids()).unwrap(), vec![PUBLIC]);
}

#[test]
fn lowest_ancestor_needs_one_line() {
    let mut a = setup();
    assert_eq!(a.lowest_ancestor_group(&[PUBLISHER, AUTHOR, EDITOR]).unwrap(), Some(AUTHOR));
    assert_eq!(a.lowest_ancestor_group(&[REGISTERED, CUSTOMER]).unwrap(), Some(REGISTERED));
    assert_eq!(a.lowest_ancestor_group(&[EDITOR, INV_AUTHOR]).unwrap(), None);
    assert_eq!(a.lowest_ancestor_group(&[GUEST, CUSTOMER]).unwrap(), None);
}

#[test]
fn group_lookup_by_title() {
    let a = setup();
    assert_eq!(a.get_group_id("Super Users").unwrap(), Some(SUPER_USER));
    assert_eq!(a.get_group_id(" Editor ").unwrap(), Some(EDITOR));
    assert_eq!(a.get_group_id("editor").unwrap(), None);
}

#[test]
fn depth_counts_parent_chain() {
    let mut a = setup();
    assert_eq!(a.group_depth(PUBLIC).unwrap(), 1);
    assert_eq!(a.group_depth(GUEST).unwrap(), 2);
    assert_eq!(a.group_depth(CUSTOMER).unwrap(), 3);
    assert_eq!(a.group_depth(PUBLISHER).unwrap(), 5);
    assert_eq!(a.group_depth(99).unwrap(), 0);
}

#[test]
fn missing_group_tree_is_fatal() {
    let mut store = MemoryStore::new();
    store.add_asset(1, 0, "root.1", ROOT_RULE);
    let mut a = Access::new(store);
    assert!(matches!(a.get_group_path(1), Err(accessrules::AccessError::Configuration(_))));
}

// ============================================================================
// Authority ranking
// ============================================================================

#[test]
fn authority_index_sums_weights() {
    let mut a = setup();
    let expect = [
        (PUBLIC, 0),
        (REGISTERED, 0),
        (GUEST, 0),
        (AUTHOR, 2),
        (INV_AUTHOR, 2),
        (EDITOR, 5),
        (PUBLISHER, 10),
        (SUPER_USER, 10),
        (MANAGER, 13),
        (ADMIN, 20),
    ];
    for (g, idx) in expect {
        assert_eq!(a.authority_index(g, "com_content").unwrap(), idx, "group {}", g);
    }
}

#[test]
fn least_authoritative_by_rank() {
    let mut a = setup();
    assert_eq!(a.least_authoritative_group(&[ADMIN, SUPER_USER], "com_content").unwrap(), Some(SUPER_USER));
    assert_eq!(a.least_authoritative_group(&[ADMIN, SUPER_USER, EDITOR], "com_content").unwrap(), Some(EDITOR));
    assert_eq!(a.least_authoritative_group(&[SUPER_USER], "com_content").unwrap(), Some(SUPER_USER));
    assert_eq!(a.least_authoritative_group(&[], "com_content").unwrap(), None);
}

#[test]
fn least_authoritative_tie_on_one_line() {
    let mut a = setup();
    assert_eq!(a.least_authoritative_group(&[AUTHOR, EDITOR, PUBLISHER], "").unwrap(), Some(AUTHOR));
    assert_eq!(a.least_authoritative_group(&[INV_AUTHOR, AUTHOR], "").unwrap(), Some(AUTHOR));
    assert_eq!(a.least_authoritative_group(&[REGISTERED, CUSTOMER], "").unwrap(), Some(REGISTERED));
}

#[test]
fn least_authoritative_tie_across_lines() {
    let mut a = setup();
    // Guest and Customer both rank 0; Guest sits closer to the root
    assert_eq!(
        a.least_authoritative_group(&[MANAGER, GUEST, CUSTOMER, PUBLISHER, AUTHOR, EDITOR], "com_content").unwrap(),
        Some(GUEST)
    );
    // Same depth: lowest id
    assert_eq!(
        a.least_authoritative_group(&[MANAGER, ADMIN, GUEST, REGISTERED, SUPER_USER], "com_content").unwrap(),
        Some(REGISTERED)
    );
}

#[test]
fn ranking_follows_the_asset() {
    let mut a = setup();
    // On com_users Registered and everything below it lose core.manage, nothing else changes
    assert_eq!(a.authority_index(ADMIN, "com_users").unwrap(), 20);
    assert_eq!(a.authority_index(PUBLISHER, "com_users").unwrap(), 10);
}
