//! End-to-end transaction coverage: every edit derives a fresh snapshot,
//! keeps per-block invariants, and leaves the input state intact.

use std::sync::Arc;

use richdoc::{
    modifier, BlockKey, ContentState, EntityData, EntityKey, InsertionMode, MetadataPool,
    ModelError, Mutability, RemovalDirection, SelectionState,
};

fn pool() -> Arc<MetadataPool> {
    Arc::new(MetadataPool::new())
}

fn block_key(state: &ContentState, index: usize) -> BlockKey {
    state
        .block_map()
        .keys()
        .nth(index)
        .expect("block index in range")
        .clone()
}

fn assert_valid(state: &ContentState) {
    for (_, block) in state.block_map().iter() {
        assert_eq!(
            block.chars().len(),
            block.text().chars().count(),
            "chars/text length diverged in block {}",
            block.key()
        );
    }
    let sel = state.selection_after();
    let start = state
        .block_for_key(sel.start_key())
        .expect("selection_after names an existing start block");
    assert!(sel.start_offset() <= start.len());
    let end = state
        .block_for_key(sel.end_key())
        .expect("selection_after names an existing end block");
    assert!(sel.end_offset() <= end.len());
}

// ── Text insertion ─────────────────────────────────────────────────────────

#[test]
fn insert_text_end_to_end() {
    let state = ContentState::create_from_text(pool(), "ab\ncd");
    let texts: Vec<_> = state
        .block_map()
        .values()
        .map(|b| b.text().to_owned())
        .collect();
    assert_eq!(texts, vec!["ab", "cd"]);

    let b0 = block_key(&state, 0);
    let b1 = block_key(&state, 1);
    let edited = modifier::insert_text(
        &state,
        &SelectionState::collapsed(b0.clone(), 2),
        "X",
        None,
        None,
    )
    .unwrap();
    assert_valid(&edited);

    let block0 = edited.block_for_key(&b0).unwrap();
    assert_eq!(block0.text(), "abX");
    assert_eq!(block0.chars().len(), 3);
    assert_eq!(
        edited.selection_after(),
        &SelectionState::collapsed(b0, 3)
    );
    // The sibling block is untouched and shared by reference.
    assert!(Arc::ptr_eq(
        state.block_for_key(&b1).unwrap(),
        edited.block_for_key(&b1).unwrap()
    ));
}

#[test]
fn insert_text_rejects_non_collapsed_target_and_leaves_input_usable() {
    let state = ContentState::create_from_text(pool(), "abcd");
    let b0 = block_key(&state, 0);
    let range = SelectionState::range(b0.clone(), 1, b0.clone(), 3);

    let err = modifier::insert_text(&state, &range, "X", None, None).unwrap_err();
    assert!(matches!(err, ModelError::InvalidTarget(_)));

    // Input still works for a follow-up edit.
    assert_eq!(state.plain_text(None), "abcd");
    let ok = modifier::insert_text(&state, &SelectionState::collapsed(b0, 4), "!", None, None)
        .unwrap();
    assert_eq!(ok.plain_text(None), "abcd!");
}

#[test]
fn replace_text_over_a_range() {
    let state = ContentState::create_from_text(pool(), "hello world");
    let b0 = block_key(&state, 0);
    let range = SelectionState::range(b0.clone(), 6, b0.clone(), 11);
    let edited = modifier::replace_text(&state, &range, "there", None, None).unwrap();
    assert_valid(&edited);
    assert_eq!(edited.plain_text(None), "hello there");
    assert_eq!(edited.selection_after(), &SelectionState::collapsed(b0, 11));
}

#[test]
fn inserted_characters_carry_the_given_style() {
    let state = ContentState::create_from_text(pool(), "ac");
    let b0 = block_key(&state, 0);
    let style: richdoc::StyleSet = ["BOLD".to_owned()].into_iter().collect();
    let edited = modifier::insert_text(
        &state,
        &SelectionState::collapsed(b0.clone(), 1),
        "b",
        Some(style),
        None,
    )
    .unwrap();
    let block = edited.block_for_key(&b0).unwrap();
    assert!(!block.chars()[0].has_style("BOLD"));
    assert!(block.chars()[1].has_style("BOLD"));
    assert!(!block.chars()[2].has_style("BOLD"));
}

// ── Range removal ──────────────────────────────────────────────────────────

#[test]
fn remove_range_within_one_block() {
    let state = ContentState::create_from_text(pool(), "abcdef");
    let b0 = block_key(&state, 0);
    let range = SelectionState::range(b0.clone(), 1, b0.clone(), 4);
    let edited = modifier::remove_range(&state, &range, RemovalDirection::Backward).unwrap();
    assert_valid(&edited);
    assert_eq!(edited.plain_text(None), "aef");
    assert_eq!(edited.selection_after(), &SelectionState::collapsed(b0, 1));
}

#[test]
fn remove_range_across_blocks_merges_boundaries() {
    let state = ContentState::create_from_text(pool(), "ab\nxy\ncd");
    let b0 = block_key(&state, 0);
    let b2 = block_key(&state, 2);
    let range = SelectionState::range(b0.clone(), 1, b2, 1);
    let edited = modifier::remove_range(&state, &range, RemovalDirection::Backward).unwrap();
    assert_valid(&edited);
    assert_eq!(edited.block_map().len(), 1);
    assert_eq!(edited.plain_text(None), "ad");
    assert_eq!(edited.selection_after(), &SelectionState::collapsed(b0, 1));
}

#[test]
fn backward_selection_removes_the_same_range() {
    let state = ContentState::create_from_text(pool(), "abcdef");
    let b0 = block_key(&state, 0);
    let range = SelectionState::range(b0.clone(), 4, b0.clone(), 1).with_backward(true);
    let edited = modifier::remove_range(&state, &range, RemovalDirection::Backward).unwrap();
    assert_eq!(edited.plain_text(None), "aef");
}

#[test]
fn deleting_inside_an_immutable_entity_takes_the_whole_run() {
    let state = ContentState::create_from_text(pool(), "abcdef");
    let b0 = block_key(&state, 0);
    let state = state.create_entity("MENTION", Mutability::Immutable, EntityData::new(), None);
    let key = state.last_created_entity_key().unwrap();
    let run = SelectionState::range(b0.clone(), 2, b0.clone(), 4);
    let state = modifier::apply_entity(&state, &run, Some(key)).unwrap();

    let nibble = SelectionState::range(b0.clone(), 3, b0.clone(), 4);
    let edited = modifier::remove_range(&state, &nibble, RemovalDirection::Backward).unwrap();
    assert_valid(&edited);
    assert_eq!(edited.plain_text(None), "abef");
}

#[test]
fn deleting_inside_a_segmented_entity_takes_the_segment() {
    let state = ContentState::create_from_text(pool(), "hey alpha beta end");
    let b0 = block_key(&state, 0);
    let state = state.create_entity("MENTION", Mutability::Segmented, EntityData::new(), None);
    let key = state.last_created_entity_key().unwrap();
    let run = SelectionState::range(b0.clone(), 4, b0.clone(), 14);
    let state = modifier::apply_entity(&state, &run, Some(key)).unwrap();

    // Backspacing inside "beta" removes the whole trailing segment.
    let nibble = SelectionState::range(b0.clone(), 10, b0.clone(), 11);
    let edited = modifier::remove_range(&state, &nibble, RemovalDirection::Backward).unwrap();
    assert_valid(&edited);
    assert_eq!(edited.plain_text(None), "hey alpha end");
}

#[test]
fn mutable_entities_shrink_without_adjustment() {
    let state = ContentState::create_from_text(pool(), "abcdef");
    let b0 = block_key(&state, 0);
    let state = state.create_entity("LINK", Mutability::Mutable, EntityData::new(), None);
    let key = state.last_created_entity_key().unwrap();
    let run = SelectionState::range(b0.clone(), 2, b0.clone(), 4);
    let state = modifier::apply_entity(&state, &run, Some(key)).unwrap();

    let nibble = SelectionState::range(b0.clone(), 3, b0.clone(), 4);
    let edited = modifier::remove_range(&state, &nibble, RemovalDirection::Backward).unwrap();
    assert_eq!(edited.plain_text(None), "abcef");
    assert_eq!(edited.block_for_key(&b0).unwrap().entity_at(2), Some(key));
}

#[test]
fn typing_into_a_non_mutable_entity_clears_the_run_first() {
    let state = ContentState::create_from_text(pool(), "abcdef");
    let b0 = block_key(&state, 0);
    let state = state.create_entity("MENTION", Mutability::Immutable, EntityData::new(), None);
    let key = state.last_created_entity_key().unwrap();
    let run = SelectionState::range(b0.clone(), 2, b0.clone(), 4);
    let state = modifier::apply_entity(&state, &run, Some(key)).unwrap();

    let caret = SelectionState::collapsed(b0.clone(), 3);
    let edited = modifier::insert_text(&state, &caret, "X", None, None).unwrap();
    assert_valid(&edited);
    assert_eq!(edited.plain_text(None), "abcXdef");
    let block = edited.block_for_key(&b0).unwrap();
    assert_eq!(block.entity_at(2), None);
    assert_eq!(block.entity_at(4), None);
}

// ── Fragments ──────────────────────────────────────────────────────────────

#[test]
fn move_text_relocates_a_range() {
    let state = ContentState::create_from_text(pool(), "ab\ncd");
    let b0 = block_key(&state, 0);
    let b1 = block_key(&state, 1);
    let removal = SelectionState::range(b1.clone(), 0, b1, 2);
    let target = SelectionState::collapsed(b0.clone(), 1);
    let moved = modifier::move_text(&state, &removal, &target).unwrap();
    assert_valid(&moved);
    assert_eq!(moved.plain_text(None), "acdb\n");
    assert_eq!(moved.selection_after(), &SelectionState::collapsed(b0, 3));
}

#[test]
fn multi_block_fragment_splits_the_target() {
    let state = ContentState::create_from_text(pool(), "XY");
    let b0 = block_key(&state, 0);

    let donor = ContentState::create_from_text(pool(), "11\n22\n33");
    let d0 = block_key(&donor, 0);
    let d2 = block_key(&donor, 2);
    let all = SelectionState::range(d0, 0, d2, 2);
    let fragment = modifier::extract_fragment(&donor, &all).unwrap();

    let target = SelectionState::collapsed(b0.clone(), 1);
    let pasted = modifier::replace_with_fragment(&state, &target, &fragment).unwrap();
    assert_valid(&pasted);
    assert_eq!(pasted.plain_text(None), "X11\n22\n33Y");
    // Caret lands at the end of the fragment's last block text.
    assert_eq!(pasted.selection_after().start_offset(), 2);
}

#[test]
fn fragment_blocks_with_empty_keys_get_fresh_ones() {
    let state = ContentState::create_from_text(pool(), "XY");
    let b0 = block_key(&state, 0);
    let keyless = richdoc::ContentBlock::new(BlockKey::default())
        .with_text("zz", vec![state.pool().empty(); 2]);
    let with_key = richdoc::ContentBlock::new(b0.clone())
        .with_text("qq", vec![state.pool().empty(); 2]);
    let fragment = richdoc::BlockMap::from_blocks(vec![keyless, with_key]);

    let target = SelectionState::collapsed(b0.clone(), 1);
    let pasted = modifier::replace_with_fragment(&state, &target, &fragment).unwrap();
    assert_valid(&pasted);
    assert_eq!(pasted.plain_text(None), "Xzz\nqqY");
    // The colliding fragment key was replaced; all keys are unique.
    let keys: Vec<_> = pasted.block_map().keys().collect();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

// ── Split / move / block transforms ────────────────────────────────────────

#[test]
fn split_block_divides_chars_and_moves_caret_below() {
    let state = ContentState::create_from_text(pool(), "abcd");
    let b0 = block_key(&state, 0);
    let split = modifier::split_block(&state, &SelectionState::collapsed(b0.clone(), 2), None)
        .unwrap();
    assert_valid(&split);
    assert_eq!(split.block_map().len(), 2);
    let texts: Vec<_> = split
        .block_map()
        .values()
        .map(|b| b.text().to_owned())
        .collect();
    assert_eq!(texts, vec!["ab", "cd"]);
    let below = block_key(&split, 1);
    assert_eq!(split.selection_after(), &SelectionState::collapsed(below, 0));
}

#[test]
fn split_block_with_explicit_key_below() {
    let state = ContentState::create_from_text(pool(), "abcd");
    let b0 = block_key(&state, 0);
    let key_below = BlockKey::from("lower");
    let split = modifier::split_block(
        &state,
        &SelectionState::collapsed(b0, 1),
        Some(key_below.clone()),
    )
    .unwrap();
    assert_eq!(split.block_for_key(&key_below).unwrap().text(), "bcd");
}

#[test]
fn move_block_before_and_after() {
    let state = ContentState::create_from_text(pool(), "a\nb\nc");
    let a = block_key(&state, 0);
    let c = block_key(&state, 2);

    let moved = modifier::move_block(&state, &c, &a, InsertionMode::Before).unwrap();
    assert_valid(&moved);
    assert_eq!(moved.plain_text(None), "c\na\nb");

    let back = modifier::move_block(&moved, &c, &a, InsertionMode::After).unwrap();
    assert_eq!(back.plain_text(None), "a\nc\nb");

    let err = modifier::move_block(&state, &a, &a, InsertionMode::Before).unwrap_err();
    assert!(matches!(err, ModelError::InvalidTarget(_)));
}

#[test]
fn set_block_type_resets_depth() {
    let state = ContentState::create_from_text(pool(), "one\ntwo");
    let b0 = block_key(&state, 0);
    let b1 = block_key(&state, 1);
    let sel = SelectionState::range(b0.clone(), 0, b1.clone(), 1);

    let deeper = modifier::adjust_block_depth(&state, &sel, 2, 4).unwrap();
    assert_eq!(deeper.block_for_key(&b0).unwrap().depth(), 2);

    let retyped = modifier::set_block_type(&deeper, &sel, "unordered-list-item").unwrap();
    for block in retyped.block_map().values() {
        assert_eq!(block.block_type(), "unordered-list-item");
        assert_eq!(block.depth(), 0);
    }
}

#[test]
fn adjust_block_depth_clamps() {
    let state = ContentState::create_from_text(pool(), "x");
    let b0 = block_key(&state, 0);
    let sel = SelectionState::collapsed(b0.clone(), 0);

    let lowered = modifier::adjust_block_depth(&state, &sel, -3, 4).unwrap();
    assert_eq!(lowered.block_for_key(&b0).unwrap().depth(), 0);

    let raised = modifier::adjust_block_depth(&state, &sel, 9, 4).unwrap();
    assert_eq!(raised.block_for_key(&b0).unwrap().depth(), 4);
}

#[test]
fn block_data_set_and_merge() {
    let state = ContentState::create_from_text(pool(), "x");
    let b0 = block_key(&state, 0);
    let sel = SelectionState::collapsed(b0.clone(), 0);

    let mut data = richdoc::BlockData::new();
    data.insert("align".into(), serde_json::json!("center"));
    let with_data = modifier::set_block_data(&state, &sel, data).unwrap();
    assert_eq!(
        with_data.block_for_key(&b0).unwrap().data()["align"],
        serde_json::json!("center")
    );

    let mut patch = richdoc::BlockData::new();
    patch.insert("dir".into(), serde_json::json!("rtl"));
    let merged = modifier::merge_block_data(&with_data, &sel, patch).unwrap();
    let block_data = merged.block_for_key(&b0).unwrap().data();
    assert_eq!(block_data["align"], serde_json::json!("center"));
    assert_eq!(block_data["dir"], serde_json::json!("rtl"));
}

#[test]
fn remove_block_drops_one_block() {
    let state = ContentState::create_from_text(pool(), "a\nb");
    let a = block_key(&state, 0);
    let b = block_key(&state, 1);
    let removed =
        modifier::remove_block(&state, &SelectionState::collapsed(a.clone(), 0), &b).unwrap();
    assert_valid(&removed);
    assert_eq!(removed.plain_text(None), "a");
    assert!(removed.block_for_key(&b).is_none());
}

// ── Inline styles ──────────────────────────────────────────────────────────

#[test]
fn style_application_with_provenance() {
    let state = ContentState::create_from_text(pool(), "abcd");
    let b0 = block_key(&state, 0);
    let state = state.create_meta("SUGGESTION", richdoc::MetaData::new(), None);
    let meta = state.last_created_meta_key().unwrap();

    let sel = SelectionState::range(b0.clone(), 1, b0.clone(), 3);
    let styled = modifier::apply_inline_style(&state, &sel, "BOLD", Some(meta)).unwrap();
    let block = styled.block_for_key(&b0).unwrap();
    assert!(!block.chars()[0].has_style("BOLD"));
    assert!(block.chars()[1].has_style("BOLD"));
    assert_eq!(block.chars()[1].style_meta("BOLD"), Some(meta));
    assert!(block.chars()[3].style_meta("BOLD").is_none());

    let unstyled = modifier::remove_inline_style(&styled, &sel, "BOLD").unwrap();
    let block = unstyled.block_for_key(&b0).unwrap();
    assert!(!block.chars()[1].has_style("BOLD"));
    assert_eq!(block.chars()[1].style_meta("BOLD"), None);
}

// ── Registries ─────────────────────────────────────────────────────────────

#[test]
fn registries_are_append_only_with_increasing_keys() {
    let state = ContentState::create_from_text(pool(), "x");
    let state = state.add_entity(
        richdoc::EntityInstance::new("LINK", Mutability::Mutable, EntityData::new()),
        None,
    );
    let first = state.last_created_entity_key().unwrap();
    let state = state.add_entity(
        richdoc::EntityInstance::new("IMAGE", Mutability::Immutable, EntityData::new()),
        None,
    );
    let second = state.last_created_entity_key().unwrap();
    assert!(second > first);
    assert_eq!(state.get_entity(first).unwrap().entity_type, "LINK");
    assert_eq!(state.get_entity(second).unwrap().entity_type, "IMAGE");
}

#[test]
fn entity_data_updates_fail_on_unknown_keys() {
    let state = ContentState::create_from_text(pool(), "x");
    let missing = EntityKey::new(41);
    let err = state.merge_entity_data(missing, &EntityData::new()).unwrap_err();
    assert_eq!(
        err,
        ModelError::UnknownKey {
            kind: richdoc::KeyKind::Entity,
            key: "41".into()
        }
    );
    assert!(state.get_entity(missing).is_err());
}

// ── Operation log ──────────────────────────────────────────────────────────

#[test]
fn operations_append_in_transaction_order() {
    let state = ContentState::create_from_text(pool(), "ab\ncd").enable_ot();
    let b0 = block_key(&state, 0);
    let b1 = block_key(&state, 1);

    let state = modifier::insert_text(
        &state,
        &SelectionState::collapsed(b0.clone(), 0),
        "!",
        None,
        None,
    )
    .unwrap();
    let removal = SelectionState::range(b1.clone(), 0, b1.clone(), 1);
    let state = modifier::remove_range(&state, &removal, RemovalDirection::Forward).unwrap();
    let state = state.create_entity("LINK", Mutability::Mutable, EntityData::new(), None);

    let names: Vec<_> = state.operations().iter().map(|op| op.name()).collect();
    assert_eq!(names, vec!["replace_text", "remove_range", "create_entity"]);
}

#[test]
fn move_text_logs_its_component_transactions() {
    let state = ContentState::create_from_text(pool(), "ab\ncd").enable_ot();
    let b0 = block_key(&state, 0);
    let b1 = block_key(&state, 1);
    let removal = SelectionState::range(b1.clone(), 0, b1, 2);
    let moved =
        modifier::move_text(&state, &removal, &SelectionState::collapsed(b0, 1)).unwrap();
    let names: Vec<_> = moved.operations().iter().map(|op| op.name()).collect();
    assert_eq!(names, vec!["remove_range", "replace_with_fragment"]);
}

#[test]
fn disabled_log_stays_empty() {
    let state = ContentState::create_from_text(pool(), "ab");
    let b0 = block_key(&state, 0);
    let edited = modifier::insert_text(
        &state,
        &SelectionState::collapsed(b0, 0),
        "x",
        None,
        None,
    )
    .unwrap();
    assert!(edited.operations().is_empty());
}

// ── Structural sharing ─────────────────────────────────────────────────────

#[test]
fn prior_snapshots_survive_later_edits() {
    let state = ContentState::create_from_text(pool(), "abc\ndef");
    let b0 = block_key(&state, 0);
    let v1 = modifier::insert_text(
        &state,
        &SelectionState::collapsed(b0.clone(), 3),
        "1",
        None,
        None,
    )
    .unwrap();
    let v2 = modifier::insert_text(
        &v1,
        &SelectionState::collapsed(b0.clone(), 4),
        "2",
        None,
        None,
    )
    .unwrap();

    assert_eq!(state.plain_text(None), "abc\ndef");
    assert_eq!(v1.plain_text(None), "abc1\ndef");
    assert_eq!(v2.plain_text(None), "abc12\ndef");
}
