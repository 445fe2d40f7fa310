//! End-to-end editing behavior over the session API.

use pretty_assertions::assert_eq;
use rstest::rstest;
use screenwright_engine::{
    BlockKind, Cmd, Document, Point, Selection, Session, UndoOutcome,
};

fn starter_session() -> Session {
    Session::new(Document::starter())
}

fn kinds(session: &Session) -> Vec<BlockKind> {
    session
        .document()
        .blocks()
        .iter()
        .map(|b| b.kind())
        .collect()
}

#[test]
fn default_document_has_the_expected_kinds() {
    let session = starter_session();
    assert_eq!(
        kinds(&session),
        vec![
            BlockKind::SceneHeading,
            BlockKind::Action,
            BlockKind::Character,
            BlockKind::Dialogue,
        ]
    );
}

#[test]
fn inserting_a_character_block_at_index_two() {
    let mut session = starter_session();
    session
        .apply(Cmd::InsertBlock {
            kind: BlockKind::Character,
            at: Some(2),
        })
        .unwrap();

    assert_eq!(
        kinds(&session),
        vec![
            BlockKind::SceneHeading,
            BlockKind::Action,
            BlockKind::Character,
            BlockKind::Character,
            BlockKind::Dialogue,
        ]
    );
    assert_eq!(session.selection(), Selection::caret(Point::new(2, 0, 0)));
}

#[test]
fn inserting_text_at_the_start_of_a_run() {
    let mut session = Session::new(Document::from_parts(&[
        (BlockKind::SceneHeading, "INT."),
        (BlockKind::Action, "World"),
    ]));
    session
        .set_selection(Selection::caret(Point::new(1, 0, 0)))
        .unwrap();
    session
        .apply(Cmd::InsertText {
            text: "Hello".to_string(),
        })
        .unwrap();

    assert_eq!(session.document().run_text(1, 0), Some("HelloWorld"));
    assert_eq!(session.selection(), Selection::caret(Point::new(1, 0, 5)));
}

#[test]
fn deleting_across_a_block_boundary_merges() {
    let mut session = starter_session();
    let end_of_first = session.document().end_of_block(0);
    session
        .set_selection(Selection::new(end_of_first, Point::new(1, 0, 0)))
        .unwrap();
    session.apply(Cmd::DeleteRange { selection: None }).unwrap();

    assert_eq!(session.document().block_count(), 3);
    let merged = session.document().block(0).unwrap();
    assert_eq!(merged.kind(), BlockKind::SceneHeading);
    assert_eq!(
        merged.text(),
        "INT. ROOM – NIGHTJohn enters the dark room cautiously."
    );
}

// Every committed operation must leave the invariants intact.
#[rstest]
#[case(Cmd::InsertBlock { kind: BlockKind::Dialogue, at: Some(0) })]
#[case(Cmd::InsertBlock { kind: BlockKind::Action, at: None })]
#[case(Cmd::InsertText { text: "line".to_string() })]
#[case(Cmd::SetBlockKind { index: 0, kind: BlockKind::Dialogue })]
#[case(Cmd::SplitBlock { trailing_kind: None })]
#[case(Cmd::SplitBlock { trailing_kind: Some(BlockKind::Character) })]
fn operations_preserve_invariants(#[case] cmd: Cmd) {
    let mut session = starter_session();
    session.apply(cmd).unwrap();
    assert_eq!(session.document().validate(), Ok(()));
}

#[test]
fn operation_sequences_preserve_invariants() {
    let mut session = starter_session();
    let script = vec![
        Cmd::InsertText {
            text: "FADE IN. ".to_string(),
        },
        Cmd::SplitBlock {
            trailing_kind: Some(BlockKind::Action),
        },
        Cmd::InsertBlock {
            kind: BlockKind::Character,
            at: None,
        },
        Cmd::InsertText {
            text: "SARAH".to_string(),
        },
        Cmd::DeleteRange {
            selection: Some(Selection::new(Point::new(0, 0, 0), Point::new(1, 0, 2))),
        },
        Cmd::SetBlockKind {
            index: 0,
            kind: BlockKind::SceneHeading,
        },
    ];
    for cmd in script {
        session.apply(cmd).unwrap();
        assert_eq!(session.document().validate(), Ok(()));
    }
}

// Undo after any single operation restores the exact prior state.
#[rstest]
#[case(Cmd::InsertBlock { kind: BlockKind::Character, at: Some(2) })]
#[case(Cmd::InsertText { text: "Hello".to_string() })]
#[case(Cmd::DeleteRange { selection: Some(Selection::new(Point::new(0, 0, 2), Point::new(2, 0, 1))) })]
#[case(Cmd::SetBlockKind { index: 3, kind: BlockKind::Action })]
#[case(Cmd::SplitBlock { trailing_kind: Some(BlockKind::Dialogue) })]
fn undo_is_an_exact_inverse(#[case] cmd: Cmd) {
    let mut session = starter_session();
    session
        .set_selection(Selection::caret(Point::new(1, 0, 4)))
        .unwrap();
    let doc_before = session.document().clone();
    let sel_before = session.selection();

    session.apply(cmd).unwrap();
    assert_eq!(session.undo(), UndoOutcome::Applied);

    assert_eq!(session.document(), &doc_before);
    assert_eq!(session.selection(), sel_before);
}

#[rstest]
#[case(Cmd::InsertText { text: "take two".to_string() })]
#[case(Cmd::SplitBlock { trailing_kind: None })]
fn redo_replays_the_undone_operation(#[case] cmd: Cmd) {
    let mut session = starter_session();
    session.apply(cmd).unwrap();
    let doc_after = session.document().clone();
    let sel_after = session.selection();

    session.undo();
    assert_eq!(session.redo(), UndoOutcome::Applied);
    assert_eq!(session.document(), &doc_after);
    assert_eq!(session.selection(), sel_after);
}

#[rstest]
// Insert at or before the selected block shifts it right
#[case(2, 2, 3)]
#[case(0, 2, 3)]
// Insert strictly after leaves it alone
#[case(3, 2, 2)]
fn selection_remap_for_block_insertion(
    #[case] insert_at: usize,
    #[case] selected_block: usize,
    #[case] expected_block: usize,
) {
    let selection = Selection::caret(Point::new(selected_block, 0, 0));
    let shifted = selection.shifted_for_block_insert(insert_at, 1);
    assert_eq!(shifted.focus.block, expected_block);
}

#[test]
fn replace_selection_then_undo_round_trips() {
    let mut session = starter_session();
    let original = session.document().clone();

    // Select across three blocks and type over the selection
    session
        .set_selection(Selection::new(Point::new(0, 0, 4), Point::new(2, 0, 2)))
        .unwrap();
    session
        .apply(Cmd::InsertText {
            text: " CUT TO".to_string(),
        })
        .unwrap();
    assert_eq!(session.document().block_count(), 2);
    assert_eq!(session.document().validate(), Ok(()));

    session.undo();
    assert_eq!(session.document(), &original);
}

#[test]
fn split_action_into_a_character_cue() {
    let mut session = starter_session();
    // Caret mid-way through the action block
    session
        .set_selection(Selection::caret(Point::new(1, 0, 12)))
        .unwrap();
    session
        .apply(Cmd::SplitBlock {
            trailing_kind: Some(BlockKind::Character),
        })
        .unwrap();

    assert_eq!(session.document().block(1).unwrap().text(), "John enters ");
    let cue = session.document().block(2).unwrap();
    assert_eq!(cue.kind(), BlockKind::Character);
    assert_eq!(cue.text(), "the dark room cautiously.");
    assert_eq!(session.selection(), Selection::caret(Point::new(2, 0, 0)));
}

#[test]
fn block_ids_survive_unrelated_edits() {
    let mut session = starter_session();
    let dialogue_id = session.document().block(3).unwrap().id();
    session
        .apply(Cmd::InsertBlock {
            kind: BlockKind::Action,
            at: Some(0),
        })
        .unwrap();
    // Same block, new position, same id
    assert_eq!(session.document().block(4).unwrap().id(), dialogue_id);
}
