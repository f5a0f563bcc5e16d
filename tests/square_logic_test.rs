//! Integration tests for square-bound logic (reactive squares).

use std::cell::RefCell;
use std::rc::Rc;
use strictly_chess::{Color, GameStatus, Square, load_game};

fn sq(s: &str) -> Square {
    Square::from(s)
}

fn ruleset_with_square_logic(square: &str, logic: &str) -> String {
    format!(
        r#"{{
            "version": 1,
            "metadata": {{"name": "square-logic-test"}},
            "topology": {{"kind": "rectangular", "params": {{"width": 8, "height": 8}}}},
            "pieces": [
                {{"id": "wp", "type": "pawn", "color": "white", "position": "e2"}},
                {{"id": "bp", "type": "pawn", "color": "black", "position": "a7"}}
            ],
            "squareLogic": {{"{square}": {logic}}},
            "gameState": {{"turn": "white"}}
        }}"#
    )
}

#[test]
fn test_on_step_teleport() {
    let logic = r#"{
        "behaviorGraph": [
            {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-step",
             "socketValues": {}, "childId": "a1"},
            {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "teleport",
             "socketValues": {"targetSquare": "a5"}}
        ],
        "variables": {}
    }"#;
    let mut game = load_game(&ruleset_with_square_logic("e4", logic)).unwrap();

    let notes: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&notes);
    game.observe(move |note| sink.borrow_mut().push(note.kind.clone()));

    assert!(game.attempt_move(&sq("e2"), &sq("e4"), None));
    // The pawn landed on the pad and was whisked to a5.
    assert!(game.board().piece_at(&sq("e4")).is_none());
    assert_eq!(game.board().piece_at(&sq("a5")).unwrap().id(), "wp");
    assert!(notes.borrow().iter().any(|kind| kind == "teleport"));
}

#[test]
fn test_on_step_kill() {
    let logic = r#"{
        "behaviorGraph": [
            {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-step",
             "socketValues": {}, "childId": "a1"},
            {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "kill",
             "socketValues": {}}
        ],
        "variables": {}
    }"#;
    let mut game = load_game(&ruleset_with_square_logic("e4", logic)).unwrap();

    assert!(game.attempt_move(&sq("e2"), &sq("e4"), None));
    // The square consumed the pawn; the move itself stands.
    assert!(game.board().piece_by_id("wp").is_none());
    assert_eq!(game.turn(), Color::Black);
}

#[test]
fn test_on_step_type_filter() {
    let logic = r#"{
        "behaviorGraph": [
            {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-step",
             "socketValues": {"pieceType": "knight"}, "childId": "a1"},
            {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "kill",
             "socketValues": {}}
        ],
        "variables": {}
    }"#;
    let mut game = load_game(&ruleset_with_square_logic("e4", logic)).unwrap();

    // A pawn does not satisfy the knight filter; nothing happens.
    assert!(game.attempt_move(&sq("e2"), &sq("e4"), None));
    assert!(game.board().piece_by_id("wp").is_some());
}

#[test]
fn test_win_square_ends_game() {
    let logic = r#"{
        "behaviorGraph": [
            {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-step",
             "socketValues": {}, "childId": "a1"},
            {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "win",
             "socketValues": {"side": "White"}}
        ],
        "variables": {}
    }"#;
    let mut game = load_game(&ruleset_with_square_logic("e4", logic)).unwrap();

    assert!(game.attempt_move(&sq("e2"), &sq("e4"), None));
    assert_eq!(game.status(), GameStatus::Won(Color::White));
    // No further moves are accepted.
    assert!(!game.attempt_move(&sq("a7"), &sq("a6"), None));
}

#[test]
fn test_disable_square_closes_it() {
    let logic = r#"{
        "behaviorGraph": [
            {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-step",
             "socketValues": {}, "childId": "a1"},
            {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "disable-square",
             "socketValues": {}}
        ],
        "variables": {}
    }"#;
    let mut game = load_game(&ruleset_with_square_logic("e3", logic)).unwrap();

    assert!(game.attempt_move(&sq("e2"), &sq("e3"), None));
    assert!(!game.board().is_active(&sq("e3")));
}

#[test]
fn test_proximity_counts_nearby_stops() {
    // The pad on g4 counts pieces that stop within two squares.
    let logic = r#"{
        "behaviorGraph": [
            {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-proximity",
             "socketValues": {"distance": 2}, "childId": "a1"},
            {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "modify-var",
             "socketValues": {"varName": "visits", "op": "+=", "value": 1}}
        ],
        "variables": {}
    }"#;
    let mut game = load_game(&ruleset_with_square_logic("g4", logic)).unwrap();

    // e2 → e4: Chebyshev distance from e4 to the g4 pad is 2 → fires.
    assert!(game.attempt_move(&sq("e2"), &sq("e4"), None));
    let visits = game
        .board()
        .square_logic(&sq("g4"))
        .unwrap()
        .variables
        .number("visits");
    assert_eq!(visits, 1.0);

    // a7 → a6 stops six files away → silent.
    assert!(game.attempt_move(&sq("a7"), &sq("a6"), None));
    let visits = game
        .board()
        .square_logic(&sq("g4"))
        .unwrap()
        .variables
        .number("visits");
    assert_eq!(visits, 1.0);
}

#[test]
fn test_unknown_action_is_ignored() {
    // An action id from some future editor: the chain simply skips it and
    // the game keeps working.
    let logic = r#"{
        "behaviorGraph": [
            {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-step",
             "socketValues": {}, "childId": "a1"},
            {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "summon-dragon",
             "socketValues": {}, "childId": "a2"},
            {"instanceId": "a2", "blockKind": "action", "triggerOrActionId": "disable-square",
             "socketValues": {}}
        ],
        "variables": {}
    }"#;
    let mut game = load_game(&ruleset_with_square_logic("e3", logic)).unwrap();

    assert!(game.attempt_move(&sq("e2"), &sq("e3"), None));
    // The unknown block was skipped; the rest of the chain still ran.
    assert!(!game.board().is_active(&sq("e3")));
}
