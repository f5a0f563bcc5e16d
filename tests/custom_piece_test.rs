//! Integration tests for data-defined pieces loaded from rulesets.

use strictly_chess::{Color, Game, Square, load_game};

fn sq(s: &str) -> Square {
    Square::from(s)
}

/// Minimal ruleset with one white custom piece plus shuffling pawns.
fn ruleset_with_custom(rules: &str, logic: &str, variables: &str) -> String {
    format!(
        r#"{{
            "version": 1,
            "metadata": {{"name": "custom-test"}},
            "topology": {{"kind": "rectangular", "params": {{"width": 8, "height": 8}}}},
            "pieces": [
                {{"id": "cp", "type": "wizard", "color": "white", "position": "d4",
                  "rules": {rules}, "logic": {logic}, "variables": {variables}}},
                {{"id": "wp", "type": "pawn", "color": "white", "position": "a2"}},
                {{"id": "bp1", "type": "pawn", "color": "black", "position": "a7"}},
                {{"id": "bp2", "type": "pawn", "color": "black", "position": "h7"}}
            ],
            "gameState": {{"turn": "white"}}
        }}"#
    )
}

const KING_LIKE_RULES: &str = r#"[{
    "conditions": [
        {"variable": "absDiffX", "operator": "===", "value": 1, "logic": "OR"},
        {"variable": "absDiffY", "operator": "===", "value": 1}
    ],
    "result": "allow",
    "mode": "jump"
}]"#;

#[test]
fn test_king_like_rule_moves_one_square() {
    let mut game = load_game(&ruleset_with_custom(KING_LIKE_RULES, "[]", "{}")).unwrap();

    // Diagonal step, like a king.
    assert!(game.is_legal(&sq("d4"), &sq("e5")));
    // Orthogonal step.
    assert!(game.is_legal(&sq("d4"), &sq("d5")));
    // Two squares straight matches neither condition.
    assert!(!game.is_legal(&sq("d4"), &sq("d6")));

    assert!(game.attempt_move(&sq("d4"), &sq("e5"), None));
    assert_eq!(game.turn(), Color::Black);
    assert_eq!(game.board().piece_at(&sq("e5")).unwrap().id(), "cp");
}

#[test]
fn test_disallow_overrides_allow() {
    let rules = r#"[
        {"conditions": [{"variable": "dist", "operator": "<=", "value": 2}], "result": "allow"},
        {"conditions": [{"variable": "absDiffX", "operator": "===", "value": 0}], "result": "disallow"}
    ]"#;
    let game = load_game(&ruleset_with_custom(rules, "[]", "{}")).unwrap();

    // Diagonal within range: only the allow matches.
    assert!(game.is_legal(&sq("d4"), &sq("e5")));
    // Straight ahead matches both; the disallow wins.
    assert!(!game.is_legal(&sq("d4"), &sq("d5")));
    assert!(!game.is_legal(&sq("d4"), &sq("d6")));
}

#[test]
fn test_slide_versus_jump_obstruction() {
    let slide_rules = r#"[{
        "conditions": [{"variable": "absDiffX", "operator": "===", "value": 0}],
        "result": "allow",
        "mode": "slide"
    }]"#;
    let ruleset = ruleset_with_custom(slide_rules, "[]", "{}")
        // Park a black pawn directly in the slide path.
        .replace("\"position\": \"h7\"", "\"position\": \"d5\"");
    let game = load_game(&ruleset).unwrap();

    // d6 is behind the blocker on d5.
    assert!(!game.is_legal(&sq("d4"), &sq("d6")));
    // Capturing the blocker itself has no intermediates.
    assert!(game.is_legal(&sq("d4"), &sq("d5")));

    // The identical geometry as a jump ignores the blocker.
    let jump_ruleset = ruleset.replace("\"mode\": \"slide\"", "\"mode\": \"jump\"");
    let game = load_game(&jump_ruleset).unwrap();
    assert!(game.is_legal(&sq("d4"), &sq("d6")));
}

#[test]
fn test_cooldown_scenario() {
    // on-cooldown-end bumps an "ended" counter so we can observe it firing
    // exactly once.
    let logic = r#"[
        {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-cooldown-end",
         "socketValues": {}, "childId": "a1"},
        {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "modify-var",
         "socketValues": {"varName": "ended", "op": "+=", "value": 1}}
    ]"#;
    let mut game =
        load_game(&ruleset_with_custom(KING_LIKE_RULES, logic, r#"{"cooldown": 2}"#)).unwrap();

    let cooldown = |game: &Game| {
        game.board()
            .piece_by_id("cp")
            .unwrap()
            .as_custom()
            .unwrap()
            .variables
            .number("cooldown")
    };
    let ended = |game: &Game| {
        game.board()
            .piece_by_id("cp")
            .unwrap()
            .as_custom()
            .unwrap()
            .variables
            .number("ended")
    };

    // On cooldown: the piece cannot move at all.
    assert!(!game.attempt_move(&sq("d4"), &sq("e5"), None));

    // First full move pair: cooldown 2 → 1.
    assert!(game.attempt_move(&sq("a2"), &sq("a3"), None));
    assert!(game.attempt_move(&sq("a7"), &sq("a6"), None));
    assert_eq!(cooldown(&game), 1.0);
    assert_eq!(ended(&game), 0.0);

    // Second pair: cooldown reaches 0, on-cooldown-end fires once.
    assert!(game.attempt_move(&sq("a3"), &sq("a4"), None));
    assert!(game.attempt_move(&sq("a6"), &sq("a5"), None));
    assert_eq!(cooldown(&game), 0.0);
    assert_eq!(ended(&game), 1.0);

    // The piece is movable again.
    assert!(game.attempt_move(&sq("d4"), &sq("e5"), None));

    // Further turns never re-fire the end trigger.
    assert!(game.attempt_move(&sq("h7"), &sq("h6"), None));
    assert!(game.attempt_move(&sq("e5"), &sq("d4"), None));
    assert!(game.attempt_move(&sq("h6"), &sq("h5"), None));
    assert_eq!(ended(&game), 1.0);
}

#[test]
fn test_pre_move_prevent_vetoes_and_leaves_no_trace() {
    let logic = r#"[
        {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-move",
         "socketValues": {}, "childId": "a1"},
        {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "prevent",
         "socketValues": {}}
    ]"#;
    let mut game = load_game(&ruleset_with_custom(KING_LIKE_RULES, logic, "{}")).unwrap();

    assert!(!game.attempt_move(&sq("d4"), &sq("e5"), None));
    assert_eq!(game.turn(), Color::White);
    assert!(game.history().is_empty());
    assert_eq!(game.board().piece_at(&sq("d4")).unwrap().id(), "cp");
    // The pure check agrees with the mutation path.
    assert!(!game.is_legal(&sq("d4"), &sq("e5")));
}

#[test]
fn test_on_move_transformation_replaces_piece() {
    let logic = r#"[
        {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-move",
         "socketValues": {}, "childId": "a1"},
        {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "transformation",
         "socketValues": {"target": "queen"}}
    ]"#;
    let mut game = load_game(&ruleset_with_custom(KING_LIKE_RULES, logic, "{}")).unwrap();

    assert!(game.attempt_move(&sq("d4"), &sq("d5"), None));
    let piece = game.board().piece_at(&sq("d5")).unwrap();
    assert_eq!(piece.kind_tag(), "queen");
    assert_eq!(piece.id(), "cp_transformed");
    assert!(!piece.is_custom());
}

#[test]
fn test_victim_kills_attacker_on_capture() {
    // The victim's graph kills whoever captures it; the attacker dies and
    // the capture never completes.
    let ruleset = format!(
        r#"{{
            "version": 1,
            "metadata": {{"name": "revenge"}},
            "topology": {{"kind": "rectangular", "params": {{"width": 8, "height": 8}}}},
            "pieces": [
                {{"id": "wr", "type": "rook", "color": "white", "position": "d1"}},
                {{"id": "victim", "type": "martyr", "color": "black", "position": "d6",
                  "rules": {KING_LIKE_RULES},
                  "logic": [
                    {{"instanceId": "t1", "blockKind": "trigger",
                      "triggerOrActionId": "on-is-captured", "socketValues": {{}},
                      "childId": "a1"}},
                    {{"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "kill",
                      "socketValues": {{"target": "Attacker"}}}}
                  ]}}
            ],
            "gameState": {{"turn": "white"}}
        }}"#
    );
    let mut game = load_game(&ruleset).unwrap();

    // The move is consumed: history advances, but the rook is dead and the
    // martyr survives.
    assert!(game.attempt_move(&sq("d1"), &sq("d6"), None));
    assert!(game.board().piece_by_id("wr").is_none());
    assert_eq!(game.board().piece_at(&sq("d6")).unwrap().id(), "victim");
    assert_eq!(game.turn(), Color::Black);
    assert_eq!(game.history().len(), 1);
}

#[test]
fn test_on_var_cycle_is_capped() {
    // on-var increments the watched variable, which re-fires on-var: a
    // deliberate cycle. The dispatcher caps it instead of hanging.
    let logic = r#"[
        {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-var",
         "socketValues": {"varName": "x", "op": ">=", "value": 0}, "childId": "a1"},
        {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "modify-var",
         "socketValues": {"varName": "x", "op": "+=", "value": 1}}
    ]"#;
    let mut game = load_game(&ruleset_with_custom(KING_LIKE_RULES, logic, "{}")).unwrap();

    // Turn lifecycle for white (after black's reply) kicks off on-var.
    assert!(game.attempt_move(&sq("a2"), &sq("a3"), None));
    assert!(game.attempt_move(&sq("a7"), &sq("a6"), None));

    let x = game
        .board()
        .piece_by_id("cp")
        .unwrap()
        .as_custom()
        .unwrap()
        .variables
        .number("x");
    assert!(x >= 1.0, "cycle ran at least once");
    assert!(
        x <= strictly_chess::MAX_TRIGGER_ITERATIONS as f64,
        "cycle was capped"
    );

    // The engine keeps playing normally afterwards.
    assert!(game.attempt_move(&sq("d4"), &sq("e5"), None));
}

#[test]
fn test_cooldown_action_freezes_piece() {
    // Moving starts a cooldown; the next own-side move with the piece is
    // refused until it ticks back down.
    let logic = r#"[
        {"instanceId": "t1", "blockKind": "trigger", "triggerOrActionId": "on-move",
         "socketValues": {}, "childId": "a1"},
        {"instanceId": "a1", "blockKind": "action", "triggerOrActionId": "cooldown",
         "socketValues": {"duration": 1}}
    ]"#;
    let mut game = load_game(&ruleset_with_custom(KING_LIKE_RULES, logic, "{}")).unwrap();

    assert!(game.attempt_move(&sq("d4"), &sq("e5"), None));
    assert!(game.attempt_move(&sq("a7"), &sq("a6"), None));
    // Lifecycle already ticked the fresh cooldown 1 → 0, so the piece
    // thaws after exactly one opposing reply.
    assert!(game.attempt_move(&sq("e5"), &sq("d4"), None));
}
