//! Ruleset save/load tests, including real files on disk.

use anyhow::Result;
use std::fs;
use strictly_chess::{
    Color, LoadError, Metadata, RULESET_VERSION, Ruleset, Square, load_game,
};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sq(s: &str) -> Square {
    Square::from(s)
}

#[test]
fn test_file_round_trip() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("classic.json");

    let game = strictly_chess::Game::new();
    let ruleset = Ruleset::capture(game.board(), Metadata::named("classic"));
    fs::write(&path, ruleset.to_json())?;

    let mut restored = load_game(&fs::read_to_string(&path)?)?;
    assert_eq!(restored.board().piece_count(), 32);
    assert_eq!(restored.turn(), Color::White);
    assert!(restored.attempt_move(&sq("e2"), &sq("e4"), None));
    Ok(())
}

#[test]
fn test_mid_game_state_survives_round_trip() -> Result<()> {
    init_tracing();
    let mut game = strictly_chess::Game::new();
    assert!(game.attempt_move(&sq("e2"), &sq("e4"), None));

    let json = Ruleset::capture(game.board(), Metadata::named("mid")).to_json();
    let mut restored = load_game(&json)?;

    // Black to move, and the e4 pawn carries its moved flag.
    assert_eq!(restored.turn(), Color::Black);
    let pawn = restored.board().piece_at(&sq("e4")).unwrap();
    assert!(pawn.has_moved());
    assert!(restored.attempt_move(&sq("e7"), &sq("e5"), None));
    Ok(())
}

#[test]
fn test_newer_version_refused() {
    init_tracing();
    let json = format!(
        r#"{{
            "version": {},
            "metadata": {{"name": "from-the-future"}},
            "topology": {{"kind": "rectangular", "params": {{"width": 8, "height": 8}}}},
            "pieces": [],
            "gameState": {{"turn": "white"}}
        }}"#,
        RULESET_VERSION + 1
    );
    let err = load_game(&json).unwrap_err();
    assert!(matches!(err, LoadError::VersionTooNew { .. }));
}

#[test]
fn test_older_version_migrates() {
    let json = r#"{
        "version": 0,
        "metadata": {"name": "legacy"},
        "topology": {"kind": "rectangular", "params": {"width": 8, "height": 8}},
        "pieces": [
            {"id": "wp", "type": "pawn", "color": "white", "position": "e2"}
        ],
        "gameState": {"turn": "white"}
    }"#;
    let mut game = load_game(json).unwrap();
    assert!(game.attempt_move(&sq("e2"), &sq("e4"), None));
}

#[test]
fn test_hand_written_custom_piece_contract() {
    // The full external contract in one file: custom rules, behavior
    // graph, variables, square state, and square logic.
    let json = r#"{
        "version": 1,
        "metadata": {"name": "contract", "author": "editor"},
        "topology": {"kind": "rectangular", "params": {"width": 8, "height": 8}},
        "pieces": [
            {"id": "cp", "type": "wisp", "color": "white", "position": "d4",
             "hasMoved": false,
             "rules": [{"conditions": [
                 {"variable": "absDiffX", "operator": "===", "value": 1, "logic": "OR"},
                 {"variable": "absDiffY", "operator": "===", "value": 1}],
                "result": "allow", "mode": "jump"}],
             "logic": [
                 {"instanceId": "t", "blockKind": "trigger",
                  "triggerOrActionId": "on-turn-start", "socketValues": {}, "childId": "a"},
                 {"instanceId": "a", "blockKind": "action",
                  "triggerOrActionId": "modify-var",
                  "socketValues": {"varName": "turns", "op": "+=", "value": 1}}
             ],
             "variables": {"turns": 0}},
            {"id": "bp", "type": "pawn", "color": "black", "position": "a7"}
        ],
        "squareStates": {"c3": {"tags": ["swamp"], "disabled": true, "customProps": {}}},
        "squareLogic": {"h8": {"behaviorGraph": [], "variables": {"charge": 5}}},
        "gameState": {"turn": "white"}
    }"#;
    let mut game = load_game(json).unwrap();

    // Disabled square from squareStates.
    assert!(!game.board().is_active(&sq("c3")));
    assert!(game
        .board()
        .square_state(&sq("c3"))
        .unwrap()
        .tags
        .contains("swamp"));
    // Square logic variables loaded.
    assert_eq!(
        game.board().square_logic(&sq("h8")).unwrap().variables.number("charge"),
        5.0
    );

    // Custom piece plays and its on-turn-start logic ticks.
    assert!(game.attempt_move(&sq("d4"), &sq("e5"), None));
    assert!(game.attempt_move(&sq("a7"), &sq("a6"), None));
    let turns = game
        .board()
        .piece_by_id("cp")
        .unwrap()
        .as_custom()
        .unwrap()
        .variables
        .number("turns");
    assert_eq!(turns, 1.0);
}

#[test]
fn test_hex_topology_round_trip() -> Result<()> {
    let json = r#"{
        "version": 1,
        "metadata": {"name": "hex"},
        "topology": {"kind": "hex", "params": {"radius": 3}},
        "pieces": [
            {"id": "wp", "type": "pawn", "color": "white", "position": "0,1"},
            {"id": "bp", "type": "pawn", "color": "black", "position": "0,-1"}
        ],
        "gameState": {"turn": "white"}
    }"#;
    let mut game = load_game(json)?;
    // White's hex pawn advances toward negative r.
    assert!(game.attempt_move(&sq("0,1"), &sq("0,0"), None));

    let saved = Ruleset::capture(game.board(), Metadata::named("hex")).to_json();
    let restored = load_game(&saved)?;
    assert!(restored.board().piece_at(&sq("0,0")).is_some());
    Ok(())
}

#[test]
fn test_capture_skips_default_square_state() {
    let mut game = strictly_chess::Game::new();
    // Touch a square state and revert it to default.
    game.board_mut().set_active(&sq("d4"), false);
    game.board_mut().set_active(&sq("d4"), true);
    let ruleset = Ruleset::capture(game.board(), Metadata::named("sparse"));
    assert!(ruleset.square_states().is_empty());
    assert!(ruleset.to_json().contains("\"version\": 1"));
}
