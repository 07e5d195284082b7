use game::action::GameAction;
use game::level::tilemap_from_ascii;
use game::logic::{get_grip, update};
use game::tiles::{SoundId, TileKind, Vec2i};

#[test]
fn moving_into_rock_or_off_grid_is_illegal() {
    let map = tilemap_from_ascii(
        "test://blocked",
        &[
            "P#", //
            "==",
        ],
    );

    assert!(update(&map, GameAction::Right).is_none());
    assert!(update(&map, GameAction::Left).is_none());
    assert!(update(&map, GameAction::Up).is_none());
}

#[test]
fn jumping_needs_side_support() {
    let map = tilemap_from_ascii(
        "test://jump",
        &[
            "P.", //
            "=.",
        ],
    );

    // Flat ground: no side grip, no climbing.
    assert!(update(&map, GameAction::Up).is_none());
    // Walking right onto open air is fine while standing on solid ground.
    let frames = update(&map, GameAction::Right).unwrap();
    assert_eq!(frames.last().unwrap().player_position, Vec2i::new(1, 0));
}

#[test]
fn wall_hang_allows_climbing() {
    let map = tilemap_from_ascii(
        "test://hang",
        &[
            "..", //
            "P#", //
            ".=", //
            "==",
        ],
    );

    let frames = update(&map, GameAction::Up).unwrap();
    assert_eq!(frames.last().unwrap().player_position, Vec2i::new(0, 0));
}

#[test]
fn gripless_direction_keys_just_let_the_player_drop() {
    let map = tilemap_from_ascii(
        "test://bypass",
        &[
            "P.", //
            "..", //
            "..", //
            "==",
        ],
    );

    let frames = update(&map, GameAction::Left).unwrap();
    let last = frames.last().unwrap();
    assert_eq!(last.player_position, Vec2i::new(0, 2));
    assert!(!last.dead);
}

#[test]
fn digging_your_foothold_pauses_then_drops_you() {
    // The 3x3 scenario: dirt under the player, nothing under the dirt.
    let map = tilemap_from_ascii(
        "test://drop",
        &[
            ".P.", //
            ".d.", //
            "...",
        ],
    );

    let frames = update(&map, GameAction::Down).unwrap();
    // Digging removed the only grip, so a pause frame is inserted before the
    // fall resolves.
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].player_position, Vec2i::new(1, 1));
    assert_eq!(frames[0].get(Vec2i::new(1, 1)).kind, TileKind::Air);
    assert!(frames[0].sound_effects.contains(&SoundId::Drill));

    // With an open bottom there is nothing to land on.
    let last = frames.last().unwrap();
    assert_eq!(last.player_position, Vec2i::new(1, 2));
    assert!(last.dead);
}

#[test]
fn digging_with_a_floor_underneath_is_a_single_frame() {
    let map = tilemap_from_ascii(
        "test://dig",
        &[
            ".P.", //
            ".d.", //
            ".=.",
        ],
    );

    let frames = update(&map, GameAction::Down).unwrap();
    assert_eq!(frames.len(), 1);
    let last = frames.last().unwrap();
    assert_eq!(last.player_position, Vec2i::new(1, 1));
    assert_eq!(last.get(Vec2i::new(1, 1)).kind, TileKind::Air);
    assert!(!last.dead);
}

#[test]
fn coyote_placeholder_holds_an_overhang_for_one_turn() {
    let map = tilemap_from_ascii(
        "test://coyote",
        &[
            ".#.", //
            "Pd.", //
            ".d.", //
            "===",
        ],
    );

    let frames = update(&map, GameAction::Right).unwrap();
    assert_eq!(frames.len(), 1);
    let after_dig = frames.last().unwrap();
    // The rock is still up: the dug cell stayed solid for the turn, and the
    // rock is flagged as about to fall.
    assert_eq!(after_dig.get(Vec2i::new(1, 0)).kind, TileKind::Rock);
    assert!(after_dig.tile_temp_state.get(Vec2i::new(1, 0)).shaking);
    // The placeholder itself is cleaned up before the frame is returned.
    assert_eq!(after_dig.get(Vec2i::new(1, 1)).kind, TileKind::Air);

    // Next turn the support is gone and the rock comes down.
    let frames = update(after_dig, GameAction::Right).unwrap();
    assert_eq!(frames.len(), 2);
    let settled = frames.last().unwrap();
    assert_eq!(settled.get(Vec2i::new(1, 1)).kind, TileKind::Rock);
    assert_eq!(settled.player_position, Vec2i::new(2, 1));
    assert!(settled.shake_screen);
}

#[test]
fn bomb_drop_needs_stock_and_an_empty_cell() {
    let map = tilemap_from_ascii(
        "test://no-bombs",
        &[
            "P.", //
            "==",
        ],
    );
    assert!(update(&map, GameAction::BombDrop).is_none());

    let mut armed = map.clone();
    armed.current_bombs = 1;
    let frames = update(&armed, GameAction::BombDrop).unwrap();
    let last = frames.last().unwrap();
    let placed = last.get(Vec2i::new(0, 0));
    assert_eq!(placed.kind, TileKind::Bomb);
    assert_eq!(placed.bomb_id, 1);
    assert_eq!(last.current_bombs, 0);
    assert_eq!(last.next_bomb_id, 2);
    // Standing on the bomb you just placed is survivable.
    assert!(!last.dead);
}

#[test]
fn bomb_trigger_without_a_bomb_is_a_no_op() {
    let map = tilemap_from_ascii(
        "test://no-trigger",
        &[
            "P.", //
            "==",
        ],
    );
    assert!(update(&map, GameAction::BombTrigger).is_none());
}

#[test]
fn megadrill_placement_toggles() {
    let mut map = tilemap_from_ascii(
        "test://toggle",
        &[
            "P.", //
            "==",
        ],
    );
    assert!(update(&map, GameAction::MegadrillDrop).is_none());

    map.current_megadrills = 1;
    let frames = update(&map, GameAction::MegadrillDrop).unwrap();
    let placed = frames.last().unwrap();
    assert_eq!(placed.get(Vec2i::new(0, 0)).kind, TileKind::Megadrill);
    assert_eq!(placed.current_megadrills, 0);

    let frames = update(placed, GameAction::MegadrillDrop).unwrap();
    let retrieved = frames.last().unwrap();
    assert_eq!(retrieved.get(Vec2i::new(0, 0)).kind, TileKind::Air);
    assert_eq!(retrieved.current_megadrills, 1);
}

#[test]
fn loot_falling_onto_the_player_is_collected() {
    let map = tilemap_from_ascii(
        "test://loot",
        &[
            "$..", //
            "P#.", //
            ".=.", //
            "===",
        ],
    );

    // Stepping down pulls the coin's column out from under it; it drops onto
    // the player and is picked up instead of crushing them.
    let frames = update(&map, GameAction::Down).unwrap();
    let last = frames.last().unwrap();
    assert_eq!(last.current_loot, 1);
    assert_eq!(last.get(Vec2i::new(0, 2)).kind, TileKind::Air);
    assert!(last.sound_effects.contains(&SoundId::Coin));
    assert_eq!(last.player_position, Vec2i::new(0, 2));
    assert!(!last.dead);
}

#[test]
fn grip_reports_every_support_direction() {
    let map = tilemap_from_ascii(
        "test://grip",
        &[
            "P.", //
            "d.", //
            "==",
        ],
    );
    let grip = get_grip(&map);
    assert!(grip.on_solid_ground);
    assert!(!grip.left);
    assert!(!grip.right);
    assert!(grip.any());
}

#[test]
fn dead_and_won_boards_reject_actions() {
    let mut map = tilemap_from_ascii(
        "test://terminal",
        &[
            "P.", //
            "==",
        ],
    );
    map.dead = true;
    assert!(update(&map, GameAction::Right).is_none());

    map.dead = false;
    map.win = true;
    assert!(update(&map, GameAction::Right).is_none());
}
