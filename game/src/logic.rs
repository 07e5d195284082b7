//! Player-move rules and the per-action update pipeline.
//!
//! `update` is the single entry point the evaluator calls: it takes a settled
//! board and one action, and either returns the frames the action produces or
//! `None` for an illegal / no-effect action. Terminal boards (dead or won)
//! reject every action.

use engine::GameLogic;
use tracing::trace;

use crate::action::GameAction;
use crate::fall::{try_drop_rocks, try_push_from_explosion};
use crate::segment::{
    calculate_fixed_segments, calculate_segment_stacks, calculate_segments,
    is_segment_supported_by_placeholder,
};
use crate::tilemap::Tilemap;
use crate::tiles::{
    DIRT_SEGMENT_IDS_START, Direction, Grip, SoundId, Tile, TileKind, Vec2i,
};

/// Which neighboring cells currently give the player support.
pub fn get_grip(map: &Tilemap) -> Grip {
    let grip_at_offset = |dx: i32, dy: i32| {
        let p = map.player_position + Vec2i::new(dx, dy);
        map.is_point_valid(p) && map.get(p).kind.is_solid()
    };

    Grip {
        left: grip_at_offset(-1, 0),
        right: grip_at_offset(1, 0),
        below_left: grip_at_offset(-1, 1),
        below_right: grip_at_offset(1, 1),
        on_solid_ground: grip_at_offset(0, 1),
    }
}

/// Jump rules: no moving sideways into open space without support on that
/// side or solid ground, and no moving up without a side grip (standing on a
/// bomb is the one exception — you can climb off it).
pub fn check_move_disallow_jump(
    map: &Tilemap,
    grip: Grip,
    move_direction: Direction,
    target_kind: TileKind,
) -> bool {
    let standing_on_bomb = map.get(map.player_position).kind == TileKind::Bomb;

    if (move_direction == Direction::Left
        && target_kind != TileKind::Dirt
        && !grip.below_left
        && !grip.on_solid_ground)
        || (move_direction == Direction::Right
            && target_kind != TileKind::Dirt
            && !grip.below_right
            && !grip.on_solid_ground)
        || (move_direction == Direction::Up && !grip.beside() && !standing_on_bomb)
    {
        return false;
    }

    true
}

/// Resolve what the player is overlapping after movement settles: pickups,
/// the win tile, or something solid (death). `bomb_exempt_id` is the bomb
/// the player is legitimately standing on — the one placed this turn, or the
/// one they stood on when a blast started. Returns whether a pickup happened
/// (which can unblock further settling).
pub(crate) fn handle_player_collision(map: &mut Tilemap, bomb_exempt_id: u32) -> bool {
    let tile = map.get(map.player_position);

    if tile.kind.is_solid()
        && (tile.kind != TileKind::Bomb || tile.bomb_id != bomb_exempt_id)
        && tile.kind != TileKind::Placeholder
    {
        map.dead = true;
        return false;
    }

    match tile.kind {
        TileKind::Loot => {
            map.removed_tiles_animation_points
                .insert(tile.identity, map.player_position);
            map.set(map.player_position, Tile::AIR);
            map.current_loot += 1;
            map.sound_effects.insert(SoundId::Coin);
            true
        }
        TileKind::BombItem => {
            map.removed_tiles_animation_points
                .insert(tile.identity, map.player_position);
            map.set(map.player_position, Tile::AIR);
            map.current_bombs += 1;
            map.sound_effects.insert(SoundId::EquipmentPickup);
            true
        }
        TileKind::MegadrillItem => {
            map.removed_tiles_animation_points
                .insert(tile.identity, map.player_position);
            map.set(map.player_position, Tile::AIR);
            map.current_megadrills += 1;
            map.sound_effects.insert(SoundId::EquipmentPickup);
            true
        }
        TileKind::LevelEnd
            if map.current_loot == map.max_loot && map.current_diamonds == map.max_diamonds =>
        {
            map.win = true;
            false
        }
        _ => false,
    }
}

/// Pin every dirt chunk to its own segment id so nothing merges while it is
/// moving. Prevents falling dirt from sticking to dirt it slides past.
fn force_dirt_not_to_merge(map: &mut Tilemap) {
    let segments = calculate_segments(map);
    for (index, segment) in segments.iter().enumerate() {
        if segment.kind != TileKind::Dirt {
            continue;
        }
        for &point in segment.points() {
            map.get_mut(point).segment_id = index as u32 + DIRT_SEGMENT_IDS_START;
        }
    }
}

/// Every dirt cell alone in its own segment. Crush resolution during
/// explosions requires crushable singletons.
fn split_dirt_segments(map: &mut Tilemap) {
    let mut segment_id = DIRT_SEGMENT_IDS_START;
    for y in 0..map.dimensions.y {
        for x in 0..map.dimensions.x {
            let tile = map.get_mut(Vec2i::new(x, y));
            if tile.kind == TileKind::Dirt {
                tile.segment_id = segment_id;
                segment_id += 1;
            }
        }
    }
}

/// Back to the shared id: dirt that touches dirt merges again.
fn allow_dirt_to_merge(map: &mut Tilemap) {
    for y in 0..map.dimensions.y {
        for x in 0..map.dimensions.x {
            let tile = map.get_mut(Vec2i::new(x, y));
            if tile.kind == TileKind::Dirt {
                tile.segment_id = DIRT_SEGMENT_IDS_START;
            }
        }
    }
}

/// Apply one action to a settled board.
pub fn update(state: &Tilemap, action: GameAction) -> Option<Vec<Tilemap>> {
    if state.dead || state.win {
        return None;
    }

    let mut frames: Vec<Tilemap> = vec![state.clone()];
    macro_rules! last {
        () => {
            frames.last_mut().expect("frames never empty")
        };
    }

    let grip = get_grip(&frames[0]);

    // Suspended with no grip at all (it happens after collecting a diamond
    // by its upper tiles): direction keys skip movement and just let the
    // settling below run, so the player can drop by pressing anything.
    let bypass_movement = !grip.any();

    if !bypass_movement {
        let move_direction = action.direction();
        let step = move_direction.vector();
        let new_position = last!().player_position + step;

        if !last!().is_point_valid(new_position) {
            return None;
        }

        let target_kind = last!().get(new_position).kind;
        if !check_move_disallow_jump(last!(), grip, move_direction, target_kind) {
            return None;
        }

        last!().player_position = new_position;

        if action.is_directional() {
            if target_kind == TileKind::Diamond {
                last!().sound_effects.insert(SoundId::Move);
                last!().sound_effects.insert(SoundId::Diamond);

                // The whole diamond chunk is collected at once. Its cells
                // stay solid placeholders until the end of the turn.
                let segments = calculate_segments(last!());
                let diamond_segment = segments
                    .iter()
                    .find(|segment| segment.contains(new_position))
                    .expect("player cell must be inside a segment");
                let points: Vec<Vec2i> = diamond_segment.points().to_vec();
                for point in points {
                    last!().set(point, Tile::new(TileKind::Placeholder, 0));
                }
                last!().current_diamonds += 1;
            } else {
                if !target_kind.is_solid() {
                    last!().sound_effects.insert(SoundId::Move);
                }

                if target_kind.is_solid() {
                    if target_kind != TileKind::Dirt {
                        return None;
                    }

                    last!().sound_effects.insert(SoundId::Drill);
                    let mut new_kind = TileKind::Air;

                    let digging_into_falling_section = {
                        let segments = calculate_segments(last!());
                        let cant_fall = calculate_fixed_segments(
                            last!(),
                            &segments,
                            Vec2i::new(0, 1),
                            None,
                        );
                        let player = last!().player_position;
                        !cant_fall
                            .iter()
                            .any(|&index| segments[index].contains(player))
                    };

                    if !digging_into_falling_section {
                        // Digging out from under a stable overhang leaves the
                        // cell magically solid for the rest of the turn: the
                        // coyote-time window to get out of your own hole.
                        let above = last!().player_position + Vec2i::new(0, -1);
                        if last!().is_point_valid(above) && last!().get(above).kind.is_solid() {
                            new_kind = TileKind::Placeholder;
                        }
                    }

                    let player = last!().player_position;
                    last!().set(player, Tile::new(new_kind, 0));
                    last!().dig_direction = move_direction;

                    // Digging out your own grip earns a beat of hang time
                    // before the fall: one extra frame with the cell cleared.
                    if !get_grip(last!()).any() {
                        let paused = last!().clone();
                        frames.push(paused);
                        let player = last!().player_position;
                        last!().set(player, Tile::AIR);
                    }
                }
            }
        }
    }

    let mut bomb_placed_this_turn_id = 0;
    if action == GameAction::BombDrop {
        let map = last!();
        if map.current_bombs == 0 {
            return None;
        }
        if map.get(map.player_position).kind != TileKind::Air {
            return None;
        }

        let identity = map.fresh_tile_identity();
        let bomb_id = map.next_bomb_id;
        map.next_bomb_id += 1;
        let player = map.player_position;
        let tile = map.get_mut(player);
        tile.kind = TileKind::Bomb;
        tile.identity = identity;
        tile.bomb_id = bomb_id;
        map.current_bombs -= 1;

        bomb_placed_this_turn_id = bomb_id;
        map.sound_effects.insert(SoundId::EquipmentPickup);
    }

    if action == GameAction::MegadrillDrop {
        let map = last!();
        let player = map.player_position;

        if map.get(player).kind == TileKind::Megadrill {
            let tile = map.get_mut(player);
            tile.kind = TileKind::Air;
            tile.identity = 0;
            map.current_megadrills += 1;
        } else {
            if map.current_megadrills == 0 {
                return None;
            }
            if map.get(player).kind != TileKind::Air {
                return None;
            }

            let identity = map.fresh_tile_identity();
            let tile = map.get_mut(player);
            tile.kind = TileKind::Megadrill;
            tile.identity = identity;
            map.current_megadrills -= 1;
        }

        map.sound_effects.insert(SoundId::EquipmentPickup);
    }

    if action == GameAction::BombTrigger {
        let mut did_bomb = false;

        // Blasts can arm bomb items they hit, so detonation runs in rounds
        // until a round sets nothing else off.
        let mut done_bombing = false;
        'all_bombs: while !done_bombing {
            done_bombing = true;

            let mut bomb_ids: Vec<u32> = Vec::new();
            for y in 0..last!().dimensions.y {
                for x in 0..last!().dimensions.x {
                    let tile = last!().get(Vec2i::new(x, y));
                    if tile.kind == TileKind::Bomb {
                        bomb_ids.push(tile.bomb_id);
                    }
                }
            }

            // Bombs go off in the order they were placed.
            bomb_ids.sort_unstable();
            for bomb_id in bomb_ids {
                for y in 0..last!().dimensions.y {
                    for x in 0..last!().dimensions.x {
                        let origin = Vec2i::new(x, y);
                        if last!().get(origin).bomb_id != bomb_id {
                            continue;
                        }

                        let next = last!().clone();
                        frames.push(next);
                        last!().shake_screen = true;

                        split_dirt_segments(last!());

                        done_bombing = false;
                        did_bomb = true;
                        try_push_from_explosion(last!(), origin);
                        last!().set(origin, Tile::AIR);

                        allow_dirt_to_merge(last!());

                        if last!().dead {
                            break 'all_bombs;
                        }
                    }
                }
            }
        }

        if !did_bomb {
            return None;
        }
    }

    if last!().dead {
        return Some(frames);
    }

    force_dirt_not_to_merge(last!());

    let settle = last!().clone();
    frames.push(settle);
    let moved = try_drop_rocks(last!());
    if !moved && action != GameAction::BombTrigger {
        frames.pop();
    }

    // Player free-fall: drop while nothing below and no grip; past the
    // bottom edge is death.
    loop {
        let map = last!();
        if map.player_position.y + 1 >= map.dimensions.y {
            map.dead = true;
            break;
        }
        if map.get(map.player_position + Vec2i::new(0, 1)).kind.is_solid() {
            break;
        }
        let new_grip = get_grip(map);
        if new_grip.beside() || new_grip.below() {
            break;
        }
        map.player_position.y += 1;
    }

    {
        // Anything held up only by a placeholder starts falling next turn;
        // mark it shaking so the renderer can telegraph that.
        let map = last!();
        let segments = calculate_segments(map);
        let stacks = calculate_segment_stacks(map, &segments);
        for index in 0..stacks.len() {
            if is_segment_supported_by_placeholder(&stacks, &segments, index) {
                for &point in segments[index].points() {
                    map.tile_temp_state.get_mut(point).shaking = true;
                }
            }
        }

        // Placeholders live for exactly one turn.
        for y in 0..map.dimensions.y {
            for x in 0..map.dimensions.x {
                let p = Vec2i::new(x, y);
                if map.get(p).kind == TileKind::Placeholder {
                    map.set(p, Tile::AIR);
                }
            }
        }
    }

    handle_player_collision(last!(), bomb_placed_this_turn_id);

    allow_dirt_to_merge(last!());

    trace!(
        action = ?action,
        frames = frames.len(),
        dead = frames.last().expect("frames never empty").dead,
        win = frames.last().expect("frames never empty").win,
        "update"
    );

    Some(frames)
}

/// The Burrow simulation plugged into the generic evaluation engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BurrowLogic;

impl GameLogic for BurrowLogic {
    type State = Tilemap;
    type Action = GameAction;

    fn apply(&self, state: &Tilemap, action: GameAction) -> Option<Vec<Tilemap>> {
        update(state, action)
    }

    fn reset_action() -> Option<GameAction> {
        Some(GameAction::Reset)
    }

    fn encode_action(action: GameAction) -> char {
        action.encode()
    }

    fn cache_scope(state: &Tilemap) -> &str {
        &state.path
    }
}
