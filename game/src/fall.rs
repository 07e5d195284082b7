//! Fall and explosion resolution.
//!
//! Both resolvers share the same core motion step: compute segments, decide
//! which ones move, then clear the whole grid and repaint every segment from
//! a snapshot of the pre-move board, shifted or not. Reading only from the
//! snapshot and writing only to the live grid keeps the pass free of
//! aliasing, and segment-index paint order resolves every cell conflict
//! deterministically.

use crate::logic::handle_player_collision;
use crate::segment::{calculate_fixed_segments, calculate_segments, point_to_segment_lookup};
use crate::tilemap::Tilemap;
use crate::tiles::{FireDirection, SoundId, Tile, TileKind, Vec2i};

/// One gravity resolution: drop every unsupported segment one row at a time
/// until a pass moves nothing. Returns whether anything moved at all.
///
/// Termination: a pass either moves at least one segment strictly downward
/// (or deletes it off the bottom edge / into a megadrill) or the loop stops,
/// and nothing a pass does can lift a tile. The board's total height-mass
/// strictly decreases on every continuing pass.
pub fn try_drop_rocks(map: &mut Tilemap) -> bool {
    let standing_on_bomb = map.get(map.player_position).bomb_id;

    let mut did_any_move = false;
    let mut continue_falling = true;

    while continue_falling {
        continue_falling = false;

        let segments = calculate_segments(map);
        let cant_fall = calculate_fixed_segments(map, &segments, Vec2i::new(0, 1), None);

        let before = map.clone();
        clear_tiles(map);

        let mut push_player_down = false;

        for (index, segment) in segments.iter().enumerate() {
            if segment.kind == TileKind::Air {
                continue;
            }

            let mut offset = Vec2i::ZERO;
            if !cant_fall.contains(&index) {
                offset.y += 1;
                continue_falling = true;
                did_any_move = true;
                if !segment.kind.is_item() {
                    map.shake_screen = true;
                }
            }

            let mut did_cut = false;
            let mut new_points: Vec<Vec2i> = Vec::new();

            for &point in segment.points() {
                let new_point = point + offset;

                if !map.is_point_valid(new_point) {
                    // Fell off the bottom edge: gone from the grid, but the
                    // animator still gets a destination to slide it toward.
                    let tile = before.get(point);
                    new_points.push(new_point);
                    map.removed_tiles_animation_points
                        .insert(tile.identity, point + Vec2i::new(0, map.dimensions.y / 2));
                    continue;
                }

                if before.get(new_point).kind == TileKind::Megadrill
                    && before.get(point).kind != TileKind::Megadrill
                {
                    let tile = before.get(point);
                    map.removed_tiles_animation_points
                        .insert(tile.identity, new_point);
                    map.sound_effects.insert(SoundId::Megadrill);
                    did_cut = true;
                    continue;
                }

                if !map.get(new_point).kind.is_solid() {
                    map.set(new_point, before.get(point));
                    new_points.push(new_point);

                    if offset != Vec2i::ZERO
                        && new_point == map.player_position
                        && !map.get(new_point).kind.is_item()
                    {
                        push_player_down = true;
                    }
                }
            }

            if segment.kind != TileKind::Dirt {
                resegment_if_needed(map, did_cut, &new_points);
            }
        }

        if push_player_down {
            let below = map.player_position + Vec2i::new(0, 1);
            if map.player_position.y + 1 < map.dimensions.y && !map.get(below).kind.is_solid() {
                map.player_position.y += 1;
            }
        }

        if handle_player_collision(map, standing_on_bomb) {
            continue_falling = true;
        }
    }

    did_any_move
}

/// One bomb detonation: ray-cast the four cardinal directions from the
/// origin, arm bomb items the rays hit, push what can be pushed, crush what
/// cannot follow, and repeat until a full round of directions moves nothing.
/// A ray reaching the player kills and aborts the whole detonation.
pub fn try_push_from_explosion(map: &mut Tilemap, origin: Vec2i) {
    let standing_on_bomb = map.get(map.player_position).bomb_id;

    map.set(origin, Tile::AIR);

    let mut did_move = true;
    while did_move {
        did_move = false;

        for fire_direction in [
            FireDirection::Up,
            FireDirection::Down,
            FireDirection::Left,
            FireDirection::Right,
        ] {
            let direction = fire_direction.to_direction().vector();

            let mut segments = calculate_segments(map);
            let lookup = point_to_segment_lookup(&segments);
            // What a blast pushes against: crushables and megadrills give
            // way, so only hard tiles count as support here.
            let blast_solid: &dyn Fn(TileKind) -> bool = &|kind| {
                kind != TileKind::Air && !kind.is_crushable() && kind != TileKind::Megadrill
            };
            let cant_fall = calculate_fixed_segments(map, &segments, direction, Some(blast_solid));

            // Crush resolution needs every crushable tile alone in its
            // segment; the caller split dirt before detonating.
            for segment in &segments {
                if segment.kind.is_crushable() {
                    debug_assert_eq!(segment.len(), 1, "crushable segment not a singleton");
                }
            }

            map.tile_temp_state.get_mut(origin).fire_direction = FireDirection::NoDirection;

            let mut pushed: Vec<usize> = Vec::new();

            // Ray-cast outward until something stops the blast.
            let mut hit = origin;
            loop {
                if hit == map.player_position {
                    map.dead = true;
                    return;
                }

                hit += direction;
                if !map.is_point_valid(hit) {
                    break;
                }

                if map.get(hit).kind == TileKind::BombItem {
                    // Armed: it becomes a live bomb and goes off next round.
                    let bomb_id = map.next_bomb_id;
                    map.next_bomb_id += 1;
                    let tile = map.get_mut(hit);
                    tile.kind = TileKind::Bomb;
                    tile.bomb_id = bomb_id;
                    for segment in segments.iter_mut() {
                        if segment.kind == TileKind::BombItem && segment.contains(hit) {
                            segment.kind = TileKind::Bomb;
                        }
                    }
                }

                let kind = map.get(hit).kind;
                if kind.can_fall() || kind == TileKind::Placeholder {
                    let segment_index = *lookup
                        .get(&hit)
                        .expect("segment partition must cover every cell");
                    if !cant_fall.contains(&segment_index) || kind.is_crushable() {
                        pushed.push(segment_index);
                        map.tile_temp_state.get_mut(hit).fire_direction = fire_direction;
                    }
                    break;
                } else if kind == TileKind::Air || kind == TileKind::Megadrill {
                    map.tile_temp_state.get_mut(hit).fire_direction = fire_direction;
                } else {
                    break;
                }
            }

            // A pushed segment drags whatever sits directly behind it, but
            // crushables only ever push other crushables.
            let mut cursor = 0;
            while cursor < pushed.len() {
                let pushing_index = pushed[cursor];
                let pushing_kind = segments[pushing_index].kind;
                let pushing_points: Vec<Vec2i> = segments[pushing_index].points().to_vec();

                for point in pushing_points {
                    let behind = point + direction;
                    if !map.is_point_valid(behind) || !map.get(behind).kind.can_fall() {
                        continue;
                    }
                    let behind_index = *lookup
                        .get(&behind)
                        .expect("segment partition must cover every cell");
                    if !pushed.contains(&behind_index)
                        && !cant_fall.contains(&behind_index)
                        && (!pushing_kind.is_crushable() || segments[behind_index].kind.is_crushable())
                    {
                        pushed.push(behind_index);
                    }
                }

                cursor += 1;
            }

            let before = map.clone();
            clear_tiles(map);

            let mut push_player = false;

            // Solids first: they own their destination cells outright.
            for (index, segment) in segments.iter().enumerate() {
                let segment_kind = segment.kind;
                if segment_kind == TileKind::Air || segment_kind.is_crushable() {
                    continue;
                }

                let mut offset = Vec2i::ZERO;
                if pushed.contains(&index) {
                    offset += direction;
                    did_move = true;
                }

                let mut did_cut = false;
                let mut new_points: Vec<Vec2i> = Vec::new();

                for &point in segment.points() {
                    let new_point = point + offset;

                    if !map.is_point_valid(new_point) {
                        let tile = before.get(point);
                        let visual_target = point
                            + match fire_direction {
                                FireDirection::Up => Vec2i::new(0, -map.dimensions.y / 2),
                                FireDirection::Down => Vec2i::new(0, map.dimensions.y / 2),
                                FireDirection::Left => Vec2i::new(-map.dimensions.x / 2, 0),
                                FireDirection::Right => Vec2i::new(map.dimensions.x / 2, 0),
                                FireDirection::NoFire | FireDirection::NoDirection => {
                                    unreachable!("blast pass always has a direction")
                                }
                            };
                        map.removed_tiles_animation_points
                            .insert(tile.identity, visual_target);
                        new_points.push(new_point);
                        continue;
                    }

                    if before.get(new_point).kind == TileKind::Megadrill
                        && before.get(point).kind.megadrill_can_cut()
                    {
                        let tile = before.get(point);
                        map.removed_tiles_animation_points
                            .insert(tile.identity, new_point);
                        map.sound_effects.insert(SoundId::Megadrill);
                        did_cut = true;
                        continue;
                    }

                    if !map.get(new_point).kind.is_solid() {
                        map.set(new_point, before.get(point));
                        new_points.push(new_point);

                        if offset != Vec2i::ZERO && new_point == map.player_position {
                            push_player = true;
                        }
                    }
                }

                if segment_kind != TileKind::Dirt {
                    resegment_if_needed(map, did_cut, &new_points);
                }
            }

            // Crushables second: anything that finds its cell taken by a
            // solid is simply destroyed.
            for (index, segment) in segments.iter().enumerate() {
                let segment_kind = segment.kind;
                if !segment_kind.is_crushable() {
                    continue;
                }

                let mut offset = Vec2i::ZERO;
                if pushed.contains(&index) {
                    offset += direction;
                    did_move = true;
                }

                for &point in segment.points() {
                    let new_point = point + offset;
                    if !map.is_point_valid(new_point) {
                        continue;
                    }

                    if map.get(new_point).kind == TileKind::Megadrill {
                        let tile = before.get(point);
                        map.removed_tiles_animation_points
                            .insert(tile.identity, new_point);
                        map.sound_effects.insert(SoundId::Megadrill);
                        continue;
                    }

                    if !map.get(new_point).kind.is_solid() {
                        map.set(new_point, before.get(point));

                        if !segment_kind.is_item()
                            && offset != Vec2i::ZERO
                            && new_point == map.player_position
                        {
                            push_player = true;
                        }
                    }
                }
            }

            if push_player {
                let shoved = map.player_position + direction;
                if map.is_point_valid(shoved) && !map.get(shoved).kind.is_solid() {
                    map.player_position += direction;
                }
            }

            if handle_player_collision(map, standing_on_bomb) {
                did_move = true;
            }

            if map.dead {
                return;
            }
        }
    }
}

/// A megadrill cut or a partial push off the grid edge can split a segment
/// in two while both halves still carry the same segment id; if they ever
/// touched again they would merge back. Detect the split on the freshly
/// painted grid and give every piece but the first a fresh id.
fn resegment_if_needed(map: &mut Tilemap, did_megadrill_cut: bool, new_points: &[Vec2i]) {
    if !did_megadrill_cut && new_points.iter().all(|&p| map.is_point_valid(p)) {
        return;
    }

    let segments = calculate_segments(map);
    let lookup = point_to_segment_lookup(&segments);

    let mut survivors: Vec<usize> = Vec::new();
    for &point in new_points {
        if !map.is_point_valid(point) {
            continue;
        }
        let index = *lookup
            .get(&point)
            .expect("segment partition must cover every cell");
        if !survivors.contains(&index) {
            survivors.push(index);
        }
    }

    for &index in survivors.iter().skip(1) {
        let fresh = map.fresh_segment_id();
        for &point in segments[index].points() {
            map.get_mut(point).segment_id = fresh;
        }
    }
}

fn clear_tiles(map: &mut Tilemap) {
    for y in 0..map.dimensions.y {
        for x in 0..map.dimensions.x {
            map.set(Vec2i::new(x, y), Tile::AIR);
        }
    }
}
