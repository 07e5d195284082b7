use std::collections::HashSet;

use game::level::tilemap_from_ascii;
use game::segment::{
    calculate_fixed_segments, calculate_segment_stacks, calculate_segments,
    is_segment_supported_by_placeholder, point_to_segment_lookup,
};
use game::tiles::{DIRT_SEGMENT_IDS_START, TileKind, Vec2i};

#[test]
fn segments_partition_the_whole_grid() {
    let map = tilemap_from_ascii(
        "test://partition",
        &[
            "Pd#..", //
            "dd#b.", //
            "==.$.", //
            "=====",
        ],
    );
    let segments = calculate_segments(&map);

    let total: usize = segments.iter().map(|s| s.len()).sum();
    assert_eq!(total, 20);

    let mut seen: HashSet<Vec2i> = HashSet::new();
    for segment in &segments {
        for &p in segment.points() {
            assert!(seen.insert(p), "point {p:?} appears in two segments");
        }
    }
    assert_eq!(seen.len(), 20);

    // The lookup is the exact inverse of the partition.
    let lookup = point_to_segment_lookup(&segments);
    for (index, segment) in segments.iter().enumerate() {
        for &p in segment.points() {
            assert_eq!(lookup[&p], index);
        }
    }
}

#[test]
fn items_and_bombs_never_merge() {
    let map = tilemap_from_ascii(
        "test://items",
        &[
            "$$b", //
            "**E", //
            "===",
        ],
    );
    let segments = calculate_segments(&map);

    for segment in &segments {
        if segment.kind.is_item() || segment.kind == TileKind::Bomb {
            assert_eq!(segment.len(), 1, "{:?} merged into a segment", segment.kind);
        }
    }
    // Two loot, one bomb item, two live bombs, one exit, one bedrock run.
    assert_eq!(
        segments.iter().filter(|s| s.kind != TileKind::Air).count(),
        7
    );
}

#[test]
fn touching_dirt_shares_one_canonical_segment() {
    let map = tilemap_from_ascii(
        "test://dirt",
        &[
            "d.d", //
            "ddd", //
            "===",
        ],
    );

    for y in 0..2 {
        for x in 0..3 {
            let p = Vec2i::new(x, y);
            if map.get(p).kind == TileKind::Dirt {
                assert_eq!(map.get(p).segment_id, DIRT_SEGMENT_IDS_START);
            }
        }
    }

    let segments = calculate_segments(&map);
    let dirt: Vec<_> = segments.iter().filter(|s| s.kind == TileKind::Dirt).collect();
    assert_eq!(dirt.len(), 1);
    assert_eq!(dirt[0].len(), 5);
}

#[test]
fn differing_segment_ids_keep_neighbors_apart() {
    let mut map = tilemap_from_ascii(
        "test://chunks",
        &[
            "##", //
            "==",
        ],
    );
    // Loaded touching rock is one chunk; retag half of it the way a fall
    // split would.
    map.get_mut(Vec2i::new(1, 0)).segment_id = 99;

    let segments = calculate_segments(&map);
    let rocks: Vec<_> = segments.iter().filter(|s| s.kind == TileKind::Rock).collect();
    assert_eq!(rocks.len(), 2);
}

#[test]
fn fixedness_follows_support_chains() {
    let map = tilemap_from_ascii(
        "test://support",
        &[
            ".#.", //
            "...", //
            "#..", //
            "=..",
        ],
    );
    let segments = calculate_segments(&map);
    let fixed = calculate_fixed_segments(&map, &segments, Vec2i::new(0, 1), None);
    let lookup = point_to_segment_lookup(&segments);

    // Floating rock falls; grounded rock does not; air and bedrock never move.
    assert!(!fixed.contains(&lookup[&Vec2i::new(1, 0)]));
    assert!(fixed.contains(&lookup[&Vec2i::new(0, 2)]));
    assert!(fixed.contains(&lookup[&Vec2i::new(0, 3)]));
    assert!(fixed.contains(&lookup[&Vec2i::new(1, 1)]));
}

#[test]
fn megadrill_blocks_diamonds_but_not_loot() {
    let diamond = tilemap_from_ascii(
        "test://diamond-drill",
        &[
            "o", //
            "M", //
            "=",
        ],
    );
    let segments = calculate_segments(&diamond);
    let fixed = calculate_fixed_segments(&diamond, &segments, Vec2i::new(0, 1), None);
    let lookup = point_to_segment_lookup(&segments);
    assert!(fixed.contains(&lookup[&Vec2i::new(0, 0)]));

    let loot = tilemap_from_ascii(
        "test://loot-drill",
        &[
            "$", //
            "M", //
            "=",
        ],
    );
    let segments = calculate_segments(&loot);
    let fixed = calculate_fixed_segments(&loot, &segments, Vec2i::new(0, 1), None);
    let lookup = point_to_segment_lookup(&segments);
    assert!(!fixed.contains(&lookup[&Vec2i::new(0, 0)]));
}

#[test]
fn placeholder_support_is_detected_through_the_stack() {
    let coyote = tilemap_from_ascii(
        "test://coyote",
        &[
            "#", //
            "+", //
            "=",
        ],
    );
    let segments = calculate_segments(&coyote);
    let stacks = calculate_segment_stacks(&coyote, &segments);
    let lookup = point_to_segment_lookup(&segments);

    let rock = lookup[&Vec2i::new(0, 0)];
    assert!(is_segment_supported_by_placeholder(&stacks, &segments, rock));

    let grounded = tilemap_from_ascii(
        "test://grounded",
        &[
            "#", //
            "=",
        ],
    );
    let segments = calculate_segments(&grounded);
    let stacks = calculate_segment_stacks(&grounded, &segments);
    let lookup = point_to_segment_lookup(&segments);
    let rock = lookup[&Vec2i::new(0, 0)];
    assert!(!is_segment_supported_by_placeholder(&stacks, &segments, rock));
}
