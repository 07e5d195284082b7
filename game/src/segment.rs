use std::collections::{BTreeSet, HashMap, HashSet};

use crate::tilemap::Tilemap;
use crate::tiles::{TileKind, Vec2i};

/// A maximal 4-connected chunk of same-kind, same-segment-id tiles.
///
/// Segments move as rigid bodies: the fall and explosion resolvers decide
/// fixedness and motion per segment, never per cell. They are ephemeral —
/// recomputed whenever the grid may have changed, never stored on the board.
#[derive(Debug, Clone)]
pub struct Segment {
    pub kind: TileKind,
    points: Vec<Vec2i>,
    point_set: HashSet<Vec2i>,
}

impl Segment {
    fn new(kind: TileKind) -> Segment {
        Segment {
            kind,
            points: Vec::new(),
            point_set: HashSet::new(),
        }
    }

    fn push(&mut self, p: Vec2i) {
        self.points.push(p);
        self.point_set.insert(p);
    }

    /// Points in row-major discovery order.
    pub fn points(&self) -> &[Vec2i] {
        &self.points
    }

    pub fn contains(&self, p: Vec2i) -> bool {
        self.point_set.contains(&p)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Scanline connected-component labeling over the whole grid.
///
/// Every cell (air included) lands in exactly one segment. Items and live
/// bombs never merge — each is always alone in its segment. The returned
/// order is the row-major order in which each segment was first seen, which
/// downstream relaxation and repaint loops rely on being deterministic.
pub fn calculate_segments(map: &Tilemap) -> Vec<Segment> {
    let width = map.dimensions.x;
    let height = map.dimensions.y;

    let mut next_label: u32 = 1;
    let mut labels: Vec<u32> = vec![0; (width * height) as usize];
    let flat = |p: Vec2i| (p.y * width + p.x) as usize;

    for y in 0..height {
        for x in 0..width {
            let p = Vec2i::new(x, y);
            let this = map.get(p);
            let mut assigned: u32 = 0;

            if !this.kind.is_item() && this.kind != TileKind::Bomb {
                if x > 0 {
                    let left = Vec2i::new(x - 1, y);
                    if this.compatible(map.get(left)) {
                        assigned = labels[flat(left)];
                    }
                }

                if y > 0 {
                    let up = Vec2i::new(x, y - 1);
                    if this.compatible(map.get(up)) {
                        let up_label = labels[flat(up)];
                        if assigned != 0 && assigned != up_label {
                            // Left- and up-merge disagree: fold the left run's
                            // label into the upper one everywhere.
                            for label in labels.iter_mut() {
                                if *label == assigned {
                                    *label = up_label;
                                }
                            }
                        }
                        assigned = up_label;
                    }
                }
            }

            if assigned == 0 {
                assigned = next_label;
                next_label += 1;
            }
            labels[flat(p)] = assigned;
        }
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut label_to_index: HashMap<u32, usize> = HashMap::new();
    for y in 0..height {
        for x in 0..width {
            let p = Vec2i::new(x, y);
            let label = labels[flat(p)];
            let index = *label_to_index.entry(label).or_insert_with(|| {
                segments.push(Segment::new(map.get(p).kind));
                segments.len() - 1
            });
            segments[index].push(p);
        }
    }

    segments
}

/// Inverse of the partition: every cell maps to its segment index.
pub fn point_to_segment_lookup(segments: &[Segment]) -> HashMap<Vec2i, usize> {
    let mut lookup = HashMap::new();
    for (index, segment) in segments.iter().enumerate() {
        for &p in segment.points() {
            lookup.insert(p, index);
        }
    }
    lookup
}

/// Which segments cannot move along `direction` this pass.
///
/// A segment is fixed when its kind cannot fall at all, or when some cell's
/// downstream neighbor belongs to a different, already-fixed segment that
/// blocks it: a solid tile, an item under an item, or a megadrill under a
/// diamond. Relaxed to a fixed point in segment-index order; support is only
/// discovered after the supporter's own status, so the loop runs until a
/// full pass changes nothing (at most one pass per segment).
pub fn calculate_fixed_segments(
    map: &Tilemap,
    segments: &[Segment],
    direction: Vec2i,
    is_solid: Option<&dyn Fn(TileKind) -> bool>,
) -> HashSet<usize> {
    let default_solid = |kind: TileKind| kind.is_solid();
    let is_solid: &dyn Fn(TileKind) -> bool = match is_solid {
        Some(custom) => custom,
        None => &default_solid,
    };

    let lookup = point_to_segment_lookup(segments);
    let mut cant_fall: HashSet<usize> = HashSet::new();

    let mut changed = true;
    while changed {
        changed = false;

        'segments: for (index, segment) in segments.iter().enumerate() {
            if cant_fall.contains(&index) {
                continue;
            }

            if !segment.kind.can_fall() {
                cant_fall.insert(index);
                changed = true;
                continue;
            }

            for &point in segment.points() {
                let downstream = point + direction;
                if !map.is_point_valid(downstream) {
                    continue;
                }

                let under = *lookup
                    .get(&downstream)
                    .expect("segment partition must cover every cell");
                if under == index {
                    continue;
                }

                let under_kind = segments[under].kind;
                let blocks = is_solid(under_kind)
                    || (under_kind.is_item() && segment.kind.is_item())
                    || (under_kind == TileKind::Megadrill && segment.kind == TileKind::Diamond);

                if blocks && cant_fall.contains(&under) {
                    cant_fall.insert(index);
                    changed = true;
                    continue 'segments;
                }
            }
        }
    }

    cant_fall
}

/// Support edges between segments: which non-air segments each one rests on.
/// Item segments never count as support for non-items.
#[derive(Debug, Clone, Default)]
pub struct SegmentStackNode {
    pub below: BTreeSet<usize>,
}

pub fn calculate_segment_stacks(map: &Tilemap, segments: &[Segment]) -> Vec<SegmentStackNode> {
    let lookup = point_to_segment_lookup(segments);
    let mut nodes: Vec<SegmentStackNode> = vec![SegmentStackNode::default(); segments.len()];

    for (index, segment) in segments.iter().enumerate() {
        if segment.kind == TileKind::Air {
            continue;
        }

        for &point in segment.points() {
            let below_point = point + Vec2i::new(0, 1);
            if !map.is_point_valid(below_point) {
                continue;
            }

            let under = *lookup
                .get(&below_point)
                .expect("segment partition must cover every cell");
            if under == index || segments[under].kind == TileKind::Air {
                continue;
            }
            if segments[under].kind.is_item() && !segment.kind.is_item() {
                continue;
            }

            nodes[index].below.insert(under);
        }
    }

    nodes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupportKind {
    Placeholder,
    Hard,
    Skipped,
}

/// True when every chain of support under this segment bottoms out on a
/// placeholder — i.e. the segment will start falling the moment the
/// placeholder expires. Used to mark its tiles as shaking.
pub fn is_segment_supported_by_placeholder(
    nodes: &[SegmentStackNode],
    segments: &[Segment],
    index: usize,
) -> bool {
    fn inner(
        nodes: &[SegmentStackNode],
        segments: &[Segment],
        index: usize,
        visited: &mut [bool],
    ) -> SupportKind {
        match segments[index].kind {
            TileKind::Megadrill => return SupportKind::Skipped,
            TileKind::Placeholder => return SupportKind::Placeholder,
            TileKind::Bedrock => return SupportKind::Hard,
            _ => {}
        }

        if nodes[index].below.is_empty() {
            return SupportKind::Hard;
        }

        visited[index] = true;

        let mut aggregated = SupportKind::Skipped;
        for &below in &nodes[index].below {
            if visited[below] {
                continue;
            }
            match inner(nodes, segments, below, visited) {
                SupportKind::Hard => return SupportKind::Hard,
                SupportKind::Placeholder => aggregated = SupportKind::Placeholder,
                SupportKind::Skipped => {}
            }
        }

        aggregated
    }

    let mut visited = vec![false; nodes.len()];
    inner(nodes, segments, index, &mut visited) == SupportKind::Placeholder
}
