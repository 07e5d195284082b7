use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::tiles::{Direction, SoundId, Tile, TileKind, TileTempState, Vec2i};

/// Owned dense 2D storage, row-major.
#[derive(Debug, Clone)]
pub struct Grid2d<T> {
    width: i32,
    height: i32,
    cells: Vec<T>,
}

impl<T: Clone> Grid2d<T> {
    pub fn new(width: i32, height: i32, fill: T) -> Self {
        assert!(width > 0 && height > 0, "degenerate grid {width}x{height}");
        Self {
            width,
            height,
            cells: vec![fill; (width * height) as usize],
        }
    }
}

impl<T> Grid2d<T> {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_point_valid(&self, p: Vec2i) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }

    fn index(&self, p: Vec2i) -> usize {
        debug_assert!(self.is_point_valid(p), "out of bounds access at {p:?}");
        (p.y * self.width + p.x) as usize
    }

    pub fn get(&self, p: Vec2i) -> &T {
        &self.cells[self.index(p)]
    }

    pub fn get_mut(&mut self, p: Vec2i) -> &mut T {
        let index = self.index(p);
        &mut self.cells[index]
    }
}

/// The board: one simulated tile layer plus shared read-only background
/// layers, the player, counters, and the per-frame presentation outputs.
///
/// Boards are value-cloned whenever a frame branches from its predecessor;
/// the clone deep-copies the simulated layer and resets everything
/// presentation-facing, so each frame reports only its own sounds and
/// animation points.
#[derive(Debug)]
pub struct Tilemap {
    /// Identifies the source level; doubles as the evaluation cache scope.
    pub path: String,
    pub title: String,
    pub prompt: Option<String>,

    tiles: Grid2d<Tile>,
    /// Decorative layers, never simulated. Shared across clones.
    background: Vec<Arc<Grid2d<Tile>>>,
    pub dimensions: Vec2i,
    pub player_position: Vec2i,

    pub max_loot: u32,
    pub max_diamonds: u32,
    pub current_loot: u32,
    pub current_diamonds: u32,
    pub current_bombs: u32,
    pub current_megadrills: u32,
    pub win: bool,
    pub dead: bool,
    pub next_bomb_id: u32,
    pub next_tile_identity: u32,
    pub next_segment_id: u32,

    // Presentation-facing state: reset on clone, excluded from equality and
    // persistence.
    pub shake_screen: bool,
    pub tile_temp_state: Grid2d<TileTempState>,
    pub sound_effects: BTreeSet<SoundId>,
    /// Tiles that vanished this frame (off-grid, crushed, drilled away),
    /// keyed by instance identity, mapped to the virtual point they animate
    /// toward.
    pub removed_tiles_animation_points: BTreeMap<u32, Vec2i>,
    pub dig_direction: Direction,
}

impl Tilemap {
    /// An all-air board. Levels come from the loader; this is the starting
    /// point for programmatic construction.
    pub fn empty(path: impl Into<String>, width: i32, height: i32) -> Tilemap {
        let path = path.into();
        Tilemap {
            title: path.clone(),
            path,
            prompt: None,
            tiles: Grid2d::new(width, height, Tile::AIR),
            background: Vec::new(),
            dimensions: Vec2i::new(width, height),
            player_position: Vec2i::ZERO,
            max_loot: 0,
            max_diamonds: 0,
            current_loot: 0,
            current_diamonds: 0,
            current_bombs: 0,
            current_megadrills: 0,
            win: false,
            dead: false,
            next_bomb_id: 1,
            next_tile_identity: 1,
            next_segment_id: 1,
            shake_screen: false,
            tile_temp_state: Grid2d::new(width, height, TileTempState::default()),
            sound_effects: BTreeSet::new(),
            removed_tiles_animation_points: BTreeMap::new(),
            dig_direction: Direction::None,
        }
    }

    pub fn is_point_valid(&self, p: Vec2i) -> bool {
        self.tiles.is_point_valid(p)
    }

    pub fn get(&self, p: Vec2i) -> Tile {
        *self.tiles.get(p)
    }

    pub fn get_mut(&mut self, p: Vec2i) -> &mut Tile {
        self.tiles.get_mut(p)
    }

    pub fn set(&mut self, p: Vec2i, tile: Tile) {
        // A zero identity is only legal for the two kinds that carry none.
        assert!(
            tile.identity != 0
                || tile.kind == TileKind::Air
                || tile.kind == TileKind::Placeholder,
            "tile with zero identity must be air or placeholder, got {:?}",
            tile.kind
        );
        *self.tiles.get_mut(p) = tile;
    }

    pub fn background_layers(&self) -> &[Arc<Grid2d<Tile>>] {
        &self.background
    }

    pub fn push_background_layer(&mut self, layer: Grid2d<Tile>) {
        assert!(
            layer.width() == self.dimensions.x && layer.height() == self.dimensions.y,
            "background layer dimensions mismatch"
        );
        self.background.push(Arc::new(layer));
    }

    pub fn fresh_tile_identity(&mut self) -> u32 {
        let identity = self.next_tile_identity;
        self.next_tile_identity += 1;
        identity
    }

    pub fn fresh_segment_id(&mut self) -> u32 {
        let id = self.next_segment_id;
        self.next_segment_id += 1;
        id
    }
}

/// A frame branch: deep copy of the simulated layer and scalars, shared
/// background, and a clean slate for sounds, shake, animation points, temp
/// state, and the dig hint.
impl Clone for Tilemap {
    fn clone(&self) -> Tilemap {
        Tilemap {
            path: self.path.clone(),
            title: self.title.clone(),
            prompt: self.prompt.clone(),
            tiles: self.tiles.clone(),
            background: self.background.clone(),
            dimensions: self.dimensions,
            player_position: self.player_position,
            max_loot: self.max_loot,
            max_diamonds: self.max_diamonds,
            current_loot: self.current_loot,
            current_diamonds: self.current_diamonds,
            current_bombs: self.current_bombs,
            current_megadrills: self.current_megadrills,
            win: self.win,
            dead: self.dead,
            next_bomb_id: self.next_bomb_id,
            next_tile_identity: self.next_tile_identity,
            next_segment_id: self.next_segment_id,
            shake_screen: false,
            tile_temp_state: Grid2d::new(
                self.dimensions.x,
                self.dimensions.y,
                TileTempState::default(),
            ),
            sound_effects: BTreeSet::new(),
            removed_tiles_animation_points: BTreeMap::new(),
            dig_direction: Direction::None,
        }
    }
}

/// Replay equality: gameplay scalars plus the per-tile replay projection
/// (kind and segment id). Identities, presentation state, and the source
/// path are excluded.
impl PartialEq for Tilemap {
    fn eq(&self, other: &Tilemap) -> bool {
        if self.dimensions != other.dimensions
            || self.player_position != other.player_position
            || self.max_loot != other.max_loot
            || self.max_diamonds != other.max_diamonds
            || self.current_loot != other.current_loot
            || self.current_diamonds != other.current_diamonds
            || self.current_bombs != other.current_bombs
            || self.current_megadrills != other.current_megadrills
            || self.win != other.win
            || self.dead != other.dead
            || self.next_bomb_id != other.next_bomb_id
        {
            return false;
        }

        for y in 0..self.dimensions.y {
            for x in 0..self.dimensions.x {
                let p = Vec2i::new(x, y);
                if self.get(p) != other.get(p) {
                    return false;
                }
            }
        }

        true
    }
}

impl Eq for Tilemap {}
