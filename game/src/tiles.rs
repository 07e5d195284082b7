use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Grid coordinate. `y` grows downward, matching level file row order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    pub const ZERO: Vec2i = Vec2i { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2i {
    type Output = Vec2i;
    fn add(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2i {
    fn add_assign(&mut self, rhs: Vec2i) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2i {
    type Output = Vec2i;
    fn sub(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Dirt normally lives in one shared segment so touching dirt merges freely.
/// Ids at or above this base are reserved for dirt; ids handed out by
/// `Tilemap::next_segment_id` stay below it.
pub const DIRT_SEGMENT_IDS_START: u32 = 4096;

/// Tile kinds with the stable numeric codes used by level files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Air,
    Dirt,
    Rock,
    Bedrock,
    Loot,
    Diamond,
    BombItem,
    MegadrillItem,
    LevelEnd,
    /// A live, placed bomb (as opposed to the pick-up item).
    Bomb,
    /// A placed megadrill: destroys anything that falls or is pushed into it.
    Megadrill,
    /// Only ever appears in level files; replaced by the player position on load.
    PlayerSpawn,
    /// Transient sentinel: solid for exactly the frame it was created in.
    /// Implements coyote-time digging and collected-diamond footprints.
    Placeholder,
}

impl TileKind {
    pub fn code(self) -> u8 {
        match self {
            TileKind::Air => 0,
            TileKind::Dirt => 1,
            TileKind::Rock => 2,
            TileKind::Bedrock => 3,
            TileKind::Loot => 4,
            TileKind::Diamond => 5,
            TileKind::BombItem => 6,
            TileKind::MegadrillItem => 7,
            TileKind::LevelEnd => 8,
            TileKind::Bomb => 9,
            TileKind::Megadrill => 10,
            TileKind::PlayerSpawn => 11,
            TileKind::Placeholder => 255,
        }
    }

    /// Unknown codes mean a corrupted level file; that is fatal, not
    /// recoverable.
    pub fn from_code(code: u8) -> TileKind {
        match code {
            0 => TileKind::Air,
            1 => TileKind::Dirt,
            2 => TileKind::Rock,
            3 => TileKind::Bedrock,
            4 => TileKind::Loot,
            5 => TileKind::Diamond,
            6 => TileKind::BombItem,
            7 => TileKind::MegadrillItem,
            8 => TileKind::LevelEnd,
            9 => TileKind::Bomb,
            10 => TileKind::Megadrill,
            11 => TileKind::PlayerSpawn,
            255 => TileKind::Placeholder,
            other => panic!("unknown tile code {other}"),
        }
    }

    /// Pick-ups: collected on contact instead of blocking or killing.
    pub fn is_item(self) -> bool {
        matches!(
            self,
            TileKind::Loot | TileKind::BombItem | TileKind::MegadrillItem | TileKind::LevelEnd
        )
    }

    /// Solid tiles give grip, block movement, and kill a player they land on.
    pub fn is_solid(self) -> bool {
        self != TileKind::Air && !self.is_item() && self != TileKind::Megadrill
    }

    pub fn can_fall(self) -> bool {
        self != TileKind::Air
            && self != TileKind::Placeholder
            && self != TileKind::Bedrock
            && self != TileKind::Megadrill
    }

    /// Crushable tiles are destroyed rather than blocking when pushed into an
    /// obstacle, and only ever push other crushables.
    pub fn is_crushable(self) -> bool {
        self.is_item() || self == TileKind::Dirt || self == TileKind::Placeholder
    }

    /// Megadrills cut everything except each other and diamonds.
    pub fn megadrill_can_cut(self) -> bool {
        self != TileKind::Megadrill && self != TileKind::Diamond
    }
}

/// One cell of the board.
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    pub kind: TileKind,
    /// Unique per physical tile lifetime; tracks a tile across frames for
    /// animation. Zero only for air and placeholders.
    pub identity: u32,
    /// Merge-prevention tag: same-kind neighbors only join a segment when
    /// their segment ids also match.
    pub segment_id: u32,
    /// Nonzero only for live bombs; detonation order is ascending bomb id.
    pub bomb_id: u32,
    /// Render hint carried through from the level file. Never simulated.
    pub override_render_id: u32,
}

impl Tile {
    pub const AIR: Tile = Tile {
        kind: TileKind::Air,
        identity: 0,
        segment_id: 0,
        bomb_id: 0,
        override_render_id: 0,
    };

    pub fn new(kind: TileKind, identity: u32) -> Tile {
        Tile {
            kind,
            identity,
            segment_id: 0,
            bomb_id: 0,
            override_render_id: 0,
        }
    }

    /// Segment compatibility: the merge test used by the segment analyzer.
    pub fn compatible(self, other: Tile) -> bool {
        self.kind == other.kind && self.segment_id == other.segment_id
    }
}

/// Replay equality. Identity, bomb id, and render override are
/// presentation-facing and excluded on purpose: two playthroughs that differ
/// only in those are the same playthrough.
impl PartialEq for Tile {
    fn eq(&self, other: &Tile) -> bool {
        self.kind == other.kind && self.segment_id == other.segment_id
    }
}

impl Eq for Tile {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn vector(self) -> Vec2i {
        match self {
            Direction::None => Vec2i::ZERO,
            Direction::Up => Vec2i::new(0, -1),
            Direction::Down => Vec2i::new(0, 1),
            Direction::Left => Vec2i::new(-1, 0),
            Direction::Right => Vec2i::new(1, 0),
        }
    }
}

/// Which blast ray passed through a cell. Presentation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FireDirection {
    #[default]
    NoFire,
    NoDirection,
    Up,
    Down,
    Left,
    Right,
}

impl FireDirection {
    pub fn to_direction(self) -> Direction {
        match self {
            FireDirection::Up => Direction::Up,
            FireDirection::Down => Direction::Down,
            FireDirection::Left => Direction::Left,
            FireDirection::Right => Direction::Right,
            FireDirection::NoFire | FireDirection::NoDirection => Direction::None,
        }
    }
}

/// Sound cues raised by a frame. The engine only sets flags; playing them is
/// the presentation layer's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SoundId {
    Move,
    Drill,
    Error,
    Death,
    Coin,
    BigMovement,
    Megadrill,
    EquipmentPickup,
    Diamond,
}

/// Per-cell presentation state for the current frame: blast rays and
/// about-to-fall shaking. Reset on every clone, excluded from equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileTempState {
    pub fire_direction: FireDirection,
    pub shaking: bool,
}

/// Which neighboring cells give the player support.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grip {
    pub left: bool,
    pub right: bool,
    pub below_left: bool,
    pub below_right: bool,
    pub on_solid_ground: bool,
}

impl Grip {
    pub fn beside(self) -> bool {
        self.left || self.right
    }

    pub fn below(self) -> bool {
        self.below_left || self.below_right
    }

    pub fn any(self) -> bool {
        self.left || self.right || self.below_left || self.below_right || self.on_solid_ground
    }
}
