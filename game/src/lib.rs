pub mod action;
pub mod fall;
pub mod level;
pub mod logic;
pub mod segment;
pub mod tilemap;
pub mod tiles;

pub use action::GameAction;
pub use level::{LevelCatalog, LevelDoc};
pub use logic::BurrowLogic;
pub use tilemap::Tilemap;
pub use tiles::{Direction, Grip, SoundId, Tile, TileKind, Vec2i};
