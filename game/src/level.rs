//! Level documents and the level catalog.
//!
//! Levels are JSON: a grid of numeric tile codes (one CSV row per grid row)
//! plus a property bag. Saving a board and loading it back reproduces the
//! exact same board — the round-trip is what makes saved games and stored
//! test fixtures trustworthy. Malformed documents are fatal (they mean a
//! corrupted file or an editor bug); only missing files are recoverable.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::segment::calculate_segments;
use crate::tilemap::{Grid2d, Tilemap};
use crate::tiles::{DIRT_SEGMENT_IDS_START, Tile, TileKind, Vec2i};

/// A typed property value. Untagged so the JSON stays plain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PropValue {
    fn as_int(&self, key: &str) -> i64 {
        match self {
            PropValue::Int(v) => *v,
            other => panic!("property {key} should be an integer, got {other:?}"),
        }
    }

    fn as_bool(&self, key: &str) -> bool {
        match self {
            PropValue::Bool(v) => *v,
            other => panic!("property {key} should be a bool, got {other:?}"),
        }
    }

    fn as_str(&self, key: &str) -> &str {
        match self {
            PropValue::Str(v) => v,
            other => panic!("property {key} should be a string, got {other:?}"),
        }
    }
}

/// The serialized form of a level (or of a saved board).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Stored winning run, verified by the solution regression sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    pub width: i32,
    pub height: i32,
    /// One CSV row of tile codes per grid row.
    pub tiles: Vec<String>,
    /// Decorative layers behind the simulated one, same format.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub background: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropValue>,
}

impl LevelDoc {
    pub fn from_json(body: &str) -> LevelDoc {
        serde_json::from_str(body).expect("malformed level document")
    }

    pub fn to_json(&self) -> String {
        let mut body =
            serde_json::to_string_pretty(self).expect("level document always serializes");
        body.push('\n');
        body
    }
}

/// Read a level file. A missing file is the caller's problem (recoverable);
/// anything unparseable is fatal.
pub fn load_level(root: &Path, rel_path: &str) -> io::Result<Tilemap> {
    let body = fs::read_to_string(root.join(rel_path))?;
    let doc = LevelDoc::from_json(&body);
    Ok(tilemap_from_doc(rel_path, &doc))
}

fn parse_row(row: &str, width: i32, row_index: i32) -> Vec<TileKind> {
    let kinds: Vec<TileKind> = row
        .split(',')
        .map(|cell| {
            let code: u8 = cell
                .trim()
                .parse()
                .unwrap_or_else(|_| panic!("bad tile code {cell:?} in row {row_index}"));
            TileKind::from_code(code)
        })
        .collect();
    assert!(
        kinds.len() == width as usize,
        "row {row_index} has {} cells, expected {width}",
        kinds.len()
    );
    kinds
}

/// Build a board from its serialized form.
pub fn tilemap_from_doc(path: &str, doc: &LevelDoc) -> Tilemap {
    assert!(doc.width > 0 && doc.height > 0, "degenerate level {path}");
    assert!(
        doc.tiles.len() == doc.height as usize,
        "level {path} has {} rows, expected {}",
        doc.tiles.len(),
        doc.height
    );

    let mut map = Tilemap::empty(path, doc.width, doc.height);

    for (y, row) in doc.tiles.iter().enumerate() {
        for (x, kind) in parse_row(row, doc.width, y as i32).into_iter().enumerate() {
            let p = Vec2i::new(x as i32, y as i32);
            if kind == TileKind::Air {
                map.set(p, Tile::AIR);
            } else {
                let identity = map.fresh_tile_identity();
                map.set(p, Tile::new(kind, identity));
            }
        }
    }

    for layer_rows in &doc.background {
        assert!(
            layer_rows.len() == doc.height as usize,
            "background layer in {path} has wrong height"
        );
        let mut layer = Grid2d::new(doc.width, doc.height, Tile::AIR);
        for (y, row) in layer_rows.iter().enumerate() {
            for (x, kind) in parse_row(row, doc.width, y as i32).into_iter().enumerate() {
                let p = Vec2i::new(x as i32, y as i32);
                if kind != TileKind::Air {
                    let identity = map.fresh_tile_identity();
                    *layer.get_mut(p) = Tile::new(kind, identity);
                }
            }
        }
        map.push_background_layer(layer);
    }

    let mut loot_tiles_found = 0;
    for y in 0..map.dimensions.y {
        for x in 0..map.dimensions.x {
            let p = Vec2i::new(x, y);
            match map.get(p).kind {
                TileKind::PlayerSpawn => {
                    map.player_position = p;
                    map.set(p, Tile::AIR);
                }
                TileKind::Loot => loot_tiles_found += 1,
                _ => {}
            }
        }
    }
    map.max_loot = loot_tiles_found;

    fixup_segments(&mut map);

    map.title = doc.title.clone().unwrap_or_else(|| path.to_string());
    map.prompt = doc.prompt.clone();

    for (key, value) in &doc.properties {
        apply_property(&mut map, key, value);
    }

    map
}

fn apply_property(map: &mut Tilemap, key: &str, value: &PropValue) {
    match key {
        "maxLoot" => map.max_loot = value.as_int(key) as u32,
        "maxDiamonds" => map.max_diamonds = value.as_int(key) as u32,
        "currentLoot" => map.current_loot = value.as_int(key) as u32,
        "currentDiamonds" => map.current_diamonds = value.as_int(key) as u32,
        "currentBombs" => map.current_bombs = value.as_int(key) as u32,
        "currentMegadrills" => map.current_megadrills = value.as_int(key) as u32,
        "win" => map.win = value.as_bool(key),
        "dead" => map.dead = value.as_bool(key),
        "playerX" => map.player_position.x = value.as_int(key) as i32,
        "playerY" => map.player_position.y = value.as_int(key) as i32,
        "nextBombId" => map.next_bomb_id = value.as_int(key) as u32,
        "title" => map.title = value.as_str(key).to_string(),
        "prompt" => map.prompt = Some(value.as_str(key).to_string()),
        // Carried through for fixtures and saved games; the simulation
        // ignores them.
        "originalPath" | "moves" | "solution" => {}
        _ if key.starts_with("tile_") => apply_tile_property(map, key, value),
        _ => panic!("unknown level property {key:?}"),
    }
}

fn apply_tile_property(map: &mut Tilemap, key: &str, value: &PropValue) {
    let parts: Vec<&str> = key.split('_').collect();
    assert!(parts.len() == 4, "malformed tile property {key:?}");
    let x: i32 = parts[2].parse().unwrap_or_else(|_| panic!("bad x in {key:?}"));
    let y: i32 = parts[3].parse().unwrap_or_else(|_| panic!("bad y in {key:?}"));
    let p = Vec2i::new(x, y);
    assert!(map.is_point_valid(p), "tile property {key:?} out of bounds");

    match parts[1] {
        "segmentId" => {
            let segment_id = value.as_int(key) as u32;
            map.get_mut(p).segment_id = segment_id;
            if segment_id < DIRT_SEGMENT_IDS_START && segment_id + 1 > map.next_segment_id {
                map.next_segment_id = segment_id + 1;
            }
        }
        "bombId" => map.get_mut(p).bomb_id = value.as_int(key) as u32,
        "overrideRenderId" => map.get_mut(p).override_render_id = value.as_int(key) as u32,
        _ => panic!("unknown tile property {key:?}"),
    }
}

/// Post-load segment bookkeeping: dirt shares the canonical dirt id, every
/// rock chunk gets its own id so touching chunks never merge, diamond chunks
/// are counted, and loot never joins anything.
pub(crate) fn fixup_segments(map: &mut Tilemap) {
    let segments = calculate_segments(map);
    for segment in &segments {
        match segment.kind {
            TileKind::Dirt => {
                for &p in segment.points() {
                    map.get_mut(p).segment_id = DIRT_SEGMENT_IDS_START;
                }
            }
            TileKind::Rock => {
                let fresh = map.fresh_segment_id();
                for &p in segment.points() {
                    map.get_mut(p).segment_id = fresh;
                }
            }
            TileKind::Diamond => map.max_diamonds += 1,
            _ => {}
        }
    }

    for y in 0..map.dimensions.y {
        for x in 0..map.dimensions.x {
            let p = Vec2i::new(x, y);
            if map.get(p).kind == TileKind::Loot {
                let fresh = map.fresh_segment_id();
                map.get_mut(p).segment_id = fresh;
            }
        }
    }
}

/// Serialize a board. `extra` lets callers attach bookkeeping properties
/// (fixtures store `originalPath` and `moves` this way). Loading the result
/// reproduces the exact same board.
pub fn doc_from_tilemap(map: &Tilemap, extra: BTreeMap<String, PropValue>) -> LevelDoc {
    let mut properties = extra;

    properties.insert("maxLoot".into(), PropValue::Int(map.max_loot as i64));
    properties.insert("maxDiamonds".into(), PropValue::Int(map.max_diamonds as i64));
    properties.insert("currentLoot".into(), PropValue::Int(map.current_loot as i64));
    properties.insert(
        "currentDiamonds".into(),
        PropValue::Int(map.current_diamonds as i64),
    );
    properties.insert("currentBombs".into(), PropValue::Int(map.current_bombs as i64));
    properties.insert(
        "currentMegadrills".into(),
        PropValue::Int(map.current_megadrills as i64),
    );
    properties.insert("win".into(), PropValue::Bool(map.win));
    properties.insert("dead".into(), PropValue::Bool(map.dead));
    properties.insert("playerX".into(), PropValue::Int(map.player_position.x as i64));
    properties.insert("playerY".into(), PropValue::Int(map.player_position.y as i64));
    properties.insert("originalPath".into(), PropValue::Str(map.path.clone()));
    properties.insert("nextBombId".into(), PropValue::Int(map.next_bomb_id as i64));

    let mut tiles: Vec<String> = Vec::with_capacity(map.dimensions.y as usize);
    for y in 0..map.dimensions.y {
        let mut row = String::new();
        for x in 0..map.dimensions.x {
            let p = Vec2i::new(x, y);
            let tile = map.get(p);

            properties.insert(
                format!("tile_segmentId_{x}_{y}"),
                PropValue::Int(tile.segment_id as i64),
            );
            if tile.bomb_id != 0 {
                properties.insert(
                    format!("tile_bombId_{x}_{y}"),
                    PropValue::Int(tile.bomb_id as i64),
                );
            }
            if tile.override_render_id != 0 {
                properties.insert(
                    format!("tile_overrideRenderId_{x}_{y}"),
                    PropValue::Int(tile.override_render_id as i64),
                );
            }

            if x > 0 {
                row.push(',');
            }
            row.push_str(&tile.kind.code().to_string());
        }
        tiles.push(row);
    }

    LevelDoc {
        title: Some(map.title.clone()),
        prompt: map.prompt.clone(),
        solution: None,
        width: map.dimensions.x,
        height: map.dimensions.y,
        tiles,
        background: Vec::new(),
        properties,
    }
}

/// Canonicalize the replay-irrelevant parts of a board so two replay-equal
/// boards serialize identically: segment ids become the segment's discovery
/// index, identities are reassigned in scan order.
pub fn normalize_tilemap(map: &mut Tilemap) {
    let segments = calculate_segments(map);
    for (index, segment) in segments.iter().enumerate() {
        for &p in segment.points() {
            map.get_mut(p).segment_id = index as u32;
        }
    }

    map.next_tile_identity = 1;
    for y in 0..map.dimensions.y {
        for x in 0..map.dimensions.x {
            let p = Vec2i::new(x, y);
            if map.get(p).kind != TileKind::Air {
                let identity = map.fresh_tile_identity();
                map.get_mut(p).identity = identity;
            } else {
                map.get_mut(p).identity = 0;
            }
        }
    }
}

const ASCII_KINDS: &[(char, TileKind)] = &[
    ('.', TileKind::Air),
    ('d', TileKind::Dirt),
    ('#', TileKind::Rock),
    ('=', TileKind::Bedrock),
    ('$', TileKind::Loot),
    ('o', TileKind::Diamond),
    ('b', TileKind::BombItem),
    ('m', TileKind::MegadrillItem),
    ('E', TileKind::LevelEnd),
    ('*', TileKind::Bomb),
    ('M', TileKind::Megadrill),
    ('P', TileKind::PlayerSpawn),
    ('+', TileKind::Placeholder),
];

/// Compact board construction for tests and tools. One char per cell,
/// `P` marks the player spawn.
pub fn tilemap_from_ascii(path: &str, rows: &[&str]) -> Tilemap {
    assert!(!rows.is_empty(), "ascii board needs rows");
    let width = rows[0].chars().count() as i32;

    let tiles = rows
        .iter()
        .enumerate()
        .map(|(y, row)| {
            assert!(
                row.chars().count() as i32 == width,
                "ascii row {y} has the wrong width"
            );
            row.chars()
                .map(|c| {
                    let kind = ASCII_KINDS
                        .iter()
                        .find(|(ch, _)| *ch == c)
                        .unwrap_or_else(|| panic!("unknown ascii tile {c:?}"))
                        .1;
                    kind.code().to_string()
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();

    let doc = LevelDoc {
        title: None,
        prompt: None,
        solution: None,
        width,
        height: rows.len() as i32,
        tiles,
        background: Vec::new(),
        properties: BTreeMap::new(),
    };
    tilemap_from_doc(path, &doc)
}

/// Inverse of [`tilemap_from_ascii`] for dumps; the player cell is drawn as
/// `P` when it is air.
pub fn tilemap_to_ascii(map: &Tilemap) -> String {
    let mut out = String::new();
    for y in 0..map.dimensions.y {
        for x in 0..map.dimensions.x {
            let p = Vec2i::new(x, y);
            if p == map.player_position && map.get(p).kind == TileKind::Air {
                out.push('P');
                continue;
            }
            let kind = map.get(p).kind;
            let ch = ASCII_KINDS
                .iter()
                .find(|(_, k)| *k == kind)
                .map(|(ch, _)| *ch)
                .expect("every kind has an ascii char");
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

/// One named group of levels from the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSection {
    pub name: String,
    pub levels: Vec<String>,
}

/// A loaded level plus its stored solution.
#[derive(Debug, Clone)]
pub struct LevelEntry {
    pub path: String,
    pub tilemap: Tilemap,
    pub solution: Option<String>,
}

/// The shipped level set: ordered sections of levels, loaded from
/// `levels/levels.json` under a root directory.
#[derive(Debug)]
pub struct LevelCatalog {
    pub sections: Vec<(String, Vec<LevelEntry>)>,
}

impl LevelCatalog {
    pub fn load(root: &Path) -> io::Result<LevelCatalog> {
        let manifest = fs::read_to_string(root.join("levels/levels.json"))?;
        let sections: Vec<CatalogSection> =
            serde_json::from_str(&manifest).expect("malformed level manifest");

        let mut loaded = Vec::with_capacity(sections.len());
        for section in sections {
            let mut entries = Vec::with_capacity(section.levels.len());
            for rel_path in section.levels {
                let body = fs::read_to_string(root.join(&rel_path))?;
                let doc = LevelDoc::from_json(&body);
                entries.push(LevelEntry {
                    tilemap: tilemap_from_doc(&rel_path, &doc),
                    solution: doc.solution.clone(),
                    path: rel_path,
                });
            }
            loaded.push((section.name, entries));
        }

        Ok(LevelCatalog { sections: loaded })
    }

    pub fn all_levels(&self) -> impl Iterator<Item = &LevelEntry> {
        self.sections.iter().flat_map(|(_, entries)| entries.iter())
    }
}
