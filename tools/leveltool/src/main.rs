use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use engine::{EngineConfig, EvaluationEngine};
use game::action::actions_from_string;
use game::level::{
    LevelCatalog, LevelDoc, doc_from_tilemap, load_level, tilemap_from_doc, tilemap_to_ascii,
};
use game::{BurrowLogic, GameAction};

#[derive(Debug, Parser)]
#[command(name = "leveltool")]
#[command(about = "Level checks for the Burrow simulation: round-trips, solutions, dumps")]
struct Cli {
    /// Directory containing levels/levels.json. Defaults to the game crate.
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load every catalog level, re-save it, reload it, and compare.
    Validate,
    /// Run every stored solution and report the outcome.
    Solve,
    /// Print a level as ascii.
    Show { level: String },
    /// Rewrite a level file in canonical serialized form.
    Normalize { level: String },
}

fn default_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../game")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let root = cli.root.unwrap_or_else(default_root);

    match cli.command {
        Commands::Validate => validate(&root),
        Commands::Solve => solve(&root),
        Commands::Show { level } => show(&root, &level),
        Commands::Normalize { level } => normalize(&root, &level),
    }
}

fn validate(root: &Path) -> Result<()> {
    let catalog = LevelCatalog::load(root).context("loading level catalog")?;

    let mut failures = 0;
    for entry in catalog.all_levels() {
        let doc = doc_from_tilemap(&entry.tilemap, BTreeMap::new());
        let reloaded = tilemap_from_doc(&entry.path, &doc);
        if reloaded == entry.tilemap {
            println!("{}: round-trip ok", entry.path);
        } else {
            println!("{}: ROUND-TRIP MISMATCH", entry.path);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} level(s) failed the round-trip check");
    }
    Ok(())
}

fn solve(root: &Path) -> Result<()> {
    let catalog = LevelCatalog::load(root).context("loading level catalog")?;
    let engine: EvaluationEngine<BurrowLogic> =
        EvaluationEngine::new(EngineConfig { log_timings: false });
    let logic = BurrowLogic;

    let mut failures = 0;
    for entry in catalog.all_levels() {
        let Some(solution) = &entry.solution else {
            println!("{}: NO SOLUTION STORED", entry.path);
            failures += 1;
            continue;
        };

        let moves: Vec<GameAction> = actions_from_string(solution);
        let Some(result) = engine.evaluate(&logic, &entry.tilemap, &moves) else {
            println!("{}: solution {solution:?} hit an illegal move", entry.path);
            failures += 1;
            continue;
        };

        let last = result.last();
        if last.win {
            println!("{}: solved in {} moves", entry.path, moves.len());
        } else if last.dead {
            println!("{}: solution {solution:?} DIES", entry.path);
            failures += 1;
        } else {
            println!("{}: solution {solution:?} does not win", entry.path);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} level(s) failed the solution check");
    }
    Ok(())
}

fn show(root: &Path, level: &str) -> Result<()> {
    let map = load_level(root, level).with_context(|| format!("loading {level}"))?;
    println!("{} ({}x{})", map.title, map.dimensions.x, map.dimensions.y);
    print!("{}", tilemap_to_ascii(&map));
    println!(
        "player ({}, {})  loot {}/{}  diamonds {}/{}  bombs {}  megadrills {}",
        map.player_position.x,
        map.player_position.y,
        map.current_loot,
        map.max_loot,
        map.current_diamonds,
        map.max_diamonds,
        map.current_bombs,
        map.current_megadrills,
    );
    Ok(())
}

fn normalize(root: &Path, level: &str) -> Result<()> {
    let full_path = root.join(level);
    let body = fs::read_to_string(&full_path).with_context(|| format!("reading {level}"))?;
    let doc = LevelDoc::from_json(&body);
    let canonical = doc.to_json();
    if canonical == body {
        println!("{level}: already canonical");
    } else {
        fs::write(&full_path, canonical).with_context(|| format!("writing {level}"))?;
        println!("{level}: rewritten");
    }
    Ok(())
}
