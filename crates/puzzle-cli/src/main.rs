mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use puzzle_core::{
    spawn_fetch, Direction, FetchCompletion, FetchOutcome, FileRemote, FileStore, GameSession,
    SaveStore,
};

use config::Config;

#[derive(Parser, Debug)]
struct Args {
    /// Path to configuration file (TOML); defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Spawn RNG seed; derived from the clock when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Override the local save file from the config
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Override the cloud save file from the config
    #[arg(long, value_name = "FILE")]
    cloud: Option<PathBuf>,
}

fn render(session: &GameSession) {
    let state = session.state();
    println!("{}", state.board);
    println!(
        "score {}  level {}  goal {}  time {}s  undos {}  manual 4s {}",
        state.score,
        state.level(),
        state.max_tile().max(2) * 2,
        state.seconds,
        state.undos_used,
        state.manual_fours_used,
    );
    if session.is_over() {
        println!("no moves left -- game over (undo, force, or new)");
    }
}

fn parse_direction(word: &str) -> Option<Direction> {
    match word {
        "left" | "l" => Some(Direction::Left),
        "right" | "r" => Some(Direction::Right),
        "up" | "u" => Some(Direction::Up),
        "down" | "d" => Some(Direction::Down),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => Config::from_toml(path)
            .map_err(|err| anyhow::anyhow!("loading config {}: {err}", path.display()))?,
        None => Config::default(),
    };
    if let Some(path) = args.save {
        cfg.save_path = path;
    }
    if let Some(path) = args.cloud {
        cfg.cloud_path = path;
    }
    let seed = args.seed.unwrap_or_else(|| {
        std::time::UNIX_EPOCH
            .elapsed()
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });

    let local = FileStore::new(&cfg.save_path);
    let remote = Arc::new(FileRemote::new(&cfg.cloud_path));
    let mut session = GameSession::with_spawner(seed, cfg.four_probability);

    // Resume the local save when one exists; a corrupt file reads as
    // absent and falls through to a fresh game.
    match local.load()? {
        Some(saved) => {
            info!("resuming local save (score {})", saved.score);
            session.apply_saved(&saved);
            session.start_timer();
        }
        None => session.new_game(),
    }

    println!("commands: left/right/up/down, undo, force, save, load, cloud, local, new, quit");
    render(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(cfg.tick_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let (done_tx, mut done_rx) = tokio::sync::mpsc::channel::<FetchCompletion>(4);
    let cancel_all = CancellationToken::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick();
            }
            Some(completion) = done_rx.recv() => {
                match session.complete_cloud_fetch(completion.token, completion.result) {
                    FetchOutcome::Conflict => {
                        let remote_save = session.pending_remote().expect("conflict just raised");
                        println!(
                            "cloud save v{} has score {} vs local {} -- type 'cloud' or 'local'",
                            remote_save.version,
                            remote_save.game.score,
                            session.state().score,
                        );
                    }
                    FetchOutcome::KeepLocal => println!("local save is ahead; keeping it"),
                    FetchOutcome::NoRemote => println!("no cloud save found"),
                    FetchOutcome::Failed(reason) => println!("cloud load failed: {reason}"),
                    FetchOutcome::Stale => {}
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = line.trim().to_ascii_lowercase();
                if command.is_empty() {
                    continue;
                }
                if session.is_conflict_pending()
                    && !matches!(command.as_str(), "cloud" | "local" | "quit" | "q")
                {
                    println!("resolve the cloud conflict first: 'cloud' or 'local'");
                    continue;
                }
                match command.as_str() {
                    "quit" | "q" => break,
                    "new" => {
                        session.new_game();
                        render(&session);
                    }
                    "undo" => {
                        if session.undo() {
                            render(&session);
                        } else {
                            println!("nothing to undo");
                        }
                    }
                    "force" => {
                        match session.force_tile() {
                            Some(tile) => {
                                println!("placed a 4 at ({}, {})", tile.row, tile.col);
                                render(&session);
                            }
                            None => println!("board is full"),
                        }
                    }
                    "save" => {
                        session.save_game(&local, remote.as_ref())?;
                        println!("saved to {}", cfg.save_path.display());
                    }
                    "load" => {
                        match session.begin_cloud_fetch() {
                            Some(token) => {
                                let (_handle, rx) =
                                    spawn_fetch(remote.clone(), token, cancel_all.child_token());
                                let tx = done_tx.clone();
                                tokio::spawn(async move {
                                    if let Ok(completion) = rx.await {
                                        let _ = tx.send(completion).await;
                                    }
                                });
                                println!("fetching cloud save...");
                            }
                            None => println!("a cloud load is already in progress"),
                        }
                    }
                    "cloud" | "local" => {
                        let use_cloud = command == "cloud";
                        if session.is_conflict_pending() {
                            if session.apply_version_choice(use_cloud) {
                                println!("cloud save applied");
                            } else {
                                println!("kept the local save");
                            }
                            render(&session);
                        } else {
                            println!("no cloud conflict to resolve");
                        }
                    }
                    word => match parse_direction(word) {
                        Some(dir) => {
                            let result = session.make_move(dir);
                            if result.changed {
                                render(&session);
                            } else {
                                println!("blocked");
                            }
                        }
                        None => println!("unknown command: {word}"),
                    },
                }
            }
        }
    }

    cancel_all.cancel();
    session.stop_timer();
    session.save_game(&local, remote.as_ref())?;
    info!("state saved to {}", cfg.save_path.display());
    Ok(())
}
