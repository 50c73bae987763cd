/// Simulate: interactive shell for stepping a relationship engine by hand.
///
/// Usage: simulate [--config <path>] [--load <world.ron>] [--seed <n>]
///
/// Commands:
///   signal <id> <emote>     player emotes at an entity (heart, happy, wave, question, or a number)
///   attack <id>             player hurts an entity
///   talk <id>               press the chat button
///   special <id> [ring]     press the second button (propose / cook); `ring` hands over the item
///   station <id> on|off     place or remove a cooking station near an entity
///   tick [n]                advance the world n ticks (default 1)
///   status [id]             show one or all entities
///   sync                    print pending sync payloads
///   save <path>             write the world to a RON file
///   reset                   forget all world state
///   help                    list commands
///   quit                    exit
///
/// Set RUST_LOG=debug to see ignored events.

use companion_bond::core::codec::PersistenceCodec;
use companion_bond::core::config::BondConfig;
use companion_bond::core::driver::TickDriver;
use companion_bond::core::engine::RelationshipEngine;
use companion_bond::schema::entity::{EntityId, SignalCode};
use companion_bond::schema::event::{Choice, Notification};
use companion_bond::schema::relationship::BondState;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut load_path = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--load" if i + 1 < args.len() => {
                i += 1;
                load_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => match BondConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => BondConfig::default(),
    };

    let mut engine = match RelationshipEngine::builder().config(config).seed(seed).build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(ref path) = load_path {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let report = PersistenceCodec::load_world(&mut engine, &contents);
                println!(
                    "Loaded {} records, {} jobs ({} fields defaulted, {} entries skipped)",
                    report.records, report.jobs, report.defaulted_fields, report.skipped_entries
                );
            }
            Err(e) => {
                eprintln!("ERROR: Failed to read {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }

    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let stations: RefCell<FxHashSet<EntityId>> = RefCell::new(FxHashSet::default());
    let probe = |id: EntityId| stations.borrow().contains(&id);
    let mut driver = TickDriver::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("simulate> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();
        let id = parts.get(1).and_then(|s| s.parse().ok()).map(EntityId);

        match (cmd.as_str(), id) {
            ("quit" | "exit" | "q", _) => {
                println!("Goodbye.");
                break;
            }
            ("help" | "h" | "?", _) => print_help(),
            ("signal", Some(id)) => match parts.get(2).and_then(|s| SignalCode::parse(s)) {
                Some(code) => println!("{:?}", engine.on_signal(id, code)),
                None => println!("Usage: signal <id> <heart|happy|wave|question|number>"),
            },
            ("attack", Some(id)) => {
                if engine.on_attacked(id) {
                    println!("Signal progress lost.");
                } else {
                    println!("No effect.");
                }
            }
            ("talk", Some(id)) => println!("{:?}", engine.on_choice(id, Choice::Talk, false)),
            ("special", Some(id)) => {
                let mut rings = u32::from(parts.get(2) == Some(&"ring"));
                let mut inventory = |_: EntityId| {
                    let had = rings > 0;
                    rings = rings.saturating_sub(1);
                    had
                };
                match engine.state(id) {
                    BondState::Befriended => {
                        println!("{:?}", engine.propose(id, &mut inventory))
                    }
                    _ => println!("{:?}", engine.on_choice(id, Choice::Special, false)),
                }
            }
            ("station", Some(id)) => match parts.get(2).copied() {
                Some("on") => {
                    stations.borrow_mut().insert(id);
                    println!("Station placed; it is noticed on the next capability check.");
                }
                Some("off") => {
                    stations.borrow_mut().remove(&id);
                    println!("Station removed.");
                }
                _ => println!("Usage: station <id> on|off"),
            },
            ("tick", _) => {
                let steps = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
                for note in driver.run(&mut engine, &probe, steps) {
                    print_notification(&note);
                }
                println!("Tick {}", driver.current_tick());
            }
            ("status", Some(id)) => print_status(&engine, id),
            ("status", None) => {
                for id in engine.entities() {
                    print_status(&engine, id);
                }
            }
            ("sync", _) => {
                for payload in engine.pending_sync() {
                    match PersistenceCodec::encode_sync(&payload) {
                        Ok(json) => println!("  {}", json),
                        Err(e) => println!("ERROR: {}", e),
                    }
                }
            }
            ("save", _) => match parts.get(1) {
                Some(path) => match PersistenceCodec::encode_world(&engine) {
                    Ok(contents) => match std::fs::write(path, contents) {
                        Ok(()) => println!("Saved to {}", path),
                        Err(e) => println!("ERROR: {}", e),
                    },
                    Err(e) => println!("ERROR: {}", e),
                },
                None => println!("Usage: save <path>"),
            },
            ("reset", _) => {
                engine.reset();
                println!("World state cleared.");
            }
            _ => println!("Unknown command or missing entity id. Type 'help'."),
        }

        for note in engine.take_notifications() {
            print_notification(&note);
        }
    }
}

fn print_notification(note: &Notification) {
    println!("  [#{}] {:?}", note.entity().0, note);
}

fn print_status(engine: &RelationshipEngine, id: EntityId) {
    println!(
        "  #{}: {:?} ({:?}), affection {}, can cook: {}, cooking: {}",
        id.0,
        engine.state(id),
        engine.disposition(id),
        engine.affection(id),
        engine.can_produce(id),
        if engine.is_cooking(id) {
            format!("{}s left", engine.remaining_cook_seconds(id))
        } else {
            "no".to_string()
        }
    );
    if let Some(record) = engine.record(id) {
        if !record.recent_signals.is_empty() {
            let recent: Vec<String> = record
                .recent_signals
                .iter()
                .map(|code| code.label().map_or_else(|| code.0.to_string(), str::to_string))
                .collect();
            println!("      recent signals: {}", recent.join(", "));
        }
    }
}

fn print_usage() {
    println!("Usage: simulate [--config <path>] [--load <world.ron>] [--seed <n>]");
}

fn print_help() {
    println!("Commands:");
    println!("  signal <id> <emote>     player emotes at an entity");
    println!("  attack <id>             player hurts an entity");
    println!("  talk <id>               press the chat button");
    println!("  special <id> [ring]     propose / cook; `ring` hands over the item");
    println!("  station <id> on|off     place or remove a cooking station");
    println!("  tick [n]                advance the world n ticks");
    println!("  status [id]             show one or all entities");
    println!("  sync                    print pending sync payloads");
    println!("  save <path>             write the world to a RON file");
    println!("  reset                   forget all world state");
    println!("  quit                    exit");
}
