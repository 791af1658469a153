use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, fs, io::BufReader};

use storydeck::config::{DeckConfigState, Profile};
use storydeck::gestures::Ownership;
use storydeck::swipe::{TouchSample, classify};
use storydeck::transform::TransformDeriver;
use storydeck::{live, trace};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let profile_file: Option<String> = pargs.opt_value_from_str("--profile")?;

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("classify") => {
            let touches: usize = pargs.opt_value_from_str("--touches")?.unwrap_or(1);
            let dx: f32 = pargs.opt_value_from_str("--dx")?.unwrap_or(0.0);
            let dy: f32 = pargs.opt_value_from_str("--dy")?.unwrap_or(0.0);
            let vx: f32 = pargs.opt_value_from_str("--vx")?.unwrap_or(0.0);
            let vy: f32 = pargs.opt_value_from_str("--vy")?.unwrap_or(0.0);
            let profile = load_profile(profile_file.as_deref())?;
            let sample = TouchSample::new(touches, dx, dy, vx, vy);
            let direction = classify(&sample, &profile.swipe);
            print_response(&serde_json::json!({
                "sample": sample,
                "config": profile.swipe,
                "direction": direction,
            }));
            Ok(())
        }

        Some("capture") => {
            let touches: usize = pargs.opt_value_from_str("--touches")?.unwrap_or(1);
            let dy: f32 = pargs
                .value_from_str("--dy")
                .map_err(|_| anyhow!("usage: storydeck capture --dy <px> [--touches N]"))?;
            let profile = load_profile(profile_file.as_deref())?;
            let captured = profile.capture.should_capture(touches, dy);
            let owner = if captured {
                Ownership::SelfOwned
            } else {
                Ownership::AncestorOwned
            };
            print_response(&serde_json::json!({
                "capture": captured,
                "ownership": owner,
                "assume_horizontal": !captured,
            }));
            Ok(())
        }

        Some("transform") => {
            let dismiss: f32 = pargs.opt_value_from_str("--dismiss")?.unwrap_or(0.0);
            let vertical = pargs.contains("--vertical");
            let usage = "usage: storydeck transform <index> <offset> [--dismiss P] [--vertical]";
            let index: usize = pargs.free_from_str().map_err(|_| anyhow!(usage))?;
            let offset: f32 = pargs.free_from_str().map_err(|_| anyhow!(usage))?;
            let profile = load_profile(profile_file.as_deref())?;
            let deriver = TransformDeriver::new(profile.viewport, profile.transform);
            let transform = deriver.derive(index, offset, dismiss, !vertical);
            print_response(&serde_json::json!({
                "index": index,
                "offset": offset,
                "transform": transform,
                "opacity": deriver.overlay_opacity(index, offset),
            }));
            Ok(())
        }

        Some("replay") => {
            let path: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: storydeck replay <trace.jsonl>"))?;
            let profile = load_profile(profile_file.as_deref())?;
            let file = fs::File::open(&path).map_err(|e| anyhow!("failed to open {path}: {e}"))?;
            let records = trace::replay(BufReader::new(file), profile.deck_settings()?)?;
            for r in &records {
                println!("{}", serde_json::to_string(r)?);
            }
            Ok(())
        }

        Some("live") => {
            let device: Option<String> = pargs.opt_value_from_str("--device")?;
            let cfg = DeckConfigState::load_or_install_default()?;
            live::run_live(cfg, device.as_deref())
        }

        Some("list") => {
            let cfg = DeckConfigState::load_or_install_default()?;
            for name in cfg.list_profiles() {
                let mark = if name == cfg.active_name { "*" } else { " " };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: storydeck use <profile_name>"))?;
            let mut cfg = DeckConfigState::load_or_install_default()?;
            cfg.set_active(&name)?;
            println!("active profile: {}", cfg.active_name);
            Ok(())
        }

        Some("show") => {
            let profile = load_profile(profile_file.as_deref())?;
            let settings = profile.deck_settings()?;
            print_response(&serde_json::json!({
                "name": profile.meta.name,
                "swipe": profile.swipe,
                "capture": profile.capture,
                "viewport": profile.viewport,
                "transform": profile.transform,
                "item_count": settings.item_count,
                "autoplay": settings.autoplay,
                "scroll_duration_ms": settings.scroll_duration.as_millis() as u64,
                "bindings": {
                    "left": settings.bindings.left,
                    "right": settings.bindings.right,
                    "up": settings.bindings.up,
                    "down": settings.bindings.down,
                },
            }));
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

/// `--profile <file>` wins over the active profile.
fn load_profile(file: Option<&str>) -> Result<Profile> {
    match file {
        Some(path) => {
            let txt =
                fs::read_to_string(path).map_err(|e| anyhow!("failed to read {path}: {e}"))?;
            Profile::parse(&txt).map_err(|e| anyhow!("failed to parse {path}: {e}"))
        }
        None => Ok(DeckConfigState::load_or_install_default()?.profile),
    }
}

fn print_help() {
    println!(
        r#"storydeck: story deck gesture and transform core

USAGE:
  storydeck help [command]                          Show general or command-specific help
  storydeck classify --dx X --dy Y --vx VX --vy VY  Classify a release sample
  storydeck capture --dy Y [--touches N]            Evaluate the capture rule
  storydeck transform <index> <offset> [--dismiss P] [--vertical]
                                                    Derive one card's transform
  storydeck replay <trace.jsonl>                    Replay a gesture trace
  storydeck live [--device PATH]                    Drive a deck from a touchscreen
  storydeck list                                    List profiles
  storydeck use <name>                              Switch active profile
  storydeck show                                    Show the effective profile

OPTIONS:
  --profile FILE    Use FILE instead of the active profile

TIPS:
  - Profiles: ~/.config/storydeck/profiles
  - Active profile pointer: ~/.config/storydeck/active
  - RUST_LOG=debug shows arbitration decisions
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "classify" => println!(
            "usage: storydeck classify --dx X --dy Y --vx VX --vy VY [--touches N]\nPrints left/right/up/down, or none for a tap."
        ),
        "capture" => println!(
            "usage: storydeck capture --dy Y [--touches N]\nShows whether the deck or the paging scroller owns the gesture."
        ),
        "transform" => println!(
            "usage: storydeck transform <index> <offset> [--dismiss P] [--vertical]\nPrints the ordered transform list and overlay opacity."
        ),
        "replay" => println!(
            "usage: storydeck replay <trace.jsonl>\nOne JSON event per line: start, move, release, terminate, scroll, settle, dismiss, focus, advance, frame."
        ),
        "live" => println!(
            "usage: storydeck live [--device PATH]\nReads multitouch input and logs deck commands until interrupted."
        ),
        "list" => println!("usage: storydeck list\nLists available profiles; marks active with '*'."),
        "use" => {
            println!("usage: storydeck use <name>\nSwitches active profile to <name>.")
        }
        "show" => println!("usage: storydeck show\nPrints the effective profile values."),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
