use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use notify::{RecursiveMode, Watcher};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::{Duration, Instant},
};

use evdev::{AbsoluteAxisCode, EventType, SynchronizationCode};

use crate::config::DeckConfigState;
use crate::deck::{DeckCommand, DeckController, DeckListener};
use crate::input;
use crate::swipe::{SwipeDirection, TouchSample};
use crate::tracker::{TouchEvent, Tracker};

/// Logs everything the deck emits.
#[derive(Debug, Default)]
pub struct LogListener;

impl DeckListener for LogListener {
    fn on_command(&mut self, command: &DeckCommand) {
        info!("[deck] {command:?}");
    }

    fn on_swipe(&mut self, direction: SwipeDirection, sample: &TouchSample) {
        info!(
            "[gesture] {} dx={:.0} dy={:.0} vx={:.2} vy={:.2}",
            direction.as_str(),
            sample.dx,
            sample.dy,
            sample.vx,
            sample.vy
        );
    }
}

pub fn drive<L: DeckListener>(deck: &mut DeckController<L>, event: TouchEvent) {
    match event {
        TouchEvent::Start => deck.on_gesture_start(),
        TouchEvent::Move(sample) => {
            deck.on_gesture_sample(sample);
        }
        TouchEvent::End(sample) => {
            deck.on_gesture_end(sample);
        }
    }
}

fn install_signal_flag() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let flag = stop.clone();
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("live: caught signal {sig}, stopping");
            flag.store(true, Ordering::SeqCst);
        }
    });
    Ok(stop)
}

pub fn run_live(mut cfg: DeckConfigState, device: Option<&str>) -> Result<()> {
    let mut devs = input::open_devices(device);
    if devs.is_empty() {
        return Err(anyhow!("no usable multitouch device found"));
    }
    for (info, _) in &devs {
        info!("live: reading {} ({})", info.name, info.path);
    }

    let stop = install_signal_flag()?;

    // profile hot-reload
    let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&cfg.profiles_dir, RecursiveMode::NonRecursive)?;
    let profile_path = cfg.active_profile_path();

    let input_cfg = cfg.profile.input.clone();
    let mut tracker = Tracker::new(cfg.profile.viewport, input_cfg.smooth_ema);
    tracker.set_norm_ranges(0, input_cfg.raw_x_max, 0, input_cfg.raw_y_max);
    tracker.set_slop(input_cfg.slop_px);
    debug!("live: moves held back until {}px of travel", input_cfg.slop_px);
    let mut deck = DeckController::new(cfg.profile.deck_settings()?, LogListener);
    info!("live: profile '{}' active", cfg.active_name);

    let mut last_tick = Instant::now();
    while !stop.load(Ordering::SeqCst) {
        let mut reload = false;
        while let Ok(res) = rx.try_recv() {
            match res {
                Ok(ev) if ev.kind.is_modify() || ev.kind.is_create() => {
                    reload |= ev
                        .paths
                        .iter()
                        .any(|p| p.file_name() == profile_path.file_name());
                }
                Ok(_) => {}
                Err(e) => warn!("live: watch error: {e}"),
            }
        }
        if reload {
            match cfg.reload().and_then(|_| cfg.profile.deck_settings()) {
                Ok(settings) => {
                    deck.apply_settings(settings);
                    let input_cfg = &cfg.profile.input;
                    tracker.set_viewport(cfg.profile.viewport, input_cfg.smooth_ema);
                    tracker.set_norm_ranges(0, input_cfg.raw_x_max, 0, input_cfg.raw_y_max);
                    tracker.set_slop(input_cfg.slop_px);
                    info!("live: profile reloaded");
                }
                Err(e) => error!("live: reload failed, keeping last good profile: {e}"),
            }
        }

        let mut any_event = false;
        for (_, dev) in devs.iter_mut() {
            let Ok(events) = dev.fetch_events() else {
                continue;
            };
            for ev in events {
                any_event = true;
                if ev.event_type() == EventType::ABSOLUTE {
                    match ev.code() {
                        c if c == AbsoluteAxisCode::ABS_MT_SLOT.0 => tracker.on_slot(ev.value()),
                        c if c == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => {
                            tracker.on_tracking_id(ev.value())
                        }
                        c if c == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => {
                            tracker.on_pos_x(ev.value())
                        }
                        c if c == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => {
                            tracker.on_pos_y(ev.value())
                        }
                        _ => {}
                    }
                } else if ev.event_type() == EventType::SYNCHRONIZATION
                    && ev.code() == SynchronizationCode::SYN_REPORT.0
                {
                    if let Some(touch) = tracker.on_syn_report() {
                        drive(&mut deck, touch);
                    }
                }
            }
        }

        let now = Instant::now();
        deck.advance(now - last_tick);
        last_tick = now;

        if !any_event {
            thread::sleep(Duration::from_millis(4));
        }
    }

    info!("live: stopped on card {}", deck.focused_index());
    Ok(())
}
