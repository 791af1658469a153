use evdev::{AbsoluteAxisCode, Device, EventType};
use log::{debug, warn};

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
}

fn is_multitouch(dev: &Device) -> bool {
    let has_abs = dev.supported_events().contains(EventType::ABSOLUTE);
    let has_mt = dev.supported_absolute_axes().is_some_and(|a| {
        a.contains(AbsoluteAxisCode::ABS_MT_SLOT)
            && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_X)
            && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_Y)
    });
    has_abs && has_mt
}

pub fn discover_multitouch() -> Vec<DeviceInfo> {
    let mut out = vec![];
    let Ok(rd) = std::fs::read_dir("/dev/input") else {
        warn!("cannot read /dev/input");
        return out;
    };
    for e in rd.flatten() {
        let p = e.path();
        let is_event_node = p
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.starts_with("event"));
        if !is_event_node {
            continue;
        }
        match Device::open(&p) {
            Ok(dev) if is_multitouch(&dev) => out.push(DeviceInfo {
                path: p.display().to_string(),
                name: dev.name().unwrap_or("unknown").to_string(),
            }),
            Ok(_) => {}
            Err(e) => debug!("skipping {}: {e}", p.display()),
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

/// Opens the given device, or every detected multitouch device, in
/// non-blocking mode.
pub fn open_devices(path: Option<&str>) -> Vec<(DeviceInfo, Device)> {
    let infos = match path {
        Some(p) => vec![DeviceInfo {
            path: p.to_string(),
            name: String::new(),
        }],
        None => discover_multitouch(),
    };

    let mut devs = vec![];
    for info in infos {
        match Device::open(&info.path) {
            Ok(mut dev) => {
                if let Err(e) = dev.set_nonblocking(true) {
                    warn!("{}: cannot switch to non-blocking: {e}", info.path);
                    continue;
                }
                let name = dev.name().unwrap_or("unknown").to_string();
                devs.push((DeviceInfo { name, ..info }, dev));
            }
            Err(e) => warn!("failed to open {}: {e}", info.path),
        }
    }
    devs
}
