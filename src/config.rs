use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Deserializer};
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::deck::{Bindings, DeckSettings};
use crate::gestures::CaptureRule;
use crate::swipe::SwipeConfig;
use crate::transform::{Calibration, Viewport};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeckSection {
    pub item_count: usize,
    pub autoplay: bool,
    pub scroll_duration_ms: u64,
}

impl Default for DeckSection {
    fn default() -> Self {
        Self {
            item_count: 1,
            autoplay: true,
            scroll_duration_ms: 1000,
        }
    }
}

/// Raw touch device ranges and sample smoothing for live input.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub raw_x_max: i32,
    pub raw_y_max: i32,
    pub smooth_ema: f32,
    pub slop_px: f32,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            raw_x_max: 4096,
            raw_y_max: 4096,
            smooth_ema: 0.5,
            slop_px: 8.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub meta: Meta,
    pub swipe: SwipeConfig,
    pub capture: CaptureRule,
    pub viewport: Viewport,
    pub transform: Calibration,
    pub deck: DeckSection,
    pub input: InputSection,

    // Accept nested/dotted tables and flatten them into "a.b" -> "value"
    #[serde(deserialize_with = "deserialize_bindings_flat")]
    pub bindings: HashMap<String, String>,
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn bindings(&self) -> Result<Bindings> {
        Bindings::from_map(&self.bindings).map_err(|e| anyhow!(e))
    }

    pub fn deck_settings(&self) -> Result<DeckSettings> {
        Ok(DeckSettings {
            viewport: self.viewport,
            calibration: self.transform,
            swipe: self.swipe,
            capture: self.capture,
            item_count: self.deck.item_count,
            autoplay: self.deck.autoplay,
            scroll_duration: Duration::from_millis(self.deck.scroll_duration_ms),
            bindings: self.bindings()?,
        })
    }
}

// --------- bindings deserializer (tolerant) ----------
fn deserialize_bindings_flat<'de, D>(
    de: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = toml::Value::deserialize(de)?;
    let table = match val {
        toml::Value::Table(t) => t,
        other => {
            return Err(serde::de::Error::custom(format!(
                "bindings must be a table, got {:?}",
                other.type_str()
            )));
        }
    };

    let mut out = HashMap::new();
    flatten_table("", &table, &mut out).map_err(serde::de::Error::custom)?;
    Ok(out)
}

fn flatten_table(
    prefix: &str,
    table: &toml::Table,
    out: &mut HashMap<String, String>,
) -> std::result::Result<(), String> {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(sub) => {
                flatten_table(&key, sub, out)?;
            }
            other => {
                return Err(format!(
                    "binding '{}' value must be a string, got {}",
                    key,
                    other.type_str()
                ));
            }
        }
    }
    Ok(())
}
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeckConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot resolve home directory"))?;
    Ok(dirs.home_dir().join(".config").join("storydeck"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl DeckConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::load_from_dir(&config_dir()?)
    }

    /// Loads the active profile under `cfgdir`, installing the default
    /// profile and active pointer if they are missing.
    pub fn load_from_dir(cfgdir: &Path) -> Result<Self> {
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir.to_path_buf(),
            profiles_dir: profdir,
            active_ptr,
        })
    }

    /// Re-reads the active profile; the current one stays on error.
    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.profiles_dir, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn active_profile_path(&self) -> PathBuf {
        self.profiles_dir.join(format!("{}.toml", self.active_name))
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }
}

fn load_profile(profdir: &Path, name: &str) -> Result<Profile> {
    let path = profdir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::parse(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
}

fn validate_profile(p: &Profile) -> Result<()> {
    if !(p.swipe.velocity_threshold > 0.0 && p.swipe.directional_offset_threshold > 0.0) {
        return Err(anyhow!("swipe thresholds must be positive"));
    }
    if !(p.viewport.width > 0.0 && p.viewport.height > 0.0) {
        return Err(anyhow!("viewport width and height must be positive"));
    }

    let t = &p.transform;
    if !(t.compensation_divisor > 1.0) {
        return Err(anyhow!("transform.compensation_divisor must be greater than 1"));
    }
    if !(t.edge_epsilon > 0.0 && t.edge_epsilon < p.viewport.width / 2.0) {
        return Err(anyhow!(
            "transform.edge_epsilon must be in (0, viewport.width / 2)"
        ));
    }
    if !(0.0..=1.0).contains(&t.overlay_opacity) {
        return Err(anyhow!("transform.overlay_opacity must be in [0,1]"));
    }
    if !(t.dismiss_scale > 0.0) {
        return Err(anyhow!("transform.dismiss_scale must be positive"));
    }
    if !t.max_rotation_deg.is_finite() {
        return Err(anyhow!("transform.max_rotation_deg must be finite"));
    }

    if p.input.raw_x_max <= 0 || p.input.raw_y_max <= 0 {
        return Err(anyhow!("input ranges must be positive"));
    }
    if !(p.input.smooth_ema > 0.0 && p.input.smooth_ema <= 1.0) {
        return Err(anyhow!("input.smooth_ema must be in (0,1]"));
    }
    if !(p.input.slop_px >= 0.0 && p.input.slop_px.is_finite()) {
        return Err(anyhow!("input.slop_px must be >= 0"));
    }

    Bindings::from_map(&p.bindings).map_err(|e| anyhow!(e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::DeckAction;

    #[test]
    fn default_profile_parses_to_stock_values() {
        let p = Profile::parse(default_profile_text()).unwrap();
        assert_eq!(p.meta.name.as_deref(), Some("default"));
        assert_eq!(p.swipe, SwipeConfig::default());
        assert_eq!(p.capture, CaptureRule::default());
        assert_eq!(p.transform, Calibration::default());
        assert_eq!(p.bindings().unwrap(), Bindings::default());
        assert_eq!(p.input.slop_px, 8.0);
    }

    #[test]
    fn partial_swipe_override_keeps_other_default() {
        let p = Profile::parse("[swipe]\nvelocity_threshold = 0.5\n").unwrap();
        assert_eq!(p.swipe.velocity_threshold, 0.5);
        assert_eq!(p.swipe.directional_offset_threshold, 80.0);
        assert_eq!(p.viewport, Viewport::default());
    }

    #[test]
    fn empty_profile_is_all_defaults() {
        let p = Profile::parse("").unwrap();
        let s = p.deck_settings().unwrap();
        assert_eq!(s, DeckSettings::default());
    }

    #[test]
    fn dotted_and_nested_bindings_flatten() {
        let p = Profile::parse(
            r#"
[bindings]
swipe.left = "previous"
[bindings.swipe]
right = "next"
"#,
        )
        .unwrap();
        let b = p.bindings().unwrap();
        assert_eq!(b.left, DeckAction::Previous);
        assert_eq!(b.right, DeckAction::Next);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Profile::parse("[swipe]\nvelocity_threshold = 0.0\n").is_err());
        assert!(Profile::parse("[viewport]\nwidth = -1.0\n").is_err());
        assert!(Profile::parse("[transform]\ncompensation_divisor = 1.0\n").is_err());
        assert!(Profile::parse("[transform]\noverlay_opacity = 1.5\n").is_err());
        assert!(Profile::parse("[bindings]\nswipe.left = \"fly\"\n").is_err());
        assert!(Profile::parse("[bindings]\nswipe.left = 3\n").is_err());
        assert!(Profile::parse("bindings = \"nope\"\n").is_err());
        assert!(Profile::parse("[input]\nslop_px = -2.0\n").is_err());
    }

    #[test]
    fn installs_default_and_switches_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = DeckConfigState::load_from_dir(dir.path()).unwrap();
        assert_eq!(st.active_name, "default");
        assert!(st.active_profile_path().exists());

        fs::write(
            st.profiles_dir.join("wide.toml"),
            "[viewport]\nwidth = 1080.0\nheight = 1920.0\n",
        )
        .unwrap();
        assert_eq!(st.list_profiles(), vec!["default", "wide"]);

        st.set_active("wide").unwrap();
        assert_eq!(st.profile.viewport.width, 1080.0);
        assert_eq!(
            fs::read_to_string(&st.active_ptr).unwrap().trim(),
            "wide"
        );

        let again = DeckConfigState::load_from_dir(dir.path()).unwrap();
        assert_eq!(again.active_name, "wide");

        assert!(st.set_active("missing").is_err());
        assert_eq!(st.active_name, "wide");
    }

    #[test]
    fn failed_reload_keeps_last_good_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = DeckConfigState::load_from_dir(dir.path()).unwrap();
        fs::write(st.active_profile_path(), "[viewport]\nwidth = 0.0\n").unwrap();
        assert!(st.reload().is_err());
        assert_eq!(st.profile.viewport.width, 400.0);
    }
}
