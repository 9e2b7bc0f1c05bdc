use crate::constants::{CLIP_DURATION_SEC, DEFAULT_SELECTION_RADIUS};
use serde::Deserialize;
use std::time::Duration;

pub const MAX_SIMULTANEOUS_RANGE: (u32, u32) = (1, 20);
pub const SEARCH_LIMIT_RANGE: (u32, u32) = (1, 200);
pub const SEARCH_SCALE_RANGE: (f32, f32) = (0.1, 2.0);
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

pub const DEFAULT_AUDIO_BASE_URL: &str =
    "https://wanderingmind.thomasjuldo.com/audiostream/static/audio/";
pub const DEFAULT_POINTS_URL: &str = "/old-points.json";
pub const DEFAULT_HEIGHTMAP_URL: &str = "/old-heightmap.png";

/// Query-string keys understood by [`Settings::with_overrides`].
pub const OVERRIDE_KEYS: &[&str] = &[
    "autoRotate",
    "maxSimultaneous",
    "searchLimit",
    "searchScale",
    "volume",
    "audioBaseUrl",
    "pointsUrl",
    "heightmapUrl",
];

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub auto_rotate: bool,
    pub max_simultaneous: u32,
    pub search_limit: u32,
    pub search_scale: f32,
    pub volume: f32,
    pub audio_base_url: String,
    pub points_url: String,
    pub heightmap_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_rotate: true,
            max_simultaneous: 5,
            search_limit: 100,
            search_scale: 1.0,
            volume: 0.5,
            audio_base_url: DEFAULT_AUDIO_BASE_URL.to_string(),
            points_url: DEFAULT_POINTS_URL.to_string(),
            heightmap_url: DEFAULT_HEIGHTMAP_URL.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingEffect {
    None,
    Requery,
    Rescale,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SettingAdjust {
    ToggleAutoRotate,
    MaxSimultaneous(i32),
    SearchLimit(i32),
    SearchScale(f32),
    Volume(f32),
}

impl SettingAdjust {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "a" | "A" => Some(Self::ToggleAutoRotate),
            "[" => Some(Self::MaxSimultaneous(-1)),
            "]" => Some(Self::MaxSimultaneous(1)),
            "," | "<" => Some(Self::SearchLimit(-10)),
            "." | ">" => Some(Self::SearchLimit(10)),
            "-" | "_" => Some(Self::SearchScale(-0.1)),
            "=" | "+" => Some(Self::SearchScale(0.1)),
            "ArrowDown" => Some(Self::Volume(-0.05)),
            "ArrowUp" => Some(Self::Volume(0.05)),
            _ => None,
        }
    }
}

fn clamp_u32(v: i64, (lo, hi): (u32, u32)) -> u32 {
    v.clamp(lo as i64, hi as i64) as u32
}

fn clamp_f32(v: f32, (lo, hi): (f32, f32)) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}

impl Settings {
    pub fn sanitized(mut self) -> Self {
        self.max_simultaneous = clamp_u32(self.max_simultaneous as i64, MAX_SIMULTANEOUS_RANGE);
        self.search_limit = clamp_u32(self.search_limit as i64, SEARCH_LIMIT_RANGE);
        self.search_scale = clamp_f32(self.search_scale, SEARCH_SCALE_RANGE);
        self.volume = clamp_f32(self.volume, VOLUME_RANGE);
        self
    }

    /// Apply `key=value` overrides (camelCase keys, as in a page query string).
    /// Unknown keys and unparsable values are skipped with a warning.
    pub fn with_overrides<'a>(mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (key, value) in pairs {
            let ok = match key {
                "autoRotate" => value.parse::<bool>().map(|v| self.auto_rotate = v).is_ok(),
                "maxSimultaneous" => value.parse::<u32>().map(|v| self.max_simultaneous = v).is_ok(),
                "searchLimit" => value.parse::<u32>().map(|v| self.search_limit = v).is_ok(),
                "searchScale" => value.parse::<f32>().map(|v| self.search_scale = v).is_ok(),
                "volume" => value.parse::<f32>().map(|v| self.volume = v).is_ok(),
                "audioBaseUrl" => {
                    self.audio_base_url = value.to_string();
                    true
                }
                "pointsUrl" => {
                    self.points_url = value.to_string();
                    true
                }
                "heightmapUrl" => {
                    self.heightmap_url = value.to_string();
                    true
                }
                _ => false,
            };
            if !ok {
                log::warn!("[settings] ignoring {}={}", key, value);
            }
        }
        self.sanitized()
    }

    pub fn selection_radius(&self) -> f32 {
        DEFAULT_SELECTION_RADIUS * self.search_scale
    }

    /// Period of the audio queue poll: one attempt per clip slot per clip length.
    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_secs_f64(CLIP_DURATION_SEC / self.max_simultaneous.max(1) as f64)
    }

    pub fn set_auto_rotate(&mut self, on: bool) -> SettingEffect {
        self.auto_rotate = on;
        SettingEffect::None
    }

    pub fn set_max_simultaneous(&mut self, n: u32) -> SettingEffect {
        self.max_simultaneous = clamp_u32(n as i64, MAX_SIMULTANEOUS_RANGE);
        SettingEffect::None
    }

    pub fn set_search_limit(&mut self, n: u32) -> SettingEffect {
        let n = clamp_u32(n as i64, SEARCH_LIMIT_RANGE);
        if n == self.search_limit {
            return SettingEffect::None;
        }
        self.search_limit = n;
        SettingEffect::Requery
    }

    pub fn set_search_scale(&mut self, scale: f32) -> SettingEffect {
        // Panel steps are 0.1; snapping keeps repeated nudges from drifting.
        let scale = (clamp_f32(scale, SEARCH_SCALE_RANGE) * 10.0).round() / 10.0;
        if (scale - self.search_scale).abs() < f32::EPSILON {
            return SettingEffect::None;
        }
        self.search_scale = scale;
        SettingEffect::Rescale
    }

    pub fn set_volume(&mut self, volume: f32) -> SettingEffect {
        self.volume = (clamp_f32(volume, VOLUME_RANGE) * 100.0).round() / 100.0;
        SettingEffect::None
    }

    pub fn adjust(&mut self, adjust: SettingAdjust) -> SettingEffect {
        match adjust {
            SettingAdjust::ToggleAutoRotate => self.set_auto_rotate(!self.auto_rotate),
            SettingAdjust::MaxSimultaneous(d) => {
                let n = clamp_u32(self.max_simultaneous as i64 + d as i64, MAX_SIMULTANEOUS_RANGE);
                self.set_max_simultaneous(n)
            }
            SettingAdjust::SearchLimit(d) => {
                let n = clamp_u32(self.search_limit as i64 + d as i64, SEARCH_LIMIT_RANGE);
                self.set_search_limit(n)
            }
            SettingAdjust::SearchScale(d) => self.set_search_scale(self.search_scale + d),
            SettingAdjust::Volume(d) => self.set_volume(self.volume + d),
        }
    }
}
