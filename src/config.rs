use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How pending block patches are coalesced while the debounce timer runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoalesceMode {
    /// One pending patch for the whole page. A patch for another block
    /// replaces it, and the replaced block's edit is never sent.
    #[default]
    Latest,
    /// One pending patch per block.
    PerBlock,
}

impl CoalesceMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "latest" => Some(CoalesceMode::Latest),
            "per-block" => Some(CoalesceMode::PerBlock),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub default_lang: String,
    pub save_quiet_ms: u64,
    pub coalesce: CoalesceMode,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub grid_size: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8090".to_string(),
            default_lang: "hu".to_string(),
            save_quiet_ms: 800,
            coalesce: CoalesceMode::Latest,
            canvas_width: 1200.0,
            canvas_height: 800.0,
            grid_size: 20.0,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the `PB_API_URL`, `CMS_LANG`, `CMS_SAVE_QUIET_MS`
    /// and `CMS_COALESCE` variables present when the bundle was built.
    pub fn from_build_env() -> Self {
        Self::with_overrides(|name| match name {
            "PB_API_URL" => option_env!("PB_API_URL"),
            "CMS_LANG" => option_env!("CMS_LANG"),
            "CMS_SAVE_QUIET_MS" => option_env!("CMS_SAVE_QUIET_MS"),
            "CMS_COALESCE" => option_env!("CMS_COALESCE"),
            _ => None,
        })
    }

    fn with_overrides<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("PB_API_URL").filter(|u| !u.is_empty()) {
            config.backend_url = url.trim_end_matches('/').to_string();
        }
        if let Some(lang) = lookup("CMS_LANG").filter(|l| !l.is_empty()) {
            config.default_lang = lang.to_string();
        }
        match lookup("CMS_SAVE_QUIET_MS").map(str::parse::<u64>) {
            Some(Ok(ms)) => config.save_quiet_ms = ms,
            Some(Err(e)) => tracing::warn!("ignoring CMS_SAVE_QUIET_MS: {e}"),
            None => {}
        }
        if let Some(raw) = lookup("CMS_COALESCE") {
            match CoalesceMode::parse(raw) {
                Some(mode) => config.coalesce = mode,
                None => tracing::warn!("ignoring unknown CMS_COALESCE value {raw:?}"),
            }
        }
        config
    }

    pub fn save_quiet_period(&self) -> Duration {
        Duration::from_millis(self.save_quiet_ms)
    }
}
