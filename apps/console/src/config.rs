use std::{collections::HashMap, fs};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub rows_per_page: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            rows_per_page: 5,
        }
    }
}

/// Defaults, overridden by `dashboard.toml`, overridden by environment
/// variables. CLI flags take precedence over all of these.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("dashboard.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("DASHBOARD_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("DASHBOARD_ROWS_PER_PAGE") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.rows_per_page = parsed;
        }
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("rows_per_page") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.rows_per_page = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
