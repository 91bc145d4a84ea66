//! Application configuration.
//!
//! Non-sensitive tuning knobs have defaults; credentials come from the
//! environment or an optional `.env` file only and are never persisted.

use std::collections::HashMap;

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Provider credentials
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub gemini_api_key: String,

    // Prior-art search collaborator
    pub google_search_api_key: String,
    pub google_search_engine_id: String,
    /// Credits charged on top of the model cost when enrichment runs.
    pub search_cost: i64,
    pub search_max_results: usize,

    // HTTP boundary
    pub bind: String,
    pub port: u16,

    // Per-phase deadlines, seconds (Analyze shortest, Write longest).
    pub analyze_timeout_s: u64,
    pub think_timeout_s: u64,
    pub write_timeout_s: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let dotenv = parse_dotenv();
        Self {
            anthropic_api_key: get_str("ANTHROPIC_API_KEY", &dotenv, ""),
            openai_api_key: get_str("OPENAI_API_KEY", &dotenv, ""),
            gemini_api_key: get_str("GEMINI_API_KEY", &dotenv, ""),
            google_search_api_key: get_str("GOOGLE_SEARCH_API_KEY", &dotenv, ""),
            google_search_engine_id: get_str("GOOGLE_SEARCH_ENGINE_ID", &dotenv, ""),
            search_cost: get_i64("SEARCH_COST", &dotenv, 20),
            search_max_results: get_i64("SEARCH_MAX_RESULTS", &dotenv, 5) as usize,
            bind: get_str("BIND", &dotenv, "0.0.0.0"),
            port: get_u16("PORT", &dotenv, 8488),
            analyze_timeout_s: get_u64("ANALYZE_TIMEOUT_S", &dotenv, 120),
            think_timeout_s: get_u64("THINK_TIMEOUT_S", &dotenv, 180),
            write_timeout_s: get_u64("WRITE_TIMEOUT_S", &dotenv, 180),
        }
    }
}

fn parse_dotenv() -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return map;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}

fn get(key: &str, dotenv: &HashMap<String, String>) -> Option<String> {
    std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
}

fn get_str(key: &str, dotenv: &HashMap<String, String>, default: &str) -> String {
    get(key, dotenv).unwrap_or_else(|| default.to_string())
}

fn get_i64(key: &str, dotenv: &HashMap<String, String>, default: i64) -> i64 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_u16(key: &str, dotenv: &HashMap<String, String>, default: u16) -> u16 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_u64(key: &str, dotenv: &HashMap<String, String>, default: u64) -> u64 {
    get(key, dotenv)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
