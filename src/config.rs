use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Interpreter configuration, loadable from a TOML file. Every field has
/// a sensible default so hosts can run with `Config::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Hard ceiling on instructions executed in one tick; a script that
    /// exceeds it is forcibly suspended so the host frame loop survives
    /// a runaway straight-line loop.
    pub max_instructions_per_tick: u32,
    /// Size of the word plane of the global variable table
    pub global_words: usize,
    /// Size of the byte plane of the global variable table
    pub global_bytes: usize,
    /// Fixed RNG seed; unset means a fresh thread RNG per run
    pub rng_seed: Option<u64>,
    /// Log a per-opcode dispatch summary on teardown
    pub trace_dispatch: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_instructions_per_tick: 10_000,
            global_words: 256,
            global_bytes: 256,
            rng_seed: None,
            trace_dispatch: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
        toml::from_str(&text).map_err(|e| format!("bad config {}: {}", path.display(), e))
    }
}
