use std::path::PathBuf;

use hashbrown::HashSet;
use tracing::warn;

/// Env var enabling shader dumps.
pub const DUMP_SHADERS_ENV: &str = "AERO_GCN_DUMP_SHADERS";
/// Env var overriding the dump directory.
pub const SHADER_DUMP_DIR_ENV: &str = "AERO_GCN_SHADER_DUMP_DIR";
/// Env var with comma separated hex content hashes that must never be compiled.
pub const SKIP_SHADERS_ENV: &str = "AERO_GCN_SKIP_SHADERS";

const DEFAULT_DUMP_DIR: &str = "shader_dumps";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineCacheConfig {
    /// Write guest bytecode and translated binaries to `dump_dir`.
    pub dump_shaders: bool,
    pub dump_dir: PathBuf,
    /// Shader denylist.
    pub skip_shader_hashes: HashSet<u64>,
}

impl Default for PipelineCacheConfig {
    fn default() -> Self {
        Self {
            dump_shaders: false,
            dump_dir: PathBuf::from(DEFAULT_DUMP_DIR),
            skip_shader_hashes: HashSet::new(),
        }
    }
}

impl PipelineCacheConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            dump_shaders: env_var_truthy(DUMP_SHADERS_ENV),
            ..Self::default()
        };
        if let Some(dir) = std::env::var_os(SHADER_DUMP_DIR_ENV).filter(|dir| !dir.is_empty()) {
            config.dump_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var(SKIP_SHADERS_ENV) {
            config.skip_shader_hashes = parse_hash_list(&raw);
        }
        config
    }

    pub fn with_skip_shader_hashes(mut self, hashes: impl IntoIterator<Item = u64>) -> Self {
        self.skip_shader_hashes.extend(hashes);
        self
    }
}

fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

/// Parse `"0xdeadbeef, 1234abcd"`; the `0x` prefix is optional and bad entries are dropped.
fn parse_hash_list(raw: &str) -> HashSet<u64> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let digits = entry
                .strip_prefix("0x")
                .or_else(|| entry.strip_prefix("0X"))
                .unwrap_or(entry);
            match u64::from_str_radix(digits, 16) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    warn!(entry, %err, "ignoring invalid {SKIP_SHADERS_ENV} entry");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_list_accepts_optional_prefix_and_drops_garbage() {
        let hashes = parse_hash_list(" 0xDEAD, beef ,, nope,0X10");
        let mut sorted: Vec<u64> = hashes.into_iter().collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0x10, 0xbeef, 0xdead]);
    }

    #[test]
    fn default_config_dumps_nothing_and_skips_nothing() {
        let config = PipelineCacheConfig::default();
        assert!(!config.dump_shaders);
        assert!(config.skip_shader_hashes.is_empty());

        let config = config.with_skip_shader_hashes([7, 9]);
        assert!(config.skip_shader_hashes.contains(&7));
        assert!(config.skip_shader_hashes.contains(&9));
    }
}
