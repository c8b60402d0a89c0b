//! Best-effort shader dumps for offline inspection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::regs::Stage;

#[derive(Clone, Debug)]
pub struct ShaderDumper {
    dir: Option<PathBuf>,
}

impl ShaderDumper {
    pub fn new(enabled: bool, dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: enabled.then(|| dir.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn file_name(stage: Stage, hash: u64, perm_idx: usize, ext: &str) -> String {
        format!("{stage}_{hash:#018x}_{perm_idx}.{ext}")
    }

    /// Write `code` to `<dir>/{stage}_{hash}_{perm}.{ext}`. Failures are logged, not returned.
    pub fn dump(&self, stage: Stage, hash: u64, perm_idx: usize, ext: &str, code: &[u32]) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(Self::file_name(stage, hash, perm_idx, ext));
        if let Err(err) = write_words(dir, &path, code) {
            warn!(path = %path.display(), %err, "failed to dump shader");
        }
    }
}

fn write_words(dir: &Path, path: &Path, code: &[u32]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(path, bytemuck::cast_slice::<u32, u8>(code))
}
