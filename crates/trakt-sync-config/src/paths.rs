use anyhow::Result;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "imdb-trakt-sync";

/// Location of the per-user config file
#[derive(Debug, Clone)]
pub struct PathManager {
    config_dir: PathBuf,
}

impl PathManager {
    /// Platform directories, e.g. `~/.config/imdb-trakt-sync` on Linux
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join(APP_DIR);

        Ok(Self { config_dir })
    }

    /// Config directory rooted at `base`
    pub fn at(base: &Path) -> Self {
        Self {
            config_dir: base.to_path_buf(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

impl Default for PathManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::at(Path::new(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_base() {
        let paths = PathManager::at(Path::new("/tmp/its"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/its/config.toml"));
    }
}
