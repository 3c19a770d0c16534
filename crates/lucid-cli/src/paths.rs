use std::io;
use std::path::{Path, PathBuf};

use dirs::home_dir;
use lucid_core::LogSettings;

const LUCID_DIR_NAME: &str = ".lucid";

/// Directories used by one `lucid` run. Existence is not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LucidPaths {
    home: PathBuf,
}

impl LucidPaths {
    /// `--conf-dir` when given (relative paths are taken from the current
    /// directory), else `~/.lucid`.
    pub fn resolve(conf_dir: Option<&Path>) -> io::Result<Self> {
        let home = match conf_dir {
            Some(dir) => {
                let dir = expand_tilde(dir)?;
                if dir.is_absolute() {
                    dir
                } else {
                    std::env::current_dir()?.join(dir)
                }
            }
            None => user_home()?.join(LUCID_DIR_NAME),
        };
        Ok(Self { home })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `[log] path` when set, else the lucid home.
    pub fn log_dir(&self, log: &LogSettings) -> io::Result<PathBuf> {
        match log.path.as_deref().map(str::trim).filter(|path| !path.is_empty()) {
            Some(path) => expand_tilde(Path::new(path)),
            None => Ok(self.home.clone()),
        }
    }
}

fn expand_tilde(path: &Path) -> io::Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => user_home(),
        Ok(rest) => Ok(user_home()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}

fn user_home() -> io::Result<PathBuf> {
    home_dir().ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "could not find home directory"))
}
