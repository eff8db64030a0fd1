use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    /// Resolves the config directory: `$PAGELENS_HOME` when set, else
    /// `~/.pagelens`, else `./.pagelens` for homeless environments.
    pub fn new() -> Self {
        if let Ok(home) = std::env::var("PAGELENS_HOME") {
            if !home.trim().is_empty() {
                return Self {
                    base: PathBuf::from(home),
                };
            }
        }
        let base = dirs::home_dir()
            .map(|h| h.join(".pagelens"))
            .unwrap_or_else(|| PathBuf::from(".pagelens"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.base.join("reports")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.reports_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
