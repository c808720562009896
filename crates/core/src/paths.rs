use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".skillcell"))
            .unwrap_or_else(|| PathBuf::from(".skillcell"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// Root of the persisted skill repository.
    pub fn skills_dir(&self) -> PathBuf {
        self.base.join("skills")
    }

    /// Single index document mapping skill id -> RepositoryEntry.
    pub fn skills_index_file(&self) -> PathBuf {
        self.skills_dir().join("skills_index.json")
    }

    /// One structured specification document per skill.
    pub fn specs_dir(&self) -> PathBuf {
        self.skills_dir().join("specs")
    }

    /// One generated source file per skill.
    pub fn sources_dir(&self) -> PathBuf {
        self.skills_dir().join("src")
    }

    /// Evolution event log files (JSONL, one per day).
    pub fn events_dir(&self) -> PathBuf {
        self.base.join("events")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.skills_dir())?;
        std::fs::create_dir_all(self.specs_dir())?;
        std::fs::create_dir_all(self.sources_dir())?;
        std::fs::create_dir_all(self.events_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_base() {
        let paths = Paths::with_base(PathBuf::from("/tmp/sc"));
        assert_eq!(paths.skills_index_file(), PathBuf::from("/tmp/sc/skills/skills_index.json"));
        assert_eq!(paths.specs_dir(), PathBuf::from("/tmp/sc/skills/specs"));
        assert_eq!(paths.sources_dir(), PathBuf::from("/tmp/sc/skills/src"));
    }
}
