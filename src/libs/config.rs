use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "fixtures.db";

/// Where the fixture database lives and whether sample accounts go in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratorConfig {
    pub database_path: PathBuf,
    pub extended_fixtures: bool,
}

impl MigratorConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            extended_fixtures: false,
        }
    }

    pub fn with_extended_fixtures(mut self, enabled: bool) -> Self {
        self.extended_fixtures = enabled;
        self
    }

    /// SQLite files written next to the database while it is open.
    pub fn sidecar_paths(&self) -> Vec<PathBuf> {
        ["-journal", "-wal", "-shm"]
            .iter()
            .map(|suffix| {
                let mut name = self.database_path.clone().into_os_string();
                name.push(suffix);
                PathBuf::from(name)
            })
            .collect()
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_base_seed_only() {
        let config = MigratorConfig::default();
        assert_eq!(config.database_path, PathBuf::from("fixtures.db"));
        assert!(!config.extended_fixtures);
    }

    #[test]
    fn sidecars_sit_next_to_the_database() {
        let config = MigratorConfig::new("data/app.db");
        assert_eq!(
            config.sidecar_paths(),
            vec![
                PathBuf::from("data/app.db-journal"),
                PathBuf::from("data/app.db-wal"),
                PathBuf::from("data/app.db-shm"),
            ]
        );
    }
}
