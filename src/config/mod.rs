//! Configuration management
//!
//! Settings are layered, later layers win: built-in defaults, the TOML config
//! file, environment variables, command-line flags. The resulting [`Config`]
//! is passed explicitly into the sync engine.

use crate::paths::MARKER_FILE_NAME;
use crate::types::{ModSyncError, Result};
use clap::{ArgAction, Parser};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Default mapping definition file, looked up in the working directory
pub const DEFAULT_MAPPING_FILE: &str = "modlist.csv";

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "modsync.toml";

/// Command-line arguments
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "modsync",
    version,
    about = "Copy mod folders whose marker file changed since the last sync"
)]
pub struct Cli {
    /// Root directory holding the source mod folders
    #[arg(long, env = "MODSYNC_SOURCE")]
    pub source: Option<String>,

    /// Root directory the mod folders are copied into
    #[arg(long, env = "MODSYNC_DESTINATION")]
    pub destination: Option<String>,

    /// Mapping definition file (`source,destination` per line)
    #[arg(short, long)]
    pub mapping: Option<PathBuf>,

    /// Marker file compared inside each mod folder
    #[arg(long)]
    pub marker: Option<String>,

    /// TOML config file (defaults to ./modsync.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show what would be copied without copying
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of mod folders processed concurrently
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Reject duplicate source names in the mapping definition
    #[arg(long)]
    pub strict: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Settings read from a TOML config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub mapping: Option<PathBuf>,
    pub marker: Option<String>,
    pub threads: Option<usize>,
    pub strict: Option<bool>,
}

impl FileConfig {
    /// Load and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ModSyncError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
            .map_err(|e| ModSyncError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse config file contents
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ModSyncError::Config(e.to_string()))
    }
}

/// Resolved configuration for one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root directory holding the source mod folders
    pub source_root: PathBuf,

    /// Root directory the mod folders are copied into
    pub destination_root: PathBuf,

    /// Mapping definition file
    pub mapping_file: PathBuf,

    /// Marker file name compared inside each folder
    pub marker_file: String,

    /// Decide only, never copy
    pub dry_run: bool,

    /// Folders processed concurrently (1 = sequential)
    pub threads: usize,

    /// Reject duplicate source names
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            destination_root: PathBuf::new(),
            mapping_file: PathBuf::from(DEFAULT_MAPPING_FILE),
            marker_file: MARKER_FILE_NAME.to_string(),
            dry_run: false,
            threads: 1,
            strict: false,
        }
    }
}

impl Config {
    /// Config for a pair of roots with every other setting at its default
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            ..Self::default()
        }
    }

    /// Merge a config file layer and the CLI/environment layer.
    ///
    /// `file_dir` is the directory of the config file; a relative mapping path
    /// given in the file is resolved against it.
    pub fn from_layers(file: FileConfig, file_dir: Option<&Path>, cli: &Cli) -> Result<Self> {
        let defaults = Self::default();

        let source = cli.source.clone().or(file.source).ok_or_else(|| {
            ModSyncError::Config(
                "source root not set (use --source, MODSYNC_SOURCE or `source` in the config file)"
                    .to_string(),
            )
        })?;
        let destination = cli.destination.clone().or(file.destination).ok_or_else(|| {
            ModSyncError::Config(
                "destination root not set (use --destination, MODSYNC_DESTINATION or `destination` in the config file)"
                    .to_string(),
            )
        })?;

        let file_mapping = file.mapping.map(|m| match file_dir {
            Some(dir) if m.is_relative() => dir.join(m),
            _ => m,
        });

        Ok(Self {
            source_root: normalize_root(&source),
            destination_root: normalize_root(&destination),
            mapping_file: cli
                .mapping
                .clone()
                .or(file_mapping)
                .unwrap_or(defaults.mapping_file),
            marker_file: cli
                .marker
                .clone()
                .or(file.marker)
                .unwrap_or(defaults.marker_file),
            dry_run: cli.dry_run,
            threads: cli.threads.or(file.threads).unwrap_or(defaults.threads),
            strict: cli.strict || file.strict.unwrap_or(false),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.source_root.is_dir() {
            return Err(ModSyncError::Config(format!(
                "Source root is not a directory: {}",
                self.source_root.display()
            )));
        }

        if self.destination_root.as_os_str().is_empty() {
            return Err(ModSyncError::Config(
                "Destination root cannot be empty".to_string(),
            ));
        }

        if self.source_root == self.destination_root {
            return Err(ModSyncError::Config(
                "Source and destination cannot be the same".to_string(),
            ));
        }

        if !is_plain_file_name(&self.marker_file) {
            return Err(ModSyncError::Config(format!(
                "Marker must be a plain file name, got {:?}",
                self.marker_file
            )));
        }

        if self.threads == 0 {
            return Err(ModSyncError::Config(
                "threads must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl TryFrom<Cli> for Config {
    type Error = ModSyncError;

    fn try_from(cli: Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            }
        };

        let (file, file_dir) = match &config_path {
            Some(path) => (FileConfig::load(path)?, path.parent().map(Path::to_path_buf)),
            None => (FileConfig::default(), None),
        };

        let config = Self::from_layers(file, file_dir.as_deref(), &cli)?;
        config.validate()?;
        Ok(config)
    }
}

/// Clean up a root path as it arrives from env files or config values.
///
/// Trims whitespace, drops a raw-string `r` prefix directly in front of a
/// quote (`r"C:\mods"`), and strips one pair of matching surrounding quotes.
pub fn normalize_root(raw: &str) -> PathBuf {
    let mut s = raw.trim();

    if let Some(rest) = s.strip_prefix('r') {
        if rest.starts_with('"') || rest.starts_with('\'') {
            s = rest;
        }
    }

    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = &s[1..s.len() - 1];
            break;
        }
    }

    PathBuf::from(s.trim())
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with_roots(source: &str, destination: &str) -> Cli {
        Cli {
            source: Some(source.to_string()),
            destination: Some(destination.to_string()),
            ..Cli::default()
        }
    }

    #[test]
    fn test_normalize_root_strips_quotes() {
        assert_eq!(normalize_root("\"C:\\mods\""), PathBuf::from("C:\\mods"));
        assert_eq!(normalize_root("'/srv/mods'"), PathBuf::from("/srv/mods"));
        assert_eq!(normalize_root("  /srv/mods  "), PathBuf::from("/srv/mods"));
    }

    #[test]
    fn test_normalize_root_strips_raw_prefix() {
        assert_eq!(normalize_root("r\"D:\\srv\\mods\""), PathBuf::from("D:\\srv\\mods"));
    }

    #[test]
    fn test_normalize_root_keeps_leading_r_in_plain_paths() {
        assert_eq!(normalize_root("root/mods"), PathBuf::from("root/mods"));
        assert_eq!(normalize_root("\"unbalanced"), PathBuf::from("\"unbalanced"));
    }

    #[test]
    fn test_from_layers_cli_overrides_file() {
        let file = FileConfig {
            source: Some("/file/src".to_string()),
            destination: Some("/file/dst".to_string()),
            threads: Some(8),
            marker: Some("mod.cpp".to_string()),
            ..FileConfig::default()
        };
        let cli = Cli {
            source: Some("\"/cli/src\"".to_string()),
            threads: Some(2),
            ..Cli::default()
        };

        let config = Config::from_layers(file, None, &cli).unwrap();
        assert_eq!(config.source_root, PathBuf::from("/cli/src"));
        assert_eq!(config.destination_root, PathBuf::from("/file/dst"));
        assert_eq!(config.threads, 2);
        assert_eq!(config.marker_file, "mod.cpp");
        assert_eq!(config.mapping_file, PathBuf::from(DEFAULT_MAPPING_FILE));
    }

    #[test]
    fn test_from_layers_resolves_mapping_against_config_dir() {
        let file = FileConfig {
            mapping: Some(PathBuf::from("lists/mods.csv")),
            ..FileConfig::default()
        };
        let cli = cli_with_roots("/a", "/b");
        let config = Config::from_layers(file, Some(Path::new("/etc/modsync")), &cli).unwrap();
        assert_eq!(config.mapping_file, PathBuf::from("/etc/modsync/lists/mods.csv"));
    }

    #[test]
    fn test_from_layers_requires_roots() {
        let err = Config::from_layers(FileConfig::default(), None, &Cli::default()).unwrap_err();
        assert!(matches!(err, ModSyncError::Config(ref m) if m.contains("source root")));
    }

    #[test]
    fn test_file_config_parse() {
        let parsed = FileConfig::parse(
            r#"
            source = "C:\\mods"
            destination = "D:\\srv\\mods"
            threads = 4
            strict = true
            "#,
        )
        .unwrap();
        assert_eq!(parsed.source.as_deref(), Some("C:\\mods"));
        assert_eq!(parsed.threads, Some(4));
        assert_eq!(parsed.strict, Some(true));
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        assert!(FileConfig::parse("sorce = \"typo\"").is_err());
    }

    #[test]
    fn test_validate_missing_source() {
        let config = Config::new("/nonexistent/source", "/tmp/dst");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_same_roots() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path(), dir.path());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot be the same"));
    }

    #[test]
    fn test_validate_marker_must_be_file_name() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let mut config = Config::new(src.path(), dst.path());
        assert!(config.validate().is_ok());

        config.marker_file = "addons/meta.cpp".to_string();
        assert!(config.validate().is_err());
        config.marker_file = "..".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_threads() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let config = Config {
            threads: 0,
            ..Config::new(src.path(), dst.path())
        };
        assert!(config.validate().is_err());
    }
}
