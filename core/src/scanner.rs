/// ODF discovery: walks a game-data folder and extracts unit names
use crate::key::{names_key, LocalizationEntry};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

static UNIT_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)unitName\s*=\s*"([^"]*)""#).expect("valid unitName regex")
});

pub const DEFAULT_ODF_EXTENSION: &str = ".odf";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan folder not found: {}", .0.display())]
    FolderNotFound(PathBuf),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// File-name suffix that marks a unit definition (matched case-insensitively)
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    DEFAULT_ODF_EXTENSION.to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredUnit {
    pub path: PathBuf,
    pub display_name: String,
    pub key: String,
    /// False when the name fell back to the file stem.
    pub from_unit_name: bool,
}

impl DiscoveredUnit {
    pub fn to_entry(&self) -> LocalizationEntry {
        LocalizationEntry::new(self.key.clone(), self.display_name.clone())
    }
}

/// Value of the first `unitName = "..."` attribute, if any.
pub fn extract_unit_name(content: &str) -> Option<String> {
    UNIT_NAME_REGEX
        .captures(content)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Default)]
pub struct OdfScanner {
    config: ScanConfig,
}

fn read_sorted(folder: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(folder)? {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!("skipping entry in {}: {}", folder.display(), err),
        }
    }
    entries.sort_by_key(|entry| entry.path());
    Ok(entries)
}

impl OdfScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan a directory tree for unit definitions, in path order
    pub fn scan(&self, root: &Path) -> Result<Vec<DiscoveredUnit>, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::FolderNotFound(root.to_path_buf()));
        }
        let root = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        let entries = read_sorted(&root)?;
        let mut units = Vec::new();
        self.visit_entries(entries, &mut units);
        debug!("found {} unit files under {}", units.len(), root.display());
        Ok(units)
    }

    /// Directory links are not followed; file links are.
    fn visit_entries(&self, entries: Vec<fs::DirEntry>, units: &mut Vec<DiscoveredUnit>) {
        for entry in entries {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!("skipping {}: {}", path.display(), err);
                    continue;
                }
            };

            if file_type.is_dir() {
                self.scan_subfolder(&path, units);
            } else if file_type.is_symlink() && path.is_dir() {
                debug!("not following directory link {}", path.display());
            } else if (file_type.is_file() || path.is_file()) && self.matches_extension(&path) {
                units.push(self.process_file(&path));
            }
        }
    }

    fn scan_subfolder(&self, folder: &Path, units: &mut Vec<DiscoveredUnit>) {
        match read_sorted(folder) {
            Ok(entries) => self.visit_entries(entries, units),
            Err(err) => warn!("skipping folder {}: {}", folder.display(), err),
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let suffix = self.config.extension.to_lowercase();
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase().ends_with(&suffix))
            .unwrap_or(false)
    }

    fn process_file(&self, path: &Path) -> DiscoveredUnit {
        let unit_name = match fs::read(path) {
            Ok(bytes) => extract_unit_name(&String::from_utf8_lossy(&bytes)),
            Err(err) => {
                warn!("could not read {}: {}", path.display(), err);
                None
            }
        };

        let (display_name, from_unit_name) = match unit_name {
            Some(name) => (name, true),
            None => (self.file_stem(path), false),
        };

        DiscoveredUnit {
            path: path.to_path_buf(),
            key: names_key(&display_name),
            display_name,
            from_unit_name,
        }
    }

    fn file_stem(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let suffix_len = self.config.extension.len();
        if name.len() >= suffix_len && name.is_char_boundary(name.len() - suffix_len) {
            name[..name.len() - suffix_len].to_string()
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extracts_unit_name_case_insensitively() {
        assert_eq!(
            extract_unit_name("[GameObjectClass]\nUNITNAME = \"Scorpion\"\n"),
            Some("Scorpion".to_string())
        );
        assert_eq!(
            extract_unit_name("unitname=\"  Grizzly \""),
            Some("Grizzly".to_string())
        );
        assert_eq!(extract_unit_name("unitName = \"\""), None);
        assert_eq!(extract_unit_name("geometryName = \"avtank00.xsi\""), None);
    }

    #[test]
    fn discovers_unit_name_and_falls_back_to_filename() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("avtank.odf"),
            "[GameObjectClass]\nunitName = \"Scorpion\"\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/svRecy.ODF"), "[Craft]\nmaxSpeed = 10\n").unwrap();
        fs::write(dir.path().join("readme.txt"), "unitName = \"Ignored\"").unwrap();

        let units = OdfScanner::default().scan(dir.path()).unwrap();
        assert_eq!(units.len(), 2);

        assert_eq!(units[0].display_name, "Scorpion");
        assert_eq!(units[0].key, "names:scorpion");
        assert!(units[0].from_unit_name);

        assert_eq!(units[1].display_name, "svRecy");
        assert_eq!(units[1].key, "names:svrecy");
        assert!(!units[1].from_unit_name);
    }

    #[test]
    fn tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let mut bytes = b"[GameObjectClass]\n\xff\xfe junk\n".to_vec();
        bytes.extend_from_slice(b"unitName = \"Heavy Tank\"\n");
        fs::write(dir.path().join("avhvy.odf"), bytes).unwrap();

        let units = OdfScanner::default().scan(dir.path()).unwrap();
        assert_eq!(units[0].key, "names:heavy_tank");
        assert_eq!(units[0].to_entry().english, "Heavy Tank");
    }

    #[test]
    fn keeps_duplicates_across_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.odf"), "unitName = \"Scout\"").unwrap();
        fs::write(dir.path().join("b.odf"), "unitName = \"Scout\"").unwrap();

        let units = OdfScanner::default().scan(dir.path()).unwrap();
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|unit| unit.key == "names:scout"));
    }

    #[cfg(unix)]
    #[test]
    fn does_not_follow_directory_links() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(dir.path().join("a.odf"), "unitName = \"Scout\"").unwrap();
        fs::write(outside.path().join("far.odf"), "unitName = \"Far\"").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("elsewhere")).unwrap();

        let units = OdfScanner::default().scan(dir.path()).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].key, "names:scout");
    }

    #[cfg(unix)]
    #[test]
    fn follows_file_links() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("real.txt"), "unitName = \"Turret\"").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.odf"))
            .unwrap();

        let units = OdfScanner::default().scan(dir.path()).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].display_name, "Turret");
    }

    #[test]
    fn vanished_subfolder_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut units = Vec::new();
        OdfScanner::default().scan_subfolder(&dir.path().join("gone"), &mut units);
        assert!(units.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subfolder_does_not_abort_scan() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.odf"), "unitName = \"Scout\"").unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("b.odf"), "unitName = \"Hidden\"").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = OdfScanner::default().scan(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users can still read the folder, so only the surviving unit is checked.
        let units = result.unwrap();
        assert_eq!(units[0].key, "names:scout");
    }

    #[test]
    fn missing_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = OdfScanner::default()
            .scan(&dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, ScanError::FolderNotFound(_)));
    }
}
