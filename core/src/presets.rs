use dirs::home_dir;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(target_os = "windows")]
use winreg::enums::HKEY_CURRENT_USER;
#[cfg(target_os = "windows")]
use winreg::RegKey;

static LIBRARY_PATH_CAPTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""path"\s+"([^"]+)""#).expect("valid library path regex"));

pub const TABLE_FILE_NAME: &str = "localization_table.csv";
const GAME_DIR_NAME: &str = "Battlezone 98 Redux";
const STEAM_DEFAULT_TABLE: &str =
    r"C:\Program Files (x86)\Steam\steamapps\common\Battlezone 98 Redux\localization_table.csv";
const GOG_DEFAULT_TABLE: &str = r"C:\GOG Games\Battlezone 98 Redux\localization_table.csv";

/// Known install locations of the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallPreset {
    #[default]
    Steam,
    Gog,
}

impl InstallPreset {
    pub fn label(&self) -> &'static str {
        match self {
            InstallPreset::Steam => "STEAM",
            InstallPreset::Gog => "GOG",
        }
    }

    pub fn default_table_path(&self) -> PathBuf {
        match self {
            InstallPreset::Steam => PathBuf::from(STEAM_DEFAULT_TABLE),
            InstallPreset::Gog => PathBuf::from(GOG_DEFAULT_TABLE),
        }
    }

    /// First existing table for this preset, else its fixed default.
    pub fn resolve(&self) -> PresetResolution {
        let candidates = match self {
            InstallPreset::Steam => SteamLocator::new().table_candidates(),
            InstallPreset::Gog => vec![self.default_table_path()],
        };

        let found = candidates.into_iter().find(|path| path.is_file());
        let exists = found.is_some();
        let path = found.unwrap_or_else(|| self.default_table_path());
        debug!("{} preset resolved to {} (exists: {exists})", self.label(), path.display());

        PresetResolution {
            preset: *self,
            message: resolution_message(*self, exists),
            path,
            exists,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetResolution {
    pub preset: InstallPreset,
    pub path: PathBuf,
    pub exists: bool,
    /// Activity-log line shown after the preset is picked
    pub message: String,
}

fn resolution_message(preset: InstallPreset, exists: bool) -> String {
    if exists {
        format!("Set path to {} default. File found!", preset.label())
    } else {
        format!(
            "Warning: {} default path not found on this drive.",
            preset.label()
        )
    }
}

/// Opens the folder that holds `table_path` in the system file browser.
pub fn open_table_folder(table_path: &Path) -> Result<(), String> {
    let folder = table_path
        .parent()
        .filter(|parent| parent.exists())
        .ok_or_else(|| format!("folder not found: {}", table_path.display()))?;

    open::that_detached(folder).map_err(|error| format!("could not open folder: {error}"))
}

#[derive(Debug, Default)]
pub struct SteamLocator;

impl SteamLocator {
    pub fn new() -> Self {
        Self
    }

    /// Table locations in every known Steam library, fixed default first.
    pub fn table_candidates(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let mut push_unique = |path: PathBuf, results: &mut Vec<PathBuf>| {
            if seen.insert(path.to_string_lossy().to_lowercase()) {
                results.push(path);
            }
        };

        push_unique(PathBuf::from(STEAM_DEFAULT_TABLE), &mut results);
        for root in self.steam_roots() {
            for library in self.parse_library_folders(&root) {
                push_unique(table_in_library(&library), &mut results);
            }
        }

        results
    }

    fn steam_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        roots.extend(self.env_override());
        roots.extend(self.registry_install_path());
        roots.extend(self.candidate_roots().into_iter().filter(|p| p.exists()));
        roots
    }

    fn env_override(&self) -> Option<PathBuf> {
        std::env::var("STEAM_PATH")
            .ok()
            .map(PathBuf::from)
            .filter(|path| path.exists())
    }

    #[cfg(target_os = "windows")]
    fn registry_install_path(&self) -> Option<PathBuf> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let key = hkcu.open_subkey("Software\\Valve\\Steam").ok()?;
        let path: String = key.get_value("SteamPath").ok()?;
        let path = PathBuf::from(path);
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn registry_install_path(&self) -> Option<PathBuf> {
        None
    }

    fn candidate_roots(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(home) = home_dir() {
            #[cfg(target_os = "windows")]
            {
                candidates.push(home.join("AppData/Local/Steam"));
                candidates.push(PathBuf::from("C:/Program Files (x86)/Steam"));
            }

            #[cfg(target_os = "linux")]
            {
                candidates.push(home.join(".steam/steam"));
                candidates.push(home.join(".local/share/Steam"));
            }

            #[cfg(target_os = "macos")]
            {
                candidates.push(home.join("Library/Application Support/Steam"));
            }
        }

        candidates
    }

    fn parse_library_folders(&self, steam_root: &Path) -> Vec<PathBuf> {
        let library_vdf = steam_root.join("steamapps/libraryfolders.vdf");
        match fs::read_to_string(&library_vdf) {
            Ok(contents) => {
                let mut libraries = library_paths_from_vdf(&contents);
                if libraries.is_empty() {
                    libraries.push(steam_root.to_path_buf());
                }
                libraries
            }
            Err(_) => vec![steam_root.to_path_buf()],
        }
    }
}

fn table_in_library(library_root: &Path) -> PathBuf {
    library_root
        .join("steamapps")
        .join("common")
        .join(GAME_DIR_NAME)
        .join(TABLE_FILE_NAME)
}

fn library_paths_from_vdf(contents: &str) -> Vec<PathBuf> {
    LIBRARY_PATH_CAPTURE
        .captures_iter(contents)
        .map(|capture| PathBuf::from(capture[1].replace("\\\\", "\\")))
        .collect()
}
