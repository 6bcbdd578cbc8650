/// Lookup-key derivation for localization table rows
use serde::{Deserialize, Serialize};

pub const NAMES_PREFIX: &str = "names:";
pub const MISSION_TITLE_PREFIX: &str = "mission_title:";
pub const DEFAULT_MISSION_MARKER: &str = ".bzn";

/// One `(key, english)` pair waiting to be translated and appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationEntry {
    pub key: String,
    pub english: String,
}

impl LocalizationEntry {
    pub fn new(key: impl Into<String>, english: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            english: english.into(),
        }
    }

    pub fn is_mission_title(&self) -> bool {
        self.key.starts_with(MISSION_TITLE_PREFIX)
    }
}

/// `names:` key for a bare phrase: lowercased, spaces become underscores.
pub fn names_key(text: &str) -> String {
    format!("{NAMES_PREFIX}{}", text.to_lowercase().replace(' ', "_"))
}

/// Turns one input line into an entry.
///
/// A line holding both `~` and the mission marker (matched case-insensitively)
/// is read as `mapfile~Human Title`. Everything else is a plain name.
pub fn derive_entry(line: &str, mission_marker: &str) -> LocalizationEntry {
    let line = line.trim();
    if is_mission_line(line, mission_marker) {
        if let Some((left, right)) = line.split_once('~') {
            return LocalizationEntry::new(
                format!("{MISSION_TITLE_PREFIX}{}", left.trim()),
                right.trim(),
            );
        }
    }

    LocalizationEntry::new(names_key(line), line)
}

fn is_mission_line(line: &str, mission_marker: &str) -> bool {
    line.contains('~')
        && !mission_marker.is_empty()
        && line
            .to_lowercase()
            .contains(&mission_marker.to_lowercase())
}

/// Splits pasted text into entries, one per non-blank line, in input order.
pub fn parse_manual_input(text: &str, mission_marker: &str) -> Vec<LocalizationEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| derive_entry(line, mission_marker))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_line_uses_left_part_as_key() {
        let entry = derive_entry("training.bzn~Basic Training", DEFAULT_MISSION_MARKER);
        assert_eq!(entry.key, "mission_title:training.bzn");
        assert_eq!(entry.english, "Basic Training");
        assert!(entry.is_mission_title());
    }

    #[test]
    fn mission_line_trims_both_sides() {
        let entry = derive_entry("  misn04.BZN ~  The Relic  ", DEFAULT_MISSION_MARKER);
        assert_eq!(entry.key, "mission_title:misn04.BZN");
        assert_eq!(entry.english, "The Relic");
    }

    #[test]
    fn mission_line_splits_on_first_tilde_only() {
        let entry = derive_entry("a.bzn~Part 1~Part 2", DEFAULT_MISSION_MARKER);
        assert_eq!(entry.key, "mission_title:a.bzn");
        assert_eq!(entry.english, "Part 1~Part 2");
    }

    #[test]
    fn plain_phrase_becomes_names_key() {
        let entry = derive_entry("Scorpion Tank", DEFAULT_MISSION_MARKER);
        assert_eq!(entry.key, "names:scorpion_tank");
        assert_eq!(entry.english, "Scorpion Tank");
        assert!(!entry.is_mission_title());
    }

    #[test]
    fn tilde_without_marker_is_a_plain_name() {
        let entry = derive_entry("Foo~Bar", DEFAULT_MISSION_MARKER);
        assert_eq!(entry.key, "names:foo~bar");
        assert_eq!(entry.english, "Foo~Bar");
    }

    #[test]
    fn marker_without_tilde_is_a_plain_name() {
        let entry = derive_entry("training.bzn", DEFAULT_MISSION_MARKER);
        assert_eq!(entry.key, "names:training.bzn");
    }

    #[test]
    fn names_key_replaces_every_space() {
        assert_eq!(names_key("Heavy  Assault Tank"), "names:heavy__assault_tank");
    }

    #[test]
    fn manual_input_skips_blank_lines() {
        let entries = parse_manual_input(
            "Scorpion Tank\n\n   \ntraining.bzn~Basic Training\r\n  Grizzly \n",
            DEFAULT_MISSION_MARKER,
        );
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "names:scorpion_tank",
                "mission_title:training.bzn",
                "names:grizzly"
            ]
        );
        assert_eq!(entries[2].english, "Grizzly");
    }
}
