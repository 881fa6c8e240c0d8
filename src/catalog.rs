use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Read-only catalog snapshot consumed by the player.
///
/// The catalog is maintained by the import/analysis pipeline; the player only
/// ever reads it. Entries are kept in file order, which is catalog order for
/// prev/next navigation.
#[derive(Debug, Clone)]
pub struct Catalog {
    patches: Vec<PatchEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatchEntry {
    pub id: String,
    pub catalog_number: u32,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(rename = "track", default)]
    pub tracks: Vec<TrackEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackEntry {
    pub number: u32,
    pub file: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub bpm: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "patch", default)]
    patches: Vec<PatchEntry>,
}

impl Catalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read catalog {}", path.display()))?;
        let mut catalog = Self::parse(&text)
            .with_context(|| format!("malformed catalog {}", path.display()))?;

        // Track paths are stored relative to the catalog file.
        if let Some(base) = path.parent() {
            for patch in &mut catalog.patches {
                for track in &mut patch.tracks {
                    if track.file.is_relative() {
                        track.file = base.join(&track.file);
                    }
                }
            }
        }
        Ok(catalog)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        if file.patches.is_empty() {
            return Err(anyhow!("catalog contains no patches"));
        }
        Ok(Self {
            patches: file.patches,
        })
    }

    pub fn patches(&self) -> &[PatchEntry] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PatchEntry> {
        self.patches.iter().find(|p| p.id == id)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.id == id)
    }

    pub fn by_catalog_number(&self, number: u32) -> Option<&PatchEntry> {
        self.patches.iter().find(|p| p.catalog_number == number)
    }
}

impl PatchEntry {
    pub fn display_name(&self) -> String {
        format!("#{} {}", self.catalog_number, self.name)
    }

    /// Text the picker filter runs against: name, tags, style, and per-track
    /// names/roles, lowercased.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.name];
        parts.extend(self.tags.iter().map(String::as_str));
        if let Some(style) = &self.style {
            parts.push(style);
        }
        for track in &self.tracks {
            if let Some(name) = &track.name {
                parts.push(name);
            }
            if let Some(role) = &track.role {
                parts.push(role);
            }
        }
        parts.join(" ").to_lowercase()
    }
}

impl TrackEntry {
    /// One-line metadata summary for the track row, e.g. "bass • A minor • 96 BPM".
    pub fn info_line(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(role) = &self.role {
            parts.push(role.clone());
        }
        if let Some(key) = &self.key {
            parts.push(key.clone());
        }
        if let Some(bpm) = self.bpm {
            parts.push(format!("{:.0} BPM", bpm));
        }
        parts.join(" \u{2022} ")
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("Track {}", self.number)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[patch]]
id = "a1"
catalog_number = 1
name = "Funky Groove"
tags = ["funk", "mellow"]
style = "funk"

[[patch.track]]
number = 1
file = "wav/a1-t1.wav"
role = "bass"
key = "A minor"
bpm = 96.0

[[patch.track]]
number = 2
file = "wav/a1-t2.wav"
role = "drums"

[[patch]]
id = "b2"
catalog_number = 2
name = "Ambient Pad"
"#;

    #[test]
    fn parses_patches_in_order() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.patches()[0].id, "a1");
        assert_eq!(catalog.patches()[0].tracks.len(), 2);
        assert_eq!(catalog.patches()[1].tracks.len(), 0);
    }

    #[test]
    fn searchable_text_includes_tags_and_roles() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        let text = catalog.patches()[0].searchable_text();
        assert!(text.contains("funky groove"));
        assert!(text.contains("mellow"));
        assert!(text.contains("drums"));
    }

    #[test]
    fn lookups_by_id_and_number() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        assert_eq!(catalog.get("b2").unwrap().name, "Ambient Pad");
        assert_eq!(catalog.position_of("b2"), Some(1));
        assert_eq!(catalog.by_catalog_number(1).unwrap().id, "a1");
        assert!(catalog.get("zz").is_none());
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(Catalog::parse("").is_err());
    }

    #[test]
    fn track_info_line_formats_available_fields() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        let tracks = &catalog.patches()[0].tracks;
        assert_eq!(tracks[0].info_line(), "bass \u{2022} A minor \u{2022} 96 BPM");
        assert_eq!(tracks[1].info_line(), "drums");
    }

    #[test]
    fn relative_paths_resolve_against_catalog_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(
            catalog.patches()[0].tracks[0].file,
            dir.path().join("wav/a1-t1.wav")
        );
    }
}
