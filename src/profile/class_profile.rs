//! Class profile records.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProfileError;
use crate::tile::{DEFAULT_TILE_MPP, DEFAULT_TILE_SIZE};

/// Architecture name used when a profile does not give one.
pub const DEFAULT_MODEL_TYPE: &str = "VGG19";

/// Color for background-like classes when no colormap is configured.
const WHITE: &str = "white";

/// Labels (lower-cased) drawn white by the fallback colormap.
const WHITE_CLASSES: [&str; 2] = ["blank", "marker"];

/// Fallback palette, cycled for classes that are not white.
const PALETTE: [&str; 12] = [
    "red", "green", "blue", "yellow", "cyan", "magenta", "orange", "purple", "pink", "navy",
    "beige", "black",
];

/// Tissue a profile's model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tissue {
    Brain,
    Ovarian,
}

impl Tissue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brain => "brain",
            Self::Ovarian => "ovarian",
        }
    }
}

impl fmt::Display for Tissue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tissue {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brain" => Ok(Self::Brain),
            "ovarian" => Ok(Self::Ovarian),
            other => Err(ProfileError::UnknownMode(other.to_string())),
        }
    }
}

/// Display color of a class that is not lesion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonLesionColor {
    pub class: String,
    pub color: String,
}

impl NonLesionColor {
    pub fn new(class: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            color: color.into(),
        }
    }
}

fn default_mpp() -> f64 {
    DEFAULT_TILE_MPP
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_model_type() -> String {
    DEFAULT_MODEL_TYPE.to_string()
}

/// A trained classifier's class set and how its output is tiled and shown.
///
/// Colormaps are plain color names; rendering them is up to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProfile {
    pub tissue: Tissue,

    /// Name of the model's folder within the tissue's collections
    pub folder_name: String,

    /// Resolution tiles are extracted at
    #[serde(default = "default_mpp")]
    pub mpp: f64,

    /// Output tile edge in pixels
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    #[serde(default = "default_model_type")]
    pub model_type: String,

    /// Model is stored as a single `.h5` file rather than a `.zip` archive
    #[serde(default)]
    pub deprecated_model_type: bool,

    #[serde(default)]
    pub lesion_color: Option<String>,

    /// Ordered colors of the non-lesion classes
    #[serde(default)]
    pub non_lesion_colormaps: Option<Vec<NonLesionColor>>,

    /// Labels in model output order
    pub classes: Vec<String>,

    /// Per-class colors, overriding the derived ones
    #[serde(default)]
    pub colormaps: Option<Vec<String>>,
}

impl ClassProfile {
    /// `{tissue}_{folder_name}`, also the name of the artifact collection.
    pub fn identity(&self) -> String {
        format!("{}_{}", self.tissue, self.folder_name)
    }

    /// Model file stem: `{identity}_{model_type}`.
    pub fn model_name(&self) -> String {
        format!("{}_{}", self.identity(), self.model_type)
    }

    /// One color per class.
    ///
    /// Explicit `colormaps` win. Otherwise, with both non-lesion colors and a
    /// lesion color, classes take their non-lesion color or the lesion
    /// color. Failing that, blank and marker classes are white and the rest
    /// cycle through a fixed palette.
    pub fn colormaps(&self) -> Vec<String> {
        if let Some(colormaps) = &self.colormaps {
            return colormaps.clone();
        }

        if let (Some(non_lesion), Some(lesion_color)) =
            (&self.non_lesion_colormaps, &self.lesion_color)
        {
            return self
                .classes
                .iter()
                .map(|class| {
                    non_lesion
                        .iter()
                        .find(|entry| &entry.class == class)
                        .map_or_else(|| lesion_color.clone(), |entry| entry.color.clone())
                })
                .collect();
        }

        let mut palette = PALETTE.iter().cycle();
        self.classes
            .iter()
            .map(|class| {
                if WHITE_CLASSES.contains(&class.to_lowercase().as_str()) {
                    WHITE.to_string()
                } else {
                    palette.next().map_or(WHITE, |c| *c).to_string()
                }
            })
            .collect()
    }

    /// Non-lesion class labels in colormap order.
    pub fn non_lesion_classes(&self) -> Vec<&str> {
        self.non_lesion_colormaps
            .iter()
            .flatten()
            .map(|entry| entry.class.as_str())
            .collect()
    }

    /// Positions of the non-lesion classes within `classes`, ascending.
    pub fn non_lesion_indices(&self) -> Vec<usize> {
        let non_lesion = self.non_lesion_classes();
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, class)| non_lesion.contains(&class.as_str()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Check that the profile is internally consistent.
    ///
    /// # Errors
    ///
    /// - [`ProfileError::MissingClasses`] if a non-lesion colormap names a
    ///   class that is not in `classes`
    /// - [`ProfileError::ColormapLength`] if explicit colormaps are not one
    ///   per class
    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut missing: Vec<String> = self
            .non_lesion_classes()
            .into_iter()
            .filter(|class| !self.classes.iter().any(|c| c == class))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(ProfileError::MissingClasses(missing));
        }

        if let Some(colormaps) = &self.colormaps {
            if colormaps.len() != self.classes.len() {
                return Err(ProfileError::ColormapLength {
                    colormaps: colormaps.len(),
                    classes: self.classes.len(),
                });
            }
        }

        Ok(())
    }

    /// Load and validate a profile from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let text = std::fs::read_to_string(path).map_err(|e| ProfileError::Read {
            path: path_str.clone(),
            message: e.to_string(),
        })?;
        let profile: Self = serde_json::from_str(&text).map_err(|e| ProfileError::Parse {
            path: path_str.clone(),
            message: e.to_string(),
        })?;
        profile.validate()?;

        debug!("Loaded profile {} from {}", profile.identity(), path_str);
        Ok(profile)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn small_profile() -> ClassProfile {
        ClassProfile {
            tissue: Tissue::Brain,
            folder_name: "3_classes".to_string(),
            mpp: DEFAULT_TILE_MPP,
            tile_size: DEFAULT_TILE_SIZE,
            model_type: DEFAULT_MODEL_TYPE.to_string(),
            deprecated_model_type: false,
            lesion_color: Some("brown".to_string()),
            non_lesion_colormaps: Some(vec![
                NonLesionColor::new("c_grey", "grey"),
                NonLesionColor::new("a_blank", "white"),
            ]),
            classes: vec!["a_blank".into(), "b_lesion".into(), "c_grey".into()],
            colormaps: None,
        }
    }

    #[test]
    fn test_identity_and_model_name() {
        let profile = small_profile();
        assert_eq!(profile.identity(), "brain_3_classes");
        assert_eq!(profile.model_name(), "brain_3_classes_VGG19");
    }

    #[test]
    fn test_colormaps_from_non_lesion() {
        assert_eq!(small_profile().colormaps(), vec!["white", "brown", "grey"]);
    }

    #[test]
    fn test_colormaps_fallback_palette() {
        let mut profile = small_profile();
        profile.non_lesion_colormaps = None;
        profile.classes = vec!["Blank".into(), "Tumor".into(), "MARKER".into(), "Stroma".into()];
        assert_eq!(profile.colormaps(), vec!["white", "red", "white", "green"]);
    }

    #[test]
    fn test_colormaps_explicit_override() {
        let mut profile = small_profile();
        profile.colormaps = Some(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(profile.colormaps(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_non_lesion_order() {
        let profile = small_profile();
        // Map order for classes, class-list order for indices
        assert_eq!(profile.non_lesion_classes(), vec!["c_grey", "a_blank"]);
        assert_eq!(profile.non_lesion_indices(), vec![0, 2]);
    }

    #[test]
    fn test_validate_missing_classes() {
        let mut profile = small_profile();
        profile
            .non_lesion_colormaps
            .as_mut()
            .unwrap()
            .push(NonLesionColor::new("z_dura", "purple"));
        match profile.validate() {
            Err(ProfileError::MissingClasses(missing)) => assert_eq!(missing, vec!["z_dura"]),
            other => panic!("expected MissingClasses, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_colormap_length() {
        let mut profile = small_profile();
        profile.colormaps = Some(vec!["white".into()]);
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::ColormapLength { colormaps: 1, classes: 3 })
        ));
    }

    #[test]
    fn test_tissue_parse() {
        assert_eq!("brain".parse::<Tissue>().unwrap(), Tissue::Brain);
        assert_eq!("ovarian".parse::<Tissue>().unwrap(), Tissue::Ovarian);
        let err = "lung".parse::<Tissue>().unwrap_err();
        assert_eq!(err.to_string(), "Mode lung unknown");
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{
            "tissue": "ovarian",
            "folder_name": "tiny",
            "classes": ["Blank", "Tumor"]
        }"#;
        let profile: ClassProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.mpp, DEFAULT_TILE_MPP);
        assert_eq!(profile.tile_size, DEFAULT_TILE_SIZE);
        assert_eq!(profile.model_type, "VGG19");
        assert!(!profile.deprecated_model_type);
        assert!(profile.non_lesion_indices().is_empty());
        assert_eq!(profile.colormaps(), vec!["white", "red"]);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&small_profile()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = ClassProfile::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, small_profile());
    }

    #[test]
    fn test_from_json_file_errors() {
        assert!(matches!(
            ClassProfile::from_json_file("/nonexistent/profile.json"),
            Err(ProfileError::Read { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        match ClassProfile::from_json_file(file.path()) {
            Err(ProfileError::Parse { path, .. }) => {
                assert_eq!(path, file.path().display().to_string());
            }
            other => panic!("expected Parse error, got {:?}", other),
        }
    }
}
