//! Built-in class profiles and the autotiler selection.

use tracing::debug;

use crate::classes::{RemovalSpec, MATCH_THRESHOLD};
use crate::error::ProfileError;
use crate::tile::{DEFAULT_TILE_MPP, DEFAULT_TILE_SIZE};

use super::class_profile::{ClassProfile, NonLesionColor, Tissue, DEFAULT_MODEL_TYPE};

/// Names accepted by [`builtin`].
pub const BUILTIN_PROFILES: [&str; 4] = [
    "nine_class",
    "forty_two_class_custom",
    "clinical_trials_ov",
    "eighty_class_blank_filter",
];

/// Look up a built-in profile by name.
pub fn builtin(name: &str) -> Result<ClassProfile, ProfileError> {
    match name {
        "nine_class" => Ok(nine_class()),
        "forty_two_class_custom" => Ok(forty_two_class_custom()),
        "clinical_trials_ov" => Ok(clinical_trials_ov()),
        "eighty_class_blank_filter" => Ok(eighty_class_blank_filter()),
        other => Err(ProfileError::UnknownProfile(other.to_string())),
    }
}

fn profile(
    tissue: Tissue,
    folder_name: &str,
    non_lesion: &[(&str, &str)],
    classes: &[&str],
) -> ClassProfile {
    ClassProfile {
        tissue,
        folder_name: folder_name.to_string(),
        mpp: DEFAULT_TILE_MPP,
        tile_size: DEFAULT_TILE_SIZE,
        model_type: DEFAULT_MODEL_TYPE.to_string(),
        deprecated_model_type: true,
        lesion_color: Some("brown".to_string()),
        non_lesion_colormaps: Some(
            non_lesion
                .iter()
                .map(|(class, color)| NonLesionColor::new(*class, *color))
                .collect(),
        ),
        classes: classes.iter().map(|c| c.to_string()).collect(),
        colormaps: None,
    }
}

/// Brain autotiler: nine coarse tissue classes.
pub fn nine_class() -> ClassProfile {
    profile(
        Tissue::Brain,
        "9_classes",
        &[
            ("a_blank", "white"),
            ("b_white", "green"),
            ("c_grey", "grey"),
            ("m_necrosis", "blue"),
            ("n_blood", "red"),
            ("o_surgical", "orange"),
            ("r_dura", "purple"),
            ("s_cerebellum", "yellow"),
        ],
        &[
            "a_blank",
            "b_white",
            "c_grey",
            "l_lesion",
            "m_necrosis",
            "n_blood",
            "o_surgical",
            "r_dura",
            "s_cerebellum",
        ],
    )
}

const BRAIN_NON_LESION: [(&str, &str); 14] = [
    ("Salivary Gland", "green"),
    ("Acute Hematoma", "red"),
    ("Crush Artifact", "yellow"),
    ("Blank", "white"),
    ("White", "blue"),
    ("Gray", "grey"),
    ("Muscle", "purple"),
    ("Bone Marrow", "cyan"),
    ("Necrosis", "magenta"),
    ("Surgical", "pink"),
    ("Spinal Disc", "navy"),
    ("Dura", "beige"),
    ("Cerebellum", "orange"),
    ("Lymph Node", "black"),
];

/// Brain diagnostic model with custom tumor classes.
pub fn forty_two_class_custom() -> ClassProfile {
    profile(
        Tissue::Brain,
        "42_classes_custom",
        &BRAIN_NON_LESION,
        &[
            "Abscess",
            "Salivary Gland",
            "Acute Hematoma",
            "Choroid Plexus Papilloma",
            "Crush Artifact",
            "Lymphoma",
            "Blank",
            "White",
            "Chondrosarcoma",
            "Chronic Hematoma",
            "Clear Cell Renal Cell Carcinoma",
            "Gray",
            "DNET",
            "Chordoma",
            "Muscle",
            "Ganglioglioma",
            "Glioma, WHO 2-4",
            "Psammomatous Meningioma",
            "Bone Marrow",
            "Meningioma",
            "Metastatic Carcinoma",
            "Necrosis",
            "Neurofibroma",
            "Surgical",
            "Paraganglioma",
            "Plasmacytoma",
            "Spinal Disc",
            "Schwannoma",
            "Dura",
            "Sarcoma",
            "Small Blue Cell Tumor",
            "Cerebellum",
            "Hemangioblastoma",
            "Glioma, WHO 1",
            "Myxopapillary",
            "Epidermoid Cyst",
            "Malignant Melanoma",
            "Radiation Necrosis",
            "Lymph Node",
        ],
    )
}

/// Ovarian autotiler and clinical trial model.
pub fn clinical_trials_ov() -> ClassProfile {
    profile(
        Tissue::Ovarian,
        "clinical_trials_ov_3",
        &[
            ("Blank", "white"),
            ("Marker", "white"),
            ("Adipose Tissue", "blue"),
            ("Necrosis", "red"),
            ("Normal Ovarian Stroma", "grey"),
            ("Normal Glandular Tissue", "cyan"),
            ("Inflammatory Cells", "yellow"),
        ],
        &[
            "Blank",
            "Normal Glandular Tissue",
            "Adipose Tissue",
            "Necrosis",
            "Normal Ovarian Stroma",
            "Ovarian Serous Adenocarcinoma",
            "Marker",
            "Inflammatory Cells",
        ],
    )
}

/// Brain diagnostic model trained with a blank filter.
pub fn eighty_class_blank_filter() -> ClassProfile {
    let mut non_lesion = BRAIN_NON_LESION;
    // Spinal disc is drawn brown in this model's reports
    non_lesion[10] = ("Spinal Disc", "brown");

    profile(
        Tissue::Brain,
        "80_class_blank_filter",
        &non_lesion,
        &[
            "Abscess",
            "Salivary Gland",
            "Acute Hematoma",
            "Squamous Cell Carcinoma",
            "Choroid Plexus Papilloma",
            "Papillary Craniopharyngioma",
            "Adamantinomatous Craniopharyngioma",
            "Crush Artifact",
            "Lymphoma",
            "Atypical Meningioma",
            "Blank",
            "White",
            "Chondrosarcoma",
            "Chronic Hematoma",
            "Clear Cell Renal Cell Carcinoma",
            "Gray",
            "DNET",
            "Chordoma",
            "Ependymoma",
            "Muscle",
            "Adipose",
            "Ganglioglioma",
            "PilocyticAstrocytoma",
            "Diffuse Astrocytoma, IDH-mut",
            "Diffuse Astrocytoma, IDH-WT",
            "Anaplastic Astrocytoma, IDH-mut",
            "Anaplastic Astrocytoma, IDH-WT",
            "Diffuse Oligodendroglioma, IDH-mut, 1p19-codel",
            "Anaplastic Oligodendroglioma, IDH-mut, 1p19-codel",
            "Glioblastoma, IDH-wt",
            "Glioblastoma, IDH-mut",
            "Anaplastic Meningioma",
            "Angiomatous Meningioma",
            "Chordoid Meningioma",
            "ClearCellMeningioma",
            "Fibrous Meningioma",
            "Meningothelial Meningioma",
            "Microcystic Meningioma",
            "Papillary Meningioma",
            "Psammomatous Meningioma",
            "Secretory Meningioma",
            "Transitional Meningioma",
            "Bone Marrow",
            "Hemangiopericytoma",
            "Liposarcoma - Grade III",
            "Liposarcoma - High Grade",
            "Liposarcoma - Myxoid",
            "Lung Adenocarcinoma",
            "Medulloblastoma",
            "Breast Adenocarcinoma",
            "Colorectal Adenocarcinoma",
            "Prostate Adenocarcinoma",
            "MPNST",
            "Necrosis",
            "Neurocytoma",
            "Neurofibroma",
            "Surgical",
            "Paraganglioma",
            "Pituitary Adenoma",
            "Plasmacytoma",
            "Spinal Disc",
            "Schwannoma",
            "Dura",
            "Sarcoma - Ewing",
            "Sarcoma - High Grade",
            "Small Cell Carcinoma",
            "Cerebellum",
            "Hemangioblastoma",
            "Subependymoma",
            "Myxopapillary Ependymoma",
            "Epidermoid Cyst",
            "Malignant Melanoma",
            "Radiation Necrosis",
            "Lymph Node",
        ],
    )
}

// =============================================================================
// Autotiler
// =============================================================================

/// Profile used to find lesion tiles for a tissue, with its match threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct AutotilerConfig {
    pub profile: ClassProfile,

    /// Minimum fuzzy score for class removal
    pub threshold: u8,
}

impl AutotilerConfig {
    /// Select the autotiler for `mode` (`"brain"` or `"ovarian"`).
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownMode`] for any other mode.
    pub fn for_mode(mode: &str) -> Result<Self, ProfileError> {
        let profile = match mode.parse::<Tissue>()? {
            Tissue::Brain => nine_class(),
            Tissue::Ovarian => clinical_trials_ov(),
        };

        debug!(
            "*** - Using {} model ({}) as autotiler - ***",
            mode,
            profile.identity()
        );

        Ok(Self {
            profile,
            threshold: MATCH_THRESHOLD,
        })
    }

    /// Removal of `patterns` at this autotiler's threshold.
    pub fn removal_spec<I, S>(&self, patterns: I) -> RemovalSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RemovalSpec::new(patterns).with_threshold(self.threshold)
    }

    /// Class positions excluded from the lesion confidence.
    pub fn non_lesion_indices(&self) -> Vec<usize> {
        self.profile.non_lesion_indices()
    }
}

// =============================================================================
// Tests
// =============================================================================
