//! Class profiles.
//!
//! A [`ClassProfile`] describes one trained classifier: the tissue it was
//! trained on, its class labels in output order, the resolution and tile
//! size its tiles are extracted at, and which classes count as non-lesion.
//! Profiles are plain data; the built-in ones are constructed in code and
//! others can be loaded from JSON.
//!
//! [`AutotilerConfig`] picks the profile used to screen tiles for a tissue.

mod builtin;
mod class_profile;

pub use builtin::{
    builtin, clinical_trials_ov, eighty_class_blank_filter, forty_two_class_custom, nine_class,
    AutotilerConfig, BUILTIN_PROFILES,
};
pub use class_profile::{ClassProfile, NonLesionColor, Tissue, DEFAULT_MODEL_TYPE};
