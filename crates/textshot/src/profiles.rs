//! Named recognition profiles.
//!
//! A profile bundles the engine parameters for a recognition session with an
//! ordered list of preprocessing variants to try per image. The orchestrator
//! runs every variant and keeps the highest-confidence result, so the lists
//! are ordered cheapest-first.
//!
//! Parameter keys use the engine's native variable names. Keys prefixed
//! `tessjs_` drive the in-browser engine builds and are skipped by engines
//! that do not know them.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::engine::EngineParameters;
use crate::error::{Result, TextshotError};
use crate::preprocess::PreprocessConfig;

/// A named recognition profile.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Engine variables applied once per batch (and swapped during the MCQ
    /// sub-pass). Insertion order is preserved.
    pub engine_params: EngineParameters,
    /// Preprocessing variants, tried in order per image.
    pub configs: Vec<PreprocessConfig>,
}

/// Name/description pair for profile listings.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
}

fn params(pairs: &[(&str, &str)]) -> EngineParameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The untouched-source variant every profile starts with. Clean scans often
/// read better than any processed version of themselves.
fn passthrough() -> PreprocessConfig {
    PreprocessConfig::default()
}

static PROFILES: Lazy<Vec<Profile>> = Lazy::new(|| {
    vec![
        Profile {
            name: "fast",
            display_name: "Fast Mode",
            description: "Quick results with good accuracy",
            engine_params: params(&[
                ("tessedit_pageseg_mode", "3"),
                ("preserve_interword_spaces", "1"),
                ("tessjs_create_hocr", "0"),
                ("tessjs_create_tsv", "0"),
                ("textord_heavy_nr", "1"),
                ("textord_min_linesize", "3.0"),
            ]),
            configs: vec![
                passthrough(),
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 1.2,
                    threshold: 150,
                    sharpen: true,
                    ..PreprocessConfig::default()
                },
            ],
        },
        Profile {
            name: "balanced",
            display_name: "Balanced",
            description: "Good mix of speed and accuracy",
            engine_params: params(&[
                ("tessedit_pageseg_mode", "6"),
                ("preserve_interword_spaces", "1"),
                ("tessjs_create_hocr", "1"),
                ("tessjs_create_tsv", "1"),
                ("tessedit_fix_fuzzy_spaces", "1"),
                ("textord_min_linesize", "2.5"),
                ("tessedit_enable_doc_dict", "1"),
            ]),
            configs: vec![
                passthrough(),
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 1.3,
                    threshold: 150,
                    scale: 1.5,
                    deskew: true,
                    sharpen: true,
                    ..PreprocessConfig::default()
                },
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 1.4,
                    binarize: true,
                    threshold: 160,
                    scale: 1.8,
                    deskew: true,
                    denoise: true,
                    ..PreprocessConfig::default()
                },
            ],
        },
        Profile {
            name: "ultra-accurate",
            display_name: "Ultra Accurate",
            description: "Advanced precision with AI enhancement",
            engine_params: params(&[
                ("tessedit_pageseg_mode", "6"),
                ("tessedit_char_whitelist", ""),
                ("preserve_interword_spaces", "1"),
                ("tessjs_create_hocr", "1"),
                ("tessjs_create_tsv", "1"),
                ("textord_tabfind_find_tables", "1"),
                ("textord_tablefind_recognize_tables", "1"),
                ("tessedit_do_invert", "0"),
                ("tessedit_fix_fuzzy_spaces", "1"),
                ("textord_space_size_is_variable", "1"),
                ("tessedit_preserve_min_wd_len", "2"),
                ("tessedit_prefer_joined_punct", "0"),
                ("tessedit_write_block_separators", "1"),
                ("tessedit_write_rep_codes", "1"),
                ("tessedit_write_unlv", "1"),
                ("textord_min_linesize", "2.5"),
                ("textord_heavy_nr", "0"),
                ("hocr_font_info", "1"),
                ("tessedit_enable_doc_dict", "1"),
                ("tessedit_unrej_any_wd", "1"),
                ("tessedit_create_txt", "1"),
                ("tessedit_create_hocr", "1"),
                // Glyphs commonly hallucinated inside numbers.
                ("tessedit_char_blacklist", "il│|¦"),
                ("edges_max_children_per_outline", "40"),
                ("edges_children_per_grandchild", "10.0"),
            ]),
            configs: vec![
                passthrough(),
                // Clean text
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 1.5,
                    threshold: 150,
                    scale: 2.0,
                    deskew: true,
                    sharpen: true,
                    ..PreprocessConfig::default()
                },
                // Adaptive threshold
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 1.3,
                    binarize: true,
                    threshold: 150,
                    scale: 2.2,
                    deskew: true,
                    denoise: true,
                    adaptive_threshold: true,
                    ..PreprocessConfig::default()
                },
                // High contrast for difficult text
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 1.8,
                    binarize: true,
                    threshold: 180,
                    scale: 2.5,
                    deskew: true,
                    denoise: true,
                    adaptive_threshold: true,
                    sharpen: true,
                    ..PreprocessConfig::default()
                },
                // Dense question sheets
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 2.0,
                    binarize: true,
                    threshold: 200,
                    scale: 3.0,
                    deskew: true,
                    sharpen: true,
                    ..PreprocessConfig::default()
                },
            ],
        },
        Profile {
            name: "mcq",
            display_name: "MCQ",
            description: "Aptitude sheets with numbered questions and lettered options",
            engine_params: params(&[
                ("tessedit_pageseg_mode", "6"),
                ("preserve_interword_spaces", "1"),
                ("tessjs_create_tsv", "1"),
                ("tessedit_fix_fuzzy_spaces", "1"),
                ("textord_min_linesize", "2.5"),
                ("tessedit_enable_doc_dict", "1"),
            ]),
            configs: vec![
                passthrough(),
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 2.0,
                    binarize: true,
                    threshold: 200,
                    scale: 3.0,
                    deskew: true,
                    sharpen: true,
                    ..PreprocessConfig::default()
                },
                PreprocessConfig {
                    enabled: true,
                    grayscale: true,
                    contrast: 1.3,
                    binarize: true,
                    threshold: 150,
                    scale: 2.2,
                    deskew: true,
                    denoise: true,
                    adaptive_threshold: true,
                    ..PreprocessConfig::default()
                },
            ],
        },
    ]
});

/// Look up a profile by name.
pub fn get_profile(name: &str) -> Result<&'static Profile> {
    PROFILES
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| TextshotError::validation(format!("Unknown profile: '{}'", name)))
}

/// All registered profiles, in registration order.
pub fn list_profiles() -> Vec<ProfileInfo> {
    PROFILES
        .iter()
        .map(|p| ProfileInfo {
            name: p.name,
            display_name: p.display_name,
            description: p.description,
        })
        .collect()
}
