//! Static lookup tables: demo data sources, person codes, and pre-rendered
//! chart assets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Mapping from the user-visible (person, day) selection to the opaque data
/// URL handed to the prediction service. The URL is never shown to the user.
#[derive(Debug, Clone)]
pub struct DataOptions {
    map: HashMap<(String, String), String>,
}

impl DataOptions {
    /// The demo datasets currently wired up.
    pub fn builtin() -> Self {
        let mut options = Self::empty();
        options.insert(
            "Person 8",
            "Day 3",
            "https://drive.google.com/file/d/1rGpElJXOn7-gUVIKGGTlnSWoqWfbqNTB/view?usp=share_link",
        );
        options
    }

    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn insert(&mut self, person: &str, day: &str, url: &str) {
        self.map.insert((person.to_string(), day.to_string()), url.to_string());
    }

    pub fn url_for(&self, person: &str, day: &str) -> Option<&str> {
        self.map.get(&(person.to_string(), day.to_string())).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for DataOptions {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Integer code used by the fused-prediction endpoint path, keyed on the
/// person label shown in the selector.
pub fn person_code(person: &str) -> Option<u32> {
    match person {
        "Person 1" => Some(1),
        "Person 2" => Some(2),
        "Person 3" => Some(3),
        "Person 4" => Some(4),
        "Person 5" => Some(5),
        "Person 6" => Some(6),
        "Person 7" => Some(7),
        "Person 8" => Some(8),
        "Person 9" => Some(9),
        _ => None,
    }
}

/// Filenames tried for a person's pre-rendered chart, most specific first.
fn chart_candidates(code: u32) -> [String; 3] {
    [
        format!("person_{}_fusion.png", code),
        format!("fusion_person_{}.png", code),
        format!("person_{}.png", code),
    ]
}

/// Locate a pre-rendered chart asset for `code`, probing every candidate
/// filename in every candidate directory in order. `None` means the caller
/// should show an informational placeholder instead.
pub fn chart_asset_in(dirs: &[impl AsRef<Path>], code: u32) -> Option<PathBuf> {
    for name in chart_candidates(code) {
        for dir in dirs {
            let path = dir.as_ref().join(&name);
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}
