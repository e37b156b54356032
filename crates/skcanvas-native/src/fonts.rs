//! Font family registry
//!
//! The registry remembers every font directory it was pointed at and the
//! families found there. Refreshing rescans all directories and merges the
//! result; families are never removed while the process runs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use walkdir::WalkDir;

/// File extensions recognized as font files
pub const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "woff", "woff2"];

#[derive(Debug, Default)]
struct Inner {
    directories: Vec<PathBuf>,
    families: BTreeSet<String>,
}

/// Append-only set of font families discovered on disk
#[derive(Debug, Default)]
pub struct FontRegistry {
    inner: RwLock<Inner>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `dir` and rescans every registered directory
    ///
    /// Returns the number of known families afterwards.
    pub fn load_dir(&self, dir: &Path) -> usize {
        {
            let mut inner = self.write();
            if !inner.directories.iter().any(|d| d == dir) {
                tracing::debug!("registering font directory {}", dir.display());
                inner.directories.push(dir.to_path_buf());
            }
        }
        self.refresh()
    }

    /// Rescans all registered directories
    pub fn refresh(&self) -> usize {
        let directories = self.read().directories.clone();

        let mut found = BTreeSet::new();
        for dir in &directories {
            scan_dir(dir, &mut found);
        }

        let mut inner = self.write();
        inner.families.extend(found);
        tracing::debug!("font registry holds {} families", inner.families.len());
        inner.families.len()
    }

    /// Known families, sorted
    pub fn families(&self) -> Vec<String> {
        self.read().families.iter().cloned().collect()
    }

    /// Family lookup ignoring case, spaces, `-` and `_`
    ///
    /// `Noto Sans SC`, `noto-sans-sc` and `NotoSansSC` name the same family.
    pub fn contains(&self, family: &str) -> bool {
        let wanted = match_key(family);
        !wanted.is_empty() && self.read().families.iter().any(|f| match_key(f) == wanted)
    }

    pub fn len(&self) -> usize {
        self.read().families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn directories(&self) -> Vec<PathBuf> {
        self.read().directories.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn scan_dir(dir: &Path, found: &mut BTreeSet<String>) {
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if entry.file_type().is_file()
            && let Some(family) = family_name(entry.path())
        {
            found.insert(family);
        }
    }
}

/// Trailing file name segments that name a style rather than a family
const STYLE_WORDS: &[&str] = &[
    "regular", "bold", "italic", "oblique", "light", "medium", "thin", "black", "heavy",
    "book", "semibold", "demibold", "extrabold", "ultrabold", "extralight", "ultralight",
    "hairline", "condensed", "variable", "variablefont",
];

fn is_style_segment(segment: &str) -> bool {
    let segment = segment.to_ascii_lowercase();
    let segment = segment.split(['_', ',']).next().unwrap_or_default();
    !segment.is_empty()
        && STYLE_WORDS
            .iter()
            .any(|word| segment.starts_with(word) || segment.ends_with(word))
}

/// Family name of a font file
///
/// A trailing `-Style` segment is dropped, remaining `-` and `_` read as
/// spaces: `NotoSansSC-Regular.otf` → `NotoSansSC`,
/// `Noto-Sans-Mono-Bold.ttf` → `Noto Sans Mono`,
/// `Source_Han_Sans.ttf` → `Source Han Sans`.
/// Returns `None` for non-font files.
pub fn family_name(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    if !FONT_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    let family = match stem.rsplit_once('-') {
        Some((family, style)) if is_style_segment(style) => family,
        _ => stem,
    };

    let family = family
        .split(['-', '_'])
        .filter(|part| !part.trim().is_empty())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");
    (!family.is_empty()).then_some(family)
}

fn match_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
