use plotters::style::{FontStyle, register_font};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Font shipped next to the binary by convention.
pub const BUNDLED_FONT: &str = "STKAITI.TTF";

const PLATFORM_FONTS: &[&str] = &[
    // Linux
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    // macOS
    "/System/Library/Fonts/Supplemental/Songti.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
    // Windows
    "C:\\Windows\\Fonts\\simkai.ttf",
    "C:\\Windows\\Fonts\\simhei.ttf",
    "C:\\Windows\\Fonts\\msyh.ttc",
];

// plotters keeps registered fonts for the life of the process, so each file
// is read and registered at most once.
fn registry() -> &'static Mutex<HashMap<PathBuf, String>> {
    static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, String>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Candidate font files in lookup order.
pub fn candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(std::iter::once(PathBuf::from(BUNDLED_FONT)))
        .chain(PLATFORM_FONTS.iter().map(PathBuf::from))
        .collect()
}

/// Registers the first usable font and returns the family name to draw
/// text with. `None` means no font could be loaded.
pub fn resolve(configured: Option<&Path>, family: &str) -> Option<String> {
    let mut registry = registry().lock().unwrap_or_else(PoisonError::into_inner);

    for path in candidates(configured) {
        if let Some(name) = registry.get(&path) {
            return Some(name.clone());
        }
        if !path.is_file() {
            continue;
        }
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot read font file");
                continue;
            }
        };

        let name = format!("{family}#{}", registry.len());
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match register_font(&name, FontStyle::Normal, bytes) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), font = %name, "registered font");
                registry.insert(path, name.clone());
                return Some(name);
            }
            Err(_) => {
                tracing::warn!(path = %path.display(), "not a usable font file");
            }
        }
    }

    tracing::warn!(
        family,
        "no font found; chart text will be omitted (place {BUNDLED_FONT} in the working directory or set a font path)"
    );
    None
}
