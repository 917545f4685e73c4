use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use plotters::style::{register_font, FontStyle};
use tracing::{info, warn};

/// Family every board text style asks for.
pub const FONT_FAMILY: &str = "sans-serif";

/// Outcome per font file, failures included, so a bad file is read at most once.
static REGISTERED: Lazy<Mutex<HashMap<PathBuf, bool>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Registers the font at `path` for board text. Returns false when no usable
/// font is available, in which case the board is drawn without text.
pub fn ensure_font(path: Option<&Path>) -> bool {
    let Some(path) = path else {
        warn!("no export.font_path configured; board text will be omitted");
        return false;
    };
    let Ok(mut registered) = REGISTERED.lock() else {
        return false;
    };
    if let Some(usable) = registered.get(path) {
        return *usable;
    }
    let usable = register_file(path);
    registered.insert(path.to_path_buf(), usable);
    usable
}

fn register_file(path: &Path) -> bool {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("failed reading font {}: {err}; board text will be omitted", path.display());
            return false;
        }
    };
    // The font registry keeps a 'static reference, so each distinct file is
    // leaked once.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
        Ok(()) => {
            info!("registered board font {}", path.display());
            true
        }
        Err(_) => {
            warn!("unusable font {}; board text will be omitted", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_disables_text() {
        assert!(!ensure_font(None));
        assert!(!ensure_font(Some(Path::new("/definitely/not/here.ttf"))));
    }

    #[test]
    fn garbage_font_disables_text_and_is_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(!ensure_font(Some(&path)));
        assert_eq!(REGISTERED.lock().unwrap().get(&path), Some(&false));
    }
}
