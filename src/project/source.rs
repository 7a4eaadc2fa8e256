//! Source file classification and placement

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{PioBrewError, Result};
use crate::project::ini::CONFIG_FILE_NAME;

/// Extensions accepted as a firmware entry point
pub const SOURCE_EXTENSIONS: &[&str] = &["ino", "pde", "cpp", "c", "cc", "cxx", "s"];

/// Conventional source folder of a PlatformIO project
pub const SOURCE_DIR: &str = "src";

/// Extension given to buffers saved on the user's behalf
pub const SKETCH_EXTENSION: &str = "ino";

pub fn is_firmware_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// File sits in `<root>/src/` and `<root>/platformio.ini` exists
pub fn has_native_layout(path: &Path) -> bool {
    native_root(path).is_some()
}

fn native_root(path: &Path) -> Option<PathBuf> {
    let dir = path.parent()?;
    if dir.file_name()? != SOURCE_DIR {
        return None;
    }
    let root = dir.parent()?;
    root.join(CONFIG_FILE_NAME)
        .exists()
        .then(|| root.to_path_buf())
}

/// Directory the external tool runs in for this file.
///
/// Native projects use their root: the directory holding `src/` when the file
/// already sits in one, else the sketch directory itself. Other files get a private directory
/// below `build_dir`, named after the file stem, with `src_dir` pointing back.
pub fn working_directory(path: &Path, native: bool, build_dir: &Path) -> PathBuf {
    if let Some(root) = native_root(path) {
        return root;
    }
    let sketch_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    if native {
        return match sketch_dir.parent() {
            Some(root) if sketch_dir.file_name().is_some_and(|n| n == SOURCE_DIR) => {
                root.to_path_buf()
            }
            _ => sketch_dir,
        };
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sketch".to_string());
    build_dir.join(stem)
}

/// Write an unsaved buffer to `<temp_dir>/<secs>/src/<secs>.ino`
pub fn save_buffer(temp_dir: &Path, contents: &str) -> Result<PathBuf> {
    let stamp = chrono::Utc::now().timestamp().to_string();

    let mut name = stamp.clone();
    let mut attempt = 1;
    while temp_dir.join(&name).exists() {
        name = format!("{}-{}", stamp, attempt);
        attempt += 1;
    }

    let src_dir = temp_dir.join(&name).join(SOURCE_DIR);
    fs::create_dir_all(&src_dir)?;
    let file_path = src_dir.join(format!("{}.{}", name, SKETCH_EXTENSION));
    fs::write(&file_path, contents)?;

    log::debug!("Saved unsaved buffer to {}", file_path.display());
    Ok(file_path)
}

/// Move the file into `<sketch_dir>/src/`, returning the new path
pub fn relocate_into_src(path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| PioBrewError::FileRelocation {
        from: path.to_path_buf(),
        to: PathBuf::new(),
        reason: "path has no file name".to_string(),
    })?;
    let sketch_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let target = sketch_dir.join(SOURCE_DIR).join(file_name);

    let relocation_error = |reason: String| PioBrewError::FileRelocation {
        from: path.to_path_buf(),
        to: target.clone(),
        reason,
    };

    if target.exists() {
        return Err(relocation_error("destination already exists".to_string()));
    }
    fs::create_dir_all(sketch_dir.join(SOURCE_DIR)).map_err(|e| relocation_error(e.to_string()))?;
    fs::rename(path, &target).map_err(|e| relocation_error(e.to_string()))?;

    log::info!("Moved {} to {}", path.display(), target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_firmware_extensions() {
        assert!(is_firmware_source(Path::new("/p/blink.ino")));
        assert!(is_firmware_source(Path::new("/p/main.CPP")));
        assert!(!is_firmware_source(Path::new("/p/notes.txt")));
        assert!(!is_firmware_source(Path::new("/p/Makefile")));
    }

    #[test]
    fn test_native_layout_requires_ini_next_to_src() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("src").join("main.cpp");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "void setup(){}").unwrap();

        assert!(!has_native_layout(&file));
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert!(has_native_layout(&file));
        assert_eq!(
            working_directory(&file, false, Path::new("/build")),
            temp_dir.path()
        );
    }

    #[test]
    fn test_working_directory_for_loose_files() {
        let file = Path::new("/sketches/blink/blink.ino");
        assert_eq!(
            working_directory(file, false, Path::new("/build")),
            PathBuf::from("/build/blink")
        );
        assert_eq!(
            working_directory(file, true, Path::new("/build")),
            PathBuf::from("/sketches/blink")
        );
    }

    #[test]
    fn test_native_file_in_src_without_ini_uses_project_root() {
        let file = Path::new("/tmp/1792399295/src/1792399295.ino");
        assert_eq!(
            working_directory(file, true, Path::new("/build")),
            PathBuf::from("/tmp/1792399295")
        );
        assert_eq!(
            working_directory(file, false, Path::new("/build")),
            PathBuf::from("/build/1792399295")
        );
    }

    #[test]
    fn test_save_buffer_generates_src_path() {
        let temp_dir = TempDir::new().unwrap();
        let first = save_buffer(temp_dir.path(), "void loop(){}").unwrap();
        let second = save_buffer(temp_dir.path(), "void loop(){}").unwrap();

        assert_ne!(first, second);
        assert_eq!(first.parent().unwrap().file_name().unwrap(), SOURCE_DIR);
        assert_eq!(first.extension().unwrap(), SKETCH_EXTENSION);
        assert_eq!(fs::read_to_string(&first).unwrap(), "void loop(){}");
    }

    #[test]
    fn test_relocate_into_src() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("blink.ino");
        fs::write(&file, "x").unwrap();

        let moved = relocate_into_src(&file).unwrap();
        assert_eq!(moved, temp_dir.path().join("src").join("blink.ino"));
        assert!(!file.exists());
        assert!(moved.exists());
    }

    #[test]
    fn test_relocate_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("blink.ino");
        fs::write(&file, "new").unwrap();
        fs::create_dir_all(temp_dir.path().join("src")).unwrap();
        fs::write(temp_dir.path().join("src").join("blink.ino"), "old").unwrap();

        let err = relocate_into_src(&file).unwrap_err();
        assert!(matches!(err, PioBrewError::FileRelocation { .. }));
        assert!(file.exists());
    }
}
