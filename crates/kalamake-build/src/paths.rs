//! Path and list helpers shared by the resolver and the driver.

use rustc_hash::FxHashSet;
use std::hash::Hash;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Remove repeated items, keeping the first occurrence of each.
///
/// Applying it twice yields the same list as applying it once.
pub fn dedup<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = FxHashSet::default();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Whether a raw descriptor entry names a path rather than a bare name.
pub fn has_separator(entry: &str) -> bool {
    entry.contains('/') || entry.contains('\\')
}

/// Join a relative entry onto `base`; absolute entries are returned as-is.
pub fn absolutize(base: &Path, entry: &str) -> PathBuf {
    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Canonicalize an existing path.
///
/// Windows verbatim prefixes (`\\?\C:\`) are stripped because compiler
/// drivers reject them.
pub fn canonicalize(path: &Path) -> io::Result<PathBuf> {
    let canonical = path.canonicalize()?;
    Ok(strip_verbatim(canonical))
}

fn strip_verbatim(path: PathBuf) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path;
    };
    match text.strip_prefix(r"\\?\") {
        Some(rest) if !rest.starts_with("UNC") => PathBuf::from(rest),
        _ => path,
    }
}

/// Every regular file below `dir`, recursively, in sorted order.
///
/// Symlinked directories are followed, each real directory at most once.
/// Returned paths are not canonicalized.
pub fn collect_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut visited = FxHashSet::default();
    collect_into(dir, &mut files, &mut visited)?;
    files.sort();
    Ok(files)
}

fn collect_into(
    dir: &Path,
    files: &mut Vec<PathBuf>,
    visited: &mut FxHashSet<PathBuf>,
) -> io::Result<()> {
    if !visited.insert(dir.canonicalize()?) {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_into(&path, files, visited)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// Lower-case extension of a path without the dot.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether the file name of `path` ends with `suffix` (which includes the
/// dot and may span several extensions, such as `.dll.a`).
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dedup_keeps_first() {
        let list = vec!["b", "a", "b", "c", "a"];
        assert_eq!(dedup(list), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let list: Vec<String> = ["-O2", "-g", "-O2", "-Wall", "-g"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let once = dedup(list);
        let twice = dedup(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_collect_files_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("z.c"), "").unwrap();
        std::fs::write(dir.path().join("nested/a.c"), "").unwrap();
        std::fs::write(dir.path().join("b.c"), "").unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("b.c"),
                dir.path().join("nested/a.c"),
                dir.path().join("z.c"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_files_walks_each_directory_once() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/a.c"), "").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("nested/loop")).unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("nested/a.c")]);
    }

    #[test]
    fn test_has_suffix() {
        assert!(has_suffix(Path::new("out/app.dll.a"), ".dll.a"));
        assert!(has_suffix(Path::new("APP.EXE"), ".exe"));
        assert!(!has_suffix(Path::new("app"), ".exe"));
    }
}
