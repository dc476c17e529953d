use std::path::{Path, PathBuf};

/// Recursively collects `.xml` files in a directory (including subdirs).
///
/// Used by the directory-input mode, where every feed file found becomes its
/// own Parquet table. The result is sorted so repeated runs process files in
/// a stable order.
pub fn collect_xmls(dir: &Path) -> Vec<PathBuf> {
    let mut v = Vec::with_capacity(20);
    let walker = walkdir::WalkDir::new(dir).into_iter();
    for entry in walker.flatten() {
        if entry.file_type().is_file() {
            if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
                if ext.eq_ignore_ascii_case("xml") {
                    v.push(entry.path().to_path_buf());
                }
            }
        }
    }
    v.sort();
    v
}
