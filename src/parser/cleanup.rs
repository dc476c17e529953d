use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Deletes intermediate chunk files after a successful merge.
///
/// Deletion is best-effort: individual failures are logged as warnings and do
/// not fail the conversion, since the final output is already on disk. With
/// `should_cleanup` false the intermediates are left in place, which is useful
/// when inspecting what each batch contained.
pub fn cleanup_chunks(chunk_files: &[PathBuf], should_cleanup: bool) {
    if !should_cleanup {
        info!("Chunk cleanup skipped (--keep-chunks)");
        return;
    }

    let mut deleted = 0;
    let mut errors = 0;

    for path in chunk_files {
        match fs::remove_file(path) {
            Ok(_) => {
                deleted += 1;
            }
            Err(e) => {
                errors += 1;
                warn!(
                    chunk_file = %path.display(),
                    error = %e,
                    "Failed to delete chunk file"
                );
            }
        }
    }

    info!(
        deleted = deleted,
        errors = errors,
        "Chunk cleanup completed"
    );
}
