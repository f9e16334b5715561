use std::path::{Path, PathBuf};

/// Derive the endpoint name for a worker connection.
///
/// The name lives inside the per-run temporary directory and carries the
/// current process id, so concurrently running editors never collide.
pub fn endpoint_path(temp_dir: impl AsRef<Path>, component: &str) -> PathBuf {
    temp_dir
        .as_ref()
        .join(format!("{component}-{}.sock", std::process::id()))
}
