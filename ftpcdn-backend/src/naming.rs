//! Storage names and public URLs for uploaded files.

use chrono::{DateTime, Local};
use rand::Rng;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Extension of `original_name` from its last dot, dot included.
/// Empty when the name has no dot.
pub fn file_extension(original_name: &str) -> &str {
    match original_name.rfind('.') {
        Some(index) => &original_name[index..],
        None => "",
    }
}

/// `<8 hex chars>_<YYYYMMDDHHMMSS><extension>` for the current time.
///
/// Two uploads in the same second only collide if they also draw the same
/// 32-bit token; no retry is attempted.
pub fn generate_storage_name(extension: &str) -> String {
    storage_name_at(Local::now(), rand::thread_rng().gen::<u32>(), extension)
}

fn storage_name_at(now: DateTime<Local>, token: u32, extension: &str) -> String {
    format!("{:08x}_{}{}", token, now.format(TIMESTAMP_FORMAT), extension)
}

/// Join a CDN prefix and a storage name with exactly one slash
pub fn build_full_url(prefix: &str, storage_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), storage_name)
}

/// Location of a storage name inside the remote base directory
pub fn build_remote_path(base_path: &str, storage_name: &str) -> String {
    format!("{}/{}", base_path.trim_end_matches('/'), storage_name)
}
