use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::error::AppError;

const MAX_FILENAME_BYTES: usize = 255;

fn control_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\x00-\x1F\x7F]").unwrap())
}

/// Reduce a client-supplied name to a single safe path component.
///
/// Directory parts are dropped on both separator styles, so `../../etc/passwd`
/// becomes `passwd`. Names that cannot be made safe are rejected.
pub fn sanitize_filename(raw: &str) -> Result<String, AppError> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::Validation(format!("Invalid file name: {:?}", raw)));
    }
    if name.starts_with('.') {
        return Err(AppError::Validation(format!(
            "Hidden file names are not accepted: {:?}",
            raw
        )));
    }
    if control_chars().is_match(name) {
        return Err(AppError::Validation(format!(
            "Invalid characters in file name: {:?}",
            raw
        )));
    }
    if name.len() > MAX_FILENAME_BYTES {
        return Err(AppError::Validation(format!(
            "File name longer than {} bytes",
            MAX_FILENAME_BYTES
        )));
    }

    Ok(name.to_string())
}

/// `report.pdf` -> `report-1a2b3c4d.pdf`, using the content's SHA-256.
pub fn with_hash_suffix(filename: &str, content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));
    let suffix = &digest[..8];
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, suffix, ext),
        _ => format!("{}-{}", filename, suffix),
    }
}
