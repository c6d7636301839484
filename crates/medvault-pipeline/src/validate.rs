//! Content validation for uploaded artifacts
//!
//! Pure checks over the raw bytes and the declared media type. The declared
//! type is never trusted alone: executable signatures are rejected whatever
//! the caller claims, and types with a well-known header must actually
//! carry it. Failure is reported synchronously and never retried.

use medvault_core::{Result, VaultError};

/// Byte prefixes of executable and container formats we refuse to store,
/// regardless of declared media type.
const DENIED_SIGNATURES: &[(&[u8], &str)] = &[
    (b"MZ", "PE executable"),
    (b"\x7fELF", "ELF executable"),
    (&[0xfe, 0xed, 0xfa, 0xce], "Mach-O executable"),
    (&[0xfe, 0xed, 0xfa, 0xcf], "Mach-O executable"),
    (&[0xce, 0xfa, 0xed, 0xfe], "Mach-O executable"),
    (&[0xcf, 0xfa, 0xed, 0xfe], "Mach-O executable"),
    (&[0xca, 0xfe, 0xba, 0xbe], "Java class or Mach-O fat binary"),
];

fn declared_type_mismatch(bytes: &[u8], media_type: &str) -> Option<&'static str> {
    match media_type.to_ascii_lowercase().as_str() {
        "application/pdf" => (!bytes.starts_with(b"%PDF-")).then_some("missing %PDF- header"),
        "image/png" => (!bytes.starts_with(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a]))
            .then_some("missing PNG header"),
        "image/jpeg" => {
            (!bytes.starts_with(&[0xff, 0xd8, 0xff])).then_some("missing JPEG header")
        }
        "image/gif" => (!bytes.starts_with(b"GIF8")).then_some("missing GIF header"),
        // DICOM: 128-byte preamble then the "DICM" marker.
        "application/dicom" => {
            (bytes.len() < 132 || &bytes[128..132] != b"DICM").then_some("missing DICM marker")
        }
        // No well-known header for this type; nothing further to check.
        _ => None,
    }
}

/// Validate raw upload bytes against the declared media type.
///
/// # Errors
///
/// `ValidationRejected` when the content is empty, exceeds `max_bytes`,
/// carries a denied executable signature, or fails the header check for its
/// declared type.
pub fn validate(bytes: &[u8], declared_media_type: &str, max_bytes: u64) -> Result<()> {
    if bytes.is_empty() {
        return Err(VaultError::validation_rejected("empty upload"));
    }
    if bytes.len() as u64 > max_bytes {
        return Err(VaultError::validation_rejected(format!(
            "{} bytes exceeds the {} byte ceiling",
            bytes.len(),
            max_bytes
        )));
    }
    for (signature, kind) in DENIED_SIGNATURES {
        if bytes.starts_with(signature) {
            return Err(VaultError::validation_rejected(format!(
                "content matches denied signature: {kind}"
            )));
        }
    }
    if let Some(reason) = declared_type_mismatch(bytes, declared_media_type) {
        return Err(VaultError::validation_rejected(format!(
            "declared {declared_media_type} but {reason}"
        )));
    }
    Ok(())
}
