use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Identity of one camera capture: a content hash of the submitted frame.
/// Object identity of the capture widget's value is too fragile a signal;
/// hashing the content keeps the dedup stable across UI re-renders.
pub fn frame_digest(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Idempotency guard for the scan session: per student code, the frame that
/// last incremented that student. One increment per captured frame; an
/// explicit clear forgets everything so the same physical frame can be
/// reprocessed.
#[derive(Default)]
pub struct ScanGuard {
    last_increment: HashMap<String, String>,
}

impl ScanGuard {
    pub fn new() -> ScanGuard {
        ScanGuard::default()
    }

    /// True when this frame already triggered an increment for this code.
    pub fn already_processed(&self, code: &str, digest: &str) -> bool {
        self.last_increment.get(code).map(|d| d.as_str()) == Some(digest)
    }

    pub fn mark_processed(&mut self, code: &str, digest: &str) {
        self.last_increment
            .insert(code.to_string(), digest.to_string());
    }

    pub fn clear(&mut self) {
        self.last_increment.clear();
    }
}
