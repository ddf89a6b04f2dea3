// SPDX-License-Identifier: GPL-3.0-only
use serde::de::IgnoredAny;

/// Check that `bytes` holds one complete JSON document
///
/// The document is walked but nothing is kept, so this is cheap on memory even
/// for large text maps.
pub fn is_well_formed(bytes: &[u8]) -> bool {
    serde_json::from_slice::<IgnoredAny>(bytes).is_ok()
}
