//! Stored filename generation.
//!
//! Every upload is written under a generated name:
//!
//! ```text
//! <field_name>-<unix_millis>-<random>-<original>
//! ```
//!
//! `random` is drawn uniformly from `[0, 1_000_000_000)`. Uniqueness is probabilistic only;
//! collisions are neither detected nor prevented.
//!
//! How `<original>` is derived from the client filename depends on [`FilenamePolicy`].

use crate::config::FilenamePolicy;
use crate::constants::{MAX_ORIGINAL_NAME_BYTES, RANDOM_SUFFIX_BOUND};
use chrono::Utc;
use rand::Rng;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Component, Path};

/// Build a stored filename from explicit parts.
///
/// This is the deterministic core of [`new_stored_filename`]; it performs no I/O and draws no
/// randomness.
///
/// # Arguments
/// * `field_name` - Multipart field name the file arrived under (normally `file`)
/// * `original` - Client-supplied filename (untrusted)
/// * `policy` - How `original` is embedded
/// * `unix_millis` - Milliseconds since the Unix epoch
/// * `random` - Random suffix, expected to be below [`RANDOM_SUFFIX_BOUND`]
pub fn generate_stored_filename(
    field_name: &str,
    original: &str,
    policy: FilenamePolicy,
    unix_millis: i64,
    random: u32,
) -> String {
    let original: Cow<'_, str> = match policy {
        FilenamePolicy::Verbatim => Cow::Borrowed(original),
        FilenamePolicy::Sanitise => Cow::Owned(sanitise_original_filename(original)),
    };
    format!("{field_name}-{unix_millis}-{random}-{original}")
}

/// Generate a fresh stored filename using the current time and a random suffix.
pub fn new_stored_filename(field_name: &str, original: &str, policy: FilenamePolicy) -> String {
    let unix_millis = Utc::now().timestamp_millis();
    let random = rand::thread_rng().gen_range(0..RANDOM_SUFFIX_BOUND);
    generate_stored_filename(field_name, original, policy, unix_millis, random)
}

/// Reduce a client filename to a readable hint that is safe to embed in a single path component.
///
/// - `/`, `\` and the reserved characters `< > : " | ? *` become `_`
/// - control characters are dropped
/// - the result is capped at [`MAX_ORIGINAL_NAME_BYTES`] bytes, cut on a char boundary
pub fn sanitise_original_filename(original: &str) -> String {
    let mut sanitised = String::with_capacity(original.len().min(MAX_ORIGINAL_NAME_BYTES));
    for c in original.chars().filter(|c| !c.is_control()) {
        let c = match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            other => other,
        };
        if sanitised.len() + c.len_utf8() > MAX_ORIGINAL_NAME_BYTES {
            break;
        }
        sanitised.push(c);
    }
    sanitised
}

/// Returns true if `name` is exactly one normal path component (no separators, no `.`/`..`).
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(component)), None) => component == OsStr::new(name),
        _ => false,
    }
}
