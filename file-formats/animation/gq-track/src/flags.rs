//! Validation of partially understood bit fields

/// Logs a warning if `value` has any bits set outside of `mask`.
///
/// The value is never modified, unknown bits are kept so that saving
/// reproduces the original data. Returns true if no unknown bits were set.
pub fn warn_about_invalid_bit_flags(value: u32, mask: u32, context: &str) -> bool {
    let unknown = value & !mask;
    if unknown == 0 {
        return true;
    }

    log::warn!(
        "{context}: flags {value:#X} contain unsupported bits {unknown:#X} (supported mask: {mask:#X})"
    );
    false
}
