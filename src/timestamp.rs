use jiff::Timestamp;

/// Offset between the tick value embedded in a recovery GUID and a true
/// FILETIME. Reverse-engineered against real samples; kept as a separate
/// subtraction so future corrections stay auditable.
pub const GUID_FILETIME_ADJUSTMENT: u64 = 5_748_192_000_000_000;

/// 100-nanosecond ticks between 1601-01-01 and the Unix epoch.
pub const FILETIME_UNIX_EPOCH_TICKS: u64 = 116_444_736_000_000_000;

const TICKS_PER_SECOND: u64 = 10_000_000;

/// Extracts the creation time embedded in a dashed 36-character GUID string.
///
/// The tick count is scattered over fixed digit positions: reassembled it is
/// `"0" + s[15..18] + s[9..13] + s[0..8]`, a 16-hex-digit value in
/// 100-nanosecond units. Anything that is not 36 bytes of well-formed hex
/// decodes to `None`, the "Unknown" marker.
pub fn timestamp_from_guid(guid: &str) -> Option<Timestamp> {
    let b = guid.as_bytes();
    if b.len() != 36 {
        return None;
    }

    let mut hex = String::with_capacity(16);
    hex.push('0');
    hex.push_str(std::str::from_utf8(&b[15..18]).ok()?);
    hex.push_str(std::str::from_utf8(&b[9..13]).ok()?);
    hex.push_str(std::str::from_utf8(&b[0..8]).ok()?);

    let ticks = u64::from_str_radix(&hex, 16).ok()?;

    // Two distinct corrections: the first compensates for how the GUID's
    // time component is generated relative to FILETIME, the second rebases
    // FILETIME onto the Unix epoch. Do not fold them together.
    let filetime = ticks.checked_sub(GUID_FILETIME_ADJUSTMENT)?;
    let unix_seconds = filetime.checked_sub(FILETIME_UNIX_EPOCH_TICKS)? / TICKS_PER_SECOND;

    Timestamp::from_second(unix_seconds as i64).ok()
}
