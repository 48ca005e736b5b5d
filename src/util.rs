use std::time::{SystemTime, UNIX_EPOCH};

const HEX: &[u8; 16] = b"0123456789abcdef";

#[inline]
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// `prefix` followed by the zero-padded 16-digit lowercase hex of `value`.
#[inline]
pub(crate) fn prefixed_hex_id(prefix: &str, value: u64) -> String {
    let mut out = String::with_capacity(prefix.len() + 16);
    out.push_str(prefix);
    let mut buf = [b'0'; 16];
    let mut rest = value;
    for slot in buf.iter_mut().rev() {
        *slot = HEX[(rest & 0x0f) as usize];
        rest >>= 4;
    }
    out.extend(buf.iter().map(|&byte| char::from(byte)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_hex_id_is_zero_padded() {
        assert_eq!(prefixed_hex_id("chatcmpl-", 0x1234_abcd), "chatcmpl-000000001234abcd");
        assert_eq!(prefixed_hex_id("", u64::MAX), "ffffffffffffffff");
    }

    #[test]
    fn unix_now_is_after_2020() {
        assert!(unix_now_secs() > 1_577_836_800);
    }
}
