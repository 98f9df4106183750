//! Codec between author-chosen plugin ID strings and compact numeric IDs.
//!
//! Parsing tries, in order: decimal, custom base-32, FNV-1a/64 hash. Only
//! values produced by `compact_plugin_id` are guaranteed to round-trip; the
//! decimal and hash paths are lossy by construction.

use std::sync::LazyLock;

use data_encoding::{Encoding, Specification};

/// Lowercase base-32 alphabet used for compact IDs, no padding.
static ID_ENCODING: LazyLock<Encoding> = LazyLock::new(build_id_encoding);

#[allow(clippy::expect_used)]
fn build_id_encoding() -> Encoding {
    let mut spec = Specification::new();
    spec.symbols.push_str("abcdefghijklmnopqrstuvwxyz234567");

    spec.encoding().expect("valid base32 specification")
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a64(input: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Derive the numeric host-side ID for a plugin info ID string.
pub fn parse_plugin_id(id: &str) -> u64 {
    if let Ok(numeric) = id.parse::<u64>() {
        return numeric;
    }

    if let Ok(decoded) = ID_ENCODING.decode(id.as_bytes()) {
        if decoded.len() <= 8 {
            let mut buf = [0u8; 8];
            buf[8 - decoded.len()..].copy_from_slice(&decoded);

            return u64::from_be_bytes(buf);
        }
    }

    fnv1a64(id)
}

/// Base-32 encoding of the numeric ID's big-endian bytes, leading zero
/// bytes stripped.
pub fn compact_plugin_id(id: u64) -> String {
    let bytes = id.to_be_bytes();

    let mut start = 0;
    while start < bytes.len() - 1 && bytes[start] == 0 {
        start += 1;
    }

    ID_ENCODING.encode(&bytes[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal() {
        assert_eq!(parse_plugin_id("123"), 123);
        assert_eq!(parse_plugin_id("0"), 0);
        assert_eq!(parse_plugin_id("18446744073709551615"), u64::MAX);
    }

    #[test]
    fn parse_base32() {
        assert_eq!(parse_plugin_id("ae"), 1);
        assert_eq!(parse_plugin_id("aaaaaaaaaaaac"), 1);
        assert_eq!(parse_plugin_id("aaaaaaaatclia"), 10_000_000);
    }

    #[test]
    fn parse_hashes_free_form_ids() {
        assert_eq!(parse_plugin_id("my-plugin"), 0x8eb6_a9b8_ea53_ef65);
        assert_eq!(parse_plugin_id("server-logger"), 0x5196_33e3_bd3a_577d);
    }

    #[test]
    fn compact_known_values() {
        assert_eq!(compact_plugin_id(0), "aa");
        assert_eq!(compact_plugin_id(1), "ae");
        assert_eq!(compact_plugin_id(10_000_000), "tclia");
        assert_eq!(compact_plugin_id(u64::MAX), "7777777777776");
    }

    #[test]
    fn compact_round_trips() {
        for id in [0, 1, 42, 10_000_000, i64::MAX as u64, u64::MAX] {
            assert_eq!(parse_plugin_id(&compact_plugin_id(id)), id);
        }
    }
}
