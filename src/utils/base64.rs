//! Encoding of base 64.
//!
//! Base 64 is defined in [RFC 4648]. Only encoding is needed here, for the
//! presentation form of RRSIG signatures and DNSKEY public keys.
//!
//! [RFC 4648]: https://tools.ietf.org/html/rfc4648

/// The alphabet of base64.
const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encodes octets in base64 with padding.
#[must_use]
pub fn encode_string(data: &[u8]) -> String {
    let mut res = String::with_capacity(data.len().div_ceil(3) * 4);
    let mut chunks = data.chunks_exact(3);
    for chunk in &mut chunks {
        let buf =
            u32::from(chunk[0]) << 16 | u32::from(chunk[1]) << 8
                | u32::from(chunk[2]);
        for shift in [18, 12, 6, 0] {
            res.push(ALPHABET[(buf >> shift) as usize & 0x3F] as char);
        }
    }
    match chunks.remainder() {
        [a] => {
            let buf = u32::from(*a) << 16;
            res.push(ALPHABET[(buf >> 18) as usize & 0x3F] as char);
            res.push(ALPHABET[(buf >> 12) as usize & 0x3F] as char);
            res.push_str("==");
        }
        [a, b] => {
            let buf = u32::from(*a) << 16 | u32::from(*b) << 8;
            res.push(ALPHABET[(buf >> 18) as usize & 0x3F] as char);
            res.push(ALPHABET[(buf >> 12) as usize & 0x3F] as char);
            res.push(ALPHABET[(buf >> 6) as usize & 0x3F] as char);
            res.push('=');
        }
        _ => {}
    }
    res
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode() {
        // The test vectors from RFC 4648, section 10.
        assert_eq!(encode_string(b""), "");
        assert_eq!(encode_string(b"f"), "Zg==");
        assert_eq!(encode_string(b"fo"), "Zm8=");
        assert_eq!(encode_string(b"foo"), "Zm9v");
        assert_eq!(encode_string(b"foob"), "Zm9vYg==");
        assert_eq!(encode_string(b"fooba"), "Zm9vYmE=");
        assert_eq!(encode_string(b"foobar"), "Zm9vYmFy");
    }
}
