//! Vendor documents encode integers as plain decimal, `0x`-prefixed hex, or
//! (SVD) `#`-prefixed binary. Shared by both dialect loaders.

pub(crate) fn parse_int(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = s.strip_prefix('#') {
        u64::from_str_radix(bin, 2).ok()
    } else {
        s.parse::<u64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_decimal_and_binary() {
        assert_eq!(parse_int("0x1000"), Some(0x1000));
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("#1010"), Some(0b1010));
        assert_eq!(parse_int("not a number"), None);
    }
}
