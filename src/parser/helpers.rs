//! Sign extension for the packed fixed-width fields of the tag encodings.

/// Sign-extend the low `bits` bits of `value` (two's complement) to i32
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    debug_assert!((1..=32).contains(&bits));
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend_small_widths() {
        assert_eq!(sign_extend(0, 2), 0);
        assert_eq!(sign_extend(1, 2), 1);
        assert_eq!(sign_extend(2, 2), -2);
        assert_eq!(sign_extend(3, 2), -1);
        assert_eq!(sign_extend(7, 4), 7);
        assert_eq!(sign_extend(8, 4), -8);
        assert_eq!(sign_extend(31, 6), 31);
        assert_eq!(sign_extend(32, 6), -32);
    }

    #[test]
    fn test_sign_extend_wide_widths() {
        assert_eq!(sign_extend(0xff, 8), -1);
        assert_eq!(sign_extend(0x7fff, 16), 32767);
        assert_eq!(sign_extend(0x8000, 16), -32768);
        assert_eq!(sign_extend(0x80_0000, 24), -8_388_608);
        assert_eq!(sign_extend(0xff_ffff, 24), -1);
        assert_eq!(sign_extend(0xffff_ffff, 32), -1);
    }

    #[test]
    fn test_sign_extend_ignores_high_bits() {
        assert_eq!(sign_extend(0xf3, 4), 3);
        assert_eq!(sign_extend(0x1_0001, 16), 1);
    }
}
