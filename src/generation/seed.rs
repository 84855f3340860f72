/// Turns a terrain identifier into the synthesis seed.
///
/// Polynomial rolling hash over UTF-16 code units with 32-bit wraparound,
/// `a = (a << 5) - a + unit`. The result must be reproducible bit for bit,
/// it is the only path from a seed string to a terrain.
pub fn hash_seed(seed: &str) -> i32 {
    seed.encode_utf16().fold(0i32, |a, unit| {
        a.wrapping_shl(5).wrapping_sub(a).wrapping_add(i32::from(unit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // straightforward two's-complement reference using wide arithmetic
    fn reference(seed: &str) -> i32 {
        let mut acc: i64 = 0;
        for unit in seed.encode_utf16() {
            acc = (acc * 31 + i64::from(unit)) & 0xffff_ffff;
        }
        acc as u32 as i32
    }

    #[test]
    fn empty_string_hashes_to_zero() {
        assert_eq!(hash_seed(""), 0);
    }

    #[test]
    fn known_values() {
        assert_eq!(hash_seed("a"), 97);
        assert_eq!(hash_seed("abc"), 96354);
        assert_eq!(hash_seed("hello world"), 1794106052);
    }

    #[test]
    fn overflow_wraps_like_reference() {
        let long = "The quick brown fox jumps over the lazy dog";
        assert_eq!(hash_seed(long), -609428141);
        assert_eq!(hash_seed(long), reference(long));

        let varied = "ÿ€漢字🌍".repeat(40);
        assert_eq!(hash_seed(&varied), reference(&varied));
    }

    #[test]
    fn reproducible() {
        assert_eq!(hash_seed("planetforge"), hash_seed("planetforge"));
        assert_ne!(hash_seed("planetforge"), hash_seed("planetforgf"));
    }
}
