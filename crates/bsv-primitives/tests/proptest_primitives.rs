use proptest::prelude::*;

use bsv_primitives::VarInt;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn varint_size_matches_encoding(val in any::<u64>()) {
        let vi = VarInt(val);
        prop_assert_eq!(VarInt::serialize_size(val), vi.to_bytes().len());
    }

    #[test]
    fn varint_size_classes(val in any::<u64>()) {
        let expected = if val <= 0xfc {
            1
        } else if val <= 0xffff {
            3
        } else if val <= 0xffff_ffff {
            5
        } else {
            9
        };
        prop_assert_eq!(VarInt::serialize_size(val), expected);
    }

    #[test]
    fn varint_size_monotonic(a in any::<u64>(), b in any::<u64>()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(VarInt::serialize_size(lo) <= VarInt::serialize_size(hi));
    }
}
