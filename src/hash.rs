//! File-name → 32-bit id hash used by MIX record tables.
//!
//! The name is uppercased, then consumed four UTF-16 code units at a time.
//! Each group is folded into a word `a` (the first unit ends up in the low
//! byte, missing units contribute zero) and mixed into the running id with
//! `id = rotl(id, 1) + a`, all modulo 2^32.
//!
//! A unit that starts a surrogate pair contributes the whole code point; the
//! low surrogate that follows still occupies its own slot.

/// Compute the record id for `name`.  Case-insensitive.
pub fn file_id(name: &str) -> u32 {
    let slots = code_unit_slots(&name.to_uppercase());
    let mut id = 0u32;
    for group in slots.chunks(4) {
        let mut a = 0u32;
        for slot in 0..4 {
            a >>= 8;
            if let Some(&c) = group.get(slot) {
                a = a.wrapping_add(c << 24);
            }
        }
        id = id.rotate_left(1).wrapping_add(a);
    }
    id
}

/// One value per UTF-16 unit: the full code point where the unit opens a
/// surrogate pair, the unit itself otherwise.
fn code_unit_slots(s: &str) -> Vec<u32> {
    let units: Vec<u16> = s.encode_utf16().collect();
    (0..units.len())
        .map(|i| match (units[i], units.get(i + 1)) {
            (hi @ 0xD800..=0xDBFF, Some(&(lo @ 0xDC00..=0xDFFF))) => {
                0x1_0000 + ((u32::from(hi) - 0xD800) << 10) + (u32::from(lo) - 0xDC00)
            }
            (unit, _) => u32::from(unit),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_ids() {
        assert_eq!(file_id(""),             0);
        assert_eq!(file_id("a"),            0x0000_0041);
        assert_eq!(file_id("ab"),           0x0000_4241);
        assert_eq!(file_id("abcd"),         0x4443_4241);
        assert_eq!(file_id("abcde"),        0x8886_84C7);
        assert_eq!(file_id("local.mix"),    0x97A7_9A21);
        assert_eq!(file_id("CONQUER.MIX"),  0xA236_1104);
        assert_eq!(file_id("rules.ini"),    0xB1C3_B238);
        assert_eq!(file_id("tempicnh.mix"), 0x2A1A_E911);
    }

    #[test]
    fn astral_characters_take_two_slots() {
        assert_eq!(file_id("\u{1F600}A"),   0x0041_0000);
        assert_eq!(file_id("\u{1F600}a"),   0x0041_0000);
        assert_eq!(file_id("x\u{10400}yz.mix"), 0xF69A_5E6D);
    }

    proptest! {
        #[test]
        fn case_insensitive(name in "[a-zA-Z0-9_.\\- ]{0,40}") {
            prop_assert_eq!(file_id(&name), file_id(&name.to_uppercase()));
            prop_assert_eq!(file_id(&name), file_id(&name.to_lowercase()));
        }
    }
}
