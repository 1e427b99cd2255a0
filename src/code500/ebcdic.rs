//! ASCII ↔ EBCDIC translation for the two character fields of the Code500 header.
//!
//! Both directions are plain 256-entry lookups. Characters outside the printable ASCII range
//! have no exact counterpart and map to a blank or to an approximate glyph.

/// ASCII byte → EBCDIC byte.
static ASCII_TO_EBCDIC: [u8; 256] = [
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x4F, 0x7F, 0x7B, 0x5B, 0x6C, 0x50, 0x7D,
    0x4D, 0x5D, 0x5C, 0x4E, 0x6B, 0x60, 0x4B, 0x61,
    0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
    0xF8, 0xF9, 0x7A, 0x5E, 0x4C, 0x7E, 0x6E, 0x6F,
    0x7C, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
    0xC8, 0xC9, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6,
    0xD7, 0xD8, 0xD9, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6,
    0xE7, 0xE8, 0xE9, 0x4A, 0xE0, 0x5A, 0x5F, 0x6D,
    0x79, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6,
    0xA7, 0xA8, 0xA9, 0xC0, 0x6A, 0xD0, 0xA1, 0x40,
    0xB9, 0xBA, 0xED, 0xBF, 0xBC, 0xBD, 0xEC, 0xFA,
    0xCB, 0xCC, 0xCD, 0xCE, 0xCF, 0xDA, 0xDB, 0xDC,
    0xDE, 0xDF, 0xEA, 0xEB, 0xBE, 0xCA, 0xBB, 0xFE,
    0xFB, 0xFD, 0x7D, 0xEF, 0xEE, 0xFC, 0xB8, 0xDD,
    0x77, 0x78, 0xAF, 0x8D, 0x8A, 0x8B, 0xAE, 0xB2,
    0x8F, 0x90, 0x9A, 0x9B, 0x9C, 0x9D, 0x9E, 0x9F,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0xAA, 0xAB, 0xAC, 0xAD, 0x8C, 0x8E, 0x80, 0xB6,
    0xB3, 0xB5, 0xB7, 0xB1, 0xB0, 0xB4, 0x76, 0xA0,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
];

/// EBCDIC byte → ASCII byte.
static EBCDIC_TO_ASCII: [u8; 256] = [
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x5B, 0x2E, 0x3C, 0x28, 0x2B, 0x21,
    0x26, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x5D, 0x24, 0x2A, 0x29, 0x3B, 0x5E,
    0x2D, 0x2F, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x7C, 0x2C, 0x25, 0x5F, 0x3E, 0x3F,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0xEE, 0xA0,
    0xA1, 0x60, 0x3A, 0x23, 0x40, 0x27, 0x3D, 0x22,
    0xE6, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67,
    0x68, 0x69, 0xA4, 0xA5, 0xE4, 0xA3, 0xE5, 0xA8,
    0xA9, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F, 0x70,
    0x71, 0x72, 0xAA, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF,
    0xEF, 0x7E, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7A, 0xE0, 0xE1, 0xE2, 0xE3, 0xA6, 0xA2,
    0xEC, 0xEB, 0xA7, 0xE8, 0xED, 0xE9, 0xE7, 0xEA,
    0x9E, 0x80, 0x81, 0x96, 0x84, 0x85, 0x94, 0x83,
    0x7B, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47,
    0x48, 0x49, 0x95, 0x88, 0x89, 0x8A, 0x8B, 0x8C,
    0x7D, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F, 0x50,
    0x51, 0x52, 0x8D, 0x8E, 0x8F, 0x9F, 0x90, 0x91,
    0x5C, 0x20, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5A, 0x92, 0x93, 0x86, 0x82, 0x9C, 0x9B,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
    0x38, 0x39, 0x87, 0x98, 0x9D, 0x99, 0x97, 0x20,
];

pub fn ascii_to_ebcdic_byte(ascii: u8) -> u8 {
    ASCII_TO_EBCDIC[ascii as usize]
}

pub fn ebcdic_to_ascii_byte(ebcdic: u8) -> u8 {
    EBCDIC_TO_ASCII[ebcdic as usize]
}

/// Encode text into a fixed-width EBCDIC field, blank padded or truncated to `width`.
pub fn ascii_to_ebcdic(text: &str, width: usize) -> Vec<u8> {
    let mut out: Vec<u8> = text.bytes().take(width).map(ascii_to_ebcdic_byte).collect();
    out.resize(width, ascii_to_ebcdic_byte(b' '));
    out
}

/// Decode an EBCDIC field to ASCII text, keeping trailing blanks.
pub fn ebcdic_to_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| ebcdic_to_ascii_byte(*b) as char)
        .collect()
}

#[cfg(test)]
mod test_ebcdic {
    use super::*;

    #[test]
    fn test_printable_round_trip() {
        for c in 0x20u8..0x7F {
            assert_eq!(ebcdic_to_ascii_byte(ascii_to_ebcdic_byte(c)), c, "char {}", c as char);
        }
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(ascii_to_ebcdic_byte(b' '), 0x40);
        assert_eq!(ascii_to_ebcdic_byte(b'A'), 0xC1);
        assert_eq!(ascii_to_ebcdic_byte(b'0'), 0xF0);
        assert_eq!(ebcdic_to_ascii_byte(0x81), b'a');
    }

    #[test]
    fn test_field_padding() {
        let field = ascii_to_ebcdic("TAPE1", 8);
        assert_eq!(field.len(), 8);
        assert_eq!(&field[5..], &[0x40, 0x40, 0x40]);
        assert_eq!(ebcdic_to_ascii(&field), "TAPE1   ");

        let field = ascii_to_ebcdic("0123456789", 8);
        assert_eq!(ebcdic_to_ascii(&field), "01234567");
    }
}
