//! fixed-width zero-padded decimal fields, the only numeric encoding
//! SFS uses on disk

/// parse a fixed-width decimal field
/// # Return
/// [None] if any byte is not an ASCII digit
pub fn parse(field: &[u8]) -> Option<usize> {
    let mut value = 0usize;
    for &b in field {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (b - b'0') as usize;
    }
    Some(value)
}

/// write `value` into `field` as zero-padded decimal digits
/// # Panics
/// if `value` does not fit the field width
pub fn format(field: &mut [u8], value: usize) {
    let mut rest = value;
    for b in field.iter_mut().rev() {
        *b = b'0' + (rest % 10) as u8;
        rest /= 10;
    }
    assert_eq!(rest, 0, "value {value} does not fit a {}-digit field", field.len());
}
