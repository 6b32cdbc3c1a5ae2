//! record/compress — распаковка сжатых tagged-значений.
//!
//! Первый байт: тип сжатия в битах 3..7; биты 0..2 — (число занятых бит последнего байта) - 1.
//! - 1: 7-bit ASCII   — каждый символ 7 бит, LSB-first, результат однобайтовый;
//! - 2: 7-bit Unicode — то же, но каждый символ расширяется до UTF-16LE;
//! - 3: Xpress        — не поддерживается (DecodeError).

use anyhow::Result;

use crate::consts::{COMPRESSION_7BIT_ASCII, COMPRESSION_7BIT_UNICODE, COMPRESSION_XPRESS};
use crate::error::EseError;

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let Some(&head) = data.first() else {
        return Err(EseError::decode("compressed value is empty"));
    };
    match head >> 3 {
        COMPRESSION_7BIT_ASCII => Ok(unpack_7bit(&data[1..], head, false)),
        COMPRESSION_7BIT_UNICODE => Ok(unpack_7bit(&data[1..], head, true)),
        COMPRESSION_XPRESS => Err(EseError::decode("xpress-compressed value is not supported")),
        other => Err(EseError::decode(format!("unknown compression type {}", other))),
    }
}

/// Число символов: все биты полных байтов плюс занятые биты последнего.
fn seven_bit_count(packed_len: usize, head: u8) -> usize {
    if packed_len == 0 {
        return 0;
    }
    let last_bits = (head & 0x07) as usize + 1;
    ((packed_len - 1) * 8 + last_bits) / 7
}

fn unpack_7bit(packed: &[u8], head: u8, wide: bool) -> Vec<u8> {
    let count = seven_bit_count(packed.len(), head);
    let mut out = Vec::with_capacity(if wide { count * 2 } else { count });
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    let mut decoded = 0usize;
    for &b in packed {
        acc |= (b as u32) << bits;
        bits += 8;
        while bits >= 7 && decoded < count {
            decoded += 1;
            let c = (acc & 0x7F) as u8;
            out.push(c);
            if wide {
                out.push(0);
            }
            acc >>= 7;
            bits -= 7;
        }
    }
    out
}

/// Упаковать ASCII в 7-bit форму (для тестовых образов).
pub fn compress_7bit_ascii(text: &[u8]) -> Vec<u8> {
    let mut out = vec![COMPRESSION_7BIT_ASCII << 3];
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &c in text {
        acc |= ((c & 0x7F) as u32) << bits;
        bits += 7;
        while bits >= 8 {
            out.push((acc & 0xFF) as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    let last_bits = if bits > 0 {
        out.push((acc & 0xFF) as u8);
        bits
    } else {
        8
    };
    if out.len() > 1 {
        out[0] |= (last_bits - 1) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_decode_error;

    #[test]
    fn seven_bit_ascii_unpacks_exact_length() {
        // 7 символов = 49 бит: в последнем байте занят 1 бит, лишнего NUL нет
        let packed = compress_7bit_ascii(b"HOST-A1");
        assert_eq!(packed[0] & 0x07, 0);
        assert_eq!(decompress(&packed).expect("unpack"), b"HOST-A1".to_vec());

        // 8 символов = ровно 7 байт
        let packed = compress_7bit_ascii(b"HOST-A12");
        assert_eq!(packed.len(), 8);
        assert_eq!(packed[0] & 0x07, 7);
        assert_eq!(decompress(&packed).expect("unpack"), b"HOST-A12".to_vec());

        for n in 0..20usize {
            let text: Vec<u8> = (0..n).map(|i| b'a' + (i % 26) as u8).collect();
            let out = decompress(&compress_7bit_ascii(&text)).expect("unpack");
            assert_eq!(out, text, "length {}", n);
        }
    }

    #[test]
    fn seven_bit_unicode_widens() {
        let mut packed = compress_7bit_ascii(b"ab");
        packed[0] = (COMPRESSION_7BIT_UNICODE << 3) | (packed[0] & 0x07);
        let out = decompress(&packed).expect("unpack");
        assert_eq!(out, vec![b'a', 0, b'b', 0]);
    }

    #[test]
    fn xpress_and_empty_are_decode_errors() {
        let e = decompress(&[COMPRESSION_XPRESS << 3, 1, 2]).unwrap_err();
        assert!(is_decode_error(&e));
        assert!(is_decode_error(&decompress(&[]).unwrap_err()));
    }
}
