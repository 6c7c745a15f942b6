use crate::error::{BBLError, Result};
use crate::parser::helpers::sign_extend;

/// Longest variable-byte integer accepted; 5 bytes cover 32-bit quantities
const MAX_VB_BYTES: usize = 5;

/// Byte cursor over an immutable BBL frame buffer
pub struct BBLDataStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BBLDataStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BBLError::UnexpectedEof)
    }

    /// Consume `expected` if the upcoming bytes match it exactly
    pub fn consume_if(&mut self, expected: &[u8]) -> bool {
        if self.data[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    /// Read unsigned variable byte: 7 data bits per byte, least significant
    /// group first, high bit set on every byte except the last
    pub fn read_unsigned_vb(&mut self) -> Result<u32> {
        let mut result = 0u32;
        let mut shift = 0;

        for _ in 0..MAX_VB_BYTES {
            let b = self.read_byte()?;
            result |= ((b & 0x7f) as u32) << shift;

            // Final byte?
            if b < 0x80 {
                return Ok(result);
            }

            shift += 7;
        }

        Err(BBLError::InvalidFrame(format!(
            "variable-byte integer longer than {MAX_VB_BYTES} bytes at offset {}",
            self.pos - MAX_VB_BYTES
        )))
    }

    /// Read signed variable byte (zig-zag over unsigned variable byte)
    pub fn read_signed_vb(&mut self) -> Result<i32> {
        let unsigned = self.read_unsigned_vb()?;
        Ok(((unsigned >> 1) as i32) ^ -((unsigned & 1) as i32))
    }

    /// Read a little-endian fixed-width value of `bits` bits (a multiple of 8, at most 64)
    pub fn read_fixed_width(&mut self, bits: u32) -> Result<u64> {
        if bits == 0 || bits % 8 != 0 || bits > 64 {
            return Err(BBLError::InvalidFrame(format!(
                "unsupported fixed-width size of {bits} bits"
            )));
        }
        let count = (bits / 8) as usize;
        if self.remaining() < count {
            self.pos = self.data.len();
            return Err(BBLError::UnexpectedEof);
        }
        let value = self.data[self.pos..self.pos + count]
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64);
        self.pos += count;
        Ok(value)
    }

    /// Read negative 14-bit encoding: 16-bit little-endian word, low 14 bits negated
    pub fn read_neg_14bit(&mut self) -> Result<i32> {
        let raw = self.read_fixed_width(16)? as i32;
        Ok(-(raw & 0x3fff))
    }

    /// Read Tag8_4S16 encoding into `values[0..4]`
    pub fn read_tag8_4s16(&mut self, values: &mut [i32; 8]) -> Result<()> {
        let selector = self.read_byte()?;
        let mut nibble_index = 0;
        let mut buffer = 0u8;

        for (i, value) in values.iter_mut().take(4).enumerate() {
            let field_type = (selector >> (i * 2)) & 0x03;

            *value = match field_type {
                // FIELD_ZERO
                0 => 0,
                // FIELD_4BIT
                1 => {
                    if nibble_index == 0 {
                        buffer = self.read_byte()?;
                        nibble_index = 1;
                        sign_extend((buffer >> 4) as u32, 4)
                    } else {
                        nibble_index = 0;
                        sign_extend((buffer & 0x0f) as u32, 4)
                    }
                }
                // FIELD_8BIT
                2 => {
                    if nibble_index == 0 {
                        sign_extend(self.read_byte()? as u32, 8)
                    } else {
                        let mut char1 = (buffer & 0x0f) << 4;
                        buffer = self.read_byte()?;
                        char1 |= buffer >> 4;
                        sign_extend(char1 as u32, 8)
                    }
                }
                // FIELD_16BIT
                _ => {
                    let char1 = self.read_byte()?;
                    let char2 = self.read_byte()?;
                    if nibble_index == 0 {
                        sign_extend(((char1 as u32) << 8) | char2 as u32, 16)
                    } else {
                        let word = (((buffer & 0x0f) as u16) << 12)
                            | ((char1 as u16) << 4)
                            | ((char2 as u16) >> 4);
                        buffer = char2;
                        sign_extend(word as u32, 16)
                    }
                }
            };
        }

        Ok(())
    }

    /// Read Tag2_3S32 encoding into `values[0..3]`
    pub fn read_tag2_3s32(&mut self, values: &mut [i32; 8]) -> Result<()> {
        let lead_byte = self.read_byte()?;

        match lead_byte >> 6 {
            // 2-bit fields
            0 => {
                values[0] = sign_extend(((lead_byte >> 4) & 0x03) as u32, 2);
                values[1] = sign_extend(((lead_byte >> 2) & 0x03) as u32, 2);
                values[2] = sign_extend((lead_byte & 0x03) as u32, 2);
            }
            // 4-bit fields
            1 => {
                values[0] = sign_extend((lead_byte & 0x0f) as u32, 4);
                let second_byte = self.read_byte()?;
                values[1] = sign_extend((second_byte >> 4) as u32, 4);
                values[2] = sign_extend((second_byte & 0x0f) as u32, 4);
            }
            // 6-bit fields
            2 => {
                values[0] = sign_extend((lead_byte & 0x3f) as u32, 6);
                values[1] = sign_extend((self.read_byte()? & 0x3f) as u32, 6);
                values[2] = sign_extend((self.read_byte()? & 0x3f) as u32, 6);
            }
            // 8, 16, 24 or 32 bit fields, width selected per field
            _ => {
                let mut selector = lead_byte;
                for value in values.iter_mut().take(3) {
                    *value = match selector & 0x03 {
                        0 => sign_extend(self.read_byte()? as u32, 8),
                        1 => sign_extend(self.read_fixed_width(16)? as u32, 16),
                        2 => sign_extend(self.read_fixed_width(24)? as u32, 24),
                        _ => self.read_fixed_width(32)? as u32 as i32,
                    };
                    selector >>= 2;
                }
            }
        }

        Ok(())
    }

    /// Read Tag8_8SVB encoding for a group of `count` fields (at most 8).
    /// A lone field is a plain signed VB; larger groups carry a presence bitmap.
    pub fn read_tag8_8svb(&mut self, values: &mut [i32; 8], count: usize) -> Result<()> {
        let count = count.min(8);
        if count == 1 {
            values[0] = self.read_signed_vb()?;
            return Ok(());
        }

        let header = self.read_byte()?;
        for (i, value) in values.iter_mut().take(count).enumerate() {
            *value = if header & (1 << i) != 0 {
                self.read_signed_vb()?
            } else {
                0
            };
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode `value` the way the flight controller writes unsigned VB
    fn encode_unsigned_vb(mut value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        while value > 0x7f {
            out.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
        out
    }

    fn zigzag(value: i32) -> u32 {
        ((value << 1) ^ (value >> 31)) as u32
    }

    #[test]
    fn test_read_unsigned_vb_known_bytes() {
        let mut stream = BBLDataStream::new(&[0x7f, 0x80, 0x01, 0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(stream.read_unsigned_vb().unwrap(), 127);
        assert_eq!(stream.read_unsigned_vb().unwrap(), 128);
        assert_eq!(stream.read_unsigned_vb().unwrap(), u32::MAX);
        assert!(stream.is_eof());
    }

    #[test]
    fn test_unsigned_vb_matches_encoder() {
        let samples = [
            0u32,
            1,
            127,
            128,
            300,
            16_383,
            16_384,
            2_097_151,
            2_097_152,
            268_435_455,
            268_435_456,
            u32::MAX - 1,
            u32::MAX,
        ];
        for value in samples.into_iter().chain((0..u32::MAX).step_by(65_521)) {
            let bytes = encode_unsigned_vb(value);
            let mut stream = BBLDataStream::new(&bytes);
            assert_eq!(stream.read_unsigned_vb().unwrap(), value, "value {value}");
            assert!(stream.is_eof());
        }
    }

    #[test]
    fn test_signed_vb_matches_encoder() {
        let samples = [0i32, 1, -1, 2, -2, 63, -64, 1000, -1000, i32::MAX, i32::MIN];
        for value in samples
            .into_iter()
            .chain((i32::MIN..i32::MAX).step_by(131_071))
        {
            let bytes = encode_unsigned_vb(zigzag(value));
            let mut stream = BBLDataStream::new(&bytes);
            assert_eq!(stream.read_signed_vb().unwrap(), value, "value {value}");
        }
        // Even codes are non-negative, odd codes negative
        let mut stream = BBLDataStream::new(&[0x14, 0x13]);
        assert_eq!(stream.read_signed_vb().unwrap(), 10);
        assert_eq!(stream.read_signed_vb().unwrap(), -10);
    }

    #[test]
    fn test_unterminated_vb_is_eof() {
        let mut stream = BBLDataStream::new(&[0x80, 0x80]);
        assert!(matches!(
            stream.read_unsigned_vb(),
            Err(BBLError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_overlong_vb_is_invalid_frame() {
        let mut stream = BBLDataStream::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(matches!(
            stream.read_unsigned_vb(),
            Err(BBLError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut stream = BBLDataStream::new(&[b'I']);
        assert_eq!(stream.peek_byte().unwrap(), b'I');
        assert_eq!(stream.read_byte().unwrap(), b'I');
        assert!(matches!(stream.peek_byte(), Err(BBLError::UnexpectedEof)));
        assert!(matches!(stream.read_byte(), Err(BBLError::UnexpectedEof)));
    }

    #[test]
    fn test_read_fixed_width_little_endian() {
        let mut stream = BBLDataStream::new(&[0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xff]);
        assert_eq!(stream.read_fixed_width(16).unwrap(), 0x1234);
        assert_eq!(stream.read_fixed_width(32).unwrap(), 0x1234_5678);
        assert!(matches!(
            stream.read_fixed_width(16),
            Err(BBLError::UnexpectedEof)
        ));
        assert!(matches!(
            BBLDataStream::new(&[0; 4]).read_fixed_width(12),
            Err(BBLError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_read_neg_14bit() {
        let mut stream = BBLDataStream::new(&[0x64, 0x00, 0xff, 0xff]);
        assert_eq!(stream.read_neg_14bit().unwrap(), -100);
        assert_eq!(stream.read_neg_14bit().unwrap(), -0x3fff);
    }

    #[test]
    fn test_read_tag2_3s32_small_fields() {
        // 2-bit: 01 11 10 -> 1, -1, -2
        let mut values = [0i32; 8];
        BBLDataStream::new(&[0b00_01_11_10])
            .read_tag2_3s32(&mut values)
            .unwrap();
        assert_eq!(&values[..3], &[1, -1, -2]);

        // 4-bit: lead 0x47 -> 7, then 0x8f -> -8, -1
        BBLDataStream::new(&[0x47, 0x8f])
            .read_tag2_3s32(&mut values)
            .unwrap();
        assert_eq!(&values[..3], &[7, -8, -1]);
    }

    #[test]
    fn test_read_tag2_3s32_wide_fields() {
        // selector bits (low to high): 00 = 8-bit, 01 = 16-bit, 10 = 24-bit
        let lead = 0b1110_0100u8;
        let bytes = [lead, 0xfe, 0x00, 0x80, 0x01, 0x00, 0x80];
        let mut values = [0i32; 8];
        let mut stream = BBLDataStream::new(&bytes);
        stream.read_tag2_3s32(&mut values).unwrap();
        assert_eq!(&values[..3], &[-2, -32768, -8_388_607]);
        assert!(stream.is_eof());
    }

    #[test]
    fn test_read_tag8_4s16() {
        // fields: zero, 4-bit, 4-bit, 8-bit
        let selector = 0b10_01_01_00u8;
        let bytes = [selector, 0x3f, 0x80];
        let mut values = [0i32; 8];
        let mut stream = BBLDataStream::new(&bytes);
        stream.read_tag8_4s16(&mut values).unwrap();
        assert_eq!(&values[..4], &[0, 3, -1, -128]);
        assert!(stream.is_eof());
    }

    #[test]
    fn test_read_tag8_4s16_across_nibble_boundary() {
        // fields: 4-bit, 8-bit, 16-bit, 4-bit; nibbles 2 | F D | 1 2 3 4 | E
        let selector = 0b01_11_10_01u8;
        let bytes = [selector, 0x2f, 0xd1, 0x23, 0x4e];
        let mut values = [0i32; 8];
        let mut stream = BBLDataStream::new(&bytes);
        stream.read_tag8_4s16(&mut values).unwrap();
        assert_eq!(&values[..4], &[2, -3, 0x1234, -2]);
        assert!(stream.is_eof());

        // byte-aligned 16-bit field
        let mut stream = BBLDataStream::new(&[0b00_00_00_11, 0xff, 0x38]);
        stream.read_tag8_4s16(&mut values).unwrap();
        assert_eq!(&values[..4], &[-200, 0, 0, 0]);
        assert!(stream.is_eof());
    }

    #[test]
    fn test_read_tag8_8svb() {
        let mut values = [0i32; 8];
        // single field: plain signed VB, no header
        BBLDataStream::new(&[0x03])
            .read_tag8_8svb(&mut values, 1)
            .unwrap();
        assert_eq!(values[0], -2);

        // three fields, only the middle one present
        let mut stream = BBLDataStream::new(&[0b010, 0x04]);
        stream.read_tag8_8svb(&mut values, 3).unwrap();
        assert_eq!(&values[..3], &[0, 2, 0]);
        assert!(stream.is_eof());
    }
}
