//! # Channel Bit-Packer
//!
//! Arbitrary-width, LSB-first bit stream writer and reader.
//!
//! Values are appended at the current free-bit offset of a rolling
//! accumulator. As soon as 8 or more bits are pending, whole bytes are
//! flushed from the low end. Leftover bits stay in the accumulator; a partial
//! byte is never emitted.
//!
//! ```text
//! Byte 0: Ch1[0:7]
//! Byte 1: Ch1[8:10] | Ch2[0:4]
//! Byte 2: Ch2[5:10] | Ch3[0:1]
//! ...
//! ```

/// Widest value accepted by [`BitWriter::push`]
pub const MAX_VALUE_BITS: u8 = 32;

/// Most bytes a single push can complete (7 pending bits + 32 new bits)
const MAX_FLUSHED_BYTES: usize = 4;

/// Rolling bit accumulator
///
/// Holds fewer than 8 bits between pushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitWriter {
    bits: u64,
    available: u8,
}

impl BitWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `width` bits of `value`
    ///
    /// Widths above 32 are treated as 32. Completed bytes are taken out of
    /// the accumulator before returning.
    ///
    /// # Examples
    ///
    /// ```
    /// use multi_bridge::multi::packer::BitWriter;
    ///
    /// let mut writer = BitWriter::new();
    /// let bytes: Vec<u8> = writer.push(0x7FF, 11).collect();
    /// assert_eq!(bytes, vec![0xFF]);
    /// assert_eq!(writer.pending_bits(), 3);
    /// ```
    pub fn push(&mut self, value: u32, width: u8) -> FlushedBytes {
        let width = width.min(MAX_VALUE_BITS);
        let mask = if width == MAX_VALUE_BITS { u32::MAX } else { (1u32 << width) - 1 };
        self.bits |= u64::from(value & mask) << self.available;
        self.available += width;

        let mut flushed = FlushedBytes::default();
        while self.available >= 8 {
            flushed.bytes[flushed.len] = (self.bits & 0xFF) as u8;
            flushed.len += 1;
            self.bits >>= 8;
            self.available -= 8;
        }
        flushed
    }

    /// Bits accumulated but not yet flushed
    pub fn pending_bits(&self) -> u8 {
        self.available
    }
}

/// Bytes completed by a single [`BitWriter::push`]
#[must_use = "flushed bytes belong to the output stream"]
#[derive(Debug, Clone, Copy, Default)]
pub struct FlushedBytes {
    bytes: [u8; MAX_FLUSHED_BYTES],
    len: usize,
    next: usize,
}

impl Iterator for FlushedBytes {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.next == self.len {
            return None;
        }
        let byte = self.bytes[self.next];
        self.next += 1;
        Some(byte)
    }
}

/// Pack a sequence of values into a byte stream
///
/// # Arguments
///
/// * `values` - Values in wire order (already transformed to wire range)
/// * `width` - Bits per value
/// * `emit` - Receives each completed byte
///
/// # Returns
///
/// * `BitWriter` - The writer, holding any leftover bits
pub fn pack_values<I, F>(values: I, width: u8, mut emit: F) -> BitWriter
where
    I: IntoIterator<Item = u32>,
    F: FnMut(u8),
{
    let mut writer = BitWriter::new();
    for value in values {
        for byte in writer.push(value, width) {
            emit(byte);
        }
    }
    writer
}

/// LSB-first reader for streams produced by [`BitWriter`]
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_index: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_index: 0 }
    }

    /// Read the next `width` bits, or `None` if the stream is exhausted
    pub fn read(&mut self, width: u8) -> Option<u32> {
        let width = usize::from(width.min(MAX_VALUE_BITS));
        if self.bit_index + width > self.data.len() * 8 {
            return None;
        }

        let mut value = 0u32;
        for bit in 0..width {
            let index = self.bit_index + bit;
            if (self.data[index / 8] >> (index % 8)) & 1 == 1 {
                value |= 1 << bit;
            }
        }
        self.bit_index += width;
        Some(value)
    }
}

/// Decode `N` values of `width` bits from a packed stream
pub fn unpack_values<const N: usize>(data: &[u8], width: u8) -> Option<[u16; N]> {
    let mut reader = BitReader::new(data);
    let mut values = [0u16; N];
    for value in values.iter_mut() {
        *value = reader.read(width)? as u16;
    }
    Some(values)
}
