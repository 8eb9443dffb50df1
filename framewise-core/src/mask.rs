//! Binary segmentation masks and the COCO run-length encoding used on the wire.
//!
//! Masks are column-major (Fortran order): pixel `(x, y)` lives at
//! `x * height + y`. Run counts alternate background/foreground and always
//! start with a background run, which may be zero-length. The compressed
//! string form is the LEB128-like text encoding from the COCO mask API.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Printable offset of the first character in the COCO string alphabet.
const RLE_CHAR_BASE: u8 = 48;
/// A single count never needs more than this many 5-bit groups.
const MAX_GROUPS_PER_COUNT: u32 = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaskSize {
    pub width: u32,
    pub height: u32,
}

impl MaskSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Wire representation of a mask: COCO compressed RLE plus its frame size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    pub coco_encoded_rle: String,
    pub size: MaskSize,
}

impl Mask {
    pub fn new(coco_encoded_rle: impl Into<String>, size: MaskSize) -> Self {
        Self {
            coco_encoded_rle: coco_encoded_rle.into(),
            size,
        }
    }

    /// Encode a binary mask.
    pub fn encode(mask: &BinaryMask) -> Self {
        Self {
            coco_encoded_rle: counts_to_string(&mask.counts()),
            size: mask.size(),
        }
    }

    /// An all-background mask of the given size.
    pub fn empty(size: MaskSize) -> Self {
        Self::encode(&BinaryMask::new(size.width, size.height))
    }

    /// A mask covering the whole frame.
    pub fn full(size: MaskSize) -> Self {
        Self::encode(&BinaryMask::filled(size.width, size.height))
    }

    /// Uncompressed run counts.
    pub fn counts(&self) -> Result<Vec<u32>> {
        counts_from_string(&self.coco_encoded_rle)
    }

    pub fn decode(&self) -> Result<BinaryMask> {
        BinaryMask::from_counts(self.size, &self.counts()?)
    }

    /// Checks that the RLE string is well formed and covers exactly the declared size.
    pub fn validate(&self) -> Result<()> {
        let counts = self.counts()?;
        check_coverage(self.size, &counts)
    }

    /// Number of foreground pixels, without materialising the bitmap.
    pub fn area(&self) -> Result<u64> {
        let counts = self.counts()?;
        check_coverage(self.size, &counts)?;
        Ok(counts.iter().skip(1).step_by(2).map(|&c| u64::from(c)).sum())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.area()? == 0)
    }
}

/// Decoded column-major bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    size: MaskSize,
    data: Vec<bool>,
}

impl BinaryMask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        let size = MaskSize::new(width, height);
        Self {
            size,
            data: vec![false; size.pixel_count() as usize],
        }
    }

    /// All-foreground mask.
    pub fn filled(width: u32, height: u32) -> Self {
        let size = MaskSize::new(width, height);
        Self {
            size,
            data: vec![true; size.pixel_count() as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for x in 0..width {
            for y in 0..height {
                if f(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn from_column_major(width: u32, height: u32, data: Vec<bool>) -> Result<Self> {
        let size = MaskSize::new(width, height);
        if data.len() as u64 != size.pixel_count() {
            return Err(Error::InvalidMask(format!(
                "expected {} pixels for {}x{}, got {}",
                size.pixel_count(),
                width,
                height,
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// Rebuild a bitmap from uncompressed run counts. No counts at all is
    /// treated as an all-background mask of the declared size.
    pub fn from_counts(size: MaskSize, counts: &[u32]) -> Result<Self> {
        let mut mask = Self::new(size.width, size.height);
        if counts.is_empty() {
            return Ok(mask);
        }
        check_coverage(size, counts)?;

        let mut offset = 0usize;
        for (i, &count) in counts.iter().enumerate() {
            let end = offset + count as usize;
            if i % 2 == 1 {
                mask.data[offset..end].fill(true);
            }
            offset = end;
        }
        Ok(mask)
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> MaskSize {
        self.size
    }

    /// Out-of-bounds pixels read as background.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.size.width || y >= self.size.height {
            return false;
        }
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x >= self.size.width || y >= self.size.height {
            return;
        }
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn area(&self) -> u64 {
        self.data.iter().filter(|&&p| p).count() as u64
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&p| p)
    }

    pub fn as_column_major(&self) -> &[bool] {
        &self.data
    }

    /// Run counts, background first.
    pub fn counts(&self) -> Vec<u32> {
        let mut counts = Vec::new();
        let mut previous = false;
        let mut run = 0u32;
        for &pixel in &self.data {
            if pixel != previous {
                counts.push(run);
                run = 0;
                previous = pixel;
            }
            run += 1;
        }
        counts.push(run);
        counts
    }

    fn index(&self, x: u32, y: u32) -> usize {
        x as usize * self.size.height as usize + y as usize
    }
}

fn check_coverage(size: MaskSize, counts: &[u32]) -> Result<()> {
    if counts.is_empty() {
        return Ok(());
    }
    let actual: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    let expected = size.pixel_count();
    if actual != expected {
        return Err(Error::MaskSizeMismatch {
            width: size.width,
            height: size.height,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Compress run counts into the COCO string form. From the fourth count on,
/// each value is stored as a delta against the count two positions back.
pub fn counts_to_string(counts: &[u32]) -> String {
    let mut out = String::with_capacity(counts.len() * 2);
    for (i, &count) in counts.iter().enumerate() {
        let mut x = i64::from(count);
        if i > 2 {
            x -= i64::from(counts[i - 2]);
        }
        loop {
            let mut c = (x & 0x1f) as u8;
            x >>= 5;
            let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
            if more {
                c |= 0x20;
            }
            out.push(char::from(c + RLE_CHAR_BASE));
            if !more {
                break;
            }
        }
    }
    out
}

/// Inverse of [`counts_to_string`].
pub fn counts_from_string(encoded: &str) -> Result<Vec<u32>> {
    let bytes = encoded.as_bytes();
    let mut counts: Vec<u32> = Vec::new();
    let mut p = 0usize;

    while p < bytes.len() {
        let mut x: i64 = 0;
        let mut k: u32 = 0;
        loop {
            let byte = *bytes
                .get(p)
                .ok_or_else(|| Error::InvalidRle("truncated run at end of string".to_string()))?;
            if !(RLE_CHAR_BASE..RLE_CHAR_BASE + 64).contains(&byte) {
                return Err(Error::InvalidRle(format!(
                    "unexpected character {:?} at offset {}",
                    byte as char, p
                )));
            }
            if k >= MAX_GROUPS_PER_COUNT {
                return Err(Error::InvalidRle(format!("run starting before offset {} is too long", p)));
            }

            let c = i64::from(byte - RLE_CHAR_BASE);
            x |= (c & 0x1f) << (5 * k);
            p += 1;
            k += 1;
            if c & 0x20 == 0 {
                if c & 0x10 != 0 {
                    x |= -1i64 << (5 * k);
                }
                break;
            }
        }

        let n = counts.len();
        if n > 2 {
            x += i64::from(counts[n - 2]);
        }
        let count = u32::try_from(x)
            .map_err(|_| Error::InvalidRle(format!("run {} decodes to out-of-range value {}", n, x)))?;
        counts.push(count);
    }

    Ok(counts)
}
