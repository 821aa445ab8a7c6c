//! Fixed layout of memory-operation side-channel fields.
//!
//! One memory access is described by eight fields packed back to back:
//! `used(1) | mode(1) | reserved(6) | id(4) | size(4) | addr(P) | value(P) |
//! timestamp(64)` with pointer width `P` of 32 or 64 bits. Pack and unpack
//! are bijections over a bit-string of `16 + 2P + 64` bits.

use crate::bits::BitString;

pub const FIELD_COUNT: usize = 8;

/// Field widths of the record, in layout order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub defs: [u32; FIELD_COUNT],
}

impl Layout {
    pub fn new(ptr_size: u32) -> Self {
        assert!(
            ptr_size == 32 || ptr_size == 64,
            "unsupported pointer width {ptr_size}"
        );
        Self {
            defs: [1, 1, 6, 4, 4, ptr_size, ptr_size, 64],
        }
    }

    /// Total record width: `16 + 2P + 64`.
    pub fn total_size(&self) -> u32 {
        self.defs.iter().sum()
    }
}

/// A record decomposed into its eight field values.
///
/// `V` is whatever the caller's extractor produces (bit-strings here,
/// symbolic values elsewhere), which is why the field store is a plain
/// vector rather than anything typed per field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parsed<V> {
    pub layout: Layout,
    pub vals: Vec<V>,
}

impl<V> Parsed<V> {
    pub fn new(ptr_size: u32, vals: Vec<V>) -> Self {
        assert_eq!(vals.len(), FIELD_COUNT, "memory record needs 8 fields");
        Self {
            layout: Layout::new(ptr_size),
            vals,
        }
    }

    pub fn used(&self) -> &V {
        &self.vals[0]
    }
    pub fn mode(&self) -> &V {
        &self.vals[1]
    }
    pub fn reserved(&self) -> &V {
        &self.vals[2]
    }
    pub fn id(&self) -> &V {
        &self.vals[3]
    }
    pub fn size(&self) -> &V {
        &self.vals[4]
    }
    pub fn addr(&self) -> &V {
        &self.vals[5]
    }
    pub fn value(&self) -> &V {
        &self.vals[6]
    }
    pub fn timestamp(&self) -> &V {
        &self.vals[7]
    }
}

/// Decomposes a record by successive bit-range extraction in layout order.
/// `extract(low, size)` yields the field covering bits `[low, low + size)`.
pub fn parse<V>(ptr_size: u32, mut extract: impl FnMut(u32, u32) -> V) -> Parsed<V> {
    let layout = Layout::new(ptr_size);
    let mut current = 0u32;
    let vals = layout
        .defs
        .iter()
        .map(|&def| {
            let v = extract(current, def);
            current += def;
            v
        })
        .collect();
    Parsed { layout, vals }
}

/// Recomposes a record by successive insertion in layout order.
/// `insert(val, low, size)` writes the field into bits `[low, low + size)`.
pub fn construct<V>(parsed: &Parsed<V>, mut insert: impl FnMut(&V, u32, u32)) {
    let mut current = 0u32;
    for (def, val) in parsed.layout.defs.iter().zip(&parsed.vals) {
        insert(val, current, *def);
        current += *def;
    }
}

/// Packs eight bit-string fields into one record-wide bit-string.
pub fn pack_bits(parsed: &Parsed<BitString>) -> BitString {
    let mut out = BitString::zero(parsed.layout.total_size());
    construct(parsed, |val, low, size| {
        assert_eq!(val.len(), size, "field width mismatch at bit {low}");
        out.insert(val, low);
    });
    out
}

/// Unpacks a record-wide bit-string into its eight fields.
pub fn unpack_bits(ptr_size: u32, record: &BitString) -> Parsed<BitString> {
    assert_eq!(record.len(), Layout::new(ptr_size).total_size());
    parse(ptr_size, |low, size| record.extract(low, size))
}
