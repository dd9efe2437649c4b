//! Named binary layouts.
//!
//! Protocol fixtures are built field by field through `FrameBuilder` instead
//! of inline byte slices. Every field records its name, offset, width and
//! encoding, so a test can check one field of a frame without counting bytes.

use std::fmt;

/// How a field's bytes were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    U8,
    U16Be,
    U16Le,
    U24Le,
    U32Le,
    /// Raw bytes copied as-is.
    Bytes,
    /// Bytes followed by a single NUL.
    NulTerminated,
}

/// One field of a built frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub encoding: Encoding,
}

/// A serialized frame plus the layout it was built from.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
    fields: Vec<Field>,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Layout entry for `name`, if the frame has one.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The bytes of field `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.field(name)
            .map(|f| &self.bytes[f.offset..f.offset + f.width])
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for field in &self.fields {
            let bytes = &self.bytes[field.offset..field.offset + field.width];
            list.entry(&format_args!("{}@{}={:02x?}", field.name, field.offset, bytes));
        }
        list.finish()
    }
}

/// Builds a `Frame` one named field at a time.
#[derive(Debug, Default)]
pub struct FrameBuilder {
    bytes: Vec<u8>,
    fields: Vec<Field>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &'static str, encoding: Encoding, data: &[u8]) -> Self {
        self.fields.push(Field {
            name,
            offset: self.bytes.len(),
            width: data.len(),
            encoding,
        });
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn u8(self, name: &'static str, value: u8) -> Self {
        self.push(name, Encoding::U8, &[value])
    }

    pub fn u16_be(self, name: &'static str, value: u16) -> Self {
        self.push(name, Encoding::U16Be, &value.to_be_bytes())
    }

    pub fn u16_le(self, name: &'static str, value: u16) -> Self {
        self.push(name, Encoding::U16Le, &value.to_le_bytes())
    }

    /// Three-byte little-endian integer. Bits above 24 are dropped.
    pub fn u24_le(self, name: &'static str, value: u32) -> Self {
        let b = value.to_le_bytes();
        self.push(name, Encoding::U24Le, &b[..3])
    }

    pub fn u32_le(self, name: &'static str, value: u32) -> Self {
        self.push(name, Encoding::U32Le, &value.to_le_bytes())
    }

    pub fn bytes(self, name: &'static str, value: &[u8]) -> Self {
        self.push(name, Encoding::Bytes, value)
    }

    pub fn zeros(self, name: &'static str, count: usize) -> Self {
        self.push(name, Encoding::Bytes, &vec![0u8; count])
    }

    pub fn nul_terminated(self, name: &'static str, value: &[u8]) -> Self {
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value);
        data.push(0);
        self.push(name, Encoding::NulTerminated, &data)
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append a nested frame, prefixing its field names' offsets.
    pub fn frame(mut self, inner: Frame) -> Self {
        let base = self.bytes.len();
        self.fields.extend(inner.fields.into_iter().map(|mut f| {
            f.offset += base;
            f
        }));
        self.bytes.extend_from_slice(&inner.bytes);
        self
    }

    pub fn build(self) -> Frame {
        Frame {
            bytes: self.bytes,
            fields: self.fields,
        }
    }
}
