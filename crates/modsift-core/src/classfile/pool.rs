//! Low-level class file reading: big-endian cursor and constant pool.
//!
//! ## Constant Pool Overview
//!
//! Each entry starts with a one-byte tag. `Long` and `Double` occupy two
//! slots, so the slot after them is unusable. Only the entry kinds needed to
//! resolve names, member references and annotation constants are kept; the
//! rest are skipped by size.

use crate::error::{Error, Result};

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// Big-endian cursor over class file bytes
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                Error::class_format(
                    self.position,
                    format!(
                        "need {} bytes, have {}",
                        len,
                        self.data.len().saturating_sub(self.position)
                    ),
                )
            })?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    pub(crate) fn u1(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn u2(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u4(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u8(&mut self) -> Result<u64> {
        let b = self.bytes(8)?;
        Ok(u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }
}

/// A resolved-enough constant pool entry
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Constant {
    /// Slot 0, the second half of a long/double, or an entry we do not model
    Unusable,
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    MemberRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
}

/// The constant pool of one class file
#[derive(Debug, Clone, Default)]
pub(crate) struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Parses `constant_pool_count - 1` entries from the reader
    pub(crate) fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let count = reader.u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable);

        while entries.len() < count {
            let offset = reader.position();
            let tag = reader.u1()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = reader.u2()? as usize;
                    Constant::Utf8(decode_modified_utf8(reader.bytes(len)?))
                }
                TAG_INTEGER => Constant::Integer(reader.u4()? as i32),
                TAG_FLOAT => Constant::Float(f32::from_bits(reader.u4()?)),
                TAG_LONG => Constant::Long(reader.u8()? as i64),
                TAG_DOUBLE => Constant::Double(f64::from_bits(reader.u8()?)),
                TAG_CLASS => Constant::Class(reader.u2()?),
                TAG_STRING => Constant::String(reader.u2()?),
                TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF => Constant::MemberRef {
                    class: reader.u2()?,
                    name_and_type: reader.u2()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name: reader.u2()?,
                    descriptor: reader.u2()?,
                },
                TAG_METHOD_HANDLE => {
                    reader.skip(3)?;
                    Constant::Unusable
                }
                TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                    reader.skip(2)?;
                    Constant::Unusable
                }
                TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => {
                    reader.skip(4)?;
                    Constant::Unusable
                }
                other => {
                    return Err(Error::class_format(
                        offset,
                        format!("unknown constant pool tag {}", other),
                    ))
                }
            };

            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(constant);
            if wide {
                entries.push(Constant::Unusable);
            }
        }

        Ok(Self { entries })
    }

    pub(crate) fn get(&self, index: u16) -> Result<&Constant> {
        self.entries
            .get(index as usize)
            .ok_or_else(|| Error::class_format(0, format!("constant pool index {} out of range", index)))
    }

    /// Resolves a `CONSTANT_Utf8` entry
    pub(crate) fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => Err(Error::class_format(
                0,
                format!("constant {} is not Utf8: {:?}", index, other),
            )),
        }
    }

    /// Resolves a `CONSTANT_Class` entry to its internal name
    pub(crate) fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            other => Err(Error::class_format(
                0,
                format!("constant {} is not a Class: {:?}", index, other),
            )),
        }
    }

    /// Resolves a field/method reference to `(owner, name, descriptor)`
    pub(crate) fn member_ref(&self, index: u16) -> Result<(&str, &str, &str)> {
        match self.get(index)? {
            Constant::MemberRef {
                class,
                name_and_type,
            } => {
                let owner = self.class_name(*class)?;
                match self.get(*name_and_type)? {
                    Constant::NameAndType { name, descriptor } => {
                        Ok((owner, self.utf8(*name)?, self.utf8(*descriptor)?))
                    }
                    other => Err(Error::class_format(
                        0,
                        format!("constant {} is not a NameAndType: {:?}", name_and_type, other),
                    )),
                }
            }
            other => Err(Error::class_format(
                0,
                format!("constant {} is not a member reference: {:?}", index, other),
            )),
        }
    }
}

/// Decodes the JVM's modified UTF-8.
///
/// Differs from standard UTF-8 in encoding NUL as two bytes and
/// supplementary characters as surrogate pairs; both are folded back here.
/// Anything malformed becomes U+FFFD.
fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        if !bytes.contains(&0xC0) && !bytes.contains(&0xED) {
            return s.to_string();
        }
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            units.push((((b & 0x1F) as u16) << 6) | (bytes[i + 1] & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            units.push(
                (((b & 0x0F) as u16) << 12)
                    | (((bytes[i + 1] & 0x3F) as u16) << 6)
                    | (bytes[i + 2] & 0x3F) as u16,
            );
            i += 3;
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_big_endian() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u4().unwrap(), 0xCAFEBABE);
        assert_eq!(reader.u2().unwrap(), 52);
        assert!(reader.is_empty());
        assert!(reader.u1().is_err());
    }

    #[test]
    fn test_parse_pool_with_wide_entries() {
        let mut data = vec![0x00, 0x05];
        // #1 Long (takes slots 1 and 2)
        data.extend([TAG_LONG, 0, 0, 0, 0, 0, 0, 0, 7]);
        // #3 Utf8 "Foo"
        data.extend([TAG_UTF8, 0, 3, b'F', b'o', b'o']);
        // #4 Class -> #3
        data.extend([TAG_CLASS, 0, 3]);

        let pool = ConstantPool::parse(&mut ByteReader::new(&data)).unwrap();
        assert_eq!(pool.get(1).unwrap(), &Constant::Long(7));
        assert_eq!(pool.get(2).unwrap(), &Constant::Unusable);
        assert_eq!(pool.class_name(4).unwrap(), "Foo");
        assert!(pool.utf8(4).is_err());
        assert!(pool.get(9).is_err());
    }

    #[test]
    fn test_unknown_tag() {
        let data = [0x00, 0x02, 0x63];
        assert!(ConstantPool::parse(&mut ByteReader::new(&data)).is_err());
    }

    #[test]
    fn test_decode_modified_utf8() {
        assert_eq!(decode_modified_utf8(b"plain"), "plain");
        assert_eq!(decode_modified_utf8(&[b'a', 0xC0, 0x80, b'b']), "a\u{0}b");
        // U+1F600 as a surrogate pair
        let smiley = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode_modified_utf8(&smiley), "\u{1F600}");
    }
}
