//! Minimal reader for compiled JVM class files.
//!
//! Only the parts needed to describe a type's place in the hierarchy are
//! decoded: the constant pool, this/super class, interfaces, and class-level
//! annotations. Fields and methods are skipped structurally.

use crate::error::ClassFormatError;
use crate::types::TypeName;

const MAGIC: u32 = 0xCAFE_BABE;

pub const ACC_INTERFACE: u16 = 0x0200;

const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";

/// The decoded header of one class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: TypeName,
    pub access_flags: u16,
    pub super_class: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    /// Annotation types present directly on the class, visible or not.
    pub annotations: Vec<TypeName>,
}

impl ClassInfo {
    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class(u16),
    Other,
    /// Second slot of a long or double.
    Unusable,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFormatError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ClassFormatError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFormatError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFormatError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFormatError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, n: usize) -> Result<(), ClassFormatError> {
        self.take(n).map(|_| ())
    }
}

struct ConstantPool(Vec<Constant>);

impl ConstantPool {
    fn read(reader: &mut Reader<'_>) -> Result<Self, ClassFormatError> {
        let count = reader.u16()?;
        // Index 0 is never valid.
        let mut entries = vec![Constant::Unusable];
        let mut index = 1u16;
        while index < count {
            let tag = reader.u8()?;
            let entry = match tag {
                1 => {
                    let len = reader.u16()? as usize;
                    let raw = reader.take(len)?;
                    Constant::Utf8(String::from_utf8_lossy(raw).into_owned())
                }
                7 => Constant::Class(reader.u16()?),
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    // Occupies `index` and `index + 1`, both of which must be below `count`.
                    if index + 1 >= count {
                        return Err(ClassFormatError::WideConstantOverrun(index));
                    }
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                _ => return Err(ClassFormatError::UnknownConstantTag { tag, index }),
            };
            entries.push(entry);
            index += 1;
        }
        Ok(Self(entries))
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFormatError> {
        match self.0.get(index as usize) {
            Some(Constant::Utf8(s)) => Ok(s),
            _ => Err(ClassFormatError::BadConstantRef(index, "Utf8")),
        }
    }

    fn class_name(&self, index: u16) -> Result<TypeName, ClassFormatError> {
        match self.0.get(index as usize) {
            Some(Constant::Class(name_index)) => Ok(TypeName::from_internal(self.utf8(*name_index)?)),
            _ => Err(ClassFormatError::BadConstantRef(index, "Class")),
        }
    }
}

/// Decode the class header of `bytes`.
pub fn parse(bytes: &[u8]) -> Result<ClassInfo, ClassFormatError> {
    let mut reader = Reader::new(bytes);

    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFormatError::BadMagic(magic));
    }
    // minor, major
    reader.skip(4)?;

    let pool = ConstantPool::read(&mut reader)?;
    let access_flags = reader.u16()?;
    let name = pool.class_name(reader.u16()?)?;

    let super_index = reader.u16()?;
    let super_class = if super_index == 0 {
        None
    } else {
        Some(pool.class_name(super_index)?)
    };

    let interface_count = reader.u16()?;
    let interfaces = (0..interface_count)
        .map(|_| reader.u16().and_then(|idx| pool.class_name(idx)))
        .collect::<Result<Vec<_>, _>>()?;

    // fields, then methods
    for _ in 0..2 {
        let member_count = reader.u16()?;
        for _ in 0..member_count {
            reader.skip(6)?;
            skip_attributes(&mut reader)?;
        }
    }

    let mut annotations = Vec::new();
    let attribute_count = reader.u16()?;
    for _ in 0..attribute_count {
        let attr_name = pool.utf8(reader.u16()?)?;
        let len = reader.u32()? as usize;
        let body = reader.take(len)?;
        if attr_name == RUNTIME_VISIBLE_ANNOTATIONS || attr_name == RUNTIME_INVISIBLE_ANNOTATIONS {
            read_annotations(&mut Reader::new(body), &pool, &mut annotations)?;
        }
    }

    Ok(ClassInfo {
        name,
        access_flags,
        super_class,
        interfaces,
        annotations,
    })
}

fn skip_attributes(reader: &mut Reader<'_>) -> Result<(), ClassFormatError> {
    let count = reader.u16()?;
    for _ in 0..count {
        reader.skip(2)?;
        let len = reader.u32()? as usize;
        reader.skip(len)?;
    }
    Ok(())
}

fn read_annotations(
    reader: &mut Reader<'_>,
    pool: &ConstantPool,
    out: &mut Vec<TypeName>,
) -> Result<(), ClassFormatError> {
    let count = reader.u16()?;
    for _ in 0..count {
        let descriptor = pool.utf8(reader.u16()?)?;
        out.push(descriptor_type(descriptor));
        skip_element_pairs(reader)?;
    }
    Ok(())
}

fn skip_element_pairs(reader: &mut Reader<'_>) -> Result<(), ClassFormatError> {
    let pairs = reader.u16()?;
    for _ in 0..pairs {
        reader.skip(2)?;
        skip_element_value(reader)?;
    }
    Ok(())
}

fn skip_element_value(reader: &mut Reader<'_>) -> Result<(), ClassFormatError> {
    let tag = reader.u8()? as char;
    match tag {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' | 's' | 'c' => reader.skip(2),
        'e' => reader.skip(4),
        '@' => {
            reader.skip(2)?;
            skip_element_pairs(reader)
        }
        '[' => {
            let n = reader.u16()?;
            for _ in 0..n {
                skip_element_value(reader)?;
            }
            Ok(())
        }
        other => Err(ClassFormatError::UnknownElementTag(other)),
    }
}

/// "Lcom/example/Marker;" -> com.example.Marker
fn descriptor_type(descriptor: &str) -> TypeName {
    let inner = descriptor
        .strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .unwrap_or(descriptor);
    TypeName::from_internal(inner)
}
