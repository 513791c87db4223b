//! Constant pool rewriting for JVM class files.
//!
//! Only `CONSTANT_Utf8` entries change. Every other byte of the class file
//! is copied through, so the rewritten class stays structurally identical.
//! Each UTF-8 constant is classified by how the rest of the class refers to
//! it:
//!
//! - member, `NameAndType` and attribute names are never touched;
//! - class names, descriptors, signatures and unreferenced constants are
//!   rewritten as internal names (`com/google/Foo`) and `L...;` tokens;
//! - module names are rewritten as dotted names and package names as
//!   internal names;
//! - constants used only by `CONSTANT_String` are rewritten when the whole
//!   literal is a dotted or slashed qualified name.

use super::error::ClassFileError;
use super::rules::RuleSet;

const MAGIC: u32 = 0xCAFE_BABE;

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

/// How a UTF-8 constant is used. Later variants take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Usage {
    Unreferenced,
    Literal,
    Module,
    Package,
    Descriptor,
    Name,
}

#[derive(Debug)]
enum Constant {
    Utf8 {
        start: usize,
        end: usize,
        text: Option<String>,
    },
    Other,
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(ClassFileError::Truncated {
                offset: self.offset,
            })?;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(ClassFileError::Truncated {
                offset: self.offset,
            })?;
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFileError> {
        self.take(1)?
            .first()
            .copied()
            .ok_or(ClassFileError::Truncated {
                offset: self.offset,
            })
    }

    fn u16(&mut self) -> Result<u16, ClassFileError> {
        let bytes = self.take(2)?;
        Ok(bytes
            .iter()
            .fold(0u16, |acc, byte| (acc << 8) | u16::from(*byte)))
    }

    fn u32(&mut self) -> Result<u32, ClassFileError> {
        let bytes = self.take(4)?;
        Ok(bytes
            .iter()
            .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte)))
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassFileError> {
        self.take(len).map(|_| ())
    }
}

struct Pool {
    constants: Vec<Constant>,
    usage: Vec<Usage>,
}

impl Pool {
    fn mark(&mut self, index: u16, usage: Usage) -> Result<(), ClassFileError> {
        let slot = self
            .usage
            .get_mut(usize::from(index))
            .ok_or(ClassFileError::BadIndex { index })?;
        if usage > *slot {
            *slot = usage;
        }
        Ok(())
    }
}

fn read_pool(reader: &mut Reader<'_>) -> Result<Pool, ClassFileError> {
    let count = reader.u16()?;
    let mut constants = Vec::with_capacity(usize::from(count));
    constants.push(Constant::Other);
    let mut references: Vec<(u16, Usage)> = Vec::new();

    let mut index: u16 = 1;
    while index < count {
        let start = reader.offset;
        let tag = reader.u8()?;
        let mut wide = false;
        match tag {
            TAG_UTF8 => {
                let len = reader.u16()?;
                let raw = reader.take(usize::from(len))?;
                let text = std::str::from_utf8(raw).ok().map(str::to_owned);
                constants.push(Constant::Utf8 {
                    start,
                    end: reader.offset,
                    text,
                });
                index += 1;
                continue;
            }
            TAG_INTEGER | TAG_FLOAT => reader.skip(4)?,
            TAG_LONG | TAG_DOUBLE => {
                reader.skip(8)?;
                wide = true;
            }
            TAG_CLASS => references.push((reader.u16()?, Usage::Descriptor)),
            TAG_STRING => references.push((reader.u16()?, Usage::Literal)),
            TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF | TAG_DYNAMIC
            | TAG_INVOKE_DYNAMIC => reader.skip(4)?,
            TAG_NAME_AND_TYPE => {
                references.push((reader.u16()?, Usage::Name));
                references.push((reader.u16()?, Usage::Descriptor));
            }
            TAG_METHOD_HANDLE => reader.skip(3)?,
            TAG_METHOD_TYPE => references.push((reader.u16()?, Usage::Descriptor)),
            TAG_MODULE => references.push((reader.u16()?, Usage::Module)),
            TAG_PACKAGE => references.push((reader.u16()?, Usage::Package)),
            other => return Err(ClassFileError::UnknownTag { tag: other, index }),
        }
        constants.push(Constant::Other);
        if wide {
            constants.push(Constant::Other);
            index = index.saturating_add(2);
        } else {
            index += 1;
        }
    }

    let mut pool = Pool {
        usage: vec![Usage::Unreferenced; constants.len()],
        constants,
    };
    for (target, usage) in references {
        pool.mark(target, usage)?;
    }
    Ok(pool)
}

fn read_attributes(reader: &mut Reader<'_>, pool: &mut Pool) -> Result<(), ClassFileError> {
    let count = reader.u16()?;
    for _ in 0..count {
        pool.mark(reader.u16()?, Usage::Name)?;
        let len = reader.u32()?;
        reader.skip(usize::try_from(len).unwrap_or(usize::MAX))?;
    }
    Ok(())
}

fn read_members(reader: &mut Reader<'_>, pool: &mut Pool) -> Result<(), ClassFileError> {
    let count = reader.u16()?;
    for _ in 0..count {
        reader.skip(2)?;
        pool.mark(reader.u16()?, Usage::Name)?;
        pool.mark(reader.u16()?, Usage::Descriptor)?;
        read_attributes(reader, pool)?;
    }
    Ok(())
}

/// A cursor over a field descriptor, method descriptor or generic
/// signature that copies its input while relocating class type names.
///
/// Grammar punctuation is ASCII, so slicing at delimiter positions always
/// lands on character boundaries.
struct Signature<'a> {
    text: &'a str,
    pos: usize,
    out: String,
    rules: &'a RuleSet,
    changed: bool,
}

impl<'a> Signature<'a> {
    fn new(text: &'a str, rules: &'a RuleSet) -> Self {
        Self {
            text,
            pos: 0,
            out: String::with_capacity(text.len()),
            rules,
            changed: false,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.out.push(char::from(byte));
        self.pos += 1;
        Some(byte)
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        (self.bump()? == byte).then_some(())
    }

    /// Consume up to, not including, the next byte in `stops`.
    fn until(&mut self, stops: &[u8]) -> Option<&'a str> {
        let rest = self.text.get(self.pos..)?;
        let len = rest.bytes().position(|byte| stops.contains(&byte))?;
        self.pos += len;
        rest.get(..len)
    }

    fn copy_until(&mut self, stops: &[u8]) -> Option<()> {
        let identifier = self.until(stops)?;
        self.out.push_str(identifier);
        Some(())
    }

    fn java_type(&mut self) -> Option<()> {
        match self.peek()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V' => self.bump().map(drop),
            b'L' => self.class_type(),
            b'T' => {
                self.bump();
                self.copy_until(b";")?;
                self.bump().map(drop)
            }
            b'[' => {
                self.bump();
                self.java_type()
            }
            _ => None,
        }
    }

    fn class_type(&mut self) -> Option<()> {
        self.expect(b'L')?;
        let name = self.until(b";<.")?;
        match self.rules.relocate_name(name, '/') {
            Some(relocated) => {
                self.out.push_str(&relocated);
                self.changed = true;
            }
            None => self.out.push_str(name),
        }
        loop {
            match self.peek()? {
                b'<' => self.type_arguments()?,
                b'.' => {
                    self.bump();
                    self.copy_until(b";<.")?;
                }
                b';' => return self.bump().map(drop),
                _ => return None,
            }
        }
    }

    fn type_arguments(&mut self) -> Option<()> {
        self.expect(b'<')?;
        while self.peek()? != b'>' {
            match self.peek()? {
                b'*' => {
                    self.bump();
                }
                b'+' | b'-' => {
                    self.bump();
                    self.java_type()?;
                }
                _ => self.java_type()?,
            }
        }
        self.bump().map(drop)
    }

    fn type_parameters(&mut self) -> Option<()> {
        self.expect(b'<')?;
        while self.peek()? != b'>' {
            self.copy_until(b":")?;
            while self.peek()? == b':' {
                self.bump();
                if matches!(self.peek()?, b'L' | b'T' | b'[') {
                    self.java_type()?;
                }
            }
        }
        self.bump().map(drop)
    }

    /// Returns the rewritten text, or `None` when nothing changed or the
    /// input does not parse.
    fn rewrite(mut self) -> Option<String> {
        if self.peek()? == b'<' {
            self.type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            self.bump();
            while self.peek()? != b')' {
                self.java_type()?;
            }
            self.bump();
            self.java_type()?;
            while self.peek() == Some(b'^') {
                self.bump();
                self.java_type()?;
            }
        } else {
            while self.peek().is_some() {
                self.java_type()?;
            }
        }
        (self.pos == self.text.len() && self.changed).then_some(self.out)
    }
}

/// Rewrite a class name, descriptor or signature.
///
/// Strings without descriptor punctuation are treated as whole internal
/// names, which must contain a `/`.
fn relocate_descriptor(text: &str, rules: &RuleSet) -> Option<String> {
    if !text.contains([';', '(', '<', '[']) {
        if !text.contains('/') {
            return None;
        }
        return rules.relocate_name(text, '/');
    }
    Signature::new(text, rules).rewrite()
}

/// Rewrite a string literal that is, in its entirety, a dotted or slashed
/// qualified name. Anything containing whitespace or punctuation other than
/// `.`, `/`, `_`, `$` and `-` is treated as prose and left alone.
fn relocate_literal(text: &str, rules: &RuleSet) -> Option<String> {
    let structural = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '/' | '_' | '$' | '-'));
    if !structural {
        return None;
    }
    let separator = if text.contains('/') { '/' } else { '.' };
    rules.relocate_name(text, separator)
}

fn relocate_constant(text: &str, usage: Usage, rules: &RuleSet) -> Option<String> {
    match usage {
        Usage::Name => None,
        Usage::Descriptor | Usage::Unreferenced => relocate_descriptor(text, rules),
        Usage::Package => rules.relocate_name(text, '/'),
        Usage::Module => rules.relocate_name(text, '.'),
        Usage::Literal => relocate_literal(text, rules),
    }
}

/// Relocate the class file in `bytes`.
///
/// Returns `Ok(None)` when no constant changed.
pub(crate) fn relocate_class(bytes: &[u8], rules: &RuleSet) -> Result<Option<Vec<u8>>, ClassFileError> {
    let mut reader = Reader::new(bytes);
    if reader.u32()? != MAGIC {
        return Err(ClassFileError::BadMagic);
    }
    reader.skip(4)?;
    let pool_start = reader.offset + 2;
    let mut pool = read_pool(&mut reader)?;

    // access flags, this_class and super_class point at Class constants
    reader.skip(6)?;
    let interfaces = reader.u16()?;
    reader.skip(usize::from(interfaces) * 2)?;
    read_members(&mut reader, &mut pool)?;
    read_members(&mut reader, &mut pool)?;
    read_attributes(&mut reader, &mut pool)?;

    let mut replacements: Vec<(usize, usize, String)> = Vec::new();
    for (constant, usage) in pool.constants.iter().zip(&pool.usage) {
        let Constant::Utf8 {
            start,
            end,
            text: Some(text),
        } = constant
        else {
            continue;
        };
        if let Some(relocated) = relocate_constant(text, *usage, rules) {
            replacements.push((*start, *end, relocated));
        }
    }
    if replacements.is_empty() {
        return Ok(None);
    }

    let mut out = Vec::with_capacity(bytes.len() + replacements.len() * 32);
    out.extend_from_slice(bytes.get(..pool_start).unwrap_or_default());
    let mut cursor = pool_start;
    for (start, end, text) in replacements {
        out.extend_from_slice(bytes.get(cursor..start).unwrap_or_default());
        out.push(TAG_UTF8);
        let len = u16::try_from(text.len()).map_err(|_| ClassFileError::ConstantTooLong {
            length: text.len(),
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(text.as_bytes());
        cursor = end;
    }
    out.extend_from_slice(bytes.get(cursor..).unwrap_or_default());
    Ok(Some(out))
}

/// List the decodable UTF-8 constants of a class file, in pool order.
pub(crate) fn utf8_constants(bytes: &[u8]) -> Result<Vec<String>, ClassFileError> {
    let mut reader = Reader::new(bytes);
    if reader.u32()? != MAGIC {
        return Err(ClassFileError::BadMagic);
    }
    reader.skip(4)?;
    let pool = read_pool(&mut reader)?;
    Ok(pool
        .constants
        .into_iter()
        .filter_map(|constant| match constant {
            Constant::Utf8 { text, .. } => text,
            Constant::Other => None,
        })
        .collect())
}

#[cfg(test)]
#[path = "class_file_tests.rs"]
mod tests;
