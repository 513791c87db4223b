//! Helpers for building fixtures in tests.
//!
//! Available to this crate's unit tests and, through the `test-support`
//! feature, to integration tests and downstream crates.

use crate::archive::{self, ArchiveError, WriteOptions};
use crate::model::{Entry, EntryPath};
use crate::relocator::class_file;
use camino::Utf8Path;

const ACC_PUBLIC_SUPER: u16 = 0x0021;
const JAVA_8_MAJOR: u16 = 52;

enum PoolEntry {
    Utf8(String),
    Class(u16),
    String(u16),
    Long(i64),
    NameAndType(u16, u16),
    Methodref(u16, u16),
}

struct Member {
    name: u16,
    descriptor: u16,
}

/// Builds small but structurally valid class files.
///
/// # Examples
///
/// ```
/// use jarshade::test_support::{ClassFileBuilder, class_strings};
///
/// let bytes = ClassFileBuilder::new("com/google/common/Foo")
///     .method("apply", "(Lcom/google/common/Bar;)V")
///     .build();
/// assert!(class_strings(&bytes).contains(&"apply".to_owned()));
/// ```
pub struct ClassFileBuilder {
    pool: Vec<PoolEntry>,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    attributes: Vec<(u16, Vec<u8>)>,
}

impl ClassFileBuilder {
    /// Start a class named `internal_name` extending `java/lang/Object`.
    #[must_use]
    pub fn new(internal_name: &str) -> Self {
        let mut builder = Self {
            pool: Vec::new(),
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        };
        builder.this_class = builder.class(internal_name);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    fn push(&mut self, entry: PoolEntry) -> u16 {
        let index = self
            .pool
            .iter()
            .map(|entry| if matches!(entry, PoolEntry::Long(_)) { 2 } else { 1 })
            .sum::<u16>()
            + 1;
        self.pool.push(entry);
        index
    }

    fn utf8(&mut self, text: &str) -> u16 {
        self.push(PoolEntry::Utf8(text.to_owned()))
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.push(PoolEntry::Class(name))
    }

    /// Replace the superclass.
    #[must_use]
    pub fn extends(mut self, internal_name: &str) -> Self {
        self.super_class = self.class(internal_name);
        self
    }

    /// Add an implemented interface.
    #[must_use]
    pub fn implements(mut self, internal_name: &str) -> Self {
        let index = self.class(internal_name);
        self.interfaces.push(index);
        self
    }

    /// Declare a field.
    #[must_use]
    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        let member = Member {
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
        };
        self.fields.push(member);
        self
    }

    /// Declare a method without code.
    #[must_use]
    pub fn method(mut self, name: &str, descriptor: &str) -> Self {
        let member = Member {
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
        };
        self.methods.push(member);
        self
    }

    /// Add a reference to a method of another class.
    #[must_use]
    pub fn method_ref(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        let class = self.class(owner);
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let name_and_type = self.push(PoolEntry::NameAndType(name, descriptor));
        self.push(PoolEntry::Methodref(class, name_and_type));
        self
    }

    /// Add a `CONSTANT_String` literal.
    #[must_use]
    pub fn string_literal(mut self, literal: &str) -> Self {
        let text = self.utf8(literal);
        self.push(PoolEntry::String(text));
        self
    }

    /// Add a `CONSTANT_Long`, which occupies two pool slots.
    #[must_use]
    pub fn long_constant(mut self, value: i64) -> Self {
        self.push(PoolEntry::Long(value));
        self
    }

    /// Attach a class-level `Signature` attribute.
    #[must_use]
    pub fn signature(mut self, signature: &str) -> Self {
        let name = self.utf8("Signature");
        let value = self.utf8(signature);
        self.attributes.push((name, value.to_be_bytes().to_vec()));
        self
    }

    /// Serialise the class file.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABE_u32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&JAVA_8_MAJOR.to_be_bytes());

        let slots: u16 = self
            .pool
            .iter()
            .map(|entry| if matches!(entry, PoolEntry::Long(_)) { 2 } else { 1 })
            .sum();
        out.extend_from_slice(&(slots + 1).to_be_bytes());
        for entry in &self.pool {
            match entry {
                PoolEntry::Utf8(text) => {
                    out.push(1);
                    let len = u16::try_from(text.len()).unwrap_or(u16::MAX);
                    out.extend_from_slice(&len.to_be_bytes());
                    out.extend_from_slice(text.as_bytes());
                }
                PoolEntry::Class(name) => {
                    out.push(7);
                    out.extend_from_slice(&name.to_be_bytes());
                }
                PoolEntry::String(text) => {
                    out.push(8);
                    out.extend_from_slice(&text.to_be_bytes());
                }
                PoolEntry::Long(value) => {
                    out.push(5);
                    out.extend_from_slice(&value.to_be_bytes());
                }
                PoolEntry::NameAndType(name, descriptor) => {
                    out.push(12);
                    out.extend_from_slice(&name.to_be_bytes());
                    out.extend_from_slice(&descriptor.to_be_bytes());
                }
                PoolEntry::Methodref(class, name_and_type) => {
                    out.push(10);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&name_and_type.to_be_bytes());
                }
            }
        }

        out.extend_from_slice(&ACC_PUBLIC_SUPER.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        write_count(&mut out, self.interfaces.len());
        for interface in &self.interfaces {
            out.extend_from_slice(&interface.to_be_bytes());
        }
        for members in [&self.fields, &self.methods] {
            write_count(&mut out, members.len());
            for member in members {
                out.extend_from_slice(&0x0001_u16.to_be_bytes());
                out.extend_from_slice(&member.name.to_be_bytes());
                out.extend_from_slice(&member.descriptor.to_be_bytes());
                write_count(&mut out, 0);
            }
        }
        write_count(&mut out, self.attributes.len());
        for (name, info) in &self.attributes {
            out.extend_from_slice(&name.to_be_bytes());
            let len = u32::try_from(info.len()).unwrap_or(u32::MAX);
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(info);
        }
        out
    }
}

fn write_count(out: &mut Vec<u8>, count: usize) {
    let count = u16::try_from(count).unwrap_or(u16::MAX);
    out.extend_from_slice(&count.to_be_bytes());
}

/// List the UTF-8 constants of a class file; empty when it does not parse.
#[must_use]
pub fn class_strings(bytes: &[u8]) -> Vec<String> {
    class_file::utf8_constants(bytes).unwrap_or_default()
}

/// Build an entry, panicking on an invalid path.
///
/// # Panics
///
/// Panics when `path` is not a valid entry path.
#[must_use]
pub fn entry(path: &str, data: impl Into<Vec<u8>>) -> Entry {
    #[expect(clippy::expect_used, reason = "fixture paths are literals")]
    let path = EntryPath::new(path).expect("fixture entry path is valid");
    Entry::new(path, data.into())
}

/// Write `entries` as a jar at `path`.
///
/// # Errors
///
/// Returns [`ArchiveError`] when the jar cannot be written.
pub fn write_fixture_jar(path: &Utf8Path, entries: &[Entry]) -> Result<(), ArchiveError> {
    archive::write_jar(
        path,
        &archive::render_manifest(None),
        entries.iter().map(|entry| (&entry.path, entry.data.as_slice())),
        WriteOptions::default(),
    )
}
