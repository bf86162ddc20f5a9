//! Structural class file reading.
//!
//! This module parses one compiled class into a [`ClassFile`] and replays it
//! as a sequence of structural events to any number of [`ClassVisitor`]s.
//!
//! ## Event Order
//!
//! 1. [`ClassVisitor::visit_header`] once
//! 2. [`ClassVisitor::visit_annotation`] per class-level annotation
//! 3. [`ClassVisitor::visit_method`] per method, each followed by
//!    [`ClassVisitor::visit_method_insn`] for every invocation in its body
//! 4. [`ClassVisitor::visit_end`] once
//!
//! Parsing is completed before the first event is emitted, so a malformed
//! class never produces a partial event stream.
//!
//! ## Extensibility
//!
//! Visitors are independent listeners composed over one traversal:
//!
//! ```no_run
//! use modsift_core::classfile::{ClassFile, ClassHeader, ClassVisitor};
//!
//! struct SuperclassPrinter;
//!
//! impl<C> ClassVisitor<C> for SuperclassPrinter {
//!     fn visit_header(&mut self, _ctx: &mut C, header: &ClassHeader) {
//!         println!("{:?}", header.super_name);
//!     }
//! }
//!
//! # let bytes: Vec<u8> = Vec::new();
//! let class = ClassFile::parse(&bytes)?;
//! class.accept(&mut (), &mut [&mut SuperclassPrinter]);
//! # Ok::<(), modsift_core::Error>(())
//! ```

mod bytecode;
mod pool;

use crate::error::{Error, Result};
use pool::{ByteReader, Constant, ConstantPool};

pub use bytecode::MethodInsn;

/// Class file magic number
const MAGIC: u32 = 0xCAFE_BABE;

const ATTR_CODE: &str = "Code";
const ATTR_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
const ATTR_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";

/// Class-level header information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    /// Class file `(major, minor)` version
    pub version: (u16, u16),
    /// Access flags
    pub access_flags: u16,
    /// Internal name, e.g. `com/example/MyMod`
    pub name: String,
    /// Internal name of the superclass (absent only for `java/lang/Object`)
    pub super_name: Option<String>,
    /// Implemented interfaces
    pub interfaces: Vec<String>,
}

impl ClassHeader {
    /// The last segment of the internal name
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// An annotation element value
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// `B`, `C`, `I` or `S` constant
    Int(i32),
    /// `J` constant
    Long(i64),
    /// `F` constant
    Float(f32),
    /// `D` constant
    Double(f64),
    /// `Z` constant
    Bool(bool),
    /// `s` constant
    Str(String),
    /// Enum constant `(type descriptor, constant name)`
    Enum {
        /// Enum type descriptor
        descriptor: String,
        /// Constant name
        value: String,
    },
    /// Class literal descriptor
    Class(String),
    /// Nested annotation
    Annotation(Annotation),
    /// Array of values
    Array(Vec<ElementValue>),
}

impl ElementValue {
    /// Returns the value as a string if it is a string constant
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ElementValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a boolean if it is a boolean constant
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ElementValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A class-level annotation
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Type descriptor, e.g. `Lcpw/mods/fml/common/Mod;`
    pub descriptor: String,
    /// Whether it came from `RuntimeVisibleAnnotations`
    pub visible: bool,
    /// Element name/value pairs in declaration order
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    /// Looks up an element by name
    pub fn get(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// A declared method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Access flags
    pub access_flags: u16,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Invocations in the body (empty for abstract/native or when code is skipped)
    pub invocations: Vec<MethodInsn>,
}

/// Listener for the structural events of one class.
///
/// All methods default to no-ops; implement only what you need. `C` is the
/// mutable context threaded through every event.
pub trait ClassVisitor<C> {
    /// Called once with the class header
    fn visit_header(&mut self, ctx: &mut C, header: &ClassHeader) {
        let _ = (ctx, header);
    }

    /// Called for each class-level annotation
    fn visit_annotation(&mut self, ctx: &mut C, annotation: &Annotation) {
        let _ = (ctx, annotation);
    }

    /// Called for each declared method, before its invocations
    fn visit_method(&mut self, ctx: &mut C, method: &Method) {
        let _ = (ctx, method);
    }

    /// Called for each invocation inside the most recently visited method
    fn visit_method_insn(&mut self, ctx: &mut C, insn: &MethodInsn) {
        let _ = (ctx, insn);
    }

    /// Called once after all other events
    fn visit_end(&mut self, ctx: &mut C) {
        let _ = ctx;
    }
}

/// Options controlling how much of a class is decoded
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Do not decode method bodies
    pub skip_code: bool,
}

impl ReaderOptions {
    /// Creates options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether method bodies are skipped
    pub fn skip_code(mut self, skip: bool) -> Self {
        self.skip_code = skip;
        self
    }
}

/// A parsed class file
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Header information
    pub header: ClassHeader,
    /// Class-level annotations (visible first, then invisible)
    pub annotations: Vec<Annotation>,
    /// Declared methods
    pub methods: Vec<Method>,
}

impl ClassFile {
    /// Parses a class file with default options
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_options(data, &ReaderOptions::default())
    }

    /// Parses a class file
    pub fn parse_with_options(data: &[u8], options: &ReaderOptions) -> Result<Self> {
        let mut reader = ByteReader::new(data);

        let magic = reader.u4()?;
        if magic != MAGIC {
            return Err(Error::class_format(0, format!("bad magic 0x{:08x}", magic)));
        }
        let minor = reader.u2()?;
        let major = reader.u2()?;
        let pool = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.u2()?;
        let name = pool.class_name(reader.u2()?)?.to_string();
        let super_index = reader.u2()?;
        let super_name = if super_index == 0 {
            None
        } else {
            Some(pool.class_name(super_index)?.to_string())
        };
        let interface_count = reader.u2()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(reader.u2()?)?.to_string());
        }

        // Fields carry nothing we use
        let field_count = reader.u2()?;
        for _ in 0..field_count {
            reader.skip(6)?;
            skip_attributes(&mut reader)?;
        }

        let method_count = reader.u2()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(parse_method(&mut reader, &pool, options)?);
        }

        let mut visible = Vec::new();
        let mut invisible = Vec::new();
        let attribute_count = reader.u2()?;
        for _ in 0..attribute_count {
            let attr_name = pool.utf8(reader.u2()?)?;
            let len = reader.u4()? as usize;
            let body = reader.bytes(len)?;
            match attr_name {
                ATTR_VISIBLE_ANNOTATIONS => {
                    visible = parse_annotations(&mut ByteReader::new(body), &pool, true)?
                }
                ATTR_INVISIBLE_ANNOTATIONS => {
                    invisible = parse_annotations(&mut ByteReader::new(body), &pool, false)?
                }
                _ => {}
            }
        }
        visible.extend(invisible);

        Ok(Self {
            header: ClassHeader {
                version: (major, minor),
                access_flags,
                name,
                super_name,
                interfaces,
            },
            annotations: visible,
            methods,
        })
    }

    /// Replays this class to every visitor, in order, for each event
    pub fn accept<C>(&self, ctx: &mut C, visitors: &mut [&mut dyn ClassVisitor<C>]) {
        for visitor in visitors.iter_mut() {
            visitor.visit_header(ctx, &self.header);
        }
        for annotation in &self.annotations {
            for visitor in visitors.iter_mut() {
                visitor.visit_annotation(ctx, annotation);
            }
        }
        for method in &self.methods {
            for visitor in visitors.iter_mut() {
                visitor.visit_method(ctx, method);
            }
            for insn in &method.invocations {
                for visitor in visitors.iter_mut() {
                    visitor.visit_method_insn(ctx, insn);
                }
            }
        }
        for visitor in visitors.iter_mut() {
            visitor.visit_end(ctx);
        }
    }
}

fn skip_attributes(reader: &mut ByteReader<'_>) -> Result<()> {
    let count = reader.u2()?;
    for _ in 0..count {
        reader.skip(2)?;
        let len = reader.u4()? as usize;
        reader.skip(len)?;
    }
    Ok(())
}

fn parse_method(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    options: &ReaderOptions,
) -> Result<Method> {
    let access_flags = reader.u2()?;
    let name = pool.utf8(reader.u2()?)?.to_string();
    let descriptor = pool.utf8(reader.u2()?)?.to_string();

    let mut invocations = Vec::new();
    let attribute_count = reader.u2()?;
    for _ in 0..attribute_count {
        let attr_name = pool.utf8(reader.u2()?)?;
        let len = reader.u4()? as usize;
        let body = reader.bytes(len)?;
        if attr_name == ATTR_CODE && !options.skip_code {
            let mut code_reader = ByteReader::new(body);
            code_reader.skip(4)?; // max_stack, max_locals
            let code_len = code_reader.u4()? as usize;
            let code = code_reader.bytes(code_len)?;
            invocations = bytecode::method_invocations(code, pool)?;
        }
    }

    Ok(Method {
        access_flags,
        name,
        descriptor,
        invocations,
    })
}

fn parse_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<Vec<Annotation>> {
    let count = reader.u2()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(parse_annotation(reader, pool, visible)?);
    }
    Ok(annotations)
}

fn parse_annotation(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<Annotation> {
    let descriptor = pool.utf8(reader.u2()?)?.to_string();
    let pair_count = reader.u2()?;
    let mut elements = Vec::with_capacity(pair_count as usize);
    for _ in 0..pair_count {
        let name = pool.utf8(reader.u2()?)?.to_string();
        let value = parse_element_value(reader, pool, visible)?;
        elements.push((name, value));
    }
    Ok(Annotation {
        descriptor,
        visible,
        elements,
    })
}

fn parse_element_value(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<ElementValue> {
    let offset = reader.position();
    let tag = reader.u1()?;
    let value = match tag {
        b'B' | b'C' | b'I' | b'S' | b'Z' => match pool.get(reader.u2()?)? {
            Constant::Integer(v) if tag == b'Z' => ElementValue::Bool(*v != 0),
            Constant::Integer(v) => ElementValue::Int(*v),
            other => return Err(mismatched_constant(offset, tag, other)),
        },
        b'J' => match pool.get(reader.u2()?)? {
            Constant::Long(v) => ElementValue::Long(*v),
            other => return Err(mismatched_constant(offset, tag, other)),
        },
        b'F' => match pool.get(reader.u2()?)? {
            Constant::Float(v) => ElementValue::Float(*v),
            other => return Err(mismatched_constant(offset, tag, other)),
        },
        b'D' => match pool.get(reader.u2()?)? {
            Constant::Double(v) => ElementValue::Double(*v),
            other => return Err(mismatched_constant(offset, tag, other)),
        },
        b's' => ElementValue::Str(pool.utf8(reader.u2()?)?.to_string()),
        b'e' => ElementValue::Enum {
            descriptor: pool.utf8(reader.u2()?)?.to_string(),
            value: pool.utf8(reader.u2()?)?.to_string(),
        },
        b'c' => ElementValue::Class(pool.utf8(reader.u2()?)?.to_string()),
        b'@' => ElementValue::Annotation(parse_annotation(reader, pool, visible)?),
        b'[' => {
            let count = reader.u2()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(parse_element_value(reader, pool, visible)?);
            }
            ElementValue::Array(values)
        }
        other => {
            return Err(Error::class_format(
                offset,
                format!("unknown element value tag '{}'", other as char),
            ))
        }
    };
    Ok(value)
}

fn mismatched_constant(offset: usize, tag: u8, constant: &Constant) -> Error {
    Error::class_format(
        offset,
        format!(
            "element value '{}' points at {:?}",
            tag as char, constant
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ClassBuilder, Value};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ClassVisitor<Vec<String>> for Recorder {
        fn visit_header(&mut self, ctx: &mut Vec<String>, header: &ClassHeader) {
            self.events.push(format!("header {}", header.name));
            ctx.push("header".into());
        }

        fn visit_annotation(&mut self, _ctx: &mut Vec<String>, annotation: &Annotation) {
            self.events.push(format!("annotation {}", annotation.descriptor));
        }

        fn visit_method(&mut self, _ctx: &mut Vec<String>, method: &Method) {
            self.events.push(format!("method {}{}", method.name, method.descriptor));
        }

        fn visit_method_insn(&mut self, _ctx: &mut Vec<String>, insn: &MethodInsn) {
            self.events
                .push(format!("insn {}.{}{}", insn.owner, insn.name, insn.descriptor));
        }

        fn visit_end(&mut self, ctx: &mut Vec<String>) {
            self.events.push("end".into());
            ctx.push("end".into());
        }
    }

    #[test]
    fn test_parse_header_and_methods() {
        let bytes = ClassBuilder::new("com/example/Thing")
            .super_class("net/minecraft/src/BaseMod")
            .method("load", "()V", &[("net/minecraft/src/ModLoader", "addName", "(Ljava/lang/Object;Ljava/lang/String;)V")])
            .build();

        let class = ClassFile::parse(&bytes).unwrap();
        assert_eq!(class.header.name, "com/example/Thing");
        assert_eq!(class.header.simple_name(), "Thing");
        assert_eq!(
            class.header.super_name.as_deref(),
            Some("net/minecraft/src/BaseMod")
        );
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.methods[0].invocations.len(), 1);
        assert_eq!(class.methods[0].invocations[0].name, "addName");
    }

    #[test]
    fn test_skip_code() {
        let bytes = ClassBuilder::new("a/B")
            .method("run", "()V", &[("a/C", "go", "()V")])
            .build();
        let class =
            ClassFile::parse_with_options(&bytes, &ReaderOptions::new().skip_code(true)).unwrap();
        assert!(class.methods[0].invocations.is_empty());
    }

    #[test]
    fn test_parse_annotation_values() {
        let bytes = ClassBuilder::new("a/B")
            .annotation(
                "Lcpw/mods/fml/common/Mod;",
                &[
                    ("modid", Value::Str("acme")),
                    ("clientSideOnly", Value::Bool(true)),
                    ("side", Value::Enum("La/Side;", "CLIENT")),
                ],
            )
            .build();

        let class = ClassFile::parse(&bytes).unwrap();
        let annotation = &class.annotations[0];
        assert!(annotation.visible);
        assert_eq!(annotation.get("modid").and_then(ElementValue::as_str), Some("acme"));
        assert_eq!(
            annotation.get("clientSideOnly").and_then(ElementValue::as_bool),
            Some(true)
        );
        assert_eq!(
            annotation.get("side"),
            Some(&ElementValue::Enum {
                descriptor: "La/Side;".into(),
                value: "CLIENT".into()
            })
        );
    }

    #[test]
    fn test_event_order() {
        let bytes = ClassBuilder::new("a/B")
            .annotation("La/Marker;", &[])
            .method("f", "()V", &[("a/C", "g", "()I")])
            .build();
        let class = ClassFile::parse(&bytes).unwrap();

        let mut first = Recorder::default();
        let mut second = Recorder::default();
        let mut ctx = Vec::new();
        class.accept(&mut ctx, &mut [&mut first, &mut second]);

        assert_eq!(
            first.events,
            vec![
                "header a/B",
                "annotation La/Marker;",
                "method f()V",
                "insn a/C.g()I",
                "end"
            ]
        );
        assert_eq!(first.events, second.events);
        assert_eq!(ctx, vec!["header", "header", "end", "end"]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let err = ClassFile::parse(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_rejects_truncated_class() {
        let bytes = ClassBuilder::new("a/B").build();
        assert!(ClassFile::parse(&bytes[..bytes.len() - 3]).is_err());
    }
}
