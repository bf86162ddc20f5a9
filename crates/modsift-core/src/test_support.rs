//! Builders for in-memory class files and archives used by unit tests.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// An annotation element value to encode
#[derive(Debug, Clone, Copy)]
pub(crate) enum Value {
    Str(&'static str),
    Bool(bool),
    Int(i32),
    Enum(&'static str, &'static str),
}

#[derive(Default)]
struct PoolBuilder {
    entries: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, u16>,
}

impl PoolBuilder {
    fn push(&mut self, entry: Vec<u8>) -> u16 {
        if let Some(&i) = self.index.get(&entry) {
            return i;
        }
        self.entries.push(entry.clone());
        let i = self.entries.len() as u16;
        self.index.insert(entry, i);
        i
    }

    fn utf8(&mut self, s: &str) -> u16 {
        let mut entry = vec![1];
        entry.extend((s.len() as u16).to_be_bytes());
        entry.extend(s.as_bytes());
        self.push(entry)
    }

    fn integer(&mut self, v: i32) -> u16 {
        let mut entry = vec![3];
        entry.extend(v.to_be_bytes());
        self.push(entry)
    }

    fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        let mut entry = vec![7];
        entry.extend(name.to_be_bytes());
        self.push(entry)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut entry = vec![12];
        entry.extend(name.to_be_bytes());
        entry.extend(descriptor.to_be_bytes());
        self.push(entry)
    }

    fn methodref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        let mut entry = vec![10];
        entry.extend(class.to_be_bytes());
        entry.extend(nat.to_be_bytes());
        self.push(entry)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend((self.entries.len() as u16 + 1).to_be_bytes());
        for entry in &self.entries {
            out.extend(entry);
        }
    }
}

type Invocation = (String, String, String);

/// Assembles a minimal, well-formed class file
pub(crate) struct ClassBuilder {
    name: String,
    super_name: String,
    annotations: Vec<(String, Vec<(String, Value)>)>,
    methods: Vec<(String, String, Vec<Invocation>)>,
}

impl ClassBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_name: "java/lang/Object".to_string(),
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub(crate) fn super_class(mut self, name: &str) -> Self {
        self.super_name = name.to_string();
        self
    }

    pub(crate) fn annotation(mut self, descriptor: &str, elements: &[(&str, Value)]) -> Self {
        self.annotations.push((
            descriptor.to_string(),
            elements.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        ));
        self
    }

    /// Adds a method whose body invokes each `(owner, name, descriptor)` in turn
    pub(crate) fn method(mut self, name: &str, descriptor: &str, calls: &[(&str, &str, &str)]) -> Self {
        self.methods.push((
            name.to_string(),
            descriptor.to_string(),
            calls
                .iter()
                .map(|(o, n, d)| (o.to_string(), n.to_string(), d.to_string()))
                .collect(),
        ));
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        let mut body = Vec::new();

        body.extend(0x0021u16.to_be_bytes());
        body.extend(pool.class(&self.name).to_be_bytes());
        body.extend(pool.class(&self.super_name).to_be_bytes());
        body.extend(0u16.to_be_bytes()); // interfaces
        body.extend(0u16.to_be_bytes()); // fields

        body.extend((self.methods.len() as u16).to_be_bytes());
        for (name, descriptor, calls) in &self.methods {
            body.extend(0x0001u16.to_be_bytes());
            body.extend(pool.utf8(name).to_be_bytes());
            body.extend(pool.utf8(descriptor).to_be_bytes());

            let mut code = Vec::new();
            for (owner, name, descriptor) in calls {
                code.push(0xB6);
                code.extend(pool.methodref(owner, name, descriptor).to_be_bytes());
            }
            code.push(0xB1);

            body.extend(1u16.to_be_bytes());
            body.extend(pool.utf8("Code").to_be_bytes());
            body.extend((12 + code.len() as u32).to_be_bytes());
            body.extend(2u16.to_be_bytes()); // max_stack
            body.extend(2u16.to_be_bytes()); // max_locals
            body.extend((code.len() as u32).to_be_bytes());
            body.extend(&code);
            body.extend(0u16.to_be_bytes()); // exception table
            body.extend(0u16.to_be_bytes()); // attributes
        }

        if self.annotations.is_empty() {
            body.extend(0u16.to_be_bytes());
        } else {
            let mut attr = Vec::new();
            attr.extend((self.annotations.len() as u16).to_be_bytes());
            for (descriptor, elements) in &self.annotations {
                attr.extend(pool.utf8(descriptor).to_be_bytes());
                attr.extend((elements.len() as u16).to_be_bytes());
                for (name, value) in elements {
                    attr.extend(pool.utf8(name).to_be_bytes());
                    match value {
                        Value::Str(s) => {
                            attr.push(b's');
                            attr.extend(pool.utf8(s).to_be_bytes());
                        }
                        Value::Bool(b) => {
                            attr.push(b'Z');
                            attr.extend(pool.integer(i32::from(*b)).to_be_bytes());
                        }
                        Value::Int(i) => {
                            attr.push(b'I');
                            attr.extend(pool.integer(*i).to_be_bytes());
                        }
                        Value::Enum(ty, constant) => {
                            attr.push(b'e');
                            attr.extend(pool.utf8(ty).to_be_bytes());
                            attr.extend(pool.utf8(constant).to_be_bytes());
                        }
                    }
                }
            }
            body.extend(1u16.to_be_bytes());
            body.extend(pool.utf8("RuntimeVisibleAnnotations").to_be_bytes());
            body.extend((attr.len() as u32).to_be_bytes());
            body.extend(attr);
        }

        let mut out = Vec::new();
        out.extend(0xCAFE_BABEu32.to_be_bytes());
        out.extend(0u16.to_be_bytes());
        out.extend(52u16.to_be_bytes());
        pool.write(&mut out);
        out.extend(body);
        out
    }
}

/// Builds a stored (uncompressed) zip archive from `(name, contents)` pairs
pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::ClassFile;

    #[test]
    fn test_built_class_parses() {
        let bytes = ClassBuilder::new("a/B")
            .annotation("La/M;", &[("n", Value::Int(3))])
            .build();
        let class = ClassFile::parse(&bytes).unwrap();
        assert_eq!(class.header.name, "a/B");
        assert_eq!(class.annotations.len(), 1);
    }

    #[test]
    fn test_zip_bytes_roundtrip() {
        let bytes = zip_bytes(&[("a.txt", b"hi".as_slice())]);
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
    }
}
