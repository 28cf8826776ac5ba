//! Test fixtures for modelsieve
//!
//! Synthesizes real class files and archives so scanner, resolver and
//! classifier tests run against the same bytes a compiler would emit.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const ACC_PUBLIC: u16 = 0x0001;
const ACC_SUPER: u16 = 0x0020;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;

struct Annotation {
    descriptor: String,
    string_elements: Vec<(String, String)>,
}

/// Builder for a minimal but well-formed class file.
pub struct ClassFileBuilder {
    name: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    visible: Vec<Annotation>,
    invisible: Vec<Annotation>,
    fields: Vec<String>,
    methods: Vec<String>,
    longs: Vec<i64>,
    is_interface: bool,
}

impl ClassFileBuilder {
    /// `name` is in internal form, e.g. "com/example/Dog".
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            visible: Vec::new(),
            invisible: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            longs: Vec::new(),
            is_interface: false,
        }
    }

    pub fn super_class(mut self, name: &str) -> Self {
        self.super_class = Some(name.to_string());
        self
    }

    pub fn no_super_class(mut self) -> Self {
        self.super_class = None;
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    /// Mark this class file as declaring an interface.
    pub fn interface_type(mut self) -> Self {
        self.is_interface = true;
        self
    }

    pub fn annotation(mut self, name: &str) -> Self {
        self.visible.push(Annotation {
            descriptor: format!("L{name};"),
            string_elements: Vec::new(),
        });
        self
    }

    pub fn invisible_annotation(mut self, name: &str) -> Self {
        self.invisible.push(Annotation {
            descriptor: format!("L{name};"),
            string_elements: Vec::new(),
        });
        self
    }

    pub fn annotation_with_string_element(mut self, name: &str, key: &str, value: &str) -> Self {
        self.visible.push(Annotation {
            descriptor: format!("L{name};"),
            string_elements: vec![(key.to_string(), value.to_string())],
        });
        self
    }

    pub fn field(mut self, name: &str) -> Self {
        self.fields.push(name.to_string());
        self
    }

    pub fn method(mut self, name: &str) -> Self {
        self.methods.push(name.to_string());
        self
    }

    pub fn long_constant(mut self, value: i64) -> Self {
        self.longs.push(value);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();

        let this_idx = pool.class(&self.name);
        let super_idx = self.super_class.as_deref().map_or(0, |s| pool.class(s));
        let iface_idx: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        for value in &self.longs {
            pool.long(*value);
        }

        let field_desc = pool.utf8("I");
        let method_desc = pool.utf8("()V");
        let deprecated = pool.utf8("Deprecated");
        let code = pool.utf8("Code");
        let fields: Vec<u16> = self.fields.iter().map(|f| pool.utf8(f)).collect();
        let methods: Vec<u16> = self.methods.iter().map(|m| pool.utf8(m)).collect();

        let source_file_name = pool.utf8("SourceFile");
        let source_file = pool.utf8("Synthetic.java");
        let visible_name = pool.utf8("RuntimeVisibleAnnotations");
        let invisible_name = pool.utf8("RuntimeInvisibleAnnotations");
        let visible = encode_annotations(&mut pool, &self.visible);
        let invisible = encode_annotations(&mut pool, &self.invisible);

        let mut out = Vec::new();
        put_u32(&mut out, 0xCAFE_BABE);
        put_u16(&mut out, 0);
        put_u16(&mut out, 52);
        put_u16(&mut out, pool.next);
        out.extend_from_slice(&pool.bytes);

        let flags = if self.is_interface {
            ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT
        } else {
            ACC_PUBLIC | ACC_SUPER
        };
        put_u16(&mut out, flags);
        put_u16(&mut out, this_idx);
        put_u16(&mut out, super_idx);
        put_u16(&mut out, iface_idx.len() as u16);
        for idx in &iface_idx {
            put_u16(&mut out, *idx);
        }

        put_u16(&mut out, fields.len() as u16);
        for name in &fields {
            put_u16(&mut out, ACC_PUBLIC);
            put_u16(&mut out, *name);
            put_u16(&mut out, field_desc);
            put_u16(&mut out, 1);
            put_u16(&mut out, deprecated);
            put_u32(&mut out, 0);
        }

        put_u16(&mut out, methods.len() as u16);
        for name in &methods {
            put_u16(&mut out, ACC_PUBLIC);
            put_u16(&mut out, *name);
            put_u16(&mut out, method_desc);
            put_u16(&mut out, 1);
            put_u16(&mut out, code);
            put_u32(&mut out, 4);
            out.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        }

        let mut attributes: Vec<(u16, Vec<u8>)> = vec![(source_file_name, source_file.to_be_bytes().to_vec())];
        if !self.visible.is_empty() {
            attributes.push((visible_name, visible));
        }
        if !self.invisible.is_empty() {
            attributes.push((invisible_name, invisible));
        }
        put_u16(&mut out, attributes.len() as u16);
        for (name, body) in attributes {
            put_u16(&mut out, name);
            put_u32(&mut out, body.len() as u32);
            out.extend_from_slice(&body);
        }
        out
    }
}

fn encode_annotations(pool: &mut PoolBuilder, annotations: &[Annotation]) -> Vec<u8> {
    let mut body = Vec::new();
    put_u16(&mut body, annotations.len() as u16);
    for ann in annotations {
        put_u16(&mut body, pool.utf8(&ann.descriptor));
        put_u16(&mut body, ann.string_elements.len() as u16);
        for (key, value) in &ann.string_elements {
            put_u16(&mut body, pool.utf8(key));
            body.push(b's');
            put_u16(&mut body, pool.utf8(value));
        }
    }
    body
}

struct PoolBuilder {
    bytes: Vec<u8>,
    next: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
            utf8: HashMap::new(),
            classes: HashMap::new(),
        }
    }
}

impl PoolBuilder {
    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&idx) = self.utf8.get(value) {
            return idx;
        }
        self.bytes.push(1);
        put_u16(&mut self.bytes, value.len() as u16);
        self.bytes.extend_from_slice(value.as_bytes());
        let idx = self.bump(1);
        self.utf8.insert(value.to_string(), idx);
        idx
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(&idx) = self.classes.get(name) {
            return idx;
        }
        let name_idx = self.utf8(name);
        self.bytes.push(7);
        put_u16(&mut self.bytes, name_idx);
        let idx = self.bump(1);
        self.classes.insert(name.to_string(), idx);
        idx
    }

    fn long(&mut self, value: i64) -> u16 {
        self.bytes.push(5);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self.bump(2)
    }

    fn bump(&mut self, slots: u16) -> u16 {
        let idx = self.next;
        self.next += slots;
        idx
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write `bytes` as `<root>/<internal name>.class`, returning the file path.
pub fn write_class(root: &Path, internal_name: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(format!("{internal_name}.class"));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// Write a zip archive with the given raw entry names and contents.
/// Names ending in `/` become directory entries.
pub fn write_archive(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Convenience: class file bytes for `name` extending `super_class`.
pub fn class_bytes(name: &str, super_class: &str) -> Vec<u8> {
    ClassFileBuilder::new(name).super_class(super_class).build()
}
