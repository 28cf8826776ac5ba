use std::path::PathBuf;

use thiserror::Error;

use crate::types::TypeName;

#[derive(Error, Debug)]
pub enum ClassFormatError {
    #[error("not a class file (bad magic 0x{0:08X})")]
    BadMagic(u32),

    #[error("unexpected end of class file at offset {0}")]
    Truncated(usize),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant pool index {0} does not refer to a {1} entry")]
    BadConstantRef(u16, &'static str),

    #[error("two-slot constant at index {0} runs past the end of the constant pool")]
    WideConstantOverrun(u16),

    #[error("class file declares '{found}' but was looked up as '{expected}'")]
    NameMismatch { expected: TypeName, found: TypeName },

    #[error("unknown annotation element tag '{0}'")]
    UnknownElementTag(char),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to open archive '{path}'")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to read entry {index} of archive '{path}'")]
    ArchiveEntry {
        path: PathBuf,
        index: usize,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("changed file '{file}' is not under directory input '{root}'")]
    OutsideRoot { file: PathBuf, root: PathBuf },

    #[error("invalid exclude pattern '{pattern}'")]
    BadPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("type '{0}' not found on the classpath")]
    TypeNotFound(TypeName),

    #[error("failed to read '{name}' from '{origin}'")]
    Io {
        name: TypeName,
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed class file for '{name}' in '{origin}'")]
    Malformed {
        name: TypeName,
        origin: String,
        #[source]
        source: ClassFormatError,
    },

    #[error("failed to open classpath archive '{path}'")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("candidate type '{name}' could not be resolved")]
    Candidate {
        name: TypeName,
        #[source]
        source: ResolveError,
    },

    #[error("failed to inspect the hierarchy of '{name}'")]
    Hierarchy {
        name: TypeName,
        #[source]
        source: ResolveError,
    },
}
