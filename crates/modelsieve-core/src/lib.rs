pub mod classfile;
pub mod classifier;
pub mod classpath;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod types;

pub use classifier::{AnnotationCheck, ModelClassifier, Verdict};
pub use config::Config;
pub use pipeline::{IncrementalPass, PassOutcome};
pub use resolver::{ClasspathResolver, InMemoryResolver, SuperclassLookup, TypeDescriptor, TypeResolver};
pub use scanner::ChangeSetScanner;
pub use types::*;
