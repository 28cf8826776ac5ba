use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::classfile::{self, ClassInfo};
use crate::classpath::Classpath;
use crate::error::{ClassFormatError, ResolveError};
use crate::types::TypeName;

/// Resolved metadata for one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: TypeName,
    pub superclass: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    /// Annotations present directly on the type.
    pub annotations: BTreeSet<TypeName>,
    pub is_interface: bool,
    pub origin: String,
}

impl TypeDescriptor {
    /// A bare descriptor extending `java.lang.Object`, for synthetic type graphs.
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            superclass: Some(TypeName::new("java.lang.Object")),
            interfaces: Vec::new(),
            annotations: BTreeSet::new(),
            is_interface: false,
            origin: "<memory>".to_string(),
        }
    }

    pub fn from_class_info(info: ClassInfo, origin: String) -> Self {
        let is_interface = info.is_interface();
        Self {
            name: info.name,
            superclass: info.super_class,
            interfaces: info.interfaces,
            annotations: info.annotations.into_iter().collect(),
            is_interface,
            origin,
        }
    }

    pub fn extends(mut self, superclass: impl Into<TypeName>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn root(mut self) -> Self {
        self.superclass = None;
        self
    }

    pub fn implements(mut self, interface: impl Into<TypeName>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn annotated(mut self, annotation: impl Into<TypeName>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    /// Direct supertypes: the superclass first, then declared interfaces.
    pub fn supertypes(&self) -> impl Iterator<Item = &TypeName> {
        self.superclass.iter().chain(self.interfaces.iter())
    }
}

/// True iff `marker` is present directly on the type. Never consults supertypes.
pub fn has_marker_annotation(descriptor: &TypeDescriptor, marker: &TypeName) -> bool {
    descriptor.annotations.contains(marker)
}

/// Outcome of a one-hop superclass lookup.
#[derive(Debug, Clone)]
pub enum SuperclassLookup {
    Resolved(Arc<TypeDescriptor>),
    /// The superclass is declared but not on the classpath.
    Unresolved(TypeName),
    /// The type declares no superclass at all.
    Root,
}

/// Lookup from type names to descriptors over a partially resolvable classpath.
///
/// Implementations may cache; a resolver belongs to a single pass.
pub trait TypeResolver {
    /// Resolve `name`, failing with [`ResolveError::TypeNotFound`] if no
    /// source holds it.
    fn resolve(&mut self, name: &TypeName) -> Result<Arc<TypeDescriptor>, ResolveError>;

    /// Resolve exactly one hop up. A missing superclass is `Unresolved`,
    /// not an error; malformed or unreadable superclasses still fail.
    fn immediate_superclass(
        &mut self,
        descriptor: &TypeDescriptor,
    ) -> Result<SuperclassLookup, ResolveError> {
        let Some(superclass) = &descriptor.superclass else {
            return Ok(SuperclassLookup::Root);
        };
        match self.resolve(superclass) {
            Ok(resolved) => Ok(SuperclassLookup::Resolved(resolved)),
            Err(ResolveError::TypeNotFound(name)) => Ok(SuperclassLookup::Unresolved(name)),
            Err(e) => Err(e),
        }
    }

    /// Whether `descriptor` is `interface` or reaches it anywhere in its
    /// transitive superclass/interface hierarchy. Ancestors that cannot be
    /// resolved end their branch of the walk.
    fn is_subtype_of(
        &mut self,
        descriptor: &TypeDescriptor,
        interface: &TypeName,
    ) -> Result<bool, ResolveError> {
        let mut seen: HashSet<TypeName> = HashSet::new();
        let mut pending: Vec<TypeName> = vec![descriptor.name.clone()];
        let mut first = Some(descriptor.clone());

        while let Some(name) = pending.pop() {
            if &name == interface {
                return Ok(true);
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            let current = match first.take() {
                Some(d) => Arc::new(d),
                None => match self.resolve(&name) {
                    Ok(d) => d,
                    Err(ResolveError::TypeNotFound(_)) => continue,
                    Err(e) => return Err(e),
                },
            };
            pending.extend(current.supertypes().cloned());
        }
        Ok(false)
    }
}

/// Resolver over a fixed set of registered descriptors.
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    types: HashMap<TypeName, Arc<TypeDescriptor>>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types
            .insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.insert(descriptor);
        self
    }
}

impl TypeResolver for InMemoryResolver {
    fn resolve(&mut self, name: &TypeName) -> Result<Arc<TypeDescriptor>, ResolveError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::TypeNotFound(name.clone()))
    }
}

/// Supertype edges discovered so far in this pass.
#[derive(Default)]
struct Hierarchy {
    graph: DiGraph<TypeName, ()>,
    index: HashMap<TypeName, NodeIndex>,
    expanded: HashSet<TypeName>,
}

impl Hierarchy {
    fn node(&mut self, name: &TypeName) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.index.insert(name.clone(), idx);
        idx
    }

    fn add_edges(&mut self, descriptor: &TypeDescriptor) {
        let from = self.node(&descriptor.name);
        for supertype in descriptor.supertypes() {
            let to = self.node(supertype);
            self.graph.update_edge(from, to, ());
        }
    }

    fn reaches(&self, from: &TypeName, to: &TypeName) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }
}

/// Lazily caching resolver backed by class files on a [`Classpath`].
pub struct ClasspathResolver {
    classpath: Classpath,
    cache: HashMap<TypeName, Arc<TypeDescriptor>>,
    missing: HashSet<TypeName>,
    hierarchy: Hierarchy,
}

impl ClasspathResolver {
    pub fn new(classpath: Classpath) -> Self {
        Self {
            classpath,
            cache: HashMap::new(),
            missing: HashSet::new(),
            hierarchy: Hierarchy::default(),
        }
    }

    /// Number of descriptors resolved so far in this pass.
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of names looked up and found missing so far in this pass.
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Add every ancestor reachable from `descriptor` to the hierarchy graph.
    fn expand(&mut self, descriptor: &TypeDescriptor) -> Result<(), ResolveError> {
        let mut pending = vec![descriptor.clone()];
        while let Some(current) = pending.pop() {
            if !self.hierarchy.expanded.insert(current.name.clone()) {
                continue;
            }
            self.hierarchy.add_edges(&current);
            for supertype in current.supertypes() {
                if self.hierarchy.expanded.contains(supertype) {
                    continue;
                }
                match self.resolve(supertype) {
                    Ok(resolved) => pending.push((*resolved).clone()),
                    Err(ResolveError::TypeNotFound(name)) => {
                        debug!(ancestor = %name, of = %current.name, "ancestor not on classpath");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }
}

impl TypeResolver for ClasspathResolver {
    fn resolve(&mut self, name: &TypeName) -> Result<Arc<TypeDescriptor>, ResolveError> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(Arc::clone(cached));
        }
        if self.missing.contains(name) {
            return Err(ResolveError::TypeNotFound(name.clone()));
        }

        let Some(found) = self.classpath.find(name)? else {
            self.missing.insert(name.clone());
            return Err(ResolveError::TypeNotFound(name.clone()));
        };
        let malformed = |source: ClassFormatError| ResolveError::Malformed {
            name: name.clone(),
            origin: found.origin.clone(),
            source,
        };
        let info = classfile::parse(&found.bytes).map_err(malformed)?;
        if &info.name != name {
            return Err(malformed(ClassFormatError::NameMismatch {
                expected: name.clone(),
                found: info.name,
            }));
        }
        let descriptor = Arc::new(TypeDescriptor::from_class_info(info, found.origin));
        debug!(name = %name, origin = %descriptor.origin, "resolved");
        self.cache.insert(name.clone(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    fn is_subtype_of(
        &mut self,
        descriptor: &TypeDescriptor,
        interface: &TypeName,
    ) -> Result<bool, ResolveError> {
        if &descriptor.name == interface {
            return Ok(true);
        }
        self.expand(descriptor)?;
        Ok(self.hierarchy.reaches(&descriptor.name, interface))
    }
}
