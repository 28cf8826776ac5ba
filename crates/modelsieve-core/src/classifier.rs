use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MarkersConfig;
use crate::error::ClassifyError;
use crate::resolver::{has_marker_annotation, SuperclassLookup, TypeDescriptor, TypeResolver};
use crate::types::TypeName;

/// Where the model annotation was found, if anywhere within one hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationCheck {
    Present,
    Absent,
    /// Not on the type, and its superclass is not on the classpath.
    Unresolved,
}

/// Per-candidate classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Model,
    NotAnnotated,
    UnresolvedSuperclass,
    GeneratedProxy,
    SentinelBase,
}

impl Verdict {
    pub fn is_model(&self) -> bool {
        matches!(self, Verdict::Model)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Model => write!(f, "model"),
            Verdict::NotAnnotated => write!(f, "not annotated"),
            Verdict::UnresolvedSuperclass => write!(f, "unresolved superclass"),
            Verdict::GeneratedProxy => write!(f, "generated proxy"),
            Verdict::SentinelBase => write!(f, "sentinel base"),
        }
    }
}

/// Picks the domain model types out of a pass's direct units.
pub struct ModelClassifier {
    markers: MarkersConfig,
}

impl ModelClassifier {
    pub fn new(markers: &MarkersConfig) -> Self {
        Self {
            markers: markers.clone(),
        }
    }

    /// The subset of `direct_units` that are model types.
    pub fn classify<R: TypeResolver + ?Sized>(
        &self,
        direct_units: &BTreeSet<TypeName>,
        resolver: &mut R,
    ) -> Result<BTreeSet<TypeName>, ClassifyError> {
        let verdicts = self.classify_detailed(direct_units, resolver)?;
        Ok(verdicts
            .into_iter()
            .filter(|(_, verdict)| verdict.is_model())
            .map(|(name, _)| name)
            .collect())
    }

    /// A verdict for every candidate. Stops at the first candidate that
    /// cannot be resolved.
    pub fn classify_detailed<R: TypeResolver + ?Sized>(
        &self,
        direct_units: &BTreeSet<TypeName>,
        resolver: &mut R,
    ) -> Result<BTreeMap<TypeName, Verdict>, ClassifyError> {
        let mut verdicts = BTreeMap::new();
        for name in direct_units {
            let verdict = self.classify_one(name, resolver)?;
            debug!(%name, %verdict, "classified");
            verdicts.insert(name.clone(), verdict);
        }
        info!(
            candidates = verdicts.len(),
            models = verdicts.values().filter(|v| v.is_model()).count(),
            "classification complete"
        );
        Ok(verdicts)
    }

    pub fn classify_one<R: TypeResolver + ?Sized>(
        &self,
        name: &TypeName,
        resolver: &mut R,
    ) -> Result<Verdict, ClassifyError> {
        let descriptor = resolver
            .resolve(name)
            .map_err(|source| ClassifyError::Candidate {
                name: name.clone(),
                source,
            })?;

        match self.annotation_check(&descriptor, resolver)? {
            AnnotationCheck::Absent => return Ok(Verdict::NotAnnotated),
            AnnotationCheck::Unresolved => return Ok(Verdict::UnresolvedSuperclass),
            AnnotationCheck::Present => {}
        }

        let is_proxy = resolver
            .is_subtype_of(&descriptor, &self.markers.proxy_interface)
            .map_err(|source| ClassifyError::Hierarchy {
                name: name.clone(),
                source,
            })?;
        if is_proxy {
            return Ok(Verdict::GeneratedProxy);
        }
        if *name == self.markers.sentinel_base {
            return Ok(Verdict::SentinelBase);
        }
        Ok(Verdict::Model)
    }

    /// The annotation on the type itself, or else on its immediate
    /// superclass. Grandparents are never consulted.
    pub fn annotation_check<R: TypeResolver + ?Sized>(
        &self,
        descriptor: &TypeDescriptor,
        resolver: &mut R,
    ) -> Result<AnnotationCheck, ClassifyError> {
        let marker = &self.markers.model_annotation;
        if has_marker_annotation(descriptor, marker) {
            return Ok(AnnotationCheck::Present);
        }
        let lookup = resolver
            .immediate_superclass(descriptor)
            .map_err(|source| ClassifyError::Hierarchy {
                name: descriptor.name.clone(),
                source,
            })?;
        Ok(match lookup {
            SuperclassLookup::Resolved(parent) if has_marker_annotation(&parent, marker) => {
                AnnotationCheck::Present
            }
            SuperclassLookup::Resolved(_) | SuperclassLookup::Root => AnnotationCheck::Absent,
            SuperclassLookup::Unresolved(missing) => {
                debug!(name = %descriptor.name, superclass = %missing, "superclass unresolved, not a model");
                AnnotationCheck::Unresolved
            }
        })
    }
}
