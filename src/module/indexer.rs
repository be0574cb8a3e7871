//! Capability indexing
//!
//! Builds the type universe of a module set and matches its declarations
//! against a [`CapabilityQuery`]. Assignability is transitive through base
//! classes and super-interfaces declared anywhere in the set, with generic
//! arguments substituted along the way. References to types outside the set
//! are opaque leaves.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::module::registry::dependencies::ModuleDependencies;
use crate::module::traits::{Module, ModuleError, ModuleIdentity};
use crate::module::types::{
    Capability, CapabilityQuery, TemplateKey, TypeDeclaration, TypeDescriptor, TypeRef,
};

/// Upper bound on capabilities collected for one type
const MAX_CLOSURE_SIZE: usize = 1024;

/// A module whose types could not be introspected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectionFailure {
    pub module: ModuleIdentity,
    pub message: String,
}

/// Matches plus per-module failures of one query
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Matching types, in module order then declaration order
    pub matches: Vec<TypeDescriptor>,
    pub failures: Vec<IntrospectionFailure>,
}

impl QueryResult {
    /// True when every module could be introspected
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fail the whole query if any module failed
    pub fn into_strict(self) -> Result<Vec<TypeDescriptor>, ModuleError> {
        if self.failures.is_empty() {
            return Ok(self.matches);
        }
        let messages: Vec<&str> = self.failures.iter().map(|f| f.message.as_str()).collect();
        Err(ModuleError::Introspection(messages.join("\n")))
    }

    /// Log failures and keep the matches from the remaining modules
    pub fn into_lenient(self) -> Vec<TypeDescriptor> {
        for failure in &self.failures {
            warn!(
                "Excluding types of module {} from query: {}",
                failure.module, failure.message
            );
        }
        self.matches
    }
}

/// Capability matcher over a module set
pub struct TypeIndexer<'a> {
    /// Modules that passed introspection, in query order
    modules: Vec<&'a Arc<Module>>,
    /// Declarations by template key; first declaration wins
    universe: HashMap<TemplateKey, &'a TypeDeclaration>,
    failures: Vec<IntrospectionFailure>,
}

impl<'a> TypeIndexer<'a> {
    /// Index a module set
    ///
    /// A module with unmet dependencies is recorded as a failure and its types
    /// take no part in the universe.
    pub fn new(modules: &'a [Arc<Module>]) -> Self {
        let report = ModuleDependencies::check(modules);
        let unresolved: HashSet<&ModuleIdentity> =
            report.unresolved.iter().map(|(identity, _)| identity).collect();
        let healthy: Vec<&'a Arc<Module>> = modules
            .iter()
            .filter(|module| !unresolved.contains(module.identity()))
            .collect();
        let failures = report
            .unresolved
            .iter()
            .map(|(identity, problems)| IntrospectionFailure {
                module: identity.clone(),
                message: problems.join("; "),
            })
            .collect();

        let mut universe = HashMap::new();
        for module in healthy.iter().copied() {
            for declaration in module.types() {
                universe
                    .entry(declaration.template_key())
                    .or_insert(declaration);
            }
        }

        Self {
            modules: healthy,
            universe,
            failures,
        }
    }

    /// Index `modules` and run one query
    pub fn find(query: &CapabilityQuery, modules: &[Arc<Module>]) -> QueryResult {
        TypeIndexer::new(modules).query(query)
    }

    pub fn query(&self, query: &CapabilityQuery) -> QueryResult {
        let mut matches = Vec::new();

        for module in &self.modules {
            for declaration in module.types() {
                if declaration.is_interface() {
                    continue;
                }
                if query.only_concrete_classes && declaration.is_abstract {
                    continue;
                }

                let capabilities = self.closure(declaration);
                if !Self::matches(&query.capability, declaration, &capabilities) {
                    continue;
                }

                debug!(
                    "{} in {} matches {}",
                    declaration.name,
                    module.full_name(),
                    query.capability
                );
                matches.push(TypeDescriptor {
                    type_ref: declaration.self_ref(),
                    module: module.identity().clone(),
                    kind: declaration.kind,
                    is_abstract: declaration.is_abstract,
                    is_generic_definition: declaration.is_generic_definition(),
                    capabilities,
                });
            }
        }

        QueryResult {
            matches,
            failures: self.failures.clone(),
        }
    }

    pub fn failures(&self) -> &[IntrospectionFailure] {
        &self.failures
    }

    fn matches(capability: &Capability, declaration: &TypeDeclaration, closure: &[TypeRef]) -> bool {
        match capability {
            Capability::Type(target) => {
                declaration.self_ref() == *target || closure.iter().any(|c| c == target)
            }
            Capability::GenericTemplate(key) => {
                declaration.template_key() == *key
                    || closure.iter().any(|c| c.is_generic() && c.template_key() == *key)
            }
        }
    }

    /// Every base class and interface of `declaration`, transitively
    fn closure(&self, declaration: &TypeDeclaration) -> Vec<TypeRef> {
        let mut seen: HashSet<TypeRef> = HashSet::new();
        let mut result = Vec::new();
        let mut pending: Vec<TypeRef> = Self::direct_parents(declaration).cloned().collect();
        pending.reverse();

        while let Some(parent) = pending.pop() {
            if result.len() >= MAX_CLOSURE_SIZE {
                warn!(
                    "Capability closure of {} truncated at {} entries",
                    declaration.name, MAX_CLOSURE_SIZE
                );
                break;
            }
            if !seen.insert(parent.clone()) {
                continue;
            }

            if let Some(parent_decl) = self.universe.get(&parent.template_key()) {
                let bindings: HashMap<&str, &TypeRef> = parent_decl
                    .type_params
                    .iter()
                    .map(String::as_str)
                    .zip(parent.args())
                    .collect();
                let mut inherited: Vec<TypeRef> = Self::direct_parents(parent_decl)
                    .map(|p| p.substitute(&bindings))
                    .collect();
                inherited.reverse();
                pending.extend(inherited);
            }

            result.push(parent);
        }
        result
    }

    fn direct_parents(declaration: &TypeDeclaration) -> impl Iterator<Item = &TypeRef> {
        declaration.base.iter().chain(declaration.implements.iter())
    }
}
