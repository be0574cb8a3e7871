//! Type references, declarations and capability queries
//!
//! A module declares types; each declaration names its base class and the
//! interfaces it implements as [`TypeRef`]s such as `IHandler` or
//! `Handler<i32>`. Queries target a [`Capability`]: either a concrete type
//! reference or an open generic template like `Handler<>`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::module::traits::{ModuleError, ModuleIdentity};

/// Reference to a (possibly generic) type, e.g. `Handler<i32>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    name: String,
    args: Vec<TypeRef>,
}

/// Identity of a generic template: name plus number of type parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey {
    pub name: String,
    pub arity: usize,
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arity == 0 {
            return f.write_str(&self.name);
        }
        write!(f, "{}<{}>", self.name, ",".repeat(self.arity - 1))
    }
}

impl TypeRef {
    /// Non-generic reference
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Generic instantiation, e.g. `TypeRef::generic("Handler", vec![TypeRef::new("i32")])`
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Parse `Name` or `Name<Arg, ...>`
    pub fn parse(input: &str) -> Result<Self, ModuleError> {
        let mut parser = RefParser::new(input);
        let type_ref = parser.type_ref()?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(type_ref)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn is_generic(&self) -> bool {
        !self.args.is_empty()
    }

    /// Template identity, ignoring the concrete type arguments
    pub fn template_key(&self) -> TemplateKey {
        TemplateKey {
            name: self.name.clone(),
            arity: self.args.len(),
        }
    }

    /// Replace type parameters by their bound arguments
    pub(crate) fn substitute(&self, bindings: &HashMap<&str, &TypeRef>) -> TypeRef {
        if self.args.is_empty() {
            if let Some(bound) = bindings.get(self.name.as_str()) {
                return (*bound).clone();
            }
        }
        TypeRef {
            name: self.name.clone(),
            args: self.args.iter().map(|a| a.substitute(bindings)).collect(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("<")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(">")
    }
}

impl FromStr for TypeRef {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeRef::parse(s)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = ModuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

/// Deepest generic nesting accepted in a type reference
pub const MAX_TYPE_NESTING: usize = 64;

/// Recursive-descent parser for type references
struct RefParser<'a> {
    input: &'a str,
    pos: usize,
    /// Current `<` nesting depth
    depth: usize,
}

impl<'a> RefParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, ModuleError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == ':' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected type name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn type_ref(&mut self) -> Result<TypeRef, ModuleError> {
        let name = self.ident()?;
        let mut args = Vec::new();
        if self.eat('<') {
            if self.depth >= MAX_TYPE_NESTING {
                return Err(self.error("generic nesting too deep"));
            }
            self.depth += 1;
            loop {
                args.push(self.type_ref()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected ',' or '>'"));
            }
            self.depth -= 1;
        }
        Ok(TypeRef { name, args })
    }

    fn error(&self, reason: &str) -> ModuleError {
        ModuleError::InvalidTypeReference {
            input: abbreviate(self.input),
            reason: format!("{} at offset {}", reason, self.pos),
        }
    }
}

/// Input echoed in errors, cut to a readable length
fn abbreviate(input: &str) -> String {
    const MAX_ECHO: usize = 96;
    match input.char_indices().nth(MAX_ECHO) {
        Some((end, _)) => format!("{}...", &input[..end]),
        None => input.to_string(),
    }
}

/// Structural kind of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
}

/// A type as declared by a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    /// Type name without generic parameters
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Generic parameter names; non-empty makes this a generic type definition
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<String>,
    /// Base class (classes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<TypeRef>,
    /// Directly implemented interfaces (super-interfaces for interfaces)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<TypeRef>,
}

impl TypeDeclaration {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            is_abstract: false,
            type_params: Vec::new(),
            base: None,
            implements: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self {
            is_abstract: true,
            ..Self::class(name)
        }
    }

    pub fn with_type_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implementing(mut self, capability: TypeRef) -> Self {
        self.implements.push(capability);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_generic_definition(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Reference to this type itself, generic parameters as arguments
    pub fn self_ref(&self) -> TypeRef {
        TypeRef {
            name: self.name.clone(),
            args: self.type_params.iter().map(TypeRef::new).collect(),
        }
    }

    pub fn template_key(&self) -> TemplateKey {
        TemplateKey {
            name: self.name.clone(),
            arity: self.type_params.len(),
        }
    }
}

/// A matched type, as returned by capability queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// The type itself (generic parameters as arguments)
    pub type_ref: TypeRef,
    /// Owning module
    pub module: ModuleIdentity,
    pub kind: TypeKind,
    pub is_abstract: bool,
    pub is_generic_definition: bool,
    /// Every base class and interface the type implements, transitively
    pub capabilities: Vec<TypeRef>,
}

impl TypeDescriptor {
    pub fn name(&self) -> &str {
        self.type_ref.name()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_concrete_class(&self) -> bool {
        self.kind == TypeKind::Class && !self.is_abstract
    }
}

/// What a query looks for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// A specific type or closed generic instantiation
    Type(TypeRef),
    /// An open generic template, any type arguments
    GenericTemplate(TemplateKey),
}

impl Capability {
    pub fn of(type_ref: TypeRef) -> Self {
        Capability::Type(type_ref)
    }

    pub fn template(name: impl Into<String>, arity: usize) -> Self {
        Capability::GenericTemplate(TemplateKey {
            name: name.into(),
            arity,
        })
    }

    /// Parse `IHandler`, `Handler<i32>`, or an open template `Handler<>` / `Map<,>`
    pub fn parse(input: &str) -> Result<Self, ModuleError> {
        let trimmed = input.trim();
        if let (Some(open), true) = (trimmed.find('<'), trimmed.ends_with('>')) {
            let inner = &trimmed[open + 1..trimmed.len() - 1];
            if inner.chars().all(|c| c == ',' || c.is_whitespace()) {
                let name = trimmed[..open].trim();
                // Validate the name part with the regular parser
                let base = TypeRef::parse(name)?;
                if base.is_generic() {
                    return Err(ModuleError::InvalidTypeReference {
                        input: input.to_string(),
                        reason: "nested template syntax".to_string(),
                    });
                }
                let arity = inner.chars().filter(|c| *c == ',').count() + 1;
                return Ok(Capability::template(base.name, arity));
            }
        }
        TypeRef::parse(trimmed).map(Capability::Type)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Type(type_ref) => write!(f, "{}", type_ref),
            Capability::GenericTemplate(key) => write!(f, "{}", key),
        }
    }
}

impl FromStr for Capability {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::parse(s)
    }
}

/// A capability query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityQuery {
    pub capability: Capability,
    /// Exclude abstract classes (interfaces are always excluded)
    pub only_concrete_classes: bool,
}

impl CapabilityQuery {
    pub fn new(capability: Capability, only_concrete_classes: bool) -> Self {
        Self {
            capability,
            only_concrete_classes,
        }
    }

    /// Query for concrete classes only
    pub fn concrete(capability: Capability) -> Self {
        Self::new(capability, true)
    }
}
