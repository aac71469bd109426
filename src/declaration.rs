//! Declaration model lowered from a parsed Rust source unit.
//!
//! The generator never looks at `syn` types directly. A source file is
//! lowered once into a [`DeclarationModel`]: structs become records, traits
//! become interfaces and string constants become literals. Items that play no
//! part in document generation are skipped.

use crate::error::{Error, Result};
use log::debug;
use quote::ToTokens;
use std::fmt;
use syn::{Attribute, Expr, Fields, FnArg, GenericArgument, Lit, Pat, PathArguments, ReturnType};

/// Attribute carrying a raw field annotation, e.g. `#[tag = "{min:1}"]`.
pub const TAG_ATTRIBUTE: &str = "tag";

/// An ordered sequence of top-level declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclarationModel {
    pub declarations: Vec<Declaration>,
}

/// One top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Record(RecordDecl),
    Interface(InterfaceDecl),
    Literal(LiteralDecl),
}

/// A record type: a name and its fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

/// A record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Contributes another record as the structural parent
    Embedded { parent: String },
    /// A regular named field with an optional raw annotation
    Named {
        name: String,
        ty: TypeExpr,
        annotation: Option<String>,
    },
}

/// An interface and its methods in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: String,
    pub methods: Vec<Method>,
}

/// An interface method.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    /// Documentation text, one line per doc comment line
    pub doc: String,
    pub params: Vec<Param>,
    pub results: Vec<TypeExpr>,
}

/// A named, typed method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
}

/// A string constant.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralDecl {
    pub name: String,
    pub value: String,
}

/// The literals the generator gives meaning to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// Hand-written document fragment grafted under the generated sections
    BaseDocument,
    /// Security scheme annotation
    Security,
}

/// A declared type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A primitive or a reference to another declaration
    Named(String),
    /// A sequence of the inner type
    Array(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named(name.to_string())
    }

    pub fn array(inner: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(inner))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Array(inner) => write!(f, "Vec<{}>", inner),
        }
    }
}

impl LiteralDecl {
    /// Classifies the literal by name, ignoring case and underscores, so
    /// `OPENAPI_SPEC` and `OpenAPISpec` are the same literal.
    pub fn kind(&self) -> Option<LiteralKind> {
        literal_kind(&self.name)
    }
}

fn literal_kind(name: &str) -> Option<LiteralKind> {
    match name.replace('_', "").to_lowercase().as_str() {
        "openapispec" => Some(LiteralKind::BaseDocument),
        "auth" => Some(LiteralKind::Security),
        _ => None,
    }
}

impl DeclarationModel {
    /// Lowers every supported item of a parsed file, in source order.
    pub fn from_file(file: &syn::File) -> Result<Self> {
        let mut declarations = Vec::new();

        for item in &file.items {
            match item {
                syn::Item::Struct(item_struct) => {
                    if let Some(record) = lower_struct(item_struct)? {
                        declarations.push(Declaration::Record(record));
                    }
                }
                syn::Item::Trait(item_trait) => {
                    declarations.push(Declaration::Interface(lower_trait(item_trait)?));
                }
                syn::Item::Const(item_const) => {
                    if let Some(literal) = lower_literal(&item_const.ident, &item_const.expr)? {
                        declarations.push(Declaration::Literal(literal));
                    }
                }
                syn::Item::Static(item_static) => {
                    if let Some(literal) = lower_literal(&item_static.ident, &item_static.expr)? {
                        declarations.push(Declaration::Literal(literal));
                    }
                }
                _ => {}
            }
        }

        debug!("Lowered {} declarations", declarations.len());
        Ok(Self { declarations })
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Record(record) => Some(record),
            _ => None,
        })
    }
}

fn lower_struct(item_struct: &syn::ItemStruct) -> Result<Option<RecordDecl>> {
    let name = item_struct.ident.to_string();
    let named = match &item_struct.fields {
        Fields::Named(named) => named,
        Fields::Unit => {
            return Ok(Some(RecordDecl {
                name,
                fields: Vec::new(),
            }))
        }
        Fields::Unnamed(_) => {
            debug!("Skipping tuple struct {}", name);
            return Ok(None);
        }
    };

    let mut fields = Vec::new();
    for field in &named.named {
        let field_name = field
            .ident
            .as_ref()
            .map(|i| i.to_string())
            .unwrap_or_default();

        if is_flattened(&field.attrs) {
            match lower_type(&field.ty, &format!("{}.{}", name, field_name))? {
                TypeExpr::Named(parent) => fields.push(Field::Embedded { parent }),
                TypeExpr::Array(_) => {
                    return Err(Error::InvalidEmbeddedField {
                        record: name,
                        field: field_name,
                    })
                }
            }
            continue;
        }

        let ty = lower_type(&field.ty, &format!("{}.{}", name, field_name))?;
        fields.push(Field::Named {
            name: field_name,
            ty,
            annotation: tag_annotation(&field.attrs),
        });
    }

    debug!("Lowered record {} with {} fields", name, fields.len());
    Ok(Some(RecordDecl { name, fields }))
}

fn lower_trait(item_trait: &syn::ItemTrait) -> Result<InterfaceDecl> {
    let name = item_trait.ident.to_string();
    let mut methods = Vec::new();

    for item in &item_trait.items {
        let syn::TraitItem::Fn(trait_fn) = item else {
            continue;
        };
        let sig = &trait_fn.sig;
        let method_name = sig.ident.to_string();
        let context = format!("{}::{}", name, method_name);

        let mut params = Vec::new();
        for input in &sig.inputs {
            let FnArg::Typed(pat_type) = input else {
                continue;
            };
            let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
                return Err(Error::UnnamedParameter { method: context });
            };
            params.push(Param {
                name: pat_ident.ident.to_string(),
                ty: lower_type(&pat_type.ty, &context)?,
            });
        }

        let results = match &sig.output {
            ReturnType::Default => Vec::new(),
            ReturnType::Type(_, ty) => match ty.as_ref() {
                syn::Type::Tuple(tuple) => tuple
                    .elems
                    .iter()
                    .map(|elem| lower_type(elem, &context))
                    .collect::<Result<Vec<_>>>()?,
                other => vec![lower_type(other, &context)?],
            },
        };

        methods.push(Method {
            name: method_name,
            doc: doc_text(&trait_fn.attrs),
            params,
            results,
        });
    }

    debug!("Lowered interface {} with {} methods", name, methods.len());
    Ok(InterfaceDecl { name, methods })
}

fn lower_literal(ident: &syn::Ident, expr: &Expr) -> Result<Option<LiteralDecl>> {
    let name = ident.to_string();
    match strip_groups(expr) {
        Expr::Lit(expr_lit) => {
            if let Lit::Str(s) = &expr_lit.lit {
                return Ok(Some(LiteralDecl {
                    name,
                    value: s.value(),
                }));
            }
        }
        _ => {}
    }

    if literal_kind(&name).is_some() {
        return Err(Error::InvalidLiteral { name });
    }
    debug!("Skipping non-string constant {}", name);
    Ok(None)
}

fn strip_groups(expr: &Expr) -> &Expr {
    match expr {
        Expr::Group(group) => strip_groups(&group.expr),
        Expr::Paren(paren) => strip_groups(&paren.expr),
        other => other,
    }
}

/// Lowers a `syn` type into a [`TypeExpr`], rejecting every shape other than
/// plain identifiers and sequences.
fn lower_type(ty: &syn::Type, context: &str) -> Result<TypeExpr> {
    let unsupported = || Error::UnsupportedType {
        context: context.to_string(),
        type_repr: ty.to_token_stream().to_string(),
    };

    match ty {
        syn::Type::Path(type_path)
            if type_path.qself.is_none()
                && type_path.path.leading_colon.is_none()
                && type_path.path.segments.len() == 1 =>
        {
            let segment = type_path.path.segments.first().ok_or_else(unsupported)?;
            let ident = segment.ident.to_string();
            match &segment.arguments {
                PathArguments::None => Ok(TypeExpr::Named(ident)),
                PathArguments::AngleBracketed(args) if ident == "Vec" && args.args.len() == 1 => {
                    match args.args.first() {
                        Some(GenericArgument::Type(inner)) => {
                            Ok(TypeExpr::array(lower_type(inner, context)?))
                        }
                        _ => Err(unsupported()),
                    }
                }
                _ => Err(unsupported()),
            }
        }
        syn::Type::Slice(slice) => Ok(TypeExpr::array(lower_type(&slice.elem, context)?)),
        syn::Type::Array(array) => Ok(TypeExpr::array(lower_type(&array.elem, context)?)),
        syn::Type::Paren(paren) => lower_type(&paren.elem, context),
        syn::Type::Group(group) => lower_type(&group.elem, context),
        _ => Err(unsupported()),
    }
}

fn is_flattened(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        if !attr.path().is_ident("serde") {
            return false;
        }
        match attr.meta.require_list() {
            Ok(list) => list
                .tokens
                .to_string()
                .split(',')
                .any(|arg| arg.trim() == "flatten"),
            Err(_) => false,
        }
    })
}

fn tag_annotation(attrs: &[Attribute]) -> Option<String> {
    attrs.iter().find_map(|attr| {
        if !attr.path().is_ident(TAG_ATTRIBUTE) {
            return None;
        }
        string_value(&attr.meta.require_name_value().ok()?.value)
    })
}

/// Collects `///` comments into text: one leading space is stripped per line,
/// surrounding blank lines are dropped and the text ends with a newline.
fn doc_text(attrs: &[Attribute]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let Some(value) = attr
            .meta
            .require_name_value()
            .ok()
            .and_then(|nv| string_value(&nv.value))
        else {
            continue;
        };
        for line in value.split('\n') {
            let line = line.strip_prefix(' ').unwrap_or(line);
            lines.push(line.trim_end().to_string());
        }
    }

    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn string_value(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        _ => None,
    }
}
