use std::fmt;

/// Result type alias for declaration processing
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors raised while turning declarations into a document.
///
/// Every variant is fatal: generation stops at the first one and no partial
/// document is written.
#[derive(Debug)]
pub enum Error {
    /// A record declares more than one `#[serde(flatten)]` field
    MultipleEmbeddedFields { record: String },
    /// An embedded field whose type is not a plain identifier
    InvalidEmbeddedField { record: String, field: String },
    /// A declared type expression the type mapper cannot express
    UnsupportedType { context: String, type_repr: String },
    /// A method documentation block without a `(METHOD /path)` line
    MissingRoute { method: String },
    /// A routing line with a verb that is not an HTTP method
    UnsupportedHttpMethod { method: String, verb: String },
    /// A `params` argument whose type is not a built object component
    InvalidQueryParameters { method: String, type_name: String },
    /// A method parameter bound to a pattern instead of a name
    UnnamedParameter { method: String },
    /// A recognised literal whose value is not a string
    InvalidLiteral { name: String },
    /// The base document literal is not a YAML mapping
    InvalidBaseDocument(String),
    /// A security annotation that cannot be turned into schemes
    InvalidSecurityScheme { name: String, message: String },
    /// A field annotation that failed to parse while strict mode is enabled
    MalformedAnnotation { field: String, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MultipleEmbeddedFields { record } => {
                write!(f, "record {} has more than one embedded field", record)
            }
            Error::InvalidEmbeddedField { record, field } => write!(
                f,
                "embedded field {}.{} must name another record",
                record, field
            ),
            Error::UnsupportedType { context, type_repr } => {
                write!(f, "unsupported type `{}` in {}", type_repr, context)
            }
            Error::MissingRoute { method } => {
                write!(f, "no (METHOD /path) line in the docs of {}", method)
            }
            Error::UnsupportedHttpMethod { method, verb } => {
                write!(f, "unsupported HTTP method {} on {}", verb, method)
            }
            Error::InvalidQueryParameters { method, type_name } => write!(
                f,
                "params of {} must be an object record, got {}",
                method, type_name
            ),
            Error::UnnamedParameter { method } => {
                write!(f, "every parameter of {} must be a plain identifier", method)
            }
            Error::InvalidLiteral { name } => write!(f, "{} must be a string literal", name),
            Error::InvalidBaseDocument(msg) => write!(f, "invalid base document: {}", msg),
            Error::InvalidSecurityScheme { name, message } => {
                write!(f, "invalid security scheme {}: {}", name, message)
            }
            Error::MalformedAnnotation { field, message } => {
                write!(f, "malformed annotation on {}: {}", field, message)
            }
        }
    }
}

impl std::error::Error for Error {}
