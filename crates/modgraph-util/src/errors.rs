use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all modgraph operations.
///
/// Every resolution or serialization failure aborts the whole unit of work:
/// callers never receive a partial graph or a partial document alongside one
/// of these.
#[derive(Debug, Error, Diagnostic)]
pub enum ModgraphError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed project manifest (e.g. Modgraph.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Modgraph.toml for syntax errors"))]
    Manifest { message: String },

    /// A module metadata document could not be read.
    #[error("Invalid module metadata: {message}")]
    Metadata { message: String },

    /// No producer variant is compatible with the consumer attributes.
    #[error(
        "No variant of {module} matches the consumer attributes {requested}:\n{}",
        .eliminated.join("\n")
    )]
    #[diagnostic(help(
        "Change the requested attributes or publish a variant that provides them"
    ))]
    NoMatchingVariant {
        module: String,
        requested: String,
        eliminated: Vec<String>,
    },

    /// More than one producer variant remained after disambiguation.
    #[error(
        "Cannot choose between the following variants of {module} for {requested}:\n{}",
        .candidates.join("\n")
    )]
    #[diagnostic(help(
        "Request more specific attributes or register a disambiguation rule"
    ))]
    AmbiguousVariant {
        module: String,
        requested: String,
        candidates: Vec<String>,
    },

    /// A strict version request is incompatible with the selected version.
    #[error(
        "Version conflict on {module}: selected {selected} but {}",
        .strict.join(", ")
    )]
    VersionConflict {
        module: String,
        selected: String,
        strict: Vec<String>,
    },

    /// Every candidate version was rejected, or none was requested.
    #[error(
        "No version of {module} satisfies the constraints: requested [{}], rejected [{}]",
        .requested.join(", "),
        .rejected.join(", ")
    )]
    NoVersionSatisfiesConstraints {
        module: String,
        requested: Vec<String>,
        rejected: Vec<String>,
    },

    /// Two resolved modules provide the same capability and no rule picked one.
    #[error(
        "Capability {capability} is provided by more than one module: {}",
        .providers.join(", ")
    )]
    #[diagnostic(help("Register a capability resolution rule choosing one provider"))]
    CapabilityConflict {
        capability: String,
        providers: Vec<String>,
    },

    /// An attribute value of an unsupported type reached the serializer.
    #[error("Cannot write attribute {attribute} with unsupported value {value} of type {type_name}.")]
    MalformedAttributeValue {
        attribute: String,
        value: String,
        type_name: String,
    },

    /// The metadata provider has no module for the requested coordinates.
    #[error("Could not find {module} (required by {})", .required_by.join(", "))]
    ModuleNotFound {
        module: String,
        required_by: Vec<String>,
    },

    /// Resolution was cancelled through its cancellation flag.
    #[error("Resolution cancelled")]
    Cancelled,

    /// The resolution driver failed for a reason outside the taxonomy above.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type ModgraphResult<T> = miette::Result<T>;
