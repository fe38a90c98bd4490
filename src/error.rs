//! Error handling for streaming XML writing

/// A result type for streaming XML writing, which can be either a successful value or an error.
pub type XmlResult<T> = std::result::Result<T, WriteError>;

/// An error that occurred while writing a streamed document.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// A record type was written without an explicit tag name, but declares no root tag of its own
    #[error("type `{type_name}` declares no root tag")]
    MissingRootTag {
        /// The full name of the record type
        type_name: &'static str,
    },

    /// A writer was asked to nest a child scope, but was built from a bare tag name
    /// rather than a container schema
    #[error("writer for element `{0}` has no declared container type")]
    UntypedContainer(String),

    /// The named field is not declared on the container schema
    #[error("no field named `{field}` is declared on container `{container}`")]
    UnknownField {
        /// The root tag of the container schema that was searched
        container: &'static str,

        /// The field name that was requested
        field: String,
    },

    /// A converter could not be built, or failed while serializing a record.
    ///
    /// If this is raised mid-stream, the sink may hold a partially written element
    /// and the document should be treated as unusable.
    #[error("record conversion failed: {0}")]
    Conversion(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The underlying sink failed. Every writer sharing the sink is unusable afterwards.
    #[error("XML stream failure: {0}")]
    Stream(#[from] std::io::Error),

    /// The writer has not been opened, or was already closed
    #[error("writer is not open")]
    NotOpen,

    /// Raised at close time when declared fields of the container were never written.
    ///
    /// The closing tags were still written first, so the document is structurally
    /// well-formed, just semantically incomplete.
    #[error("required fields have not been written: {}", .0.join(", "))]
    RequiredFields(Vec<&'static str>),
}

impl WriteError {
    /// Wraps any error as a conversion failure.
    pub fn conversion(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Conversion(err.into())
    }
}
