//! Schema metadata for container and record types.
//!
//! Rather than discovering field-to-tag mappings through runtime reflection, types
//! describe themselves through static metadata tables ([`ContainerSchema`]) and the
//! [`Record`] trait. Both are cheap to hand-write and easy to generate.
use crate::convert::Converter;
use crate::error::{WriteError, XmlResult};
use std::any::Any;

/// One declared field of a container type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    /// The logical field name.
    pub name: &'static str,

    /// The tag name to emit for this field, when it differs from the field name.
    /// `None` means "use default": the field name is used verbatim.
    pub tag: Option<&'static str>,
}

impl FieldSchema {
    /// Returns the tag name to emit for this field: the explicit mapping if declared,
    /// else the field name.
    #[must_use]
    pub fn resolved_tag(&self) -> &'static str {
        self.tag.unwrap_or(self.name)
    }
}

/// Static metadata for a container type: the element that holds a collection of
/// records or nested containers.
///
/// Every declared field is considered required; a writer scope built on this schema
/// reports the fields that were never written when it closes.
///
/// # Example
/// ```rust
/// use xmlstream::{ContainerSchema, FieldSchema};
///
/// static STORE: ContainerSchema = ContainerSchema {
///     tag: "store",
///     fields: &[
///         FieldSchema { name: "customers", tag: None },
///         FieldSchema { name: "orders", tag: None },
///     ],
/// };
///
/// assert_eq!(STORE.field("orders").unwrap().resolved_tag(), "orders");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSchema {
    /// The root tag name of the container element.
    pub tag: &'static str,

    /// The declared fields of the container.
    pub fields: &'static [FieldSchema],
}

impl ContainerSchema {
    /// Looks up a declared field by its logical name.
    ///
    /// # Errors
    /// Returns [`WriteError::UnknownField`] if the container declares no such field.
    pub fn field(&self, name: &str) -> XmlResult<&FieldSchema> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| WriteError::UnknownField {
                container: self.tag,
                field: name.to_string(),
            })
    }

    /// Returns the names of all declared fields.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

/// A record type that can be written through a [`StreamingWriter`](crate::StreamingWriter).
///
/// The trait carries the type's root-tag metadata and the hook the per-writer
/// converter cache uses to build a converter on first use. Conversion itself is
/// performed by the returned [`Converter`], never by the writer.
pub trait Record: Any {
    /// The standalone tag name declared for this type, if any.
    ///
    /// Types without one can only be written with an explicit tag name via
    /// [`StreamingWriter::write_named`](crate::StreamingWriter::write_named).
    const ROOT_TAG: Option<&'static str> = None;

    /// Builds a converter for this type.
    ///
    /// Called at most once per writer instance; the result is cached and reused for
    /// every record of this type written through the same writer.
    ///
    /// # Errors
    /// Returns [`WriteError::Conversion`] if no converter can be built (the failure
    /// is not cached, so a later write attempts the build again).
    fn converter() -> XmlResult<Box<dyn Converter>>
    where
        Self: Sized;
}
