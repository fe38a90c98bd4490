//! Streaming XML writer for serializing large record collections element by element.
//!
//! This crate writes a tree of typed records into one well-formed XML document
//! incrementally, one subtree at a time, without ever holding the full tree in
//! memory. It is aimed at producers generating large ordered collections (millions
//! of records) that must land in a single document under one root element.
//!
//! A [`StreamingWriter`] works as follows:
//! - At construction it takes the container schema (or a bare tag name) defining the
//!   XML container where records are stored
//! - Opening the writer emits the document declaration and the root start tag
//! - Each write converts one record to XML and appends it to the stream
//! - [`begin_child_scope`](StreamingWriter::begin_child_scope) nests a new container
//!   element sharing the same stream; the child writer owns that element's scope
//! - Closing a writer emits its end tag (the document epilogue for the top-level
//!   writer) and reports any declared fields that were never written
//!
//! # Example
//! ```rust
//! use xmlstream::{
//!     ContainerSchema, Converter, FieldSchema, Record, Sink, StreamingWriter, XmlResult, convert,
//! };
//!
//! struct Customer {
//!     name: String,
//! }
//!
//! impl Record for Customer {
//!     const ROOT_TAG: Option<&'static str> = Some("customer");
//!
//!     fn converter() -> XmlResult<Box<dyn Converter>> {
//!         Ok(convert::from_fn(
//!             |tag: &str, record: &Customer, sink: &mut dyn Sink| {
//!                 convert::write_text_element(sink, tag, &record.name)
//!             },
//!         ))
//!     }
//! }
//!
//! static STORE: ContainerSchema = ContainerSchema {
//!     tag: "store",
//!     fields: &[FieldSchema { name: "customers", tag: None }],
//! };
//!
//! static CUSTOMERS: ContainerSchema = ContainerSchema {
//!     tag: "customers",
//!     fields: &[FieldSchema { name: "customer", tag: None }],
//! };
//!
//! fn main() -> XmlResult<()> {
//!     let mut writer = StreamingWriter::new(&STORE);
//!     writer.open(std::io::sink())?;
//!
//!     {
//!         let mut customers = writer.begin_child_scope(&CUSTOMERS, "customers")?;
//!         customers.write(&Customer { name: "Ada".into() })?;
//!         customers.close()?;
//!     }
//!
//!     writer.close()?;
//!     Ok(())
//! }
//! ```
//!
//! Only one writer in a tree may be written to at a time: a child scope borrows its
//! parent mutably until it is dropped, so the stack discipline the output format
//! needs is checked at compile time. Writers close themselves on drop, but closing
//! explicitly is the only way to observe the required-field check.
#![warn(missing_docs)]

pub mod convert;
pub use convert::Converter;

mod error;
pub use error::*;

mod schema;
pub use schema::*;

mod sink;
pub use sink::*;

mod tracker;

mod writer;
pub use writer::*;
