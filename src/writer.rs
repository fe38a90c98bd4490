//! The streaming writer core: scope lifecycle, tag resolution, and required-field
//! enforcement.
use crate::convert::ConverterCache;
use crate::error::{WriteError, XmlResult};
use crate::schema::{ContainerSchema, Record};
use crate::sink::{Sink, TokenSink};
use crate::tracker::RequiredFieldTracker;
use std::any::Any;
use std::io::Write;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

/// The sink handle shared across one writer tree. Every operation on any writer in
/// the tree takes this lock, so partial element writes can never interleave.
type SharedSink = Arc<Mutex<Box<dyn Sink + Send>>>;

/// A streaming XML writer owning one element scope of the output document.
///
/// A top-level writer owns the document prologue/epilogue and the sink lifecycle.
/// [`begin_child_scope`](Self::begin_child_scope) returns a nested writer that
/// shares the same sink but owns only its own element's start and end tags. The
/// child borrows its parent mutably for as long as it lives, so writing into a
/// suspended parent scope is a compile error rather than malformed output.
///
/// Writers track the declared fields of their container schema and report the ones
/// never written when the scope closes. Dropping a writer that is still open closes
/// it best-effort, so nested scopes unwind cleanly on early returns.
///
/// See the crate-level docs for a complete example.
pub struct StreamingWriter<'p> {
    schema: Option<&'static ContainerSchema>,
    tag: String,
    sink: Option<SharedSink>,
    is_child: bool,
    converters: ConverterCache,
    tracker: RequiredFieldTracker,
    _parent: PhantomData<&'p mut ()>,
}

impl StreamingWriter<'static> {
    /// Creates a top-level writer for the given container schema.
    ///
    /// The root tag comes from the schema, and the schema's declared fields become
    /// required: closing the writer before writing all of them reports a fault.
    #[must_use]
    pub fn new(schema: &'static ContainerSchema) -> Self {
        Self::with_parts(Some(schema), schema.tag.to_string(), false)
    }

    /// Creates a top-level writer rooted on a bare tag name.
    ///
    /// Without a container schema there is no required-field enforcement, tag names
    /// are used exactly as given, and child scopes cannot be nested.
    #[must_use]
    pub fn with_root_tag(tag: impl Into<String>) -> Self {
        Self::with_parts(None, tag.into(), false)
    }

    /// Opens the given destination and writes the document start and the root
    /// element's start tag. If the writer is already open, the previous session is
    /// closed first.
    ///
    /// # Errors
    /// Returns [`WriteError::Stream`] if the destination cannot accept the document
    /// start, and any fault from closing a previous session.
    pub fn open<W: Write + Send + 'static>(&mut self, destination: W) -> XmlResult<()> {
        self.open_sink(Box::new(TokenSink::new(destination)), None)
    }

    /// Like [`open`](Self::open), but declares `namespace` as the default namespace
    /// of the root element.
    ///
    /// The declaration is immediately reset so descendant elements do not inherit
    /// it; only the root element carries the namespace.
    ///
    /// # Errors
    /// Returns [`WriteError::Stream`] if the destination cannot accept the document
    /// start, and any fault from closing a previous session.
    pub fn open_ns<W: Write + Send + 'static>(
        &mut self,
        destination: W,
        namespace: &str,
    ) -> XmlResult<()> {
        self.open_sink(Box::new(TokenSink::new(destination)), Some(namespace))
    }

    /// Opens a caller-supplied sink instead of the bundled [`TokenSink`].
    ///
    /// # Errors
    /// Returns [`WriteError::Stream`] if the sink cannot accept the document start,
    /// and any fault from closing a previous session.
    pub fn open_sink(
        &mut self,
        sink: Box<dyn Sink + Send>,
        namespace: Option<&str>,
    ) -> XmlResult<()> {
        if self.sink.is_some() {
            self.close()?;
        }

        let sink: SharedSink = Arc::new(Mutex::new(sink));
        {
            let mut guard = lock(&sink)?;
            guard.write_document_start()?;
            guard.write_element_start(&self.tag)?;
            if let Some(uri) = namespace {
                guard.write_default_namespace(uri)?;
                // The declaration must not bind descendant elements
                guard.clear_default_namespace()?;
            }
        }
        self.sink = Some(sink);
        Ok(())
    }
}

impl<'p> StreamingWriter<'p> {
    fn with_parts(
        schema: Option<&'static ContainerSchema>,
        tag: String,
        is_child: bool,
    ) -> StreamingWriter<'static> {
        StreamingWriter {
            schema,
            tag,
            sink: None,
            is_child,
            converters: ConverterCache::default(),
            tracker: RequiredFieldTracker::default(),
            _parent: PhantomData,
        }
    }

    /// Writes one record into the current scope, deriving the name from the type's
    /// own root-tag metadata.
    ///
    /// # Errors
    /// Returns [`WriteError::MissingRootTag`] if the type declares no root tag;
    /// otherwise fails as [`write_named`](Self::write_named) does.
    pub fn write<C: Record>(&mut self, record: &C) -> XmlResult<()> {
        let name = C::ROOT_TAG.ok_or(WriteError::MissingRootTag {
            type_name: std::any::type_name::<C>(),
        })?;
        self.write_named(name, record)
    }

    /// Writes one record into the current scope under the given name.
    ///
    /// On a schema-backed writer the name must match a declared field; the emitted
    /// tag is the field's mapped tag when one is declared, else the name itself, and
    /// the field is marked as written. On a bare-tag writer the name is used
    /// verbatim.
    ///
    /// Exactly one complete element is appended to the output per successful call.
    ///
    /// # Errors
    /// - [`WriteError::NotOpen`] if the writer was never opened or already closed
    /// - [`WriteError::UnknownField`] if the schema declares no such field (nothing
    ///   is written in this case)
    /// - [`WriteError::Conversion`] if the converter cannot be built or fails while
    ///   serializing; the sink may then hold a partial element
    /// - [`WriteError::Stream`] if the sink fails
    pub fn write_named<C: Record>(&mut self, name: &str, record: &C) -> XmlResult<()> {
        let sink = self.sink.clone().ok_or(WriteError::NotOpen)?;
        self.tracker.ensure_seeded(self.schema);

        let tag = match self.schema {
            None => name.to_string(),
            Some(schema) => {
                let field = schema.field(name)?;
                self.tracker.mark_satisfied(field.name);
                field.resolved_tag().to_string()
            }
        };

        let converter = self.converters.get_or_build::<C>()?;
        let mut guard = lock(&sink)?;
        converter.serialize_element(&tag, record as &dyn Any, &mut **guard)
    }

    /// Opens a nested container scope for the named field and returns its writer.
    ///
    /// The child shares this writer's sink and immediately writes its start tag. It
    /// borrows this writer mutably, so the parent only becomes usable again once the
    /// child is closed and dropped. The child should be closed explicitly to observe
    /// its required-field check; dropping it closes it best-effort.
    ///
    /// # Errors
    /// - [`WriteError::NotOpen`] if the writer was never opened or already closed
    /// - [`WriteError::UntypedContainer`] if this writer has no container schema
    /// - [`WriteError::UnknownField`] if the schema declares no such field
    /// - [`WriteError::Stream`] if the start tag cannot be written
    pub fn begin_child_scope<'s>(
        &'s mut self,
        child: &'static ContainerSchema,
        field_name: &str,
    ) -> XmlResult<StreamingWriter<'s>> {
        let sink = self.sink.clone().ok_or(WriteError::NotOpen)?;
        let schema = self
            .schema
            .ok_or_else(|| WriteError::UntypedContainer(self.tag.clone()))?;

        let field = schema.field(field_name)?;
        let tag = field.resolved_tag().to_string();
        lock(&sink)?.write_element_start(&tag)?;

        self.tracker.ensure_seeded(self.schema);
        self.tracker.mark_satisfied(field.name);

        let mut writer = Self::with_parts(Some(child), tag, true);
        writer.sink = Some(sink);
        Ok(writer)
    }

    /// Closes this scope.
    ///
    /// A child writer writes its element's end tag; the sink stays open, owned by an
    /// ancestor. A top-level writer writes the document epilogue and releases the
    /// sink, absorbing and logging stream faults on that path so cleanup chains can
    /// always run to completion.
    ///
    /// Closing an already-closed writer is a no-op.
    ///
    /// # Errors
    /// - [`WriteError::RequiredFields`] if declared fields were never written; the
    ///   closing tags were still written first, so the document stays well-formed
    /// - [`WriteError::Stream`] if a child's end tag cannot be written
    pub fn close(&mut self) -> XmlResult<()> {
        let Some(sink) = self.sink.take() else {
            return Ok(());
        };

        let mut structural = self.write_closing(&sink);
        if !self.is_child {
            if let Err(e) = &structural {
                tracing::error!("unable to close XML stream: {e}");
                structural = Ok(());
            }
        }

        let unmet = self.tracker.unmet();
        if !unmet.is_empty() {
            if let Err(e) = &structural {
                tracing::error!("stream failure while closing `{}`: {e}", self.tag);
            }
            return Err(WriteError::RequiredFields(unmet));
        }
        structural
    }

    fn write_closing(&self, sink: &SharedSink) -> XmlResult<()> {
        let mut guard = lock(sink)?;
        if self.is_child {
            guard.write_element_end()
        } else {
            guard.write_characters("\n")?;
            guard.write_document_end()?;
            guard.close()
        }
    }
}

impl Drop for StreamingWriter<'_> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            // Faults on this path were already logged or belong to an unwinding scope
            let _ = self.close();
        }
    }
}

fn lock(sink: &SharedSink) -> XmlResult<MutexGuard<'_, Box<dyn Sink + Send>>> {
    sink.lock().map_err(|_| {
        WriteError::Stream(std::io::Error::new(
            std::io::ErrorKind::Other,
            "writer tree lock poisoned",
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{self, Converter, write_text_element};
    use crate::schema::FieldSchema;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct Note(&'static str);
    impl Record for Note {
        const ROOT_TAG: Option<&'static str> = Some("note");

        fn converter() -> XmlResult<Box<dyn Converter>> {
            Ok(convert::from_fn(
                |tag: &str, record: &Note, sink: &mut dyn Sink| {
                    write_text_element(sink, tag, record.0)
                },
            ))
        }
    }

    struct Anonymous;
    impl Record for Anonymous {
        fn converter() -> XmlResult<Box<dyn Converter>> {
            Ok(convert::from_fn(
                |tag: &str, _: &Anonymous, sink: &mut dyn Sink| {
                    write_text_element(sink, tag, "")
                },
            ))
        }
    }

    static JOURNAL: ContainerSchema = ContainerSchema {
        tag: "journal",
        fields: &[FieldSchema {
            name: "note",
            tag: None,
        }],
    };

    #[test]
    fn test_write_before_open() {
        let mut writer = StreamingWriter::new(&JOURNAL);
        assert!(matches!(
            writer.write(&Note("x")),
            Err(WriteError::NotOpen)
        ));
    }

    #[test]
    fn test_missing_root_tag() {
        let buf = SharedBuf::default();
        let mut writer = StreamingWriter::with_root_tag("doc");
        writer.open(buf).unwrap();
        assert!(matches!(
            writer.write(&Anonymous),
            Err(WriteError::MissingRootTag { .. })
        ));
        writer.close().unwrap();
    }

    #[test]
    fn test_bare_tag_writer_cannot_nest() {
        let buf = SharedBuf::default();
        let mut writer = StreamingWriter::with_root_tag("doc");
        writer.open(buf).unwrap();
        assert!(matches!(
            writer.begin_child_scope(&JOURNAL, "note"),
            Err(WriteError::UntypedContainer(_))
        ));
        writer.close().unwrap();
    }

    #[test]
    fn test_reopen_closes_previous_session() {
        let first = SharedBuf::default();
        let second = SharedBuf::default();

        let mut writer = StreamingWriter::new(&JOURNAL);
        writer.open(first.clone()).unwrap();
        writer.write(&Note("a")).unwrap();
        writer.open(second.clone()).unwrap();
        writer.write(&Note("b")).unwrap();
        writer.close().unwrap();

        assert!(first.contents().ends_with("</journal>"));
        assert!(second.contents().contains("<note>b</note>"));
    }

    #[test]
    fn test_drop_closes_document() {
        let buf = SharedBuf::default();
        {
            let mut writer = StreamingWriter::new(&JOURNAL);
            writer.open(buf.clone()).unwrap();
            writer.write(&Note("x")).unwrap();
        }
        assert!(buf.contents().ends_with("</journal>"));
    }

    #[test]
    fn test_bare_tag_names_used_verbatim() {
        let buf = SharedBuf::default();
        let mut writer = StreamingWriter::with_root_tag("doc");
        writer.open(buf.clone()).unwrap();
        writer.write_named("anything", &Note("x")).unwrap();
        writer.close().unwrap();
        assert!(buf.contents().contains("<anything>x</anything>"));
    }
}
