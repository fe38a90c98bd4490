//! The token-level output layer.
//!
//! A [`Sink`] accepts ordered markup tokens and is the only thing a writer tree ever
//! appends to. [`TokenSink`] is the bundled implementation over any [`std::io::Write`]
//! destination; callers with unusual destinations can provide their own.
use crate::error::XmlResult;
use htmlentity::entity::ICodedDataTrait;
use htmlentity::entity::{CharacterSet, EncodeType, encode};
use std::io::Write;

const TAB: &str = "\t";

/// An append-only XML token writer over some output destination.
///
/// Writes are visible in call order; no other buffering behavior may be assumed.
/// Each method can fail with [`WriteError::Stream`](crate::WriteError::Stream).
pub trait Sink {
    /// Write the document prologue (the `<?xml ?>` declaration).
    fn write_document_start(&mut self) -> XmlResult<()>;

    /// Open a new element with the given tag name.
    fn write_element_start(&mut self, tag: &str) -> XmlResult<()>;

    /// Declare the default namespace on the currently open start tag.
    fn write_default_namespace(&mut self, uri: &str) -> XmlResult<()>;

    /// Undo a previous default-namespace declaration so it does not bind descendants.
    fn clear_default_namespace(&mut self) -> XmlResult<()>;

    /// Write entity-escaped character data into the current element.
    fn write_characters(&mut self, text: &str) -> XmlResult<()>;

    /// Close the innermost open element.
    fn write_element_end(&mut self) -> XmlResult<()>;

    /// End the document, closing any elements still open.
    fn write_document_end(&mut self) -> XmlResult<()>;

    /// Release the destination, flushing any pending output.
    fn close(&mut self) -> XmlResult<()>;
}

/// One open element: its tag name, and whether character data was written inside it.
/// Elements holding only child elements get their end tag on its own indented line.
struct Frame {
    tag: String,
    text: bool,
}

/// A [`Sink`] writing indented XML to any [`std::io::Write`] destination.
///
/// Formatting rules:
/// - Each element starts on its own line, indented with one tab per depth
/// - Character data is kept inline with its element's tags
/// - Elements with no content are collapsed to `<tag />`
///
/// # Example
/// ```rust
/// use xmlstream::{Sink, TokenSink};
///
/// let mut sink = TokenSink::new(Vec::new());
/// sink.write_element_start("greeting").unwrap();
/// sink.write_characters("hello").unwrap();
/// sink.write_element_end().unwrap();
/// ```
pub struct TokenSink<W: Write> {
    writer: W,
    open: Vec<Frame>,
    tag_open: bool,
    default_ns: Option<String>,
    wrote_any: bool,
}

impl<W: Write> TokenSink<W> {
    /// Creates a sink writing to the given destination.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            open: Vec::new(),
            tag_open: false,
            default_ns: None,
            wrote_any: false,
        }
    }

    /// Consumes the sink and returns the destination.
    ///
    /// Pending output is not flushed; call [`close`](Sink::close) first.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Finish the currently open start tag with `>`, if one is pending.
    fn seal_start_tag(&mut self) -> std::io::Result<()> {
        if self.tag_open {
            self.writer.write_all(b">")?;
            self.tag_open = false;
        }
        Ok(())
    }

    fn write_indent(&mut self, depth: usize) -> std::io::Result<()> {
        if self.wrote_any {
            self.writer.write_all(b"\n")?;
            self.writer.write_all(TAB.repeat(depth).as_bytes())?;
        }
        Ok(())
    }
}

impl<W: Write> Sink for TokenSink<W> {
    fn write_document_start(&mut self) -> XmlResult<()> {
        self.writer
            .write_all(br#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        self.wrote_any = true;
        Ok(())
    }

    fn write_element_start(&mut self, tag: &str) -> XmlResult<()> {
        self.seal_start_tag()?;
        self.write_indent(self.open.len())?;

        let name = encode_entities(tag)?;
        self.writer.write_all(format!("<{name}").as_bytes())?;

        // A default namespace stays bound until cleared, so every element opened
        // while it is set re-declares it
        if let Some(uri) = &self.default_ns {
            self.writer.write_all(format!(r#" xmlns="{uri}""#).as_bytes())?;
        }

        self.open.push(Frame {
            tag: name,
            text: false,
        });
        self.tag_open = true;
        self.wrote_any = true;
        Ok(())
    }

    fn write_default_namespace(&mut self, uri: &str) -> XmlResult<()> {
        if !self.tag_open {
            return Err(invalid_state("no open start tag to declare a namespace on").into());
        }

        let uri = encode_entities(uri)?;
        self.writer.write_all(format!(r#" xmlns="{uri}""#).as_bytes())?;
        self.default_ns = Some(uri);
        Ok(())
    }

    fn clear_default_namespace(&mut self) -> XmlResult<()> {
        self.default_ns = None;
        Ok(())
    }

    fn write_characters(&mut self, text: &str) -> XmlResult<()> {
        self.seal_start_tag()?;
        if let Some(frame) = self.open.last_mut() {
            frame.text = true;
        }

        let text = encode_entities(text)?;
        self.writer.write_all(text.as_bytes())?;
        self.wrote_any = true;
        Ok(())
    }

    fn write_element_end(&mut self) -> XmlResult<()> {
        let Some(frame) = self.open.pop() else {
            return Err(invalid_state("no open element to close").into());
        };

        if self.tag_open {
            self.writer.write_all(b" />")?;
            self.tag_open = false;
            return Ok(());
        }

        if !frame.text {
            self.write_indent(self.open.len())?;
        }
        self.writer.write_all(format!("</{}>", frame.tag).as_bytes())?;
        Ok(())
    }

    fn write_document_end(&mut self) -> XmlResult<()> {
        while !self.open.is_empty() {
            self.write_element_end()?;
        }
        Ok(())
    }

    fn close(&mut self) -> XmlResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn encode_entities(input: &str) -> std::io::Result<String> {
    encode(
        input.as_bytes(),
        &EncodeType::NamedOrHex,
        &CharacterSet::Html,
    )
    .to_string()
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

fn invalid_state(message: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message.to_string())
}
