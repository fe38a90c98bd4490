//! Record-to-markup conversion, and the per-writer converter cache.
use crate::error::{WriteError, XmlResult};
use crate::schema::Record;
use crate::sink::Sink;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::marker::PhantomData;

/// Turns one record instance into markup tokens.
///
/// A converter must write exactly one complete element (start, content, end) for the
/// given instance, addressed by `tag`, into the shared sink. The record arrives type
/// erased; [`from_fn`] handles the downcast for the common case.
pub trait Converter {
    /// Serializes one record as a standalone element named `tag`.
    ///
    /// # Errors
    /// Returns [`WriteError::Conversion`] on any encoding error, or
    /// [`WriteError::Stream`] if the sink rejects the tokens.
    fn serialize_element(&self, tag: &str, record: &dyn Any, sink: &mut dyn Sink)
    -> XmlResult<()>;
}

/// Builds a converter from a closure over a concrete record type.
///
/// The returned converter downcasts each record to `C` and fails with a conversion
/// error if a record of another type reaches it.
///
/// # Example
/// ```rust
/// use xmlstream::{Sink, XmlResult, convert};
///
/// struct Customer { name: String }
///
/// let converter = convert::from_fn(|tag: &str, record: &Customer, sink: &mut dyn Sink| {
///     sink.write_element_start(tag)?;
///     sink.write_characters(&record.name)?;
///     sink.write_element_end()
/// });
/// ```
pub fn from_fn<C, F>(f: F) -> Box<dyn Converter>
where
    C: Any,
    F: Fn(&str, &C, &mut dyn Sink) -> XmlResult<()> + 'static,
{
    Box::new(FnConverter {
        f,
        _marker: PhantomData,
    })
}

struct FnConverter<C, F> {
    f: F,
    _marker: PhantomData<fn(&C)>,
}

impl<C, F> Converter for FnConverter<C, F>
where
    C: Any,
    F: Fn(&str, &C, &mut dyn Sink) -> XmlResult<()> + 'static,
{
    fn serialize_element(
        &self,
        tag: &str,
        record: &dyn Any,
        sink: &mut dyn Sink,
    ) -> XmlResult<()> {
        let record = record.downcast_ref::<C>().ok_or_else(|| {
            WriteError::conversion(format!(
                "converter expected a record of type `{}`",
                std::any::type_name::<C>()
            ))
        })?;
        (self.f)(tag, record, sink)
    }
}

/// Writes a single element holding only character data: `<tag>text</tag>`.
///
/// A convenience for converters of simple records.
///
/// # Errors
/// Returns an error if the sink rejects any of the tokens.
pub fn write_text_element(sink: &mut dyn Sink, tag: &str, text: &str) -> XmlResult<()> {
    sink.write_element_start(tag)?;
    sink.write_characters(text)?;
    sink.write_element_end()
}

/// Maps record types to the converters already built for them.
///
/// Each writer instance owns one cache; converters are never shared between sibling
/// or parent/child writers.
#[derive(Default)]
pub(crate) struct ConverterCache {
    built: HashMap<TypeId, Box<dyn Converter>>,
}

impl ConverterCache {
    /// Returns the cached converter for `C`, building it on first use.
    /// Build failures propagate and are not cached.
    pub fn get_or_build<C: Record>(&mut self) -> XmlResult<&dyn Converter> {
        let converter = match self.built.entry(TypeId::of::<C>()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(C::converter()?),
        };
        Ok(&**converter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static GADGET_BUILDS: AtomicUsize = AtomicUsize::new(0);
    static FLAKY_BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Gadget;
    impl Record for Gadget {
        const ROOT_TAG: Option<&'static str> = Some("gadget");

        fn converter() -> XmlResult<Box<dyn Converter>> {
            GADGET_BUILDS.fetch_add(1, Ordering::SeqCst);
            Ok(from_fn(|tag: &str, _: &Gadget, sink: &mut dyn Sink| {
                write_text_element(sink, tag, "")
            }))
        }
    }

    /// Fails to build the first time, succeeds afterwards.
    struct Flaky;
    impl Record for Flaky {
        fn converter() -> XmlResult<Box<dyn Converter>> {
            if FLAKY_BUILDS.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(WriteError::conversion("not ready"));
            }
            Ok(from_fn(|tag: &str, _: &Flaky, sink: &mut dyn Sink| {
                write_text_element(sink, tag, "")
            }))
        }
    }

    #[test]
    fn test_converter_built_once() {
        let mut cache = ConverterCache::default();
        cache.get_or_build::<Gadget>().unwrap();
        cache.get_or_build::<Gadget>().unwrap();
        cache.get_or_build::<Gadget>().unwrap();
        assert_eq!(GADGET_BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_failure_not_cached() {
        let mut cache = ConverterCache::default();
        assert!(cache.get_or_build::<Flaky>().is_err());
        assert!(cache.get_or_build::<Flaky>().is_ok());
    }

    #[test]
    fn test_downcast_mismatch() {
        let converter = from_fn(|_: &str, _: &Gadget, _: &mut dyn Sink| Ok(()));
        let mut sink = crate::TokenSink::new(Vec::new());
        let wrong: &dyn Any = &42_u32;
        assert!(matches!(
            converter.serialize_element("gadget", wrong, &mut sink),
            Err(WriteError::Conversion(_))
        ));
    }
}
