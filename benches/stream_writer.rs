use criterion::{Criterion, criterion_group, criterion_main};
use xmlstream::{
    ContainerSchema, Converter, FieldSchema, Record, Sink, StreamingWriter, XmlResult, convert,
};

struct Event {
    id: u64,
    payload: String,
}

impl Record for Event {
    const ROOT_TAG: Option<&'static str> = Some("event");

    fn converter() -> XmlResult<Box<dyn Converter>> {
        Ok(convert::from_fn(
            |tag: &str, record: &Event, sink: &mut dyn Sink| {
                sink.write_element_start(tag)?;
                convert::write_text_element(sink, "id", &record.id.to_string())?;
                convert::write_text_element(sink, "payload", &record.payload)?;
                sink.write_element_end()
            },
        ))
    }
}

static LOG: ContainerSchema = ContainerSchema {
    tag: "log",
    fields: &[FieldSchema {
        name: "event",
        tag: None,
    }],
};

fn bench_stream_writer(c: &mut Criterion) {
    c.bench_function("write_10k_events", |b| {
        b.iter(|| {
            let mut writer = StreamingWriter::new(&LOG);
            writer.open(std::io::sink()).unwrap();
            for id in 0..10_000 {
                writer
                    .write(&Event {
                        id,
                        payload: "a payload of reasonable length".to_string(),
                    })
                    .unwrap();
            }
            writer.close().unwrap();
        });
    });
}

criterion_group!(benches, bench_stream_writer);
criterion_main!(benches);
