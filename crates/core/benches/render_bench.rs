use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use docflow_core::{DataOptions, Document, HtmlOptions, RewriteOptions, StreamingRewriter};
use std::hint::black_box;
use std::io::{self, Write};

// Discards everything, like /dev/null.
struct NullWriter;
impl Write for NullWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn generate_large_document() -> String {
    let mut s = String::with_capacity(200_000);
    s.push_str("! Benchmark Document\n\n");
    for i in 0..2_000 {
        s.push_str(&format!("# Section {i}\n\nSome **bold** text with a [link](/s/{i}).\n\n"));
        s.push_str("- item\n  - nested item \\b(escaped)\n\n");
        s.push_str("| key | value |\n|---|---|\n| a | 1 |\n\n");
    }
    s
}

fn benchmark_pipeline(c: &mut Criterion) {
    let input = generate_large_document();
    let mut group = c.benchmark_group("pipeline_throughput");
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("scan", |b| {
        b.iter(|| Document::new(black_box(&input)));
    });

    let doc = Document::new(&input);
    let options = HtmlOptions::default();

    // Straight into the writer, no intermediate String.
    group.bench_function("html_to_writer", |b| {
        b.iter(|| doc.write_html(NullWriter, &options).unwrap());
    });

    group.bench_function("html_through_rewriter", |b| {
        b.iter(|| {
            let rewriter = StreamingRewriter::new(NullWriter, RewriteOptions::default());
            doc.write_html(rewriter, &options)
                .and_then(StreamingRewriter::into_inner)
                .unwrap()
        });
    });

    group.bench_function("data", |b| {
        b.iter(|| doc.data(black_box(&DataOptions::default())));
    });

    group.finish();
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);
