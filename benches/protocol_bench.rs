use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::sync::Arc;
use storycanvas::dom::{parse_fragment, serialize_nodes};
use storycanvas::protocol::{
    error_fragment, RENDER_REQUEST_EVENT, RENDER_RESPONSE_EVENT,
};
use storycanvas::transport::{ChannelTransport, Transport};
use storycanvas::{RenderRequest, RequestCorrelator, DEFAULT_RENDER_TIMEOUT_MS};

fn bench_render_round_trip(c: &mut Criterion) {
    let (client, server) = ChannelTransport::pair();
    let server_out = Arc::clone(&server);
    server.on(
        RENDER_REQUEST_EVENT,
        Arc::new(move |payload| {
            let id = payload["id"].as_str().unwrap_or_default();
            let _ = server_out.send(
                RENDER_RESPONSE_EVENT,
                json!({ "id": id, "html": "<button>Hi</button>" }),
            );
        }),
    );
    let correlator =
        RequestCorrelator::new(Some(client as Arc<dyn Transport>), DEFAULT_RENDER_TIMEOUT_MS);

    c.bench_function("render_round_trip", |b| {
        b.iter(|| {
            let mut request = RenderRequest::new("Button.astro");
            request.args.insert("label".to_string(), json!("Hi"));
            black_box(correlator.send(request).unwrap())
        })
    });
}

fn bench_fragment_parse_serialize(c: &mut Criterion) {
    let html = r#"<div class="card"><h2>Title</h2><p>Some body text with <em>emphasis</em> and a <a href="/docs">link</a>.</p><script>init()</script></div>"#;

    c.bench_function("fragment_parse", |b| {
        b.iter(|| black_box(parse_fragment(black_box(html))))
    });

    let nodes = parse_fragment(html);
    c.bench_function("fragment_serialize", |b| {
        b.iter(|| black_box(serialize_nodes(black_box(&nodes))))
    });
}

fn bench_error_fragment(c: &mut Criterion) {
    let message = "Component not found: <src/components/Button.astro> & friends";
    c.bench_function("error_fragment", |b| {
        b.iter(|| black_box(error_fragment(black_box(message))))
    });
}

criterion_group!(
    benches,
    bench_render_round_trip,
    bench_fragment_parse_serialize,
    bench_error_fragment
);
criterion_main!(benches);
