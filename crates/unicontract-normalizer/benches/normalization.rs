//! Normalization benchmarks.
//!
//! Measures dereferencing plus normalization of OpenAPI and AsyncAPI
//! documents with a varying number of operations.
//!
//! Run with: cargo bench -p unicontract-normalizer --bench normalization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::Value;

use unicontract_normalizer::{normalize_document, NormalizeOptions};

/// Generate an OpenAPI 3.0 document with N operations sharing one component schema.
fn generate_openapi(operation_count: usize) -> Value {
    let mut yaml = String::from(
        r##"openapi: "3.0.3"
info:
  title: Benchmark API
  version: "1.0.0"
components:
  schemas:
    Item:
      type: object
      required: [id]
      properties:
        id: { type: string, format: uuid }
        name: { type: string, minLength: 1, maxLength: 255 }
        tags:
          type: array
          items: { type: string }
paths:
"##,
    );
    for i in 0..operation_count {
        yaml.push_str(&format!(
            r##"  /resource{i}/{{id}}:
    get:
      operationId: get_resource{i}
      parameters:
        - name: id
          in: path
          required: true
          schema: {{ type: string, format: uuid }}
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Item"
        "404":
          description: missing
"##,
            i = i
        ));
    }
    serde_yaml::from_str(&yaml).unwrap()
}

/// Generate an AsyncAPI 3.0 document with N channels, one send operation each.
fn generate_asyncapi(operation_count: usize) -> Value {
    let mut channels = String::from("channels:\n");
    let mut operations = String::from("operations:\n");
    for i in 0..operation_count {
        channels.push_str(&format!(
            r##"  topic{i}:
    address: events.topic{i}
    messages:
      event:
        headers:
          type: object
          properties:
            traceId: {{ type: string }}
        payload:
          type: object
          properties:
            id: {{ type: string }}
            at: {{ type: string, format: date-time }}
"##,
            i = i
        ));
        operations.push_str(&format!(
            r##"  emit{i}:
    action: send
    channel:
      $ref: "#/channels/topic{i}"
"##,
            i = i
        ));
    }
    let yaml = format!(
        "asyncapi: \"3.0.0\"\ninfo:\n  title: Benchmark Events\n  version: \"1.0.0\"\n{}{}",
        channels, operations
    );
    serde_yaml::from_str(&yaml).unwrap()
}

fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalization");
    let options = NormalizeOptions::default();

    for op_count in [10, 50, 100] {
        let openapi = generate_openapi(op_count);
        group.bench_with_input(
            BenchmarkId::new("openapi", format!("{}_ops", op_count)),
            &openapi,
            |b, doc| b.iter(|| black_box(normalize_document(black_box(doc), &options).unwrap())),
        );

        let asyncapi = generate_asyncapi(op_count);
        group.bench_with_input(
            BenchmarkId::new("asyncapi", format!("{}_ops", op_count)),
            &asyncapi,
            |b, doc| b.iter(|| black_box(normalize_document(black_box(doc), &options).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_normalization);
criterion_main!(benches);
