use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use spillway_core::{
    AsynchronousBlockStream, BlockInputStream, SpillwayResult, read_all,
};
use arrow::array::Int64Array;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use std::time::Duration;

// ════════════════════════════════════════════
// Async Prefetch Benchmarks
// ════════════════════════════════════════════

/// Producer that spends `cost` per block, standing in for a slow child.
struct SlowProducer {
    schema: SchemaRef,
    remaining: usize,
    cost: Duration,
}

impl SlowProducer {
    fn new(blocks: usize, cost: Duration) -> Self {
        Self {
            schema: Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)])),
            remaining: blocks,
            cost,
        }
    }
}

impl BlockInputStream for SlowProducer {
    fn name(&self) -> &'static str {
        "SlowProducer"
    }

    fn header(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn read(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        std::thread::sleep(self.cost);
        let column = Int64Array::from_iter_values(0..1024);
        Ok(Some(RecordBatch::try_new(Arc::clone(&self.schema), vec![Arc::new(column)])?))
    }
}

/// Consumer work per block, overlapping with the next prefetch.
fn consume(block: &RecordBatch, cost: Duration) -> usize {
    std::thread::sleep(cost);
    black_box(block.num_rows())
}

fn bench_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_prefetch_overlap");
    group.sample_size(10);
    let cost = Duration::from_micros(200);

    for blocks in [8usize, 32].iter() {
        group.throughput(Throughput::Elements(*blocks as u64));

        group.bench_with_input(BenchmarkId::new("sync", blocks), blocks, |b, &blocks| {
            b.iter(|| {
                let mut stream = SlowProducer::new(blocks, cost);
                let mut rows = 0;
                while let Some(block) = stream.read().unwrap() {
                    rows += consume(&block, cost);
                }
                rows
            });
        });

        group.bench_with_input(BenchmarkId::new("async", blocks), blocks, |b, &blocks| {
            b.iter(|| {
                let mut stream =
                    AsynchronousBlockStream::new(Box::new(SlowProducer::new(blocks, cost)));
                stream.read_prefix().unwrap();
                let mut rows = 0;
                while let Some(block) = stream.read().unwrap() {
                    rows += consume(&block, cost);
                }
                stream.read_suffix().unwrap();
                rows
            });
        });
    }

    group.finish();
}

fn bench_handoff_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_prefetch_handoff");

    group.bench_function("zero_cost_child_256_blocks", |b| {
        b.iter(|| {
            let mut stream =
                AsynchronousBlockStream::new(Box::new(SlowProducer::new(256, Duration::ZERO)));
            black_box(read_all(&mut stream).unwrap().len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_overlap, bench_handoff_overhead);
criterion_main!(benches);
