//! 스필 → 복원 예제
//!
//! 실행: RUST_LOG=spillway_core=debug cargo run --example spill_restore --features logging

use spillway_core::{
    AsynchronousBlockStream, BlockInputStream, EncryptedFileProvider, EncryptionConfig,
    SpillConfig, Spiller, StreamStatistics, statistics,
};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use std::time::Duration;

fn main() -> spillway_core::SpillwayResult<()> {
    spillway_core::logging::init_with_level("debug");

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("city", DataType::Utf8, false),
    ]));
    let make = |start: i64| -> spillway_core::SpillwayResult<RecordBatch> {
        let ids: Vec<i64> = (start..start + 4).collect();
        let cities = vec!["Seoul", "Busan", "Incheon", "Daegu"];
        Ok(RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Int64Array::from(ids)), Arc::new(StringArray::from(cities))],
        )?)
    };

    // 암호화된 스필 파일 (AES-256-GCM-SIV + ZSTD)
    let config = SpillConfig::default().apply_env()?;
    let provider = EncryptedFileProvider::shared(EncryptionConfig::from_password("example")?);
    let mut spiller = Spiller::new(config, "example", schema.clone(), 1, provider)?;

    println!("=== 스필 ===");
    for round in 0..3 {
        let path = spiller.spill_blocks(0, &[make(round * 8)?, make(round * 8 + 4)?])?;
        println!("  wrote {}", path.display());
    }

    println!("\n=== 복원 (비동기 프리페치) ===");
    let mut stream = AsynchronousBlockStream::new(Box::new(spiller.restore(0)?));
    stream.read_prefix()?;
    loop {
        let mut waits = 0;
        while !stream.poll(Duration::from_millis(1))? {
            waits += 1;
        }
        match stream.read()? {
            Some(block) => println!("  block: {} rows (waited {} polls)", block.num_rows(), waits),
            None => break,
        }
    }
    stream.read_suffix()?;

    println!("\n=== 통계 ===");
    for entry in StreamStatistics::collect(&stream) {
        println!("  {}", entry.to_json()?);
    }
    println!("\n{}", statistics::collect_json(&stream)?);
    Ok(())
}
