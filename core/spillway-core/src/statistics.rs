//! Per-stream execution statistics.
//!
//! Reads the counters a finished stream tree kept in its
//! [`BlockStreamProfile`](crate::stream::BlockStreamProfile)s and reports
//! them as JSON, one record per stream.

use crate::error::SpillwayResult;
use crate::stream::BlockInputStream;
use serde::{Deserialize, Serialize};

/// 스트림 실행 통계
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatistics {
    /// `<name>_<position>`, position in pre-order.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub children: Vec<String>,
    pub outbound_rows: u64,
    pub outbound_blocks: u64,
    pub outbound_bytes: u64,
    pub execution_time_ns: u64,
}

impl StreamStatistics {
    /// Walk `root` and its children in pre-order.
    pub fn collect(root: &dyn BlockInputStream) -> Vec<StreamStatistics> {
        let mut out = Vec::new();
        visit(root, &mut out);
        out
    }

    pub fn to_json(&self) -> SpillwayResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// JSON array with the statistics of every stream under `root`.
pub fn collect_json(root: &dyn BlockInputStream) -> SpillwayResult<String> {
    Ok(serde_json::to_string(&StreamStatistics::collect(root))?)
}

/// Returns the id assigned to `stream`.
fn visit(stream: &dyn BlockInputStream, out: &mut Vec<StreamStatistics>) -> String {
    let slot = out.len();
    let id = format!("{}_{}", stream.name(), slot);
    out.push(StreamStatistics {
        id: id.clone(),
        kind: stream.name().to_string(),
        children: Vec::new(),
        outbound_rows: 0,
        outbound_blocks: 0,
        outbound_bytes: 0,
        execution_time_ns: 0,
    });

    let mut children = Vec::new();
    stream.for_each_child(&mut |child: &dyn BlockInputStream| {
        children.push(visit(child, out));
    });

    let entry = &mut out[slot];
    entry.children = children;
    if let Some(profile) = stream.profile() {
        entry.outbound_rows = profile.rows();
        entry.outbound_blocks = profile.blocks();
        entry.outbound_bytes = profile.bytes();
        entry.execution_time_ns = u64::try_from(profile.execution_time().as_nanos()).unwrap_or(u64::MAX);
    }
    id
}
