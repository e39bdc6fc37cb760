//! Wire shapes for `/write`: `snappy.encode(proto.marshal(msg))`.
//!
//! The protobuf schemas themselves are an external collaborator (spec §1);
//! these are hand-written `prost::Message` structs matching the documented
//! shape (sorted labels, int64-ms timestamps, float64 values), not generated
//! from a `.proto` file.

use prost::Message;
use tsdb_core::{Label, Labels, Sample, Series};

use crate::error::NodeError;

#[derive(Clone, PartialEq, prost::Message)]
pub struct LabelPair {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SamplePoint {
    #[prost(int64, tag = "1")]
    pub timestamp_ms: i64,
    #[prost(double, tag = "2")]
    pub value: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WireTimeSeries {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<LabelPair>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<SamplePoint>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<WireTimeSeries>,
}

impl From<&Series> for WireTimeSeries {
    fn from(series: &Series) -> Self {
        Self {
            labels: series
                .labels
                .as_slice()
                .iter()
                .map(|l| LabelPair { name: l.name.clone(), value: l.value.clone() })
                .collect(),
            samples: series.samples.iter().map(|s| SamplePoint { timestamp_ms: s.timestamp_ms, value: s.value }).collect(),
        }
    }
}

impl WireTimeSeries {
    /// Rebuilds the sorted label set (empty values dropped), per the
    /// internal branch's contract.
    #[must_use]
    pub fn labels(&self) -> Labels {
        Labels::from_pairs(self.labels.iter().map(|l| Label::new(l.name.clone(), l.value.clone())))
    }

    #[must_use]
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.iter().map(|s| Sample::new(s.timestamp_ms, s.value)).collect()
    }
}

/// Encodes a `WriteRequest` as `snappy.encode(proto.marshal(msg))`.
pub fn encode(req: &WriteRequest) -> Result<Vec<u8>, NodeError> {
    let proto = req.encode_to_vec();
    snap::raw::Encoder::new()
        .compress_vec(&proto)
        .map_err(|e| NodeError::MalformedRequest(format!("snappy encode failed: {e}")))
}

/// Decodes a snappy-compressed protobuf `WriteRequest`. Empty batches are
/// rejected by the caller, not here (decode purity).
pub fn decode(body: &[u8]) -> Result<WriteRequest, NodeError> {
    let proto = snap::raw::Decoder::new()
        .decompress_vec(body)
        .map_err(|e| NodeError::MalformedRequest(format!("snappy decode failed: {e}")))?;
    WriteRequest::decode(proto.as_slice())
        .map_err(|e| NodeError::MalformedRequest(format!("protobuf decode failed: {e}")))
}
