//! Wire shapes for `/read`: `snappy.encode(proto.marshal(msg))`, same
//! framing as `/write`.

use prost::Message;

use crate::error::NodeError;
use crate::write::wire::WireTimeSeries;

#[derive(Clone, Copy, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub enum MatchOpProto {
    Equal = 0,
    NotEqual = 1,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MatcherProto {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
    #[prost(enumeration = "MatchOpProto", tag = "3")]
    pub op: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Query {
    #[prost(int64, tag = "1")]
    pub start_ms: i64,
    #[prost(int64, tag = "2")]
    pub end_ms: i64,
    #[prost(message, repeated, tag = "3")]
    pub matchers: Vec<MatcherProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadRequest {
    #[prost(message, repeated, tag = "1")]
    pub queries: Vec<Query>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryResult {
    #[prost(message, repeated, tag = "1")]
    pub series: Vec<WireTimeSeries>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadResponse {
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<QueryResult>,
}

pub fn encode_request(req: &ReadRequest) -> Result<Vec<u8>, NodeError> {
    snap::raw::Encoder::new()
        .compress_vec(&req.encode_to_vec())
        .map_err(|e| NodeError::MalformedRequest(format!("snappy encode failed: {e}")))
}

pub fn decode_request(body: &[u8]) -> Result<ReadRequest, NodeError> {
    let proto = snap::raw::Decoder::new()
        .decompress_vec(body)
        .map_err(|e| NodeError::MalformedRequest(format!("snappy decode failed: {e}")))?;
    ReadRequest::decode(proto.as_slice())
        .map_err(|e| NodeError::MalformedRequest(format!("protobuf decode failed: {e}")))
}

pub fn encode_response(resp: &ReadResponse) -> Result<Vec<u8>, NodeError> {
    snap::raw::Encoder::new()
        .compress_vec(&resp.encode_to_vec())
        .map_err(|e| NodeError::MalformedRequest(format!("snappy encode failed: {e}")))
}

pub fn decode_response(body: &[u8]) -> Result<ReadResponse, NodeError> {
    let proto = snap::raw::Decoder::new()
        .decompress_vec(body)
        .map_err(|e| NodeError::MalformedRequest(format!("snappy decode failed: {e}")))?;
    ReadResponse::decode(proto.as_slice())
        .map_err(|e| NodeError::MalformedRequest(format!("protobuf decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let req = ReadRequest {
            queries: vec![Query {
                start_ms: 0,
                end_ms: 1000,
                matchers: vec![MatcherProto { name: "host".to_string(), value: "a".to_string(), op: MatchOpProto::Equal as i32 }],
            }],
        };
        let bytes = encode_request(&req).unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), req);
    }

    #[test]
    fn response_round_trips() {
        let resp = ReadResponse { results: vec![QueryResult { series: vec![] }] };
        let bytes = encode_response(&resp).unwrap();
        assert_eq!(decode_response(&bytes).unwrap(), resp);
    }
}
