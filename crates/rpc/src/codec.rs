//! Mapping between node messages and JSON-RPC calls.
//!
//! A request travels as the method named after its kind, with the payload object as named
//! params. A response travels as the serialized [Response].

use chordkv_core::message::Request;
use chordkv_core::message::Response;
use jsonrpc_core::Params;
use serde_json::Map;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;
use crate::method::Method;

/// Split a request into its method and params object.
pub fn encode_request(req: &Request) -> Result<(Method, Map<String, Value>)> {
    let method = Method::from(req);
    let value = serde_json::to_value(req).map_err(Error::EncodeError)?;
    let params = match value {
        Value::Object(mut outer) => match outer.remove(method.variant()) {
            Some(Value::Object(inner)) => inner,
            _ => return Err(Error::InvalidParams("payload should be an object".to_string())),
        },
        _ => return Err(Error::InvalidParams("request should be an object".to_string())),
    };
    Ok((method, params))
}

/// Rebuild a request from a method name and its params.
pub fn decode_request(method: &str, params: Params) -> Result<Request> {
    let method = Method::try_from(method)?;
    let inner = match params {
        Params::Map(map) => Value::Object(map),
        Params::None => Value::Object(Map::new()),
        Params::Array(_) => {
            return Err(Error::InvalidParams(
                "params should be an object".to_string(),
            ))
        }
    };
    let mut outer = Map::new();
    outer.insert(method.variant().to_string(), inner);
    serde_json::from_value(Value::Object(outer)).map_err(|e| Error::InvalidParams(e.to_string()))
}

pub fn encode_response(resp: &Response) -> Result<Value> {
    serde_json::to_value(resp).map_err(Error::EncodeError)
}

pub fn decode_response(value: Value) -> Result<Response> {
    serde_json::from_value(value).map_err(Error::DecodeError)
}

#[cfg(test)]
mod tests {
    use chordkv_core::dht::Did;
    use chordkv_core::dht::NodeRef;
    use chordkv_core::message::*;

    use super::*;

    #[test]
    fn test_request_codec() {
        let req = Request::Put(PutSend {
            key: "apple".to_string(),
            value: b"red".to_vec(),
            hops: 2,
        });
        let (method, params) = encode_request(&req).unwrap();
        assert_eq!(method, Method::Put);
        assert_eq!(params["key"], "apple");
        assert_eq!(params["value"], "cmVk");
        assert_eq!(decode_request("put", Params::Map(params)).unwrap(), req);

        // empty payloads accept missing params
        assert_eq!(
            decode_request("ping", Params::None).unwrap(),
            Request::Ping(PingSend {})
        );
        assert_eq!(
            decode_request("stats", Params::Map(Map::new())).unwrap(),
            Request::Stats(StatsSend {})
        );

        let req = Request::NotifyPredecessor(NotifyPredecessorSend {
            node: NodeRef::new("127.0.0.1:7001"),
        });
        let (method, params) = encode_request(&req).unwrap();
        assert_eq!(method.as_str(), "notify");
        assert_eq!(decode_request("notify", Params::Map(params)).unwrap(), req);
    }

    #[test]
    fn test_bad_requests() {
        assert!(matches!(
            decode_request("connectWithDid", Params::None),
            Err(Error::InvalidMethod)
        ));
        assert!(matches!(
            decode_request("get", Params::None),
            Err(Error::InvalidParams(_))
        ));
        assert!(matches!(
            decode_request("ping", Params::Array(vec![])),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn test_response_codec() {
        let resp = Response::FindSuccessor(FindSuccessorReport {
            node: NodeRef::with_did(Did::from_key("apple"), "127.0.0.1:7001"),
            hops: 3,
        });
        let value = encode_response(&resp).unwrap();
        assert_eq!(value["FindSuccessor"]["hops"], 3);
        assert_eq!(decode_response(value).unwrap(), resp);
    }
}
