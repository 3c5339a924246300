//! # Distributed cache wire codec
//!
//! Stateless pack/unpack for the fixed-header binary frames exchanged
//! between the distributed client and the distributed cache server.
//! Byte layouts (big-endian) are grounded exactly in the original
//! `cacheclient.c` / `cacherequesthandler.c` request/response framing:
//!
//! ```text
//! SET request:  opcode(1) | keylen(4) | datalen(4) | ttl(4) | key | data
//! GET request:  opcode(1) | keylen(4) | key
//! GET response: datalen(4) | ttl(4) | data            (miss: datalen=ttl=0, no body)
//! ```
//!
//! ## Design Principles
//!
//! 1. **Fail Fast**: any frame shorter than its fixed header, or carrying
//!    an oversized key/data, is rejected rather than partially parsed.
//! 2. **No Allocation on the Hot Path**: encoding writes directly into a
//!    caller-provided buffer.
//! 3. **Closed Opcode Set**: any opcode outside `{GET, SET}` is rejected.

use cache_common::limits::{DISTRIBUTED_MAXDATALEN, DISTRIBUTED_MAXKEYLEN, MAXTTL};

/// GET opcode. The original source's header defining the literal values
/// was not available; these are this implementation's own closed set.
pub const OP_GET: u8 = 1;
/// SET opcode.
pub const OP_SET: u8 = 2;

/// Largest single read the client/server will attempt per `recv`.
pub const MAX_SOCKET_BUFFER: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Frame shorter than the opcode's fixed header.
    Truncated,
    /// Opcode outside `{GET, SET}`.
    UnknownOpcode(u8),
    /// Key or data length exceeded the distributed limits.
    TooLarge,
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get { key: Vec<u8> },
    Set { key: Vec<u8>, data: Vec<u8>, ttl: u32 },
}

/// Encodes a GET request: `opcode(1) | keylen(4) | key`.
pub fn encode_get(key: &[u8], out: &mut Vec<u8>) {
    out.push(OP_GET);
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(key);
}

/// Encodes a SET request: `opcode(1) | keylen(4) | datalen(4) | ttl(4) | key | data`.
pub fn encode_set(key: &[u8], data: &[u8], ttl: u32, out: &mut Vec<u8>) {
    out.push(OP_SET);
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&ttl.to_be_bytes());
    out.extend_from_slice(key);
    out.extend_from_slice(data);
}

/// Decodes a request frame. Mirrors `cacherequesthandler`'s validation
/// order: opcode/keylen header first, then per-opcode body bounds.
pub fn decode_request(buf: &[u8]) -> Result<Request, WireError> {
    if buf.len() < 5 {
        return Err(WireError::Truncated);
    }
    let opcode = buf[0];
    let keylen = u32::from_be_bytes(buf[1..5].try_into().unwrap());
    if keylen > DISTRIBUTED_MAXKEYLEN {
        return Err(WireError::TooLarge);
    }
    let keylen = keylen as usize;

    match opcode {
        OP_GET => {
            if buf.len() - 5 < keylen {
                return Err(WireError::Truncated);
            }
            Ok(Request::Get {
                key: buf[5..5 + keylen].to_vec(),
            })
        }
        OP_SET => {
            if buf.len() - 5 < keylen + 8 {
                return Err(WireError::Truncated);
            }
            let datalen = u32::from_be_bytes(buf[5 + keylen..5 + keylen + 4].try_into().unwrap());
            if datalen > DISTRIBUTED_MAXDATALEN {
                return Err(WireError::TooLarge);
            }
            let datalen = datalen as usize;
            let ttl_offset = 5 + keylen + 4;
            let ttl = u32::from_be_bytes(buf[ttl_offset..ttl_offset + 4].try_into().unwrap());
            let data_offset = ttl_offset + 4;
            if buf.len() < data_offset + datalen {
                return Err(WireError::Truncated);
            }
            let key = buf[5..5 + keylen].to_vec();
            let data = buf[data_offset..data_offset + datalen].to_vec();
            let ttl = ttl.min(MAXTTL as u32);
            Ok(Request::Set { key, data, ttl })
        }
        other => Err(WireError::UnknownOpcode(other)),
    }
}

/// Encodes a GET response. `value` of `None` encodes a miss
/// (`datalen=0, ttl=0`, no body).
pub fn encode_get_response(value: Option<(&[u8], u32)>, out: &mut Vec<u8>) {
    match value {
        Some((data, ttl)) => {
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            out.extend_from_slice(&ttl.to_be_bytes());
            out.extend_from_slice(data);
        }
        None => {
            out.extend_from_slice(&0u32.to_be_bytes());
            out.extend_from_slice(&0u32.to_be_bytes());
        }
    }
}

/// Decodes a GET response: `datalen(4) | ttl(4) | data`. A miss is
/// `datalen == 0`.
pub fn decode_get_response(buf: &[u8]) -> Result<Option<(Vec<u8>, u32)>, WireError> {
    if buf.len() < 8 {
        return Err(WireError::Truncated);
    }
    let datalen = u32::from_be_bytes(buf[0..4].try_into().unwrap()) as usize;
    let ttl = u32::from_be_bytes(buf[4..8].try_into().unwrap());
    if datalen == 0 {
        return Ok(None);
    }
    if buf.len() < 8 + datalen {
        return Err(WireError::Truncated);
    }
    Ok(Some((buf[8..8 + datalen].to_vec(), ttl)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_request_round_trips() {
        let mut buf = Vec::new();
        encode_get(b"www.google.com", &mut buf);
        let decoded = decode_request(&buf).unwrap();
        assert_eq!(decoded, Request::Get { key: b"www.google.com".to_vec() });
    }

    #[test]
    fn set_request_round_trips() {
        let mut buf = Vec::new();
        encode_set(b"k", b"v", 86400, &mut buf);
        let decoded = decode_request(&buf).unwrap();
        assert_eq!(
            decoded,
            Request::Set { key: b"k".to_vec(), data: b"v".to_vec(), ttl: 86400 }
        );
    }

    #[test]
    fn truncated_request_is_rejected() {
        assert_eq!(decode_request(&[OP_GET, 0, 0]), Err(WireError::Truncated));
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let mut buf = vec![9u8];
        buf.extend_from_slice(&0u32.to_be_bytes());
        assert_eq!(decode_request(&buf), Err(WireError::UnknownOpcode(9)));
    }

    #[test]
    fn oversized_key_is_rejected() {
        let mut buf = vec![OP_GET];
        buf.extend_from_slice(&(DISTRIBUTED_MAXKEYLEN + 1).to_be_bytes());
        assert_eq!(decode_request(&buf), Err(WireError::TooLarge));
    }

    #[test]
    fn response_hit_round_trips() {
        let mut buf = Vec::new();
        encode_get_response(Some((b"172.217.3.164", 86400)), &mut buf);
        let decoded = decode_get_response(&buf).unwrap();
        assert_eq!(decoded, Some((b"172.217.3.164".to_vec(), 86400)));
    }

    #[test]
    fn response_miss_round_trips() {
        let mut buf = Vec::new();
        encode_get_response(None, &mut buf);
        let decoded = decode_get_response(&buf).unwrap();
        assert_eq!(decoded, None);
    }
}
