//! Binary wire protocol shared by the distributed cache client and server.

pub mod codec;

pub use codec::{
    decode_get_response, decode_request, encode_get, encode_get_response, encode_set, Request,
    WireError, MAX_SOCKET_BUFFER, OP_GET, OP_SET,
};
