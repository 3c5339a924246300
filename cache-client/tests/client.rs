use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use cache_client::DistributedClient;
use cache_wire::{decode_request, encode_get_response, Request};

fn spawn_server(handler: impl FnOnce(Request, &mut TcpStream) + Send + 'static) -> (String, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).expect("read request");
        let request = decode_request(&buf[..n]).expect("decode request");
        handler(request, &mut stream);
    });

    (addr.ip().to_string(), addr.port())
}

#[test]
fn client_get_roundtrip() {
    let (ip, port) = spawn_server(|request, stream| {
        assert_eq!(request, Request::Get { key: b"www.google.com".to_vec() });
        let mut response = Vec::new();
        encode_get_response(Some((b"172.217.3.164", 86400)), &mut response);
        stream.write_all(&response).unwrap();
    });

    let client = DistributedClient::new(&ip, port).unwrap();
    let result = client.get(b"www.google.com");
    assert_eq!(result, Some((b"172.217.3.164".to_vec(), 86400)));
}

#[test]
fn client_set_is_fire_and_forget() {
    let (ip, port) = spawn_server(|request, _stream| {
        assert_eq!(
            request,
            Request::Set { key: b"k".to_vec(), data: b"v".to_vec(), ttl: 86400 }
        );
    });

    let client = DistributedClient::new(&ip, port).unwrap();
    client.set(b"k", b"v", 86400);
    // No response is expected or read; reaching here without blocking is the assertion.
}

#[test]
fn client_get_miss_on_unresponsive_server() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        // Accept and never respond, to exercise the client's 500ms read timeout.
        let _ = listener.accept();
    });

    let client = DistributedClient::new(&addr.ip().to_string(), addr.port()).unwrap();
    assert_eq!(client.get(b"k"), None);
}
