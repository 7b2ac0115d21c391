use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use crate::*;
use crate::endpoints::READY_PREFIX;

/// Binds an ephemeral loopback port and connects to it.
async fn tcp_pair() -> (TcpTransport, TcpTransport) {
    let listener = Listener::bind(loopback(0)).await.expect("bind failed");
    let addr = listener.local_addr();
    let accept = tokio::spawn(listener.accept_one());
    let client = connect(addr).await.expect("connect failed");
    let server = accept.await.expect("accept task panicked").expect("accept failed");
    (client, server)
}

// ============================================================================
//  TCP
// ============================================================================

#[tokio::test]
async fn test_tcp_frame_roundtrip() {
    let (client, server) = tcp_pair().await;

    client.send(b"hello").await.unwrap();
    client.send(b"").await.unwrap();
    client.send(&[7u8; 2048]).await.unwrap();

    assert_eq!(server.recv().await.unwrap(), b"hello");
    assert_eq!(server.recv().await.unwrap(), b"");
    assert_eq!(server.recv().await.unwrap(), vec![7u8; 2048]);

    server.send(b"back").await.unwrap();
    assert_eq!(client.recv().await.unwrap(), b"back");
}

#[tokio::test]
async fn test_tcp_close_is_connection_closed() {
    let (client, server) = tcp_pair().await;
    client.send(b"last").await.unwrap();
    client.close().await.unwrap();

    assert_eq!(server.recv().await.unwrap(), b"last");
    assert_eq!(server.recv().await.unwrap_err(), Error::ConnectionClosed);
}

#[tokio::test]
async fn test_tcp_drop_is_connection_closed() {
    let (client, server) = tcp_pair().await;
    drop(client);
    assert_eq!(server.recv().await.unwrap_err(), Error::ConnectionClosed);
}

#[tokio::test]
async fn test_tcp_rejects_oversized_send() {
    let (client, _server) = tcp_pair().await;
    let err = client.send(&vec![0u8; duopack::MSG_MAX_SIZE + 1]).await.unwrap_err();
    assert_eq!(err, Error::FrameTooLarge { size: duopack::MSG_MAX_SIZE + 1, max: duopack::MSG_MAX_SIZE });
}

#[tokio::test]
async fn test_tcp_oversized_frame_is_skipped() {
    let (client, server) = tcp_pair().await;
    let client = client.with_max_frame(64 * 1024);

    client.send(&vec![1u8; 10_000]).await.unwrap();
    client.send(b"after").await.unwrap();

    let err = server.recv().await.unwrap_err();
    assert_eq!(err, Error::FrameTooLarge { size: 10_000, max: duopack::MSG_MAX_SIZE });
    assert_eq!(server.recv().await.unwrap(), b"after");
}

#[tokio::test]
async fn test_tcp_concurrent_sends_do_not_interleave() {
    let (client, server) = tcp_pair().await;
    let client = Arc::new(client);

    let mut tasks = Vec::new();
    for i in 0..16u8 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..20 {
                client.send(&vec![i; 1500]).await.unwrap();
            }
        }));
    }
    // drain while senders run so the socket buffer never fills up
    for _ in 0..(16 * 20) {
        let frame = server.recv().await.unwrap();
        assert_eq!(frame.len(), 1500);
        assert!(frame.iter().all(|b| *b == frame[0]), "frame bytes interleaved");
    }

    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn test_listener_accepts_single_peer() {
    let listener = Listener::bind(loopback(0)).await.unwrap();
    let addr = listener.local_addr();
    let accept = tokio::spawn(listener.accept_one());
    let _first = connect(addr).await.unwrap();
    let _server = accept.await.unwrap().unwrap();

    // The listening socket is gone once a peer has been accepted.
    assert!(matches!(connect(addr).await, Err(Error::Connect { .. })));
}

/// Accepts one raw socket peer, writes `bytes` from it, then closes its write side.
async fn server_after_raw_write(bytes: &[u8]) -> TcpTransport {
    let listener = Listener::bind(loopback(0)).await.unwrap();
    let addr = listener.local_addr();
    let accept = tokio::spawn(listener.accept_one());
    let mut raw = tokio::net::TcpStream::connect(addr).await.unwrap();
    let server = accept.await.unwrap().unwrap();

    raw.write_all(bytes).await.unwrap();
    raw.shutdown().await.unwrap();
    server
}

#[tokio::test]
async fn test_tcp_eof_inside_prefix_is_connection_lost() {
    let server = server_after_raw_write(&[0, 0]).await;
    assert!(matches!(server.recv().await, Err(Error::ConnectionLost(_))));
}

#[tokio::test]
async fn test_tcp_eof_inside_frame_is_connection_lost() {
    let server = server_after_raw_write(&[0, 0, 0, 8, b'a', b'b']).await;
    assert!(matches!(server.recv().await, Err(Error::ConnectionLost(_))));
}

#[tokio::test]
async fn test_tcp_eof_after_frame_is_connection_closed() {
    let server = server_after_raw_write(&[0, 0, 0, 2, b'o', b'k']).await;
    assert_eq!(server.recv().await.unwrap(), b"ok");
    assert_eq!(server.recv().await.unwrap_err(), Error::ConnectionClosed);
}

#[tokio::test]
async fn test_listen_and_accept_serves_one_peer() {
    // pick a free port, then hand it to listen_and_accept
    let port = {
        let scratch = Listener::bind(loopback(0)).await.unwrap();
        scratch.local_addr().port()
    };
    let accept = tokio::spawn(listen_and_accept(port));

    let mut client = None;
    for _ in 0..100 {
        match connect(loopback(port)).await {
            Ok(transport) => {
                client = Some(transport);
                break;
            }
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
        }
    }
    let client = client.expect("listener never came up");
    let server = accept.await.unwrap().unwrap();

    client.send(b"ping").await.unwrap();
    assert_eq!(server.recv().await.unwrap(), b"ping");
    server.send(b"pong").await.unwrap();
    assert_eq!(client.recv().await.unwrap(), b"pong");

    assert!(matches!(connect(loopback(port)).await, Err(Error::Connect { .. })));
}

#[tokio::test]
async fn test_connect_refused() {
    let addr = {
        let listener = Listener::bind(loopback(0)).await.unwrap();
        listener.local_addr()
    };
    assert!(matches!(connect(addr).await, Err(Error::Connect { .. })));
}

// ============================================================================
//  CHANNEL
// ============================================================================

#[tokio::test]
async fn test_channel_pair() {
    let (a, b) = ChannelTransport::pair();
    a.send(b"ping").await.unwrap();
    assert_eq!(b.recv().await.unwrap(), b"ping");
    b.send(b"pong").await.unwrap();
    assert_eq!(a.recv().await.unwrap(), b"pong");
}

#[tokio::test]
async fn test_channel_close() {
    let (a, b) = ChannelTransport::pair();
    a.send(b"buffered").await.unwrap();
    a.close().await.unwrap();

    assert_eq!(b.recv().await.unwrap(), b"buffered");
    assert_eq!(b.recv().await.unwrap_err(), Error::ConnectionClosed);
    assert!(matches!(a.send(b"x").await, Err(Error::ConnectionLost(_))));
}

// ============================================================================
//  ENDPOINTS
// ============================================================================

#[test]
fn test_ready_line_roundtrip() {
    let endpoints = Endpoints::new(40001, 40002);
    let line = endpoints.ready_line();
    assert!(line.starts_with(READY_PREFIX));
    assert_eq!(Endpoints::parse_ready_line(&line), Some(endpoints));
}

#[test]
fn test_ready_line_rejects_other_output() {
    assert_eq!(Endpoints::parse_ready_line(""), None);
    assert_eq!(Endpoints::parse_ready_line("hello world"), None);
    assert_eq!(Endpoints::parse_ready_line("DUO_READY request=1"), None);
    assert_eq!(Endpoints::parse_ready_line("DUO_READY request=x callback=2"), None);
}

#[test]
fn test_default_endpoints() {
    let endpoints = Endpoints::default();
    assert_eq!(endpoints.request_port, 54000);
    assert_eq!(endpoints.callback_port, 54001);
    assert_eq!(endpoints.request_addr(), loopback(54000));
}
