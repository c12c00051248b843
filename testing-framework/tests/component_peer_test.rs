#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//! Component connection over loopback TCP

use gateway_testing_framework::peer::{ComponentListener, PeerChannel, PeerEvent};
use gateway_testing_framework::stanza::Stanza;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const JID: &str = "biboumi.localhost";
const STREAM_OPEN: &str = "<?xml version='1.0'?><stream:stream xmlns='jabber:component:accept' \
                           xmlns:stream='http://etherx.jabber.org/streams' to='biboumi.localhost'>";

async fn listener() -> ComponentListener {
    ComponentListener::bind("127.0.0.1:0".parse().unwrap(), JID)
        .await
        .unwrap()
}

/// Read from the socket until `needle` shows up in what was received
async fn read_until(socket: &mut TcpStream, received: &mut String, needle: &str) {
    let mut chunk = [0u8; 1024];
    tokio::time::timeout(Duration::from_secs(5), async {
        while !received.contains(needle) {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before '{}' arrived", needle);
            received.push_str(std::str::from_utf8(&chunk[..n]).unwrap());
        }
    })
    .await
    .expect("timed out reading from the harness");
}

async fn next_event(peer: &mut dyn PeerChannel) -> PeerEvent {
    tokio::time::timeout(Duration::from_secs(5), peer.next_event())
        .await
        .expect("timed out waiting for a peer event")
        .expect("peer channel exhausted")
}

#[tokio::test]
async fn test_handshake_and_stanza_exchange() {
    let listener = listener().await;
    let addr = listener.local_addr().unwrap();

    let client = tokio::spawn(async move {
        let mut socket = TcpStream::connect(addr).await.unwrap();
        let mut received = String::new();
        socket.write_all(STREAM_OPEN.as_bytes()).await.unwrap();
        read_until(&mut socket, &mut received, "id=").await;
        assert!(received.contains("from=\"biboumi.localhost\""));

        // Split across writes to exercise the framing
        socket.write_all(b"<handshake>abc</hand").await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        socket.write_all(b"shake><presence from='a@b/c'/>").await.unwrap();

        read_until(&mut socket, &mut received, "<handshake/>").await;
        socket.write_all(b"</stream:stream>").await.unwrap();
        read_until(&mut socket, &mut received, "</stream:stream>").await;
        received
    });

    let mut conn = listener.accept(Duration::from_secs(5)).await.unwrap();

    assert_eq!(
        next_event(&mut conn).await,
        PeerEvent::Stanza(Stanza::new("<handshake>abc</handshake>"))
    );
    assert_eq!(
        next_event(&mut conn).await,
        PeerEvent::Stanza(Stanza::new("<presence from='a@b/c'/>"))
    );

    conn.send("<handshake/>").unwrap();
    assert_eq!(next_event(&mut conn).await, PeerEvent::SessionEnd);

    let received = client.await.unwrap();
    assert!(received.ends_with("</stream:stream>"));
}

#[tokio::test]
async fn test_dropped_connection_ends_session() {
    let listener = listener().await;
    let addr = listener.local_addr().unwrap();

    let client = tokio::spawn(async move {
        let mut socket = TcpStream::connect(addr).await.unwrap();
        socket.write_all(STREAM_OPEN.as_bytes()).await.unwrap();
        let mut received = String::new();
        read_until(&mut socket, &mut received, "id=").await;
    });

    let mut conn = listener.accept(Duration::from_secs(5)).await.unwrap();
    client.await.unwrap();

    assert_eq!(next_event(&mut conn).await, PeerEvent::SessionEnd);
}

#[tokio::test]
async fn test_listener_serves_consecutive_sessions() {
    let listener = listener().await;
    let addr = listener.local_addr().unwrap();

    for round in 0..2 {
        let client = tokio::spawn(async move {
            let mut socket = TcpStream::connect(addr).await.unwrap();
            socket.write_all(STREAM_OPEN.as_bytes()).await.unwrap();
            socket
                .write_all(format!("<message id='{}'/></stream:stream>", round).as_bytes())
                .await
                .unwrap();
            let mut received = String::new();
            read_until(&mut socket, &mut received, "</stream:stream>").await;
        });

        let mut conn = listener.accept(Duration::from_secs(5)).await.unwrap();
        assert_eq!(
            next_event(&mut conn).await,
            PeerEvent::Stanza(Stanza::new(format!("<message id='{}'/>", round)))
        );
        assert_eq!(next_event(&mut conn).await, PeerEvent::SessionEnd);
        client.await.unwrap();
    }
}
