//! Integration tests for the TCP transport.
//!
//! These spin up a real listener on a random port and connect a plain
//! `tokio::net::TcpStream` client to it.

#[cfg(feature = "tcp")]
mod tcp {
    use chatrelay_transport::{Connection, TcpTransport, Transport, TransportError};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_tcp_accept_and_exchange_bytes() {
        let mut transport = TcpTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client = TcpStream::connect(addr).await.expect("connect");
        let conn = server.await.expect("task should complete");

        assert_eq!(conn.peer_addr(), client.local_addr().unwrap());

        let (mut reader, mut writer) = conn.into_split();

        client.write_all(b"ping\n").await.unwrap();
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping\n");

        writer.write_all(b"pong\n").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong\n");
    }

    #[tokio::test]
    async fn test_tcp_connection_ids_are_unique() {
        let mut transport = TcpTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap();

        let _a = TcpStream::connect(addr).await.unwrap();
        let first = transport.accept().await.unwrap();
        let _b = TcpStream::connect(addr).await.unwrap();
        let second = transport.accept().await.unwrap();

        assert_ne!(first.id(), second.id());
        assert!(first.id() < second.id());
    }

    #[tokio::test]
    async fn test_tcp_dropping_halves_closes_connection() {
        let mut transport = TcpTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let conn = transport.accept().await.unwrap();
        drop(conn.into_split());

        let mut buf = [0u8; 1];
        let n = client.read(&mut buf).await.unwrap_or(0);
        assert_eq!(n, 0, "client should observe EOF");
    }

    #[tokio::test]
    async fn test_tcp_bind_to_taken_port_fails() {
        let first = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = first.local_addr().unwrap().to_string();

        let result = TcpTransport::bind(&addr).await;
        assert!(matches!(result, Err(TransportError::BindFailed { .. })));
    }

    #[tokio::test]
    async fn test_tcp_shutdown_releases_listener() {
        let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        transport.shutdown().await.expect("shutdown should succeed");

        assert!(TcpStream::connect(addr).await.is_err());
        assert!(matches!(transport.accept().await, Err(TransportError::Closed)));
        assert!(matches!(transport.local_addr(), Err(TransportError::Closed)));
        assert!(transport.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_shutdown_frees_port_for_rebinding() {
        let mut transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap().to_string();

        transport.shutdown().await.unwrap();

        assert!(TcpTransport::bind(&addr).await.is_ok());
    }
}
