//! Redirect/retry behavior of the XrdHTTP channel against a raw TCP
//! responder standing in for the MGM and its FSTs.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use eosns::{ClientError, HttpOptions, UnixIdentity, XrdHttpClient};

fn identity() -> UnixIdentity {
    UnixIdentity { uid: 1001, gid: 1001 }
}

fn options(base_url: String) -> HttpOptions {
    HttpOptions {
        base_url,
        client_ca_dirs: "/does/not/exist".to_string(),
        ..Default::default()
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one request (headers plus content-length body) off the stream.
async fn read_request(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut buf = Vec::new();
    let header_end = loop {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    let first_line = headers.lines().next().unwrap_or_default().to_string();
    (first_line, body)
}

/// Serve the given canned responses one connection each, returning the
/// requests that were seen.
fn spawn_server(
    listener: TcpListener,
    responses: Vec<&'static str>,
) -> JoinHandle<Vec<(String, Vec<u8>)>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            seen.push(read_request(&mut stream).await);
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
        seen
    })
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

#[tokio::test]
async fn test_get_follows_redirect_to_fst() {
    let (listener, base) = bind().await;
    let server = spawn_server(
        listener,
        vec![
            "HTTP/1.1 307 Temporary Redirect\r\nLocation: /fst1/big\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\nContent-Length: 12\r\nConnection: close\r\n\r\nfst payload!",
        ],
    );
    let client = XrdHttpClient::new(options(base)).unwrap();

    let resp = client.get_file("alice", identity(), "/big").await.unwrap();
    assert_eq!(resp.bytes().await.unwrap(), Bytes::from_static(b"fst payload!"));

    let seen = server.await.unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].0.starts_with("GET /big?eos.ruid=1001&eos.rgid=1001"));
    assert!(seen[1].0.starts_with("GET /fst1/big"));
}

#[tokio::test]
async fn test_put_reattaches_body_on_redirect() {
    let (listener, base) = bind().await;
    let server = spawn_server(
        listener,
        vec![
            "HTTP/1.1 307 Temporary Redirect\r\nLocation: /fst2/up.bin\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ],
    );
    let client = XrdHttpClient::new(options(base)).unwrap();

    client
        .put_file("alice", identity(), "/up.bin", Bytes::from_static(b"upload body"))
        .await
        .unwrap();

    let seen = server.await.unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].0.starts_with("PUT /up.bin?eos.ruid=1001&eos.rgid=1001"));
    assert_eq!(seen[0].1, b"upload body");
    assert!(seen[1].0.starts_with("PUT /fst2/up.bin"));
    assert_eq!(seen[1].1, b"upload body");
}

/// PUT only follows 307: a 302 is a terminal status, not a redirect.
#[tokio::test]
async fn test_put_302_is_not_followed() {
    let (listener, base) = bind().await;
    let server = spawn_server(
        listener,
        vec![
            "HTTP/1.1 302 Found\r\nLocation: /fst4/up.bin\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ],
    );
    let client = XrdHttpClient::new(options(base)).unwrap();

    let err = client
        .put_file("alice", identity(), "/up.bin", Bytes::from_static(b"upload body"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Internal(_)), "got {err:?}");

    // exactly one request, no follow-up to the Location target
    let seen = server.await.unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0.starts_with("PUT /up.bin?eos.ruid=1001&eos.rgid=1001"));
}

/// HEAD has no redirect handling at all.
#[tokio::test]
async fn test_head_never_follows_redirects() {
    for response in [
        "HTTP/1.1 302 Found\r\nLocation: /fst5/f\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        "HTTP/1.1 307 Temporary Redirect\r\nLocation: /fst5/f\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    ] {
        let (listener, base) = bind().await;
        let server = spawn_server(listener, vec![response]);
        let client = XrdHttpClient::new(options(base)).unwrap();

        let err = client.head("alice", identity(), "/f").await.unwrap_err();
        assert!(matches!(err, ClientError::Internal(_)), "got {err:?} for {response}");

        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 1, "no redirect may be followed for {response}");
        assert!(seen[0].0.starts_with("HEAD /f?eos.ruid=1001&eos.rgid=1001"));
    }
}

#[tokio::test]
async fn test_get_302_is_followed_as_well() {
    let (listener, base) = bind().await;
    let server = spawn_server(
        listener,
        vec![
            "HTTP/1.1 302 Found\r\nLocation: /fst3/f\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        ],
    );
    let client = XrdHttpClient::new(options(base)).unwrap();
    let resp = client.get_file("alice", identity(), "/f").await.unwrap();
    assert_eq!(resp.bytes().await.unwrap(), Bytes::from_static(b"ok"));
    server.await.unwrap();
}

#[tokio::test]
async fn test_error_statuses_map_onto_taxonomy() {
    for (response, check) in [
        (
            "HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\nConnection: close\r\n\r\nmissing",
            (|e: ClientError| matches!(e, ClientError::NotFound(_)))
                as fn(ClientError) -> bool,
        ),
        (
            "HTTP/1.1 403 Forbidden\r\nContent-Length: 6\r\nConnection: close\r\n\r\ndenied",
            |e: ClientError| matches!(e, ClientError::PermissionDenied(_)),
        ),
        (
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\noops",
            |e: ClientError| matches!(e, ClientError::Internal(_)),
        ),
    ] {
        let (listener, base) = bind().await;
        let server = spawn_server(listener, vec![response]);
        let client = XrdHttpClient::new(options(base)).unwrap();
        let err = client.get_file("alice", identity(), "/f").await.unwrap_err();
        assert!(check(err), "wrong mapping for {response}");
        server.await.unwrap();
    }
}

/// An MGM that redirects forever: the explicit redirect bound stops the
/// loop well before the operation deadline.
#[tokio::test]
async fn test_redirect_bound_stops_infinite_loop() {
    let (listener, base) = bind().await;
    let server = tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_request(&mut stream).await;
            let _ = stream
                .write_all(
                    b"HTTP/1.1 307 Temporary Redirect\r\nLocation: /loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .await;
            let _ = stream.shutdown().await;
        }
    });

    let client = XrdHttpClient::new(options(base)).unwrap();
    let started = Instant::now();
    let err = client.get_file("alice", identity(), "/f").await.unwrap_err();
    server.abort();

    match err {
        ClientError::Transport(msg) => assert!(msg.contains("redirect limit")),
        other => panic!("expected Transport redirect-limit error, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(30));
}

/// With the redirect bound lifted, the operation-wide deadline is what
/// terminates an infinite redirect loop.
#[tokio::test]
async fn test_op_deadline_bounds_infinite_redirects() {
    let (listener, base) = bind().await;
    let server = tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_request(&mut stream).await;
            let _ = stream
                .write_all(
                    b"HTTP/1.1 302 Found\r\nLocation: /loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .await;
            let _ = stream.shutdown().await;
        }
    });

    let mut opt = options(base);
    opt.op_timeout_s = 2;
    opt.max_redirects = 1_000_000;
    let client = XrdHttpClient::new(opt).unwrap();

    let started = Instant::now();
    let err = client.get_file("alice", identity(), "/f").await.unwrap_err();
    server.abort();

    assert!(matches!(err, ClientError::Timeout(_)), "got {err:?}");
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(4));
}

/// A stalled server: per-attempt timeouts trigger retries until the
/// operation deadline fires.
#[tokio::test]
async fn test_op_deadline_bounds_stalled_server() {
    let (listener, base) = bind().await;
    let server = tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_request(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    });

    let mut opt = options(base);
    opt.rw_timeout_s = 1;
    opt.op_timeout_s = 2;
    let client = XrdHttpClient::new(opt).unwrap();

    let started = Instant::now();
    let err = client.get_file("alice", identity(), "/f").await.unwrap_err();
    server.abort();

    assert!(matches!(err, ClientError::Timeout(_)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(4));
}

/// Identity injection attempts fail before any connection is made: the
/// listener sees no traffic.
#[tokio::test]
async fn test_malicious_paths_rejected_without_network_io() {
    let (listener, base) = bind().await;
    let client = XrdHttpClient::new(options(base)).unwrap();

    for path in ["/f?eos.ruid=0", "/f?x=1&eos.ruid=0", "/f?eos.guid=0", "/f?x=1&eos.guid=0"] {
        let err = client.get_file("alice", identity(), path).await.unwrap_err();
        assert!(matches!(err, ClientError::PermissionDenied(_)), "path {path}");
        let err = client
            .put_file("alice", identity(), path, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::PermissionDenied(_)), "path {path}");
        let err = client.head("alice", identity(), path).await.unwrap_err();
        assert!(matches!(err, ClientError::PermissionDenied(_)), "path {path}");
    }

    // nothing ever connected
    let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
    assert!(accepted.is_err());
}
