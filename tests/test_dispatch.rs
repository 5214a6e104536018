use filedrop::clock::SystemClock;
use filedrop::config::Limits;
use filedrop::limiter::RateLimiter;
use filedrop::protocol::command::{Command, TransferMethod};
use filedrop::protocol::dispatch::Dispatcher;
use filedrop::protocol::response::{Reply, ReplyBody};
use filedrop::sandbox::Sandbox;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

fn peer() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50))
}

fn setup(limits: Limits) -> (Dispatcher, TempDir, TempDir) {
    let serve_dir = tempdir().unwrap();
    let storage_dir = tempdir().unwrap();

    let limiter = Arc::new(RateLimiter::new(limits, Arc::new(SystemClock)));
    let dispatcher = Dispatcher::new(
        limiter,
        Sandbox::new(serve_dir.path()).unwrap(),
        Sandbox::new(storage_dir.path()).unwrap(),
    );

    (dispatcher, serve_dir, storage_dir)
}

fn default_setup() -> (Dispatcher, TempDir, TempDir) {
    setup(Limits::default())
}

fn transfer(method: TransferMethod, path: &str, body: &[u8]) -> Command {
    Command::Transfer {
        method,
        path: path.to_string(),
        headers: HashMap::new(),
        body: body.to_vec(),
    }
}

fn raw_text(reply: &Reply) -> &str {
    match &reply.body {
        ReplyBody::Raw(bytes) => std::str::from_utf8(bytes).unwrap(),
        other => panic!("expected raw reply, got {:?}", other),
    }
}

fn http_status_and_body(reply: &Reply) -> (u16, Vec<u8>) {
    match &reply.body {
        ReplyBody::Http(r) => (r.status.as_u16(), r.body.clone()),
        other => panic!("expected http reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_echoes_message() {
    let (dispatcher, _s, _t) = default_setup();

    let reply = dispatcher
        .dispatch(
            Command::Chat {
                text: "hello".to_string(),
            },
            peer(),
        )
        .await;

    assert_eq!(raw_text(&reply), "200 Server received: hello\r\n");
    assert!(!reply.close);
}

#[tokio::test]
async fn test_chat_rejects_blank_message() {
    let (dispatcher, _s, _t) = default_setup();

    let reply = dispatcher
        .dispatch(
            Command::Chat {
                text: "   ".to_string(),
            },
            peer(),
        )
        .await;

    assert_eq!(raw_text(&reply), "400 Message cannot be empty\r\n");
}

#[tokio::test]
async fn test_info_reports_request_counts() {
    let (dispatcher, _s, _t) = default_setup();

    dispatcher
        .dispatch(
            Command::Chat {
                text: "warmup".to_string(),
            },
            peer(),
        )
        .await;
    let reply = dispatcher.dispatch(Command::Info, peer()).await;

    let text = raw_text(&reply).to_string();
    assert!(text.contains("IP Address: 192.168.1.50"));
    assert!(text.contains("Total Requests: 2"));
    assert!(text.contains("Current Window Requests: 2"));
    assert!(text.contains("First Seen: "));
    assert!(text.contains("Last Request: "));
}

#[tokio::test]
async fn test_list_empty_storage_is_404() {
    let (dispatcher, _s, _t) = default_setup();

    let reply = dispatcher.dispatch(Command::List, peer()).await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 404);
    assert_eq!(body, b"No files found in the server folder");
}

#[tokio::test]
async fn test_list_formats_entries() {
    let (dispatcher, _s, storage_dir) = default_setup();
    std::fs::write(storage_dir.path().join("a.txt"), b"12345").unwrap();

    let reply = dispatcher.dispatch(Command::List, peer()).await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 200);
    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with("a.txt - Size: 5 bytes - Last Modified: "));
}

#[tokio::test]
async fn test_get_serves_and_mirrors_file() {
    let (dispatcher, serve_dir, storage_dir) = default_setup();
    std::fs::write(serve_dir.path().join("doc.pdf"), b"pdfbytes").unwrap();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Get, "/doc.pdf", b""), peer())
        .await;

    let (status, body) = http_status_and_body(&reply);
    assert_eq!(status, 200);
    assert_eq!(body, b"pdfbytes");

    match &reply.body {
        ReplyBody::Http(r) => {
            let headers: HashMap<&str, &str> = r
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            assert_eq!(headers["Content-Type"], "application/octet-stream");
            assert_eq!(
                headers["Content-Disposition"],
                "attachment; filename=\"doc.pdf\""
            );
            assert_eq!(headers["Content-Length"], "8");
            assert_eq!(headers["Connection"], "close");
        }
        _ => unreachable!(),
    }

    // Mirroring side effect
    assert_eq!(
        std::fs::read(storage_dir.path().join("doc.pdf")).unwrap(),
        b"pdfbytes"
    );
}

#[tokio::test]
async fn test_get_missing_source_is_404() {
    let (dispatcher, _s, _t) = default_setup();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Get, "/nope.pdf", b""), peer())
        .await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 404);
    assert_eq!(body, b"Source file not found");
}

#[tokio::test]
async fn test_get_without_path_is_400() {
    let (dispatcher, _s, _t) = default_setup();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Get, "", b""), peer())
        .await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 400);
    assert_eq!(body, b"Path is required");
}

#[tokio::test]
async fn test_get_escape_attempt_is_403() {
    let (dispatcher, _s, _t) = default_setup();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Get, "../../etc/passwd", b""), peer())
        .await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 403);
    assert_eq!(body, b"Access denied: Invalid path");
}

#[tokio::test]
async fn test_post_then_get_round_trip() {
    let (dispatcher, serve_dir, storage_dir) = default_setup();
    let payload: Vec<u8> = (0..=255).collect();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Post, "/data/blob.bin", &payload), peer())
        .await;
    let (status, body) = http_status_and_body(&reply);
    assert_eq!(status, 200);
    assert!(String::from_utf8(body)
        .unwrap()
        .starts_with("File successfully saved to "));

    let stored = std::fs::read(storage_dir.path().join("data/blob.bin")).unwrap();
    assert_eq!(stored, payload);

    // Serve the stored bytes back through GET against a matching root
    std::fs::create_dir_all(serve_dir.path().join("data")).unwrap();
    std::fs::write(serve_dir.path().join("data/blob.bin"), &stored).unwrap();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Get, "/data/blob.bin", b""), peer())
        .await;
    let (status, body) = http_status_and_body(&reply);
    assert_eq!(status, 200);
    assert_eq!(body, payload);
}

#[tokio::test]
async fn test_post_escape_attempt_is_403() {
    let (dispatcher, _s, _t) = default_setup();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Post, "../evil.sh", b"x"), peer())
        .await;
    let (status, _) = http_status_and_body(&reply);
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_delete_removes_file() {
    let (dispatcher, _s, storage_dir) = default_setup();
    std::fs::write(storage_dir.path().join("old.txt"), b"x").unwrap();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Delete, "/old.txt", b""), peer())
        .await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 200);
    assert_eq!(body, b"File old.txt deleted successfully");
    assert!(!storage_dir.path().join("old.txt").exists());
}

#[tokio::test]
async fn test_delete_missing_file_is_404_with_clean_path() {
    let (dispatcher, _s, _t) = default_setup();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Delete, "/nope.txt", b""), peer())
        .await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 404);
    assert_eq!(body, b"File nope.txt not found");
}

#[tokio::test]
async fn test_delete_is_idempotent_404_not_500() {
    let (dispatcher, _s, storage_dir) = default_setup();
    std::fs::write(storage_dir.path().join("once.txt"), b"x").unwrap();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Delete, "/once.txt", b""), peer())
        .await;
    assert_eq!(http_status_and_body(&reply).0, 200);

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Delete, "/once.txt", b""), peer())
        .await;
    assert_eq!(http_status_and_body(&reply).0, 404);
}

#[tokio::test]
async fn test_delete_directory_is_400() {
    let (dispatcher, _s, storage_dir) = default_setup();
    std::fs::create_dir(storage_dir.path().join("subdir")).unwrap();

    let reply = dispatcher
        .dispatch(transfer(TransferMethod::Delete, "/subdir", b""), peer())
        .await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 400);
    assert_eq!(body, b"Cannot delete: Not a file");
}

#[tokio::test]
async fn test_rate_limit_rejects_101st_request() {
    let (dispatcher, _s, _t) = setup(Limits {
        max_requests: 100,
        window_secs: 60,
        idle_ttl_secs: 3600,
    });

    for _ in 0..100 {
        let reply = dispatcher
            .dispatch(
                Command::Chat {
                    text: "x".to_string(),
                },
                peer(),
            )
            .await;
        assert!(matches!(reply.body, ReplyBody::Raw(_)));
        assert!(!reply.close);
    }

    let reply = dispatcher
        .dispatch(
            Command::Chat {
                text: "x".to_string(),
            },
            peer(),
        )
        .await;
    let (status, body) = http_status_and_body(&reply);

    assert_eq!(status, 429);
    assert_eq!(body, b"Too Many Requests");
    assert!(reply.close);
}
