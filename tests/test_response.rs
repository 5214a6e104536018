use filedrop::protocol::response::{Reply, Response, ResponseBuilder, StatusCode};
use filedrop::protocol::writer::serialize_reply;

#[test]
fn test_status_codes_and_reasons() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    assert_eq!(StatusCode::RequestTimeout.as_u16(), 408);
    assert_eq!(StatusCode::TooManyRequests.as_u16(), 429);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);

    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::TooManyRequests.reason_phrase(), "Too Many Requests");
}

#[test]
fn test_status_line_envelope_layout() {
    let reply = Reply::http(Response::status_line(StatusCode::NotFound, "File x not found"));
    let bytes = serialize_reply(&reply);

    assert_eq!(
        bytes,
        b"HTTP/1.1 404 Not Found\r\n\
          Content-Type: text/plain\r\n\
          Content-Length: 16\r\n\
          Connection: close\r\n\
          \r\n\
          File x not found"
    );
}

#[test]
fn test_builder_preserves_header_order() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "application/octet-stream")
        .header("Content-Disposition", "attachment; filename=\"a.bin\"")
        .body(vec![1, 2, 3])
        .build();

    let keys: Vec<&str> = response.headers.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "Content-Type",
            "Content-Disposition",
            "Content-Length",
            "Connection"
        ]
    );
}

#[test]
fn test_builder_auto_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(b"hello".to_vec())
        .build();

    let cl = response
        .headers
        .iter()
        .find(|(k, _)| k == "Content-Length")
        .map(|(_, v)| v.as_str());
    assert_eq!(cl, Some("5"));
}

#[test]
fn test_raw_reply_serializes_verbatim() {
    let reply = Reply::raw("200 Server received: hi\r\n");
    assert_eq!(serialize_reply(&reply), b"200 Server received: hi\r\n");
}

#[test]
fn test_octet_stream_envelope_carries_body_bytes() {
    let body = vec![0u8, 159, 146, 150];
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "application/octet-stream")
        .body(body.clone())
        .build();
    let bytes = serialize_reply(&Reply::http(response));

    assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert!(bytes.ends_with(&body));
}
