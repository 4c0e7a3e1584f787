use ideation_canvas::canvas::composite::encode_png;
use ideation_canvas::canvas::generate::{EncodedImage, GenerationRequest, COMPOSITE_FILE_NAME};
use ideation_canvas::canvas::ingest::SourceFile;
use ideation_canvas::canvas::messages::GenerationEvent;
use ideation_canvas::canvas::{
    BackendError, GenerationBackend, HttpBackend, IdeationSession, SessionConfig,
};
use image::{Rgba, RgbaImage};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one HTTP request, body included.
fn read_request(stream: &mut impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(header_end) = find(&buf, b"\r\n\r\n").map(|i| i + 4) else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());
        match length {
            Some(len) if buf.len() >= header_end + len => return buf,
            Some(_) => {}
            None if head.contains("transfer-encoding: chunked") => {
                if buf.ends_with(b"0\r\n\r\n") {
                    return buf;
                }
            }
            None => return buf,
        }
    }
}

fn response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Serve a single canned response; the handle yields the raw request.
fn serve_once(reply: Vec<u8>) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let request = read_request(&mut stream);
        stream.write_all(&reply).unwrap();
        let _ = stream.flush();
        request
    });
    (format!("http://{addr}/api/generate-image"), handle)
}

fn png(w: u32, h: u32, shade: u8) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(w, h, Rgba([shade, 40, 90, 255]))).unwrap()
}

fn request_with_one_reference() -> GenerationRequest {
    let reference = EncodedImage {
        file_name: "fabric.jpg".into(),
        mime: "image/jpeg".into(),
        bytes: png(4, 4, 3).into(),
    };
    GenerationRequest::new(
        "  a red hat  ",
        Some(EncodedImage::png(COMPOSITE_FILE_NAME, png(8, 8, 200))),
        vec![reference],
    )
    .unwrap()
}

#[test]
fn posts_multipart_fields_and_returns_image() {
    let (url, server) = serve_once(response("200 OK", "image/png", &png(12, 6, 9)));
    let backend = HttpBackend::new(&url, TIMEOUT).unwrap();

    let generated = backend.generate(&request_with_one_reference()).unwrap();
    assert_eq!(generated.mime, "image/png");
    assert_eq!(generated.decode().unwrap().dimensions(), (12, 6));

    let raw = server.join().unwrap();
    let text = String::from_utf8_lossy(&raw);
    assert!(text.starts_with("POST /api/generate-image"));
    assert!(text.to_ascii_lowercase().contains("content-type: multipart/form-data"));
    assert!(text.contains("name=\"prompt\"\r\n\r\na red hat\r\n"));
    assert!(text.contains("name=\"image\"; filename=\"composite.png\""));
    assert!(text.contains("name=\"refs\"; filename=\"fabric.jpg\""));
    assert!(text.contains("image/jpeg"));
}

#[test]
fn error_json_becomes_status_error() {
    let body = br#"{"error":"No image returned"}"#;
    let (url, server) = serve_once(response("502 Bad Gateway", "application/json", body));
    let backend = HttpBackend::new(&url, TIMEOUT).unwrap();

    let err = backend.generate(&request_with_one_reference()).unwrap_err();
    assert_eq!(
        err,
        BackendError::Status {
            status: 502,
            message: "No image returned".into()
        }
    );
    server.join().unwrap();
}

#[test]
fn json_success_body_is_malformed() {
    let (url, server) = serve_once(response("200 OK", "application/json", br#"{"ok":true}"#));
    let backend = HttpBackend::new(&url, TIMEOUT).unwrap();

    let err = backend.generate(&request_with_one_reference()).unwrap_err();
    assert!(matches!(err, BackendError::MalformedImage(_)));
    server.join().unwrap();
}

#[test]
fn unreachable_service_is_transport_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let backend = HttpBackend::new(&format!("http://{addr}/"), Duration::from_secs(2)).unwrap();
    let err = backend.generate(&request_with_one_reference()).unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}

#[test]
fn non_http_endpoints_are_rejected() {
    assert!(matches!(
        HttpBackend::new("ftp://example.com/gen", TIMEOUT),
        Err(BackendError::InvalidEndpoint(_))
    ));
    assert!(matches!(
        HttpBackend::new("not a url", TIMEOUT),
        Err(BackendError::InvalidEndpoint(_))
    ));
}

#[test]
fn session_applies_http_result_at_base_size() {
    // 30x20 base with the default border yields a 350x340 frame; reply smaller.
    let (url, server) = serve_once(response("200 OK", "image/png", &png(175, 170, 77)));
    let backend = HttpBackend::new(&url, TIMEOUT).unwrap();
    let mut session = IdeationSession::new(SessionConfig::default(), Arc::new(backend));
    session
        .import_photo(SourceFile::new("photo.png", "image/png", png(30, 20, 1)))
        .unwrap();
    session.add_references(vec![SourceFile::new("ref.png", "image/png", png(5, 5, 2))]);
    session.set_prompt("swap the colours");
    session.submit_generation().unwrap();

    let event = session.wait_for_generation(TIMEOUT).unwrap();
    assert!(matches!(event, GenerationEvent::Applied { version_count: 2, .. }));
    let base = session.surface().base().unwrap();
    assert_eq!(base.dimensions(), (30, 20));
    assert_eq!(base.pixels().get_pixel(10, 10), &Rgba([77, 40, 90, 255]));

    let raw = server.join().unwrap();
    let text = String::from_utf8_lossy(&raw);
    assert!(text.contains("name=\"refs\"; filename=\"ref.png\""));
}
