const BOUNDARY: &str = "gridsight-multipart-boundary";

/// Build a single-file `multipart/form-data` body.
///
/// `ureq` has no multipart support, so the body is assembled as a byte
/// buffer with a fixed boundary. Returns `(body, content_type)`.
pub fn build_file_body(field: &str, file_name: &str, content: &[u8]) -> (Vec<u8>, String) {
    let mut body = Vec::with_capacity(content.len() + 256);
    let header = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        escape_quotes(file_name),
        guess_content_type(file_name),
    );
    body.extend_from_slice(header.as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
    (body, content_type)
}

fn escape_quotes(name: &str) -> String {
    name.replace('"', "%22")
}

fn guess_content_type(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".csv") {
        "text/csv"
    } else {
        "application/octet-stream"
    }
}
