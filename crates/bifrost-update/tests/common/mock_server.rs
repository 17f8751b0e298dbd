//! Mock server helpers
//!
//! Serves a GitHub-style release listing plus release assets under
//! `/download/<name>`.

use bifrost_update::releases::Release;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use super::constants::*;

/// Serve `releases` as the listing for the test repository
pub async fn mock_releases(server: &MockServer, releases: &[Release]) {
    Mock::given(method("GET"))
        .and(path(RELEASES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(releases))
        .mount(server)
        .await;
}

/// Make the release listing fail with `status`
pub async fn mock_releases_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(RELEASES_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve `content` as the asset `name`
pub async fn mock_asset(server: &MockServer, name: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

/// Make the asset `name` fail with `status`
pub async fn mock_asset_status(server: &MockServer, name: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{}", name)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Checksum manifest with one `<hex> <name>` line per entry
pub fn manifest(entries: &[(&str, &str)]) -> String {
    entries
        .iter()
        .map(|(checksum, name)| format!("{}  {}\n", checksum, name))
        .collect()
}

/// Responder that deletes a file before failing the request
pub struct RemoveFileThenFail {
    pub file: PathBuf,
    pub status: u16,
}

impl Respond for RemoveFileThenFail {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let _ = std::fs::remove_file(&self.file);
        ResponseTemplate::new(self.status)
    }
}

/// Serve a single response whose `Content-Length` claims `claimed` bytes
/// while only `body` is sent. Returns the URL to request.
pub fn serve_claimed_length(claimed: u64, body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            claimed
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(body);
        let _ = stream.flush();
    });

    format!("http://{}/download/{}", addr, ASSET_NAME)
}
