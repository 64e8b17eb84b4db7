// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! GitHub client tests against a local one-shot HTTP responder

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use dkpswitch::credentials::Token;
use dkpswitch::*;
use serde_json::json;

struct Reply {
    status: &'static str,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl Reply {
    fn bytes(body: Vec<u8>) -> Self {
        Self {
            status: "200 OK",
            headers: vec![("Content-Type", "application/octet-stream".to_string())],
            body,
        }
    }

    fn redirect(location: String) -> Self {
        Self {
            status: "302 Found",
            headers: vec![("Location", location)],
            body: Vec::new(),
        }
    }

    fn json(value: &serde_json::Value) -> Self {
        Self {
            status: "200 OK",
            headers: vec![("Content-Type", "application/json".to_string())],
            body: value.to_string().into_bytes(),
        }
    }
}

/// Answer one connection per reply, in order, recording each request head
fn serve(replies: Vec<Reply>) -> (String, Arc<Mutex<Vec<String>>>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    let handle = thread::spawn(move || {
        for reply in replies {
            let (mut stream, _) = listener.accept().unwrap();

            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            seen.lock()
                .unwrap()
                .push(String::from_utf8_lossy(&head).to_string());

            let mut response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                reply.status,
                reply.body.len()
            );
            for (name, value) in &reply.headers {
                response.push_str(&format!("{name}: {value}\r\n"));
            }
            response.push_str("\r\n");
            stream.write_all(response.as_bytes()).unwrap();
            stream.write_all(&reply.body).unwrap();
            stream.flush().unwrap();
        }
    });

    (base, requests, handle)
}

fn client(base: &str) -> GithubClient {
    GithubClient::with_base_url(base, Token::new("test-token").unwrap(), false)
}

fn release_json(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "tag_name": name,
        "prerelease": name.contains('-'),
        "published_at": "2022-03-01T12:00:00Z",
        "assets": [{
            "id": id * 10,
            "name": format!("dkp_{name}_linux_amd64.tar.gz"),
            "url": format!("https://api.github.com/repos/mesosphere/konvoy2/releases/assets/{}", id * 10),
            "browser_download_url": format!("https://github.com/mesosphere/konvoy2/releases/download/{name}/dkp_{name}_linux_amd64.tar.gz")
        }]
    })
}

#[test]
fn authenticate_reports_login_and_token_expiration() {
    let mut reply = Reply::json(&json!({ "login": "octocat", "id": 1 }));
    reply.headers.push((
        "github-authentication-token-expiration",
        "2026-12-31 00:00:00 UTC".to_string(),
    ));
    let (base, requests, handle) = serve(vec![reply]);

    let user = client(&base).authenticate().unwrap();
    handle.join().unwrap();

    assert_eq!(user.login, "octocat");
    assert_eq!(
        user.token_expiration.as_deref(),
        Some("2026-12-31 00:00:00 UTC")
    );

    let head = requests.lock().unwrap()[0].to_lowercase();
    assert!(head.starts_with("get /user "));
    assert!(head.contains("authorization: bearer test-token"));
}

#[test]
fn list_releases_follows_pagination() {
    let first_page: Vec<_> = (1..=100)
        .map(|i| release_json(i, &format!("v2.0.{i}")))
        .collect();
    let second_page = vec![release_json(101, "v2.1.0-rc1")];
    let (base, requests, handle) = serve(vec![
        Reply::json(&json!(first_page)),
        Reply::json(&json!(second_page)),
    ]);

    let releases = client(&base)
        .list_releases("mesosphere", "konvoy2")
        .unwrap();
    handle.join().unwrap();

    assert_eq!(releases.len(), 101);
    assert_eq!(releases[0].name(), "v2.0.1");
    assert_eq!(releases[0].assets.len(), 1);
    assert!(releases[100].prerelease);
    assert!(releases[0].published_at.is_some());

    let requests = requests.lock().unwrap();
    assert!(requests[0].contains("/repos/mesosphere/konvoy2/releases?per_page=100&page=1"));
    assert!(requests[1].contains("page=2"));
}

#[test]
fn list_product_releases_filters_prereleases() {
    let konvoy = vec![release_json(1, "v1.8.4"), release_json(2, "v1.8.5-beta")];
    let dkp = vec![release_json(3, "v2.1.1"), release_json(4, "v2.2.0-rc1")];
    let (base, requests, handle) =
        serve(vec![Reply::json(&json!(konvoy)), Reply::json(&json!(dkp))]);

    let releases = client(&base).list_product_releases(true).unwrap();
    handle.join().unwrap();

    let names: Vec<&str> = releases.iter().map(Release::name).collect();
    assert_eq!(names, vec!["v1.8.4", "v2.1.1"]);

    let requests = requests.lock().unwrap();
    assert!(requests[0].contains("/repos/mesosphere/konvoy/releases"));
    assert!(requests[1].contains("/repos/mesosphere/konvoy2/releases"));
}

#[test]
fn download_sends_octet_stream_and_bearer_token() {
    let payload = b"\x1f\x8b\x08fake archive bytes".to_vec();
    let (base, requests, handle) = serve(vec![Reply::bytes(payload.clone())]);

    let asset = Asset {
        id: 42,
        name: "dkp_v2.1.1_linux_amd64.tar.gz".to_string(),
        url: format!("{base}/repos/mesosphere/konvoy2/releases/assets/42"),
        browser_download_url: String::new(),
    };

    let mut out = Vec::new();
    let written = client(&base).download(&asset, &mut out).unwrap();
    handle.join().unwrap();

    assert_eq!(written, payload.len() as u64);
    assert_eq!(out, payload);

    let head = requests.lock().unwrap()[0].to_lowercase();
    assert!(head.contains("accept: application/octet-stream"));
    assert!(head.contains("authorization: bearer test-token"));
    assert!(head.contains("user-agent: dkpswitch/"));
}

#[test]
fn download_redirect_drops_the_token() {
    let payload = b"\x1f\x8b\x08signed archive bytes".to_vec();
    let (storage, storage_requests, storage_handle) = serve(vec![Reply::bytes(payload.clone())]);
    let (base, api_requests, api_handle) = serve(vec![Reply::redirect(format!(
        "{storage}/signed/42?X-Amz-Signature=abc"
    ))]);

    let asset = Asset {
        id: 42,
        name: "dkp_v2.1.1_linux_amd64.tar.gz".to_string(),
        url: format!("{base}/repos/mesosphere/konvoy2/releases/assets/42"),
        browser_download_url: String::new(),
    };

    let mut out = Vec::new();
    client(&base).download(&asset, &mut out).unwrap();
    api_handle.join().unwrap();
    storage_handle.join().unwrap();

    assert_eq!(out, payload);

    let api_head = api_requests.lock().unwrap()[0].to_lowercase();
    assert!(api_head.contains("authorization: bearer test-token"));

    let storage_head = storage_requests.lock().unwrap()[0].to_lowercase();
    assert!(storage_head.starts_with("get /signed/42?x-amz-signature=abc "));
    assert!(storage_head.contains("accept: application/octet-stream"));
    assert!(
        !storage_head.contains("authorization"),
        "token forwarded to redirect host: {storage_head}"
    );
}
