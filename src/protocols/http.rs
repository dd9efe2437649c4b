//! HTTP emulation.
//!
//! Normal mode answers once with a canned status page and closes. Tarpit mode
//! answers 200 with a large page sent one byte at a time.

use std::fmt::Write as _;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::session::{MockConfig, SessionEnd};
use crate::timing::{drip_write, RandomSource};
use crate::wire::{Peer, TransportResult};

/// How long to wait for the request before answering anyway.
const REQUEST_DRAIN_DEADLINE: Duration = Duration::from_millis(500);

/// Per-byte interval for tarpit responses when none is configured.
const TARPIT_INTERVAL_MS: u64 = 500;

const FAKE_PAGE_SECTIONS: usize = 100;
const FAKE_PAGE_LINES_PER_SECTION: usize = 10;

pub(crate) fn handler<'a>(
    peer: &'a mut Peer,
    config: &'a MockConfig,
) -> BoxFuture<'a, TransportResult<SessionEnd>> {
    Box::pin(serve(peer, config))
}

pub async fn serve(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    peer.drain(REQUEST_DRAIN_DEADLINE).await;

    if config.tarpit {
        return serve_tarpit(peer, config).await;
    }

    let status = Status::from_code(config.status_code);
    let body = config
        .payload()
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| status.default_body().as_bytes().to_vec());

    peer.send(response_head(status, body.len(), &http_date()).as_bytes())
        .await?;
    peer.send(&body).await?;
    Ok(SessionEnd::Completed)
}

async fn serve_tarpit(peer: &mut Peer, config: &MockConfig) -> TransportResult<SessionEnd> {
    let interval = match config.drip_interval_ms {
        0 => TARPIT_INTERVAL_MS,
        ms => ms,
    };
    let body = config
        .payload()
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| fake_page(&config.rng));

    let head = tarpit_head(body.len(), &http_date());
    drip_write(peer, head.as_bytes(), interval).await?;
    drip_write(peer, &body, interval.saturating_mul(2)).await?;
    Ok(SessionEnd::Completed)
}

/// Status lines the normal mode can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl Status {
    /// Unrecognized codes answer 200.
    pub fn from_code(code: u16) -> Self {
        match code {
            401 => Status::Unauthorized,
            403 => Status::Forbidden,
            404 => Status::NotFound,
            500 => Status::InternalServerError,
            _ => Status::Ok,
        }
    }

    pub fn line(&self) -> &'static str {
        match self {
            Status::Ok => "HTTP/1.1 200 OK",
            Status::Unauthorized => "HTTP/1.1 401 Unauthorized",
            Status::Forbidden => "HTTP/1.1 403 Forbidden",
            Status::NotFound => "HTTP/1.1 404 Not Found",
            Status::InternalServerError => "HTTP/1.1 500 Internal Server Error",
        }
    }

    pub fn default_body(&self) -> &'static str {
        match self {
            Status::Ok => "<html><body><h1>It works!</h1></body></html>",
            Status::Unauthorized => "<html><body><h1>401 Unauthorized</h1></body></html>",
            Status::Forbidden => "<html><body><h1>403 Forbidden</h1></body></html>",
            Status::NotFound => "<html><body><h1>404 Not Found</h1></body></html>",
            Status::InternalServerError => {
                "<html><body><h1>500 Internal Server Error</h1></body></html>"
            }
        }
    }
}

/// RFC 1123 date in GMT, as HTTP servers send it.
fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Status line and headers, terminated by the blank line.
pub fn response_head(status: Status, content_length: usize, date: &str) -> String {
    let mut head = String::with_capacity(256);
    head.push_str(status.line());
    head.push_str("\r\n");
    head.push_str("Content-Type: text/html\r\n");
    let _ = write!(head, "Content-Length: {}\r\n", content_length);
    head.push_str("Server: nginx\r\n");
    let _ = write!(head, "Date: {}\r\n", date);
    head.push_str("Connection: close\r\n");
    if status == Status::Unauthorized {
        head.push_str("WWW-Authenticate: Basic realm=\"Restricted\"\r\n");
    }
    head.push_str("\r\n");
    head
}

fn tarpit_head(content_length: usize, date: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Server: Apache/2.4.41 (Ubuntu)\r\n\
         Date: {}\r\n\
         Connection: keep-alive\r\n\
         X-Powered-By: PHP/7.4.3\r\n\
         \r\n",
        content_length, date
    )
}

/// A large page of hidden noise that reloads itself.
fn fake_page(rng: &RandomSource) -> Vec<u8> {
    let mut page = String::with_capacity(128 * 1024);
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    page.push_str("<title>Welcome</title>\n");
    page.push_str("<meta charset=\"utf-8\">\n");
    page.push_str("</head>\n<body>\n");
    page.push_str("<h1>Loading...</h1>\n");

    for _ in 0..FAKE_PAGE_SECTIONS {
        let _ = writeln!(page, "<!-- cache-id: {:032x} -->", rng.next_u64());
        page.push_str("<div style=\"display:none\">\n");
        for _ in 0..FAKE_PAGE_LINES_PER_SECTION {
            let _ = writeln!(page, "<p>{:064x}</p>", rng.next_u64());
        }
        page.push_str("</div>\n");
    }

    page.push_str("<script>setTimeout(function(){location.reload()},30000);</script>\n");
    page.push_str("</body>\n</html>");
    page.into_bytes()
}
