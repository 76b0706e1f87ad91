use reqwest::Url;
use tracing::debug;

use crate::errors::{IntensifierError, Result};
use crate::traits::ImageFetcher;

/// Blocking HTTP fetcher. No retry and no timeout: a request runs until it
/// completes or the connection fails.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_builder(reqwest::blocking::Client::builder())
    }

    /// Finishes `builder` with the fetcher's user agent and no total timeout.
    pub fn with_builder(builder: reqwest::blocking::ClientBuilder) -> Result<Self> {
        let client = builder
            .user_agent(concat!("intensifier/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()
            .map_err(|e| IntensifierError::Fetch {
                url: String::new(),
                source: Box::new(e),
            })?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let to_error = |e: reqwest::Error| IntensifierError::Fetch {
            url: url.to_string(),
            source: Box::new(e),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(to_error)?;
        debug!(status = %response.status(), "response received");

        let body = response.bytes().map_err(to_error)?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    /// Accepts one connection and reads its request head.
    fn accept_request(listener: &TcpListener) -> TcpStream {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
            line.clear();
        }
        stream
    }

    fn local_fetcher() -> Result<HttpFetcher> {
        HttpFetcher::with_builder(reqwest::blocking::Client::builder().no_proxy())
    }

    /// Serves one response whose body stalls halfway for `stall`.
    fn serve_slowly(body: &'static [u8], stall: Duration) -> (Url, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("http://{}/image.png", listener.local_addr().unwrap())).unwrap();

        let handle = thread::spawn(move || {
            let mut stream = accept_request(&listener);

            let (head, tail) = body.split_at(body.len() / 2);
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(head).unwrap();
            stream.flush().unwrap();
            thread::sleep(stall);
            stream.write_all(tail).unwrap();
            stream.flush().unwrap();
        });
        (url, handle)
    }

    #[test]
    fn test_slow_body_is_not_cut_off() -> Result<()> {
        // longer than reqwest's 30 s default total timeout
        let (url, server) = serve_slowly(b"0123456789abcdef", Duration::from_secs(31));

        let body = local_fetcher()?.fetch(&url)?;
        assert_eq!(body, b"0123456789abcdef");
        server.join().unwrap();
        Ok(())
    }

    #[test]
    fn test_error_status_is_a_fetch_error() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("http://{}/missing.png", listener.local_addr().unwrap())).unwrap();
        let server = thread::spawn(move || {
            let mut stream = accept_request(&listener);
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
        });

        let err = local_fetcher()?.fetch(&url).unwrap_err();
        assert!(matches!(err, IntensifierError::Fetch { .. }));
        server.join().unwrap();
        Ok(())
    }
}
