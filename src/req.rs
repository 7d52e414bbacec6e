use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::constants::{MAX_BODY_BYTES, MAX_HEADER_BYTES};

#[derive(Debug, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
}

impl TryFrom<&str> for Method {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, anyhow::Error> {
        match value {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            _ => Err(anyhow::anyhow!("Method not supported")),
        }
    }
}

pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Request {
    /// Reads one HTTP/1.1 request: the head up to the blank line, then
    /// exactly `Content-Length` bytes of body.
    pub async fn new<Reader>(reader: Reader) -> Result<Self>
    where
        Reader: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut head = String::new();
        loop {
            // A line never reads past the header budget, newline or not.
            let budget = (MAX_HEADER_BYTES + 1 - head.len()) as u64;
            let mut line = String::new();
            let n = (&mut reader)
                .take(budget)
                .read_line(&mut line)
                .await
                .context("Failed to read head")?;
            if n == 0 || line == "\r\n" || line == "\n" {
                break;
            }
            head.push_str(&line);
            if head.len() > MAX_HEADER_BYTES {
                anyhow::bail!("Header too large");
            }
        }

        let mut request = Self::parse_head(&head)?;
        let length = match request.headers.get("content-length") {
            Some(value) => value.parse::<usize>().context("Invalid Content-Length")?,
            None => 0,
        };
        if length > MAX_BODY_BYTES {
            anyhow::bail!("Body too large");
        }
        let mut body = vec![0; length];
        reader
            .read_exact(&mut body)
            .await
            .context("Body shorter than Content-Length")?;
        request.body = String::from_utf8(body).context("Body is not UTF-8")?;
        Ok(request)
    }

    fn parse_head(head: &str) -> Result<Self> {
        // Method and path
        let mut head_line = head.lines();
        let first = head_line.next().context("Empty Request")?;
        let mut request_parts = first.split_whitespace();
        let method: Method = request_parts
            .next()
            .ok_or(anyhow::anyhow!("missing method"))
            .and_then(TryInto::try_into)
            .context("Missing Method")?;
        let target = request_parts.next().context("No Path")?;
        let path = target.split('?').next().unwrap_or(target);

        // Headers
        let mut headers = HashMap::new();
        for line in head_line {
            if let Some((k, v)) = line.split_once(':') {
                headers.insert(k.trim().to_lowercase(), v.trim().to_string());
            }
        }
        Ok(Request {
            method,
            path: path.into(),
            headers,
            body: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_body_by_content_length() {
        let raw = b"POST /deposit HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello trailing";
        let request = Request::new(&raw[..]).await.unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/deposit");
        assert_eq!(request.headers.get("host").map(String::as_str), Some("x"));
        assert_eq!(request.body, "hello");
    }

    #[tokio::test]
    async fn strips_query_string() {
        let raw = b"GET /balance/3?pretty=1 HTTP/1.1\r\n\r\n";
        let request = Request::new(&raw[..]).await.unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/balance/3");
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn rejects_unsupported_method() {
        let raw = b"DELETE /balance/3 HTTP/1.1\r\n\r\n";
        assert!(Request::new(&raw[..]).await.is_err());
    }

    #[tokio::test]
    async fn rejects_truncated_body() {
        let raw = b"POST /transfer HTTP/1.1\r\nContent-Length: 50\r\n\r\n{}";
        assert!(Request::new(&raw[..]).await.is_err());
    }

    #[tokio::test]
    async fn rejects_endless_header_line() {
        let endless = tokio::io::repeat(b'a');
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            Request::new(endless),
        )
        .await
        .expect("header read is unbounded");
        let err = result.err().unwrap();
        assert_eq!(err.to_string(), "Header too large");
    }

    #[tokio::test]
    async fn rejects_oversized_head() {
        let mut raw = b"GET /balance/1 HTTP/1.1\r\n".to_vec();
        for i in 0..1024 {
            raw.extend_from_slice(format!("X-Filler-{i}: 0123456789\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        assert!(Request::new(&raw[..]).await.is_err());
    }
}
