//! Canned HTTP server for client tests

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

/// A request the stub server received
#[derive(Debug, Clone)]
pub struct Captured {
  pub method: String,
  pub path: String,
  pub authorization: Option<String>,
  pub body: Vec<u8>,
}

/// Serves one canned response per request, chosen by `route(method, path)`
pub struct StubServer {
  pub url: String,
  requests: Arc<Mutex<Vec<Captured>>>,
  _handle: std::thread::JoinHandle<()>,
}

impl StubServer {
  pub fn start<F>(route: F) -> Self
  where
    F: Fn(&str, &str) -> (u16, String) + Send + 'static,
  {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let requests: Arc<Mutex<Vec<Captured>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&requests);

    let handle = std::thread::spawn(move || {
      for stream in listener.incoming() {
        let Ok(mut stream) = stream else { break };
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        if reader.read_line(&mut request_line).is_err() {
          continue;
        }
        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
        if parts.len() < 2 {
          continue;
        }
        let method = parts[0].to_string();
        let path = parts[1].to_string();

        let mut content_length = 0usize;
        let mut authorization = None;
        loop {
          let mut line = String::new();
          if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
            break;
          }
          if let Some((key, value)) = line.trim().split_once(": ") {
            match key.to_lowercase().as_str() {
              "content-length" => content_length = value.trim().parse().unwrap_or(0),
              "authorization" => authorization = Some(value.to_string()),
              _ => {}
            }
          }
        }

        let mut body = vec![0u8; content_length];
        if content_length > 0 {
          let _ = reader.read_exact(&mut body);
        }

        let (status, response) = route(&method, &path);
        captured.lock().unwrap().push(Captured {
          method,
          path,
          authorization,
          body,
        });

        let head = format!(
          "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
          status,
          response.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
      }
    });

    Self {
      url,
      requests,
      _handle: handle,
    }
  }

  pub fn requests(&self) -> Vec<Captured> {
    self.requests.lock().unwrap().clone()
  }
}
