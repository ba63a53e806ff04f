//! A one-response HTTP server on localhost, for exercising the fetch step without network.

use reqwest::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Answers every request with `status` and `body`. Returns the server's base url.
pub(crate) async fn serve(status: &'static str, body: &'static [u8]) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = vec![0u8; 8192];
            let mut read = 0;
            loop {
                let n = socket.read(&mut request[read..]).await.unwrap_or(0);
                read += n;
                if n == 0 || request[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            // The client may hang up early, e.g. after an error status
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.shutdown().await;
        }
    });

    Url::parse(&format!("http://{addr}/")).unwrap()
}

pub(crate) fn local_client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}
