use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::{Message, Reply, Request};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// One request/reply connection to a running daemon.
pub struct DaemonConnection {
    stream: TcpStream,
    read_buffer: Vec<u8>,
}

impl DaemonConnection {
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address))
            .await
            .map_err(|_| anyhow::anyhow!("timed out connecting to daemon at {}", address))??;
        Ok(Self {
            stream,
            read_buffer: Vec::with_capacity(4096),
        })
    }

    pub async fn send_request(&mut self, request: Request) -> anyhow::Result<()> {
        let encoded = Message::Request(request).encode()?;
        self.stream.write_all(&encoded).await?;
        Ok(())
    }

    /// Next reply frame.  `None` when the daemon closed the connection; an
    /// error for a frame that is oversized or does not decode.
    pub async fn receive_reply(&mut self) -> anyhow::Result<Option<Reply>> {
        let mut buf = [0u8; 4096];
        loop {
            while let Some(frame_len) = Message::frame_len(&self.read_buffer)? {
                let frame: Vec<u8> = self.read_buffer.drain(..frame_len).collect();
                match Message::decode(&frame).context("invalid frame from daemon")?.0 {
                    Message::Reply(reply) => return Ok(Some(reply)),
                    Message::Request(_) => {}
                }
            }

            match self.stream.read(&mut buf).await {
                Ok(0) => return Ok(None),
                Ok(n) => self.read_buffer.extend_from_slice(&buf[..n]),
                Err(e) => return Err(anyhow::anyhow!("Read error: {}", e)),
            }
        }
    }

    pub async fn request(&mut self, request: Request) -> anyhow::Result<Reply> {
        self.send_request(request).await?;
        self.receive_reply()
            .await?
            .ok_or_else(|| anyhow::anyhow!("daemon closed the connection"))
    }
}

/// Connect, send one request, wait for the reply.
pub async fn send_once(address: &str, request: Request) -> anyhow::Result<Reply> {
    let mut conn = DaemonConnection::connect(address).await?;
    conn.request(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_request_reply_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let mut data = Vec::new();
            let request = loop {
                let n = stream.read(&mut buf).await.unwrap();
                data.extend_from_slice(&buf[..n]);
                if let Ok((msg, _)) = Message::decode(&data) {
                    break msg;
                }
            };
            let message = format!("{:?}", request);
            let reply = Message::Reply(Reply::Error { message }).encode().unwrap();
            // split the frame to exercise reassembly
            stream.write_all(&reply[..3]).await.unwrap();
            stream.flush().await.unwrap();
            stream.write_all(&reply[3..]).await.unwrap();
        });

        let reply = send_once(&addr, Request::Reschedule).await.unwrap();
        match reply {
            Reply::Error { message } => assert!(message.contains("Reschedule")),
            other => panic!("Wrong reply: {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_reply_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let body = b"not json";
            let mut frame = (body.len() as u32).to_be_bytes().to_vec();
            frame.extend_from_slice(body);
            stream.write_all(&frame).await.unwrap();
            // keep the connection open so only the bad frame can end the wait
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result = tokio::time::timeout(Duration::from_secs(2), send_once(&addr, Request::GetStatus))
            .await
            .expect("bad frame ends the wait");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_closed_connection_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });
        assert!(send_once(&addr, Request::GetStatus).await.is_err());
    }
}
