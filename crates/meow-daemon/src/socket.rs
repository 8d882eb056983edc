use crate::core::DaemonEvent;
use meow_proto::protocol::{Message, Reply, Request};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

pub async fn bind(address: &str) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind TCP socket {}: {}", address, e))?;
    info!("TCP server listening at {}", address);
    Ok(listener)
}

pub fn start_server(
    listener: TcpListener,
    event_tx: mpsc::Sender<DaemonEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut client_id = 0usize;

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    client_id += 1;
                    let id = client_id;
                    info!("Client {} connected from {}", id, peer);

                    let evt_tx = event_tx.clone();
                    tokio::spawn(async move {
                        handle_client(stream, id, evt_tx).await;
                        info!("Client {} disconnected", id);
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    })
}

async fn handle_client(stream: TcpStream, client_id: usize, event_tx: mpsc::Sender<DaemonEvent>) {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut tmp = [0u8; 4096];
    let mut read_buf: Vec<u8> = Vec::new();

    loop {
        match read_half.read(&mut tmp).await {
            Ok(0) => break,
            Ok(n) => {
                read_buf.extend_from_slice(&tmp[..n]);

                loop {
                    let frame_len = match Message::frame_len(&read_buf) {
                        Ok(Some(len)) => len,
                        Ok(None) => break,
                        Err(e) => {
                            warn!("Client {}: {}, dropping connection", client_id, e);
                            return;
                        }
                    };
                    let frame: Vec<u8> = read_buf.drain(..frame_len).collect();

                    let reply = match Message::decode(&frame) {
                        Ok((Message::Request(request), _)) => {
                            info!("Client {} sent request: {:?}", client_id, request);
                            match forward(request, &event_tx).await {
                                Some(reply) => reply,
                                None => {
                                    warn!("DaemonEvent channel closed");
                                    return;
                                }
                            }
                        }
                        Ok((Message::Reply(reply), _)) => {
                            debug!("Client {} sent a reply frame, ignoring: {:?}", client_id, reply);
                            continue;
                        }
                        Err(e) => {
                            warn!("Client {} sent an invalid request: {}", client_id, e);
                            Reply::Error {
                                message: format!("invalid request: {}", e),
                            }
                        }
                    };

                    if !write_reply(&mut write_half, reply).await {
                        return;
                    }
                }
            }
            Err(e) => {
                error!("Read error from client {}: {}", client_id, e);
                break;
            }
        }
    }
}

/// Hand `request` to the core and wait for its reply.  `None` once the core
/// loop is gone.
async fn forward(request: Request, event_tx: &mpsc::Sender<DaemonEvent>) -> Option<Reply> {
    let (reply_tx, reply_rx) = oneshot::channel();
    event_tx
        .send(DaemonEvent::Request(request, reply_tx))
        .await
        .ok()?;
    Some(reply_rx.await.unwrap_or_else(|_| Reply::Error {
        message: "daemon is shutting down".to_string(),
    }))
}

/// `false` when the client can no longer be written to.
async fn write_reply(write_half: &mut OwnedWriteHalf, reply: Reply) -> bool {
    match Message::Reply(reply).encode() {
        Ok(encoded) => write_half.write_all(&encoded).await.is_ok(),
        Err(e) => {
            error!("Failed to encode reply: {}", e);
            true
        }
    }
}
