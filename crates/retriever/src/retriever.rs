use std::{sync::Arc, time::Duration};

use futures::{stream::SplitSink, SinkExt, StreamExt};
use mediator_core::{AppState, CoreError, CoreResult};
use tokio::{
    net::TcpStream,
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};

use crate::endpoint;

type WsWrite = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// A running retriever session: the websocket reader task and the
/// trust-ping poller task, plus the signal that stops both.
pub struct RetrieverHandle {
    shutdown: watch::Sender<bool>,
    ws_task: JoinHandle<()>,
    poll_task: JoinHandle<()>,
}

impl RetrieverHandle {
    /// Signals both tasks to stop and awaits their termination, swallowing
    /// the join errors a cancelled task produces.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.ws_task.await;
        let _ = self.poll_task.await;
    }
}

/// Opens a websocket session to `mediator_verkey`'s connection and starts
/// the reader and keepalive-poller tasks. The connection must already carry
/// a DID document naming a `ws`/`wss` service endpoint.
pub async fn start(app: Arc<AppState>, mediator_verkey: String, poll_interval: Duration) -> CoreResult<RetrieverHandle> {
    let doc = app
        .registry
        .get_and(&mediator_verkey, |c| c.diddoc.clone())
        .await
        .flatten()
        .ok_or_else(|| CoreError::Transport("mediator connection has no DID document".into()))?;
    let ws_endpoint = endpoint::ws_endpoint(&doc)
        .ok_or_else(|| CoreError::Transport("mediator connection has no websocket endpoint".into()))?;

    debug!(endpoint = %ws_endpoint, "opening retriever websocket");
    let (stream, _) = connect_async(&ws_endpoint)
        .await
        .map_err(|e| CoreError::Transport(format!("websocket connect failed: {e}")))?;
    let (write, read) = stream.split();
    let write = Arc::new(Mutex::new(write));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ws_task = tokio::spawn(read_loop(app.clone(), write.clone(), read, shutdown_rx.clone()));
    let poll_task = tokio::spawn(poll_loop(app, mediator_verkey, write, poll_interval, shutdown_rx));

    Ok(RetrieverHandle {
        shutdown: shutdown_tx,
        ws_task,
        poll_task,
    })
}

async fn read_loop(
    app: Arc<AppState>,
    write: Arc<Mutex<WsWrite>>,
    mut read: futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(WsMessage::Binary(data))) => {
                        match app.handle_message(&data).await {
                            Ok(Some(reply)) => {
                                if let Err(e) = write.lock().await.send(WsMessage::Binary(reply)).await {
                                    error!(error = %e, "failed to send reply over retriever websocket");
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!(error = %e, "failed to handle retrieved message"),
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "retriever websocket error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }
}

async fn poll_loop(
    app: Arc<AppState>,
    mediator_verkey: String,
    write: Arc<Mutex<WsWrite>>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let ping = serde_json::json!({
        "@type": "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/trust_ping/1.0/ping",
        "response_requested": false,
        "~transport": { "return_route": "all" },
    });

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(poll_interval) => {
                let packed = app.registry.get_and(&mediator_verkey, |c| c.pack(&ping)).await;
                match packed {
                    Some(Ok(bytes)) => {
                        if let Err(e) = write.lock().await.send(WsMessage::Binary(bytes)).await {
                            error!(error = %e, "failed to send keepalive ping");
                            break;
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "failed to pack keepalive ping"),
                    None => {
                        warn!("mediator connection vanished; stopping poller");
                        break;
                    }
                }
            }
        }
    }
}
