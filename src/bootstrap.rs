use std::{sync::Arc, time::Duration};

use mediator_core::{AppState, CoreError, CoreResult};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::persistence::Persistence;

/// Coordinates the one-time setup sequence shared by both distinguished
/// connections: the HTTP server is already accepting admin requests while
/// this runs, so `receive_mediator_invitation` may supply the upstream
/// invite concurrently with this task waiting for it.
pub struct Bootstrap {
    pub app: Arc<AppState>,
    agent_invitation: Mutex<Option<String>>,
    mediator_invite_tx: watch::Sender<Option<String>>,
    retriever: Mutex<Option<retriever::RetrieverHandle>>,
}

impl Bootstrap {
    pub fn new(app: Arc<AppState>) -> (Arc<Self>, watch::Receiver<Option<String>>) {
        let (tx, rx) = watch::channel(None);
        (
            Arc::new(Self {
                app,
                agent_invitation: Mutex::new(None),
                mediator_invite_tx: tx,
                retriever: Mutex::new(None),
            }),
            rx,
        )
    }

    pub async fn agent_invitation_url(&self) -> Option<String> {
        self.agent_invitation.lock().await.clone()
    }

    /// Called by the `/receive_mediator_invitation` admin route. A no-op if
    /// the upstream connection is already established.
    pub fn submit_mediator_invitation(&self, url: String) {
        let _ = self.mediator_invite_tx.send(Some(url));
    }

    async fn park_retriever(&self, handle: retriever::RetrieverHandle) {
        *self.retriever.lock().await = Some(handle);
    }

    /// Stops the retriever, if one has started, swallowing its task join
    /// errors the way a cancelled task's result is swallowed everywhere
    /// else in this shutdown path.
    pub async fn stop_retriever(&self) {
        if let Some(handle) = self.retriever.lock().await.take() {
            handle.stop().await;
        }
    }
}

/// Dispatches an invitation URL to the legacy or OOB/DID-exchange module by
/// its query parameter, exactly as the teacher's invite-handling closure
/// does for both the bootstrap mediator connection and any ad-hoc admin
/// submission.
async fn receive_invitation(app: &Arc<AppState>, url: &str, label: &str) -> CoreResult<String> {
    if url.contains("c_i=") {
        connections_legacy::receive_invitation(app, url, label).await
    } else if url.contains("oob=") {
        oob_didexchange::receive_invitation(app, url, label).await
    } else {
        Err(CoreError::InvalidEnvelope("invitation url has neither c_i nor oob parameter".into()))
    }
}

async fn await_completion(app: &Arc<AppState>, verkey: &str) -> CoreResult<()> {
    let mut rx = app
        .registry
        .get_and(verkey, |c| c.completion_receiver())
        .await
        .ok_or(CoreError::ConnectionNotFound)?;
    if !*rx.borrow() {
        let _ = rx.changed().await;
    }
    Ok(())
}

/// Runs the full bootstrap sequence: establish (or recall) the upstream
/// mediator connection and request mediation from it, then establish (or
/// recall) the downstream agent connection, persist both, and finally start
/// the retriever against the mediator connection.
pub async fn run(
    bootstrap: Arc<Bootstrap>,
    mut mediator_invite_rx: watch::Receiver<Option<String>>,
    config_invite: Option<String>,
    poll_interval: Duration,
    persistence: Option<Arc<Persistence>>,
) -> CoreResult<()> {
    let app = bootstrap.app.clone();

    let mediator_verkey = match app.registry.mediator_connection_verkey().await {
        Some(verkey) => {
            info!("mediator connection recalled from store");
            verkey
        }
        None => {
            let url = if let Some(invite) = config_invite {
                info!("receiving mediator invitation from configuration");
                invite
            } else {
                info!("awaiting mediator invitation over HTTP");
                loop {
                    if let Some(url) = mediator_invite_rx.borrow().clone() {
                        break url;
                    }
                    if mediator_invite_rx.changed().await.is_err() {
                        return Err(CoreError::Transport("mediator invitation channel closed".into()));
                    }
                }
            };

            let verkey = receive_invitation(&app, &url, "proxy-mediator").await?;
            app.registry.set_mediator_connection(verkey.clone()).await;
            await_completion(&app, &verkey).await?;

            mediator_coordination::request_mediation_from_external(&app, &verkey).await?;
            mediator_coordination::send_keylist_update(&app, &verkey, "add", &verkey).await?;
            info!("mediation established with upstream mediator");
            verkey
        }
    };

    let agent_verkey = match app.registry.agent_connection_verkey().await {
        Some(verkey) => {
            info!("agent connection recalled from store");
            verkey
        }
        None => {
            let (verkey, url) = oob_didexchange::create_invitation(&app, "proxy-mediator").await?;
            *bootstrap.agent_invitation.lock().await = Some(url.clone());
            info!(invitation_url = %url, "awaiting agent connection");
            await_completion(&app, &verkey).await?;
            app.registry.set_agent_connection(verkey.clone()).await;
            verkey
        }
    };

    if let Some(persistence) = &persistence {
        if let Err(e) = persistence.save(&app.registry).await {
            warn!(error = %e, "failed to persist connections after bootstrap");
        }
    }

    info!(%mediator_verkey, %agent_verkey, "bootstrap complete, starting retriever");
    let handle = retriever::start(app.clone(), mediator_verkey, poll_interval).await?;

    // The retriever keeps running for the process lifetime; dropping the
    // handle without calling `stop` would abort its tasks, so it is parked
    // in the bootstrap task's storage until shutdown drives it explicitly.
    bootstrap.park_retriever(handle).await;
    Ok(())
}
