use std::sync::Arc;

use mediator_core::{AppState, CoreError, CoreResult};
use serde_json::json;

const MEDIATE_REQUEST_TYPE: &str = "https://didcomm.org/coordinate-mediation/1.0/mediate-request";
const KEYLIST_UPDATE_TYPE: &str = "https://didcomm.org/coordinate-mediation/1.0/keylist-update";

/// Requests mediation from the upstream cloud mediator reachable through
/// `verkey`, and awaits its grant. Fails with `RequestAlreadyPending` if a
/// request to any upstream is already in flight.
pub async fn request_mediation_from_external(app: &Arc<AppState>, verkey: &str) -> CoreResult<()> {
    let tx = app.mediation.begin_request().await?;
    let mut rx = tx.subscribe();

    let request = json!({ "@type": MEDIATE_REQUEST_TYPE });
    let reply = app
        .registry
        .with_connection(verkey, |c| c.send_async(&request, Some("all")))
        .await
        .ok_or(CoreError::ConnectionNotFound)??;

    // A return-route peer over plain HTTP writes its `mediate-grant` into
    // the POST response body rather than opening a websocket back to us;
    // dispatch it the same way the retriever dispatches an inbound frame.
    if let Some(packed) = reply {
        app.handle_message(&packed).await?;
    }

    let _ = rx.changed().await;
    Ok(())
}

/// Tells the upstream mediator to `add` or `remove` `recipient_key` from its
/// keylist for this connection.
pub async fn send_keylist_update(app: &Arc<AppState>, verkey: &str, action: &str, recipient_key: &str) -> CoreResult<()> {
    let update = json!({
        "@type": KEYLIST_UPDATE_TYPE,
        "updates": [{ "recipient_key": recipient_key, "action": action }],
    });
    let reply = app
        .registry
        .with_connection(verkey, |c| c.send_async(&update, Some("all")))
        .await
        .ok_or(CoreError::ConnectionNotFound)??;

    if let Some(packed) = reply {
        app.handle_message(&packed).await?;
    }
    Ok(())
}
