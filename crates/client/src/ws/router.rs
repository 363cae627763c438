//! Turns server frames into store mutations.
//!
//! Reducers here only touch the [`EntityStore`]. Anything that concerns the
//! connection itself (readiness, pong replies, the error banner) is handed
//! back to the manager as a [`RouteOutcome`].

use pulseboard_shared::{ProtocolError, ServerMessage};

use crate::stores::entities::AlertChange;
use crate::stores::EntityStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Store changed; nothing else to do.
    Applied,
    /// Bulk snapshot loaded: the connection is ready.
    Ready,
    /// Server reported an error to show to the user.
    ServerError(String),
    /// Heartbeat: reply with pong.
    Ping,
    /// Nothing changed.
    Ignored,
}

/// Parse and apply one text frame. Errors leave the store untouched.
pub fn route_frame(store: &mut EntityStore, text: &str) -> Result<RouteOutcome, ProtocolError> {
    let message = ServerMessage::parse(text)?;
    Ok(dispatch(store, message))
}

pub fn dispatch(store: &mut EntityStore, message: ServerMessage) -> RouteOutcome {
    match message {
        ServerMessage::InitialData(data) => {
            tracing::debug!(
                feeds = data.feeds.len(),
                alerts = data.alerts.len(),
                kpis = data.kpis.len(),
                "initial data received"
            );
            store.replace_initial(data);
            RouteOutcome::Ready
        }
        ServerMessage::FeedUpdate(patch) => {
            store.upsert_feed(patch);
            RouteOutcome::Applied
        }
        ServerMessage::KpiUpdate(update) => {
            store.merge_kpis(update);
            RouteOutcome::Applied
        }
        ServerMessage::AlertUpdate(update) => alert_outcome(store.upsert_alert(update)),
        ServerMessage::AlertStatusUpdate(change) => {
            let alert_id = change.alert_id.clone();
            let outcome = store.apply_alert_status(change);
            if outcome == AlertChange::Unknown {
                tracing::debug!(%alert_id, "status update for unknown alert");
            }
            alert_outcome(outcome)
        }
        ServerMessage::NodeCongestionUpdate(nodes) => {
            store.replace_nodes(nodes);
            RouteOutcome::Applied
        }
        ServerMessage::Error { message } => RouteOutcome::ServerError(message),
        ServerMessage::Ping => RouteOutcome::Ping,
        ServerMessage::Unknown { kind } => {
            tracing::info!(%kind, "ignoring unknown message type");
            RouteOutcome::Ignored
        }
    }
}

fn alert_outcome(change: AlertChange) -> RouteOutcome {
    match change {
        AlertChange::Unknown => RouteOutcome::Ignored,
        _ => RouteOutcome::Applied,
    }
}
