use crate::account::session::SessionStore;
use crate::auth::bearer_token;
use crate::error::ApiError;
use crate::realtime::hub::RealtimeHub;
use actix_web::{get, web, HttpRequest, HttpResponse};
use actix_ws::Message;
use futures_util::StreamExt;
use log::{debug, info, warn};
use serde::Deserialize;
use shared::models::event::{EventRow, EventVenueRow};
use shared::realtime::{
    dashboard_channel, ChangeFeedMessage, EventSubscriptionHandlers, ServerFrame, StatusFrame,
    VenueSubscriptionHandlers,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Deserialize)]
pub struct RealtimeParams {
    pub token: Option<String>,
}

/// Frames buffered per socket before the client counts as lagging.
pub const SOCKET_BUFFER: usize = 64;

/// Turns handler callbacks back into frames for one socket.
#[derive(Clone)]
struct SocketForwarder {
    user_id: String,
    channel: String,
    frames: mpsc::Sender<ServerFrame>,
    status: mpsc::Sender<StatusFrame>,
    lagged: Arc<AtomicBool>,
}

impl SocketForwarder {
    fn new(
        user_id: &str,
        channel: &str,
        frames: mpsc::Sender<ServerFrame>,
        status: mpsc::Sender<StatusFrame>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            channel: channel.to_string(),
            frames,
            status,
            lagged: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reports a channel error once; later frames are dropped.
    fn channel_error(&self) {
        if self.lagged.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.status.try_send(StatusFrame::ChannelError {
            channel: self.channel.clone(),
        });
    }

    fn send(&self, message: ChangeFeedMessage) {
        if self.lagged.load(Ordering::SeqCst) {
            return;
        }
        match self.frames.try_send(ServerFrame::Change(message)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Realtime client lagging: channel={} user_id={} buffer={}",
                    self.channel, self.user_id, SOCKET_BUFFER
                );
                self.channel_error();
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

impl EventSubscriptionHandlers for SocketForwarder {
    fn on_insert(&mut self, row: EventRow) {
        self.send(ChangeFeedMessage::event_inserted(row));
    }

    fn on_update(&mut self, row: EventRow) {
        self.send(ChangeFeedMessage::event_updated(row));
    }

    fn on_delete(&mut self, event_id: String) {
        self.send(ChangeFeedMessage::event_deleted(event_id, self.user_id.clone()));
    }
}

impl VenueSubscriptionHandlers for SocketForwarder {
    fn on_insert(&mut self, row: EventVenueRow) {
        self.send(ChangeFeedMessage::venue_inserted(row));
    }

    fn on_delete(&mut self, row: EventVenueRow) {
        self.send(ChangeFeedMessage::venue_deleted(&row));
    }

    fn on_update(&mut self, new: EventVenueRow, old: EventVenueRow) {
        self.send(ChangeFeedMessage::venue_updated(new, &old));
    }
}

/// Streams the caller's dashboard changes over a websocket. The session
/// comes from the Bearer header or, for browsers, the `token` parameter.
#[get("/api/realtime")]
pub async fn realtime_handler(
    req: HttpRequest,
    body: web::Payload,
    params: web::Query<RealtimeParams>,
    sessions: web::Data<dyn SessionStore>,
    hub: web::Data<RealtimeHub>,
) -> Result<HttpResponse, ApiError> {
    let Some(session_id) = bearer_token(req.headers()).or_else(|| params.into_inner().token) else {
        return Err(ApiError::unauthorized("Authentication required"));
    };
    let user = match sessions.get_session(&session_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ApiError::unauthorized("Invalid or expired session")),
        Err(e) => {
            warn!("Session lookup failed for realtime connection: {}", e);
            return Err(ApiError::unauthorized("Invalid or expired session"));
        }
    };

    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, body).map_err(|e| {
        warn!("Websocket handshake failed: {}", e);
        ApiError::bad_request("Websocket handshake failed")
    })?;

    let channel = dashboard_channel(&user.id);
    let (frames_tx, mut frames_rx) = mpsc::channel(SOCKET_BUFFER);
    let (status_tx, mut status_rx) = mpsc::channel(1);
    let forwarder = SocketForwarder::new(&user.id, &channel, frames_tx, status_tx);
    let on_lag = forwarder.clone();
    let mut subscription = hub.subscribe_to_both(
        &channel,
        &user.id,
        forwarder.clone(),
        forwarder,
        Some(Box::new(move |_status| on_lag.channel_error())),
    );
    info!("Realtime connection opened: channel={} user_id={}", channel, user.id);

    actix_web::rt::spawn(async move {
        let mut status_open = true;
        loop {
            tokio::select! {
                biased;
                status = status_rx.recv(), if status_open => {
                    let Some(status) = status else {
                        status_open = false;
                        continue;
                    };
                    if let Ok(text) = serde_json::to_string(&ServerFrame::Status(status)) {
                        let _ = session.text(text).await;
                    }
                    break;
                }
                frame = frames_rx.recv() => {
                    let Some(frame) = frame else { break };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode realtime frame: {}", e);
                            continue;
                        }
                    };
                    if session.text(text).await.is_err() {
                        break;
                    }
                }
                incoming = msg_stream.next() => {
                    match incoming {
                        Some(Ok(Message::Ping(bytes))) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(reason))) => {
                            debug!("Realtime client closed: channel={} reason={:?}", channel, reason);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Realtime protocol error: channel={} error={}", channel, e);
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        subscription.unsubscribe();
        let _ = session.close(None).await;
        info!("Realtime connection closed: channel={}", channel);
    });

    Ok(response)
}
