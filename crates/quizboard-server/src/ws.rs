use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, FromRequest, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use quizboard_core::error::GameError;
use quizboard_core::net::messages::{
    ClientMessage, CreateRoomMsg, ErrorMsg, JoinRoomMsg, ServerMessage,
};
use quizboard_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_client_message, encode_server_message,
};
use quizboard_core::player::ConnectionId;
use quizboard_core::quiz::QuestionRef;
use quizboard_core::room::is_valid_room_code;

use crate::broadcast::PlayerSender;
use crate::registry::{RoomHandle, create_room};
use crate::room::{Creator, RoomAction, RoomCommand};
use crate::state::{AppState, ConnectionGuard, IpConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    // Per-IP connection limit
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
    let max_per_ip = state.config.limits.max_ws_per_ip;
    let Some(ip_guard) = IpConnectionGuard::try_acquire(ip, Arc::clone(&state.ws_per_ip), max_per_ip)
    else {
        tracing::warn!(%ip, max_per_ip, "Per-IP WS connection limit reached");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    };

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(ws
        .max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, ip_guard))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState, _ip_guard: IpConnectionGuard) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);
    let writer = spawn_writer(ws_sender, rx);

    let id = state.alloc_connection_id();
    tracing::debug!(player_id = id, "WebSocket connected");
    let mut conn = Connection {
        id,
        state,
        tx,
        seat: None,
    };

    read_loop(&mut ws_receiver, &mut conn).await;

    // Connection closed: let the room decide what that means for the seat.
    if let Some(seat) = conn.seat.take()
        && seat.room.tx.send(RoomCommand::Disconnect { connection: id }).await.is_err()
    {
        tracing::debug!(player_id = id, room = %seat.room.code, "Room already gone on disconnect");
    }
    drop(conn);
    writer.abort();
    tracing::debug!(player_id = id, "WebSocket disconnected");
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    })
}

/// The room a connection currently sits in.
struct Seat {
    room: RoomHandle,
    evicted: oneshot::Receiver<()>,
}

impl Seat {
    /// True once the room has detached this connection (removal, closure,
    /// or the actor stopping).
    fn is_evicted(&mut self) -> bool {
        !matches!(
            self.evicted.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        )
    }
}

struct Connection {
    id: ConnectionId,
    state: AppState,
    /// Outbound queue shared with the room this connection joins.
    tx: PlayerSender,
    seat: Option<Seat>,
}

impl Connection {
    async fn dispatch(&mut self, msg: ClientMessage) -> Result<(), GameError> {
        let action = match msg {
            ClientMessage::CreateRoom(req) => return self.create_room(req).await,
            ClientMessage::JoinRoom(req) => return self.join_room(req).await,
            ClientMessage::UpdateRole(m) => RoomAction::UpdateRole {
                player_id: m.player_id,
                role: m.role,
            },
            ClientMessage::RemovePlayer(m) => RoomAction::RemovePlayer {
                player_id: m.player_id,
            },
            ClientMessage::StartGame => RoomAction::StartGame,
            ClientMessage::SelectQuestion(m) => {
                RoomAction::SelectQuestion(QuestionRef::new(m.category_index, m.question_index))
            },
            ClientMessage::AttemptAnswer => RoomAction::AttemptAnswer,
            ClientMessage::JudgeAnswer(m) => RoomAction::JudgeAnswer { correct: m.correct },
            ClientMessage::SkipQuestion => RoomAction::SkipQuestion,
            ClientMessage::AdjustScore(m) => RoomAction::AdjustScore {
                player_id: m.player_id,
                points: m.points,
            },
        };
        self.act(action).await
    }

    async fn create_room(&mut self, req: CreateRoomMsg) -> Result<(), GameError> {
        if self.seat.is_some() {
            return Err(GameError::AlreadyInRoom);
        }
        check_protocol_version(req.protocol_version)?;
        let quiz = self
            .state
            .catalog
            .get(&req.quiz_id)
            .ok_or(GameError::QuizNotFound)?;

        let (evict, evicted) = oneshot::channel();
        let creator = Creator {
            connection: self.id,
            sender: self.tx.clone(),
            evict,
        };
        let room = create_room(
            &self.state.rooms,
            quiz,
            &req.nickname,
            creator,
            &self.state.config.game,
            self.state.room_settings(),
        )
        .await?;
        self.seat = Some(Seat { room, evicted });
        Ok(())
    }

    async fn join_room(&mut self, req: JoinRoomMsg) -> Result<(), GameError> {
        if self.seat.is_some() {
            return Err(GameError::AlreadyInRoom);
        }
        check_protocol_version(req.protocol_version)?;
        let code = req.code.trim().to_ascii_uppercase();
        if !is_valid_room_code(&code) {
            return Err(GameError::RoomNotFound);
        }
        let room = self
            .state
            .rooms
            .read()
            .await
            .get(&code)
            .ok_or(GameError::RoomNotFound)?;

        let (evict, evicted) = oneshot::channel();
        let (reply, result) = oneshot::channel();
        room.tx
            .send(RoomCommand::Join {
                connection: self.id,
                nickname: req.nickname,
                sender: self.tx.clone(),
                evict,
                reply,
            })
            .await
            .map_err(|_| GameError::RoomNotFound)?;
        result.await.map_err(|_| GameError::RoomNotFound)??;
        self.seat = Some(Seat { room, evicted });
        Ok(())
    }

    async fn act(&mut self, action: RoomAction) -> Result<(), GameError> {
        let Some(seat) = &self.seat else {
            return Err(GameError::NotInRoom);
        };
        let tx = seat.room.tx.clone();
        let (reply, result) = oneshot::channel();
        let sent = tx
            .send(RoomCommand::Action {
                connection: self.id,
                action,
                reply,
            })
            .await
            .is_ok();
        let outcome = if sent { result.await.ok() } else { None };
        outcome.unwrap_or_else(|| {
            self.seat = None;
            Err(GameError::RoomNotFound)
        })
    }

    fn send_error(&self, err: &GameError) {
        let msg = ServerMessage::Error(ErrorMsg::from(err));
        match encode_server_message(&msg) {
            Ok(data) => {
                if let Err(e) = self.tx.try_send(Bytes::from(data)) {
                    tracing::debug!(player_id = self.id, error = %e, "Dropped error reply to slow client");
                }
            },
            Err(e) => tracing::error!(error = %e, "Failed to encode error reply"),
        }
    }
}

fn check_protocol_version(client: u8) -> Result<(), GameError> {
    // 0 means the client did not say; accept it.
    if client != 0 && client != PROTOCOL_VERSION {
        return Err(GameError::ProtocolMismatch {
            client,
            server: PROTOCOL_VERSION,
        });
    }
    Ok(())
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    conn: &mut Connection,
) {
    let rate = conn.state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        // Rate limit: drop messages that exceed per-connection rate
        if !rate_limiter.allow() {
            tracing::warn!(player_id = conn.id, "Rate limited");
            continue;
        }

        let msg = match decode_client_message(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(player_id = conn.id, error = %e, "Dropping undecodable frame");
                continue;
            },
        };

        if conn.seat.as_mut().is_some_and(|seat| seat.is_evicted()) {
            tracing::debug!(player_id = conn.id, "Connection was detached from its room");
            conn.seat = None;
        }

        if let Err(err) = conn.dispatch(msg).await {
            tracing::debug!(player_id = conn.id, error = %err, "Request rejected");
            conn.send_error(&err);
        }
    }
}
