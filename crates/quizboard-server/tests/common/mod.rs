use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use quizboard_core::error::ErrorCode;
use quizboard_core::net::messages::{
    ClientMessage, CreateRoomMsg, ErrorMsg, JoinRoomMsg, RoomCreatedMsg, RoomJoinedMsg,
    SelectQuestionMsg, ServerMessage,
};
use quizboard_core::net::protocol::{PROTOCOL_VERSION, decode_server_message, encode_client_message};
use quizboard_core::test_helpers::make_quiz;

use quizboard_server::build_app;
use quizboard_server::catalog::InMemoryCatalog;
use quizboard_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with a short buzz-in delay.
    pub async fn new() -> Self {
        Self::from_config(test_config()).await
    }

    /// Start a test server with a specific buzz-in delay.
    pub async fn with_answer_delay(ms: u64) -> Self {
        let mut config = test_config();
        config.game.answer_delay_ms = ms;
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config, Arc::new(test_catalog()));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        ..ServerConfig::default()
    };
    config.limits.max_ws_per_ip = 1000;
    config.limits.ws_rate_limit_per_sec = 1000.0;
    config.game.answer_delay_ms = 50;
    config
}

/// Catalog with `quiz-2x2` (100/200 per category), `quiz-1x2` and `quiz-1x1`.
pub fn test_catalog() -> InMemoryCatalog {
    InMemoryCatalog::from_quizzes(vec![make_quiz(2, 2), make_quiz(1, 2), make_quiz(1, 1)]).unwrap()
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a ClientMessage from a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Skip messages until one satisfies `pred`. Panics on an unexpected `Error`.
pub async fn ws_read_until(
    stream: &mut WsStream,
    what: &str,
    pred: impl Fn(&ServerMessage) -> bool,
) -> ServerMessage {
    loop {
        let msg = ws_read_server_msg(stream).await;
        if pred(&msg) {
            return msg;
        }
        if let ServerMessage::Error(err) = &msg {
            panic!("Expected {what}, got error: {err:?}");
        }
    }
}

/// Skip messages until an `Error` arrives.
pub async fn ws_read_error(stream: &mut WsStream) -> ErrorMsg {
    loop {
        if let ServerMessage::Error(err) = ws_read_server_msg(stream).await {
            return err;
        }
    }
}

/// Drain whatever arrives within `timeout_ms`.
pub async fn ws_drain(stream: &mut WsStream, timeout_ms: u64) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Some(data) = ws_try_read_raw(stream, timeout_ms).await {
        out.push(decode_server_message(&data).unwrap());
    }
    out
}

pub async fn ws_create_room(stream: &mut WsStream, quiz_id: &str, nickname: &str) -> RoomCreatedMsg {
    let msg = ClientMessage::CreateRoom(CreateRoomMsg {
        quiz_id: quiz_id.to_string(),
        nickname: nickname.to_string(),
        protocol_version: PROTOCOL_VERSION,
    });
    ws_send_client_msg(stream, &msg).await;
    match ws_read_server_msg(stream).await {
        ServerMessage::RoomCreated(created) => created,
        other => panic!("Expected RoomCreated, got: {other:?}"),
    }
}

pub async fn ws_send_join(stream: &mut WsStream, code: &str, nickname: &str) {
    let msg = ClientMessage::JoinRoom(JoinRoomMsg {
        code: code.to_string(),
        nickname: nickname.to_string(),
        protocol_version: PROTOCOL_VERSION,
    });
    ws_send_client_msg(stream, &msg).await;
}

pub async fn ws_join_room(stream: &mut WsStream, code: &str, nickname: &str) -> RoomJoinedMsg {
    ws_send_join(stream, code, nickname).await;
    match ws_read_server_msg(stream).await {
        ServerMessage::RoomJoined(joined) => *joined,
        other => panic!("Expected RoomJoined, got: {other:?}"),
    }
}

/// Join and expect a rejection with `code`.
pub async fn ws_join_room_expect_error(
    stream: &mut WsStream,
    code: &str,
    nickname: &str,
    expected: ErrorCode,
) {
    ws_send_join(stream, code, nickname).await;
    let err = ws_read_error(stream).await;
    assert_eq!(err.code, expected, "unexpected error: {err:?}");
}

pub async fn ws_select(stream: &mut WsStream, category_index: usize, question_index: usize) {
    let msg = ClientMessage::SelectQuestion(SelectQuestionMsg {
        category_index,
        question_index,
    });
    ws_send_client_msg(stream, &msg).await;
}
