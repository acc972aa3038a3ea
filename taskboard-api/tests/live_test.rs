/// Live update tests
///
/// The WebSocket handler runs `admit` and then registers with the shared
/// broadcaster. Most tests take the same two steps without a socket and
/// drive mutations through the HTTP router; the `socket_` tests serve the
/// router on an ephemeral port and connect a real WebSocket client.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{access_token, TestContext, TEST_SECRET};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use taskboard_shared::auth::jwt::{create_token, Claims, TokenType};
use taskboard_shared::events::BoardEvent;
use taskboard_shared::live::handshake::{CLOSE_INVALID_TOKEN, CLOSE_NOT_A_MEMBER};
use taskboard_shared::live::{admit, LiveSubscription};
use uuid::Uuid;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: std::time::Duration = std::time::Duration::from_secs(5);

fn drain(subscription: &mut LiveSubscription) -> Vec<BoardEvent> {
    let mut events = Vec::new();
    while let Ok(event) = subscription.receiver.try_recv() {
        events.push(event);
    }
    events
}

async fn register(ctx: &TestContext, email: &str, name: &str) -> (Uuid, String) {
    let response = ctx
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "email": email, "password": "Sup3r-secret!", "display_name": name })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.json);

    let user_id = response.json["user"]["id"].as_str().unwrap().parse().unwrap();
    let token = response.json["access_token"].as_str().unwrap().to_string();
    (user_id, token)
}

async fn send(
    ctx: &TestContext,
    method: Method,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> common::TestResponse {
    ctx.request(method, uri, Some(token), Some(body)).await
}

#[tokio::test]
async fn test_editor_move_reaches_owner_live_connection() {
    let ctx = TestContext::new();
    let (_a_id, a_token) = register(&ctx, "a@example.com", "A").await;
    let (b_id, b_token) = register(&ctx, "b@example.com", "B").await;

    let board = send(&ctx, Method::POST, "/v1/boards", &a_token, json!({ "title": "Team" })).await;
    assert_eq!(board.status, StatusCode::CREATED);
    let board_id = board.id("id");
    let base = format!("/v1/boards/{board_id}");

    let backlog = send(&ctx, Method::POST, &format!("{base}/columns"), &a_token, json!({ "title": "Backlog" }))
        .await
        .id("id");

    let task1 = send(
        &ctx,
        Method::POST,
        &format!("{base}/cards"),
        &a_token,
        json!({ "column_id": backlog, "title": "Task 1" }),
    )
    .await;
    assert_eq!(task1.json["position"], 0);
    let task2 = send(
        &ctx,
        Method::POST,
        &format!("{base}/cards"),
        &a_token,
        json!({ "column_id": backlog, "title": "Task 2" }),
    )
    .await;
    assert_eq!(task2.json["position"], 1);

    let invite = send(
        &ctx,
        Method::POST,
        &format!("{base}/invite"),
        &a_token,
        json!({ "email": "b@example.com", "role": "editor" }),
    )
    .await;
    assert_eq!(invite.status, StatusCode::CREATED);
    assert_eq!(invite.json["user_id"], json!(b_id));

    let admission = admit(ctx.store.as_ref(), TEST_SECRET, board_id, Some(a_token.as_str()))
        .await
        .unwrap();
    assert_eq!(admission.membership.role.as_str(), "owner");
    let mut a_live = ctx.state.broadcaster.register(board_id).await;

    let done = send(&ctx, Method::POST, &format!("{base}/columns"), &a_token, json!({ "title": "Done" }))
        .await
        .id("id");

    let card_id = task1.id("id");
    let moved = send(
        &ctx,
        Method::PUT,
        &format!("{base}/cards/{card_id}/move"),
        &b_token,
        json!({ "column_id": done, "position": 0 }),
    )
    .await;
    assert_eq!(moved.status, StatusCode::OK, "{}", moved.json);

    let events = drain(&mut a_live);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind(), "column_created");
    assert_eq!(
        events[1],
        BoardEvent::CardMoved {
            card_id,
            from_column: backlog,
            to_column: done,
            position: 0,
        }
    );

    let wire: serde_json::Value = serde_json::from_str(&events[1].to_json().unwrap()).unwrap();
    assert_eq!(wire["type"], "card_moved");
    assert_eq!(wire["data"]["from_column"], json!(backlog));
    assert_eq!(wire["data"]["to_column"], json!(done));
}

#[tokio::test]
async fn test_rejected_handshakes_never_receive_events() {
    let ctx = TestContext::new();
    let owner = ctx.user("Owner").await;
    let stranger = ctx.user("Stranger").await;
    let board_id = ctx.board(&owner, "Team").await;

    let expired = create_token(
        &Claims::with_expiration(owner.id(), TokenType::Access, Duration::seconds(-60)),
        TEST_SECRET,
    )
    .unwrap();
    let foreign = create_token(
        &Claims::new(owner.id(), TokenType::Access),
        "some-other-secret-that-is-32-bytes-long",
    )
    .unwrap();

    for token in [None, Some("garbage"), Some(expired.as_str()), Some(foreign.as_str())] {
        let rejection = admit(ctx.store.as_ref(), TEST_SECRET, board_id, token)
            .await
            .unwrap_err();
        assert_eq!(rejection.close_code(), CLOSE_INVALID_TOKEN, "{token:?}");
    }

    let rejection = admit(ctx.store.as_ref(), TEST_SECRET, board_id, Some(stranger.token.as_str()))
        .await
        .unwrap_err();
    assert_eq!(rejection.close_code(), CLOSE_NOT_A_MEMBER);

    ctx.column(board_id, &owner, "Todo").await;
    assert_eq!(ctx.state.broadcaster.connection_count(board_id).await, 0);
}

#[tokio::test]
async fn test_events_stay_on_their_board() {
    let ctx = TestContext::new();
    let owner = ctx.user("Owner").await;
    let first = ctx.board(&owner, "First").await;
    let second = ctx.board(&owner, "Second").await;

    let mut first_live = ctx.state.broadcaster.register(first).await;
    let mut second_live = ctx.state.broadcaster.register(second).await;

    let column_id = ctx.column(first, &owner, "Todo").await;
    let card_id = ctx.card(first, column_id, &owner, "Card").await.id("id");
    let deleted = ctx
        .delete(&format!("/v1/boards/{first}/cards/{card_id}"), &owner)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let kinds: Vec<&str> = drain(&mut first_live).iter().map(BoardEvent::kind).collect();
    assert_eq!(kinds, vec!["column_created", "card_created", "card_deleted"]);
    assert!(drain(&mut second_live).is_empty());
}

#[tokio::test]
async fn test_closed_connection_is_pruned_without_failing_mutation() {
    let ctx = TestContext::new();
    let owner = ctx.user("Owner").await;
    let board_id = ctx.board(&owner, "Team").await;

    let gone = ctx.state.broadcaster.register(board_id).await;
    let mut live = ctx.state.broadcaster.register(board_id).await;
    drop(gone);

    let response = ctx
        .post(&format!("/v1/boards/{board_id}/columns"), &owner, json!({ "title": "Todo" }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    assert_eq!(drain(&mut live).len(), 1);
    assert_eq!(ctx.state.broadcaster.connection_count(board_id).await, 1);

    let health = ctx.request(Method::GET, "/health", Some(&access_token(owner.id())), None).await;
    assert_eq!(health.json["live_boards"], 1);
}

async fn serve(ctx: &TestContext) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = ctx.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, board_id: Uuid, token: Option<&str>) -> Client {
    let url = match token {
        Some(token) => format!("ws://{addr}/ws/boards/{board_id}?token={token}"),
        None => format!("ws://{addr}/ws/boards/{board_id}"),
    };
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

/// Next frame other than ping/pong, `None` once the stream ends
async fn next_frame(socket: &mut Client) -> Option<WsMessage> {
    loop {
        let frame = tokio::time::timeout(WAIT, socket.next())
            .await
            .expect("timed out waiting for a frame");
        match frame {
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
            Some(Ok(message)) => return Some(message),
            Some(Err(_)) | None => return None,
        }
    }
}

fn close_code(frame: Option<WsMessage>) -> u16 {
    match frame {
        Some(WsMessage::Close(Some(close))) => u16::from(close.code),
        other => panic!("expected close frame, got {other:?}"),
    }
}

async fn wait_for_connections(ctx: &TestContext, board_id: Uuid, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while ctx.state.broadcaster.connection_count(board_id).await != expected {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("live connection count never settled");
}

#[tokio::test]
async fn test_socket_rejections_close_before_registration() {
    let ctx = TestContext::new();
    let owner = ctx.user("Owner").await;
    let stranger = ctx.user("Stranger").await;
    let board_id = ctx.board(&owner, "Team").await;
    let addr = serve(&ctx).await;

    for token in [None, Some("garbage")] {
        let mut socket = connect(addr, board_id, token).await;
        assert_eq!(close_code(next_frame(&mut socket).await), CLOSE_INVALID_TOKEN, "{token:?}");
        assert!(next_frame(&mut socket).await.is_none());
    }

    let mut socket = connect(addr, board_id, Some(stranger.token.as_str())).await;
    assert_eq!(close_code(next_frame(&mut socket).await), CLOSE_NOT_A_MEMBER);
    assert!(next_frame(&mut socket).await.is_none());

    ctx.column(board_id, &owner, "Todo").await;
    assert_eq!(ctx.state.broadcaster.connection_count(board_id).await, 0);
}

#[tokio::test]
async fn test_socket_receives_card_moved_and_unregisters_on_close() {
    let ctx = TestContext::new();
    let owner = ctx.user("Owner").await;
    let editor = ctx.user("Editor").await;
    let board_id = ctx.board(&owner, "Team").await;
    assert_eq!(ctx.invite(board_id, &owner, &editor, "editor").await.status, StatusCode::CREATED);
    let backlog = ctx.column(board_id, &owner, "Backlog").await;
    let done = ctx.column(board_id, &owner, "Done").await;
    let card_id = ctx.card(board_id, backlog, &owner, "Task 1").await.id("id");

    let addr = serve(&ctx).await;
    let mut socket = connect(addr, board_id, Some(owner.token.as_str())).await;
    wait_for_connections(&ctx, board_id, 1).await;

    let moved = ctx
        .put(
            &format!("/v1/boards/{board_id}/cards/{card_id}/move"),
            &editor,
            json!({ "column_id": done, "position": 0 }),
        )
        .await;
    assert_eq!(moved.status, StatusCode::OK, "{}", moved.json);

    let text = match next_frame(&mut socket).await {
        Some(WsMessage::Text(text)) => text,
        other => panic!("expected text frame, got {other:?}"),
    };
    let event: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(event["type"], "card_moved");
    assert_eq!(event["data"]["card_id"], json!(card_id));
    assert_eq!(event["data"]["from_column"], json!(backlog));
    assert_eq!(event["data"]["to_column"], json!(done));
    assert_eq!(event["data"]["position"], 0);

    socket.close(None).await.unwrap();
    wait_for_connections(&ctx, board_id, 0).await;
}
