//! Dispatcher on one node, receiver on another, real HTTP in between.

use std::{net::SocketAddr, sync::Arc};

use lgrelay_core::{
    testing::ScriptedRunner, Envelope, LocalEngine, RelayError, RoutingDaemon,
};
use lgrelayd::{router, RelayState};
use lgrelayd_client::{
    Caller, Dispatcher, HttpTransport, Peer, PeerRegistry, PeerTransport,
};
use tokio::net::TcpListener;

async fn spawn_receiver(runner: Arc<ScriptedRunner>, secret: Option<&str>) -> SocketAddr {
    let engine = LocalEngine::with_routing(runner, RoutingDaemon::Bird);
    let state = RelayState::new(Arc::new(engine), secret.map(str::to_string), true);
    let app = router(state, "/api/run");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn dispatcher_for(addr: SocketAddr, secret: Option<&str>) -> Dispatcher {
    let mut node_b = Peer::new("nodeB", "Node B").with_url(&format!("http://{}/api/run", addr));
    if let Some(secret) = secret {
        node_b = node_b.with_secret(secret);
    }
    let registry = PeerRegistry::new("local", vec![Peer::new("local", "Local"), node_b]).unwrap();
    let local_runner = Arc::new(ScriptedRunner::new());

    Dispatcher::new(
        Arc::new(registry),
        Arc::new(LocalEngine::new(local_runner)),
        Arc::new(HttpTransport::new().unwrap()),
    )
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn signed_dispatch_runs_on_peer() {
    let remote = Arc::new(
        ScriptedRunner::new().respond("ping", Ok("PING 10.0.0.1: 4 packets received".into())),
    );
    let addr = spawn_receiver(remote.clone(), Some("k")).await;
    let dispatcher = dispatcher_for(addr, Some("k"));
    let caller = Caller::new("7", "bob");

    let out = dispatcher
        .dispatch("nodeB", "ping", &args(&["10.0.0.1"]), Some(&caller))
        .await
        .unwrap();

    assert_eq!(out, "PING 10.0.0.1: 4 packets received");
    let calls = remote.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].argv(), &["-i", "0.01", "-c", "4", "-W", "1", "10.0.0.1"]);
}

#[tokio::test]
async fn peer_path_lookup_extracts_as_paths() {
    let remote = Arc::new(ScriptedRunner::new().respond(
        "birdc",
        Ok("10.0.0.0/8 via 172.20.0.1\n\tBGP.as_path: 4242420001 4242420002\n".into()),
    ));
    let addr = spawn_receiver(remote, Some("k")).await;
    let dispatcher = dispatcher_for(addr, Some("k"));

    let out = dispatcher
        .dispatch("nodeB", "path", &args(&["10.0.0.1"]), None)
        .await
        .unwrap();
    assert_eq!(out, "4242420001 4242420002");
}

#[tokio::test]
async fn mismatched_secret_surfaces_forbidden_body() {
    let remote = Arc::new(ScriptedRunner::new().fallback(Ok("should not run".into())));
    let addr = spawn_receiver(remote.clone(), Some("k")).await;
    let dispatcher = dispatcher_for(addr, Some("wrong"));

    let err = dispatcher
        .dispatch("nodeB", "ping", &args(&["10.0.0.1"]), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RelayError::Transport("Forbidden: Invalid signature or timestamp".into())
    );
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn unsigned_dispatch_is_rejected_by_secured_peer() {
    let remote = Arc::new(ScriptedRunner::new());
    let addr = spawn_receiver(remote, Some("k")).await;
    let dispatcher = dispatcher_for(addr, None);

    let err = dispatcher
        .dispatch("nodeB", "dig", &args(&["example.com"]), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E_TRANSPORT");
}

#[tokio::test]
async fn remote_process_error_comes_back_as_transport_error() {
    let remote = Arc::new(ScriptedRunner::new().respond(
        "traceroute",
        Err(RelayError::process("traceroute: unknown host nowhere")),
    ));
    let addr = spawn_receiver(remote, Some("k")).await;
    let dispatcher = dispatcher_for(addr, Some("k"));

    let err = dispatcher
        .dispatch("nodeB", "trace", &args(&["nowhere"]), None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RelayError::Transport("traceroute: unknown host nowhere".into())
    );
}

#[tokio::test]
async fn captured_envelope_cannot_be_replayed() {
    let remote = Arc::new(ScriptedRunner::new().respond("ping", Ok("pong".into())));
    let addr = spawn_receiver(remote.clone(), Some("k")).await;
    let url = format!("http://{}/api/run", addr);
    let transport = HttpTransport::new().unwrap();
    let envelope = Envelope::signed("ping", &args(&["10.0.0.1"]), "nodeB", "k").unwrap();

    let first = transport.post(&url, &envelope).await.unwrap();
    let second = transport.post(&url, &envelope).await.unwrap();

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 403);
    assert_eq!(remote.count("ping"), 1);
}

#[tokio::test]
async fn unreachable_peer_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let dispatcher = dispatcher_for(addr, Some("k"));

    let err = dispatcher
        .dispatch("nodeB", "ping", &args(&["10.0.0.1"]), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E_TRANSPORT");
    assert!(err.message().starts_with("failed to reach"));
}
