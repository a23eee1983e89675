//! Skips network-backed tests when the sandbox forbids binding sockets.

use wiremock::MockServer;

/// Starts a wiremock server, or returns `None` when loopback sockets are unavailable.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if let Err(error) = std::net::TcpListener::bind("127.0.0.1:0") {
        eprintln!("skipping test: cannot bind loopback socket ({error})");
        return None;
    }
    Some(MockServer::start().await)
}
