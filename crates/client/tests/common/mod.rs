#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use xphub_client::{ApiClient, AuthSession, ClientConfig, MemoryStorage, Queries};
use xphub_server::{AppState, Db};

pub const TEST_USER: &str = xphub_server::db::TEST_DISCORD_ID;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        xphub_client::logging::init_tracing("xphub_client=debug,xphub_server=debug");
        let state = AppState::new(Db::seeded());
        let (addr, task) = xphub_server::spawn_dev_server(([127, 0, 0, 1], 0).into(), state.clone())
            .await
            .expect("bind test server");
        Self { addr, state, task }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_api_url(format!("http://{}", self.addr))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct TestClient {
    pub session: AuthSession,
    pub queries: Arc<Queries>,
    pub config: ClientConfig,
}

pub fn client(server: &TestServer) -> TestClient {
    client_with(server.config())
}

pub fn client_with(config: ClientConfig) -> TestClient {
    let session = AuthSession::new(Arc::new(MemoryStorage::new()));
    let api = ApiClient::new(&config, session.clone()).expect("api client");
    let queries = Arc::new(Queries::new(api, &config.cache));
    TestClient {
        session,
        queries,
        config,
    }
}

/// Await `fut`, failing the test if it takes longer than five seconds.
pub async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}
