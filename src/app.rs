//! Wires the session, queries and push channel together and runs a command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use xphub_client::{
    install_cache_invalidation, ApiClient, AuthSession, AuthStatus, ClientConfig, ConnectionState,
    EventBridge, FileStorage, MemoryStorage, Queries, Storage, UnlockOutcome, DEFAULT_LEADERBOARD_LIMIT,
};

use crate::cli::Command;
use crate::views;

pub struct App {
    config: ClientConfig,
    session: AuthSession,
    queries: Arc<Queries>,
    bridge: EventBridge,
}

impl App {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let storage: Arc<dyn Storage> = match FileStorage::in_config_dir() {
            Some(storage) => Arc::new(storage),
            None => {
                tracing::warn!("no config directory, session will not persist");
                Arc::new(MemoryStorage::new())
            }
        };

        let session = AuthSession::new(storage);
        let api = ApiClient::new(&config, session.clone()).context("failed to create API client")?;
        let queries = Arc::new(Queries::new(api, &config.cache));
        let bridge = EventBridge::new(config.socket_url.clone());

        Ok(Self {
            config,
            session,
            queries,
            bridge,
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Dashboard => print!("{}", views::dashboard::render(&self.queries, None).await?),
            Command::Profile { discord_id } => {
                print!("{}", views::profile::render(&self.queries, &discord_id).await?)
            }
            Command::Leaderboard { limit } => {
                print!("{}", views::leaderboard::render(&self.queries, limit).await?)
            }
            Command::Login { discord_id, token } => {
                self.queries.clear();
                self.session.login(&discord_id, token);
                println!("Signed in as {discord_id}.");
            }
            Command::Logout => {
                self.session.logout();
                self.queries.clear();
                println!("Signed out.");
            }
            Command::Unlock { tool } => self.unlock(&tool).await?,
            Command::Watch => self.watch().await?,
        }

        if let AuthStatus::LoginRequired { login_url } = self.session.status() {
            eprintln!("Your session expired. Sign in again at {login_url}");
        }
        Ok(())
    }

    async fn unlock(&self, tool: &str) -> Result<()> {
        let Some(discord_id) = self.session.discord_id() else {
            bail!("not signed in; run `xphub login <discord-id>` first");
        };
        let tools = self.queries.tools(&discord_id).await?;
        let Some(status) = tools
            .iter()
            .find(|s| s.tool.id == tool || s.tool.name.eq_ignore_ascii_case(tool))
        else {
            bail!("no tool named {tool}");
        };

        match self.queries.unlock_tool(&discord_id, status).await? {
            UnlockOutcome::Unlocked(response) => println!("{} {}", status.tool.icon, response.message),
            UnlockOutcome::NotAvailable(state) => {
                println!(
                    "{} is {} (requires level {}).",
                    status.tool.name,
                    state.label().to_lowercase(),
                    status.tool.required_level
                );
            }
        }
        Ok(())
    }

    /// Live dashboard: redraw whenever the push channel reports a change,
    /// the connection state moves or the leaderboard refreshes.
    async fn watch(&self) -> Result<()> {
        let wiring = install_cache_invalidation(&self.bridge, &self.queries);
        let refresh = self.queries.spawn_leaderboard_refresh(DEFAULT_LEADERBOARD_LIMIT);

        // Registered after the wiring, so redraws see invalidated entries.
        let (redraw_tx, mut redraw_rx) = mpsc::unbounded_channel::<()>();
        {
            let tx = redraw_tx.clone();
            self.bridge.on_level_up(move |_| {
                let _ = tx.send(());
            });
            let tx = redraw_tx.clone();
            self.bridge.on_tool_unlocked(move |_| {
                let _ = tx.send(());
            });
        }

        let mut connection = self.bridge.watch_state();
        let mut auth = self.session.watch_status();
        self.bridge.connect();
        tracing::info!(api = %self.config.api_url, socket = %self.bridge.url(), "watching");

        let period = self.config.cache.leaderboard_refresh_interval.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        loop {
            let state = connection.borrow().clone();
            self.draw(&state).await;

            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                Some(()) = redraw_rx.recv() => {}
                changed = connection.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = auth.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {}
            }
        }

        drop(refresh);
        wiring.uninstall(&self.bridge);
        self.bridge.shutdown().await;
        Ok(())
    }

    async fn draw(&self, connection: &ConnectionState) {
        // Clear screen, cursor home.
        print!("\x1b[2J\x1b[H");
        match views::dashboard::render(&self.queries, Some(connection)).await {
            Ok(page) => print!("{page}"),
            Err(e) => println!("Error Loading Dashboard\n{e}"),
        }
        println!();
        match views::leaderboard::render(&self.queries, DEFAULT_LEADERBOARD_LIMIT).await {
            Ok(page) => print!("{page}"),
            Err(e) => println!("Leaderboard unavailable: {e}"),
        }
        if let AuthStatus::LoginRequired { login_url } = self.session.status() {
            println!("\nYour session expired. Sign in again at {login_url}");
        }
        println!("\nCtrl-C to quit.");
    }
}
