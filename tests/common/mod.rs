use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

static SERVER: OnceLock<TestServer> = OnceLock::new();

const PRIVATE_KEY: &str = include_str!("../../src/testing/keys/primary.key.pem");
const PUBLIC_KEY: &str = include_str!("../../src/testing/keys/primary.pub.pem");

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // DATABASE_URL / DB_URL come from the caller's environment
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bookshelf-api"));
        cmd.env("HTTP_PORT", port.to_string())
            .env("PRIVATE_KEY", PRIVATE_KEY)
            .env("PUBLIC_KEY", PUBLIC_KEY)
            .env("PASSWORD_HASH_COST", "4")
            .env("LOG_MODE", "dev")
            .stdin(Stdio::null());

        // The server outlives the test binary, so it must not hold the
        // caller's stdout/stderr open.
        let log_path = std::path::Path::new(env!("CARGO_TARGET_TMPDIR")).join("bookshelf-api.log");
        let log = std::fs::File::create(&log_path)
            .with_context(|| format!("failed to create {}", log_path.display()))?;
        cmd.stdout(Stdio::from(log.try_clone()?)).stderr(Stdio::from(log));

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/healthz", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

pub fn database_url() -> Result<String> {
    std::env::var("DB_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .context("DB_URL or DATABASE_URL must point at the test database")
}

/// Direct connection to the database the server was started against.
pub async fn pool() -> Result<sqlx::PgPool> {
    Ok(sqlx::PgPool::connect(&database_url()?).await?)
}

/// Registers a fresh email user and returns `(user_id, token)`.
pub async fn register_user(server: &TestServer) -> Result<(Uuid, String)> {
    let client = reqwest::Client::new();
    let credentials = json!({
        "email": format!("{}@bookshelf.test", Uuid::new_v4().simple()),
        "password": "Sup3rSecret",
    });

    let res = client
        .post(server.url("/user/register/email"))
        .json(&credentials)
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
    let body: Value = res.json().await?;
    let user_id: Uuid = body["id"].as_str().context("missing id")?.parse()?;

    let res = client
        .post(server.url("/user/token/email"))
        .json(&credentials)
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "token failed: {}", res.status());
    let body: Value = res.json().await?;
    let token = body["token"].as_str().context("missing token")?.to_string();

    Ok((user_id, token))
}

/// Registers a user and grants it the admin role directly in the database.
pub async fn admin_token(server: &TestServer) -> Result<String> {
    let (user_id, token) = register_user(server).await?;
    let pool = pool().await?;
    sqlx::query(
        "INSERT INTO granted_roles (user_id, role_id) \
         SELECT $1, role_id FROM roles WHERE name = 'admin' ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .execute(&pool)
    .await?;
    pool.close().await;
    Ok(token)
}
