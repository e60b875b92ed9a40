//! Control-plane requests over the daemon's Unix socket.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;

use thatch_core::wire::{CONTROL_PREFIX, ErrorBody};

/// Client bound to one control socket.
pub struct Control {
    socket: PathBuf,
    http: reqwest::Client,
}

impl Control {
    pub fn new(socket: &Path) -> Result<Self> {
        let http = reqwest::Client::builder()
            .unix_socket(socket.to_path_buf())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            socket: socket.to_path_buf(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        // Host is ignored on a Unix socket.
        format!("http://localhost{CONTROL_PREFIX}{path}")
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let req = self.http.get(self.url(path));
        self.execute(req).await
    }

    pub async fn post<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let req = self.http.post(self.url(path));
        self.execute(req).await
    }

    pub async fn post_body<T: Serialize, R: DeserializeOwned>(&self, path: &str, body: &T) -> Result<R> {
        let req = self.http.post(self.url(path)).json(body);
        self.execute(req).await
    }

    async fn execute<R: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<R> {
        let resp = req.send().await.with_context(|| {
            format!(
                "failed to connect to thatchd at {} (is it running?)",
                self.socket.display()
            )
        })?;

        let status = resp.status();
        if !status.is_success() {
            match resp.json::<ErrorBody>().await {
                Ok(body) => bail!("{:?}: {}", body.kind, body.message),
                Err(_) => bail!("thatchd returned {status}"),
            }
        }
        resp.json::<R>().await.context("failed to parse response")
    }
}
