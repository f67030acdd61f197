use crate::{
    os,
    task_pool::POOL,
    ui::tracker::{ProgressTrackerBuilder, Tracker, TrackerBuilder},
};

use reqwest::{Client, Proxy, Response, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn user_agent() -> String {
    format!("upkg/{} ({})", env!("CARGO_PKG_VERSION"), os::version())
}

pub struct FileDownload {
    url: Url,
    path_name: PathBuf,
}

#[derive(Error, Debug)]
pub enum FileDownloadError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: tokio::io::Error,
    },
    #[error(transparent)]
    Req(#[from] reqwest::Error),
}

impl FileDownload {
    pub fn new(url: Url, path_name: &Path) -> Self {
        Self {
            url,
            path_name: path_name.to_path_buf(),
        }
    }

    pub fn fetch_raw(
        self,
        setting: ClientSetting,
        tb: Option<ProgressTrackerBuilder>,
    ) -> Result<(), FileDownloadError> {
        let io_err = |source: tokio::io::Error| FileDownloadError::Io {
            path: self.path_name.clone(),
            source,
        };

        POOL.block_on(async {
            let mut res = Download::fetch(&setting, self.url.clone()).await?;
            let mut file = File::create(&self.path_name).await.map_err(io_err)?;

            let t = tb.map(|tb_| match res.content_length() {
                Some(len) => tb_.with_len(len).build(),
                None => tb_.build(),
            });

            while let Some(chunk) = res.chunk().await? {
                file.write_all(&chunk).await.map_err(io_err)?;
                if let Some(t) = t.as_ref() {
                    t.step(chunk.len() as u64);
                }
            }
            file.flush().await.map_err(io_err)?;

            if let Some(t) = t {
                t.finish();
            }
            Ok(())
        })
    }
}

pub struct Download;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to build client: {source}")]
    ClientBuild {
        #[from]
        source: ClientSettingError,
    },
    #[error("{url} returned {status}")]
    Status { url: Url, status: StatusCode },
    #[error(transparent)]
    Req(#[from] reqwest::Error),
}

impl Download {
    pub async fn fetch(setting: &ClientSetting, url: Url) -> Result<Response, DownloadError> {
        let c = setting.clone().build()?;

        debug!(%url, "GET");
        let res = c.get(url.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(DownloadError::Status { url, status });
        }
        Ok(res)
    }
}

#[derive(Debug, Error)]
pub enum ClientSettingError {
    #[error("Invalid proxy URL {url}: {source}")]
    Proxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Clone, Debug, Default)]
pub struct ClientSetting {
    pub proxies: Option<Vec<Url>>,
    pub timeout: Option<Duration>,
}

impl ClientSetting {
    pub fn with_proxies(mut self, proxies: Vec<Url>) -> Self {
        if !proxies.is_empty() {
            self.proxies = Some(proxies);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Client, ClientSettingError> {
        let mut cb = Client::builder()
            .user_agent(user_agent())
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(timeout) = self.timeout {
            cb = cb.timeout(timeout);
        }

        if let Some(proxies) = self.proxies {
            let (secure, insecure): (Vec<Url>, Vec<Url>) =
                proxies.into_iter().partition(|u| u.scheme() == "https");

            for u in secure {
                cb = cb.proxy(Proxy::https(u.as_str()).map_err(|source| {
                    ClientSettingError::Proxy {
                        url: u.to_string(),
                        source,
                    }
                })?);
            }

            for u in insecure {
                cb = cb.proxy(Proxy::http(u.as_str()).map_err(|source| {
                    ClientSettingError::Proxy {
                        url: u.to_string(),
                        source,
                    }
                })?);
            }
        }

        cb.build().map_err(ClientSettingError::Build)
    }
}
