//! TCP listener and the per-connection session handler.
//!
//! Each accepted connection runs one session to completion on its own
//! task. A session failure closes that connection only; the listener and
//! the other sessions are unaffected.

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

use log::{error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task;

use crate::config::Config;
use crate::database::{SqliteProvider, TableProvider};
use crate::dataset::Dataset;
use crate::error::{PersistError, ProtocolError};
use crate::miner::KMeansMiner;
use crate::protocol::{Channel, RequestKind, TOKEN_ERROR, TOKEN_OK, TOKEN_REFUSED};

pub struct MiningServer {
    listener: TcpListener,
    database: PathBuf,
    storage: PathBuf,
}

impl MiningServer {
    /// Binds the endpoint named by `config`.
    pub async fn bind(config: &Config) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", config.port())).await?;
        Ok(Self {
            listener,
            database: config.database().to_path_buf(),
            storage: config.storage().to_path_buf(),
        })
    }

    /// Address actually bound, which differs from the configured one when
    /// binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections indefinitely, one session task per connection.
    pub async fn run(self) -> std::io::Result<()> {
        info!("listening on {}", self.listener.local_addr()?);
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let session = Session {
                        database: self.database.clone(),
                        storage: self.storage.clone(),
                    };
                    tokio::spawn(async move {
                        match session.handle(stream).await {
                            Ok(()) => info!("session from {} completed", peer),
                            Err(e) => warn!("session from {} dropped: {}", peer, e),
                        }
                    });
                }
                Err(e) => warn!("failed to accept a connection: {}", e),
            }
        }
    }
}

struct Session {
    database: PathBuf,
    storage: PathBuf,
}

impl Session {
    /// Runs one request to completion. The connection closes when the
    /// stream is dropped, on every exit path.
    async fn handle<S: AsyncRead + AsyncWrite + Unpin>(
        self,
        stream: S,
    ) -> Result<(), ProtocolError> {
        let mut channel = Channel::new(stream);
        let kind = match RequestKind::try_from(channel.read_int().await?) {
            Ok(kind) => kind,
            Err(e) => {
                warn!("{}, closing", e);
                return Ok(());
            }
        };
        match kind {
            RequestKind::Reload => self.reload(&mut channel).await,
            RequestKind::Fresh => self.fresh_run(&mut channel).await,
        }
    }

    /// Reload path: identifier, then status token, then the stored report.
    async fn reload<S: AsyncRead + AsyncWrite + Unpin>(
        self,
        channel: &mut Channel<S>,
    ) -> Result<(), ProtocolError> {
        let identifier = channel.read_text().await?;
        if !valid_identifier(&identifier) {
            warn!("reload refused for identifier {:?}", identifier);
            channel.write_text(TOKEN_ERROR).await?;
            return Ok(());
        }
        let path = KMeansMiner::artifact_path(&self.storage, &identifier);
        let miner = match task::spawn_blocking(move || KMeansMiner::load(&path)).await {
            Ok(Ok(miner)) => miner,
            Ok(Err(PersistError::NotFound(path))) => {
                info!("no stored run at {}", path);
                channel.write_text(TOKEN_ERROR).await?;
                return Ok(());
            }
            Ok(Err(e)) => {
                error!("reload of {:?} failed: {}", identifier, e);
                return Ok(());
            }
            Err(e) => {
                error!("reload task failed: {}", e);
                return Ok(());
            }
        };
        info!("reloaded stored run {:?}", identifier);
        channel.write_text(TOKEN_OK).await?;
        channel.write_text(miner.summary()).await?;
        Ok(())
    }

    /// Fresh-run path: cluster count, table name and save identifier,
    /// then acquisition token, validity token, report and completion
    /// token. Validation failures stop the sequence after their token.
    async fn fresh_run<S: AsyncRead + AsyncWrite + Unpin>(
        self,
        channel: &mut Channel<S>,
    ) -> Result<(), ProtocolError> {
        let k = channel.read_int().await?;
        let table = channel.read_text().await?;
        let identifier = channel.read_text().await?;

        if !valid_identifier(&identifier) {
            warn!("save identifier {:?} refused", identifier);
            channel.write_text(TOKEN_ERROR).await?;
            return Ok(());
        }

        let database = self.database.clone();
        let wanted = table.clone();
        let acquisition = task::spawn_blocking(
            move || -> Result<Dataset, Box<dyn Error + Send + Sync>> {
                let provider = SqliteProvider::open(&database)?;
                let snapshot = provider.fetch(&wanted)?;
                Ok(Dataset::from_snapshot(snapshot)?)
            },
        )
        .await;
        let data = match acquisition {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                info!("acquisition of table {:?} failed: {}", table, e);
                channel.write_text(TOKEN_ERROR).await?;
                return Ok(());
            }
            Err(e) => {
                error!("acquisition task failed: {}", e);
                return Ok(());
            }
        };
        channel.write_text(TOKEN_OK).await?;

        let count = data.number_of_examples();
        if k == 0 || k as usize > count {
            info!("cluster count {} refused for {} records", k, count);
            channel.write_text(TOKEN_REFUSED).await?;
            return Ok(());
        }
        channel.write_text(TOKEN_OK).await?;

        let path = KMeansMiner::artifact_path(&self.storage, &identifier);
        let mining = task::spawn_blocking(
            move || -> Result<(KMeansMiner, u32), Box<dyn Error + Send + Sync>> {
                let (miner, passes) = KMeansMiner::discover(&data, k as usize)?;
                miner.save(&path)?;
                Ok((miner, passes))
            },
        )
        .await;
        let (miner, passes) = match mining {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("clustering of table {:?} failed: {}", table, e);
                return Ok(());
            }
            Err(e) => {
                error!("clustering task failed: {}", e);
                return Ok(());
            }
        };
        info!(
            "table {:?} clustered into {} groups after {} passes, stored as {:?}",
            table,
            miner.cluster_set().len(),
            passes,
            identifier
        );
        channel.write_text(miner.summary()).await?;
        channel.write_text(TOKEN_OK).await?;
        Ok(())
    }
}

/// Storage identifiers become file names and must not traverse paths.
fn valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier != "."
        && identifier != ".."
        && !identifier.contains(['/', '\\', '\0'])
}
