//! Library client for the mining server, one request per connection.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::ClientError;
use crate::protocol::{Channel, RequestKind, TOKEN_ERROR, TOKEN_OK, TOKEN_REFUSED};

pub struct MiningClient<S = TcpStream> {
    channel: Channel<S>,
}

impl MiningClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        Ok(Self::new(stream))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> MiningClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            channel: Channel::new(stream),
        }
    }

    /// Asks for the report of a previously stored run. Consumes the
    /// client; the protocol carries one request per connection.
    pub async fn reload(mut self, identifier: &str) -> Result<String, ClientError> {
        self.channel.write_int(RequestKind::Reload.code()).await?;
        self.channel.write_text(identifier).await?;
        match self.channel.read_text().await?.as_str() {
            TOKEN_OK => Ok(self.channel.read_text().await?),
            TOKEN_ERROR => Err(ClientError::Rejected(format!(
                "no stored clustering under {:?}",
                identifier
            ))),
            other => Err(ClientError::UnexpectedToken(other.to_string())),
        }
    }

    /// Requests a fresh clustering of `table` into `k` groups, stored
    /// server-side under `identifier`, and returns the report text.
    pub async fn discover(
        mut self,
        k: u32,
        table: &str,
        identifier: &str,
    ) -> Result<String, ClientError> {
        if k == 0 {
            return Err(ClientError::InvalidClusterCount);
        }
        self.channel.write_int(RequestKind::Fresh.code()).await?;
        self.channel.write_int(k).await?;
        self.channel.write_text(table).await?;
        self.channel.write_text(identifier).await?;
        match self.channel.read_text().await?.as_str() {
            TOKEN_OK => {}
            TOKEN_ERROR => {
                return Err(ClientError::Rejected(format!(
                    "table {:?} was not accepted",
                    table
                )));
            }
            other => return Err(ClientError::UnexpectedToken(other.to_string())),
        }
        match self.channel.read_text().await?.as_str() {
            TOKEN_OK => {}
            TOKEN_REFUSED => return Err(ClientError::InvalidClusterCount),
            other => return Err(ClientError::UnexpectedToken(other.to_string())),
        }
        let summary = self.channel.read_text().await?;
        match self.channel.read_text().await?.as_str() {
            TOKEN_OK => Ok(summary),
            other => Err(ClientError::UnexpectedToken(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_clusters_never_reaches_the_wire() {
        let (near, _far) = tokio::io::duplex(1024);
        let err = MiningClient::new(near)
            .discover(0, "weather", "run")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidClusterCount));
    }

    #[tokio::test]
    async fn test_reload_returns_the_report() {
        let (near, far) = tokio::io::duplex(1024);
        let peer = tokio::spawn(async move {
            let mut channel = Channel::new(far);
            assert_eq!(channel.read_int().await.unwrap(), 1);
            assert_eq!(channel.read_text().await.unwrap(), "abc");
            channel.write_text(TOKEN_OK).await.unwrap();
            channel.write_text("1:Centroid=(5 x )\n").await.unwrap();
        });
        let report = MiningClient::new(near).reload("abc").await.unwrap();
        assert_eq!(report, "1:Centroid=(5 x )\n");
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_reload_maps_the_error_token() {
        let (near, far) = tokio::io::duplex(1024);
        let peer = tokio::spawn(async move {
            let mut channel = Channel::new(far);
            channel.read_int().await.unwrap();
            channel.read_text().await.unwrap();
            channel.write_text(TOKEN_ERROR).await.unwrap();
        });
        let err = MiningClient::new(near).reload("ghost").await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_discover_walks_the_full_token_sequence() {
        let (near, far) = tokio::io::duplex(1024);
        let peer = tokio::spawn(async move {
            let mut channel = Channel::new(far);
            assert_eq!(channel.read_int().await.unwrap(), 2);
            assert_eq!(channel.read_int().await.unwrap(), 3);
            assert_eq!(channel.read_text().await.unwrap(), "weather");
            assert_eq!(channel.read_text().await.unwrap(), "run");
            channel.write_text(TOKEN_OK).await.unwrap();
            channel.write_text(TOKEN_OK).await.unwrap();
            channel.write_text("report").await.unwrap();
            channel.write_text(TOKEN_OK).await.unwrap();
        });
        let report = MiningClient::new(near)
            .discover(3, "weather", "run")
            .await
            .unwrap();
        assert_eq!(report, "report");
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_discover_maps_the_refusal_token() {
        let (near, far) = tokio::io::duplex(1024);
        let peer = tokio::spawn(async move {
            let mut channel = Channel::new(far);
            channel.read_int().await.unwrap();
            channel.read_int().await.unwrap();
            channel.read_text().await.unwrap();
            channel.read_text().await.unwrap();
            channel.write_text(TOKEN_OK).await.unwrap();
            channel.write_text(TOKEN_REFUSED).await.unwrap();
        });
        let err = MiningClient::new(near)
            .discover(99, "weather", "run")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidClusterCount));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_discover_flags_unexpected_tokens() {
        let (near, far) = tokio::io::duplex(1024);
        let peer = tokio::spawn(async move {
            let mut channel = Channel::new(far);
            channel.read_int().await.unwrap();
            channel.read_int().await.unwrap();
            channel.read_text().await.unwrap();
            channel.read_text().await.unwrap();
            channel.write_text("MAYBE").await.unwrap();
        });
        let err = MiningClient::new(near)
            .discover(2, "weather", "run")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedToken(token) if token == "MAYBE"));
        peer.await.unwrap();
    }
}
