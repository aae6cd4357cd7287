use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("{0}")]
    Address(String),

    #[error("{0}")]
    Socket(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("SSH protocol version 1 required by our configuration but not provided by remote")]
    RemoteLacksV1,

    #[error("SSH protocol version 2 required by our configuration but remote only provides (old, insecure) SSH-1")]
    RemoteLacksV2,

    #[error("remote version string exceeds {0} bytes")]
    BannerTooLong(usize),

    #[error("malformed remote version string: {0:?}")]
    MalformedBanner(String),
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error("connection closed before version exchange completed")]
    UnexpectedEof,
}
