use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};

use crate::conf::Conf;
use crate::error::ExchangeError;
use crate::ssh::verstring::{Progress, VersionHandshake, VersionOutcome};

/// Run the version exchange over `io`. Returns the negotiated outcome
/// and any bytes read past the greeting line, which belong to the next
/// protocol layer.
pub async fn exchange_versions<IO>(
    io: &mut IO,
    conf: &Conf,
    bare_mode: bool,
    our_protoversion: &str,
) -> Result<(VersionOutcome, Bytes), ExchangeError>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    let mut handshake = VersionHandshake::new(conf, bare_mode, our_protoversion);
    let mut rbuf = [0u8; 4096];

    loop {
        let progress = handshake.handle_input()?;

        let pending = handshake.out_raw_mut().take_all();
        if !pending.is_empty() {
            io.write_all(&pending).await?;
            io.flush().await?;
        }

        match progress {
            Progress::Done(_) => break,
            Progress::Pending => {
                let n = io.read(&mut rbuf).await?;
                if n == 0 {
                    return Err(ExchangeError::UnexpectedEof);
                }
                handshake.in_raw_mut().add(Bytes::copy_from_slice(&rbuf[..n]));
            }
        }
    }

    let leftover = handshake.in_raw_mut().take_all();
    Ok((handshake.into_outcome(), leftover))
}

#[cfg(test)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;
    use crate::error::HandshakeError;
    use crate::ssh::bugs::Bug;

    fn local_banner(conf: &Conf, our_protoversion: &str) -> Vec<u8> {
        let mut hs = VersionHandshake::new(conf, false, our_protoversion);
        hs.handle_input().unwrap();
        hs.out_raw_mut().take_all().to_vec()
    }

    #[tokio::test]
    async fn test_exchange() {
        let conf = Conf::default();
        let banner = local_banner(&conf, "2.0");

        let mut mock = Builder::new()
            .write(&banner)
            .read(b"SSH-2.0-OpenSSH_8.9\r\n")
            .build();

        let (outcome, leftover) = exchange_versions(&mut mock, &conf, false, "2.0")
            .await
            .unwrap();
        assert_eq!(outcome.major(), 2);
        assert_eq!(outcome.remote_version(), "SSH-2.0-OpenSSH_8.9");
        assert_eq!(outcome.softwareversion(), "OpenSSH_8.9");
        assert!(outcome.bugs().is_empty());
        assert_eq!(leftover, Bytes::new());
    }

    #[tokio::test]
    async fn test_exchange_keeps_overread() {
        let conf = Conf::default();
        let banner = local_banner(&conf, "2.0");

        let mut mock = Builder::new()
            .write(&banner)
            .read(b"SSH-2.0-peer\r\n\x00\x00\x01\x02")
            .build();

        let (outcome, leftover) = exchange_versions(&mut mock, &conf, false, "2.0")
            .await
            .unwrap();
        assert_eq!(outcome.protoversion(), "2.0");
        assert_eq!(leftover, Bytes::from(&b"\x00\x00\x01\x02"[..]));
    }

    #[tokio::test]
    async fn test_exchange_detects_bugs() {
        let conf = Conf::default();
        let banner = local_banner(&conf, "2.0");

        let mut mock = Builder::new()
            .write(&banner)
            .read(b"SSH-1.99-OpenSSH_2.3.0p1\n")
            .build();

        let (outcome, _leftover) = exchange_versions(&mut mock, &conf, false, "2.0")
            .await
            .unwrap();
        assert_eq!(outcome.major(), 2);
        assert!(outcome.bugs().contains(Bug::Ssh2Rekey));
        assert!(outcome.bugs().contains(Bug::Ssh2OldGex));
    }

    #[tokio::test]
    async fn test_exchange_version_mismatch() {
        let conf = Conf::default();
        let banner = local_banner(&conf, "2.0");

        let mut mock = Builder::new()
            .write(&banner)
            .read(b"SSH-1.5-ancient\n")
            .build();

        let err = exchange_versions(&mut mock, &conf, false, "2.0")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Handshake(HandshakeError::RemoteLacksV2),
        ));
    }

    #[tokio::test]
    async fn test_exchange_eof() {
        let conf = Conf::default();
        let banner = local_banner(&conf, "2.0");

        let mut mock = Builder::new().write(&banner).read(b"SSH-2.0-trunc").build();

        let err = exchange_versions(&mut mock, &conf, false, "2.0")
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::UnexpectedEof));
    }
}
