use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::error::FtpError;
use crate::ftp::{
    ConnectionId, FtpSession, SharedState,
    protocol::{Response, encode},
};

enum Frame {
    Line,
    Eof,
    TooLarge,
}

/// Serve un socket accettato finché il client esce o il server si ferma.
pub async fn handle_connection(
    stream: TcpStream,
    connection: ConnectionId,
    shared: SharedState,
    max_message_size: usize,
    shutdown: CancellationToken,
) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!("Connection {} from {}", connection, peer);

    let (reader_half, mut writer_half) = stream.into_split();
    let mut reader = BufReader::new(reader_half);
    let mut session = FtpSession::new(connection, peer.clone(), shared);

    let result = run_session_loop(
        &mut reader,
        &mut writer_half,
        &mut session,
        max_message_size,
        shutdown,
    )
    .await;

    match result {
        Ok(()) => info!("Client {} disconnected", peer),
        Err(e) => warn!("Client {} error: {}", peer, e),
    }

    session.close().await;
    if let Err(e) = writer_half.shutdown().await {
        debug!("Socket shutdown for {} failed: {}", peer, e);
    }
}

/// Legge una richiesta per riga e risponde a ognuna con esattamente una riga.
///
/// Termina a fine stream, su una riga vuota, su una riga troppo lunga oppure
/// quando scatta `shutdown`. Gli errori di I/O sono restituiti al chiamante.
pub async fn run_session_loop<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &mut FtpSession,
    max_message_size: usize,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = Vec::new();

    loop {
        buffer.clear();

        let frame = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Shutdown requested, closing connection");
                break;
            }

            result = read_frame(reader, &mut buffer, max_message_size) => result?,
        };

        let line = match frame {
            Frame::Eof => {
                debug!("Reader closed (EOF)");
                break;
            }
            Frame::TooLarge => {
                warn!("Message exceeds {} bytes, closing connection", max_message_size);
                let err = FtpError::MalformedMessage(format!(
                    "message exceeds {} bytes",
                    max_message_size
                ));
                write_response(writer, &Response::error(&err)).await?;
                break;
            }
            Frame::Line => match std::str::from_utf8(&buffer) {
                Ok(line) => line,
                Err(e) => {
                    // Riga non UTF-8: si risponde con un errore e si continua
                    warn!("Received a line that is not valid UTF-8: {}", e);
                    let err = FtpError::MalformedMessage(format!("invalid UTF-8: {}", e));
                    write_response(writer, &Response::error(&err)).await?;
                    continue;
                }
            },
        };

        let request = line.trim_end_matches(['\r', '\n']);
        if request.trim().is_empty() {
            debug!("Empty line received, closing connection");
            break;
        }

        debug!("Received {} bytes", request.len());
        let response = session.handle_line(request).await;
        write_response(writer, &response).await?;
    }

    Ok(())
}

async fn read_frame<R>(reader: &mut R, buffer: &mut Vec<u8>, limit: usize) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let bytes_read = (&mut *reader)
        .take(limit as u64 + 1)
        .read_until(b'\n', buffer)
        .await?;

    if bytes_read == 0 {
        Ok(Frame::Eof)
    } else if bytes_read > limit && !buffer.ends_with(b"\n") {
        Ok(Frame::TooLarge)
    } else {
        Ok(Frame::Line)
    }
}

async fn write_response<W>(writer: &mut W, response: &Response) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = encode(response)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
