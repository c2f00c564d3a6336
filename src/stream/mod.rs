use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::task::Poll;

use anyhow::{Context, Result};
use event::{KlineEvent, SubscribeRequest};
use futures_util::{SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinError;
use tokio_native_tls::native_tls::TlsConnector;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};

use crate::config::Config;

pub mod event;
pub mod summary;

pub type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why the read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// the peer sent a close frame
    Closed,
    /// the stream ended without a close frame
    Ended,
    ReadError,
    DecodeError,
    OutputError,
}

/// Connects, subscribes and prints summaries to stdout until the feed ends
/// or ctrl-c is pressed.
pub async fn run(config: &Config) -> Result<()> {
    // ctrl-c during the handshake is picked up once the session starts
    let Some(interrupt) = arm_interrupt().await else {
        info!("interrupt");
        return Ok(());
    };
    let ws_stream = connect(config).await?;
    let request = SubscribeRequest::new(&config.streams);
    run_session(ws_stream, &request, io::stdout(), interrupt).await
}

pub async fn connect(config: &Config) -> Result<FeedStream> {
    let url = config.endpoint()?;
    info!("connecting to websocket at {}", url);

    let tls = TlsConnector::new().context("failed to build tls connector")?;
    let (ws_stream, _) =
        connect_async_tls_with_config(url.as_str(), None, false, Some(Connector::NativeTls(tls)))
            .await
            .context("dial")?;
    debug!("connection successful");

    Ok(ws_stream)
}

type Interrupt = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Installs the ctrl-c handler right away by polling it once. `None` means
/// an interrupt already arrived.
async fn arm_interrupt() -> Option<Interrupt> {
    let mut interrupt: Interrupt = Box::pin(interrupted());
    match futures_util::poll!(interrupt.as_mut()) {
        Poll::Ready(()) => None,
        Poll::Pending => Some(interrupt),
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // without a handler we can only wait for the feed to end
        error!("failed to listen for interrupt: {:?}", e);
        std::future::pending::<()>().await;
    }
}

/// Drives one subscribed session over an established connection.
///
/// The read loop runs on its own task and owns the read half, the write half
/// stays here for the subscription and the close frame. Returns once the read
/// loop finished, or right after a failed close frame send. Once the close
/// frame is out, the wait for the peer to acknowledge it is unbounded.
pub async fn run_session<T, W, F>(
    ws_stream: WebSocketStream<T>,
    request: &SubscribeRequest,
    out: W,
    shutdown: F,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    W: Write + Send + 'static,
    F: Future<Output = ()>,
{
    let (mut write, read) = ws_stream.split();

    let mut reader = tokio::spawn(read_loop(read, out));

    let payload = serde_json::to_string(request)?;
    if let Err(e) = write.send(Message::Text(payload)).await {
        reader.abort();
        return Err(e).context("write");
    }
    info!("subscribed to {:?}", request.params);

    tokio::pin!(shutdown);
    tokio::select! {
        result = &mut reader => log_reader_exit(result),
        _ = &mut shutdown => {
            info!("interrupt");
            if let Err(e) = write.send(normal_close()).await {
                error!("write close: {:?}", e);
                reader.abort();
                return Ok(());
            }
            log_reader_exit(reader.await);
        }
    }

    Ok(())
}

fn normal_close() -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    }))
}

fn log_reader_exit(result: std::result::Result<Termination, JoinError>) {
    match result {
        Ok(termination) => info!("read loop finished: {:?}", termination),
        Err(e) => error!("read loop task failed: {:?}", e),
    }
}

/// Reads frames until the connection fails or closes, writing one summary
/// line to `out` for every kline event that carries a symbol.
pub async fn read_loop<S, W>(mut read: S, mut out: W) -> Termination
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
    W: Write,
{
    while let Some(message) = read.next().await {
        let payload = match message {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(frame)) => {
                info!("connection closed by peer: {:?}", frame);
                return Termination::Closed;
            }
            Ok(_) => continue,
            Err(e) => {
                error!("read: {:?}", e);
                return Termination::ReadError;
            }
        };
        debug!("message received: {:?}", String::from_utf8_lossy(&payload));

        let event = match KlineEvent::from_slice(&payload) {
            Ok(event) => event,
            Err(e) => {
                error!("failed to parse message: {:?}", e);
                return Termination::DecodeError;
            }
        };

        let Some(line) = summary::summary_line(&event) else {
            debug!("skipping frame without symbol");
            continue;
        };
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            error!("failed to write summary: {:?}", e);
            return Termination::OutputError;
        }
    }

    warn!("stream ended without a close frame");
    Termination::Ended
}
