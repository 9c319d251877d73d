//! Terminal chat client
//!
//! Connects to the server, negotiates a username interactively, then pumps
//! input lines to the server and server text to the output until either
//! side goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::AppError;
use crate::message::Verdict;
use crate::negotiator::HANDSHAKE_BUFFER_SIZE;
use crate::types::{Username, MAX_USERNAME_LEN};

/// Read the server's verdict without consuming anything after it
///
/// `badUsername` is one byte shorter than `goodUsername`, so the first 11
/// bytes decide which one is coming.
pub async fn read_verdict<R>(reader: &mut R) -> std::io::Result<Verdict>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; 11];
    reader.read_exact(&mut head).await?;
    if &head[..] == Verdict::BAD_TOKEN.as_bytes() {
        return Ok(Verdict::Bad);
    }

    let mut tail = [0u8; 1];
    reader.read_exact(&mut tail).await?;
    if head[..] == Verdict::GOOD_TOKEN.as_bytes()[..11] && tail[0] == b'e' {
        Ok(Verdict::Good)
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "unexpected username verdict",
        ))
    }
}

/// Client configured with the server address
#[derive(Debug, Clone)]
pub struct ChatClient {
    addr: String,
}

impl ChatClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Connect and run a full session on the given input and output
    ///
    /// Connection failure is returned as an error; a session that ends
    /// because the server or the input closed is a normal return.
    pub async fn run<I, O>(&self, mut input: I, mut output: O) -> Result<(), AppError>
    where
        I: AsyncBufRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let mut stream = TcpStream::connect(&self.addr).await?;
        let peer = stream.peer_addr()?;
        output
            .write_all(format!("Connecting to {} SERVER ...\n", peer).as_bytes())
            .await?;
        output.flush().await?;

        let username = choose_username(&mut input, &mut output, &mut stream).await?;
        debug!("Joined as '{}'", username);

        let session = ClientSession::new();
        session.run(stream, input, output).await;
        Ok(())
    }
}

/// Prompt until the server accepts a name
async fn choose_username<I, O>(
    input: &mut I,
    output: &mut O,
    stream: &mut TcpStream,
) -> Result<Username, AppError>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    loop {
        output.write_all(b"Enter your username : ").await?;
        output.flush().await?;

        let mut line = String::new();
        if input.read_line(&mut line).await? == 0 {
            return Err(AppError::InputClosed);
        }

        let username = match Username::parse(&line) {
            Ok(username) => username,
            Err(e) => {
                debug!("Username pre-check failed: {}", e);
                output
                    .write_all(
                        format!(
                            "[ERROR] Your username must not be empty or exceed {} characters\n",
                            MAX_USERNAME_LEN
                        )
                        .as_bytes(),
                    )
                    .await?;
                continue;
            }
        };

        stream.write_all(format!("{}\n", username).as_bytes()).await?;

        match read_verdict(stream).await? {
            Verdict::Good => {
                output
                    .write_all(b"[SUCCESS] Your username is accepted by the server\n")
                    .await?;
                output
                    .write_all(b"[SUCCESS] You are successfully connected!\n")
                    .await?;
                output.flush().await?;
                return Ok(username);
            }
            Verdict::Bad => {
                output
                    .write_all(
                        b"[ERROR] Your username already exists in the server, please enter another username\n",
                    )
                    .await?;
            }
        }
    }
}

/// One connected chat session
///
/// Owns the liveness flag shared by the two pumps.
#[derive(Debug, Clone)]
pub struct ClientSession {
    connected: Arc<AtomicBool>,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSession {
    pub fn new() -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Run both pumps until one of them stops, then stop the other
    ///
    /// A pump blocked on local input cannot be interrupted when reading from
    /// the process's stdin; the user has to press enter.
    pub async fn run<I, O>(&self, stream: TcpStream, input: I, mut output: O)
    where
        I: AsyncBufRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let (mut read_half, mut write_half) = stream.into_split();

        // Spawn send task (input -> server)
        let send_session = self.clone();
        let mut send_task = tokio::spawn(async move {
            let mut input = input;
            let mut line = String::new();
            loop {
                line.clear();
                let read = input.read_line(&mut line).await;
                if !send_session.is_connected() {
                    break;
                }
                match read {
                    Ok(0) => {
                        debug!("Input closed");
                        break;
                    }
                    Ok(_) => {
                        if let Err(e) = write_half.write_all(line.as_bytes()).await {
                            debug!("Send to server failed: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Input error: {}", e);
                        break;
                    }
                }
            }
            send_session.disconnect();
        });

        // Spawn receive task (server -> output)
        let recv_session = self.clone();
        let mut recv_task = tokio::spawn(async move {
            let mut buf = vec![0u8; HANDSHAKE_BUFFER_SIZE];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) | Err(_) => {
                        if recv_session.is_connected() {
                            let _ = output
                                .write_all(
                                    b"[INFO] Server is down, click Enter to close the session\n",
                                )
                                .await;
                        }
                        break;
                    }
                    Ok(n) => {
                        if output.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                        let _ = output.flush().await;
                    }
                }
            }
            recv_session.disconnect();
        });

        // Wait for either task to complete, then stop the other
        tokio::select! {
            _ = &mut send_task => {
                debug!("Send task completed");
                self.disconnect();
                recv_task.abort();
                let _ = recv_task.await;
            }
            _ = &mut recv_task => {
                debug!("Receive task completed");
                self.disconnect();
                send_task.abort();
                let _ = send_task.await;
            }
        }
    }
}
