use crate::config::Config;
use anyhow::Result;
use clap::Args;
use codeweave_editor::{PeerId, PeerMessage};
use codeweave_workspace::{SessionHandle, SessionRegistry, WorkspaceError};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

const OUTBOX_BUFFER: usize = 256;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// File to open
    pub input: PathBuf,

    /// Peer id used for messages arriving on stdin
    #[arg(long, default_value = "stdio")]
    pub peer: String,

    /// Do not watch the file for external changes
    #[arg(long)]
    pub no_watch: bool,
}

/// Open `input` in a session and speak the peer protocol as JSON lines:
/// one `PeerMessage` per line on stdin, one per line on stdout.
pub fn serve(args: ServeArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(args, config))
}

async fn run(args: ServeArgs, config: Config) -> Result<()> {
    let registry = SessionRegistry::new(config.profiles()?, config.sync.clone());
    let handle = registry.open_file(&args.input).await?;
    let _watcher = if args.no_watch {
        None
    } else {
        Some(handle.watch(args.input.clone(), &config.watch)?)
    };

    let peer = PeerId::new(args.peer);
    let (tx, rx) = mpsc::channel(OUTBOX_BUFFER);
    handle.subscribe(peer.clone(), tx).await?;
    info!(session = %handle.id(), peer = %peer, path = %args.input.display(), "Serving");

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let result = tokio::select! {
        result = pump(&handle, &peer, rx, stdin, stdout) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };

    registry.close_all().await;
    result
}

/// Forward lines from `input` to the session and messages for `peer` to
/// `output` until either side ends
pub async fn pump<R, W>(
    handle: &SessionHandle,
    peer: &PeerId,
    mut outbox: mpsc::Receiver<PeerMessage>,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !line.trim().is_empty() {
                        forward(handle, peer, &line).await?;
                    }
                }
                None => break,
            },
            message = outbox.recv() => match message {
                Some(message) => write_line(&mut output, &message).await?,
                // The session dropped this peer
                None => break,
            },
        }
    }

    while let Ok(message) = outbox.try_recv() {
        write_line(&mut output, &message).await?;
    }
    output.flush().await?;
    Ok(())
}

async fn forward(handle: &SessionHandle, peer: &PeerId, line: &str) -> Result<()> {
    let message: PeerMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed message");
            return Ok(());
        }
    };
    if &message.session_id != handle.id() {
        warn!(expected = %handle.id(), got = %message.session_id, "Ignoring message for another session");
        return Ok(());
    }

    match handle.message(peer.clone(), message).await {
        Ok(()) => Ok(()),
        Err(WorkspaceError::Session(e)) if e.is_recoverable() => {
            warn!(peer = %peer, error = %e, "Message not applied");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, message: &PeerMessage) -> Result<()> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
