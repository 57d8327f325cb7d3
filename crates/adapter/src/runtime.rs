//! Adapter runtime integration.
//!
//! Bridges the sync game loop with the async TCP server.

use std::net::SocketAddr;
use std::sync::Arc;

use arrayvec::ArrayVec;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};

use crate::protocol::{
    AckMessage, AssignmentMessage, ErrorMessage, ObservationMessage, WelcomeMessage,
    MAX_INTENTS_PER_COMMAND,
};
use crate::server::{run_server, ClientOutbound, ServerConfig};
use crate::types::Intent;

/// Command delivered to the game loop.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

/// Command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    /// Handshake accepted; join (or create) a room
    Join { room: String, name: String },
    Command(ArrayVec<Intent, MAX_INTENTS_PER_COMMAND>),
    Leave,
    /// Connection closed while in a room
    Disconnect,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Welcome {
        client_id: usize,
        msg: WelcomeMessage,
    },
    Assignment {
        client_id: usize,
        msg: AssignmentMessage,
    },
    Ack {
        client_id: usize,
        msg: AckMessage,
    },
    Error {
        client_id: usize,
        msg: ErrorMessage,
    },
    Observation {
        client_id: usize,
        msg: Arc<ObservationMessage>,
    },
}

impl OutboundMessage {
    pub fn client_id(&self) -> usize {
        match self {
            OutboundMessage::Welcome { client_id, .. }
            | OutboundMessage::Assignment { client_id, .. }
            | OutboundMessage::Ack { client_id, .. }
            | OutboundMessage::Error { client_id, .. }
            | OutboundMessage::Observation { client_id, .. } => *client_id,
        }
    }

    pub(crate) fn into_client_outbound(self) -> (usize, ClientOutbound) {
        match self {
            OutboundMessage::Welcome { client_id, msg } => (client_id, ClientOutbound::Welcome(msg)),
            OutboundMessage::Assignment { client_id, msg } => {
                (client_id, ClientOutbound::Assignment(msg))
            }
            OutboundMessage::Ack { client_id, msg } => (client_id, ClientOutbound::Ack(msg)),
            OutboundMessage::Error { client_id, msg } => (client_id, ClientOutbound::Error(msg)),
            OutboundMessage::Observation { client_id, msg } => {
                (client_id, ClientOutbound::Observation(msg))
            }
        }
    }
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    local_addr: SocketAddr,
}

impl Adapter {
    /// Start the server on its own runtime and wait until it is listening.
    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (ready_tx, ready_rx) = oneshot::channel::<SocketAddr>();

        let rt = Runtime::new()?;
        let server = rt.spawn(async move { run_server(config, cmd_tx, out_rx, Some(ready_tx)).await });

        // A bind failure drops the ready sender; surface the server's error instead.
        let local_addr = match rt.block_on(ready_rx) {
            Ok(addr) => addr,
            Err(_) => {
                return match rt.block_on(server) {
                    Ok(Err(e)) => Err(e),
                    Ok(Ok(())) => Err(anyhow::anyhow!("server stopped before listening")),
                    Err(e) => Err(anyhow::anyhow!("server task failed: {}", e)),
                };
            }
        };

        Ok(Self {
            _rt: rt,
            cmd_rx,
            out_tx,
            local_addr,
        })
    }

    /// Start the adapter from `CUBE_TETRIS_*` environment variables.
    pub fn start_from_env() -> anyhow::Result<Self> {
        Self::start(ServerConfig::from_env())
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
