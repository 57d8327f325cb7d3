//! Keyboard client for the room relay (`cube-tetris play`).
//!
//! Connects over TCP, joins a room, forwards key presses as intents and
//! prints a one-line status of the player's own session.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossterm::event::{self, Event};
use crossterm::{cursor, execute, style, terminal};

use crate::adapter::protocol::{
    create_command, create_hello, create_leave, parse_server_message, AssignmentMessage,
    ObservationMessage, ServerMessage, WelcomeMessage, DEFAULT_ROOM, PROTOCOL_VERSION,
};
use crate::input::{should_quit, IntentBatch};
use crate::types::{Intent, TICK_MS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayConfig {
    pub host: String,
    pub port: u16,
    pub room: String,
    pub name: String,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 7878,
            room: DEFAULT_ROOM.to_string(),
            name: String::from("cube-tetris-play"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    Welcome(WelcomeMessage),
    Assignment(AssignmentMessage),
    Observation(Box<ObservationMessage>),
    Error(String),
    Closed,
}

pub fn parse_play_args(args: &[String]) -> Result<Option<PlayConfig>> {
    if args.is_empty() || args[0] != "play" {
        return Ok(None);
    }

    let mut config = PlayConfig::default();
    let mut i = 1usize;
    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        let value = args
            .get(i)
            .ok_or_else(|| anyhow!("play: missing value for {}", flag))?;
        match flag {
            "--host" => config.host = value.clone(),
            "--port" => {
                config.port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("play: invalid --port value: {}", value))?;
            }
            "--room" => config.room = value.clone(),
            "--name" => config.name = value.clone(),
            other => return Err(anyhow!("play: unknown argument: {}", other)),
        }
        i += 1;
    }

    if config.room.trim().is_empty() {
        return Err(anyhow!("play: --room must not be empty"));
    }

    Ok(Some(config))
}

fn parse_server_line(line: &str) -> Option<ClientEvent> {
    match parse_server_message(line) {
        Ok(ServerMessage::Welcome(w)) => Some(ClientEvent::Welcome(w)),
        Ok(ServerMessage::Assignment(a)) => Some(ClientEvent::Assignment(a)),
        Ok(ServerMessage::Observation(o)) => Some(ClientEvent::Observation(o)),
        Ok(ServerMessage::Error(e)) => Some(ClientEvent::Error(format!("{:?}: {}", e.code, e.message))),
        Ok(ServerMessage::Ack(_)) => None,
        Err(e) => Some(ClientEvent::Error(format!("play: bad server line: {}", e))),
    }
}

/// Connected player: writes commands, reads server events on a thread
pub struct PlayClient {
    stream: TcpStream,
    seq: u64,
}

impl PlayClient {
    pub fn connect(config: &PlayConfig) -> Result<(Self, mpsc::Receiver<ClientEvent>)> {
        let stream = TcpStream::connect((config.host.as_str(), config.port))
            .map_err(|e| anyhow!("play: connect {}:{} failed: {}", config.host, config.port, e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| anyhow!("play: set_nodelay failed: {}", e))?;

        let reader = stream.try_clone()?;
        let (tx, rx) = mpsc::channel::<ClientEvent>();
        thread::spawn(move || {
            let reader = BufReader::new(reader);
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        let _ = tx.send(ClientEvent::Error(format!("play: read error: {}", e)));
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(event) = parse_server_line(&line) {
                    let _ = tx.send(event);
                }
            }
            let _ = tx.send(ClientEvent::Closed);
        });

        let mut client = Self { stream, seq: 0 };
        let hello = create_hello(client.next_seq(), &config.name, PROTOCOL_VERSION, &config.room);
        client.write_line(&serde_json::to_string(&hello)?)?;
        Ok((client, rx))
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\n")?;
        self.stream.flush()?;
        Ok(())
    }

    pub fn send_intents(&mut self, intents: &[Intent]) -> Result<()> {
        if intents.is_empty() {
            return Ok(());
        }
        let cmd = create_command(self.next_seq(), intents);
        self.write_line(&serde_json::to_string(&cmd)?)
    }

    pub fn leave(&mut self) -> Result<()> {
        let leave = create_leave(self.next_seq());
        self.write_line(&serde_json::to_string(&leave)?)
    }
}

/// What the status line shows
#[derive(Debug, Clone, Default)]
pub struct PlayView {
    pub client_id: Option<u64>,
    pub faces: Vec<usize>,
    pub members: usize,
    pub own: Option<Box<ObservationMessage>>,
    pub last_error: Option<String>,
}

impl PlayView {
    pub fn apply(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Welcome(w) => {
                self.client_id = Some(w.client_id);
                self.faces = w.faces;
                self.members = w.members;
            }
            ClientEvent::Assignment(a) => {
                self.faces = a.faces;
                self.members = a.members;
            }
            ClientEvent::Observation(o) => {
                if Some(o.player_id) == self.client_id {
                    self.own = Some(o);
                }
            }
            ClientEvent::Error(e) => self.last_error = Some(e),
            ClientEvent::Closed => {}
        }
    }

    pub fn status_line(&self, config: &PlayConfig) -> String {
        let mut line = format!(
            "ROOM {} MEMBERS {} FACES {:?}",
            config.room, self.members, self.faces
        );
        match self.own.as_deref() {
            Some(o) => line.push_str(&format!(
                " ACTIVE {} {} SCORE {} LEVEL {} LINES {}",
                o.active_face,
                o.phase.to_uppercase(),
                o.score,
                o.level,
                o.lines
            )),
            None => line.push_str(" WAITING"),
        }
        if let Some(err) = &self.last_error {
            line.push_str(&format!(" | {}", err));
        }
        line
    }
}

/// Run the interactive client until quit or disconnect
pub fn run_play(config: &PlayConfig) -> Result<()> {
    let (mut client, rx) = PlayClient::connect(config)?;
    println!(
        "[Client] Connected to {}:{} as {} (room {})",
        config.host, config.port, config.name, config.room
    );
    println!("[Client] arrows/hjkl/wasd move, up rotate, space drop, q/e face, enter start, esc quit");

    terminal::enable_raw_mode()?;
    let result = play_loop(&mut client, &rx, config);
    let _ = terminal::disable_raw_mode();
    println!();

    let _ = client.leave();
    result
}

fn play_loop(client: &mut PlayClient, rx: &mpsc::Receiver<ClientEvent>, config: &PlayConfig) -> Result<()> {
    let tick = Duration::from_millis(TICK_MS as u64);
    let mut view = PlayView::default();
    let mut batch = IntentBatch::new();
    let mut stdout = std::io::stdout();
    let mut last_send = Instant::now();
    let mut last_line = String::new();

    loop {
        let timeout = tick.checked_sub(last_send.elapsed()).unwrap_or_default();
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if should_quit(key) {
                    return Ok(());
                }
                batch.push_key(key);
            }
        }

        if last_send.elapsed() >= tick {
            last_send = Instant::now();
            client.send_intents(batch.as_slice())?;
            batch.clear();
        }

        while let Ok(event) = rx.try_recv() {
            if matches!(event, ClientEvent::Closed) {
                return Err(anyhow!("play: server closed the connection"));
            }
            view.apply(event);
        }

        let line = view.status_line(config);
        if line != last_line {
            execute!(
                stdout,
                cursor::MoveToColumn(0),
                terminal::Clear(terminal::ClearType::CurrentLine),
                style::Print(&line)
            )?;
            last_line = line;
        }
    }
}
