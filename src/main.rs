//! Cube Tetris runner (default binary).
//!
//! Without arguments it runs the room relay server: a tokio TCP server feeding
//! a synchronous game loop that ticks every session at `TICK_MS`.
//! `cube-tetris play [--host H] [--port P] [--room R] [--name N]` runs the
//! keyboard client instead.

use std::time::{Duration, Instant};

use anyhow::Result;

use cube_tetris::adapter::{Adapter, Relay, ServerConfig};
use cube_tetris::client::{parse_play_args, run_play};
use cube_tetris::types::TICK_MS;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(config) = parse_play_args(&args)? {
        return run_play(&config);
    }
    if let Some(arg) = args.first() {
        anyhow::bail!("unknown command: {} (expected no arguments or `play`)", arg);
    }

    serve(ServerConfig::from_env())
}

fn serve(config: ServerConfig) -> Result<()> {
    let mut relay = Relay::from_config(&config);
    println!(
        "[Server] Randomizer {}, base seed {}",
        config.randomizer.as_str(),
        config.seed
    );
    let mut adapter = Adapter::start(config)?;
    println!("[Server] Game loop running on {}", adapter.local_addr());

    let tick_duration = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();

    loop {
        while let Some(cmd) = adapter.try_recv() {
            relay.handle(cmd, &mut |msg| adapter.send(msg));
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_duration {
            last_tick = Instant::now();
            let elapsed_ms = elapsed.as_millis().min(u32::MAX as u128) as u32;
            relay.tick(elapsed_ms, &mut |msg| adapter.send(msg));
        } else {
            std::thread::sleep((tick_duration - elapsed).min(Duration::from_millis(2)));
        }
    }
}
