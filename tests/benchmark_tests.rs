//! Performance benchmarks and stress tests for core components

use rand::rngs::StdRng;
use rand::SeedableRng;
use server::config::ServerConfig;
use server::game::GameState;
use server::registry::SessionRegistry;
use server::room::PhaseKind;
use shared::physics::advance;
use shared::{read_packet, write_packet, Ball, GameConfig, Packet, PlayerSlot, Slot};
use std::time::Instant;
use tokio::sync::mpsc;

/// Benchmarks the raw ball integration step
#[test]
fn benchmark_ball_advance() {
    let config = GameConfig::default();
    let left = PlayerSlot::new(1, &config);
    let right = PlayerSlot::new(2, &config);
    let mut ball = Ball {
        x: 400.0,
        y: 200.0,
        velocity_x: config.ball_speed,
        velocity_y: config.ball_speed * 0.7,
    };

    let iterations = 1_000_000;
    let dt = config.tick_dt();
    let start = Instant::now();

    for _ in 0..iterations {
        let (next, scored) = advance(&config, ball, Some(&left), Some(&right), dt);
        ball = match scored {
            Some(_) => Ball {
                x: 400.0,
                y: 200.0,
                ..next
            },
            None => next,
        };
    }

    let duration = start.elapsed();
    println!(
        "Ball advance: {} steps in {:?} ({:.2} ns/step)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks stepping many rooms, as one server tick across all of them
#[test]
fn benchmark_room_simulation() {
    let config = GameConfig::default();
    let mut rooms: Vec<GameState> = (0..500)
        .map(|id| {
            let mut game = GameState::with_rng(id, config, StdRng::seed_from_u64(id as u64));
            game.occupy(id * 2);
            game.occupy(id * 2 + 1);
            game.kickoff();
            game
        })
        .collect();

    let frames = 600;
    let start = Instant::now();

    for frame in 0..frames {
        for game in &mut rooms {
            let y = (frame % 300) as f32;
            game.set_paddle(Slot::One, y);
            game.set_paddle(Slot::Two, y);
            game.step();
        }
    }

    let duration = start.elapsed();
    println!(
        "Room simulation: {} rooms × {} frames in {:?} ({:.2} μs/frame)",
        rooms.len(),
        frames,
        duration,
        duration.as_micros() as f64 / frames as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks snapshot framing, the hottest path on the wire
#[tokio::test]
async fn benchmark_snapshot_framing() {
    let mut game = GameState::with_rng(1, GameConfig::default(), StdRng::seed_from_u64(9));
    game.occupy(1);
    game.occupy(2);
    let packet = Packet::GameStateUpdate(game.snapshot(true, false, None));

    let iterations = 10_000;
    let start = Instant::now();

    let mut buffer: Vec<u8> = Vec::new();
    for _ in 0..iterations {
        write_packet(&mut buffer, &packet).await.unwrap();
    }

    let mut reader = buffer.as_slice();
    let mut decoded = 0;
    while let Some(received) = read_packet(&mut reader).await.unwrap() {
        assert_eq!(received, packet);
        decoded += 1;
    }

    let duration = start.elapsed();
    println!(
        "Snapshot framing: {} frames ({} bytes) in {:?}",
        iterations,
        buffer.len(),
        duration
    );

    assert_eq!(decoded, iterations);
    assert!(duration.as_millis() < 2000);
}

/// Stress test: many players arriving at once are paired without leftovers
#[tokio::test]
async fn stress_test_concurrent_matchmaking() {
    let registry = SessionRegistry::new(&ServerConfig::default());
    let players = 400;

    let start = Instant::now();
    let mut tasks = Vec::new();
    for identity in 0..players {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let (tx, rx) = mpsc::channel(16);
            let placed = registry.assign(identity, tx).await.unwrap();
            (placed, rx)
        }));
    }

    let mut receivers = Vec::new();
    for task in tasks {
        let (_, rx) = task.await.unwrap();
        receivers.push(rx);
    }
    let duration = start.elapsed();
    println!("Matchmaking: {} players in {:?}", players, duration);

    assert_eq!(registry.len().await, (players / 2) as usize);
    for id in registry.room_ids().await {
        let room = registry.get(id).await.unwrap();
        assert_eq!(room.occupants().await, 2);
        assert_eq!(room.phase().await, PhaseKind::Pending);
    }
}
