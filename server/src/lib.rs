//! # Pong Session Server Library
//!
//! Authoritative server for two-player Pong matches. Players connect over
//! TCP, are paired into rooms by the matchmaking registry, and receive the
//! room's simulated state at a fixed tick rate until one of them wins or
//! leaves.
//!
//! ## Core Responsibilities
//!
//! ### Matchmaking
//! A new player is seated in the oldest room where a lone player is waiting,
//! or in a fresh room otherwise. Seats are fixed for the life of a room; a
//! later arrival in a half-empty room takes whichever seat is free.
//!
//! ### Authoritative Simulation
//! Each room owns its ball, paddles and scores. Clients only send intents
//! (`Ready`, `PaddleMove`); the room clamps and applies them and is the only
//! source of truth for positions, scores and the winner.
//!
//! ### Room Lifecycle
//! A room moves through `Waiting -> Pending -> Active -> Ended`:
//! - `Waiting`: zero or one player seated
//! - `Pending`: both seats filled, waiting for both `Ready`s
//! - `Active`: the tick driver runs the simulation and broadcasts snapshots
//! - `Ended`: a winner is fixed; the room lingers for a grace period
//!
//! Leaving an active match forfeits it to the opponent.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Process-wide room table, matchmaking, delayed release and the periodic
//! sweep of abandoned rooms.
//!
//! ### Room Module (`room`)
//! The per-room lifecycle state machine and its tick driver. All changes to
//! a room are serialized behind the room's own lock, so rooms never block
//! one another.
//!
//! ### Game Module (`game`)
//! Seats, ball and RNG of one room, stepped by the shared physics.
//!
//! ### Connection Module (`connection`)
//! Maps one client's inbound packets onto its room.
//!
//! ### Network Module (`network`)
//! TCP listener, protocol handshake and the reader and writer tasks of each
//! connection.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new("127.0.0.1:3000", ServerConfig::default()).await?;
//!
//!     // Accepts players, pairs them into rooms and sweeps abandoned rooms
//!     // until the future is dropped.
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod network;
pub mod registry;
pub mod room;
