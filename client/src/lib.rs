//! # Pong Client Library
//!
//! Headless client for the Pong session server. It speaks the same framed
//! protocol as a real player and is used for load testing and end-to-end
//! checks.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Mirrors the room as reported by the server and decides where the own
//! paddle should go next. Paddle movement is limited to the paddle speed per
//! tick, like a human holding a key.
//!
//! ### Network Module (`network`)
//! TCP connection, handshake, and the loop that answers `RoomReady` with
//! `Ready` and streams `PaddleMove` intents while the match is running.

pub mod game;
pub mod network;
