//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for enqueuing and managing
//! torrents on an external download client (qBittorrent).

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use types::*;
