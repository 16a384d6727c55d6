//! 인메모리 저장소 모듈.

pub mod watchlist;

pub use watchlist::{Watchlist, WatchlistItem, WatchlistStore};
