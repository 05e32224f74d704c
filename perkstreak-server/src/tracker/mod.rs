//! Tracker core: progress data, the rules that mutate it, persistence,
//! view derivation and the overlay bridge.

pub mod assignment;
pub mod completion;
pub mod overlay;
pub mod progress;
pub mod settings;
pub mod state;
pub mod storage;
pub mod view;
