//! The engine's pluggable playback components: the audio transport, the
//! resumable segment player, and the durable offset store.

pub mod audio;
pub mod player;
pub mod store;
