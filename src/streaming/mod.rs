//! Progressive texture streaming and the abstract render boundary.

mod streamer;
mod target;

pub use streamer::{StreamEvent, TileGrid, TileStreamer};
pub use target::{
    LoadPoll, LoadTicket, RenderTarget, SphereHandle, TextureHandle, TextureLoader,
};
