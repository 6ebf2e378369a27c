pub mod pipeline;
pub mod session;

pub use pipeline::{palette_from_media, palettify, CancelToken, Progress};
pub use session::{Session, SessionState};
