pub mod config;
pub mod palette;

pub use config::{Config, Filter};
pub use palette::{PaletteKind, PaletteRecord, MAX_ID_LEN};
