pub mod endpoint;
pub mod model;
pub mod watch;

pub use model::{NoteDuration, PlayerState, Setlist, Song, Tempo, TimeSignature};
pub use watch::Category;
