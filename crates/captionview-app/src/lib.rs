pub mod caption;
pub mod error;
pub mod playback;
pub mod session;
pub mod settings;

pub use caption::{Caption, CaptionCompositor, CaptionStore, MatchPolicy};
pub use error::PlayerError;
pub use playback::{PlaybackConfig, PlayerController};
pub use session::{CaptionSession, SessionView};
pub use settings::Settings;
