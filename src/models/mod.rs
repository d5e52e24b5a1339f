pub mod auth;
pub mod emotion;
pub mod playlist;
pub mod track;

pub use auth::{AuthUrlResponse, CallbackRequest, TokenInfo};
pub use emotion::{DetectEmotionRequest, EmotionLabel, EmotionResponse};
pub use playlist::{
    CreatePlaylistRequest, CreatedPlaylist, GenerateSongsRequest, GenerateSongsResponse,
    PlaylistRequest, PlaylistSource,
};
pub use track::{CatalogPlaylist, CatalogTrack, ResolvedTrack};
