use serde::{Deserialize, Serialize};

/// A track as returned by a catalog search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    /// Credited artists, main artist first
    pub artists: Vec<String>,
    pub uri: String,
}

/// A song suggestion that was matched against the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub uri: String,
}

impl TryFrom<CatalogTrack> for ResolvedTrack {
    type Error = String;

    fn try_from(track: CatalogTrack) -> Result<Self, Self::Error> {
        let artist = track
            .artists
            .into_iter()
            .next()
            .ok_or_else(|| format!("Track {} has no artists", track.id))?;

        Ok(ResolvedTrack {
            id: track.id,
            name: track.name,
            artist,
            uri: track.uri,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPlaylist {
    pub id: String,
    pub external_url: String,
}
