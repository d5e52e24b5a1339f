//! Song Resolver
//!
//! Matches free-text song suggestions ("Song by Artist") against the Spotify
//! catalog. Each suggestion is searched with a field-constrained query first
//! and, when that finds nothing, with a loose free-text query. Suggestions
//! that cannot be split or matched are dropped without failing the batch.

use crate::error::{AppError, Result};
use crate::models::ResolvedTrack;
use crate::services::spotify::MusicCatalog;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SongResolver {
    catalog: Arc<dyn MusicCatalog>,
    concurrency: usize,
}

impl SongResolver {
    pub fn new(catalog: Arc<dyn MusicCatalog>, concurrency: usize) -> Self {
        Self {
            catalog,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve every entry, keeping input order and skipping the ones that fail.
    pub async fn resolve(&self, entries: &[String], access_token: &str) -> Vec<ResolvedTrack> {
        let resolved: Vec<ResolvedTrack> = stream::iter(entries.iter().cloned())
            .map(|entry| async move {
                match self.resolve_entry(&entry, access_token).await {
                    Ok(Some(track)) => Some(track),
                    Ok(None) => {
                        debug!("No Spotify match for '{}'", entry);
                        None
                    }
                    Err(e) => {
                        warn!("Error processing song '{}': {}", entry, e);
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .filter_map(|track| async move { track })
            .collect()
            .await;

        debug!("Resolved {} of {} song suggestions", resolved.len(), entries.len());

        resolved
    }

    /// Resolve a single entry. `Ok(None)` means the entry was unusable or unmatched.
    pub async fn resolve_entry(
        &self,
        entry: &str,
        access_token: &str,
    ) -> Result<Option<ResolvedTrack>> {
        let Some((name, artist)) = split_song_entry(entry) else {
            debug!("Skipping '{}': no 'by' or '-' delimiter", entry);
            return Ok(None);
        };

        let exact_query = format!("track:{} artist:{}", name, artist);
        let mut results = self
            .catalog
            .search_tracks(access_token, &exact_query, 1)
            .await?;

        if results.is_empty() {
            let loose_query = format!("{} {}", name, artist);
            results = self
                .catalog
                .search_tracks(access_token, &loose_query, 1)
                .await?;
        }

        match results.into_iter().next() {
            Some(track) => ResolvedTrack::try_from(track)
                .map(Some)
                .map_err(AppError::Catalog),
            None => Ok(None),
        }
    }
}

/// Split "Song by Artist" (or "Song - Artist") into trimmed name and artist.
///
/// "by" is matched case-insensitively anywhere in the entry and only its
/// first occurrence splits; the hyphen is only tried when there is no "by".
pub fn split_song_entry(entry: &str) -> Option<(&str, &str)> {
    let (name, artist) = match find_ignore_ascii_case(entry, "by") {
        Some(idx) => (&entry[..idx], &entry[idx + 2..]),
        None => entry.split_once('-')?,
    };

    Some((name.trim(), artist.trim()))
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogPlaylist, CatalogTrack};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Catalog answering searches from a fixed query table and recording every query
    #[derive(Default)]
    struct FakeCatalog {
        results: HashMap<String, CatalogTrack>,
        failing: Vec<String>,
        queries: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn with_hit(mut self, query: &str, id: &str, name: &str, artist: &str) -> Self {
            self.results.insert(
                query.to_string(),
                CatalogTrack {
                    id: id.to_string(),
                    name: name.to_string(),
                    artists: vec![artist.to_string()],
                    uri: format!("spotify:track:{}", id),
                },
            );
            self
        }

        fn with_failure(mut self, query: &str) -> Self {
            self.failing.push(query.to_string());
            self
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MusicCatalog for FakeCatalog {
        async fn search_tracks(
            &self,
            _access_token: &str,
            query: &str,
            limit: usize,
        ) -> Result<Vec<CatalogTrack>> {
            assert_eq!(limit, 1);
            self.queries.lock().unwrap().push(query.to_string());
            if self.failing.iter().any(|q| q == query) {
                return Err(AppError::Catalog("API returned status: 500".to_string()));
            }
            Ok(self.results.get(query).cloned().into_iter().collect())
        }

        async fn current_user_id(&self, _access_token: &str) -> Result<String> {
            unreachable!("resolver never looks up the user")
        }

        async fn create_playlist(
            &self,
            _access_token: &str,
            _user_id: &str,
            _name: &str,
        ) -> Result<CatalogPlaylist> {
            unreachable!("resolver never creates playlists")
        }

        async fn add_tracks(
            &self,
            _access_token: &str,
            _playlist_id: &str,
            _uris: &[String],
        ) -> Result<()> {
            unreachable!("resolver never adds tracks")
        }
    }

    fn entries(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_split_by_any_case() {
        assert_eq!(
            split_song_entry("Yellow by Coldplay"),
            Some(("Yellow", "Coldplay"))
        );
        assert_eq!(
            split_song_entry("Yellow BY Coldplay"),
            Some(("Yellow", "Coldplay"))
        );
        assert_eq!(
            split_song_entry("Yellow By Coldplay"),
            Some(("Yellow", "Coldplay"))
        );
    }

    #[test]
    fn test_split_on_first_by_only() {
        assert_eq!(
            split_song_entry("Stand by Me by Ben E. King"),
            Some(("Stand", "Me by Ben E. King"))
        );
        // "by" inside a word still counts as the delimiter
        assert_eq!(
            split_song_entry("Baby Shark by Pinkfong"),
            Some(("Ba", "Shark by Pinkfong"))
        );
    }

    #[test]
    fn test_split_hyphen_fallback() {
        assert_eq!(
            split_song_entry("Tum Hi Ho - Arijit Singh"),
            Some(("Tum Hi Ho", "Arijit Singh"))
        );
        assert_eq!(
            split_song_entry("Jump-Van Halen - 1984"),
            Some(("Jump", "Van Halen - 1984"))
        );
    }

    #[test]
    fn test_split_without_delimiter() {
        assert_eq!(split_song_entry("Here are ten songs:"), None);
        assert_eq!(split_song_entry(""), None);
    }

    #[test]
    fn test_split_keeps_empty_parts() {
        assert_eq!(split_song_entry("by Coldplay"), Some(("", "Coldplay")));
        assert_eq!(split_song_entry("Yellow -"), Some(("Yellow", "")));
    }

    #[tokio::test]
    async fn test_exact_match_skips_loose_search() {
        let catalog = Arc::new(FakeCatalog::default().with_hit(
            "track:Yellow artist:Coldplay",
            "y1",
            "Yellow",
            "Coldplay",
        ));
        let resolver = SongResolver::new(catalog.clone(), 1);

        let tracks = resolver
            .resolve(&entries(&["Yellow by Coldplay"]), "token")
            .await;

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "y1");
        assert_eq!(catalog.queries(), vec!["track:Yellow artist:Coldplay"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_loose_search() {
        let catalog = Arc::new(FakeCatalog::default().with_hit(
            "Tum Hi Ho Arijit Singh",
            "t1",
            "Tum Hi Ho",
            "Arijit Singh",
        ));
        let resolver = SongResolver::new(catalog.clone(), 1);

        let tracks = resolver
            .resolve(&entries(&["Tum Hi Ho - Arijit Singh"]), "token")
            .await;

        assert_eq!(
            tracks,
            vec![ResolvedTrack {
                id: "t1".to_string(),
                name: "Tum Hi Ho".to_string(),
                artist: "Arijit Singh".to_string(),
                uri: "spotify:track:t1".to_string(),
            }]
        );
        assert_eq!(
            catalog.queries(),
            vec!["track:Tum Hi Ho artist:Arijit Singh", "Tum Hi Ho Arijit Singh"]
        );
    }

    #[tokio::test]
    async fn test_failed_entry_does_not_abort_batch() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with_hit("track:One artist:Metallica", "1", "One", "Metallica")
                .with_failure("track:Two artist:Nobody")
                .with_hit("track:Three artist:Whoever", "3", "Three", "Whoever"),
        );
        let resolver = SongResolver::new(catalog, 1);

        let tracks = resolver
            .resolve(
                &entries(&["One by Metallica", "Two by Nobody", "Three by Whoever"]),
                "token",
            )
            .await;

        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_unmatched_and_unparseable_entries_are_dropped() {
        let catalog = Arc::new(FakeCatalog::default().with_hit(
            "track:Creep artist:Radiohead",
            "c1",
            "Creep",
            "Radiohead",
        ));
        let resolver = SongResolver::new(catalog.clone(), 1);

        let tracks = resolver
            .resolve(
                &entries(&["Sure! Here are some songs:", "Imaginary by Nobody", "Creep by Radiohead"]),
                "token",
            )
            .await;

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Creep");
        // The unparseable line never reaches the catalog
        assert_eq!(catalog.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let catalog = Arc::new(FakeCatalog::default().with_hit(
            "track:Yellow artist:Coldplay",
            "y1",
            "Yellow",
            "Coldplay",
        ));
        let resolver = SongResolver::new(catalog, 1);

        let tracks = resolver
            .resolve(&entries(&["Yellow by Coldplay", "Yellow by Coldplay"]), "token")
            .await;

        assert_eq!(tracks.len(), 2);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_resolve_future_is_send() {
        let resolver = SongResolver::new(Arc::new(FakeCatalog::default()), 2);
        let lines = entries(&["A by X"]);
        // Request handlers hold this future across awaits
        let future = resolver.resolve(&lines, "token");
        assert_send(&future);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_keeps_order() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with_hit("track:A artist:X", "a", "A", "X")
                .with_hit("B Y", "b", "B", "Y")
                .with_hit("track:C artist:Z", "c", "C", "Z"),
        );
        let resolver = SongResolver::new(catalog, 3);

        let tracks = resolver
            .resolve(&entries(&["A by X", "B - Y", "C by Z"]), "token")
            .await;

        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
