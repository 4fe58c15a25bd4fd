//! Track enumeration
//!
//! Scans a directory for `.wav` files and exposes them as an ordered, stable
//! list. Enumeration failure is fatal for the sender: there is nothing to
//! stream without tracks.

use std::path::{Path, PathBuf};

use crate::error::TrackError;

/// Ordered list of track paths
pub struct Playlist {
    tracks: Vec<PathBuf>,
}

impl Playlist {
    /// Scan `dir` for .wav files, sorted by file name.
    ///
    /// A missing directory or a directory without any .wav file yields
    /// [`TrackError::NoTracks`].
    pub fn scan(dir: &Path) -> Result<Self, TrackError> {
        if !dir.is_dir() {
            return Err(TrackError::NoTracks(dir.display().to_string()));
        }

        let mut tracks: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| TrackError::NoTracks(format!("{}: {}", dir.display(), e)))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"))
            })
            .collect();
        tracks.sort();

        if tracks.is_empty() {
            return Err(TrackError::NoTracks(dir.display().to_string()));
        }

        tracing::info!("Found {} tracks in {}", tracks.len(), dir.display());
        Ok(Self { tracks })
    }

    /// Build a playlist from explicit paths (tests, fixed setups)
    pub fn from_paths(tracks: Vec<PathBuf>) -> Result<Self, TrackError> {
        if tracks.is_empty() {
            return Err(TrackError::NoTracks("<explicit list>".to_string()));
        }
        Ok(Self { tracks })
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.tracks.get(index).map(PathBuf::as_path)
    }

    /// Index after `index`, wrapping modulo the track count
    pub fn wrap_next(&self, index: usize) -> usize {
        (index + 1) % self.tracks.len()
    }

    /// Index before `index`, wrapping modulo the track count
    pub fn wrap_prev(&self, index: usize) -> usize {
        (index + self.tracks.len() - 1) % self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist_of(n: usize) -> Playlist {
        Playlist::from_paths((0..n).map(|i| PathBuf::from(format!("{i}.wav"))).collect())
            .unwrap()
    }

    #[test]
    fn test_scan_sorted_wav_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.wav"), b"").unwrap();
        std::fs::write(dir.path().join("a.wav"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("c.WAV"), b"").unwrap();

        let playlist = Playlist::scan(dir.path()).unwrap();
        assert_eq!(playlist.len(), 3);
        let names: Vec<_> = (0..3)
            .map(|i| playlist.get(i).unwrap().file_name().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["a.wav", "b.wav", "c.WAV"]);
    }

    #[test]
    fn test_scan_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            Playlist::scan(&missing),
            Err(TrackError::NoTracks(_))
        ));
    }

    #[test]
    fn test_scan_empty_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Playlist::scan(dir.path()),
            Err(TrackError::NoTracks(_))
        ));
    }

    #[test]
    fn test_wrap_next_prev() {
        let playlist = playlist_of(3);
        assert_eq!(playlist.wrap_next(0), 1);
        assert_eq!(playlist.wrap_next(2), 0);
        assert_eq!(playlist.wrap_prev(0), 2);
        assert_eq!(playlist.wrap_prev(1), 0);
    }

    #[test]
    fn test_n_minus_one_nexts_return_to_start() {
        for n in 1..6 {
            let playlist = playlist_of(n);
            for start in 0..n {
                let mut index = start;
                for _ in 0..n {
                    index = playlist.wrap_next(index);
                }
                assert_eq!(index, start);

                let mut index = start;
                index = playlist.wrap_next(index);
                index = playlist.wrap_prev(index);
                assert_eq!(index, start);
            }
        }
    }

    #[test]
    fn test_single_track_wraps_to_itself() {
        let playlist = playlist_of(1);
        assert_eq!(playlist.wrap_next(0), 0);
        assert_eq!(playlist.wrap_prev(0), 0);
    }
}
