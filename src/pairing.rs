use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{HardsubError, Result};
use crate::job::MediaPair;

/// Result of scanning a directory tree for video/subtitle pairs
#[derive(Debug, Default)]
pub struct PairingOutcome {
    /// Pairs in subtitle discovery order
    pub pairs: Vec<MediaPair>,
    /// Subtitles with no video of the same stem next to them
    pub unmatched_subtitles: Vec<PathBuf>,
}

pub struct PairMatcher {
    video_extensions: Vec<String>,
    subtitle_extensions: Vec<String>,
}

impl PairMatcher {
    pub fn new<S: AsRef<str>>(video_extensions: &[S], subtitle_extensions: &[S]) -> Self {
        Self {
            video_extensions: normalize_extensions(video_extensions),
            subtitle_extensions: normalize_extensions(subtitle_extensions),
        }
    }

    /// Walk `root` recursively and pair every subtitle with the first unclaimed
    /// video that has the same stem in the same directory.
    pub fn find_pairs<P: AsRef<Path>>(&self, root: P) -> Result<PairingOutcome> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(HardsubError::InvalidInput(format!(
                "Directory {} does not exist",
                root.display()
            )));
        }
        let root = root.canonicalize().map_err(|e| {
            HardsubError::InvalidInput(format!("Cannot resolve {}: {}", root.display(), e))
        })?;

        let mut subtitles = Vec::new();
        let mut videos: HashMap<(PathBuf, OsString), VecDeque<PathBuf>> = HashMap::new();

        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            if has_extension(&path, &self.subtitle_extensions) {
                subtitles.push(path);
            } else if has_extension(&path, &self.video_extensions) {
                if let Some(key) = pairing_key(&path) {
                    videos.entry(key).or_default().push_back(path);
                }
            }
        }

        debug!(
            "Discovered {} subtitle files and {} video stems under {}",
            subtitles.len(),
            videos.len(),
            root.display()
        );

        let mut outcome = PairingOutcome::default();
        for subtitle in subtitles {
            let video = pairing_key(&subtitle)
                .and_then(|key| videos.get_mut(&key))
                .and_then(|candidates| candidates.pop_front());

            match video {
                Some(video) => {
                    debug!("Paired {} with {}", subtitle.display(), video.display());
                    outcome.pairs.push(MediaPair::new(video, subtitle));
                }
                None => {
                    warn!("No matching video found for {}", subtitle.display());
                    outcome.unmatched_subtitles.push(subtitle);
                }
            }
        }

        info!(
            "Found {} video/subtitle pairs ({} unmatched subtitles)",
            outcome.pairs.len(),
            outcome.unmatched_subtitles.len()
        );
        Ok(outcome)
    }
}

fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
        .collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase()))
        .unwrap_or(false)
}

/// Directory plus case-sensitive stem
fn pairing_key(path: &Path) -> Option<(PathBuf, OsString)> {
    let parent = path.parent()?.to_path_buf();
    let stem = path.file_stem()?.to_os_string();
    Some((parent, stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn matcher() -> PairMatcher {
        PairMatcher::new(&["mp4"], &["srt"])
    }

    #[test]
    fn test_pairs_same_stem_same_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("ep1.mp4").touch().unwrap();
        temp.child("ep1.srt").touch().unwrap();
        temp.child("season2/ep1.mp4").touch().unwrap();
        temp.child("season2/ep1.srt").touch().unwrap();

        let outcome = matcher().find_pairs(temp.path()).unwrap();
        let root = temp.path().canonicalize().unwrap();

        assert_eq!(outcome.pairs.len(), 2);
        assert!(outcome.unmatched_subtitles.is_empty());
        assert_eq!(outcome.pairs[0].video, root.join("ep1.mp4"));
        assert_eq!(outcome.pairs[0].subtitle, root.join("ep1.srt"));
        assert_eq!(outcome.pairs[1].video, root.join("season2/ep1.mp4"));
        assert_eq!(outcome.pairs[1].subtitle, root.join("season2/ep1.srt"));
        for pair in &outcome.pairs {
            assert!(pair.video.is_absolute());
            assert_eq!(pair.video.parent(), pair.subtitle.parent());
        }
    }

    #[test]
    fn test_subtitle_in_other_directory_is_unmatched() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("ep2.mp4").touch().unwrap();
        temp.child("subs/ep2.srt").touch().unwrap();

        let outcome = matcher().find_pairs(temp.path()).unwrap();
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.unmatched_subtitles.len(), 1);
        assert!(outcome.unmatched_subtitles[0].ends_with("subs/ep2.srt"));
    }

    #[test]
    fn test_stem_match_is_case_sensitive_extension_is_not() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Ep3.MP4").touch().unwrap();
        temp.child("Ep3.SRT").touch().unwrap();
        temp.child("ep4.mp4").touch().unwrap();
        temp.child("EP4.srt").touch().unwrap();

        let outcome = matcher().find_pairs(temp.path()).unwrap();
        assert_eq!(outcome.pairs.len(), 1);
        assert!(outcome.pairs[0].video.ends_with("Ep3.MP4"));
        assert_eq!(outcome.unmatched_subtitles.len(), 1);
        assert!(outcome.unmatched_subtitles[0].ends_with("EP4.srt"));
    }

    #[test]
    fn test_video_is_claimed_by_one_subtitle_only() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("ep5.mp4").touch().unwrap();
        temp.child("ep5.ass").touch().unwrap();
        temp.child("ep5.srt").touch().unwrap();

        let matcher = PairMatcher::new(&["mp4"], &["srt", ".ASS"]);
        let outcome = matcher.find_pairs(temp.path()).unwrap();

        assert_eq!(outcome.pairs.len(), 1);
        assert!(outcome.pairs[0].subtitle.ends_with("ep5.ass"));
        assert_eq!(outcome.unmatched_subtitles.len(), 1);
        assert!(outcome.unmatched_subtitles[0].ends_with("ep5.srt"));
    }

    #[test]
    fn test_no_subtitle_appears_twice() {
        let temp = assert_fs::TempDir::new().unwrap();
        for name in ["a.mp4", "a.srt", "b.mp4", "b.srt", "c.srt", "d.mp4", "x/a.mp4", "x/a.srt"] {
            temp.child(name).touch().unwrap();
        }

        let outcome = matcher().find_pairs(temp.path()).unwrap();
        let mut subtitles: Vec<_> = outcome.pairs.iter().map(|p| p.subtitle.clone()).collect();
        let total = subtitles.len();
        subtitles.sort();
        subtitles.dedup();

        assert_eq!(total, 3);
        assert_eq!(subtitles.len(), total);
        for pair in &outcome.pairs {
            assert_eq!(pair.video.file_stem(), pair.subtitle.file_stem());
            assert_eq!(pair.video.parent(), pair.subtitle.parent());
        }
        assert_eq!(outcome.unmatched_subtitles.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_invalid_input() {
        let err = matcher().find_pairs("/definitely/not/here").unwrap_err();
        assert!(matches!(err, HardsubError::InvalidInput(_)));
    }

    #[test]
    fn test_no_files_are_touched() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("ep1.mp4").write_str("video").unwrap();
        temp.child("ep1.srt").write_str("1\n").unwrap();

        matcher().find_pairs(temp.path()).unwrap();
        temp.child("ep1.mp4").assert("video");
        temp.child("ep1.srt").assert("1\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_and_directories_are_paired() {
        use std::os::unix::fs::symlink;

        let library = assert_fs::TempDir::new().unwrap();
        library.child("ep1.mp4").touch().unwrap();
        library.child("season2/ep2.mp4").touch().unwrap();
        library.child("season2/ep2.srt").touch().unwrap();

        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("ep1.srt").touch().unwrap();
        symlink(library.child("ep1.mp4").path(), temp.child("ep1.mp4").path()).unwrap();
        symlink(library.child("season2").path(), temp.child("season2").path()).unwrap();

        let outcome = matcher().find_pairs(temp.path()).unwrap();
        let root = temp.path().canonicalize().unwrap();

        assert!(outcome.unmatched_subtitles.is_empty());
        assert_eq!(outcome.pairs.len(), 2);
        assert_eq!(outcome.pairs[0].video, root.join("ep1.mp4"));
        assert_eq!(outcome.pairs[0].subtitle, root.join("ep1.srt"));
        assert_eq!(outcome.pairs[1].video, root.join("season2/ep2.mp4"));
    }
}
