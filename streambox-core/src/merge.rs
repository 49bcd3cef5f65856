//! Episode enrichment from the extended-episode overlay.
//!
//! The overlay only ever sets `screenshot` on episodes the base list already
//! has. Matching is by episode number, first overlay entry wins, and entries
//! without a usable still leave the base record alone.

use streambox_model::{EpisodeRecord, EpisodeStill};

/// Merge `overlay` stills into `base`, preserving base order and length.
pub fn merge_episodes(
    mut base: Vec<EpisodeRecord>,
    overlay: Option<&[EpisodeStill]>,
) -> Vec<EpisodeRecord> {
    let Some(overlay) = overlay.filter(|entries| !entries.is_empty()) else {
        return base;
    };

    for episode in &mut base {
        let still = overlay
            .iter()
            .find(|entry| entry.episode_number == episode.episode_number)
            .and_then(EpisodeStill::usable_still);

        if let Some(still) = still {
            episode.screenshot = Some(still.to_string());
        }
    }

    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still(episode_number: u32, still: Option<&str>) -> EpisodeStill {
        EpisodeStill {
            episode_number,
            still: still.map(str::to_string),
        }
    }

    fn base() -> Vec<EpisodeRecord> {
        vec![EpisodeRecord::new("Pilot", 1), EpisodeRecord::new("Two", 2)]
    }

    #[test]
    fn pilot_gets_overlay_still_and_second_episode_passes_through() {
        let overlay = [still(1, Some("http://x/1.jpg"))];

        let merged = merge_episodes(base(), Some(&overlay));

        assert_eq!(
            merged,
            vec![
                EpisodeRecord {
                    title: "Pilot".into(),
                    episode_number: 1,
                    screenshot: Some("http://x/1.jpg".into()),
                },
                EpisodeRecord::new("Two", 2),
            ]
        );
    }

    #[test]
    fn absent_or_empty_overlay_is_identity() {
        assert_eq!(merge_episodes(base(), None), base());
        assert_eq!(merge_episodes(base(), Some(&[])), base());
    }

    #[test]
    fn empty_stills_do_not_override() {
        let overlay = [still(1, Some("")), still(2, None)];

        assert_eq!(merge_episodes(base(), Some(&overlay)), base());
    }

    #[test]
    fn unmatched_overlay_entries_are_ignored() {
        let overlay = [still(7, Some("http://x/7.jpg"))];

        let merged = merge_episodes(base(), Some(&overlay));

        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|episode| episode.screenshot.is_none()));
    }

    #[test]
    fn first_matching_overlay_entry_decides() {
        let overlay = [still(2, None), still(2, Some("http://x/late.jpg"))];

        let merged = merge_episodes(base(), Some(&overlay));

        assert_eq!(merged[1].screenshot, None);
    }

    #[test]
    fn overlay_replaces_existing_screenshot() {
        let mut episodes = base();
        episodes[0].screenshot = Some("http://old/1.jpg".into());
        let overlay = [still(1, Some("http://new/1.jpg"))];

        let merged = merge_episodes(episodes, Some(&overlay));

        assert_eq!(merged[0].screenshot.as_deref(), Some("http://new/1.jpg"));
    }
}
