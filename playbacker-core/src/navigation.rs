//! Stepping through the songs of a setlist.  Songs are matched by name.

use playbacker_protocol::Song;

/// Song before `current`, wrapping from the first song to the last.  Nothing
/// is returned without a current song, or when it isn't in `songs`.
pub fn previous_song<'a>(songs: &'a [Song], current: Option<&Song>) -> Option<&'a Song> {
    let position = position_of(songs, current?)?;
    let previous = position.checked_sub(1).unwrap_or(songs.len() - 1);
    songs.get(previous)
}

/// Song after `current`, wrapping from the last song to the first.  Without a
/// current song, or one that isn't in `songs`, starts at the first song.
pub fn next_song<'a>(songs: &'a [Song], current: Option<&Song>) -> Option<&'a Song> {
    match current.and_then(|song| position_of(songs, song)) {
        Some(position) => songs.get((position + 1) % songs.len()),
        None => songs.first(),
    }
}

fn position_of(songs: &[Song], song: &Song) -> Option<usize> {
    songs.iter().position(|s| s.name == song.name)
}

#[cfg(test)]
mod tests {
    use playbacker_protocol::{NoteDuration, Tempo, TimeSignature};

    use super::*;

    fn song(name: &str) -> Song {
        Song {
            name: name.into(),
            artist: "Band".into(),
            tempo: Tempo {
                bpm: 100.0,
                time_signature: TimeSignature::FourFour,
                duration: NoteDuration::Quarter,
            },
        }
    }

    fn names(songs: &[&str]) -> Vec<Song> {
        songs.iter().map(|name| song(name)).collect()
    }

    #[test]
    fn next_without_current_starts_at_first() {
        let songs = names(&["A", "B", "C"]);
        assert_eq!(next_song(&songs, None), Some(&songs[0]));
    }

    #[test]
    fn next_walks_and_wraps() {
        let songs = names(&["A", "B", "C"]);
        let b = next_song(&songs, Some(&songs[0]));
        assert_eq!(b, Some(&songs[1]));
        let c = next_song(&songs, b);
        assert_eq!(c, Some(&songs[2]));
        assert_eq!(next_song(&songs, c), Some(&songs[0]));
    }

    #[test]
    fn next_is_cyclic_over_the_whole_setlist() {
        for len in 1..6 {
            let all: Vec<String> = (0..len).map(|i| format!("song {}", i)).collect();
            let songs: Vec<Song> = all.iter().map(|name| song(name)).collect();
            for start in &songs {
                let mut current = start;
                for _ in 0..songs.len() {
                    current = next_song(&songs, Some(current)).unwrap();
                }
                assert_eq!(current, start);
            }
        }
    }

    #[test]
    fn previous_wraps_to_last() {
        let songs = names(&["A", "B", "C"]);
        assert_eq!(previous_song(&songs, Some(&songs[0])), Some(&songs[2]));
        assert_eq!(previous_song(&songs, Some(&songs[2])), Some(&songs[1]));
    }

    #[test]
    fn previous_without_current_is_none() {
        let songs = names(&["A", "B"]);
        assert_eq!(previous_song(&songs, None), None);
        assert_eq!(previous_song(&songs, Some(&song("Z"))), None);
    }

    #[test]
    fn unknown_current_restarts_next_from_first() {
        let songs = names(&["A", "B"]);
        assert_eq!(next_song(&songs, Some(&song("Z"))), Some(&songs[0]));
    }

    #[test]
    fn empty_setlist_has_no_songs() {
        assert_eq!(next_song(&[], None), None);
        assert_eq!(previous_song(&[], Some(&song("A"))), None);
    }

    #[test]
    fn matched_by_name_not_by_value() {
        let songs = names(&["A", "B"]);
        let mut stale = song("A");
        stale.tempo.bpm = 60.0;
        assert_eq!(next_song(&songs, Some(&stale)), Some(&songs[1]));
    }
}
