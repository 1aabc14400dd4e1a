//! Ranking of provider candidates.

use crate::models::Pronunciation;

/// Returns the candidate with the most votes.
///
/// Ties go to the candidate the provider listed first, so the same input
/// always yields the same choice.
///
/// # Panics
///
/// Panics if `candidates` is empty. Providers report an empty result as
/// `AppError::NoResults`, so an empty slice here is a caller bug.
pub fn select_best(candidates: &[Pronunciation]) -> &Pronunciation {
    let mut best = candidates
        .first()
        .expect("select_best called with no candidates");
    for candidate in &candidates[1..] {
        if candidate.votes > best.votes {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioSource;
    use url::Url;

    fn candidate(user: &str, votes: u32) -> Pronunciation {
        Pronunciation {
            query: "hund".into(),
            locale: "de".into(),
            user: user.into(),
            votes,
            audio: AudioSource::Remote(Url::parse("https://example.com/a.mp3").unwrap()),
        }
    }

    #[test]
    fn test_picks_maximum_votes() {
        let list = vec![
            candidate("a", 3),
            candidate("b", 7),
            candidate("c", 7),
            candidate("d", 1),
        ];
        let best = select_best(&list);
        assert_eq!(best.votes, 7);
        assert_eq!(best.user, "b");
    }

    #[test]
    fn test_is_deterministic() {
        let list = vec![
            candidate("a", 3),
            candidate("b", 7),
            candidate("c", 7),
            candidate("d", 1),
        ];
        let first = select_best(&list).user.clone();
        for _ in 0..10 {
            assert_eq!(select_best(&list).user, first);
        }
    }

    #[test]
    fn test_single_candidate() {
        let list = vec![candidate("only", 0)];
        assert_eq!(select_best(&list).user, "only");
    }

    #[test]
    #[should_panic(expected = "no candidates")]
    fn test_empty_panics() {
        select_best(&[]);
    }
}
