//! Object key construction.
//!
//! Keys are `<token>-<sanitized name>`, where the token is the current time in milliseconds,
//! bumped when necessary so no two keys minted by one process share a token.
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Error, Result};

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9._-]").unwrap());

/// Drop every character outside `[A-Za-z0-9._-]`.
///
/// Path separators never survive, so a sanitized name cannot address anything but a single flat
/// key.
pub fn sanitize_name(name: &str) -> String {
    DISALLOWED.replace_all(name, "").into_owned()
}

#[derive(Debug, Default)]
pub struct KeyMinter {
    last: AtomicI64,
}

impl KeyMinter {
    /// Milliseconds since the epoch, strictly greater than every token returned before.
    pub fn next_token(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            }) {
            Ok(p) | Err(p) => p,
        };
        now.max(previous + 1)
    }

    /// Build the store key for a user supplied file name.
    pub fn mint(&self, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(Error::InvalidInput(String::from("File name is required")));
        }
        let sanitized = sanitize_name(name);
        if sanitized.is_empty() {
            return Err(Error::InvalidInput(format!(
                "File name {name:?} contains no usable characters"
            )));
        }
        Ok(format!("{}-{}", self.next_token(), sanitized))
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::plain("photo.png", "photo.png")]
    #[case::traversal("../../etc/passwd", "....etcpasswd")]
    #[case::spaces("my holiday photo.png", "myholidayphoto.png")]
    #[case::unicode("résumé_v2-final.pdf", "rsum_v2-final.pdf")]
    #[case::query("a?b=c&d#e", "abcde")]
    #[case::backslash("..\\windows\\system32", "..windowssystem32")]
    fn sanitizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_name(input), expected);
    }

    #[test]
    fn mint_prefixes_token() {
        let minter = KeyMinter::default();
        let key = minter.mint("../../etc/passwd").unwrap();
        let (token, name) = key.split_once('-').unwrap();
        assert!(token.parse::<i64>().unwrap() > 0);
        assert_eq!(name, "....etcpasswd");
    }

    #[rstest]
    #[case::empty("")]
    #[case::nothing_left("///???")]
    fn mint_rejects(#[case] input: &str) {
        let minter = KeyMinter::default();
        assert!(matches!(minter.mint(input), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn tokens_strictly_increase() {
        let minter = KeyMinter::default();
        let tokens: Vec<i64> = (0..1000).map(|_| minter.next_token()).collect();
        assert!(tokens.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn same_name_gets_distinct_keys() {
        let minter = KeyMinter::default();
        assert_ne!(minter.mint("a.txt").unwrap(), minter.mint("a.txt").unwrap());
    }
}
