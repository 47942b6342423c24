use std::sync::LazyLock;

use regex::Regex;

/// Full-width katakana (U+30A1..U+30FF) and half-width katakana (U+FF65..U+FF9F).
///
/// A run must open and close on a base character; the voiced/semi-voiced
/// combining marks and the prolonged sound mark may only appear inside or at
/// the end of a run, never alone.
const KATAKANA_PATTERN: &str = concat!(
    r"[\x{30A1}-\x{30FA}\x{30FD}-\x{30FF}][\x{3099}\x{309A}\x{30A1}-\x{30FF}]*[\x{3099}\x{309A}\x{30A1}-\x{30FA}\x{30FC}-\x{30FF}]",
    "|",
    r"[\x{FF66}-\x{FF6F}\x{FF71}-\x{FF9D}][\x{FF65}-\x{FF9F}]*[\x{FF66}-\x{FF9F}]",
);

static KATAKANA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(KATAKANA_PATTERN).expect("katakana pattern compiles"));

/// A token located inside a text run. Offsets are byte offsets into the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMatch<'a> {
    pub start: usize,
    pub end: usize,
    pub token: &'a str,
}

/// First token in `text`, if any.
pub fn find_token(text: &str) -> Option<TokenMatch<'_>> {
    KATAKANA.find(text).map(|m| TokenMatch {
        start: m.start(),
        end: m.end(),
        token: m.as_str(),
    })
}

/// All non-overlapping tokens in `text`, in order.
pub fn find_tokens(text: &str) -> Vec<TokenMatch<'_>> {
    KATAKANA
        .find_iter(text)
        .map(|m| TokenMatch {
            start: m.start(),
            end: m.end(),
            token: m.as_str(),
        })
        .collect()
}

pub fn contains_token(text: &str) -> bool {
    KATAKANA.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::{contains_token, find_token, find_tokens};

    fn tokens(text: &str) -> Vec<&str> {
        find_tokens(text).into_iter().map(|m| m.token).collect()
    }

    #[test]
    fn finds_katakana_run_between_other_scripts() {
        let found = find_token("これはテストonlyのデータ").expect("token");
        assert_eq!(found.token, "テスト");
        assert_eq!(found.start, "これは".len());
        assert_eq!(found.end, "これはテスト".len());
    }

    #[test]
    fn matches_are_maximal_and_ordered() {
        assert_eq!(
            tokens("ロンドンとマドリード、コーヒー"),
            vec!["ロンドン", "マドリード", "コーヒー"]
        );
    }

    #[test]
    fn prolonged_mark_alone_does_not_qualify() {
        assert!(!contains_token("ーー"));
        assert!(!contains_token("\u{3099}\u{309A}"));
        assert!(tokens("ーーア").is_empty());
    }

    #[test]
    fn single_base_character_is_not_a_token() {
        assert!(tokens("アは").is_empty());
    }

    #[test]
    fn trailing_prolonged_mark_is_included() {
        assert_eq!(tokens("データー!"), vec!["データー"]);
    }

    #[test]
    fn half_width_katakana_matches_separately() {
        assert_eq!(tokens("ﾃｽﾄとテスト"), vec!["ﾃｽﾄ", "テスト"]);
    }

    #[test]
    fn hiragana_and_latin_are_ignored() {
        assert!(!contains_token("ひらがな only"));
    }
}
