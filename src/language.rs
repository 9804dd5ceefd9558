//! Language token normalisation and the loose matching rule used for regional ranking.

/// Native-script tokens mapped to their English name and short code.
const LANGUAGE_VARIANTS: &[(&str, &[&str])] = &[
    ("தமிழ்", &["tamil", "ta"]),
    ("english", &["english", "en"]),
    ("हिन्दी", &["hindi", "hi"]),
    ("తెలుగు", &["telugu", "te"]),
    ("ಕನ್ನಡ", &["kannada", "kn"]),
    ("മലയാളം", &["malayalam", "ml"]),
];

const PREFIX_LEN: usize = 3;

/// Returns the lowercase variants that should be treated as the same language as `token`.
pub fn normalize_language(token: &str) -> Vec<String> {
    if let Some((_, variants)) = LANGUAGE_VARIANTS.iter().find(|(key, _)| *key == token) {
        return variants.iter().map(|v| v.to_string()).collect();
    }

    let lower = token.to_lowercase();
    if let Some((_, variants)) = LANGUAGE_VARIANTS
        .iter()
        .find(|(_, variants)| variants.contains(&lower.as_str()))
    {
        let mut out = vec![lower.clone()];
        out.extend(
            variants
                .iter()
                .filter(|v| **v != lower)
                .map(|v| v.to_string()),
        );
        return out;
    }

    vec![lower]
}

/// True when two language tokens name the same language under the loose rule.
///
/// Both sides are normalised, then any pair of variants matches on substring containment
/// (either direction) or on a shared 3-character prefix when both are longer than 3.
/// Symmetric in its arguments. Empty tokens never match.
pub fn languages_match(x: &str, y: &str) -> bool {
    if x.trim().is_empty() || y.trim().is_empty() {
        return false;
    }
    let xs = normalize_language(x);
    let ys = normalize_language(y);
    xs.iter()
        .any(|a| ys.iter().any(|b| variants_match(a, b)))
}

fn variants_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    // Shared prefix catches truncated and transliterated forms. It also misfires.
    a.chars().count() > PREFIX_LEN
        && b.chars().count() > PREFIX_LEN
        && a.chars().take(PREFIX_LEN).eq(b.chars().take(PREFIX_LEN))
}

/// True when any of `title_languages` matches any of `preferred`.
pub fn matches_any(title_languages: &[String], preferred: &[String]) -> bool {
    title_languages
        .iter()
        .any(|lang| preferred.iter().any(|pref| languages_match(lang, pref)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_script_key_maps_to_variants() {
        assert_eq!(normalize_language("தமிழ்"), vec!["tamil", "ta"]);
    }

    #[test]
    fn english_name_and_code_resolve_to_same_class() {
        assert_eq!(normalize_language("Tamil"), vec!["tamil", "ta"]);
        assert_eq!(normalize_language("ta"), vec!["ta", "tamil"]);
    }

    #[test]
    fn unknown_token_is_lowercased_singleton() {
        assert_eq!(normalize_language("Français"), vec!["français"]);
    }

    #[test]
    fn native_script_matches_english_name() {
        assert!(languages_match("தமிழ்", "Tamil"));
        assert!(languages_match("తెలుగు", "telugu"));
    }

    #[test]
    fn unrelated_languages_do_not_match() {
        assert!(!languages_match("Hindi", "Tamil"));
        assert!(!languages_match("Japanese", "Korean"));
    }

    #[test]
    fn shared_prefix_heuristic_is_preserved() {
        assert!(languages_match("Portuguese", "Português"));
        // Known false positive: unrelated languages sharing a prefix.
        assert!(languages_match("Marathi", "Marwari"));
        // The code "en" is a substring of "bengali".
        assert!(languages_match("English", "Bengali"));
        // Codes are too short for the prefix rule.
        assert!(!languages_match("en", "es"));
    }

    #[test]
    fn empty_tokens_never_match() {
        assert!(!languages_match("", "Tamil"));
        assert!(!languages_match("Tamil", " "));
    }

    #[test]
    fn matching_is_symmetric() {
        let tokens = [
            "Tamil", "தமிழ்", "ta", "English", "en", "Hindi", "हिन्दी", "Bengali", "Kannada",
            "ಕನ್ನಡ", "Malayalam", "Malay", "Marathi", "Telugu", "te", "Gujarati", "Odia",
            "Spanish", "Español", "", "Assamese",
        ];
        for x in tokens {
            for y in tokens {
                assert_eq!(
                    languages_match(x, y),
                    languages_match(y, x),
                    "asymmetric for {x:?} / {y:?}"
                );
            }
        }
    }
}
