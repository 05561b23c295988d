//! MPN variant generation
//!
//! Turns a raw part identifier into search variants for fuzzy lookup, most
//! specific first. The original identifier is never part of the output;
//! callers search it separately.
//!
//! Shortening drops trailing packaging/reel suffixes the parts source does not
//! index, but never below half the length or 5 characters.

/// Characters removed to build the stripped form
const SEPARATORS: [char; 3] = ['-', '.', '/'];

/// Shortest prefix ever emitted
const MIN_PREFIX_LEN: usize = 5;

/// Remove dashes, dots, slashes and whitespace
pub fn strip_separators(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !SEPARATORS.contains(c) && !c.is_whitespace())
        .collect()
}

/// Shortest prefix length allowed for a string of `len` characters
pub fn min_prefix_len(len: usize) -> usize {
    MIN_PREFIX_LEN.max(len / 2)
}

/// Ordered, duplicate-free search variants for `identifier`
pub fn generate_variants(identifier: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    let push = |variant: String, variants: &mut Vec<String>| {
        if variant != identifier && !variants.contains(&variant) {
            variants.push(variant);
        }
    };

    let stripped = strip_separators(identifier);
    let stripped_differs = stripped != identifier;

    if stripped_differs && !stripped.is_empty() {
        push(stripped.clone(), &mut variants);
    }

    for prefix in prefixes(identifier) {
        push(prefix, &mut variants);
    }

    if stripped_differs && stripped.chars().count() > MIN_PREFIX_LEN {
        for prefix in prefixes(&stripped) {
            push(prefix, &mut variants);
        }
    }

    variants
}

/// Prefixes from `len - 1` down to the minimum length, longest first
fn prefixes(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    if len == 0 {
        return Vec::new();
    }

    let min = min_prefix_len(len);
    (min..len)
        .rev()
        .map(|n| chars[..n].iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn strips_separators_and_whitespace() {
        assert_eq!(strip_separators("ATMEGA328P-AU"), "ATMEGA328PAU");
        assert_eq!(strip_separators("RC0603 FR-07 10K/L"), "RC0603FR0710KL");
        assert_eq!(strip_separators("1.5KE"), "15KE");
        assert_eq!(strip_separators("-./ "), "");
    }

    #[test]
    fn stripped_form_comes_first() {
        let variants = generate_variants("ATMEGA328P-AU");
        assert_eq!(variants[0], "ATMEGA328PAU");
        assert_eq!(variants[1], "ATMEGA328P-A");
        assert_eq!(variants[2], "ATMEGA328P-");
    }

    #[test]
    fn shortening_stops_at_half_length() {
        // len 13 -> min 6
        let variants = generate_variants("ATMEGA328P-AU");
        assert!(variants.contains(&"ATMEGA".to_string()));
        assert!(!variants.contains(&"ATMEG".to_string()));
    }

    #[test]
    fn shortening_stops_at_five_characters() {
        let variants = generate_variants("LM358DR");
        assert_eq!(variants, vec!["LM358D".to_string(), "LM358".to_string()]);
    }

    #[test]
    fn short_identifiers_yield_nothing() {
        assert!(generate_variants("LM35").is_empty());
        assert!(generate_variants("").is_empty());
        assert!(generate_variants("NE555").is_empty());
    }

    #[test]
    fn stripped_form_only_shortened_when_longer_than_five() {
        // stripped "AB12C" has length 5: emitted but never shortened
        let variants = generate_variants("AB-12C");
        assert_eq!(variants, vec!["AB12C".to_string(), "AB-12".to_string()]);
    }

    #[test]
    fn plain_identifiers_respect_minimum_length() {
        for identifier in ["ABCDE", "ABCDEF", "ABCDEFG", "ABCDEFGH", "ABCDEFGHI", "ABCDEFGHIJ"] {
            let len = identifier.len();
            let min = std::cmp::max(5, len / 2);
            for variant in generate_variants(identifier) {
                assert!(
                    variant.len() >= min,
                    "{} produced {} shorter than {}",
                    identifier,
                    variant,
                    min
                );
            }
        }
    }

    #[test]
    fn never_contains_original_or_duplicates() {
        for identifier in [
            "ATMEGA328P-AU",
            "GRM188R71H104KA93D",
            "RC0603FR-0710KL",
            "A-B-C-D-E-F-G",
            "1N4148W-7-F",
            "TPS 62160 DGKR",
        ] {
            let variants = generate_variants(identifier);
            assert!(!variants.contains(&identifier.to_string()));
            let unique: HashSet<&String> = variants.iter().collect();
            assert_eq!(unique.len(), variants.len(), "duplicates for {}", identifier);
            assert!(variants.len() <= 2 * identifier.chars().count());
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        let variants = generate_variants("µPD78F0500");
        assert!(variants.iter().all(|v| v.chars().count() >= 5));
        assert_eq!(variants[0], "µPD78F050");
    }
}
