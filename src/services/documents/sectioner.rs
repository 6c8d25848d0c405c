//! Brochure sectioner: splits ADV Part 2 narrative text into numbered items.
//!
//! Item headers in filed brochures are wildly inconsistent ("Item 4 –
//! Advisory Business", "ITEM 4. ADVISORY BUSINESS", "4: Advisory Business"),
//! so matching is a single case-insensitive anchored pattern and everything
//! between two headers belongs to the earlier item.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Section key that always holds the entire input.
pub const FULL_SECTION: &str = "full";

static ITEM_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:ITEM\s+)?([0-9]{1,2})\s*[:\-–—.\s]\s*(\S.*)$").unwrap()
});

/// Standard ADV Part 2A item titles, used when rendering section context.
const ITEM_TITLES: [&str; 18] = [
    "Cover Page",
    "Material Changes",
    "Table of Contents",
    "Advisory Business",
    "Fees and Compensation",
    "Performance-Based Fees and Side-By-Side Management",
    "Types of Clients",
    "Methods of Analysis, Investment Strategies and Risk of Loss",
    "Disciplinary Information",
    "Other Financial Industry Activities and Affiliations",
    "Code of Ethics, Participation or Interest in Client Transactions and Personal Trading",
    "Brokerage Practices",
    "Review of Accounts",
    "Client Referrals and Other Compensation",
    "Custody",
    "Investment Discretion",
    "Voting Client Securities",
    "Financial Information",
];

/// Human title for a section key like `item_5`. Falls back to the key itself.
pub fn item_title(section_key: &str) -> String {
    let item = section_key
        .strip_prefix("item_")
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| (1..=18).contains(n));
    match item {
        Some(n) => format!("Item {} - {}", n, ITEM_TITLES[n - 1]),
        None => section_key.to_string(),
    }
}

/// Split brochure text into a section map keyed `item_1`..`item_18`.
///
/// The `"full"` key is always present and holds the entire input. Items
/// outside 1-18 are discarded. A section's content runs from the end of its
/// header line to the start of the next header (or end of text), trimmed;
/// empty sections are omitted. When the same item number appears more than
/// once (tables of contents are the usual culprit) the last occurrence wins.
pub fn section_brochure(text: &str) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    sections.insert(FULL_SECTION.to_string(), text.to_string());

    let headers: Vec<(usize, usize, u32)> = ITEM_HEADER_REGEX
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let item: u32 = cap.get(1)?.as_str().parse().ok()?;
            (1..=18).contains(&item).then_some((whole.start(), whole.end(), item))
        })
        .collect();

    for (i, (_, header_end, item)) in headers.iter().enumerate() {
        let content_end = headers.get(i + 1).map(|h| h.0).unwrap_or(text.len());
        let content = text[*header_end..content_end].trim();
        if content.is_empty() {
            continue;
        }
        sections.insert(format!("item_{}", item), content.to_string());
    }

    sections
}

/// Concatenate the requested sections, each prefixed with its human title.
///
/// Falls back to the `"full"` section when none of the keys match; returns
/// empty when `"full"` is also absent.
pub fn sections_for_items(sections: &BTreeMap<String, String>, keys: &[&str]) -> String {
    let parts: Vec<String> = keys
        .iter()
        .filter_map(|key| {
            sections.get(*key).map(|text| format!("{}\n{}", item_title(key), text))
        })
        .collect();

    if parts.is_empty() {
        return sections.get(FULL_SECTION).cloned().unwrap_or_default();
    }
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_section_holds_entire_input() {
        let text = "Item 4 - Advisory Business\nWe advise.";
        let sections = section_brochure(text);
        assert_eq!(sections[FULL_SECTION], text);

        let empty = section_brochure("");
        assert_eq!(empty[FULL_SECTION], "");
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_no_headers_yields_full_only() {
        let sections = section_brochure("A brochure with no recognizable structure at all.");
        assert_eq!(sections.len(), 1);
        assert!(sections.contains_key(FULL_SECTION));
    }

    #[test]
    fn test_items_split_at_next_header() {
        let text = "Item 4 – Advisory Business\nWe manage portfolios for families.\n\nItem 5: Fees\nOur fee is 1% annually.";
        let sections = section_brochure(text);
        assert!(sections.contains_key("item_4"));
        assert!(sections.contains_key("item_5"));
        assert!(sections.contains_key(FULL_SECTION));
        assert!(sections["item_4"].contains("families"));
        assert!(!sections["item_4"].contains("1% annually"));
        assert!(sections["item_5"].contains("1% annually"));
    }

    #[test]
    fn test_header_variants_match() {
        for header in [
            "ITEM 8. METHODS OF ANALYSIS",
            "item 8: methods of analysis",
            "Item 8 — Methods of Analysis",
            "8 - Methods of Analysis",
        ] {
            let text = format!("{}\nFundamental analysis.", header);
            let sections = section_brochure(&text);
            assert!(sections.contains_key("item_8"), "failed for header: {}", header);
        }
    }

    #[test]
    fn test_items_outside_range_discarded() {
        let text = "Item 19 - Not A Real Item\nBody text.\nItem 4 - Advisory Business\nReal body.";
        let sections = section_brochure(text);
        assert!(!sections.keys().any(|k| k == "item_19"));
        assert!(sections.contains_key("item_4"));
    }

    #[test]
    fn test_empty_content_omitted() {
        let text = "Item 4 - Advisory Business\n\nItem 5 - Fees\nWe charge fees.";
        let sections = section_brochure(text);
        assert!(!sections.contains_key("item_4"));
        assert!(sections.contains_key("item_5"));
    }

    #[test]
    fn test_duplicate_item_last_wins() {
        // Table of contents row first, real header later.
        let text = "Item 5 - Fees and Compensation 3\nItem 4 - Advisory Business\nintro\nItem 5 - Fees and Compensation\nThe real fee text.";
        let sections = section_brochure(&text.to_string());
        assert!(sections["item_5"].contains("real fee text"));
    }

    #[test]
    fn test_sections_for_items_concatenates_with_titles() {
        let sections = section_brochure("Item 4 - Advisory Business\nbody4\nItem 5 - Fees\nbody5");
        let combined = sections_for_items(&sections, &["item_4", "item_5"]);
        assert!(combined.contains("Item 4 - Advisory Business"));
        assert!(combined.contains("body4"));
        assert!(combined.contains("Item 5 - Fees and Compensation"));
        assert!(combined.contains("body5"));
    }

    #[test]
    fn test_sections_for_items_falls_back_to_full() {
        let sections = section_brochure("No headers here.");
        let combined = sections_for_items(&sections, &["item_12"]);
        assert_eq!(combined, "No headers here.");

        let empty = BTreeMap::new();
        assert_eq!(sections_for_items(&empty, &["item_12"]), "");
    }
}
