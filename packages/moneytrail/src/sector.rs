//! Donor sector classification from occupation and employer text.

use std::sync::LazyLock;

use regex::Regex;

/// Sector for donors no keyword matched.
pub const OTHER_SECTOR: &str = "Other/Unknown";

/// Sectors in priority order with their keywords.
const SECTOR_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Finance",
        &["bank", "banker", "finance", "financial", "investment", "investor", "capital", "wealth", "hedge fund", "private equity"],
    ),
    (
        "Technology",
        &["tech", "technology", "software", "internet", "ai", "data", "developer", "engineer"],
    ),
    (
        "Healthcare",
        &["doctor", "physician", "nurse", "hospital", "medical", "pharma", "pharmaceutical", "healthcare"],
    ),
    ("Legal", &["lawyer", "attorney", "legal", "law firm"]),
    (
        "Real Estate",
        &["real estate", "realtor", "property", "properties", "development"],
    ),
    ("Education", &["teacher", "professor", "university", "school"]),
    ("Government", &["government", "public sector", "official"]),
    ("Retired", &["retired"]),
    ("Homemaker", &["homemaker"]),
    ("Super PAC", &["future forward", "pac", "committee", "action"]),
];

#[allow(clippy::expect_used)] // Keywords are literal words; escaped patterns always compile
static SECTOR_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SECTOR_KEYWORDS
        .iter()
        .map(|(sector, keywords)| {
            let alternation = keywords
                .iter()
                .map(|k| keyword_pattern(k))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)\b(?:{alternation})");
            (*sector, Regex::new(&pattern).expect("valid regex"))
        })
        .collect()
});

/// Short keywords must be whole words; longer ones match as word prefixes.
const MIN_PREFIX_KEYWORD_LEN: usize = 4;

fn keyword_pattern(keyword: &str) -> String {
    let escaped = regex::escape(keyword);
    if keyword.len() < MIN_PREFIX_KEYWORD_LEN {
        format!(r"{escaped}\b")
    } else {
        escaped
    }
}

/// Classify a donor by occupation and employer.
///
/// Keywords match at the start of a word, so "BANKING" counts as "bank"
/// but "chairman" does not count as "ai". Keywords shorter than four
/// letters ("ai", "pac") must be whole words.
///
/// # Examples
/// ```
/// use mega_moneytrail::sector::classify_sector;
///
/// assert_eq!(classify_sector("Portfolio Manager", "Citadel Capital"), "Finance");
/// assert_eq!(classify_sector("RETIRED", "NONE"), "Retired");
/// assert_eq!(classify_sector("Chairman", "Acme"), "Other/Unknown");
/// ```
#[must_use]
pub fn classify_sector(occupation: &str, employer: &str) -> &'static str {
    let haystack = format!("{occupation} {employer}");
    SECTOR_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&haystack))
        .map_or(OTHER_SECTOR, |(sector, _)| sector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_occupation() {
        assert_eq!(classify_sector("Software Engineer", ""), "Technology");
        assert_eq!(classify_sector("Attorney", "Self"), "Legal");
        assert_eq!(classify_sector("Registered Nurse", ""), "Healthcare");
        assert_eq!(classify_sector("HOMEMAKER", "NONE"), "Homemaker");
    }

    #[test]
    fn test_classify_by_employer() {
        assert_eq!(classify_sector("CEO", "First National Bank"), "Finance");
        assert_eq!(classify_sector("Dean", "State University"), "Education");
    }

    #[test]
    fn test_priority_order() {
        // Finance is checked before Technology
        assert_eq!(classify_sector("Investor", "Tech Startup"), "Finance");
    }

    #[test]
    fn test_whole_word_matching() {
        assert_eq!(classify_sector("Chairman", "Maintenance Co"), OTHER_SECTOR);
        assert_eq!(classify_sector("AI researcher", ""), "Technology");
    }

    #[test]
    fn test_inflected_forms() {
        assert_eq!(classify_sector("ENGINEERING MANAGER", "ACME TECHNOLOGIES"), "Technology");
        assert_eq!(classify_sector("PORTFOLIO MANAGER", "FIDELITY INVESTMENTS"), "Finance");
        assert_eq!(classify_sector("EXECUTIVE", "BANKING"), "Finance");
        assert_eq!(classify_sector("PHYSICIANS ASSISTANT", "NONE"), "Healthcare");
        assert_eq!(classify_sector("BROKER", "ACME PROPERTIES"), "Real Estate");
    }

    #[test]
    fn test_short_keywords_are_whole_words() {
        assert_eq!(classify_sector("PILOT", "AIRLINE PARTNERS"), OTHER_SECTOR);
        assert_eq!(classify_sector("SALES", "PACIFIC TRADING"), OTHER_SECTOR);
        assert_eq!(classify_sector("", "WINRED PAC"), "Super PAC");
    }

    #[test]
    fn test_not_disclosed_is_other() {
        assert_eq!(classify_sector("Not Disclosed", "Not Disclosed"), OTHER_SECTOR);
    }
}
