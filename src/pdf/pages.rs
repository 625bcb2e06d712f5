//! Page selection logic for the split workflow: the free-text range parser
//! and the quick-pick button generation.

use std::collections::BTreeSet;

/// Parse a comma-separated page selection ("1-3", "1,3,5", "2-4,6,8-10")
/// against the document's page count.
///
/// Any malformed or out-of-range token rejects the whole input; a partial
/// selection is never applied. On success the result is the sorted,
/// deduplicated union of all tokens. An empty result means invalid input.
pub fn parse_page_numbers(input: &str, total_pages: u32) -> Vec<u32> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    let mut pages = BTreeSet::new();
    for token in input.split(',') {
        let token = token.trim();
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => match (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
                (Ok(a), Ok(b)) => (a, b),
                _ => return Vec::new(),
            },
            None => match token.parse::<u32>() {
                Ok(p) => (p, p),
                Err(_) => return Vec::new(),
            },
        };
        if start == 0 || start > end || end > total_pages {
            return Vec::new();
        }
        pages.extend(start..=end);
    }

    pages.into_iter().collect()
}

/// One quick-pick button: display label plus the range token fed back into
/// [`parse_page_numbers`] when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickPick {
    pub label: String,
    pub range: String,
}

impl QuickPick {
    fn new(label: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            range: range.into(),
        }
    }
}

/// Deterministic quick-pick set for a given page count. The custom-range
/// affordance is appended by the keyboard builder, not here.
pub fn quick_picks(page_count: u32) -> Vec<QuickPick> {
    let mut picks = Vec::new();

    if page_count >= 2 {
        picks.push(QuickPick::new("Page 1-2", "1-2"));
        picks.push(QuickPick::new("Page 1-3", "1-3"));
    }
    if page_count >= 5 {
        picks.push(QuickPick::new("First 5", "1-5"));
        picks.push(QuickPick::new(
            "Last 5",
            format!("{}-{}", page_count.saturating_sub(4).max(1), page_count),
        ));
    }
    if page_count >= 10 {
        picks.push(QuickPick::new("First 10", "1-10"));
        picks.push(QuickPick::new(
            "Last 10",
            format!("{}-{}", page_count.saturating_sub(9).max(1), page_count),
        ));
    }
    if page_count <= 5 {
        for page in 1..=page_count {
            picks.push(QuickPick::new(format!("Page {page}"), page.to_string()));
        }
    }

    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_a_simple_range() {
        assert_eq!(parse_page_numbers("1-3", 5), vec![1, 2, 3]);
    }

    #[test]
    fn parses_a_comma_list() {
        assert_eq!(parse_page_numbers("1,3,5", 5), vec![1, 3, 5]);
    }

    #[test]
    fn parses_mixed_ranges_and_singles() {
        assert_eq!(
            parse_page_numbers("2-4,6,8-10", 10),
            vec![2, 3, 4, 6, 8, 9, 10]
        );
    }

    #[test]
    fn out_of_range_rejects_the_whole_input() {
        assert_eq!(parse_page_numbers("7", 5), Vec::<u32>::new());
        assert_eq!(parse_page_numbers("3,7", 5), Vec::<u32>::new());
        assert_eq!(parse_page_numbers("1-6", 5), Vec::<u32>::new());
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert_eq!(parse_page_numbers("abc", 5), Vec::<u32>::new());
        assert_eq!(parse_page_numbers("1-2-3", 5), Vec::<u32>::new());
        assert_eq!(parse_page_numbers("3-1", 5), Vec::<u32>::new());
        assert_eq!(parse_page_numbers("0", 5), Vec::<u32>::new());
        assert_eq!(parse_page_numbers("", 5), Vec::<u32>::new());
        assert_eq!(parse_page_numbers("  ", 5), Vec::<u32>::new());
    }

    #[test]
    fn result_is_sorted_and_deduplicated() {
        assert_eq!(parse_page_numbers("3,1,2", 5), vec![1, 2, 3]);
        assert_eq!(parse_page_numbers("1-3,2-4", 5), vec![1, 2, 3, 4]);
    }

    #[test]
    fn tolerates_whitespace_around_tokens() {
        assert_eq!(parse_page_numbers(" 1 , 3 - 4 ", 5), vec![1, 3, 4]);
    }

    #[test]
    fn quick_picks_for_a_small_document() {
        let picks = quick_picks(4);
        let ranges: Vec<&str> = picks.iter().map(|p| p.range.as_str()).collect();
        assert_eq!(ranges, vec!["1-2", "1-3", "1", "2", "3", "4"]);
    }

    #[test]
    fn quick_picks_for_a_large_document() {
        let picks = quick_picks(12);
        let ranges: Vec<&str> = picks.iter().map(|p| p.range.as_str()).collect();
        assert_eq!(ranges, vec!["1-2", "1-3", "1-5", "8-12", "1-10", "3-12"]);
    }

    #[test]
    fn quick_picks_for_a_single_page() {
        let picks = quick_picks(1);
        let ranges: Vec<&str> = picks.iter().map(|p| p.range.as_str()).collect();
        assert_eq!(ranges, vec!["1"]);
    }

    #[test]
    fn every_quick_pick_parses_against_its_page_count() {
        for count in 1..=25 {
            for pick in quick_picks(count) {
                assert!(
                    !parse_page_numbers(&pick.range, count).is_empty(),
                    "pick {:?} did not parse for count {}",
                    pick,
                    count
                );
            }
        }
    }
}
