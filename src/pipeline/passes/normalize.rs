//! Cleanup applied to model output before it is stored in the session

use std::collections::HashSet;

pub const MAX_TITLE_WORDS: usize = 12;
pub const MAX_HASHTAGS: usize = 5;

/// Trim entries, drop blanks and case-insensitive duplicates, keep order
pub fn normalize_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| item.as_ref().trim().to_string())
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

/// Strip wrapping quotes and markup from a title and cap its length
pub fn clean_title(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '“' | '”' | '*' | '#') || c.is_whitespace());
    if trimmed.is_empty() {
        return None;
    }

    let words: Vec<&str> = trimmed.split_whitespace().take(MAX_TITLE_WORDS).collect();
    Some(words.join(" "))
}

/// Remove outline lines that merely repeat the title
pub fn strip_title_from_outline(outline: &str, title: &str) -> String {
    let title_key = comparable(title);
    outline
        .lines()
        .filter(|line| comparable(line) != title_key)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn comparable(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '#') || c.is_whitespace())
        .to_lowercase()
}

/// Canonical hashtag string: `#tag` tokens, lowercase ASCII, at most five
///
/// Accepts any mix of space/comma separated fragments, with or without `#`.
/// Returns an empty string when nothing usable remains.
pub fn normalize_hashtags<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for part in parts {
        for token in part
            .as_ref()
            .split(|c: char| c.is_whitespace() || c == ',')
        {
            let tag: String = token
                .trim_start_matches('#')
                .to_lowercase()
                .chars()
                .filter_map(fold_to_ascii)
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
                .collect();

            if tag.is_empty() || !seen.insert(tag.clone()) {
                continue;
            }
            tags.push(format!("#{tag}"));
            if tags.len() == MAX_HASHTAGS {
                return tags.join(" ");
            }
        }
    }

    tags.join(" ")
}

/// Fold lowercase Latin and Vietnamese letters to their base ASCII letter
fn fold_to_ascii(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'à' | 'á' | 'ả' | 'ã' | 'ạ' | 'ă' | 'ằ' | 'ắ' | 'ẳ' | 'ẵ' | 'ặ' | 'â' | 'ầ' | 'ấ'
        | 'ẩ' | 'ẫ' | 'ậ' | 'ä' | 'å' => 'a',
        'đ' => 'd',
        'è' | 'é' | 'ẻ' | 'ẽ' | 'ẹ' | 'ê' | 'ề' | 'ế' | 'ể' | 'ễ' | 'ệ' | 'ë' => 'e',
        'ì' | 'í' | 'ỉ' | 'ĩ' | 'ị' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ỏ' | 'õ' | 'ọ' | 'ô' | 'ồ' | 'ố' | 'ổ' | 'ỗ' | 'ộ' | 'ơ' | 'ờ' | 'ớ'
        | 'ở' | 'ỡ' | 'ợ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'ủ' | 'ũ' | 'ụ' | 'ư' | 'ừ' | 'ứ' | 'ử' | 'ữ' | 'ự' | 'û' | 'ü' => 'u',
        'ỳ' | 'ý' | 'ỷ' | 'ỹ' | 'ỵ' | 'ÿ' => 'y',
        'ç' => 'c',
        'ñ' => 'n',
        _ => return None,
    };
    Some(folded)
}
