//! Text normalization and similarity primitives shared by suggestion,
//! search and duplicate detection.
//!
//! Every function here is total: empty or odd input yields an empty or
//! neutral result, never an error.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Minimum length of a shared prefix before two names count as similar.
pub const MIN_PREFIX_LEN: usize = 3;

static STREET_ABBREVIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:ul|os|al|pl)\.").expect("valid regex"));

/// Strips diacritics while keeping case: `Łódź` becomes `Lodz`.
///
/// `ł`/`Ł` have no canonical decomposition, so they are mapped explicitly
/// before the NFD pass drops combining marks.
#[must_use]
pub fn fold_diacritics(text: &str) -> String {
    text.replace('ł', "l")
        .replace('Ł', "L")
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect()
}

/// Lower-cases, folds diacritics and collapses whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    let folded = fold_diacritics(&text.to_lowercase());
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every ASCII digit in `text`, in order.
#[must_use]
pub fn phone_digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// [`phone_digits`] with a leading `48` country code removed when the number
/// is longer than a national nine-digit number.
#[must_use]
pub fn national_phone_digits(text: &str) -> String {
    let digits = phone_digits(text);
    match digits.strip_prefix("48") {
        Some(rest) if digits.len() > 9 => rest.to_string(),
        _ => digits,
    }
}

/// [`normalize`] with street-type abbreviations (`ul.`, `os.`, `al.`, `pl.`) removed.
#[must_use]
pub fn normalize_street(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = STREET_ABBREVIATION_RE.replace_all(&lowered, " ");
    normalize(&stripped)
}

/// Equal after normalization, or one is a prefix of the other and that
/// prefix is at least [`MIN_PREFIX_LEN`] characters.
///
/// Two blank inputs are equal and therefore similar; callers that must not
/// match on missing text check for it before calling.
#[must_use]
pub fn similar(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return true;
    }
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };
    short.chars().count() >= MIN_PREFIX_LEN && long.starts_with(short.as_str())
}

/// Jaccard overlap of the normalized whitespace-separated token sets.
/// Returns `0.0` when both inputs are empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let left: BTreeSet<&str> = a.split(' ').filter(|t| !t.is_empty()).collect();
    let right: BTreeSet<&str> = b.split(' ').filter(|t| !t.is_empty()).collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    shared as f64 / union as f64
}

/// Polish alphabet order; each accented letter sorts after its base letter.
const POLISH_ALPHABET: &str = "aąbcćdeęfghijklłmnńoópqrsśtuvwxyzźż";

/// Letters sort above ASCII digits and punctuation; anything outside the
/// Latin script sorts after every letter, by code point.
const LETTER_BASE: u32 = 0x100;
const OTHER_BASE: u32 = 0x1_0000;

fn alphabet_weight(ch: char) -> Option<u32> {
    POLISH_ALPHABET
        .chars()
        .position(|letter| letter == ch)
        .and_then(|pos| u32::try_from(pos).ok())
        .map(|pos| LETTER_BASE + pos)
}

fn collation_weight(ch: char) -> u32 {
    if let Some(weight) = alphabet_weight(ch) {
        return weight;
    }
    if ch.is_ascii() {
        return u32::from(ch);
    }
    // Non-Polish accented letters (é, ü, ...) sort with their base letter.
    let folded = fold_diacritics(ch.encode_utf8(&mut [0; 4]));
    let mut chars = folded.chars();
    match (chars.next(), chars.next()) {
        (Some(base), None) => alphabet_weight(base).unwrap_or(OTHER_BASE + u32::from(ch)),
        _ => OTHER_BASE + u32::from(ch),
    }
}

fn collation_key(text: &str) -> Vec<u32> {
    let lowered: String = text.to_lowercase().nfc().collect();
    let mut key = Vec::with_capacity(lowered.len());
    for (i, word) in lowered.split_whitespace().enumerate() {
        if i > 0 {
            key.push(u32::from(' '));
        }
        key.extend(word.chars().map(collation_weight));
    }
    key
}

/// Ordering for human-facing name lists in Polish alphabet order
/// (`a < ą < b < c < ć ... z < ź < ż`), case- and whitespace-insensitive,
/// with the exact text as a tie-break so the order stays total.
#[must_use]
pub fn collation_cmp(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_polish_letters() {
        assert_eq!(normalize("Łódź"), "lodz");
        assert_eq!(normalize("ŻÓŁW  Świętokrzyski"), "zolw swietokrzyski");
        assert_eq!(normalize("  Kraków \t Nowa Huta "), "krakow nowa huta");
    }

    #[test]
    fn fold_diacritics_keeps_case() {
        assert_eq!(fold_diacritics("Łódź"), "Lodz");
        assert_eq!(fold_diacritics("Nowy Sącz, ul. Żółta"), "Nowy Sacz, ul. Zolta");
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn phone_digits_strips_formatting() {
        assert_eq!(phone_digits("+48 (12) 345-67-89"), "48123456789");
        assert_eq!(phone_digits("brak"), "");
    }

    #[test]
    fn national_digits_drop_country_code() {
        assert_eq!(national_phone_digits("+48 123 456 789"), "123456789");
        assert_eq!(national_phone_digits("123 456 789"), "123456789");
        // A nine-digit national number that happens to start with 48 stays whole.
        assert_eq!(national_phone_digits("481 234 567"), "481234567");
    }

    #[test]
    fn normalize_street_removes_abbreviations() {
        assert_eq!(normalize_street("ul. Długa 5"), "dluga 5");
        assert_eq!(normalize_street("Os.Tysiąclecia 3"), "tysiaclecia 3");
        assert_eq!(normalize_street("Al. Jana Pawła II 12"), "jana pawla ii 12");
        assert_eq!(normalize_street("Pulawska 1"), "pulawska 1");
    }

    #[test]
    fn similar_requires_three_char_prefix() {
        assert!(similar("Dom Pomocy Społecznej", "dom pomocy spoleczNej"));
        assert!(similar("Dom Pomocy", "Dom Pomocy Społecznej w Krakowie"));
        assert!(similar("Dom", "Domek"));
        assert!(!similar("Do", "Dom"));
        assert!(!similar("Caritas", "Dom Caritas"));
    }

    #[test]
    fn similar_blank_inputs_are_equal() {
        assert!(similar("", ""));
        assert!(similar("  ", "\t"));
        assert!(!similar("", "Dom"));
    }

    #[test]
    fn token_overlap_is_jaccard() {
        assert!((token_overlap("dom pomocy", "dom pomocy") - 1.0).abs() < f64::EPSILON);
        assert!((token_overlap("dom pomocy", "dom opieki") - 1.0 / 3.0).abs() < 1e-9);
        assert!(token_overlap("", "").abs() < f64::EPSILON);
    }

    #[test]
    fn collation_follows_polish_alphabet() {
        let mut names = vec!["Zakopane", "Łódź", "Kraków", "Lublin", "Kielce"];
        names.sort_by(|a, b| collation_cmp(a, b));
        assert_eq!(names, vec!["Kielce", "Kraków", "Lublin", "Łódź", "Zakopane"]);

        let mut names = vec!["Żary", "Sól", "Łódź", "Zabrze", "Ezdrowo", "Sopot", "Lublin", "Ełk"];
        names.sort_by(|a, b| collation_cmp(a, b));
        assert_eq!(
            names,
            vec!["Ełk", "Ezdrowo", "Lublin", "Łódź", "Sopot", "Sól", "Zabrze", "Żary"]
        );
    }

    #[test]
    fn collation_accented_letter_follows_whole_base_range() {
        assert_eq!(collation_cmp("Lodz", "Łódź"), Ordering::Less);
        assert_eq!(collation_cmp("Lzy", "Łaba"), Ordering::Less);
        assert_eq!(collation_cmp("Ćma", "Cz"), Ordering::Greater);
    }

    #[test]
    fn collation_ignores_case_then_breaks_ties_on_exact_text() {
        assert_eq!(collation_cmp("kraków", "Kraków Nowa"), Ordering::Less);
        assert_eq!(collation_cmp("Kraków", "kraków"), Ordering::Less);
        assert_eq!(collation_cmp("Kraków", "Kraków"), Ordering::Equal);
        // Decomposed input collates like its composed form.
        assert_eq!(collation_key("Sa\u{0328}cz"), collation_key("Sącz"));
        // Foreign accents sort with the base letter.
        assert_eq!(collation_cmp("Café", "Cafz"), Ordering::Less);
    }
}
