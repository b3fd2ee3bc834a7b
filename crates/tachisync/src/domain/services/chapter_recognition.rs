use fancy_regex::{Captures, Regex};
use once_cell::sync::Lazy;

/// All cases with Ch.xx, e.g. "Mokushiroku Alice Vol.1 Ch. 4: Misrepresentation" -> 4
static BASIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?<=ch\.) *([0-9]+)(\.[0-9]+)?(\.?[a-z]+)?").expect("valid chapter regex")
});

/// Example: Bleach 567: Down With Snowwhite -> 567
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)(\.[0-9]+)?(\.?[a-z]+)?").expect("valid number regex"));

/// Volume and season tags that would otherwise be taken as the chapter number
static UNWANTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:v|ver|vol|version|volume|season|s)[^a-z]?[0-9]+")
        .expect("valid unwanted regex")
});

/// Keeps "5 extra" together so it parses as 5.99
static UNWANTED_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(?=extra|special|omake)").expect("valid whitespace regex"));

const CHAPTER_TRIM_CHARS: &[char] = &[' ', '-', '_', ',', ':'];

/// Strip the manga title and separator noise some sources prepend to chapter names.
pub fn sanitize_chapter_name(name: &str, manga_title: &str) -> String {
    let name = name.trim();
    let name = if manga_title.is_empty() {
        name
    } else {
        name.strip_prefix(manga_title).unwrap_or(name)
    };

    name.trim_matches(CHAPTER_TRIM_CHARS).to_string()
}

/// Recognize the chapter number from its name.
///
/// A number already provided by the source is kept when it is known (`> -1`)
/// or explicitly marked as unnumbered (`-2`).
pub fn parse_chapter_number(
    manga_title: &str,
    chapter_name: &str,
    chapter_number: Option<f64>,
) -> f64 {
    if let Some(number) = chapter_number {
        if number == -2.0 || number > -1.0 {
            return number;
        }
    }

    let mut clean_name = chapter_name.to_lowercase();
    let title = manga_title.to_lowercase();
    if !title.is_empty() {
        clean_name = clean_name.replace(&title, "");
    }
    let clean_name = clean_name.trim().replace(',', ".").replace('-', ".");
    let clean_name = UNWANTED_WHITESPACE.replace_all(&clean_name, "").into_owned();

    let matches: Vec<Captures> = NUMBER
        .captures_iter(&clean_name)
        .filter_map(Result::ok)
        .collect();

    match matches.len() {
        0 => return chapter_number.unwrap_or(-1.0),
        1 => {}
        _ => {
            let name = UNWANTED.replace_all(&clean_name, "");

            if let Ok(Some(captures)) = BASIC.captures(&name) {
                return number_from_captures(&captures);
            }

            // the first number may have been one of the removed tags
            if let Ok(Some(captures)) = NUMBER.captures(&name) {
                return number_from_captures(&captures);
            }
        }
    }

    number_from_captures(&matches[0])
}

fn number_from_captures(captures: &Captures) -> f64 {
    let initial = captures
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let decimal = captures.get(2).map(|m| m.as_str());
    let alpha = captures.get(3).map(|m| m.as_str());

    initial + check_for_decimal(decimal, alpha)
}

fn check_for_decimal(decimal: Option<&str>, alpha: Option<&str>) -> f64 {
    if let Some(decimal) = decimal {
        return format!("0{decimal}").parse().unwrap_or(0.0);
    }

    if let Some(alpha) = alpha {
        if alpha.contains("extra") {
            return 0.99;
        }
        if alpha.contains("omake") {
            return 0.98;
        }
        if alpha.contains("special") {
            return 0.97;
        }

        let trimmed = alpha.trim_start_matches('.');
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return parse_alpha_postfix(c);
        }
    }

    0.0
}

/// x.a -> x.1, x.b -> x.2, ...
fn parse_alpha_postfix(alpha: char) -> f64 {
    let number = alpha as i64 - ('a' as i64 - 1);
    if !(1..10).contains(&number) {
        return 0.0;
    }

    number as f64 / 10.0
}
