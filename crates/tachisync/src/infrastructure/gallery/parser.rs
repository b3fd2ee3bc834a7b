use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{
    entities::{
        favorite::{parse_gallery_url, FavoriteEntry, MAX_CATEGORIES},
        gallery::{Gallery, GalleryVersion},
    },
    repositories::gallery::GalleryRepositoryError,
};

/// Border colours of the favorite slot marker, index is the slot number
const SLOT_COLORS: [&str; 10] = [
    "000", "f00", "fa0", "dd0", "080", "9f4", "4bf", "00f", "508", "e8e",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FavoritesPage {
    pub categories: Vec<String>,
    pub galleries: Vec<FavoriteEntry>,
    /// absolute url of the next page
    pub next: Option<String>,
}

fn selector(selectors: &str) -> Result<Selector, GalleryRepositoryError> {
    Selector::parse(selectors)
        .map_err(|e| GalleryRepositoryError::Parse(format!("bad selector {selectors}: {e}")))
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_date(text: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT)
        .ok()
        .map(|date| date.and_utc().timestamp_millis())
}

fn slot_from_style(style: &str) -> Option<i32> {
    let color = style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .find(|(property, _)| property.trim() == "border-color")?
        .1
        .trim()
        .trim_start_matches('#')
        .to_lowercase();

    SLOT_COLORS
        .iter()
        .position(|c| *c == color)
        .map(|index| index as i32)
}

pub fn parse_favorites_page(html: &str) -> Result<FavoritesPage, GalleryRepositoryError> {
    let document = Html::parse_document(html);

    let category_selector = selector("div.fp")?;
    let row_selector = selector("table.itg tr")?;
    let link_selector = selector("a[href*=\"/g/\"]")?;
    let title_selector = selector(".glink")?;
    let posted_selector = selector("div[id^=\"posted_\"]")?;
    let next_selector = selector("a#unext")?;

    // the last entry is "Show All Favorites", which has no count column
    let categories: Vec<String> = document
        .select(&category_selector)
        .filter_map(|element| {
            let children: Vec<ElementRef> = element.child_elements().collect();
            (children.len() == 3).then(|| text_of(children[2]))
        })
        .take(MAX_CATEGORIES as usize + 1)
        .collect();

    if categories.is_empty() && document.select(&row_selector).next().is_none() {
        return Err(GalleryRepositoryError::NotLoggedIn);
    }

    let mut galleries = vec![];
    for row in document.select(&row_selector) {
        let Some((gid, token)) = row
            .select(&link_selector)
            .find_map(|a| a.value().attr("href").and_then(parse_gallery_url))
        else {
            continue;
        };
        let Some(category) = row
            .select(&posted_selector)
            .next()
            .and_then(|posted| posted.value().attr("style"))
            .and_then(slot_from_style)
        else {
            warn!("gallery {gid} has no favorite slot marker");
            continue;
        };
        let title = row
            .select(&title_selector)
            .next()
            .map(text_of)
            .unwrap_or_default();

        galleries.push(FavoriteEntry {
            gid,
            token,
            category,
            title,
        });
    }

    let next = document
        .select(&next_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    Ok(FavoritesPage {
        categories,
        galleries,
        next,
    })
}

fn is_not_found(document: &Html) -> bool {
    const MESSAGES: [&str; 3] = [
        "Key missing, or incorrect key provided.",
        "Gallery not found.",
        "This gallery has been removed or is unavailable.",
    ];

    let body = document.root_element().text().collect::<String>();
    MESSAGES.iter().any(|message| body.contains(message))
}

pub fn parse_gallery_page(
    html: &str,
    gid: &str,
    token: &str,
) -> Result<Gallery, GalleryRepositoryError> {
    let document = Html::parse_document(html);

    if is_not_found(&document) {
        return Err(GalleryRepositoryError::NotFound);
    }

    let title = document
        .select(&selector("#gn")?)
        .next()
        .map(text_of)
        .ok_or_else(|| GalleryRepositoryError::Parse(format!("gallery {gid} has no title")))?;

    let label_selector = selector(".gdt1")?;
    let value_selector = selector(".gdt2")?;
    let posted = document
        .select(&selector("#gdd tr")?)
        .find(|row| {
            row.select(&label_selector)
                .next()
                .is_some_and(|label| text_of(label) == "Posted:")
        })
        .and_then(|row| row.select(&value_selector).next())
        .and_then(|value| parse_date(&text_of(value)))
        .unwrap_or(0);

    let mut newer_versions = vec![];
    for link in document.select(&selector("#gnd a")?) {
        let Some((gid, token)) = link.value().attr("href").and_then(parse_gallery_url) else {
            continue;
        };
        // the link is followed by a text node like ", added 2023-01-02 13:45"
        let posted = link
            .next_sibling()
            .and_then(|node| node.value().as_text().map(|text| text.to_string()))
            .and_then(|text| {
                text.trim()
                    .trim_start_matches(',')
                    .trim()
                    .strip_prefix("added")
                    .and_then(parse_date)
            })
            .unwrap_or(0);

        newer_versions.push(GalleryVersion {
            gid,
            token,
            title: text_of(link),
            posted,
        });
    }

    Ok(Gallery {
        gid: gid.to_string(),
        token: token.to_string(),
        title,
        posted,
        newer_versions,
    })
}
