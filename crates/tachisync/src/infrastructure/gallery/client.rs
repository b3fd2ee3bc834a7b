use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::{StatusCode, header};

use crate::{
    domain::{
        entities::{
            favorite::{EH_SOURCE_ID, EXH_SOURCE_ID, FavoriteEntry},
            gallery::{Gallery, RemoteFavorites},
        },
        repositories::gallery::{GalleryRepository, GalleryRepositoryError},
    },
    infrastructure::config::GalleryConfig,
};

use super::parser;

/// Logged in session against the gallery site
#[derive(Clone)]
pub struct GalleryClient {
    client: reqwest::Client,
    base_url: String,
    cookie: String,
}

impl GalleryClient {
    pub fn new(config: &GalleryConfig) -> Result<Self, GalleryRepositoryError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tachisync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie: config.cookie(),
        })
    }

    pub fn source_id(&self) -> i64 {
        if self.base_url.contains("exhentai") {
            EXH_SOURCE_ID
        } else {
            EH_SOURCE_ID
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str) -> Result<String, GalleryRepositoryError> {
        debug!("GET {url}");
        let res = self
            .client
            .get(url)
            .header(header::COOKIE, &self.cookie)
            .send()
            .await?;

        match res.status() {
            StatusCode::NOT_FOUND => Err(GalleryRepositoryError::NotFound),
            status if !status.is_success() => Err(GalleryRepositoryError::Status(status.as_u16())),
            _ => Ok(res.text().await?),
        }
    }

    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<(), GalleryRepositoryError> {
        debug!("POST {url}");
        let res = self
            .client
            .post(url)
            .header(header::COOKIE, &self.cookie)
            .form(form)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(GalleryRepositoryError::Status(res.status().as_u16()));
        }

        Ok(())
    }
}

#[async_trait]
impl GalleryRepository for GalleryClient {
    async fn fetch_favorites(&self) -> Result<RemoteFavorites, GalleryRepositoryError> {
        let mut favorites = RemoteFavorites::default();
        let mut visited = HashSet::new();
        let mut url = Some(format!("{}/favorites.php", self.base_url));

        while let Some(current) = url.take() {
            if !visited.insert(current.clone()) {
                warn!("favorites page {current} was already fetched");
                break;
            }

            let page = parser::parse_favorites_page(&self.get(&current).await?)?;
            if favorites.categories.is_empty() {
                favorites.categories = page.categories;
            }
            favorites.galleries.extend(page.galleries);
            url = page.next;
        }

        info!(
            "fetched {} favorites in {} categories",
            favorites.galleries.len(),
            favorites.categories.len()
        );

        Ok(favorites)
    }

    async fn fetch_gallery(
        &self,
        gid: &str,
        token: &str,
    ) -> Result<Gallery, GalleryRepositoryError> {
        let html = self
            .get(&format!("{}/g/{gid}/{token}/", self.base_url))
            .await?;

        parser::parse_gallery_page(&html, gid, token)
    }

    async fn delete_favorites(&self, gids: &[String]) -> Result<(), GalleryRepositoryError> {
        if gids.is_empty() {
            return Ok(());
        }

        let mut form = vec![("ddact", "delete")];
        form.extend(gids.iter().map(|gid| ("modifygids[]", gid.as_str())));
        form.push(("apply", "Apply"));

        self.post_form(&format!("{}/favorites.php", self.base_url), &form)
            .await
    }

    async fn add_favorite(&self, entry: &FavoriteEntry) -> Result<(), GalleryRepositoryError> {
        let url = format!(
            "{}/gallerypopups.php?gid={}&t={}&act=addfav",
            self.base_url, entry.gid, entry.token
        );
        let category = entry.category.to_string();

        self.post_form(
            &url,
            &[
                ("favcat", category.as_str()),
                ("favnote", ""),
                ("apply", "Add to Favorites"),
                ("update", "1"),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn client(base_url: &str) -> GalleryClient {
        GalleryClient::new(&GalleryConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_source_id_follows_base_url() {
        assert_eq!(client("https://exhentai.org/").source_id(), EXH_SOURCE_ID);
        assert_eq!(client("https://e-hentai.org").source_id(), EH_SOURCE_ID);
        assert_eq!(client("https://exhentai.org/").base_url(), "https://exhentai.org");
    }
}
