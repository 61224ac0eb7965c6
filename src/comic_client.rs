use std::time;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use rand::Rng;
use reqwest::Client;
use url::Url;

/// Comic metadata, as served by the xkcd JSON API
#[derive(Debug, serde::Deserialize)]
pub struct Comic {
    pub num: u32,
    pub title: String,
    pub img: String,
    pub alt: String,
    pub day: String,
    pub month: String,
    pub year: String,
}

/// Rendered digest, ready to be mailed
#[derive(Debug, Clone)]
pub struct Digest {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Client for the comic JSON API
pub struct ComicClient {
    http_client: Client,
    base_url: Url,
    unsubscribe_url: Url,
}

impl ComicClient {
    pub fn new(
        base_url: Url,
        unsubscribe_url: Url,
        timeout: time::Duration,
    ) -> reqwest::Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            unsubscribe_url,
        })
    }

    /// Pick a random comic among those published so far and render it
    #[tracing::instrument(name = "Fetching digest content", skip(self))]
    pub async fn fetch_digest(&self) -> anyhow::Result<Digest> {
        let latest = self.get_comic("info.0.json").await?;
        let num = rand::thread_rng().gen_range(1..=latest.num.max(1));
        let comic = if num == latest.num {
            latest
        } else {
            self.get_comic(&format!("{num}/info.0.json")).await?
        };
        Ok(comic.render(Utc::now().date_naive(), &self.unsubscribe_url))
    }

    async fn get_comic(&self, resource: &str) -> anyhow::Result<Comic> {
        let url = self
            .base_url
            .join(resource)
            .with_context(|| format!("Failed to build the comic URL for {resource}"))?;
        let comic: Comic = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to reach the comic API")?
            .error_for_status()
            .context("The comic API returned an error")?
            .json()
            .await
            .context("Failed to parse comic metadata")?;
        Ok(comic)
    }
}

impl Comic {
    /// Render the comic as the digest for `date`, ending with a link to `unsubscribe_url`
    pub fn render(&self, date: NaiveDate, unsubscribe_url: &Url) -> Digest {
        let title = escape_html(&self.title);
        let img = escape_html(&self.img);
        let alt = escape_html(&self.alt);
        let unsubscribe = escape_html(unsubscribe_url.as_str());
        let published = format!("{}/{}/{}", self.month, self.day, self.year);

        let html = format!(
            "<h2>Your Daily Comic</h2>\
            <h3>#{num}: {title}</h3>\
            <img src=\"{img}\" alt=\"{alt}\">\
            <p><i>{alt}</i></p>\
            <p>Published: {published}</p>\
            <p>To unsubscribe, visit: <a href=\"{unsubscribe}\">Unsubscribe</a></p>",
            num = self.num,
        );
        let text = format!(
            "Your Daily Comic\n\n#{num}: {title}\n{img}\n\n{alt}\n\nPublished: {published}\n\n\
            To unsubscribe, visit: {unsubscribe_url}\n",
            num = self.num,
            title = self.title,
            img = self.img,
            alt = self.alt,
        );
        Digest {
            subject: format!("Your Daily Comic - {}", date.format("%B %-d, %Y")),
            html,
            text,
        }
    }
}

/// Escape text for inclusion in HTML content and attribute values
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}
