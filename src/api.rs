use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::errors::{ApodError, Result};

pub const NASA_API_URL: &str = "https://api.nasa.gov/planetary/apod";

/// The first APOD was published on this date; the API has nothing earlier.
pub fn first_apod_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1995, 6, 16).unwrap()
}

/// Validates a date against the API's available range: first APOD through
/// today, both inclusive. Runs at the CLI/TUI boundary, before anything
/// touches the network or the cache.
pub fn validate_date(date: NaiveDate) -> Result<()> {
    let first = first_apod_date();
    if date < first {
        return Err(ApodError::InvalidDate(format!(
            "{} is before the first APOD ({})",
            date, first
        )));
    }
    let today = Local::now().date_naive();
    if date > today {
        return Err(ApodError::InvalidDate(format!("{} is in the future", date)));
    }
    Ok(())
}

/// APOD metadata as returned by the NASA API. Only the fields the cache
/// consumes are modeled; anything else in the response is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ApodInfo {
    pub title: String,
    pub explanation: String,
    pub media_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hdurl: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl ApodInfo {
    /// URL of the downloadable still image: the high-definition image for
    /// image entries (falling back to the standard URL when the API omits
    /// `hdurl`), the video thumbnail for video entries.
    pub fn image_url(&self) -> Result<&str> {
        match self.media_type.as_str() {
            "image" => self
                .hdurl
                .as_deref()
                .or(self.url.as_deref())
                .ok_or_else(|| {
                    ApodError::UnsupportedMedia("image entry carries no image URL".to_string())
                }),
            "video" => self.thumbnail_url.as_deref().ok_or_else(|| {
                ApodError::UnsupportedMedia("video entry carries no thumbnail URL".to_string())
            }),
            other => Err(ApodError::UnsupportedMedia(format!(
                "media type \"{}\" has no usable image",
                other
            ))),
        }
    }
}

/// Seam between the cache orchestrator and the network. Production uses
/// [`NasaClient`]; tests substitute canned responses.
pub trait ApodSource {
    fn apod_info(&self, date: NaiveDate) -> Result<ApodInfo>;
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct NasaClient {
    http: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
}

impl NasaClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            api_url: NASA_API_URL.to_string(),
            api_key,
        }
    }

    /// Key resolution: $NASA_API_KEY if set, NASA's public demo key
    /// otherwise (rate-limited but sufficient for one image a day).
    pub fn from_env() -> Self {
        let key = std::env::var("NASA_API_KEY").unwrap_or_else(|_| "DEMO_KEY".to_string());
        Self::new(key)
    }

    #[cfg(test)]
    fn with_api_url(api_key: String, api_url: String) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            api_url,
            api_key,
        }
    }
}

impl ApodSource for NasaClient {
    fn apod_info(&self, date: NaiveDate) -> Result<ApodInfo> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("date", date_str.as_str()),
                ("api_key", self.api_key.as_str()),
                // Ask for video thumbnails so video days still yield an image
                ("thumbs", "true"),
            ])
            .send()?
            .error_for_status()?;
        Ok(response.json::<ApodInfo>()?)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}
