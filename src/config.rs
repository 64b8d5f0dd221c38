use std::path::PathBuf;

use reqwest::Url;

use crate::cli::Args;
use crate::error::WxError;

pub const DEFAULT_API_URL: &str = "http://ALB-1818007221.eu-north-1.elb.amazonaws.com:30000/api/";
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000/";
pub const STORE_PATH: &str = "store-weather/";
pub const IMAGE_URL: &str = "https://omerapp99bucket.s3.eu-north-1.amazonaws.com/sky.jpg";
pub const IMAGE_FILE_NAME: &str = "sky.jpg";

/// How search responses that arrive out of order are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchOrdering {
    /// Apply every response as it arrives, even one from a superseded search.
    #[default]
    AsArrived,
    /// Drop responses older than the most recently dispatched search.
    LatestOnly,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub store_url: Url,
    pub image_url: Url,
    pub download_dir: PathBuf,
    pub ordering: SearchOrdering,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self, WxError> {
        let api_url = parse_url(args.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        let origin = parse_url(args.origin.as_deref().unwrap_or(DEFAULT_ORIGIN))?;
        let store_url = origin
            .join(STORE_PATH)
            .map_err(|_| WxError::InvalidUrl(format!("{origin}{STORE_PATH}")))?;

        let ordering = if args.latest_only {
            SearchOrdering::LatestOnly
        } else {
            SearchOrdering::AsArrived
        };

        Ok(Self {
            api_url,
            store_url,
            image_url: parse_url(IMAGE_URL)?,
            download_dir: args.download_dir.clone(),
            ordering,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, WxError> {
    Url::parse(raw).map_err(|_| WxError::InvalidUrl(raw.to_string()))
}
