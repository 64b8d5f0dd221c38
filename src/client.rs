use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{Client, Response, Url};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::WxError;
use crate::forecast::{Forecast, ForecastRecord, StorePayload, StoreReceipt};

const USER_AGENT: &str = "wxcity";

/// The three remote collaborators the controller talks to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherBackend: Send + Sync {
    /// POST the city as a multipart form field and parse the JSON array reply.
    async fn lookup(&self, city: &str) -> Result<Forecast, WxError>;

    async fn store(&self, payload: &StorePayload) -> Result<StoreReceipt, WxError>;

    /// GET the fixed sky image.
    async fn fetch_image(&self) -> Result<Vec<u8>, WxError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    api_url: Url,
    store_url: Url,
    image_url: Url,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, WxError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            store_url: config.store_url.clone(),
            image_url: config.image_url.clone(),
        })
    }
}

#[async_trait]
impl WeatherBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn lookup(&self, city: &str) -> Result<Forecast, WxError> {
        let form = Form::new().text("city", city.to_string());
        let res = self
            .http
            .post(self.api_url.clone())
            .multipart(form)
            .send()
            .await?;

        let body = ok_body(res).await?;
        let records: Vec<ForecastRecord> = serde_json::from_slice(&body)?;
        debug!(locations = records.len(), "forecast lookup answered");
        Forecast::new(records)
    }

    #[instrument(skip_all, fields(city = %payload.city))]
    async fn store(&self, payload: &StorePayload) -> Result<StoreReceipt, WxError> {
        let res = self
            .http
            .post(self.store_url.clone())
            .json(payload)
            .send()
            .await?;

        let body = ok_body(res).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(skip(self))]
    async fn fetch_image(&self) -> Result<Vec<u8>, WxError> {
        let res = self.http.get(self.image_url.clone()).send().await?;
        let body = ok_body(res).await?;
        debug!(bytes = body.len(), "image fetched");
        Ok(body)
    }
}

async fn ok_body(res: Response) -> Result<Vec<u8>, WxError> {
    let status = res.status();
    if !status.is_success() {
        debug!(%status, url = %res.url(), "non-success response");
        return Err(WxError::Status(status));
    }
    Ok(res.bytes().await?.to_vec())
}
