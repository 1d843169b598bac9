use crate::error::{AppError, Result};
use crate::models::MarketSegment;
use crate::services::provider::{
    MarketDataProvider, OrderFlowResponse, PriceResponse, ProviderError, RawBrokerRow,
};
use async_trait::async_trait;
use serde_json::Value;
use std::io::{Cursor, Read};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_KIS_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";

const INQUIRE_MEMBER_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-member";
const INQUIRE_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-price";
const TR_INQUIRE_MEMBER: &str = "FHKST01010600";
const TR_INQUIRE_PRICE: &str = "FHKST01010100";

/// Market division code for equities
const MARKET_DIV_EQUITY: &str = "J";

const KOSPI_MASTER_URL: &str = "https://new.real.download.dws.co.kr/common/master/kospi_code.mst.zip";
const KOSDAQ_MASTER_URL: &str = "https://new.real.download.dws.co.kr/common/master/kosdaq_code.mst.zip";

/// Fixed-width trailer of each master file line (after the name column)
const KOSPI_MASTER_TRAILER: usize = 228;
const KOSDAQ_MASTER_TRAILER: usize = 222;

/// Width of the short code column at the start of each master line
const MASTER_CODE_WIDTH: usize = 9;

/// Broker ranks returned by inquire-member
const MEMBER_RANKS: usize = 5;

/// Credentials attached to every quotation request
#[derive(Clone)]
pub struct KisCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub access_token: String,
    /// "P" personal, "B" corporate
    pub custtype: String,
}

impl std::fmt::Debug for KisCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KisCredentials")
            .field("app_key", &"***")
            .field("app_secret", &"***")
            .field("access_token", &"***")
            .field("custtype", &self.custtype)
            .finish()
    }
}

/// Korea Investment & Securities REST quotation client
///
/// Performs exactly one HTTP request per call. The token is taken as
/// configured; issuing and refreshing it happens outside this process.
pub struct KisClient {
    base_url: String,
    credentials: KisCredentials,
    client: reqwest::Client,
}

impl KisClient {
    pub fn new(base_url: String, credentials: KisCredentials) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid KIS base URL: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        info!(base_url = %base_url, custtype = %credentials.custtype, "Created KIS client");

        Ok(Self {
            base_url,
            credentials,
            client,
        })
    }

    /// Build from `KIS_APP_KEY`, `KIS_APP_SECRET`, `KIS_ACCESS_TOKEN` and the
    /// optional `KIS_BASE_URL` / `KIS_CUSTTYPE`
    pub fn from_env() -> Result<Self> {
        let credentials = KisCredentials {
            app_key: required_env("KIS_APP_KEY")?,
            app_secret: required_env("KIS_APP_SECRET")?,
            access_token: required_env("KIS_ACCESS_TOKEN")?,
            custtype: std::env::var("KIS_CUSTTYPE").unwrap_or_else(|_| "P".to_string()),
        };
        let base_url = std::env::var("KIS_BASE_URL").unwrap_or_else(|_| DEFAULT_KIS_BASE_URL.to_string());
        Self::new(base_url, credentials)
    }

    async fn get_quotation(&self, path: &str, tr_id: &str, ticker_id: &str) -> std::result::Result<Value, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(ticker = %ticker_id, tr_id = %tr_id, "KIS request");

        let response = self
            .client
            .get(&url)
            .header("content-type", "application/json; charset=utf-8")
            .header("authorization", format!("Bearer {}", self.credentials.access_token))
            .header("appkey", &self.credentials.app_key)
            .header("appsecret", &self.credentials.app_secret)
            .header("tr_id", tr_id)
            .header("custtype", &self.credentials.custtype)
            .query(&[("FID_COND_MRKT_DIV_CODE", MARKET_DIV_EQUITY), ("FID_INPUT_ISCD", ticker_id)])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))?;

        parse_envelope(body)
    }

    async fn download(&self, url: &str) -> std::result::Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: format!("master file download failed: {}", url),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl MarketDataProvider for KisClient {
    fn id(&self) -> &'static str {
        "kis"
    }

    async fn fetch_order_flow(&self, ticker_id: &str) -> std::result::Result<OrderFlowResponse, ProviderError> {
        let output = self.get_quotation(INQUIRE_MEMBER_PATH, TR_INQUIRE_MEMBER, ticker_id).await?;
        Ok(parse_member_output(&output))
    }

    async fn fetch_price_snapshot(&self, ticker_id: &str) -> std::result::Result<PriceResponse, ProviderError> {
        let output = self.get_quotation(INQUIRE_PRICE_PATH, TR_INQUIRE_PRICE, ticker_id).await?;
        Ok(parse_price_output(&output))
    }

    async fn fetch_market_cap(&self, ticker_id: &str) -> std::result::Result<u64, ProviderError> {
        let output = self.get_quotation(INQUIRE_PRICE_PATH, TR_INQUIRE_PRICE, ticker_id).await?;
        parse_market_cap(&output)
    }

    async fn list_symbols(&self, segment: MarketSegment) -> std::result::Result<Vec<String>, ProviderError> {
        let (url, trailer) = match segment {
            MarketSegment::Kospi => (KOSPI_MASTER_URL, KOSPI_MASTER_TRAILER),
            MarketSegment::Kosdaq => (KOSDAQ_MASTER_URL, KOSDAQ_MASTER_TRAILER),
        };

        let archive = self.download(url).await?;
        let codes = read_master_archive(&archive, trailer)?;
        info!(segment = segment.as_str(), symbols = codes.len(), "Loaded market listing");
        Ok(codes)
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} is not set", name)))
}

/// Check `rt_cd` and return the `output` object
pub fn parse_envelope(mut body: Value) -> std::result::Result<Value, ProviderError> {
    let rt_cd = body["rt_cd"].as_str().unwrap_or_default();
    if rt_cd != "0" {
        return Err(ProviderError::Rejected {
            code: body["msg_cd"].as_str().unwrap_or(rt_cd).to_string(),
            message: body["msg1"].as_str().unwrap_or("no message").trim().to_string(),
        });
    }

    match body.get_mut("output").map(Value::take) {
        Some(output) if output.is_object() => Ok(output),
        _ => Err(ProviderError::InvalidResponse("missing 'output' object".to_string())),
    }
}

/// Raw text of an output field; numbers are rendered, blanks are `None`
fn field(output: &Value, key: &str) -> Option<String> {
    match &output[key] {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_member_output(output: &Value) -> OrderFlowResponse {
    let side = |name_key: &str, qty_key: &str| -> Vec<RawBrokerRow> {
        (1..=MEMBER_RANKS)
            .map(|rank| {
                RawBrokerRow::new(
                    field(output, &format!("{}{}", name_key, rank)).unwrap_or_default(),
                    field(output, &format!("{}{}", qty_key, rank)).unwrap_or_default(),
                )
            })
            .collect()
    };

    OrderFlowResponse {
        buy: side("shnu_mbcr_name", "total_shnu_qty"),
        sell: side("seln_mbcr_name", "total_seln_qty"),
    }
}

pub fn parse_price_output(output: &Value) -> PriceResponse {
    PriceResponse {
        price: field(output, "stck_prpr"),
        cumulative_volume: field(output, "acml_vol"),
        strength: field(output, "prdy_vrss_vol_rt"),
    }
}

/// HTS market cap (`hts_avls`, in 100M KRW units)
pub fn parse_market_cap(output: &Value) -> std::result::Result<u64, ProviderError> {
    field(output, "hts_avls")
        .as_deref()
        .and_then(crate::utils::parse_count_str)
        .ok_or_else(|| ProviderError::InvalidResponse("missing or invalid 'hts_avls'".to_string()))
}

/// Short codes from a master file body, in listing order
pub fn parse_master_codes(data: &[u8], trailer_width: usize) -> Vec<String> {
    data.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| line.len() > trailer_width + MASTER_CODE_WIDTH)
        .filter_map(|line| {
            let code = String::from_utf8_lossy(&line[..MASTER_CODE_WIDTH]).trim().to_string();
            if !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric()) {
                Some(code)
            } else {
                None
            }
        })
        .collect()
}

/// Unpack the single master file from its zip archive
pub fn read_master_archive(archive: &[u8], trailer_width: usize) -> std::result::Result<Vec<String>, ProviderError> {
    let invalid = |e: zip::result::ZipError| ProviderError::InvalidResponse(format!("master archive: {}", e));

    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).map_err(invalid)?;
    let mut entry = zip.by_index(0).map_err(invalid)?;
    let mut data = Vec::new();
    entry
        .read_to_end(&mut data)
        .map_err(|e| ProviderError::InvalidResponse(format!("master archive: {}", e)))?;

    Ok(parse_master_codes(&data, trailer_width))
}
