//! Resumable IP geolocation.
//!
//! [`GeoBatch`] geolocates a list of IPs through a [`GeoLookup`] and appends
//! `ip_orig,<lookup csv>` lines to an output file in `staging_ipgeo` column
//! order. IPs already present in the output are skipped, so an interrupted
//! run picks up where it stopped. Rate-limited lookups sleep and retry the
//! same IP; other failures are recorded and skipped.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use http_body_util::BodyExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use nectar_core::config::GeolocationConfig;

use crate::error::{IngestError, IngestResult};

/// Header of the geolocation output file, matching `staging_ipgeo`.
pub const OUTPUT_HEADER: &str = "IP_orig,IP,country_code,country_name,region_code,region_name,city,zip_code,time_zone,latitude,longitude,metro_code";

/// Answer from a geolocation service for one IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoResponse {
    /// One CSV record starting with the normalized IP.
    Found(String),
    /// The service's rate limit was hit; retry later.
    RateLimited,
    /// Any other non-success status code.
    Failed(u16),
}

/// A geolocation service.
pub trait GeoLookup {
    fn lookup(&self, ip: &str) -> impl Future<Output = IngestResult<GeoResponse>> + Send;
}

/// Geolocation over plain HTTP/1: `GET {base_url}/csv/{ip}`.
#[derive(Debug, Clone)]
pub struct HttpGeoLookup {
    host: String,
    port: u16,
    base_path: String,
    timeout: Duration,
}

impl HttpGeoLookup {
    pub fn new(base_url: &str, timeout: Duration) -> IngestResult<Self> {
        let invalid = |reason: &str| IngestError::InvalidUrl {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };
        let uri: http::Uri = base_url.parse().map_err(|_| invalid("not a valid uri"))?;
        if uri.scheme_str() != Some("http") {
            return Err(invalid("only http:// is supported"));
        }
        let host = uri.host().ok_or_else(|| invalid("missing host"))?;
        Ok(Self {
            host: host.to_string(),
            port: uri.port_u16().unwrap_or(80),
            base_path: uri.path().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn authority(&self) -> String {
        if self.port == 80 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    async fn fetch(&self, ip: &str) -> Result<GeoResponse, String> {
        let authority = self.authority();
        let uri = format!("http://{authority}{}/csv/{ip}", self.base_path);

        let stream = tokio::net::TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| format!("connect: {e}"))?;
        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| format!("handshake: {e}"))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", &authority)
            .header("accept", "application/csv")
            .header("user-agent", "nectar-ingest/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| format!("request: {e}"))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| format!("send: {e}"))?;
        let status = resp.status();
        if status == http::StatusCode::FORBIDDEN || status == http::StatusCode::TOO_MANY_REQUESTS {
            return Ok(GeoResponse::RateLimited);
        }
        if !status.is_success() {
            debug!(%status, %uri, "geolocation non-2xx");
            return Ok(GeoResponse::Failed(status.as_u16()));
        }
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("body: {e}"))?
            .to_bytes();
        Ok(GeoResponse::Found(
            String::from_utf8_lossy(&body).trim_end().to_string(),
        ))
    }
}

impl GeoLookup for HttpGeoLookup {
    fn lookup(&self, ip: &str) -> impl Future<Output = IngestResult<GeoResponse>> + Send {
        let ip = ip.to_string();
        async move {
            match tokio::time::timeout(self.timeout, self.fetch(&ip)).await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(reason)) => Err(IngestError::Transport { ip, reason }),
                Err(_) => Err(IngestError::Transport {
                    ip,
                    reason: "timed out".to_string(),
                }),
            }
        }
    }
}

/// Pacing for a [`GeoBatch`].
#[derive(Debug, Clone)]
pub struct GeoBatchOptions {
    /// Append buffered results after this many lookups.
    pub write_interval: usize,
    /// Pause after a rate-limit response or a run of transport errors.
    pub sleep_interval: Duration,
    /// Consecutive transport errors tolerated before pausing.
    pub error_streak_limit: usize,
}

impl Default for GeoBatchOptions {
    fn default() -> Self {
        Self {
            write_interval: 1000,
            sleep_interval: Duration::from_secs(300),
            error_streak_limit: 10,
        }
    }
}

impl From<&GeolocationConfig> for GeoBatchOptions {
    fn from(config: &GeolocationConfig) -> Self {
        Self {
            write_interval: config.write_interval,
            sleep_interval: Duration::from_secs(config.sleep_interval_secs),
            ..Self::default()
        }
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoSummary {
    /// Distinct IPs in the input.
    pub unique: usize,
    /// Skipped because the output already had them.
    pub already_located: usize,
    pub located: usize,
    pub rate_limited: usize,
    pub failed: Vec<String>,
}

/// Read a one-IP-per-line list, dropping blanks and duplicates while
/// keeping first-seen order.
pub async fn load_ip_list(path: &Path) -> IngestResult<Vec<String>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IngestError::io(path, e))?;
    let mut seen = HashSet::new();
    let ips: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|ip| !ip.is_empty() && seen.insert(ip.to_string()))
        .map(str::to_string)
        .collect();
    info!(path = %path.display(), unique = ips.len(), "loaded ip list");
    Ok(ips)
}

/// IPs already present in an output file. A missing file has none.
pub async fn located_ips(output: &Path) -> IngestResult<HashSet<String>> {
    let text = match tokio::fs::read_to_string(output).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(IngestError::io(output, e)),
    };
    Ok(text
        .lines()
        .skip_while(|l| *l == OUTPUT_HEADER)
        .filter_map(|l| l.split(',').next())
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect())
}

pub struct GeoBatch<L> {
    lookup: L,
    options: GeoBatchOptions,
}

impl<L: GeoLookup> GeoBatch<L> {
    pub fn new(lookup: L, options: GeoBatchOptions) -> Self {
        Self { lookup, options }
    }

    /// Geolocate every IP in `ips` not yet in `output`, appending results.
    pub async fn run(&self, ips: &[String], output: &Path) -> IngestResult<GeoSummary> {
        let done = located_ips(output).await?;
        let mut seen = HashSet::new();
        let unique: Vec<&String> = ips.iter().filter(|ip| seen.insert(ip.as_str())).collect();
        let pending: Vec<&String> = unique
            .iter()
            .copied()
            .filter(|ip| !done.contains(ip.as_str()))
            .collect();

        let mut summary = GeoSummary {
            unique: unique.len(),
            already_located: unique.len() - pending.len(),
            ..GeoSummary::default()
        };
        info!(
            unique = summary.unique,
            already_located = summary.already_located,
            pending = pending.len(),
            "starting geolocation batch"
        );

        append(output, &[OUTPUT_HEADER.to_string()], true).await?;

        let write_interval = self.options.write_interval.max(1);
        let mut buffer: Vec<String> = Vec::new();
        let mut error_streak = 0usize;
        let mut flushed_at = 0usize;

        for (index, ip) in pending.iter().enumerate() {
            loop {
                match self.lookup.lookup(ip).await {
                    Ok(GeoResponse::Found(csv)) => {
                        buffer.push(format!("{ip},{csv}"));
                        summary.located += 1;
                        error_streak = 0;
                        break;
                    }
                    Ok(GeoResponse::RateLimited) => {
                        summary.rate_limited += 1;
                        warn!(
                            %ip,
                            sleep_secs = self.options.sleep_interval.as_secs(),
                            "rate limited; sleeping before retry"
                        );
                        tokio::time::sleep(self.options.sleep_interval).await;
                    }
                    Ok(GeoResponse::Failed(code)) => {
                        warn!(%ip, code, "geolocation failed");
                        summary.failed.push(ip.to_string());
                        error_streak = 0;
                        break;
                    }
                    Err(e) => {
                        warn!(%ip, error = %e, "geolocation request failed");
                        summary.failed.push(ip.to_string());
                        error_streak += 1;
                        if error_streak >= self.options.error_streak_limit {
                            warn!(
                                errors = error_streak,
                                "too many consecutive request errors; pausing"
                            );
                            tokio::time::sleep(self.options.sleep_interval).await;
                            error_streak = 0;
                        }
                        break;
                    }
                }
            }

            let attempted = index + 1;
            if attempted % write_interval == 0 {
                debug!(from = flushed_at, to = attempted, "writing geolocations");
                append(output, &buffer, false).await?;
                buffer.clear();
                flushed_at = attempted;
            }
        }

        append(output, &buffer, false).await?;
        info!(
            located = summary.located,
            failed = summary.failed.len(),
            rate_limited = summary.rate_limited,
            "geolocation batch complete"
        );
        Ok(summary)
    }
}

/// Append lines to `path`. With `only_if_empty`, write nothing unless the
/// file is new or empty.
async fn append(path: &Path, lines: &[String], only_if_empty: bool) -> IngestResult<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| IngestError::io(path, e))?;
    if only_if_empty {
        let len = file
            .metadata()
            .await
            .map_err(|e| IngestError::io(path, e))?
            .len();
        if len > 0 {
            return Ok(());
        }
    }
    let mut text = lines.join("\n");
    text.push('\n');
    file.write_all(text.as_bytes())
        .await
        .map_err(|e| IngestError::io(path, e))?;
    file.flush().await.map_err(|e| IngestError::io(path, e))?;
    Ok(())
}
