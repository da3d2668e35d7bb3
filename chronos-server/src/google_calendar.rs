//! Calendar gateway: Google Calendar over the official API.
//!
//! Credential flow mirrors the provider's installed-app model: an OAuth client
//! config saved locally once (`chronos calendar connect`), a token cache that
//! yup-oauth2 loads/refreshes/persists, and an interactive consent flow bound
//! to a fixed local redirect port when no refresh token exists yet.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use google_calendar3::CalendarHub;
use google_calendar3::api::{Event, EventDateTime};
use google_calendar3::hyper::client::HttpConnector;
use google_calendar3::hyper_rustls::HttpsConnector;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::debug;

use chronos_core::event::{ScheduleEvent, TimeInterval};
use chronos_core::time::parse_iso_lenient;

use crate::config::Config;

// IMPORTANT: use the hyper/oauth2 crates re-exported by google-calendar3 so the
// connector and authenticator types can never drift to a different version.
use google_calendar3::{hyper, hyper_rustls, oauth2};

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/calendar.readonly",
];

const EVENT_LOCATION: &str = "Created by Chronos";

/// Provider-assigned identity of a committed event.
#[derive(Debug, Clone)]
pub struct RemoteEvent {
    pub id: String,
    pub html_link: Option<String>,
}

#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Force credential load/refresh (or the interactive consent flow on
    /// first run). The commit stage calls this once per batch.
    async fn authenticate(&self) -> Result<()>;

    /// Busy intervals in `[range_start, range_end)`, ordered by start time.
    /// Expanded single events only, capped at the configured result count;
    /// callers needing more would have to page, which this gateway does not do.
    async fn list_busy_intervals(
        &self,
        calendar_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<TimeInterval>>;

    async fn create_event(&self, calendar_id: &str, event: &ScheduleEvent) -> Result<RemoteEvent>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleOAuthClient {
    pub client_id: String,
    pub client_secret: String,
    /// Defaults to https://accounts.google.com/o/oauth2/auth
    pub auth_uri: Option<String>,
    /// Defaults to https://oauth2.googleapis.com/token
    pub token_uri: Option<String>,
    /// Defaults to ["http://localhost"]
    pub redirect_uris: Option<Vec<String>>,
}

pub fn save_oauth_client(cfg: &Config, client: &GoogleOAuthClient) -> Result<()> {
    let p = cfg.state_path(&cfg.calendar.oauth_client_file)?;
    fs::write(&p, serde_json::to_string_pretty(client)?)
        .with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn load_oauth_client(cfg: &Config) -> Result<GoogleOAuthClient> {
    let p = cfg.state_path(&cfg.calendar.oauth_client_file)?;
    if !p.exists() {
        bail!(
            "Missing Google OAuth client config at {}. Run: chronos calendar connect",
            p.display()
        );
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(serde_json::from_str(&s)?)
}

type Connector = HttpsConnector<HttpConnector>;

pub struct GoogleCalendar {
    hub: CalendarHub<Connector>,
    auth: oauth2::authenticator::Authenticator<Connector>,
    timezone: Tz,
    timezone_label: String,
    max_busy_results: i32,
}

impl GoogleCalendar {
    /// Build the hub from the saved OAuth client config. The consent flow only
    /// runs when a token is actually requested and no cached one is usable.
    pub async fn from_config(cfg: &Config) -> Result<Self> {
        let client = load_oauth_client(cfg)?;

        let installed = oauth2::ApplicationSecret {
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            auth_uri: client
                .auth_uri
                .clone()
                .unwrap_or_else(|| "https://accounts.google.com/o/oauth2/auth".to_string()),
            token_uri: client
                .token_uri
                .clone()
                .unwrap_or_else(|| "https://oauth2.googleapis.com/token".to_string()),
            redirect_uris: client
                .redirect_uris
                .clone()
                .unwrap_or_else(|| vec!["http://localhost".to_string()]),
            ..Default::default()
        };

        let token_path = cfg.state_path(&cfg.calendar.token_cache_file)?;
        let auth = oauth2::InstalledFlowAuthenticator::builder(
            installed,
            oauth2::InstalledFlowReturnMethod::HTTPPortRedirect(cfg.calendar.oauth_redirect_port),
        )
        .persist_tokens_to_disk(token_path)
        .build()
        .await
        .context("building oauth authenticator")?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("loading native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();
        let hub = CalendarHub::new(hyper::Client::builder().build(connector), auth.clone());

        Ok(Self {
            hub,
            auth,
            timezone: cfg.timezone()?,
            timezone_label: cfg.calendar.timezone.clone(),
            max_busy_results: cfg.calendar.max_busy_results as i32,
        })
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendar {
    async fn authenticate(&self) -> Result<()> {
        self.auth
            .token(SCOPES)
            .await
            .map_err(|e| anyhow::anyhow!("google oauth: {e}"))?;
        Ok(())
    }

    async fn list_busy_intervals(
        &self,
        calendar_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<TimeInterval>> {
        let (_, events) = self
            .hub
            .events()
            .list(calendar_id)
            .time_min(range_start)
            .time_max(range_end)
            .max_results(self.max_busy_results)
            .single_events(true)
            .order_by("startTime")
            .doit()
            .await
            .with_context(|| format!("listing events on '{calendar_id}'"))?;

        let mut intervals = Vec::new();
        for ev in events.items.unwrap_or_default() {
            let start = ev.start.as_ref().and_then(|s| s.date_time);
            let end = ev.end.as_ref().and_then(|e| e.date_time);
            match (start, end) {
                (Some(start), Some(end)) => intervals.push(TimeInterval::new(start, end)),
                _ => {
                    // All-day events carry `date` instead of `dateTime`; they
                    // are not treated as busy. Known gap.
                    debug!(summary = ev.summary.as_deref().unwrap_or(""), "skipping all-day event");
                }
            }
        }

        Ok(intervals)
    }

    async fn create_event(&self, calendar_id: &str, event: &ScheduleEvent) -> Result<RemoteEvent> {
        let start = parse_iso_lenient(&event.start_iso, self.timezone)?;
        let end = parse_iso_lenient(&event.end_iso, self.timezone)?;

        let mut ev = Event::default();
        ev.summary = Some(event.summary.clone());
        ev.description = Some(event.description.clone());
        ev.location = Some(EVENT_LOCATION.to_string());
        ev.color_id = event.color_id.clone();
        ev.start = Some(EventDateTime {
            date_time: Some(start),
            time_zone: Some(self.timezone_label.clone()),
            ..Default::default()
        });
        ev.end = Some(EventDateTime {
            date_time: Some(end),
            time_zone: Some(self.timezone_label.clone()),
            ..Default::default()
        });

        let (_, created) = self
            .hub
            .events()
            .insert(ev, calendar_id)
            .send_updates("all")
            .conference_data_version(1)
            .doit()
            .await
            .with_context(|| format!("inserting event '{}'", event.summary))?;

        Ok(RemoteEvent {
            id: created.id.unwrap_or_default(),
            html_link: created.html_link,
        })
    }
}

/// Interactive connect:
/// - user pastes client_id/client_secret from Google Cloud Console (Desktop app)
/// - we run the OAuth installed-app flow once to seed the token cache
pub async fn connect_interactive(cfg: &Config) -> Result<()> {
    println!("Google Calendar connect\n");
    println!("You need to create OAuth credentials once:\n");
    println!("1) Go to: https://console.cloud.google.com/apis/credentials");
    println!("2) Create credentials -> OAuth client ID");
    println!("3) Application type: Desktop app");
    println!("4) Copy client_id + client_secret\n");

    let client_id = prompt("Paste client_id")?;
    let client_secret = prompt("Paste client_secret")?;

    if !client_id.contains('.') || client_secret.len() < 10 {
        bail!("client_id/client_secret didn't look valid");
    }

    let client = GoogleOAuthClient {
        client_id,
        client_secret,
        auth_uri: Some("https://accounts.google.com/o/oauth2/auth".to_string()),
        token_uri: Some("https://oauth2.googleapis.com/token".to_string()),
        redirect_uris: Some(vec![format!(
            "http://localhost:{}",
            cfg.calendar.oauth_redirect_port
        )]),
    };

    save_oauth_client(cfg, &client)?;

    // Run the consent flow now so serving starts with a warm token cache.
    let gateway = GoogleCalendar::from_config(cfg).await?;
    gateway.authenticate().await?;

    println!(
        "\nConnected. Tokens cached at: {}",
        cfg.state_path(&cfg.calendar.token_cache_file)?.display()
    );
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    use std::io::{self, Write};
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

/// Busy-interval fetch range: start of the current UTC day to +`lookahead_days`.
pub fn busy_range(lookahead_days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();
    (start, start + Duration::days(lookahead_days))
}
