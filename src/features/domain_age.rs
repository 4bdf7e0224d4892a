//! Domain registration age lookups (RDAP) with fail-open semantics.
//!
//! The lookup is the only slow sub-operation of feature extraction. Callers go
//! through [`age_days_or_neutral`], which bounds the call with a timeout and
//! maps every failure to [`NEUTRAL_AGE_DAYS`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;

use crate::analyze::signals::is_ip_literal;
use crate::metrics::DOMAIN_AGE_LOOKUP_FAILURES;

/// Value used when the age is unknown (lookup disabled, failed or timed out).
pub const NEUTRAL_AGE_DAYS: f64 = 0.0;

/// Provider abstraction so tests and offline deployments can swap the backend.
#[async_trait::async_trait]
pub trait DomainAgeLookup: Send + Sync {
    /// Age in days since registration, `None` if the registry has no date.
    async fn age_days(&self, domain: &str) -> Result<Option<f64>>;
    fn name(&self) -> &'static str;
}

pub type DynAgeLookup = Arc<dyn DomainAgeLookup>;

/// Always reports "unknown". Used when lookups are disabled in config.
pub struct DisabledLookup;

#[async_trait::async_trait]
impl DomainAgeLookup for DisabledLookup {
    async fn age_days(&self, _domain: &str) -> Result<Option<f64>> {
        Ok(None)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic table-backed lookup for tests and fixtures.
#[derive(Default)]
pub struct FixedAgeLookup {
    pub ages: HashMap<String, f64>,
}

impl FixedAgeLookup {
    pub fn with(mut self, domain: &str, days: f64) -> Self {
        self.ages.insert(domain.to_ascii_lowercase(), days);
        self
    }
}

#[async_trait::async_trait]
impl DomainAgeLookup for FixedAgeLookup {
    async fn age_days(&self, domain: &str) -> Result<Option<f64>> {
        Ok(self.ages.get(&domain.to_ascii_lowercase()).copied())
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// RDAP client (`GET {endpoint}{domain}`), reads the `registration` event.
pub struct RdapLookup {
    http: reqwest::Client,
    endpoint: String,
}

impl RdapLookup {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("phishguard-engine/0.1")
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("building RDAP http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
}

#[derive(Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    action: String,
    #[serde(rename = "eventDate")]
    date: String,
}

#[async_trait::async_trait]
impl DomainAgeLookup for RdapLookup {
    async fn age_days(&self, domain: &str) -> Result<Option<f64>> {
        let url = format!("{}{}", self.endpoint, domain);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("rdap status {} for {}", resp.status(), domain));
        }
        let body: RdapDomain = resp.json().await?;
        let Some(reg) = body.events.iter().find(|e| e.action == "registration") else {
            return Ok(None);
        };
        let when: DateTime<Utc> = DateTime::parse_from_rfc3339(&reg.date)
            .with_context(|| format!("rdap eventDate '{}'", reg.date))?
            .with_timezone(&Utc);
        let secs = (Utc::now() - when).num_seconds().max(0);
        Ok(Some(secs as f64 / 86_400.0))
    }
    fn name(&self) -> &'static str {
        "rdap"
    }
}

/// Registrable part of a host (last two labels). `None` for IPs and bare names.
pub fn registrable_domain(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() || is_ip_literal(&host) {
        return None;
    }
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }
    Some(labels[labels.len() - 2..].join("."))
}

/// Bounded lookup that never fails: errors, timeouts and unknowns map to
/// [`NEUTRAL_AGE_DAYS`].
pub async fn age_days_or_neutral(lookup: &dyn DomainAgeLookup, host: &str, timeout: Duration) -> f64 {
    let Some(domain) = registrable_domain(host) else {
        return NEUTRAL_AGE_DAYS;
    };
    match tokio::time::timeout(timeout, lookup.age_days(&domain)).await {
        Ok(Ok(Some(days))) if days.is_finite() && days >= 0.0 => days,
        Ok(Ok(_)) => NEUTRAL_AGE_DAYS,
        Ok(Err(e)) => {
            counter!(DOMAIN_AGE_LOOKUP_FAILURES).increment(1);
            tracing::debug!(target: "phishguard::lookup", provider = lookup.name(), %domain, error = %e, "domain age lookup failed");
            NEUTRAL_AGE_DAYS
        }
        Err(_) => {
            counter!(DOMAIN_AGE_LOOKUP_FAILURES).increment(1);
            tracing::debug!(target: "phishguard::lookup", provider = lookup.name(), %domain, "domain age lookup timed out");
            NEUTRAL_AGE_DAYS
        }
    }
}
