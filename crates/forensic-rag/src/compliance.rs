// Compliance enrichment - industry audit metadata on forensic reports

use crate::config::OnExisting;
use crate::error::{ForensicError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use forensic_core::{ForensicReport, Industry};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Time source for audit timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Audit tag for industries that require an audit trail, None for the rest
pub fn audit_type(industry: Industry) -> Option<&'static str> {
    match industry {
        Industry::Fintech => Some("Forensic-P2PE"),
        Industry::Healthcare => Some("Forensic-HIPAA"),
        // no compliance rule: reports pass through untouched
        Industry::General | Industry::Ecommerce | Industry::Saas | Industry::Gaming => None,
    }
}

pub struct ComplianceEnricher {
    clock: Arc<dyn Clock>,
    on_existing: OnExisting,
}

impl ComplianceEnricher {
    pub fn new(clock: Arc<dyn Clock>, on_existing: OnExisting) -> Self {
        Self { clock, on_existing }
    }

    /// Attach `compliance_meta` for `industry`.
    ///
    /// Industries without a rule return the report as-is. A report that already
    /// has `compliance_meta` is rejected with `ComplianceMetaExists` or
    /// overwritten, depending on the configured policy.
    pub fn enrich(&self, mut report: ForensicReport, industry: Industry) -> Result<ForensicReport> {
        let Some(audit_type) = audit_type(industry) else {
            debug!(industry = %industry, "No compliance rule, report unchanged");
            return Ok(report);
        };

        if report.compliance_meta().is_some() {
            match self.on_existing {
                OnExisting::Reject => return Err(ForensicError::ComplianceMetaExists),
                OnExisting::Replace => {
                    info!(industry = %industry, "Replacing existing compliance_meta");
                }
            }
        }

        let timestamp = self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true);
        report.set_compliance_meta(json!({
            "audit_type": audit_type,
            "sentinel_verify": true,
            "timestamp": timestamp,
        }));

        info!(industry = %industry, audit_type, "Compliance metadata attached");
        Ok(report)
    }

    /// Same as `enrich`, for an industry given by name.
    /// Unknown names are an identity transform, or `UnknownIndustry` when `strict`.
    pub fn enrich_named(&self, report: ForensicReport, industry: &str, strict: bool) -> Result<ForensicReport> {
        match Industry::from_name(industry) {
            Some(industry) => self.enrich(report, industry),
            None if strict => Err(ForensicError::UnknownIndustry(industry.to_string())),
            None => Ok(report),
        }
    }
}
