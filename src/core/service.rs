// src/core/service.rs

//! Entry point for hosting layers: consults the access and plan collaborators,
//! runs the scan and reports what happened as plain data.

use crate::core::config::ScanConfig;
use crate::core::error::ScanError;
use crate::core::models::{Grade, PlanTier, ScanRequest, ScanResult, Summary};
use crate::core::scanner::run_full_scan;
use crate::core::validation::validate_target;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Claims the hosting layer has already established for the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationClaims {
    /// Allows the request's admin override to unlock every plan gate.
    pub bypass_plan_gates: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub user_id: Option<String>,
    pub claims: AuthorizationClaims,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Answer of the [`AccessGate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub allowed: bool,
    pub status_code: u16,
    pub scans_remaining: Option<u32>,
    pub reset_date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl Permission {
    pub fn allow() -> Self {
        Self { allowed: true, status_code: 200, scans_remaining: None, reset_date: None, reason: None }
    }
}

/// Decides whether a scan may run at all (authentication, rate limits).
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn check(&self, requester: &Requester, meta: &RequestMeta) -> Permission;
}

/// Looks up the subscription plan of a user.
#[async_trait]
pub trait PlanDirectory: Send + Sync {
    async fn plan_for(&self, user_id: &str) -> Option<PlanTier>;
}

/// Audit trail entries, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Initiated { request_id: Uuid, url: String, plan: PlanTier },
    Completed { request_id: Uuid, score: u8, grade: Grade, duration_ms: u64 },
    LimitReached { request_id: Uuid, status_code: u16, reset_date: Option<DateTime<Utc>> },
    Failed { request_id: Uuid, status_code: u16, error: String },
}

/// What the persistence collaborator stores for a finished scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub request_id: Uuid,
    pub url: String,
    pub score: u8,
    pub grade: Grade,
    pub summary: Summary,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub request_id: Uuid,
    pub result: Result<ScanResult, ScanError>,
    pub events: Vec<LifecycleEvent>,
    pub record: Option<ScanRecord>,
}

pub struct ScanService<G, P> {
    gate: G,
    plans: P,
    config: ScanConfig,
}

impl<G: AccessGate, P: PlanDirectory> ScanService<G, P> {
    pub fn new(gate: G, plans: P, config: ScanConfig) -> Self {
        Self { gate, plans, config }
    }

    /// Runs one scan on behalf of `requester`.
    ///
    /// Input errors are reported before the access gate is consulted, so a
    /// malformed request never consumes quota.
    pub async fn execute(
        &self,
        request: ScanRequest,
        requester: &Requester,
        meta: &RequestMeta,
        cancel: CancellationToken,
    ) -> ScanOutcome {
        let request_id = Uuid::new_v4();
        let mut events = Vec::new();

        if let Err(e) = validate_target(&request.url) {
            warn!(%request_id, error = %e, "Rejected scan request.");
            events.push(LifecycleEvent::Failed { request_id, status_code: e.status_code(), error: e.to_string() });
            return ScanOutcome { request_id, result: Err(e), events, record: None };
        }

        let permission = self.gate.check(requester, meta).await;
        if !permission.allowed {
            let reason = permission.reason.clone().unwrap_or_else(|| "access denied".to_string());
            warn!(%request_id, status_code = permission.status_code, %reason, "Scan not permitted.");
            events.push(match permission.status_code {
                429 => LifecycleEvent::LimitReached {
                    request_id,
                    status_code: permission.status_code,
                    reset_date: permission.reset_date,
                },
                status_code => LifecycleEvent::Failed { request_id, status_code, error: reason.clone() },
            });
            let error = ScanError::AccessDenied { status_code: permission.status_code, reason };
            return ScanOutcome { request_id, result: Err(error), events, record: None };
        }

        let directory_plan = match &requester.user_id {
            Some(user_id) => self.plans.plan_for(user_id).await,
            None => None,
        };
        let request = effective_request(request, requester, directory_plan);

        info!(%request_id, url = %request.url, plan = %request.plan, "Scan initiated.");
        events.push(LifecycleEvent::Initiated { request_id, url: request.url.clone(), plan: request.plan });

        let result = run_full_scan(request, &self.config, cancel).await;
        let record = match &result {
            Ok(scan) => {
                events.push(LifecycleEvent::Completed {
                    request_id,
                    score: scan.score,
                    grade: scan.grade,
                    duration_ms: scan.duration_ms,
                });
                Some(ScanRecord {
                    request_id,
                    url: scan.url.clone(),
                    score: scan.score,
                    grade: scan.grade,
                    summary: scan.summary,
                })
            }
            Err(e) => {
                warn!(%request_id, error = %e, "Scan failed.");
                events.push(LifecycleEvent::Failed { request_id, status_code: e.status_code(), error: e.to_string() });
                None
            }
        };

        ScanOutcome { request_id, result, events, record }
    }
}

/// The directory's plan wins over the declared one; the admin flag needs the claim.
fn effective_request(mut request: ScanRequest, requester: &Requester, directory_plan: Option<PlanTier>) -> ScanRequest {
    if let Some(plan) = directory_plan {
        request.plan = plan;
    }
    if request.is_admin_override && !requester.claims.bypass_plan_gates {
        warn!("Admin override requested without the bypass claim, ignoring.");
        request.is_admin_override = false;
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Entitlements;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubGate {
        permission: Permission,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AccessGate for StubGate {
        async fn check(&self, _requester: &Requester, _meta: &RequestMeta) -> Permission {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.permission.clone()
        }
    }

    struct FixedPlans(Option<PlanTier>);

    #[async_trait]
    impl PlanDirectory for FixedPlans {
        async fn plan_for(&self, _user_id: &str) -> Option<PlanTier> {
            self.0
        }
    }

    fn service(permission: Permission) -> ScanService<StubGate, FixedPlans> {
        ScanService::new(StubGate { permission, calls: AtomicUsize::new(0) }, FixedPlans(None), ScanConfig::default())
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_the_gate() {
        let service = service(Permission::allow());
        let outcome = service
            .execute(ScanRequest::new("ftp://example.com", PlanTier::Free), &Requester::default(), &RequestMeta::default(), CancellationToken::new())
            .await;

        assert!(matches!(outcome.result, Err(ScanError::InvalidUrl(_))));
        assert_eq!(service.gate.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(outcome.events.as_slice(), [LifecycleEvent::Failed { status_code: 400, .. }]));
        assert!(outcome.record.is_none());
    }

    #[tokio::test]
    async fn rate_limited_requester_gets_limit_reached() {
        let service = service(Permission {
            allowed: false,
            status_code: 429,
            scans_remaining: Some(0),
            reset_date: None,
            reason: Some("Daily scan limit reached".to_string()),
        });
        let outcome = service
            .execute(ScanRequest::new("https://example.com", PlanTier::Pro), &Requester::default(), &RequestMeta::default(), CancellationToken::new())
            .await;

        match outcome.result {
            Err(ScanError::AccessDenied { status_code, reason }) => {
                assert_eq!(status_code, 429);
                assert_eq!(reason, "Daily scan limit reached");
            }
            other => panic!("expected access denied, got {other:?}"),
        }
        assert!(matches!(outcome.events.as_slice(), [LifecycleEvent::LimitReached { status_code: 429, .. }]));
        assert_eq!(service.gate.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn admin_override_requires_claim() {
        let mut request = ScanRequest::new("https://example.com", PlanTier::Free);
        request.is_admin_override = true;

        let plain = effective_request(request.clone(), &Requester::default(), None);
        assert_eq!(plain.entitlements(), Entitlements::resolve(PlanTier::Free, false));

        let admin = Requester { user_id: None, claims: AuthorizationClaims { bypass_plan_gates: true } };
        let elevated = effective_request(request, &admin, None);
        assert_eq!(elevated.entitlements(), Entitlements { is_pro: true, is_business: true });
    }

    #[test]
    fn directory_plan_overrides_declared_plan() {
        let request = ScanRequest::new("https://example.com", PlanTier::Business);
        let requester = Requester { user_id: Some("u-1".to_string()), ..Default::default() };
        assert_eq!(effective_request(request, &requester, Some(PlanTier::Free)).plan, PlanTier::Free);
    }

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let event = LifecycleEvent::LimitReached { request_id: Uuid::nil(), status_code: 429, reset_date: None };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "limit_reached");
    }
}
