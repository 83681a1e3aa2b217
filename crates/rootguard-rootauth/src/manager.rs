//! Root authorization manager
//!
//! Owns the in-memory registry of approval requests. Every state transition
//! happens under one lock, so of two racing resolutions exactly one wins and
//! an approval is consumed by at most one caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rootguard_common::{SharedClock, SystemClock};
use rootguard_security::{constant_time_eq, digest, SecureCodeGenerator};

use crate::config::RootAuthConfig;
use crate::error::{Result, RootAuthError};
use crate::models::{NotificationStatus, RequestStatus, RootAuthRequest};
use crate::notifier::{LogNotifier, OutOfBandNotifier};

/// Random bytes per request id (8 hex characters, short enough to type)
const REQUEST_ID_BYTES: usize = 4;

/// Attempts at finding an unused id before giving up
const MAX_ID_ATTEMPTS: usize = 8;

type IdSource = Arc<dyn Fn() -> rootguard_security::Result<String> + Send + Sync>;
type Registry = Arc<Mutex<HashMap<String, RootAuthRequest>>>;

/// Result of trying to move a request out of `PENDING`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionOutcome {
    Applied,
    NotFound,
    AlreadyResolved(RequestStatus),
    Expired,
}

/// Approval state machine for critical operations
pub struct RootAuthorizationManager {
    registry: Registry,
    clock: SharedClock,
    notifier: Arc<dyn OutOfBandNotifier>,
    codes: SecureCodeGenerator,
    id_source: IdSource,
    dispatches: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for RootAuthorizationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootAuthorizationManager")
            .field("requests", &self.registry.lock().len())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl RootAuthorizationManager {
    /// Create a manager dispatching through `notifier` and reading time from `clock`
    pub fn new(notifier: Arc<dyn OutOfBandNotifier>, clock: SharedClock) -> Self {
        let codes = SecureCodeGenerator::new();
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            clock,
            notifier,
            codes,
            id_source: Arc::new(move || codes.generate_token(REQUEST_ID_BYTES)),
            dispatches: Mutex::new(Vec::new()),
        }
    }

    /// Manager that only logs notifications and uses the system clock
    pub fn with_log_notifier() -> Self {
        Self::new(Arc::new(LogNotifier), SystemClock::shared())
    }

    /// Replace the request id generator
    pub fn with_id_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> rootguard_security::Result<String> + Send + Sync + 'static,
    {
        self.id_source = Arc::new(source);
        self
    }

    /// Open a `PENDING` request and notify the approver.
    ///
    /// The confirmation code only travels over the notification channel; the
    /// returned request carries its hash. Notification failures are recorded
    /// on the request and never fail this call.
    pub fn create(
        &self,
        operation: &str,
        reason: &str,
        requester_id: &str,
        requester_channel: &str,
        config: &RootAuthConfig,
    ) -> Result<RootAuthRequest> {
        let (request, _) =
            self.open(operation, reason, requester_id, requester_channel, config, false)?;
        Ok(request)
    }

    /// Return the requester's oldest `PENDING` request for `operation`, or
    /// open a new one if there is none.
    ///
    /// Lookup and insertion share one critical section, so concurrent callers
    /// end up with the same request and the approver is notified once. The
    /// flag is true when a new request was opened.
    pub fn open_or_reuse(
        &self,
        operation: &str,
        reason: &str,
        requester_id: &str,
        requester_channel: &str,
        config: &RootAuthConfig,
    ) -> Result<(RootAuthRequest, bool)> {
        self.open(operation, reason, requester_id, requester_channel, config, true)
    }

    fn open(
        &self,
        operation: &str,
        reason: &str,
        requester_id: &str,
        requester_channel: &str,
        config: &RootAuthConfig,
        reuse_pending: bool,
    ) -> Result<(RootAuthRequest, bool)> {
        if !config.enabled {
            return Err(RootAuthError::Config(
                "root authorization is disabled".to_string(),
            ));
        }
        if config.request_expiry_minutes == 0 {
            return Err(RootAuthError::Config(
                "request_expiry_minutes must be greater than 0".to_string(),
            ));
        }

        let code = self.codes.generate_code(config.code_length)?;
        let now = self.clock.now();

        let request = {
            let mut registry = self.registry.lock();
            if reuse_pending {
                sweep(&mut registry, now);
                let open = registry
                    .values()
                    .filter(|r| {
                        r.status == RequestStatus::Pending
                            && r.operation == operation
                            && r.requester_id == requester_id
                    })
                    .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
                if let Some(existing) = open {
                    debug!(id = %existing.id, "Reusing pending root authorization request");
                    return Ok((existing.clone(), false));
                }
            }

            let id = self.allocate_id(&registry)?;
            let request = RootAuthRequest {
                id: id.clone(),
                operation: operation.to_string(),
                reason: reason.to_string(),
                requester_id: requester_id.to_string(),
                requester_channel: requester_channel.to_string(),
                status: RequestStatus::Pending,
                created_at: now,
                expires_at: now + config.request_ttl(),
                approved_at: None,
                resolved_at: None,
                consumed_at: None,
                notification: NotificationStatus::Pending,
                code_hash: digest(&code),
                failed_code_attempts: 0,
            };
            registry.insert(id, request.clone());
            request
        };

        info!(
            id = %request.id,
            operation = %request.operation,
            requester = %request.requester_id,
            channel = %request.requester_channel,
            expires_at = %request.expires_at,
            "Root authorization requested"
        );

        self.dispatch(&request, &code, config);
        Ok((request, true))
    }

    /// Approve a pending request. False when unknown, resolved or expired.
    pub fn approve(&self, id: &str, config: &RootAuthConfig) -> bool {
        if !config.enabled {
            warn!(id, "Approval ignored, root authorization is disabled");
            return false;
        }
        self.transition(id, RequestStatus::Approved) == TransitionOutcome::Applied
    }

    /// Deny a pending request. False when unknown, resolved or expired.
    pub fn deny(&self, id: &str, config: &RootAuthConfig) -> bool {
        if !config.enabled {
            warn!(id, "Denial ignored, root authorization is disabled");
            return false;
        }
        self.transition(id, RequestStatus::Denied) == TransitionOutcome::Applied
    }

    /// Approve a pending request after checking its confirmation code.
    ///
    /// A request that collects `max_code_attempts` wrong codes is denied.
    pub fn approve_with_code(
        &self,
        id: &str,
        code: &str,
        config: &RootAuthConfig,
    ) -> Result<bool> {
        if !config.enabled {
            warn!(id, "Approval ignored, root authorization is disabled");
            return Ok(false);
        }

        let now = self.clock.now();
        let mut registry = self.registry.lock();
        let request = registry
            .get_mut(id)
            .ok_or_else(|| RootAuthError::NotFound(id.to_string()))?;

        if request.status != RequestStatus::Pending {
            debug!(id, status = %request.status, "Request already resolved");
            return Ok(false);
        }
        if request.is_expired_at(now) {
            expire(request);
            return Err(RootAuthError::Expired(id.to_string()));
        }

        if !constant_time_eq(&digest(code.trim()), &request.code_hash) {
            request.failed_code_attempts += 1;
            warn!(
                id,
                attempts = request.failed_code_attempts,
                "Invalid confirmation code"
            );
            if request.failed_code_attempts >= config.max_code_attempts {
                request.status = RequestStatus::Denied;
                request.resolved_at = Some(now);
                warn!(id, "Request denied after too many invalid codes");
            }
            return Err(RootAuthError::InvalidCode(id.to_string()));
        }

        Ok(apply(request, RequestStatus::Approved, now) == TransitionOutcome::Applied)
    }

    /// Whether `requester_id` may run `operation` now.
    ///
    /// Non-critical operations always pass. For a critical operation, the
    /// oldest usable approval of this requester is consumed; without one the
    /// answer is false.
    pub fn can_perform(
        &self,
        operation: &str,
        requester_id: &str,
        config: &RootAuthConfig,
    ) -> bool {
        if !config.is_critical(operation) {
            return true;
        }
        if !config.enabled {
            debug!(operation, "Root authorization disabled, not gating");
            return true;
        }

        let now = self.clock.now();
        let mut registry = self.registry.lock();
        sweep(&mut registry, now);

        let candidate = registry
            .values_mut()
            .filter(|r| {
                r.operation == operation && r.requester_id == requester_id && r.is_usable_at(now)
            })
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        match candidate {
            Some(request) => {
                request.status = RequestStatus::Consumed;
                request.consumed_at = Some(now);
                info!(
                    id = %request.id,
                    operation,
                    requester = requester_id,
                    "Root authorization consumed"
                );
                true
            }
            None => {
                debug!(operation, requester = requester_id, "No usable approval");
                false
            }
        }
    }

    /// Look up a request, expiring it first if its deadline has passed
    pub fn get(&self, id: &str) -> Option<RootAuthRequest> {
        let now = self.clock.now();
        let mut registry = self.registry.lock();
        sweep(&mut registry, now);
        registry.get(id).cloned()
    }

    /// Requests ordered by creation time, optionally filtered by status
    pub fn list(&self, status: Option<RequestStatus>) -> Vec<RootAuthRequest> {
        let now = self.clock.now();
        let mut registry = self.registry.lock();
        sweep(&mut registry, now);

        let mut requests: Vec<RootAuthRequest> = registry
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        requests
    }

    /// Drop resolved requests older than the audit retention window
    pub fn purge_resolved(&self, config: &RootAuthConfig) -> usize {
        let now = self.clock.now();
        let cutoff = now - config.retention();
        let mut registry = self.registry.lock();
        sweep(&mut registry, now);

        let before = registry.len();
        registry.retain(|_, r| r.settled_at().map_or(true, |at| at > cutoff));
        let purged = before - registry.len();
        if purged > 0 {
            info!(purged, "Purged resolved root authorization requests");
        }
        purged
    }

    /// Wait for every in-flight notification dispatch to finish
    pub async fn flush_notifications(&self) {
        let handles = std::mem::take(&mut *self.dispatches.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Notification task failed");
            }
        }
    }

    /// All requests, for persistence
    pub fn snapshot(&self) -> Vec<RootAuthRequest> {
        self.list(None)
    }

    /// Load persisted requests. Ids already present are kept as they are.
    pub fn restore(&self, requests: Vec<RootAuthRequest>) -> usize {
        let now = self.clock.now();
        let mut registry = self.registry.lock();
        let mut restored = 0;
        for request in requests {
            if registry.contains_key(&request.id) {
                continue;
            }
            registry.insert(request.id.clone(), request);
            restored += 1;
        }
        sweep(&mut registry, now);
        debug!(restored, "Restored root authorization requests");
        restored
    }

    fn allocate_id(&self, registry: &HashMap<String, RootAuthRequest>) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = (self.id_source)()?;
            if !registry.contains_key(&id) {
                return Ok(id);
            }
            debug!(id, "Request id collision, retrying");
        }
        Err(RootAuthError::Duplicate {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    fn transition(&self, id: &str, target: RequestStatus) -> TransitionOutcome {
        let now = self.clock.now();
        let mut registry = self.registry.lock();
        match registry.get_mut(id) {
            Some(request) => apply(request, target, now),
            None => {
                debug!(id, "Unknown root authorization request");
                TransitionOutcome::NotFound
            }
        }
    }

    fn set_notification(&self, id: &str, status: NotificationStatus) {
        if let Some(request) = self.registry.lock().get_mut(id) {
            request.notification = status;
        }
    }

    fn dispatch(&self, request: &RootAuthRequest, code: &str, config: &RootAuthConfig) {
        let Some(recipient) = config.approver_id.clone() else {
            warn!(id = %request.id, "No approver configured, notification not sent");
            self.set_notification(
                &request.id,
                NotificationStatus::Failed {
                    reason: "no approver configured".to_string(),
                },
            );
            return;
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(id = %request.id, "No async runtime, notification not sent");
                self.set_notification(
                    &request.id,
                    NotificationStatus::Failed {
                        reason: "no async runtime available".to_string(),
                    },
                );
                return;
            }
        };

        let message = approval_message(request, code);
        let registry = Arc::clone(&self.registry);
        let notifier = Arc::clone(&self.notifier);
        let clock = Arc::clone(&self.clock);
        let id = request.id.clone();

        let task = runtime.spawn(async move {
            let status = match notifier.send(&recipient, &message).await {
                Ok(receipt) => {
                    debug!(id, recipient, "Approval notification delivered");
                    NotificationStatus::Delivered {
                        at: clock.now(),
                        message_id: receipt.message_id,
                    }
                }
                Err(e) => {
                    warn!(id, recipient, error = %e, "Approval notification failed");
                    NotificationStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            if let Some(request) = registry.lock().get_mut(&id) {
                request.notification = status;
            }
        });

        let mut dispatches = self.dispatches.lock();
        dispatches.retain(|handle| !handle.is_finished());
        dispatches.push(task);
    }
}

fn apply(
    request: &mut RootAuthRequest,
    target: RequestStatus,
    now: DateTime<Utc>,
) -> TransitionOutcome {
    if request.status != RequestStatus::Pending {
        debug!(id = %request.id, status = %request.status, "Request already resolved");
        return TransitionOutcome::AlreadyResolved(request.status);
    }
    if request.is_expired_at(now) {
        expire(request);
        return TransitionOutcome::Expired;
    }

    request.status = target;
    request.resolved_at = Some(now);
    if target == RequestStatus::Approved {
        request.approved_at = Some(now);
    }
    info!(
        id = %request.id,
        operation = %request.operation,
        status = %target,
        "Root authorization resolved"
    );
    TransitionOutcome::Applied
}

fn expire(request: &mut RootAuthRequest) {
    request.status = RequestStatus::Expired;
    request.resolved_at = Some(request.expires_at);
    info!(id = %request.id, operation = %request.operation, "Root authorization expired");
}

fn sweep(registry: &mut HashMap<String, RootAuthRequest>, now: DateTime<Utc>) {
    for request in registry.values_mut() {
        if request.status == RequestStatus::Pending && request.is_expired_at(now) {
            expire(request);
        }
    }
}

fn approval_message(request: &RootAuthRequest, code: &str) -> String {
    format!(
        "Root authorization requested\n\
         Operation: {}\n\
         Reason: {}\n\
         Requester: {} via {}\n\
         Request: {}\n\
         Code: {}\n\
         Expires: {}",
        request.operation,
        request.reason,
        request.requester_id,
        request.requester_channel,
        request.id,
        code,
        request.expires_at.to_rfc3339(),
    )
}
