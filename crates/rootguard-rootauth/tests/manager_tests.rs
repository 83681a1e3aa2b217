//! Integration tests for the root authorization state machine

use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::Mutex;
use rootguard_common::ManualClock;
use rootguard_rootauth::{
    DeliveryReceipt, NotificationStatus, NotifyError, OutOfBandNotifier, RequestStatus,
    RootAuthConfig, RootAuthError, RootAuthorizationManager,
};

/// Notifier that keeps every message it was asked to send
#[derive(Debug, Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn last_code(&self) -> String {
        let sent = self.sent.lock();
        let (_, message) = sent.last().expect("no message sent");
        message
            .lines()
            .find_map(|line| line.strip_prefix("Code: "))
            .expect("message has no code")
            .to_string()
    }
}

#[async_trait]
impl OutOfBandNotifier for RecordingNotifier {
    async fn send(
        &self,
        recipient_id: &str,
        message: &str,
    ) -> Result<DeliveryReceipt, NotifyError> {
        if self.fail {
            return Err(NotifyError::Unavailable("bot offline".to_string()));
        }
        self.sent
            .lock()
            .push((recipient_id.to_string(), message.to_string()));
        Ok(DeliveryReceipt {
            message_id: Some("m-1".to_string()),
        })
    }
}

fn config() -> RootAuthConfig {
    let mut config = RootAuthConfig::enabled_for(["file_delete", "shell_exec"]);
    config.approver_id = Some("telegram:admin".to_string());
    config
}

fn setup() -> (ManualClock, Arc<RecordingNotifier>, RootAuthorizationManager) {
    let clock = ManualClock::starting_now();
    let notifier = Arc::new(RecordingNotifier::default());
    let manager = RootAuthorizationManager::new(notifier.clone(), clock.shared());
    (clock, notifier, manager)
}

#[test]
fn test_approval_is_consumed_exactly_once() {
    let (_clock, _notifier, manager) = setup();
    let config = config();

    let req = manager
        .create("file_delete", "cleanup", "u1", "telegram", &config)
        .unwrap();
    assert_eq!(req.status, RequestStatus::Pending);
    assert!(!manager.can_perform("file_delete", "u1", &config));

    assert!(manager.approve(&req.id, &config));
    assert!(manager.can_perform("file_delete", "u1", &config));
    assert!(!manager.can_perform("file_delete", "u1", &config));

    let stored = manager.get(&req.id).unwrap();
    assert_eq!(stored.status, RequestStatus::Consumed);
    assert!(stored.consumed_at.is_some());
}

#[test]
fn test_non_critical_operations_always_allowed() {
    let (_clock, _notifier, manager) = setup();
    assert!(manager.can_perform("file_write", "anyone", &config()));
}

#[test]
fn test_disabled_gating_allows_critical_operations() {
    let (_clock, _notifier, manager) = setup();
    let mut config = config();
    config.enabled = false;

    assert!(manager.can_perform("file_delete", "u1", &config));
    assert!(!manager.approve("whatever", &config));
}

#[test]
fn test_approval_is_bound_to_requester_and_operation() {
    let (_clock, _notifier, manager) = setup();
    let config = config();

    let req = manager
        .create("file_delete", "cleanup", "u1", "telegram", &config)
        .unwrap();
    assert!(manager.approve(&req.id, &config));

    assert!(!manager.can_perform("file_delete", "u2", &config));
    assert!(!manager.can_perform("shell_exec", "u1", &config));
    assert!(manager.can_perform("file_delete", "u1", &config));
}

#[test]
fn test_resolution_happens_once() {
    let (_clock, _notifier, manager) = setup();
    let config = config();

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    assert!(manager.deny(&req.id, &config));
    assert!(!manager.approve(&req.id, &config));
    assert!(!manager.deny(&req.id, &config));
    assert!(!manager.can_perform("file_delete", "u1", &config));
    assert_eq!(manager.get(&req.id).unwrap().status, RequestStatus::Denied);
}

#[test]
fn test_unknown_request_cannot_be_resolved() {
    let (_clock, _notifier, manager) = setup();
    assert!(!manager.approve("nope", &config()));
    assert!(!manager.deny("nope", &config()));
    assert!(manager.get("nope").is_none());
}

#[test]
fn test_pending_request_expires_at_deadline() {
    let (clock, _notifier, manager) = setup();
    let config = config();

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    clock.advance(Duration::minutes(10));

    assert!(!manager.approve(&req.id, &config));
    let stored = manager.get(&req.id).unwrap();
    assert_eq!(stored.status, RequestStatus::Expired);
    assert_eq!(stored.resolved_at, Some(stored.expires_at));
}

#[test]
fn test_expiry_is_applied_on_read() {
    let (clock, _notifier, manager) = setup();
    let config = config();

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    clock.advance(Duration::minutes(11));

    assert_eq!(manager.get(&req.id).unwrap().status, RequestStatus::Expired);
    assert_eq!(manager.list(Some(RequestStatus::Pending)).len(), 0);
}

#[test]
fn test_approved_request_is_unusable_after_deadline() {
    let (clock, _notifier, manager) = setup();
    let config = config();

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    assert!(manager.approve(&req.id, &config));
    clock.advance(Duration::minutes(10));

    assert!(!manager.can_perform("file_delete", "u1", &config));
    assert_eq!(manager.get(&req.id).unwrap().status, RequestStatus::Approved);
}

#[test]
fn test_oldest_approval_is_consumed_first() {
    let (clock, _notifier, manager) = setup();
    let config = config();

    let first = manager.create("file_delete", "a", "u1", "tg", &config).unwrap();
    clock.advance(Duration::seconds(5));
    let second = manager.create("file_delete", "b", "u1", "tg", &config).unwrap();
    assert!(manager.approve(&second.id, &config));
    assert!(manager.approve(&first.id, &config));

    assert!(manager.can_perform("file_delete", "u1", &config));
    assert_eq!(manager.get(&first.id).unwrap().status, RequestStatus::Consumed);
    assert_eq!(manager.get(&second.id).unwrap().status, RequestStatus::Approved);
}

#[test]
fn test_concurrent_approve_and_deny_resolve_once() {
    for _ in 0..50 {
        let (_clock, _notifier, manager) = setup();
        let manager = Arc::new(manager);
        let config = Arc::new(config());
        let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();

        let approver = {
            let (manager, config, id) = (manager.clone(), config.clone(), req.id.clone());
            thread::spawn(move || manager.approve(&id, &config))
        };
        let denier = {
            let (manager, config, id) = (manager.clone(), config.clone(), req.id.clone());
            thread::spawn(move || manager.deny(&id, &config))
        };

        let approved = approver.join().unwrap();
        let denied = denier.join().unwrap();
        assert!(approved ^ denied);

        let status = manager.get(&req.id).unwrap().status;
        if approved {
            assert_eq!(status, RequestStatus::Approved);
        } else {
            assert_eq!(status, RequestStatus::Denied);
        }
    }
}

#[test]
fn test_concurrent_consumers_share_one_approval() {
    let (_clock, _notifier, manager) = setup();
    let manager = Arc::new(manager);
    let config = Arc::new(config());

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    assert!(manager.approve(&req.id, &config));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let (manager, config) = (manager.clone(), config.clone());
            thread::spawn(move || manager.can_perform("file_delete", "u1", &config))
        })
        .collect();
    let granted = workers
        .into_iter()
        .map(|w| w.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(granted, 1);
}

#[tokio::test]
async fn test_notification_carries_code_to_approver() {
    let (_clock, notifier, manager) = setup();
    let config = config();

    let req = manager
        .create("shell_exec", "restart service", "u1", "discord", &config)
        .unwrap();
    manager.flush_notifications().await;

    let sent = notifier.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "telegram:admin");
    assert!(sent[0].1.contains(&req.id));
    assert!(sent[0].1.contains("restart service"));

    let stored = manager.get(&req.id).unwrap();
    assert!(matches!(
        stored.notification,
        NotificationStatus::Delivered { message_id: Some(_), .. }
    ));
}

#[tokio::test]
async fn test_approve_with_code() {
    let (_clock, notifier, manager) = setup();
    let config = config();

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    manager.flush_notifications().await;
    let code = notifier.last_code();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    let wrong = if code == "000000" { "111111" } else { "000000" };
    assert!(matches!(
        manager.approve_with_code(&req.id, wrong, &config),
        Err(RootAuthError::InvalidCode(_))
    ));
    assert!(manager.approve_with_code(&req.id, &code, &config).unwrap());
    assert!(!manager.approve_with_code(&req.id, &code, &config).unwrap());
    assert_eq!(manager.get(&req.id).unwrap().failed_code_attempts, 1);
}

#[tokio::test]
async fn test_too_many_wrong_codes_deny_request() {
    let (_clock, notifier, manager) = setup();
    let config = config();

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    manager.flush_notifications().await;
    let code = notifier.last_code();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..config.max_code_attempts {
        assert!(manager.approve_with_code(&req.id, wrong, &config).is_err());
    }
    assert_eq!(manager.get(&req.id).unwrap().status, RequestStatus::Denied);
    assert!(!manager.approve_with_code(&req.id, &code, &config).unwrap());
}

#[tokio::test]
async fn test_approve_with_code_unknown_and_expired() {
    let (clock, notifier, manager) = setup();
    let config = config();

    assert!(matches!(
        manager.approve_with_code("missing", "123456", &config),
        Err(RootAuthError::NotFound(_))
    ));

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    manager.flush_notifications().await;
    let code = notifier.last_code();
    clock.advance(Duration::minutes(15));

    assert!(matches!(
        manager.approve_with_code(&req.id, &code, &config),
        Err(RootAuthError::Expired(_))
    ));
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_create() {
    let clock = ManualClock::starting_now();
    let manager =
        RootAuthorizationManager::new(Arc::new(RecordingNotifier::failing()), clock.shared());
    let config = config();

    let req = manager.create("file_delete", "r", "u1", "tg", &config).unwrap();
    manager.flush_notifications().await;

    let stored = manager.get(&req.id).unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    assert!(matches!(stored.notification, NotificationStatus::Failed { .. }));
}

#[test]
fn test_purge_resolved_keeps_pending_and_recent() {
    let (clock, _notifier, manager) = setup();
    let config = config();

    let denied = manager.create("file_delete", "a", "u1", "tg", &config).unwrap();
    assert!(manager.deny(&denied.id, &config));
    clock.advance(Duration::minutes(24 * 60 + 1));

    let pending = manager.create("file_delete", "b", "u1", "tg", &config).unwrap();
    assert_eq!(manager.purge_resolved(&config), 1);
    assert!(manager.get(&denied.id).is_none());
    assert!(manager.get(&pending.id).is_some());
}

#[test]
fn test_snapshot_and_restore() {
    let (_clock, _notifier, manager) = setup();
    let config = config();

    let req = manager.create("file_delete", "a", "u1", "tg", &config).unwrap();
    assert!(manager.approve(&req.id, &config));
    let snapshot = manager.snapshot();

    let (_clock2, _notifier2, restored) = setup();
    assert_eq!(restored.restore(snapshot.clone()), 1);
    assert_eq!(restored.restore(snapshot), 0);
    assert!(restored.can_perform("file_delete", "u1", &config));
}

#[test]
fn test_open_or_reuse_returns_pending_request() {
    let (clock, _notifier, manager) = setup();
    let config = config();

    let (first, created) = manager
        .open_or_reuse("file_delete", "cleanup", "u1", "tg", &config)
        .unwrap();
    assert!(created);

    let (again, created) = manager
        .open_or_reuse("file_delete", "cleanup", "u1", "tg", &config)
        .unwrap();
    assert!(!created);
    assert_eq!(again.id, first.id);

    let (other_user, created) = manager
        .open_or_reuse("file_delete", "cleanup", "u2", "tg", &config)
        .unwrap();
    assert!(created);
    assert_ne!(other_user.id, first.id);

    clock.advance(Duration::minutes(11));
    let (fresh, created) = manager
        .open_or_reuse("file_delete", "cleanup", "u1", "tg", &config)
        .unwrap();
    assert!(created);
    assert_ne!(fresh.id, first.id);
    assert_eq!(manager.get(&first.id).unwrap().status, RequestStatus::Expired);
}

#[test]
fn test_concurrent_open_or_reuse_opens_one_request() {
    for _ in 0..20 {
        let (_clock, _notifier, manager) = setup();
        let manager = Arc::new(manager);
        let config = Arc::new(config());

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let (manager, config) = (manager.clone(), config.clone());
                thread::spawn(move || {
                    manager
                        .open_or_reuse("shell_exec", "deploy", "u1", "tg", &config)
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);
        assert!(results.iter().all(|(r, _)| r.id == results[0].0.id));
        assert_eq!(manager.list(Some(RequestStatus::Pending)).len(), 1);
    }
}
