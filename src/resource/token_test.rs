// ABOUTME: Tests for the resource token ownership semantics.
// ABOUTME: Covers non-blocking, bounded, and unbounded acquisition plus release faults.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::token::ResourceToken;
use crate::agent::AgentId;
use crate::error::ProtocolViolation;

#[test]
fn test_try_acquire_succeeds_when_free() {
    let token = ResourceToken::new(0);
    assert!(token.try_acquire(AgentId(1)));
    assert_eq!(token.holder(), Some(AgentId(1)));
    assert!(token.is_held());
    assert_eq!(token.acquisitions(), 1);
}

#[test]
fn test_try_acquire_fails_when_held_by_another() {
    let token = ResourceToken::new(0);
    assert!(token.try_acquire(AgentId(1)));
    assert!(!token.try_acquire(AgentId(2)));
    assert_eq!(token.holder(), Some(AgentId(1)));
}

#[test]
fn test_try_acquire_is_not_reentrant() {
    let token = ResourceToken::new(0);
    assert!(token.try_acquire(AgentId(1)));
    assert!(!token.try_acquire(AgentId(1)));
    assert_eq!(token.acquisitions(), 1);
}

#[test]
fn test_release_by_holder_frees_token() {
    let token = ResourceToken::new(0);
    token.try_acquire(AgentId(1));
    assert!(token.release(AgentId(1)).is_ok());
    assert!(!token.is_held());

    assert!(token.try_acquire(AgentId(2)));
    assert_eq!(token.acquisitions(), 2);
}

#[test]
fn test_release_by_non_holder_is_protocol_violation() {
    let token = ResourceToken::new(3);
    token.try_acquire(AgentId(1));

    let err = token.release(AgentId(2)).unwrap_err();
    assert_eq!(
        err,
        ProtocolViolation {
            token: 3,
            holder: Some(AgentId(1)),
            requester: AgentId(2),
        }
    );

    // The rightful holder keeps the token
    assert_eq!(token.holder(), Some(AgentId(1)));
}

#[test]
fn test_release_of_free_token_is_protocol_violation() {
    let token = ResourceToken::new(0);
    let err = token.release(AgentId(4)).unwrap_err();
    assert_eq!(err.holder, None);
    assert_eq!(err.requester, AgentId(4));
}

#[test]
fn test_protocol_violation_display() {
    let err = ProtocolViolation {
        token: 2,
        holder: Some(AgentId(0)),
        requester: AgentId(1),
    };
    let msg = err.to_string();
    assert!(msg.contains("agent-1"));
    assert!(msg.contains("token 2"));
    assert!(msg.contains("agent-0"));

    let err = ProtocolViolation {
        token: 2,
        holder: None,
        requester: AgentId(1),
    };
    assert!(err.to_string().contains("not held"));
}

#[tokio::test]
async fn test_try_acquire_within_immediate_when_free() {
    let token = ResourceToken::new(0);

    let start = Instant::now();
    let acquired = token
        .try_acquire_within(AgentId(0), Duration::from_millis(500))
        .await;

    assert!(acquired);
    assert!(
        start.elapsed() < Duration::from_millis(50),
        "Acquire of a free token should be instant, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_try_acquire_within_times_out() {
    let token = ResourceToken::new(0);
    token.try_acquire(AgentId(0));

    let start = Instant::now();
    let acquired = token
        .try_acquire_within(AgentId(1), Duration::from_millis(50))
        .await;
    let elapsed = start.elapsed();

    assert!(!acquired);
    assert!(
        elapsed >= Duration::from_millis(50),
        "Should wait for the full window, waited {:?}",
        elapsed
    );
    assert!(
        elapsed < Duration::from_millis(250),
        "Should not block past the window, waited {:?}",
        elapsed
    );
    assert_eq!(token.holder(), Some(AgentId(0)));
}

#[tokio::test]
async fn test_try_acquire_within_zero_window() {
    let token = ResourceToken::new(0);
    token.try_acquire(AgentId(0));
    assert!(!token.try_acquire_within(AgentId(1), Duration::ZERO).await);

    token.release(AgentId(0)).unwrap();
    assert!(token.try_acquire_within(AgentId(1), Duration::ZERO).await);
}

#[tokio::test]
async fn test_try_acquire_within_wakes_on_release() {
    let token = Arc::new(ResourceToken::new(0));
    token.try_acquire(AgentId(0));

    let releaser = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        releaser.release(AgentId(0)).unwrap();
    });

    let start = Instant::now();
    let acquired = token
        .try_acquire_within(AgentId(1), Duration::from_secs(2))
        .await;

    assert!(acquired);
    assert_eq!(token.holder(), Some(AgentId(1)));
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "Waiter should wake on release, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_acquire_waits_for_release() {
    let token = Arc::new(ResourceToken::new(0));
    token.try_acquire(AgentId(0));

    let waiter = token.clone();
    let handle = tokio::spawn(async move {
        waiter.acquire(AgentId(1)).await;
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());

    token.release(AgentId(0)).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("acquire should finish after release")
        .unwrap();

    assert_eq!(token.holder(), Some(AgentId(1)));
}

#[tokio::test]
async fn test_concurrent_try_acquire_single_winner() {
    let token = Arc::new(ResourceToken::new(0));
    let mut handles = Vec::new();

    for i in 0..10 {
        let token = token.clone();
        handles.push(tokio::spawn(async move { token.try_acquire(AgentId(i)) }));
    }

    let mut success_count = 0;
    for handle in handles {
        if handle.await.unwrap() {
            success_count += 1;
        }
    }

    assert_eq!(success_count, 1, "Exactly one agent should hold the token");
}

#[tokio::test]
async fn test_contended_waiters_each_get_a_turn() {
    let token = Arc::new(ResourceToken::new(0));
    let mut handles = Vec::new();

    for i in 0..4 {
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let agent = AgentId(i);
            assert!(
                token
                    .try_acquire_within(agent, Duration::from_secs(5))
                    .await
            );
            assert_eq!(token.holder(), Some(agent));
            tokio::time::sleep(Duration::from_millis(5)).await;
            token.release(agent).unwrap();
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert!(!token.is_held());
    assert_eq!(token.acquisitions(), 4);
}
