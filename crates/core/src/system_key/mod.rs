//! Rotating system key.
//!
//! The key alternates between an ACTIVE phase, during which its three codes
//! are accepted, and a COOLDOWN phase with no valid codes. There is no timer:
//! the phase is recomputed from the clock whenever the state is read.

pub mod ports;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pocket_common::Clock;
use pocket_domain::constants::SYSTEM_KEY_PIN_LENGTH;
use pocket_domain::{
    ActivityAction, KeyRotationConfig, KeyStatus, PocketError, Result, SystemKeyState,
};
use rand::Rng;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use self::ports::SystemConfigRepository;
use crate::audit::AuditTrail;

/// Lazily rotating system key persisted through a [`SystemConfigRepository`].
pub struct SystemKeyRotator {
    repository: Arc<dyn SystemConfigRepository>,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    active: Duration,
    cooldown: Duration,
    /// Serializes read-advance-store within this process
    guard: Mutex<()>,
}

impl SystemKeyRotator {
    /// Phase lengths come from `config`.
    pub fn new(
        repository: Arc<dyn SystemConfigRepository>,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        config: &KeyRotationConfig,
    ) -> Self {
        Self {
            repository,
            audit,
            clock,
            active: secs(config.active_secs),
            cooldown: secs(config.cooldown_secs),
            guard: Mutex::new(()),
        }
    }

    /// Current key state, creating or advancing the stored one as needed.
    #[instrument(level = "debug", skip(self))]
    pub async fn current_state(&self) -> Result<SystemKeyState> {
        let _guard = self.guard.lock().await;
        let now = self.clock.now();

        let Some(stored) = self.repository.load_system_key().await? else {
            let state = SystemKeyState::active(generate_pin(None), now);
            self.repository.store_system_key(&state).await?;
            info!("system key initialised");
            return Ok(state);
        };

        let next = advance(&stored, now, self.active, self.cooldown)?;
        if next != stored {
            self.repository.store_system_key(&next).await?;
            debug!(from = %stored.status, to = %next.status, "system key phase advanced");
        }
        Ok(next)
    }

    /// True iff the key is ACTIVE and `candidate` is one of its three codes.
    pub async fn validate(&self, candidate: &str) -> Result<bool> {
        let state = self.current_state().await?;
        Ok(state.is_active()
            && state.codes.as_ref().is_some_and(|codes| codes.matches(candidate.trim())))
    }

    /// Start a new ACTIVE phase with a fresh pin right now.
    pub async fn force_rotate(&self, actor: &str) -> Result<SystemKeyState> {
        let state = {
            let _guard = self.guard.lock().await;
            let previous = self.repository.load_system_key().await?;
            let state = SystemKeyState::active(
                generate_pin(previous.as_ref().map(|s| s.pin.as_str())),
                self.clock.now(),
            );
            self.repository.store_system_key(&state).await?;
            state
        };

        info!(actor, "system key force-rotated");
        self.audit
            .record(
                actor,
                None,
                ActivityAction::KeyRotated,
                "System key rotated manually",
                Some(json!({ "forced": true })),
            )
            .await?;
        Ok(state)
    }

    /// Seconds left in the current phase
    pub async fn remaining_secs(&self) -> Result<i64> {
        let state = self.current_state().await?;
        let phase = if state.is_active() { self.active } else { self.cooldown };
        let ends_at = shift(state.phase_started_at, phase)?;
        Ok((ends_at - self.clock.now()).num_seconds().max(0))
    }
}

/// Advance `state` to the phase the clock implies at `now`.
///
/// Missed cycles are skipped with arithmetic, and the new phase start is
/// aligned to the boundary it would have had if the rotator had been read
/// continuously. A new pin is issued when the result is ACTIVE and at least
/// one COOLDOWN to ACTIVE boundary was crossed.
pub fn advance(
    state: &SystemKeyState,
    now: DateTime<Utc>,
    active: Duration,
    cooldown: Duration,
) -> Result<SystemKeyState> {
    let elapsed = now - state.phase_started_at;
    let phase_len = match state.status {
        KeyStatus::Active => active,
        KeyStatus::Cooldown => cooldown,
    };
    if elapsed < phase_len {
        return Ok(state.clone());
    }

    // Position relative to the start of the ACTIVE phase of the stored cycle.
    let cycle_start = match state.status {
        KeyStatus::Active => state.phase_started_at,
        KeyStatus::Cooldown => shift(state.phase_started_at, -active)?,
    };
    let cycle_ms = active
        .checked_add(&cooldown)
        .ok_or_else(|| overflow("key rotation cycle"))?
        .num_milliseconds()
        .max(1);
    let position_ms = (now - cycle_start).num_milliseconds();
    let cycles_passed = position_ms / cycle_ms;
    let within_ms = position_ms % cycle_ms;
    let current_cycle_start = shift(cycle_start, Duration::milliseconds(cycles_passed * cycle_ms))?;

    if within_ms < active.num_milliseconds() {
        if cycles_passed >= 1 {
            Ok(SystemKeyState::active(generate_pin(Some(&state.pin)), current_cycle_start))
        } else {
            Ok(state.clone())
        }
    } else {
        Ok(SystemKeyState::cooldown(state.pin.clone(), shift(current_cycle_start, active)?))
    }
}

fn shift(at: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>> {
    at.checked_add_signed(by).ok_or_else(|| overflow("key rotation phase boundary"))
}

fn overflow(what: &str) -> PocketError {
    PocketError::Config(format!("{what} overflows the supported time range"))
}

/// Random six-digit pin, never equal to `previous`.
fn generate_pin(previous: Option<&str>) -> String {
    let mut rng = rand::thread_rng();
    let upper = 10u32.pow(SYSTEM_KEY_PIN_LENGTH as u32);
    loop {
        let pin = format!("{:0width$}", rng.gen_range(0..upper), width = SYSTEM_KEY_PIN_LENGTH);
        if previous != Some(pin.as_str()) {
            return pin;
        }
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX).min(i64::MAX / 1000))
}
