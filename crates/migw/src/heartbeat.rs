//! Peer liveness tracking.
//!
//! The worker probes the gateway every [`DEFAULT_PING_INTERVAL`] and
//! considers it offline when nothing proves liveness for
//! [`DEFAULT_PONG_TIMEOUT`]. Proof of liveness is either an asynchronous
//! pong (`internal.PONG`, `event.heartbeat`) or a probe answered with
//! `"online"`.
//!
//! The offline warning is emitted at most once per probe: queuing a probe
//! re-arms it, so a peer that stays silent is reported again after every
//! unanswered probe, and never on the iterations in between.

use std::time::Duration;

use tokio::time::Instant;

/// Interval between liveness probes.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(200);

/// Silence after which the peer is considered offline.
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(300);

/// Observable peer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Online,
    Offline,
}

/// A state change reported by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOffline,
    BackOnline,
}

/// Heartbeat state machine. Time is passed in so it can be driven by tests.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    ping_interval: Duration,
    pong_timeout: Duration,
    last_ping: Option<Instant>,
    last_pong: Option<Instant>,
    offline_warned: bool,
    state: PeerState,
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_PING_INTERVAL, DEFAULT_PONG_TIMEOUT)
    }
}

impl HeartbeatMonitor {
    /// A monitor that has never probed nor heard from the peer.
    ///
    /// A probe is due immediately, and the peer is reported offline on the
    /// first staleness check unless a pong arrives first.
    pub fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout,
            last_ping: None,
            last_pong: None,
            offline_warned: false,
            state: PeerState::Online,
        }
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == PeerState::Online
    }

    /// Whether the current offline episode has already been reported.
    pub fn offline_warned(&self) -> bool {
        self.offline_warned
    }

    pub fn last_ping(&self) -> Option<Instant> {
        self.last_ping
    }

    pub fn last_pong(&self) -> Option<Instant> {
        self.last_pong
    }

    /// Whether a probe should be issued at `now`.
    pub fn probe_due(&self, now: Instant) -> bool {
        self.last_ping
            .is_none_or(|t| now.saturating_duration_since(t) > self.ping_interval)
    }

    /// Record that a probe was queued at `now`.
    pub fn mark_probe_sent(&mut self, now: Instant) {
        tracing::trace!("Heartbeat probe queued");
        self.last_ping = Some(now);
        self.offline_warned = false;
    }

    /// Record proof of liveness at `now`.
    pub fn record_pong(&mut self, now: Instant) -> Option<Transition> {
        tracing::debug!("Heartbeat received");
        self.last_pong = Some(now);
        self.offline_warned = false;

        if self.state == PeerState::Offline {
            self.state = PeerState::Online;
            tracing::info!("Gateway is back online");
            Some(Transition::BackOnline)
        } else {
            None
        }
    }

    /// Check for silence longer than the pong timeout.
    ///
    /// Returns [`Transition::WentOffline`] (and logs) only on the first
    /// stale check since the last probe or pong.
    pub fn check_liveness(&mut self, now: Instant) -> Option<Transition> {
        let stale = self
            .last_pong
            .is_none_or(|t| now.saturating_duration_since(t) > self.pong_timeout);

        if stale && !self.offline_warned {
            self.offline_warned = true;
            self.state = PeerState::Offline;
            tracing::warn!(
                silent_secs = self
                    .last_pong
                    .map(|t| now.saturating_duration_since(t).as_secs()),
                "Gateway is offline"
            );
            Some(Transition::WentOffline)
        } else {
            None
        }
    }
}
