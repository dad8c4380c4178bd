//! Connection lifecycle state machine.
//!
//! [`Lifecycle`] is a pure transition function: it consumes one
//! [`LifecycleInput`] at a time and answers with the [`Effect`]s the driver
//! must carry out. It owns no sockets and no timers, which keeps every edge
//! testable without a network.
//!
//! ```text
//!                 connect()                      transport open
//!  Disconnected ─────────────▶ Reconnecting ─────────────────────▶ Connected
//!       ▲  ▲                        ▲   │ close/error                  │
//!       │  │      timer fires       │   ▼                              │
//!       │  └──── (intent to run) ───┘ Disconnected ◀──── close/error ──┘
//!       └──────────────── disconnect() from any state
//! ```
//!
//! # Invariants
//!
//! - At most one transport is held at any time.
//! - At most one reconnection timer is pending at any time.
//! - `Disconnected` is entered only through `disconnect()` or a transport
//!   close/error.

use std::time::Duration;

use rand::Rng;

/// Delay between reconnection attempts in the reference deployment.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(2000);

/// Observable connection state of the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport; either never started, stopped on request, or waiting
    /// for the reconnection timer.
    #[default]
    Disconnected,
    /// A connection attempt is in flight (including the very first one).
    Reconnecting,
    /// The transport is open and events are flowing.
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// How long to wait before the next reconnection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Retry forever at a fixed interval.
    Fixed(Duration),
    /// Double the delay after every failed attempt, capped at `max`.
    Backoff {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound for the delay.
        max: Duration,
        /// Pick the actual delay uniformly from `[delay / 2, delay]`.
        jitter: bool,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RECONNECT_INTERVAL)
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0 for the first retry after a
    /// successful connection).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(interval) => interval,
            Self::Backoff {
                initial,
                max,
                jitter,
            } => {
                let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
                let delay = initial.saturating_mul(factor).min(max);
                if jitter && !delay.is_zero() {
                    let half = delay / 2;
                    rand::rng().random_range(half..=delay)
                } else {
                    delay
                }
            }
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleInput {
    /// External request to start (or keep) streaming.
    Connect,
    /// External request to stop streaming.
    Disconnect,
    /// The held transport reported open.
    Opened,
    /// The held transport reported a clean close.
    Closed,
    /// The held transport reported an error.
    Failed,
    /// The reconnection timer fired.
    TimerFired,
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open a new transport.
    OpenTransport,
    /// Close and release the held transport.
    CloseTransport,
    /// Arm the reconnection timer.
    ScheduleReconnect(Duration),
    /// Disarm the pending reconnection timer.
    CancelReconnect,
}

/// The connection lifecycle manager's state.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ConnectionState,
    should_run: bool,
    transport_held: bool,
    timer_pending: bool,
    attempt: u32,
    policy: ReconnectPolicy,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

impl Lifecycle {
    /// Creates a disconnected lifecycle using `policy` for retries.
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            should_run: false,
            transport_held: false,
            timer_pending: false,
            attempt: 0,
            policy,
        }
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the owner wants the stream running.
    #[must_use]
    pub const fn should_run(&self) -> bool {
        self.should_run
    }

    /// Whether a transport is currently held.
    #[must_use]
    pub const fn transport_held(&self) -> bool {
        self.transport_held
    }

    /// Whether a reconnection timer is pending.
    #[must_use]
    pub const fn timer_pending(&self) -> bool {
        self.timer_pending
    }

    /// Feeds one input and returns the effects to execute, in order.
    pub fn apply(&mut self, input: LifecycleInput) -> Vec<Effect> {
        match input {
            LifecycleInput::Connect => self.on_connect(),
            LifecycleInput::Disconnect => self.on_disconnect(),
            LifecycleInput::Opened => self.on_opened(),
            LifecycleInput::Closed | LifecycleInput::Failed => self.on_lost(),
            LifecycleInput::TimerFired => self.on_timer(),
        }
    }

    fn on_connect(&mut self) -> Vec<Effect> {
        self.should_run = true;
        if self.transport_held {
            // Connected, or an attempt is already in flight.
            return Vec::new();
        }
        let mut effects = Vec::with_capacity(2);
        if self.timer_pending {
            self.timer_pending = false;
            effects.push(Effect::CancelReconnect);
        }
        effects.extend(self.start_attempt());
        effects
    }

    fn on_disconnect(&mut self) -> Vec<Effect> {
        self.should_run = false;
        self.attempt = 0;
        let mut effects = Vec::with_capacity(2);
        if self.timer_pending {
            self.timer_pending = false;
            effects.push(Effect::CancelReconnect);
        }
        if self.transport_held {
            self.transport_held = false;
            effects.push(Effect::CloseTransport);
        }
        self.state = ConnectionState::Disconnected;
        effects
    }

    fn on_opened(&mut self) -> Vec<Effect> {
        if !self.transport_held || self.state != ConnectionState::Reconnecting {
            return Vec::new();
        }
        self.state = ConnectionState::Connected;
        self.attempt = 0;
        if self.timer_pending {
            self.timer_pending = false;
            return vec![Effect::CancelReconnect];
        }
        Vec::new()
    }

    fn on_lost(&mut self) -> Vec<Effect> {
        if !self.transport_held {
            return Vec::new();
        }
        self.transport_held = false;
        self.state = ConnectionState::Disconnected;
        let mut effects = vec![Effect::CloseTransport];
        if self.should_run && !self.timer_pending {
            self.timer_pending = true;
            let delay = self.policy.delay(self.attempt);
            self.attempt = self.attempt.saturating_add(1);
            effects.push(Effect::ScheduleReconnect(delay));
        }
        effects
    }

    fn on_timer(&mut self) -> Vec<Effect> {
        if !self.timer_pending {
            return Vec::new();
        }
        self.timer_pending = false;
        if !self.should_run || self.transport_held {
            return Vec::new();
        }
        self.start_attempt()
    }

    fn start_attempt(&mut self) -> Vec<Effect> {
        self.transport_held = true;
        self.state = ConnectionState::Reconnecting;
        vec![Effect::OpenTransport]
    }
}
