//! Lifecycle phases and the transitions between them.
//!
//! ```text
//! Created ──bind──▶ Listening ──publish──▶ Published
//!    │                  │                     │
//!    │                  └──publish failed / stop
//!    │                          ▼             │
//!    │                       Draining ◀───stop┘
//!    │                          │
//!    └──────stop──────────▶  Stopped
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Created,
    Listening,
    Published,
    Draining,
    Stopped,
}

impl LifecyclePhase {
    pub fn can_transition_to(self, next: LifecyclePhase) -> bool {
        use LifecyclePhase::*;
        matches!(
            (self, next),
            (Created, Listening)
                | (Created, Stopped)
                | (Listening, Published)
                | (Listening, Draining)
                | (Published, Draining)
                | (Draining, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == LifecyclePhase::Stopped
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecyclePhase::Created => "created",
            LifecyclePhase::Listening => "listening",
            LifecyclePhase::Published => "published",
            LifecyclePhase::Draining => "draining",
            LifecyclePhase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
