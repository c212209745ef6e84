use bitflags::bitflags;
use std::fmt::{Display, Formatter};

bitflags! {
    /// Primitive groups a backend implements.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BackendCapabilities: u8 {
        const MARKERS = 0b001;
        const RANGES = 0b010;
        const TYPE_IDS = 0b100;
    }
}

/// Metadata describing a backend implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Higher wins when no backend is requested explicitly.
    pub priority: i32,
    pub capabilities: BackendCapabilities,
}

impl BackendDescriptor {
    pub const fn new(
        id: &'static str,
        display_name: &'static str,
        priority: i32,
        capabilities: BackendCapabilities,
    ) -> Self {
        Self { id, display_name, priority, capabilities }
    }
}

/// Whether a backend may be called right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    Ready,
    /// Compiled in but switched off (feature or opt-in missing).
    Disabled(String),
    /// Cannot work on this target at all.
    Unsupported(String),
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Availability::Ready => None,
            Availability::Disabled(reason) | Availability::Unsupported(reason) => Some(reason),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Availability::Ready => "ready",
            Availability::Disabled(_) => "disabled",
            Availability::Unsupported(_) => "unsupported",
        }
    }
}

impl Display for Availability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{} ({reason})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}
