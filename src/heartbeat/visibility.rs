use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Whether the hosting tab/window is the one the user is looking at.
pub trait VisibilitySource: Send + Sync {
    fn is_visible(&self) -> bool;
}

/// Shared visibility flag toggled by the host (focus/blur, minimize, etc.).
/// Starts visible.
#[derive(Clone, Debug)]
pub struct TabVisibility {
    visible: Arc<AtomicBool>,
}

impl TabVisibility {
    pub fn new(visible: bool) -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(visible)),
        }
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }
}

impl Default for TabVisibility {
    fn default() -> Self {
        Self::new(true)
    }
}

impl VisibilitySource for TabVisibility {
    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct VisibilityGate {
    source: Arc<dyn VisibilitySource>,
}

impl VisibilityGate {
    pub fn new(source: Arc<dyn VisibilitySource>) -> Self {
        Self { source }
    }

    pub fn should_report(&self) -> bool {
        self.source.is_visible()
    }
}
