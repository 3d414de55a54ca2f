use crate::target::CameraTarget;
use log::debug;

/// Holds which camera the remote is aimed at
#[derive(Debug, Clone)]
pub struct CameraSelector {
    current: CameraTarget,
}

impl CameraSelector {
    pub fn new(initial: CameraTarget) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> CameraTarget {
        self.current
    }

    /// Advance to the next target, wrapping past the last one
    pub fn select_next(&mut self) -> CameraTarget {
        self.current = self.current.next();
        debug!("selected {}", self.current);
        self.current
    }

    /// Step back to the previous target, wrapping past the first one
    pub fn select_previous(&mut self) -> CameraTarget {
        self.current = self.current.previous();
        debug!("selected {}", self.current);
        self.current
    }
}

impl Default for CameraSelector {
    fn default() -> Self {
        Self::new(CameraTarget::default())
    }
}
