use super::{Point, Target};

/// Continuous pointer drag: `Idle` until a pointer-down on a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState<S> {
    Idle,
    Dragging { source: S, position: Point },
}

impl<S> Default for DragState<S> {
    fn default() -> Self {
        DragState::Idle
    }
}

/// Result of releasing a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropped<S> {
    pub source: S,
    /// Element under the pointer on release, if any.
    pub target: Option<Target>,
    pub at: Point,
}

/// Drag sub-state machine shared by pairing and placement.
#[derive(Debug, Clone)]
pub struct Drag<S> {
    state: DragState<S>,
}

impl<S> Default for Drag<S> {
    fn default() -> Self {
        Self {
            state: DragState::Idle,
        }
    }
}

impl<S: Copy> Drag<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    /// Start dragging `source`, replacing any drag in progress.
    pub fn begin(&mut self, source: S, at: Point) {
        self.state = DragState::Dragging {
            source,
            position: at,
        };
    }

    /// Follow the pointer. Returns false when no drag is active.
    pub fn track(&mut self, at: Point) -> bool {
        match &mut self.state {
            DragState::Dragging { position, .. } => {
                *position = at;
                true
            }
            DragState::Idle => false,
        }
    }

    /// Finish the drag; `None` if nothing was being dragged.
    pub fn release(&mut self, over: Option<Target>, at: Point) -> Option<Dropped<S>> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging { source, .. } => Some(Dropped {
                source,
                target: over,
                at,
            }),
            DragState::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    #[must_use]
    pub fn state(&self) -> DragState<S> {
        self.state
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Where the dragged element should be drawn.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match self.state {
            DragState::Dragging { position, .. } => Some(position),
            DragState::Idle => None,
        }
    }
}
