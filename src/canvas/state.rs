use crate::canvas::model::Point;

/// Per-pointer-stream interaction state. Drag and draw cannot coexist because
/// they are variants of one enum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Last sampled point, in frame coordinates so a device pixel ratio
    /// change mid-stroke does not displace it.
    Drawing { last: Point },
    /// Grab offset is press point minus the reference's effective origin,
    /// in frame coordinates.
    DraggingReference { index: usize, grab_offset: Point },
    HoveringReference { index: usize },
}

impl InteractionState {
    pub fn is_drawing(self) -> bool {
        matches!(self, Self::Drawing { .. })
    }

    pub fn dragged_index(self) -> Option<usize> {
        match self {
            Self::DraggingReference { index, .. } => Some(index),
            _ => None,
        }
    }

    pub fn hovered_index(self) -> Option<usize> {
        match self {
            Self::HoveringReference { index } => Some(index),
            _ => None,
        }
    }
}

/// Allowed transitions. Hover is only entered from a resting state and a busy
/// state always returns through a resting state.
pub fn can_transition(from: InteractionState, to: InteractionState) -> bool {
    use InteractionState::*;
    match (from, to) {
        (Drawing { .. }, Drawing { .. }) => true,
        (DraggingReference { index: a, .. }, DraggingReference { index: b, .. }) => a == b,
        (Drawing { .. }, DraggingReference { .. }) | (DraggingReference { .. }, Drawing { .. }) => {
            false
        }
        (Drawing { .. }, HoveringReference { .. }) => false,
        _ => true,
    }
}
