use crate::canvas::model::{DrawingStyle, Point};
use crate::canvas::state::{can_transition, InteractionState};
use crate::canvas::surface::{SurfaceManager, ThumbnailHighlight};

pub type PointerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Crosshair,
    Move,
}

/// Routes one pointer stream to reference dragging, ink drawing or hover
/// feedback. Points arrive in display coordinates.
#[derive(Debug, Clone, Default)]
pub struct PointerDispatcher {
    state: InteractionState,
    captured: Option<PointerId>,
    cursor: CursorShape,
}

impl PointerDispatcher {
    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn captured_pointer(&self) -> Option<PointerId> {
        self.captured
    }

    pub fn cursor(&self) -> CursorShape {
        self.cursor
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn set_state(&mut self, next: InteractionState) {
        debug_assert!(
            can_transition(self.state, next),
            "illegal interaction transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Returns `false` when the event was ignored: no base image yet, or
    /// another pointer holds the capture.
    pub fn pointer_down(
        &mut self,
        surface: &mut SurfaceManager,
        style: &DrawingStyle,
        pointer: PointerId,
        display: Point,
    ) -> bool {
        let Some(frame) = surface.frame() else {
            return false;
        };
        if self.captured.is_some() {
            return false;
        }
        let layout = *surface.layout();
        let at = surface.display_to_frame(display);
        self.captured = Some(pointer);

        let hit = surface.references().hit_test(&layout, at, frame.size());
        if let Some(index) = hit {
            let origin = surface
                .references()
                .origin(&layout, index, frame.size())
                .unwrap_or(at);
            self.set_state(InteractionState::DraggingReference {
                index,
                grab_offset: at - origin,
            });
            self.cursor = CursorShape::Move;
            surface.set_highlight(ThumbnailHighlight::Dragged(index));
            tracing::debug!(index, "reference drag started");
        } else {
            let backing = surface.frame_to_backing(at);
            let ratio = surface.device_pixel_ratio();
            surface.ink_mut().stroke_start(backing, style, ratio);
            self.set_state(InteractionState::Drawing { last: at });
            surface.set_highlight(ThumbnailHighlight::None);
        }
        true
    }

    pub fn pointer_move(
        &mut self,
        surface: &mut SurfaceManager,
        style: &DrawingStyle,
        pointer: PointerId,
        display: Point,
    ) -> bool {
        let Some(frame) = surface.frame() else {
            return false;
        };
        if self.captured.is_some_and(|held| held != pointer) {
            return false;
        }
        let layout = *surface.layout();
        let at = surface.display_to_frame(display);

        match self.state {
            InteractionState::DraggingReference { index, grab_offset } => {
                surface
                    .references_mut()
                    .move_to(&layout, index, at - grab_offset, frame.size());
                surface.render();
            }
            InteractionState::Drawing { last } => {
                let from = surface.frame_to_backing(last);
                let to = surface.frame_to_backing(at);
                let ratio = surface.device_pixel_ratio();
                surface.ink_mut().stroke_segment(from, to, style, ratio);
                self.set_state(InteractionState::Drawing { last: at });
            }
            InteractionState::Idle | InteractionState::HoveringReference { .. } => {
                self.update_hover(surface, at);
            }
        }
        true
    }

    /// End the current gesture and release capture. After a drag the release
    /// point is hit-tested straight away so hover feedback continues.
    pub fn pointer_up(&mut self, surface: &mut SurfaceManager, pointer: PointerId, display: Point) -> bool {
        if self.captured.is_some_and(|held| held != pointer) {
            return false;
        }
        self.captured = None;
        match self.state {
            InteractionState::DraggingReference { index, .. } => {
                tracing::debug!(index, "reference drag finished");
                let at = surface.display_to_frame(display);
                self.update_hover(surface, at);
            }
            InteractionState::Drawing { .. } => {
                self.set_state(InteractionState::Idle);
            }
            _ => {}
        }
        true
    }

    fn update_hover(&mut self, surface: &mut SurfaceManager, at: Point) {
        let Some(frame) = surface.frame() else {
            self.set_state(InteractionState::Idle);
            return;
        };
        let layout = *surface.layout();
        match surface.references().hit_test(&layout, at, frame.size()) {
            Some(index) => {
                self.set_state(InteractionState::HoveringReference { index });
                self.cursor = CursorShape::Move;
                surface.set_highlight(ThumbnailHighlight::Hovered(index));
            }
            None => {
                self.set_state(InteractionState::Idle);
                self.cursor = CursorShape::Crosshair;
                surface.set_highlight(ThumbnailHighlight::None);
            }
        }
    }
}
