// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Template authoring — turn pointer input on a rectified sample into the
// rectangle list of a new template.

use docveil_core::types::{Rectangle, Template, TemplateSize};
use tracing::debug;

/// Pointer input in rectified-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Down(i32, i32),
    Move(i32, i32),
    Up(i32, i32),
}

/// Press-drag-release rectangle drawing.
#[derive(Debug, Clone, Default)]
pub struct DrawingSession {
    start: Option<(i32, i32)>,
    rectangles: Vec<Rectangle>,
}

impl DrawingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.start.is_some()
    }

    /// Feed one pointer event.
    ///
    /// `Move` while drawing returns the live rectangle to preview; `Up`
    /// returns the rectangle it committed. Events outside a press are
    /// ignored.
    pub fn handle(&mut self, event: PointerEvent) -> Option<Rectangle> {
        match event {
            PointerEvent::Down(x, y) => {
                self.start = Some((x, y));
                None
            }
            PointerEvent::Move(x, y) => self.start.map(|start| Rectangle::new(start, (x, y))),
            PointerEvent::Up(x, y) => {
                let start = self.start.take()?;
                let rect = Rectangle::new(start, (x, y));
                debug!(?rect, "Rectangle drawn");
                self.rectangles.push(rect);
                Some(rect)
            }
        }
    }

    pub fn rectangles(&self) -> &[Rectangle] {
        &self.rectangles
    }

    /// Drop every rectangle and any press in progress.
    pub fn clear(&mut self) {
        self.start = None;
        self.rectangles.clear();
    }

    /// The template for a sample of `size`.
    pub fn finish(self, size: TemplateSize) -> Template {
        Template::new(size, self.rectangles)
    }
}

/// Two-click rectangle entry: the first click anchors, the second commits.
#[derive(Debug, Clone, Default)]
pub struct ClickPairSession {
    pending: Option<(i32, i32)>,
    last_click: Option<(i32, i32)>,
    rectangles: Vec<Rectangle>,
}

impl ClickPairSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a click and return the rectangle it completed, if any.
    ///
    /// A click at exactly the previous click's position is a repeated
    /// delivery of the same event and is ignored.
    pub fn click(&mut self, x: i32, y: i32) -> Option<Rectangle> {
        let point = (x, y);
        if self.last_click == Some(point) {
            return None;
        }
        self.last_click = Some(point);

        match self.pending.take() {
            None => {
                self.pending = Some(point);
                None
            }
            Some(anchor) => {
                let rect = Rectangle::new(anchor, point);
                debug!(?rect, "Rectangle committed");
                self.rectangles.push(rect);
                Some(rect)
            }
        }
    }

    pub fn pending(&self) -> Option<(i32, i32)> {
        self.pending
    }

    pub fn rectangles(&self) -> &[Rectangle] {
        &self.rectangles
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.last_click = None;
        self.rectangles.clear();
    }

    pub fn finish(self, size: TemplateSize) -> Template {
        Template::new(size, self.rectangles)
    }
}
