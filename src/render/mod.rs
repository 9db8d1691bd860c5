pub mod roman;
pub mod text;
pub mod view;

use serde::Serialize;

use crate::layout::LayoutTree;
use crate::layout::generations::Generation;
use crate::model::Tree;
use crate::session::event::UiEvent;

pub use text::TextRenderer;
pub use view::ViewState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handler {
    pub line: usize,
    pub event: UiEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedView {
    pub lines: Vec<String>,
    pub handlers: Vec<Handler>,
}

impl RenderedView {
    pub fn text(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    pub fn handlers_at(&self, line: usize) -> impl Iterator<Item = &UiEvent> {
        self.handlers
            .iter()
            .filter(move |handler| handler.line == line)
            .map(|handler| &handler.event)
    }

    pub fn find_line(&self, needle: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.contains(needle))
    }

    pub(crate) fn push_line(&mut self, line: String) -> usize {
        self.lines.push(line);
        self.lines.len() - 1
    }

    pub(crate) fn bind(&mut self, line: usize, event: UiEvent) {
        self.handlers.push(Handler { line, event });
    }
}

pub trait Renderer {
    fn render_tree(&mut self, layout: &LayoutTree, view: &ViewState) -> RenderedView;

    fn render_generations(
        &mut self,
        tree: &Tree,
        generations: &[Generation],
        view: &ViewState,
    ) -> RenderedView;
}
