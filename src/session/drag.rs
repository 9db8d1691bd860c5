use crate::layout::sorted_roots;
use crate::model::Tree;
use crate::resolve;
use crate::session::event::UiEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    parent_id: Option<String>,
    dragged: String,
    original: Vec<String>,
    order: Vec<String>,
}

impl DragSession {
    pub fn begin(tree: &Tree, parent_id: Option<&str>, dragged: &str) -> Option<Self> {
        let order: Vec<String> = match parent_id {
            Some(parent) => resolve::household_children(&tree.people, parent)
                .into_iter()
                .map(|child| child.id.clone())
                .collect(),
            None => sorted_roots(tree)
                .into_iter()
                .map(|root| root.id.clone())
                .collect(),
        };
        if !order.iter().any(|id| id == dragged) {
            return None;
        }
        Some(Self {
            parent_id: parent_id.map(ToOwned::to_owned),
            dragged: dragged.to_string(),
            original: order.clone(),
            order,
        })
    }

    pub fn dragged(&self) -> &str {
        &self.dragged
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn move_before(&mut self, target: &str) -> bool {
        if target == self.dragged {
            return false;
        }
        let Some(from) = self.position(&self.dragged) else {
            return false;
        };
        let item = self.order.remove(from);
        match self.position(target) {
            Some(to) => {
                self.order.insert(to, item);
                true
            }
            None => {
                self.order.insert(from, item);
                false
            }
        }
    }

    pub fn move_to(&mut self, index: usize) {
        if let Some(from) = self.position(&self.dragged) {
            let item = self.order.remove(from);
            let to = index.min(self.order.len());
            self.order.insert(to, item);
        }
    }

    pub fn commit(self) -> Option<UiEvent> {
        if self.order == self.original {
            return None;
        }
        Some(UiEvent::ReorderCommitted {
            parent_id: self.parent_id,
            ids: self.order,
        })
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|item| item == id)
    }
}
