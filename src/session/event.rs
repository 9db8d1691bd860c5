use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    PersonClicked {
        id: String,
    },
    SpouseNameClicked {
        id: String,
    },
    CollapseToggled {
        id: String,
    },
    NicknameCycled {
        id: String,
        direction: CycleDirection,
    },
    ReorderCommitted {
        parent_id: Option<String>,
        ids: Vec<String>,
    },
}

impl UiEvent {
    pub fn person_clicked(id: impl Into<String>) -> Self {
        Self::PersonClicked { id: id.into() }
    }

    pub fn spouse_name_clicked(id: impl Into<String>) -> Self {
        Self::SpouseNameClicked { id: id.into() }
    }

    pub fn collapse_toggled(id: impl Into<String>) -> Self {
        Self::CollapseToggled { id: id.into() }
    }

    pub fn nickname_cycled(id: impl Into<String>, direction: CycleDirection) -> Self {
        Self::NicknameCycled {
            id: id.into(),
            direction,
        }
    }
}
