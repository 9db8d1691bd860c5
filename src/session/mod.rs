pub mod drag;
pub mod event;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PersistError;
use crate::layout::build_layout;
use crate::layout::generations::build_generations;
use crate::model::{Person, Tree, TreeSummary, Workspace};
use crate::persist::Persistence;
use crate::render::{RenderedView, Renderer, TextRenderer, ViewState};
use crate::resolve;

pub use drag::DragSession;
pub use event::{CycleDirection, UiEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Branches,
    Generations,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Selected(String),
    Changed,
    Redrawn,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetail {
    pub person: Person,
    pub spouse: Option<Person>,
    pub parents: Vec<Person>,
    pub children: Vec<Person>,
    pub siblings: Vec<Person>,
    pub ancestor_chain: Vec<String>,
    pub descendant_count: usize,
}

pub struct Session<R: Renderer = TextRenderer> {
    workspace: Workspace,
    view: ViewState,
    mode: ViewMode,
    renderer: R,
    persistence: Persistence,
    default_title: String,
    rendered: RenderedView,
}

impl Session<TextRenderer> {
    pub fn open(persistence: Persistence, default_title: &str) -> Result<Self, PersistError> {
        Self::with_renderer(persistence, default_title, TextRenderer::default())
    }
}

impl<R: Renderer> Session<R> {
    pub fn with_renderer(
        persistence: Persistence,
        default_title: &str,
        renderer: R,
    ) -> Result<Self, PersistError> {
        let workspace = persistence.local().load_workspace(default_title)?;
        let mut session = Self {
            workspace,
            view: ViewState::new(),
            mode: ViewMode::default(),
            renderer,
            persistence,
            default_title: default_title.to_string(),
            rendered: RenderedView::default(),
        };
        session.refresh();
        Ok(session)
    }

    pub fn tree(&self) -> &Tree {
        self.workspace.active()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn mutate<T>(&mut self, op: impl FnOnce(&mut Tree) -> T) -> Result<T, PersistError> {
        let before = self.workspace.active().clone();
        let out = op(self.workspace.active_mut());
        let tree = self.workspace.active_mut();
        tree.prune_collapsed();
        if tree.same_content(&before) {
            return Ok(out);
        }
        tree.touch();
        let people = &tree.people;
        self.view.retain_ids(|id| people.contains(id));
        self.refresh();
        self.save()?;
        Ok(out)
    }

    pub fn save(&mut self) -> Result<(), PersistError> {
        self.persistence.save(&self.workspace)
    }

    pub fn refresh(&mut self) -> &RenderedView {
        let tree = self.workspace.active();
        self.rendered = match self.mode {
            ViewMode::Branches => self.renderer.render_tree(&build_layout(tree), &self.view),
            ViewMode::Generations => {
                self.renderer
                    .render_generations(tree, &build_generations(tree), &self.view)
            }
        };
        &self.rendered
    }

    pub fn current_view(&self) -> &RenderedView {
        &self.rendered
    }

    pub fn set_mode(&mut self, mode: ViewMode) -> &RenderedView {
        self.mode = mode;
        self.refresh()
    }

    pub fn dispatch(&mut self, event: UiEvent) -> Result<EventOutcome, PersistError> {
        debug!(?event, "dispatch");
        match event {
            UiEvent::PersonClicked { id } | UiEvent::SpouseNameClicked { id } => {
                if self.tree().people.contains(&id) {
                    Ok(EventOutcome::Selected(id))
                } else {
                    Ok(EventOutcome::Ignored)
                }
            }
            UiEvent::CollapseToggled { id } => {
                let toggled = self.mutate(|tree| tree.toggle_collapse(&id))?;
                Ok(changed_or_ignored(toggled.is_some()))
            }
            UiEvent::NicknameCycled { id, direction } => {
                let Some(count) = self.tree().people.get(&id).map(|p| p.nicknames.len()) else {
                    return Ok(EventOutcome::Ignored);
                };
                if count < 2 {
                    return Ok(EventOutcome::Ignored);
                }
                self.view.cycle_nickname(&id, count, direction);
                self.refresh();
                Ok(EventOutcome::Redrawn)
            }
            UiEvent::ReorderCommitted { parent_id, ids } => {
                let applied = self.mutate(|tree| tree.apply_reorder(parent_id.as_deref(), &ids))?;
                Ok(changed_or_ignored(applied))
            }
        }
    }

    pub fn person_detail(&self, id: &str) -> Option<PersonDetail> {
        let tree = self.tree();
        let people = &tree.people;
        let person = people.get(id)?;
        let owned = |list: Vec<&Person>| list.into_iter().cloned().collect::<Vec<_>>();
        Some(PersonDetail {
            person: person.clone(),
            spouse: resolve::spouse_of(people, id).cloned(),
            parents: owned(resolve::parents_of(people, id)),
            children: owned(resolve::household_children(people, id)),
            siblings: owned(resolve::siblings_of(people, id)),
            ancestor_chain: resolve::ancestor_chain_from_root(people, &tree.root_person_ids, id),
            descendant_count: resolve::count_descendants(people, id),
        })
    }

    pub fn trees(&self) -> Vec<TreeSummary> {
        self.workspace.summaries()
    }

    pub fn create_tree(&mut self, title: &str) -> Result<String, PersistError> {
        let title = match title.trim() {
            "" => self.default_title.clone(),
            trimmed => trimmed.to_string(),
        };
        let tree = Tree::with_generated_id(title);
        let id = tree.id.clone();
        self.workspace.insert(tree);
        self.workspace.activate(&id);
        self.view = ViewState::new();
        self.refresh();
        self.save()?;
        info!(tree = %id, "created tree");
        Ok(id)
    }

    pub fn switch_tree(&mut self, id: &str) -> Result<bool, PersistError> {
        if self.workspace.active_id() == id {
            return Ok(true);
        }
        if !self.workspace.activate(id) {
            return Ok(false);
        }
        self.view = ViewState::new();
        self.refresh();
        self.save()?;
        Ok(true)
    }

    pub fn delete_tree(&mut self, id: &str) -> Result<bool, PersistError> {
        let was_active = self.workspace.active_id() == id;
        if self.workspace.remove(id, &self.default_title).is_none() {
            return Ok(false);
        }
        self.persistence.forget_remote(id);
        if was_active {
            self.view = ViewState::new();
        }
        self.refresh();
        self.save()?;
        info!(tree = %id, "deleted tree");
        Ok(true)
    }

    pub fn push_all(&mut self) -> Option<usize> {
        let trees: Vec<Tree> = self.workspace.trees().into_iter().cloned().collect();
        let remote = self.persistence.remote_mut()?;
        let queued = trees.iter().filter(|tree| remote.submit(tree)).count();
        remote.flush();
        Some(queued)
    }

    pub fn pull(&mut self) -> Result<Option<Vec<String>>, PersistError> {
        let Some(remote) = self.persistence.remote() else {
            return Ok(None);
        };
        let mut pulled = Vec::new();
        for summary in remote.list()? {
            if let Some(tree) = remote.load(&summary.id)? {
                pulled.push(tree);
            }
        }
        let ids: Vec<String> = pulled.iter().map(|tree| tree.id.clone()).collect();
        for tree in pulled {
            self.workspace.insert(tree);
        }
        if !ids.is_empty() {
            self.refresh();
            self.save()?;
        }
        info!(count = ids.len(), "pulled trees");
        Ok(Some(ids))
    }

    pub fn flush(&self) {
        self.persistence.flush();
    }
}

fn changed_or_ignored(changed: bool) -> EventOutcome {
    if changed {
        EventOutcome::Changed
    } else {
        EventOutcome::Ignored
    }
}
