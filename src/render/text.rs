use crate::layout::generations::Generation;
use crate::layout::{LayoutNode, LayoutTree, PersonNode};
use crate::model::{Person, Tree};
use crate::render::roman::generation_label;
use crate::render::{RenderedView, Renderer, ViewState};
use crate::resolve;
use crate::session::event::{CycleDirection, UiEvent};

const BAND_WIDTH: usize = 6;

#[derive(Debug, Clone)]
pub struct TextRenderer {
    pub generation_band: bool,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            generation_band: true,
        }
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn header(&self, title: &str, tagline: &str, out: &mut RenderedView) {
        out.push_line(title.to_string());
        if !tagline.is_empty() {
            out.push_line(tagline.to_string());
        }
        out.push_line(String::new());
    }

    fn draw(
        &self,
        node: &LayoutNode,
        lead: &str,
        indent: &str,
        view: &ViewState,
        out: &mut RenderedView,
    ) {
        match node {
            LayoutNode::Person(card) => self.card_line(card, lead, view, out),
            LayoutNode::Branch(branch) => {
                self.card_line(&branch.person, lead, view, out);
                let count = branch.children.len();
                for (idx, child) in branch.children.iter().enumerate() {
                    let (elbow, pipe) = if idx + 1 == count {
                        ("└── ", "    ")
                    } else {
                        ("├── ", "│   ")
                    };
                    self.draw(
                        child,
                        &format!("{indent}{elbow}"),
                        &format!("{indent}{pipe}"),
                        view,
                        out,
                    );
                }
            }
            LayoutNode::RootSiblings(group) => {
                for member in &group.members {
                    self.draw(member, lead, indent, view, out);
                }
            }
        }
    }

    fn band(&self, generation: usize) -> String {
        if self.generation_band {
            format!("{:<width$}", generation_label(generation), width = BAND_WIDTH)
        } else {
            String::new()
        }
    }

    fn card_line(
        &self,
        card: &PersonNode,
        lead: &str,
        view: &ViewState,
        out: &mut RenderedView,
    ) {
        let mut text = format!("{}{lead}", self.band(card.generation));
        text.push_str(&badge(card.photo.as_deref(), &card.initials));
        text.push(' ');
        text.push_str(&card.name);
        if let Some(nick) = view.current_nickname(&card.id, &card.nicknames) {
            text.push_str(&format!(" \"{nick}\""));
        }
        if let Some(lifespan) = &card.lifespan {
            text.push_str(&format!(" ({lifespan})"));
        }
        if let Some(spouse) = &card.spouse {
            text.push_str(" = ");
            text.push_str(&badge(spouse.photo.as_deref(), &spouse.initials));
            text.push(' ');
            text.push_str(&spouse.name);
            if let Some(nick) = view.current_nickname(&spouse.id, &spouse.nicknames) {
                text.push_str(&format!(" \"{nick}\""));
            }
        }
        if card.has_children() {
            if card.collapsed {
                text.push_str(&format!(" [+{}]", card.descendant_count));
            } else {
                text.push_str(" [-]");
            }
        }

        let line = out.push_line(text);
        out.bind(line, UiEvent::person_clicked(&card.id));
        if let Some(spouse) = &card.spouse {
            out.bind(line, UiEvent::spouse_name_clicked(&spouse.id));
            if spouse.nicknames.len() > 1 {
                bind_nickname_cycle(out, line, &spouse.id);
            }
        }
        if card.has_children() {
            out.bind(line, UiEvent::collapse_toggled(&card.id));
        }
        if card.nicknames.len() > 1 {
            bind_nickname_cycle(out, line, &card.id);
        }
    }

    fn person_label(&self, tree: &Tree, person: &Person, view: &ViewState) -> String {
        let mut text = format!(
            "{} {}",
            badge(person.photo.as_deref(), &person.initials()),
            person.name
        );
        if let Some(nick) = view.current_nickname(&person.id, &person.nicknames) {
            text.push_str(&format!(" \"{nick}\""));
        }
        if let Some(spouse) = resolve::spouse_of(&tree.people, &person.id) {
            text.push_str(&format!(" = {}", spouse.name));
        }
        text
    }
}

fn bind_nickname_cycle(out: &mut RenderedView, line: usize, id: &str) {
    for direction in [CycleDirection::Backward, CycleDirection::Forward] {
        out.bind(line, UiEvent::nickname_cycled(id, direction));
    }
}

fn badge(photo: Option<&str>, initials: &str) -> String {
    match photo {
        Some(_) => "[photo]".to_string(),
        None => format!("({initials})"),
    }
}

impl Renderer for TextRenderer {
    fn render_tree(&mut self, layout: &LayoutTree, view: &ViewState) -> RenderedView {
        let mut out = RenderedView::default();
        self.header(&layout.title, &layout.tagline, &mut out);
        if layout.roots.members.is_empty() {
            out.push_line("(empty tree)".to_string());
            return out;
        }
        for member in &layout.roots.members {
            self.draw(member, "", "", view, &mut out);
        }
        out
    }

    fn render_generations(
        &mut self,
        tree: &Tree,
        generations: &[Generation],
        view: &ViewState,
    ) -> RenderedView {
        let mut out = RenderedView::default();
        self.header(&tree.title, &tree.tagline, &mut out);
        if generations.is_empty() {
            out.push_line("(empty tree)".to_string());
            return out;
        }
        for generation in generations {
            out.push_line(format!(
                "Generation {} ({} children below)",
                generation_label(generation.number),
                generation.child_total
            ));
            for cluster in &generation.clusters {
                let members: Vec<&Person> = cluster
                    .member_ids
                    .iter()
                    .filter_map(|id| tree.people.get(id))
                    .collect();
                let labels: Vec<String> = members
                    .iter()
                    .map(|person| self.person_label(tree, person, view))
                    .collect();
                let parents: Vec<&str> = cluster
                    .parent_ids
                    .iter()
                    .filter_map(|id| tree.people.get(id))
                    .map(|person| person.name.as_str())
                    .collect();
                let lead = if parents.is_empty() {
                    "  ".to_string()
                } else {
                    format!("  {{{}}} ", parents.join(" + "))
                };
                let line = out.push_line(format!("{lead}{}", labels.join(" | ")));
                for person in members {
                    out.bind(line, UiEvent::person_clicked(&person.id));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::build_layout;
    use crate::layout::generations::build_generations;

    fn sample() -> Tree {
        let mut tree = Tree::new("t", "The Johnsons");
        tree.tagline = "Since 1920".to_string();
        let mut robert = Person::new("robert1", "Robert Johnson");
        robert.spouse_id = Some("eleanor1".to_string());
        robert.nicknames = vec!["Bob".to_string(), "Bobby".to_string()];
        let mut eleanor = Person::new("eleanor1", "Eleanor Johnson");
        eleanor.spouse_id = Some("robert1".to_string());
        eleanor.photo = Some("e.jpg".to_string());
        let mut michael = Person::new("michael1", "Michael Johnson");
        michael.parent_ids = vec!["robert1".to_string(), "eleanor1".to_string()];
        michael.birth_order = Some(1);
        let mut lisa = Person::new("lisa1", "Lisa Johnson");
        lisa.parent_ids = vec!["robert1".to_string(), "eleanor1".to_string()];
        lisa.birth_order = Some(2);
        for person in [robert, eleanor, michael, lisa] {
            tree.people.upsert(person);
        }
        tree.root_person_ids = vec!["robert1".to_string()];
        tree
    }

    #[test]
    fn cards_show_initials_photo_spouse_and_toggle() {
        let tree = sample();
        let view = ViewState::new();
        let rendered = TextRenderer::new().render_tree(&build_layout(&tree), &view);

        assert_eq!(rendered.lines[0], "The Johnsons");
        assert_eq!(rendered.lines[1], "Since 1920");
        let robert = rendered.find_line("Robert Johnson").expect("robert line");
        assert_eq!(
            rendered.lines[robert],
            "I     (RJ) Robert Johnson \"Bob\" = [photo] Eleanor Johnson [-]"
        );
        let michael = rendered.find_line("Michael").expect("michael line");
        assert_eq!(rendered.lines[michael], "II    ├── (MJ) Michael Johnson");
        let lisa = rendered.find_line("Lisa").expect("lisa line");
        assert_eq!(rendered.lines[lisa], "II    └── (LJ) Lisa Johnson");
    }

    #[test]
    fn handlers_are_bound_per_line() {
        let tree = sample();
        let rendered = TextRenderer::new().render_tree(&build_layout(&tree), &ViewState::new());
        let robert = rendered.find_line("Robert").expect("robert line");
        let events: Vec<&UiEvent> = rendered.handlers_at(robert).collect();
        assert!(events.contains(&&UiEvent::person_clicked("robert1")));
        assert!(events.contains(&&UiEvent::spouse_name_clicked("eleanor1")));
        assert!(events.contains(&&UiEvent::collapse_toggled("robert1")));
        for direction in [CycleDirection::Backward, CycleDirection::Forward] {
            assert!(events.contains(&&UiEvent::nickname_cycled("robert1", direction)));
        }

        let michael = rendered.find_line("Michael").expect("michael line");
        let events: Vec<&UiEvent> = rendered.handlers_at(michael).collect();
        assert_eq!(events, vec![&UiEvent::person_clicked("michael1")]);
    }

    #[test]
    fn collapsed_card_shows_count_badge_and_cycled_nickname() {
        let mut tree = sample();
        tree.collapsed_ids.insert("robert1".to_string());
        let mut view = ViewState::new();
        view.cycle_nickname("robert1", 2, CycleDirection::Forward);
        let rendered = TextRenderer::new().render_tree(&build_layout(&tree), &view);
        let robert = rendered.find_line("Robert").expect("robert line");
        assert!(rendered.lines[robert].ends_with("[+2]"));
        assert!(rendered.lines[robert].contains("\"Bobby\""));
        assert!(rendered.find_line("Michael").is_none());
    }

    #[test]
    fn generation_view_labels_rows_and_clusters() {
        let tree = sample();
        let generations = build_generations(&tree);
        let rendered =
            TextRenderer::new().render_generations(&tree, &generations, &ViewState::new());
        assert!(rendered.lines.contains(&"Generation I (2 children below)".to_string()));
        let row = rendered
            .find_line("{Eleanor Johnson + Robert Johnson}")
            .expect("cluster line");
        assert!(rendered.lines[row].contains("(MJ) Michael Johnson | (LJ) Lisa Johnson"));
        assert_eq!(rendered.handlers_at(row).count(), 2);
    }

    #[test]
    fn empty_tree_renders_placeholder() {
        let tree = Tree::new("t", "Empty");
        let rendered = TextRenderer::new().render_tree(&build_layout(&tree), &ViewState::new());
        assert_eq!(rendered.lines.last().map(String::as_str), Some("(empty tree)"));
    }
}
