pub mod generations;

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{Person, Tree};
use crate::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStyle {
    WithSpouse,
    NoSpouse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpouseBlock {
    pub id: String,
    pub name: String,
    pub initials: String,
    pub photo: Option<String>,
    pub nicknames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonNode {
    pub id: String,
    pub name: String,
    pub initials: String,
    pub photo: Option<String>,
    pub nicknames: Vec<String>,
    pub lifespan: Option<String>,
    pub generation: usize,
    pub spouse: Option<SpouseBlock>,
    pub style: CardStyle,
    pub child_count: usize,
    pub descendant_count: usize,
    pub collapsed: bool,
}

impl PersonNode {
    pub fn has_children(&self) -> bool {
        self.child_count > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Connector {
    pub span: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchGroup {
    pub person: PersonNode,
    pub connector: Connector,
    pub children: Vec<LayoutNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct RootSiblingGroup {
    pub members: Vec<LayoutNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutNode {
    Person(PersonNode),
    Branch(BranchGroup),
    RootSiblings(RootSiblingGroup),
}

impl LayoutNode {
    pub fn head(&self) -> Option<&PersonNode> {
        match self {
            Self::Person(node) => Some(node),
            Self::Branch(branch) => Some(&branch.person),
            Self::RootSiblings(_) => None,
        }
    }

    fn collect_visible(&self, out: &mut Vec<String>) {
        match self {
            Self::Person(node) => push_card_ids(node, out),
            Self::Branch(branch) => {
                push_card_ids(&branch.person, out);
                for child in &branch.children {
                    child.collect_visible(out);
                }
            }
            Self::RootSiblings(group) => {
                for member in &group.members {
                    member.collect_visible(out);
                }
            }
        }
    }

    fn find(&self, id: &str) -> Option<&PersonNode> {
        match self {
            Self::Person(node) => (node.id == id).then_some(node),
            Self::Branch(branch) => {
                if branch.person.id == id {
                    return Some(&branch.person);
                }
                branch.children.iter().find_map(|child| child.find(id))
            }
            Self::RootSiblings(group) => group.members.iter().find_map(|m| m.find(id)),
        }
    }
}

fn push_card_ids(node: &PersonNode, out: &mut Vec<String>) {
    out.push(node.id.clone());
    if let Some(spouse) = &node.spouse {
        out.push(spouse.id.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutTree {
    pub title: String,
    pub tagline: String,
    pub roots: RootSiblingGroup,
    pub stale_collapsed: Vec<String>,
}

impl LayoutTree {
    pub fn visible_ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        for member in &self.roots.members {
            member.collect_visible(&mut out);
        }
        out
    }

    pub fn find(&self, id: &str) -> Option<&PersonNode> {
        self.roots.members.iter().find_map(|member| member.find(id))
    }
}

pub fn build_layout(tree: &Tree) -> LayoutTree {
    let mut builder = LayoutBuilder {
        tree,
        placed: HashSet::new(),
    };
    let mut members = Vec::new();
    for root in sorted_roots(tree) {
        if builder.placed.contains(root.id.as_str()) {
            continue;
        }
        members.push(builder.node_for(root, 1));
    }

    LayoutTree {
        title: tree.title.clone(),
        tagline: tree.tagline.clone(),
        roots: RootSiblingGroup { members },
        stale_collapsed: stale_collapsed_ids(tree),
    }
}

pub fn sorted_roots(tree: &Tree) -> Vec<&Person> {
    let mut seen = HashSet::new();
    let mut roots: Vec<&Person> = tree
        .root_person_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter_map(|id| tree.people.get(id))
        .collect();
    resolve::sort_by_birth_order(&mut roots);
    roots
}

pub fn stale_collapsed_ids(tree: &Tree) -> Vec<String> {
    tree.collapsed_ids
        .iter()
        .filter(|id| resolve::household_children(&tree.people, id).is_empty())
        .cloned()
        .collect()
}

// Drawn inside the partner's card, never on a card of their own.
pub(crate) fn married_in_spouse<'a>(tree: &'a Tree, id: &str) -> Option<&'a Person> {
    resolve::spouse_of(&tree.people, id).filter(|spouse| spouse.is_parentless())
}

struct LayoutBuilder<'a> {
    tree: &'a Tree,
    placed: HashSet<&'a str>,
}

impl<'a> LayoutBuilder<'a> {
    fn node_for(&mut self, person: &'a Person, generation: usize) -> LayoutNode {
        let tree = self.tree;
        self.placed.insert(person.id.as_str());
        if let Some(spouse) = married_in_spouse(tree, &person.id) {
            self.placed.insert(spouse.id.as_str());
        }
        let children = resolve::household_children(&tree.people, &person.id);
        let collapsed = !children.is_empty() && tree.collapsed_ids.contains(&person.id);
        let card = self.card(person, generation, children.len(), collapsed);
        if collapsed || children.is_empty() {
            return LayoutNode::Person(card);
        }

        let mut nodes = Vec::with_capacity(children.len());
        for child in children {
            if self.placed.contains(child.id.as_str()) {
                continue;
            }
            nodes.push(self.node_for(child, generation + 1));
        }
        if nodes.is_empty() {
            return LayoutNode::Person(card);
        }
        LayoutNode::Branch(BranchGroup {
            connector: Connector { span: nodes.len() },
            person: card,
            children: nodes,
        })
    }

    fn card(
        &self,
        person: &Person,
        generation: usize,
        child_count: usize,
        collapsed: bool,
    ) -> PersonNode {
        let spouse = resolve::spouse_of(&self.tree.people, &person.id).map(|spouse| SpouseBlock {
            id: spouse.id.clone(),
            name: spouse.name.clone(),
            initials: spouse.initials(),
            photo: spouse.photo.clone(),
            nicknames: spouse.nicknames.clone(),
        });
        PersonNode {
            id: person.id.clone(),
            name: person.name.clone(),
            initials: person.initials(),
            photo: person.photo.clone(),
            nicknames: person.nicknames.clone(),
            lifespan: person.lifespan(),
            generation,
            style: if spouse.is_some() {
                CardStyle::WithSpouse
            } else {
                CardStyle::NoSpouse
            },
            spouse,
            child_count,
            descendant_count: if child_count > 0 {
                resolve::count_descendants(&self.tree.people, &person.id).max(child_count)
            } else {
                0
            },
            collapsed,
        }
    }
}
