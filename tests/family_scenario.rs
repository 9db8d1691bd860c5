use kinship::layout::build_layout;
use kinship::layout::generations::build_generations;
use kinship::model::Tree;
use kinship::mutation::{PanelRow, PanelTarget};
use kinship::render::{Renderer, TextRenderer, ViewState};
use kinship::resolve;

struct Johnsons {
    tree: Tree,
    robert: String,
    michael: String,
    sarah: String,
    emma: String,
}

fn johnsons() -> Johnsons {
    let mut tree = Tree::new("johnsons", "The Johnsons");
    let robert = tree
        .add_person("Robert Johnson", &[], None, None)
        .expect("robert");
    tree.add_spouse(&robert, "Eleanor Johnson").expect("eleanor");
    let michael = tree.add_child(&robert, "Michael Johnson").expect("michael");
    tree.add_child(&robert, "Lisa Johnson").expect("lisa");
    let sarah = tree.add_spouse(&michael, "Sarah Miller").expect("sarah");
    let emma = tree.add_child(&michael, "Emma Johnson").expect("emma");
    tree.add_root_sibling(&robert, "Walter Johnson").expect("walter");
    Johnsons {
        tree,
        robert,
        michael,
        sarah,
        emma,
    }
}

fn row(tree: &Tree, number: usize) -> Vec<String> {
    build_generations(tree)
        .into_iter()
        .find(|generation| generation.number == number)
        .map(|generation| generation.member_ids().map(str::to_string).collect())
        .unwrap_or_default()
}

#[test]
fn built_family_keeps_links_consistent() {
    let family = johnsons();
    let tree = &family.tree;
    assert!(tree.check_invariants().is_empty(), "{:?}", tree.check_invariants());
    assert_eq!(tree.root_person_ids, vec!["robert1", "walter1"]);

    let emma_parents: Vec<&str> = resolve::parents_of(&tree.people, &family.emma)
        .into_iter()
        .map(|parent| parent.id.as_str())
        .collect();
    assert_eq!(emma_parents.len(), 2);
    assert!(emma_parents.contains(&family.michael.as_str()));
    assert!(emma_parents.contains(&family.sarah.as_str()));
    assert_eq!(
        resolve::ancestor_chain_from_root(&tree.people, &tree.root_person_ids, &family.emma),
        vec!["robert1", "michael1", "emma1"]
    );
    assert_eq!(resolve::count_descendants(&tree.people, &family.robert), 3);
}

#[test]
fn generations_place_everyone_once() {
    let family = johnsons();
    assert_eq!(row(&family.tree, 1), vec!["robert1", "walter1"]);
    assert_eq!(row(&family.tree, 2), vec!["michael1", "lisa1"]);
    assert_eq!(row(&family.tree, 3), vec!["emma1"]);

    let mut seen: Vec<String> = build_generations(&family.tree)
        .iter()
        .flat_map(|generation| generation.member_ids().map(str::to_string).collect::<Vec<_>>())
        .collect();
    let total = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), total);
}

#[test]
fn removing_a_parent_cascades_and_promotes() {
    let mut family = johnsons();
    assert!(family.tree.remove_person(&family.michael));

    let tree = &family.tree;
    assert!(tree.check_invariants().is_empty(), "{:?}", tree.check_invariants());
    let sarah = tree.people.get(&family.sarah).expect("sarah survives");
    assert_eq!(sarah.spouse_id, None);
    assert!(tree.is_root(&family.sarah));
    let emma = tree.people.get(&family.emma).expect("emma survives");
    assert_eq!(emma.parent_ids, vec![family.sarah.clone()]);
    assert!(build_layout(tree).visible_ids().contains(&family.emma));
}

#[test]
fn branch_delete_keeps_married_in_spouses() {
    let mut family = johnsons();
    let deleted = family.tree.delete_branch(&family.michael);
    assert_eq!(deleted, vec!["michael1", "emma1"]);

    let tree = &family.tree;
    assert!(tree.check_invariants().is_empty(), "{:?}", tree.check_invariants());
    assert!(tree.people.contains(&family.sarah));
    assert!(tree.is_root(&family.sarah));
    assert_eq!(resolve::household_children(&tree.people, &family.robert).len(), 1);
}

#[test]
fn collapse_hides_descendants_until_pruned() {
    let mut family = johnsons();
    assert_eq!(family.tree.toggle_collapse(&family.michael), Some(true));
    let view = TextRenderer::default().render_tree(&build_layout(&family.tree), &ViewState::new());
    assert!(view.find_line("Emma Johnson").is_none());
    assert!(view.find_line("Michael Johnson").is_some());

    family.tree.remove_person(&family.emma);
    assert_eq!(family.tree.prune_collapsed(), vec![family.michael.clone()]);
    assert!(family.tree.check_invariants().is_empty());
}

#[test]
fn panel_edit_then_reorder() {
    let mut family = johnsons();
    let robert = family.robert.clone();
    let report = family
        .tree
        .reconcile_panel(
            &PanelTarget::ChildrenOf(robert.clone()),
            &[
                PanelRow::existing("lisa1", "Lisa Johnson"),
                PanelRow::new_person("Tom Johnson"),
                PanelRow::existing("michael1", "Michael R. Johnson"),
            ],
        )
        .expect("valid panel");
    assert_eq!(report.created, vec!["tom1"]);
    assert!(report.deleted.is_empty());

    let order = |tree: &Tree| -> Vec<String> {
        resolve::household_children(&tree.people, &robert)
            .into_iter()
            .map(|child| child.id.clone())
            .collect()
    };
    assert_eq!(order(&family.tree), vec!["lisa1", "tom1", "michael1"]);
    assert_eq!(
        family.tree.people.get("michael1").map(|p| p.name.as_str()),
        Some("Michael R. Johnson")
    );

    let ids: Vec<String> = ["michael1", "tom1", "lisa1"].map(String::from).to_vec();
    assert!(family.tree.apply_reorder(Some(&robert), &ids));
    assert_eq!(order(&family.tree), ids);
    assert!(!family.tree.apply_reorder(Some(&robert), &["emma1".to_string()]));
}
