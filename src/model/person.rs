use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::model::date::{PartialDate, check_lifespan};

pub const MISSING_BIRTH_ORDER: i64 = i64::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parent_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_order: Option<i64>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub nicknames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<PartialDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<PartialDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maiden_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hobbies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub gallery: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_ids: Vec::new(),
            spouse_id: None,
            birth_order: None,
            nicknames: Vec::new(),
            birth_date: None,
            death_date: None,
            birth_place: None,
            location: None,
            maiden_name: None,
            occupation: None,
            education: None,
            hobbies: None,
            notes: None,
            photo: None,
            gallery: Vec::new(),
        }
    }

    pub fn is_parentless(&self) -> bool {
        self.parent_ids.is_empty()
    }

    pub fn has_parent(&self, id: &str) -> bool {
        self.parent_ids.iter().any(|parent| parent == id)
    }

    pub fn birth_order_key(&self) -> i64 {
        self.birth_order.unwrap_or(MISSING_BIRTH_ORDER)
    }

    pub fn initials(&self) -> String {
        initials_for(&self.name)
    }

    pub fn lifespan(&self) -> Option<String> {
        match (&self.birth_date, &self.death_date) {
            (None, None) => None,
            (Some(birth), None) => Some(format!("b. {birth}")),
            (None, Some(death)) => Some(format!("d. {death}")),
            (Some(birth), Some(death)) => Some(format!("{birth} - {death}")),
        }
    }
}

pub fn initials_for(name: &str) -> String {
    let mut tokens = name.split_whitespace();
    let Some(first) = tokens.next() else {
        return "?".to_string();
    };
    let mut out: String = first.chars().take(1).flat_map(char::to_uppercase).collect();
    if let Some(last) = tokens.last() {
        out.extend(last.chars().take(1).flat_map(char::to_uppercase));
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub nicknames: Option<Vec<String>>,
    pub birth_date: Option<Option<PartialDate>>,
    pub death_date: Option<Option<PartialDate>>,
    pub birth_place: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub maiden_name: Option<Option<String>>,
    pub occupation: Option<Option<String>>,
    pub education: Option<Option<String>>,
    pub hobbies: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub photo: Option<Option<String>>,
    pub gallery: Option<Vec<String>>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate_against(&self, person: &Person) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
        }
        let birth = match &self.birth_date {
            Some(value) => value.as_ref(),
            None => person.birth_date.as_ref(),
        };
        let death = match &self.death_date {
            Some(value) => value.as_ref(),
            None => person.death_date.as_ref(),
        };
        check_lifespan(birth, death)
    }

    pub fn apply_to(self, person: &mut Person) {
        if let Some(name) = self.name {
            person.name = name.trim().to_string();
        }
        if let Some(nicknames) = self.nicknames {
            person.nicknames = nicknames
                .into_iter()
                .map(|nick| nick.trim().to_string())
                .filter(|nick| !nick.is_empty())
                .collect();
        }
        if let Some(value) = self.birth_date {
            person.birth_date = value;
        }
        if let Some(value) = self.death_date {
            person.death_date = value;
        }
        merge_text(&mut person.birth_place, self.birth_place);
        merge_text(&mut person.location, self.location);
        merge_text(&mut person.maiden_name, self.maiden_name);
        merge_text(&mut person.occupation, self.occupation);
        merge_text(&mut person.education, self.education);
        merge_text(&mut person.hobbies, self.hobbies);
        merge_text(&mut person.notes, self.notes);
        merge_text(&mut person.photo, self.photo);
        if let Some(gallery) = self.gallery {
            person.gallery = gallery;
        }
    }
}

fn merge_text(slot: &mut Option<String>, update: Option<Option<String>>) {
    if let Some(value) = update {
        *slot = value
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_use_first_and_last_token() {
        assert_eq!(initials_for("Robert Johnson"), "RJ");
        assert_eq!(initials_for("mary ann  smith"), "MS");
        assert_eq!(initials_for("Cher"), "C");
        assert_eq!(initials_for("   "), "?");
    }

    #[test]
    fn deserializes_legacy_nulls_and_camel_case_keys() {
        let person: Person = serde_json::from_str(
            r#"{"id":"robert1","name":"Robert","parentIds":null,"spouseId":"eleanor1","birthOrder":2,"nicknames":null}"#,
        )
        .expect("person json");
        assert!(person.parent_ids.is_empty());
        assert!(person.nicknames.is_empty());
        assert_eq!(person.spouse_id.as_deref(), Some("eleanor1"));
        assert_eq!(person.birth_order, Some(2));
    }

    #[test]
    fn missing_birth_order_sorts_last() {
        let mut early = Person::new("a1", "A");
        early.birth_order = Some(5);
        let late = Person::new("b1", "B");
        assert!(early.birth_order_key() < late.birth_order_key());
    }

    #[test]
    fn patch_merges_and_clears_fields() {
        let mut person = Person::new("ann1", "Ann");
        person.occupation = Some("Baker".to_string());
        let patch = PersonPatch {
            name: Some("  Ann Lee ".to_string()),
            occupation: Some(None),
            hobbies: Some(Some("Chess".to_string())),
            nicknames: Some(vec!["Annie".to_string(), " ".to_string()]),
            ..PersonPatch::default()
        };
        patch.validate_against(&person).expect("valid patch");
        patch.apply_to(&mut person);

        assert_eq!(person.name, "Ann Lee");
        assert_eq!(person.occupation, None);
        assert_eq!(person.hobbies.as_deref(), Some("Chess"));
        assert_eq!(person.nicknames, vec!["Annie".to_string()]);
    }

    #[test]
    fn patch_validation_sees_existing_dates() {
        let mut person = Person::new("ann1", "Ann");
        person.birth_date = Some(PartialDate::year(1960));
        let patch = PersonPatch {
            death_date: Some(Some(PartialDate::year(1959))),
            ..PersonPatch::default()
        };
        assert!(matches!(
            patch.validate_against(&person),
            Err(ValidationError::DeathBeforeBirth { .. })
        ));

        let blank = PersonPatch {
            name: Some("  ".to_string()),
            ..PersonPatch::default()
        };
        assert_eq!(blank.validate_against(&person), Err(ValidationError::EmptyName));
    }
}
