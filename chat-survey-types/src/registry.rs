use std::collections::HashSet;

use crate::{FieldSpec, MULTI_SELECT_DELIMITER, RegistryError, SurveyState};

/// The ordered list of fields that make up a survey.
///
/// A registry is validated once at construction: names and labels are unique,
/// names cannot be mistaken for state markers, and option texts survive being
/// joined into a multi-select answer. After that it is read-only.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldSpec>,
}

impl FieldRegistry {
    /// Create a registry from fields in the order they are asked.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, RegistryError> {
        if fields.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut names = HashSet::new();
        let mut labels = HashSet::new();
        for field in &fields {
            if SurveyState::is_reserved(field.name()) {
                return Err(RegistryError::ReservedName(field.name().to_string()));
            }
            if !names.insert(field.name()) {
                return Err(RegistryError::DuplicateName(field.name().to_string()));
            }
            if !labels.insert(field.label()) {
                return Err(RegistryError::DuplicateLabel(field.label().to_string()));
            }
            if field.is_multi_select() && !field.has_options() {
                return Err(RegistryError::MissingOptions(field.name().to_string()));
            }
            if let Some(option) = field
                .options()
                .iter()
                .find(|option| option.is_empty() || option.contains(MULTI_SELECT_DELIMITER))
            {
                return Err(RegistryError::InvalidOption {
                    field: field.name().to_string(),
                    option: option.clone(),
                });
            }
        }

        Ok(Self { fields })
    }

    /// The field every new user starts at.
    pub fn first(&self) -> &FieldSpec {
        &self.fields[0]
    }

    /// Look a field up by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Look a field up by its human-readable label.
    pub fn by_label(&self, label: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.label() == label)
    }

    /// The field declared right after `name`, or `None` if `name` is last
    /// (or unknown).
    pub fn next_after(&self, name: &str) -> Option<&FieldSpec> {
        let index = self.fields.iter().position(|field| field.name() == name)?;
        self.fields.get(index + 1)
    }

    /// Fields that may be revisited from the edit menu, in declared order.
    pub fn editable(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|field| field.is_editable())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false; an empty registry is rejected by [`FieldRegistry::new`].
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, label: &str) -> FieldSpec {
        FieldSpec::new(name, label, format!("{label}?"))
    }

    #[test]
    fn rejects_duplicate_names_and_labels() {
        let names = FieldRegistry::new(vec![field("a", "A"), field("a", "B")]);
        assert!(matches!(names, Err(RegistryError::DuplicateName(n)) if n == "a"));

        let labels = FieldRegistry::new(vec![field("a", "A"), field("b", "A")]);
        assert!(matches!(labels, Err(RegistryError::DuplicateLabel(l)) if l == "A"));
    }

    #[test]
    fn rejects_reserved_names() {
        for name in ["registered", "edit", "edit_phone"] {
            let result = FieldRegistry::new(vec![field(name, "X")]);
            assert!(matches!(result, Err(RegistryError::ReservedName(_))), "{name}");
        }
    }

    #[test]
    fn rejects_options_containing_the_delimiter() {
        let result = FieldRegistry::new(vec![
            FieldSpec::new("pets", "Pets", "Pets?")
                .with_options(["cats, dogs", "fish"])
                .multi_select(),
        ]);
        assert!(matches!(result, Err(RegistryError::InvalidOption { .. })));
    }

    #[test]
    fn rejects_multi_select_without_options() {
        let result = FieldRegistry::new(vec![FieldSpec::new("x", "X", "?").multi_select()]);
        assert!(matches!(result, Err(RegistryError::MissingOptions(_))));
    }

    #[test]
    fn lookup_and_ordering() {
        let registry = FieldRegistry::new(vec![
            field("name", "Name"),
            field("phone", "Phone").not_editable(),
            field("city", "City"),
        ])
        .unwrap();

        assert_eq!(registry.first().name(), "name");
        assert_eq!(registry.by_label("City").unwrap().name(), "city");
        assert_eq!(registry.next_after("name").unwrap().name(), "phone");
        assert!(registry.next_after("city").is_none());
        assert!(registry.next_after("unknown").is_none());

        let editable: Vec<_> = registry.editable().map(FieldSpec::name).collect();
        assert_eq!(editable, vec!["name", "city"]);
    }
}
