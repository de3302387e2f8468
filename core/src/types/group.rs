use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Payload for creating a top-level or child group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<HashMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, Vec<String>>>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CreateGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A group with its (possibly filtered) sub-group tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_groups: Option<Vec<Group>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub count: u64,
}

/// Search parameters for `GET /admin/realms/{realm}/groups`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGroups {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief_representation: Option<bool>,
    /// Pagination offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<u32>,
    /// Maximum result size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate_hierarchy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

impl QueryGroups {
    pub fn search(term: impl Into<String>, exact: bool) -> Self {
        Self {
            search: Some(term.into()),
            exact: Some(exact),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_groups_deserialize() {
        let body = r#"[{"id":"g2","name":"UnitTest02","path":"/UnitTest02",
            "subGroups":[{"id":"g3","name":"UnitTest03","path":"/UnitTest02/UnitTest03","subGroups":[]}]}]"#;
        let groups: Vec<Group> = serde_json::from_str(body).unwrap();
        let child = &groups[0].sub_groups.as_ref().unwrap()[0];
        assert_eq!(child.id, "g3");
        assert_eq!(child.path, "/UnitTest02/UnitTest03");
    }

    #[test]
    fn group_without_sub_groups_is_accepted() {
        let group: Group = serde_json::from_str(r#"{"id":"g1","name":"a","path":"/a"}"#).unwrap();
        assert!(group.sub_groups.is_none());
    }

    #[test]
    fn group_count_rejects_missing_count() {
        assert!(serde_json::from_str::<GroupCount>("{}").is_err());
    }
}
