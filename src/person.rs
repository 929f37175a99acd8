use serde::{Deserialize, Deserializer, Serialize};

/// A person record as scraped, loaded from input, or rendered.
///
/// Every field defaults to an empty string when absent from the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Person {
    #[serde(deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub public_identifier: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub occupation: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub company_id: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Person {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Person {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Person::default()
        }
    }

    /// Deduplication key.
    pub fn identity(&self) -> (String, String) {
        (self.first_name.clone(), self.last_name.clone())
    }

    pub fn has_first_name(&self) -> bool {
        !self.first_name.is_empty()
    }
}

/// People-search response body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub data: SearchData,
    pub included: Vec<Person>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchData {
    pub metadata: SearchMetadata,
    pub paging: Paging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchMetadata {
    // Decoded for logging only; termination never relies on it.
    pub total_result_count: Option<u64>,
    pub origin: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Paging {
    pub count: u64,
    pub start: u64,
    pub total: u64,
}

/// Company lookup response body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyLookupResponse {
    pub data: CompanyLookupData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyLookupData {
    pub elements: Vec<CompanyElementGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyElementGroup {
    pub elements: Vec<CompanyElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyElement {
    pub target_urn: String,
    pub title: CompanyTitle,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyTitle {
    pub text: String,
}

impl CompanyElement {
    /// The id is the last segment of a URN such as `urn:li:company:1337`.
    pub fn company_id(&self) -> &str {
        self.target_urn.rsplit(':').next().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_decodes_with_missing_fields() {
        let p: Person = serde_json::from_str(r#"{"firstName":"Ada"}"#).unwrap();
        assert_eq!(p.first_name, "Ada");
        assert_eq!(p.last_name, "");
        assert_eq!(p.occupation, "");
        assert_eq!(p.public_identifier, "");
    }

    #[test]
    fn test_person_decodes_null_as_empty() {
        let p: Person = serde_json::from_str(r#"{"firstName":"Ada","occupation":null}"#).unwrap();
        assert_eq!(p.occupation, "");
    }

    #[test]
    fn test_search_response_ignores_unknown_entities() {
        let body = r#"{
            "data": {"metadata": {"totalResultCount": 42}, "paging": {"start": 0, "count": 20}},
            "included": [
                {"$type": "com.example.Image", "rootUrl": "https://x"},
                {"firstName": "Grace", "lastName": "Hopper", "occupation": "Admiral", "publicIdentifier": "ghopper"}
            ]
        }"#;
        let resp: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.data.metadata.total_result_count, Some(42));
        assert_eq!(resp.included.len(), 2);
        assert!(!resp.included[0].has_first_name());
        assert_eq!(resp.included[1].public_identifier, "ghopper");
    }

    #[test]
    fn test_company_id_from_urn() {
        let e = CompanyElement {
            target_urn: "urn:li:company:1337".into(),
            title: CompanyTitle { text: "Acme".into() },
        };
        assert_eq!(e.company_id(), "1337");
    }

    #[test]
    fn test_json_field_names() {
        let mut p = Person::new("ada", "lovelace");
        p.company_id = "9".into();
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["firstName"], "ada");
        assert_eq!(v["companyId"], "9");
        assert_eq!(v["publicIdentifier"], "");
    }
}
