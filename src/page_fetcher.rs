use log::debug;

use crate::crawl_worker::PageSource;
use crate::error::TransportError;
use crate::person::{Person, SearchResponse};
use crate::session::{ApiClient, Session};

pub const PEOPLE_SEARCH_PATH: &str = "/voyager/api/search/hits";

const SUPPORTED_FACETS: &str =
    "List(GEO_REGION,SCHOOL,CURRENT_COMPANY,CURRENT_FUNCTION,FIELD_OF_STUDY,SKILL_EXPLICIT,NETWORK)";

pub fn people_query(company_id: &str, offset: usize, page_size: usize) -> String {
    format!(
        "count={}&educationEndYear=List()&educationStartYear=List()&facetCurrentCompany=List({})\
         &facetCurrentFunction=List()&facetFieldOfStudy=List()&facetGeoRegion=List()&facetNetwork=List()\
         &facetSchool=List()&facetSkillExplicit=List()&keywords=List()&maxFacetValues=15\
         &origin=organization&q=people&start={}&supportedFacets={}",
        page_size,
        urlencoding::encode(company_id),
        offset,
        SUPPORTED_FACETS
    )
}

/// One page of the people search. An empty result is returned as-is.
pub fn fetch_people<C: ApiClient + ?Sized>(
    client: &C,
    company_id: &str,
    offset: usize,
    page_size: usize,
) -> Result<Vec<Person>, TransportError> {
    let body = client.signed_get(PEOPLE_SEARCH_PATH, &people_query(company_id, offset, page_size))?;
    let response: SearchResponse = serde_json::from_slice(&body)?;

    debug!(
        "{} company {} start {}: {} included entities, upstream total {:?}",
        client.label(),
        company_id,
        offset,
        response.included.len(),
        response.data.metadata.total_result_count
    );

    Ok(response
        .included
        .into_iter()
        .map(|mut p| {
            p.company_id = company_id.to_string();
            p
        })
        .collect())
}

impl PageSource for Session {
    fn fetch_page(
        &self,
        company_id: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<Person>, TransportError> {
        fetch_people(self, company_id, offset, page_size)
    }

    fn label(&self) -> &str {
        self.username()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedClient {
        body: &'static str,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl ApiClient for CannedClient {
        fn signed_get(&self, path: &str, query: &str) -> Result<Vec<u8>, TransportError> {
            self.requests.lock().unwrap().push((path.to_string(), query.to_string()));
            Ok(self.body.as_bytes().to_vec())
        }

        fn label(&self) -> &str {
            "canned"
        }
    }

    fn canned(body: &'static str) -> CannedClient {
        CannedClient {
            body,
            requests: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_fetch_translates_included_people() {
        let client = canned(
            r#"{"data":{"metadata":{"totalResultCount":999},"paging":{"start":40,"count":20}},
                "included":[{"firstName":"Ada","lastName":"Lovelace","occupation":"Analyst"},
                            {"firstName":"Grace","lastName":"Hopper","publicIdentifier":"gh"}]}"#,
        );
        let people = fetch_people(&client, "1337", 40, 20).unwrap();

        assert_eq!(people.len(), 2);
        assert_eq!(people[0].occupation, "Analyst");
        assert_eq!(people[0].public_identifier, "");
        assert_eq!(people[1].public_identifier, "gh");
        assert!(people.iter().all(|p| p.company_id == "1337"));

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].0, PEOPLE_SEARCH_PATH);
        assert!(requests[0].1.contains("facetCurrentCompany=List(1337)"));
        assert!(requests[0].1.contains("&start=40&"));
        assert!(requests[0].1.starts_with("count=20&"));
    }

    #[test]
    fn test_empty_page_is_not_an_error() {
        let client = canned(r#"{"data":{},"included":[]}"#);
        assert!(fetch_people(&client, "1", 0, 20).unwrap().is_empty());
        let client = canned("{}");
        assert!(fetch_people(&client, "1", 0, 20).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let client = canned("<html>rate limited</html>");
        assert!(matches!(
            fetch_people(&client, "1", 0, 20),
            Err(TransportError::Decode(_))
        ));
    }
}
