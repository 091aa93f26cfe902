// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Message metadata
//
// The side-channel payload persisted next to the sanitized deliverable:
// the chosen response type, product links and clarification text. Product
// links come from PRODUCTS markers, whose payload is model-written JSON and
// is parsed defensively.

use serde::{Deserialize, Serialize};

use crate::sanitize::is_safe_uri;

/// Schemes a product link may use. Product links render as clickable cards,
/// so only web URLs are accepted.
const PRODUCT_URL_SCHEMES: &[&str] = &["http", "https"];

/// What the deliverable of a turn is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    EmailCopy,
    Clarification,
    Other,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::EmailCopy => "email_copy",
            ResponseType::Clarification => "clarification",
            ResponseType::Other => "other",
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product referenced by the generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLink {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Metadata stored alongside the sanitized content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_links: Option<Vec<ProductLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
}

/// Assemble the metadata payload.
///
/// Returns `None` when there is nothing worth persisting: an `other` turn
/// without product links.
pub fn build_metadata(
    response_type: ResponseType,
    product_links: &[ProductLink],
    clarification: Option<&str>,
) -> Option<MessageMetadata> {
    let product_links = (!product_links.is_empty()).then(|| product_links.to_vec());
    let clarification = match response_type {
        ResponseType::Clarification => clarification
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        _ => None,
    };

    if response_type == ResponseType::Other && product_links.is_none() {
        return None;
    }

    Some(MessageMetadata {
        response_type,
        product_links,
        clarification,
    })
}

// ---------------------------------------------------------------------------
// PRODUCTS payload parsing
// ---------------------------------------------------------------------------

/// Loose shape of one product entry as models tend to write it.
#[derive(Debug, Deserialize)]
struct RawProduct {
    #[serde(alias = "title")]
    name: Option<String>,
    #[serde(alias = "link", alias = "href")]
    url: Option<String>,
    description: Option<String>,
}

/// Parse a PRODUCTS marker payload into product links.
///
/// Accepts a JSON array of objects, a single object, or an object with a
/// `products` array. Entries without a name or a web URL are skipped. Any
/// payload that is not JSON yields an empty list.
pub fn parse_products(payload: &str) -> Vec<ProductLink> {
    let value: serde_json::Value = match serde_json::from_str(payload.trim()) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, bytes = payload.len(), "unparseable PRODUCTS payload");
            return Vec::new();
        }
    };

    let entries = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("products") {
            Some(serde_json::Value::Array(items)) => items,
            _ => vec![serde_json::Value::Object(map)],
        },
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawProduct>(entry).ok())
        .filter_map(|raw| {
            let name = raw.name?.trim().to_string();
            let url = raw.url?.trim().to_string();
            if name.is_empty() || !is_safe_uri(&url, PRODUCT_URL_SCHEMES) || !url.contains("://") {
                return None;
            }
            let description = raw
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty());
            Some(ProductLink {
                name,
                url,
                description,
            })
        })
        .collect()
}

/// Append `incoming` links to `links`, skipping URLs already present.
pub fn merge_product_links(links: &mut Vec<ProductLink>, incoming: Vec<ProductLink>) {
    for link in incoming {
        if !links.iter().any(|existing| existing.url == link.url) {
            links.push(link);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link(name: &str, url: &str) -> ProductLink {
        ProductLink {
            name: name.to_string(),
            url: url.to_string(),
            description: None,
        }
    }

    // ---------------------------------------------------------------
    // parse_products
    // ---------------------------------------------------------------

    #[test]
    fn parses_array_of_products() {
        let links = parse_products(
            r#"[{"name":"Linen Shirt","url":"https://shop.example/linen","description":"Breathable"},
                {"name":"Canvas Tote","url":"https://shop.example/tote"}]"#,
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].name, "Linen Shirt");
        assert_eq!(links[0].description.as_deref(), Some("Breathable"));
        assert_eq!(links[1], link("Canvas Tote", "https://shop.example/tote"));
    }

    #[test]
    fn parses_single_object_and_aliases() {
        let links = parse_products(r#"{"title":"Mug","link":"http://shop.example/mug"}"#);
        assert_eq!(links, vec![link("Mug", "http://shop.example/mug")]);
    }

    #[test]
    fn parses_wrapped_products_array() {
        let links = parse_products(r#"{"products":[{"name":"Cap","href":"https://s.example/cap"}]}"#);
        assert_eq!(links, vec![link("Cap", "https://s.example/cap")]);
    }

    #[test]
    fn unparseable_payload_yields_empty_list() {
        assert!(parse_products("Linen Shirt, Canvas Tote").is_empty());
        assert!(parse_products(r#"[{"name":"Cut off""#).is_empty());
        assert!(parse_products("").is_empty());
        assert!(parse_products("42").is_empty());
    }

    #[test]
    fn entries_without_name_or_web_url_are_skipped() {
        let links = parse_products(
            r#"[{"name":"","url":"https://a.example"},
                {"name":"No url"},
                {"name":"Script","url":"javascript:alert(1)"},
                {"name":"Relative","url":"/products/1"},
                {"name":"Ok","url":"https://ok.example"},
                "not an object"]"#,
        );
        assert_eq!(links, vec![link("Ok", "https://ok.example")]);
    }

    #[test]
    fn merge_skips_duplicate_urls() {
        let mut links = vec![link("A", "https://a.example")];
        merge_product_links(
            &mut links,
            vec![link("A again", "https://a.example"), link("B", "https://b.example")],
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].name, "A");
        assert_eq!(links[1].name, "B");
    }

    // ---------------------------------------------------------------
    // build_metadata
    // ---------------------------------------------------------------

    #[test]
    fn other_without_products_is_omitted() {
        assert!(build_metadata(ResponseType::Other, &[], None).is_none());
    }

    #[test]
    fn other_with_products_is_kept() {
        let meta = build_metadata(ResponseType::Other, &[link("A", "https://a.example")], None)
            .unwrap();
        assert_eq!(meta.response_type, ResponseType::Other);
        assert_eq!(meta.product_links.unwrap().len(), 1);
    }

    #[test]
    fn email_metadata_serializes_camel_case_and_skips_empty_fields() {
        let meta = build_metadata(ResponseType::EmailCopy, &[], Some("ignored")).unwrap();
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value, json!({"responseType": "email_copy"}));
    }

    #[test]
    fn clarification_text_is_carried() {
        let meta = build_metadata(
            ResponseType::Clarification,
            &[link("A", "https://a.example")],
            Some("  Which audience?  "),
        )
        .unwrap();
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            value,
            json!({
                "responseType": "clarification",
                "productLinks": [{"name": "A", "url": "https://a.example"}],
                "clarification": "Which audience?"
            })
        );
    }
}
