//! twinset.ru product pages
//!
//! The storefront renders from a JSON blob assigned to `window.vueProduct`.
//! Plain-HTML fallbacks cover pages where the blob is missing or malformed.

use super::text::{extract_js_value, normalize_space};
use super::{first_h1, ProductFields};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

const VUE_PRODUCT_MARKER: &str = "window.vueProduct =";

static SKU_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Код\s*товара\s*:\s*([A-Z0-9]+)").expect("hardcoded regex pattern is valid")
});

pub(crate) fn parse(html: &str) -> ProductFields {
    let mut fields = extract_js_value(html, VUE_PRODUCT_MARKER)
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .map(|payload| fields_from_payload(&payload))
        .unwrap_or_default();

    if fields.sku.is_none() {
        fields.sku = SKU_LABEL_REGEX
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| normalize_space(m.as_str()).to_uppercase());
    }

    if fields.title.is_none() {
        fields.title = first_h1(html);
    }

    fields
}

fn fields_from_payload(payload: &Value) -> ProductFields {
    let root = match payload {
        Value::Array(items) => match items.first() {
            Some(first @ Value::Object(_)) => first,
            _ => payload,
        },
        _ => payload,
    };
    if !root.is_object() {
        return ProductFields::default();
    }

    let colors: Vec<&Value> = root
        .get("colors")
        .and_then(Value::as_array)
        .map(|colors| colors.iter().filter(|c| c.is_object()).collect())
        .unwrap_or_default();

    let selected = root
        .get("selectedColorId")
        .filter(|id| !id.is_null())
        .and_then(|id| colors.iter().find(|c| c.get("id") == Some(id)))
        .or_else(|| colors.first())
        .copied();

    let title = selected
        .and_then(|c| c.get("title"))
        .and_then(non_empty_text)
        .or_else(|| root.get("name").and_then(non_empty_text));

    let sku = selected
        .and_then(|c| c.get("offers"))
        .and_then(Value::as_array)
        .and_then(|offers| {
            offers
                .iter()
                .filter_map(|offer| offer.get("vendor"))
                .filter_map(non_empty_text)
                .map(|vendor| vendor.to_uppercase())
                .next()
        });

    let crumbs: Vec<String> = root
        .get("breadcrumbs")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("title"))
                .filter_map(non_empty_text)
                .collect()
        })
        .unwrap_or_default();

    ProductFields {
        sku,
        title,
        category_path: (!crumbs.is_empty()).then(|| crumbs.join(" > ")),
    }
}

/// String or number rendered as normalized text; None when empty
fn non_empty_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => normalize_space(s),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
