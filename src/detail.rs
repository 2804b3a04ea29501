use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::model::PriceTier;

static LD_JSON_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid ld+json selector")
});

/// Block used when no structured-data block declares itself an event.
const FALLBACK_BLOCK: usize = 1;

/// Fields only the event's own page carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetail {
    pub location: String,
    pub prices: Vec<PriceTier>,
}

/// Parses an event page. The error is a human-readable reason; the caller
/// attaches the URL.
pub fn parse_event_detail(html: &str) -> Result<EventDetail, String> {
    let event = select_event_block(html)?;

    let location = event
        .pointer("/location/address/streetAddress")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let offers: &[Value] = match event.get("offers") {
        Some(Value::Array(list)) => list,
        Some(single) if single.is_object() => std::slice::from_ref(single),
        _ => &[],
    };

    Ok(EventDetail {
        location,
        prices: offers.iter().filter_map(price_tier).collect(),
    })
}

fn select_event_block(html: &str) -> Result<Value, String> {
    let doc = Html::parse_document(html);
    let blocks: Vec<String> = doc
        .select(&LD_JSON_SEL)
        .map(|s| s.text().collect::<String>())
        .collect();

    let parsed: Vec<Option<Value>> = blocks
        .iter()
        .map(|b| serde_json::from_str::<Value>(b).ok())
        .collect();

    if let Some(event) = parsed.iter().flatten().find_map(find_event_entity) {
        return Ok(event.clone());
    }

    match blocks.get(FALLBACK_BLOCK) {
        None => Err(format!(
            "expected an Event structured-data block, found {} block(s) and none typed Event",
            blocks.len()
        )),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| format!("structured-data block {FALLBACK_BLOCK} is not JSON: {e}")),
    }
}

/// The block itself, a member of a top-level array, or a member of `@graph`.
fn find_event_entity(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_event_entity),
        Value::Object(obj) => {
            if obj.get("@type").is_some_and(names_event_type) {
                Some(value)
            } else {
                obj.get("@graph").and_then(find_event_entity)
            }
        }
        _ => None,
    }
}

fn names_event_type(ty: &Value) -> bool {
    match ty {
        Value::String(s) => s.ends_with("Event"),
        Value::Array(types) => types.iter().any(names_event_type),
        _ => false,
    }
}

/// Offers whose name and price are both blank (missing, null, "", 0, false) are dropped.
fn price_tier(offer: &Value) -> Option<PriceTier> {
    let name = offer.get("name");
    let price = offer.get("price");
    if !name.is_some_and(is_present) && !price.is_some_and(is_present) {
        return None;
    }
    Some(PriceTier {
        name: name.map(json_text).unwrap_or_default(),
        price: price.map(json_text).unwrap_or_default(),
    })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Numbers keep their JSON spelling (`0`, `25.5`); null becomes empty.
pub(crate) fn json_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
