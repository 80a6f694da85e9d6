//! Cache key derivation
//!
//! Keys look like `<path>@<sha256 hex>`, where the digest covers the request's
//! query parameters and body. The digest walks the JSON structure with object
//! members sorted by name, so member order never changes the key.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Derives the cache key for a request shape.
pub fn compute_key(path: &str, query: &Value, body: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"object:2{");
    feed_str(&mut hasher, "body");
    feed_value(&mut hasher, body);
    feed_str(&mut hasher, "query");
    feed_value(&mut hasher, query);
    hasher.update(b"}");

    format!("{}@{}", path, hex::encode(hasher.finalize()))
}

fn feed_str(hasher: &mut Sha256, s: &str) {
    hasher.update(format!("string:{}:", s.len()).as_bytes());
    hasher.update(s.as_bytes());
}

fn feed_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => hasher.update(b"null"),
        Value::Bool(b) => hasher.update(if *b { b"bool:1" } else { b"bool:0" }),
        Value::Number(n) => hasher.update(format!("number:{};", n).as_bytes()),
        Value::String(s) => feed_str(hasher, s),
        Value::Array(items) => {
            hasher.update(format!("array:{}[", items.len()).as_bytes());
            for item in items {
                feed_value(hasher, item);
            }
            hasher.update(b"]");
        }
        Value::Object(members) => {
            let mut names: Vec<&String> = members.keys().collect();
            names.sort();

            hasher.update(format!("object:{}{{", names.len()).as_bytes());
            for name in names {
                feed_str(hasher, name);
                feed_value(hasher, &members[name]);
            }
            hasher.update(b"}");
        }
    }
}
