use std::borrow::Cow;

use serde_json::Value;
use tracing::debug;

use crate::error::{kind_of, ValidationError};
use crate::record::DocumentLink;

/// Value used when none of a field's candidate paths is present.
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    Text(&'static str),
    EmptyList,
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            FieldDefault::Text(s) => Value::String(s.to_string()),
            FieldDefault::EmptyList => Value::Array(Vec::new()),
        }
    }
}

/// Ordered candidate key paths for one target field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub candidates: &'static [&'static [&'static str]],
    pub default: FieldDefault,
}

/// Where each record field may live in a raw engine result.
#[derive(Debug, Clone, Copy)]
pub struct FieldSet {
    pub title: FieldSpec,
    pub body: FieldSpec,
    pub author: FieldSpec,
    pub documents: FieldSpec,
}

/// Result wrapped under a `"content"` object.
pub static WRAPPED: FieldSet = FieldSet {
    title: FieldSpec {
        name: "title",
        candidates: &[&["content", "title"]],
        default: FieldDefault::Text(""),
    },
    body: FieldSpec {
        name: "body",
        candidates: &[
            &["content", "main_text_html"],
            &["content", "mainContent"],
            &["content", "content"],
        ],
        default: FieldDefault::Text(""),
    },
    author: FieldSpec {
        name: "author",
        candidates: &[
            &["content", "author"],
            &["content", "authorInfo"],
            &["content", "author_info"],
        ],
        default: FieldDefault::Text(""),
    },
    documents: FieldSpec {
        name: "documents",
        candidates: &[
            &["content", "documents"],
            &["content", "downloads"],
            &["content", "downloadLinks"],
            &["content", "download_links"],
        ],
        default: FieldDefault::EmptyList,
    },
};

/// Result with the fields at the top level.
pub static FLAT: FieldSet = FieldSet {
    title: FieldSpec {
        name: "title",
        candidates: &[&["title"]],
        default: FieldDefault::Text(""),
    },
    body: FieldSpec {
        name: "body",
        candidates: &[&["content"]],
        default: FieldDefault::Text(""),
    },
    author: FieldSpec {
        name: "author",
        candidates: &[&["author"]],
        default: FieldDefault::Text(""),
    },
    documents: FieldSpec {
        name: "documents",
        candidates: &[&["documents"], &["download_links"]],
        default: FieldDefault::EmptyList,
    },
};

const DOC_TITLE: FieldSpec = FieldSpec {
    name: "title",
    candidates: &[&["title"]],
    default: FieldDefault::Text(""),
};
const DOC_URL: FieldSpec = FieldSpec {
    name: "url",
    candidates: &[&["url"], &["link"]],
    default: FieldDefault::Text(""),
};
const DOC_FILE_TYPE: FieldSpec = FieldSpec {
    name: "file_type",
    candidates: &[&["file_type"], &["fileType"]],
    default: FieldDefault::Text("PDF"),
};

/// Pick the field layout: wrapped when `"content"` holds an object.
pub fn field_set(raw: &Value) -> &'static FieldSet {
    match raw.get("content") {
        Some(Value::Object(_)) => &WRAPPED,
        _ => &FLAT,
    }
}

/// Follow a key path through nested objects.
pub fn lookup<'a>(raw: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(raw, |node, key| node.as_object()?.get(*key))
}

/// First candidate path that is present wins, even when its value is falsy or
/// null. Falls back to the field's default.
pub fn resolve<'a>(raw: &'a Value, field: &FieldSpec) -> Cow<'a, Value> {
    match field.candidates.iter().find_map(|path| lookup(raw, path)) {
        Some(found) => Cow::Borrowed(found),
        None => {
            debug!(field = field.name, "no candidate key present, using default");
            Cow::Owned(field.default.to_value())
        }
    }
}

/// Body coercion: strings pass through, falsy values become empty, anything
/// else is stringified as JSON.
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null | Value::Bool(false) => String::new(),
        Value::Array(a) if a.is_empty() => String::new(),
        Value::Object(o) if o.is_empty() => String::new(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        other => other.to_string(),
    }
}

/// Reduce any author shape to a single string.
///
/// Accepts a bare string, or a list whose first entry is a string or an object
/// with a `name`. Other shapes fall back to the empty string.
pub fn normalize_author(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(entries) => match entries.first() {
            None => String::new(),
            Some(Value::Object(entry)) => match entry.get("name") {
                Some(Value::String(name)) => name.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        },
        other => {
            debug!(found = kind_of(other), "author has unexpected shape, using default");
            String::new()
        }
    }
}

/// Turn a resolved document list into links. Non-object entries are skipped.
pub fn resolve_documents(value: &Value) -> Result<Vec<DocumentLink>, ValidationError> {
    let Value::Array(entries) = value else {
        debug!(found = kind_of(value), "documents is not a list, using default");
        return Ok(Vec::new());
    };

    let mut documents = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            debug!(index, found = kind_of(entry), "skipping malformed document entry");
            continue;
        }
        let link = DocumentLink::from_values(
            &resolve(entry, &DOC_TITLE),
            &resolve(entry, &DOC_URL),
            &resolve(entry, &DOC_FILE_TYPE),
        )
        .map_err(|e| ValidationError::InvalidDocument {
            index,
            source: Box::new(e),
        })?;
        documents.push(link);
    }
    Ok(documents)
}

/// All fields of one page, resolved but not yet validated as a record.
#[derive(Debug)]
pub struct ResolvedPage<'a> {
    pub title: Cow<'a, Value>,
    pub body: String,
    pub author: String,
    pub documents: Vec<DocumentLink>,
}

pub fn resolve_page(raw: &Value) -> Result<ResolvedPage<'_>, ValidationError> {
    let fields = field_set(raw);
    Ok(ResolvedPage {
        title: resolve(raw, &fields.title),
        body: coerce_text(&resolve(raw, &fields.body)),
        author: normalize_author(&resolve(raw, &fields.author)),
        documents: resolve_documents(&resolve(raw, &fields.documents))?,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_nested_path() {
        let raw = json!({"content": {"title": "T"}});
        assert_eq!(lookup(&raw, &["content", "title"]), Some(&json!("T")));
        assert_eq!(lookup(&raw, &["content", "missing"]), None);
        assert_eq!(lookup(&raw, &["content", "title", "deeper"]), None);
    }

    #[test]
    fn first_alias_wins() {
        let raw = json!({"content": {
            "content": "third",
            "mainContent": "second",
            "main_text_html": "first",
        }});
        assert_eq!(resolve(&raw, &WRAPPED.body).as_ref(), &json!("first"));

        let raw = json!({"content": {"content": "third", "mainContent": "second"}});
        assert_eq!(resolve(&raw, &WRAPPED.body).as_ref(), &json!("second"));
    }

    #[test]
    fn present_falsy_value_beats_later_alias() {
        let raw = json!({"content": {"author": "", "authorInfo": "Bundestag"}});
        assert_eq!(resolve(&raw, &WRAPPED.author).as_ref(), &json!(""));

        let raw = json!({"content": {"documents": null, "downloads": [{"title": "x"}]}});
        assert_eq!(resolve(&raw, &WRAPPED.documents).as_ref(), &Value::Null);
    }

    #[test]
    fn missing_field_uses_default() {
        let raw = json!({"content": {}});
        assert_eq!(resolve(&raw, &WRAPPED.title).as_ref(), &json!(""));
        assert_eq!(resolve(&raw, &WRAPPED.documents).as_ref(), &json!([]));
        assert_eq!(resolve(&json!({}), &DOC_FILE_TYPE).as_ref(), &json!("PDF"));
    }

    #[test]
    fn layout_detection() {
        assert!(std::ptr::eq(field_set(&json!({"content": {}})), &WRAPPED));
        assert!(std::ptr::eq(field_set(&json!({"content": "text"})), &FLAT));
        assert!(std::ptr::eq(field_set(&json!({"title": "x"})), &FLAT));
    }

    #[test]
    fn author_shapes() {
        assert_eq!(normalize_author(&json!("Deutscher Bundestag")), "Deutscher Bundestag");
        assert_eq!(normalize_author(&json!(["Jane", "John"])), "Jane");
        assert_eq!(normalize_author(&json!([{"name": "Jane Doe"}, {"name": "x"}])), "Jane Doe");
        assert_eq!(normalize_author(&json!([{"role": "editor"}])), "");
        assert_eq!(normalize_author(&json!([])), "");
        assert_eq!(normalize_author(&json!({"name": "ignored"})), "");
        assert_eq!(normalize_author(&Value::Null), "");
    }

    #[test]
    fn body_coercion() {
        assert_eq!(coerce_text(&json!("plain")), "plain");
        assert_eq!(coerce_text(&Value::Null), "");
        assert_eq!(coerce_text(&json!([])), "");
        assert_eq!(coerce_text(&json!(0)), "");
        assert_eq!(coerce_text(&json!(12)), "12");
        assert_eq!(coerce_text(&json!({"p": "x"})), r#"{"p":"x"}"#);
    }

    #[test]
    fn documents_skip_non_objects_and_default_file_type() {
        let docs = resolve_documents(&json!([
            "https://example.org/loose.pdf",
            {"title": "Drucksache 20/1", "link": "https://example.org/a.pdf"},
            42,
            {"title": "Anlage", "url": "https://example.org/b.docx", "fileType": "DOCX"},
        ]))
        .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].url, "https://example.org/a.pdf");
        assert_eq!(docs[0].file_type, "PDF");
        assert_eq!(docs[1].file_type, "DOCX");
    }

    #[test]
    fn documents_not_a_list_is_empty() {
        assert!(resolve_documents(&json!("see below")).unwrap().is_empty());
        assert!(resolve_documents(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn document_with_non_string_url_fails() {
        let err = resolve_documents(&json!([{"title": "a"}, {"title": "b", "url": 7}])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDocument { index: 1, .. }));
    }

    #[test]
    fn flat_page() {
        let raw = json!({
            "title": "Flat",
            "content": "Body",
            "author": [{"name": "A"}],
            "download_links": [{"title": "d", "url": "u"}],
        });
        let page = resolve_page(&raw).unwrap();
        assert_eq!(page.title.as_ref(), &json!("Flat"));
        assert_eq!(page.body, "Body");
        assert_eq!(page.author, "A");
        assert_eq!(page.documents.len(), 1);
    }

    fn insert_at(root: &mut Value, path: &[&str], value: Value) {
        let (last, parents) = path.split_last().unwrap();
        let mut node = root;
        for key in parents {
            node = node
                .as_object_mut()
                .unwrap()
                .entry(*key)
                .or_insert_with(|| json!({}));
        }
        node.as_object_mut().unwrap().insert(last.to_string(), value);
    }

    /// Every alias table, with the layout it belongs to (`None` for document entries).
    fn alias_tables() -> Vec<(Option<&'static FieldSet>, FieldSpec)> {
        let mut tables = Vec::new();
        for set in [&WRAPPED, &FLAT] {
            for field in [set.title, set.body, set.author, set.documents] {
                tables.push((Some(set), field));
            }
        }
        for field in [DOC_TITLE, DOC_URL, DOC_FILE_TYPE] {
            tables.push((None, field));
        }
        tables
    }

    fn base(set: Option<&'static FieldSet>) -> Value {
        match set {
            Some(s) if std::ptr::eq(s, &WRAPPED) => json!({"content": {}}),
            _ => json!({}),
        }
    }

    #[test]
    fn every_alias_resolves_on_its_own() {
        for (set, field) in alias_tables() {
            for (i, path) in field.candidates.iter().enumerate() {
                let mut raw = base(set);
                let marker = json!(format!("{}-{}", field.name, i));
                insert_at(&mut raw, path, marker.clone());

                assert_eq!(resolve(&raw, &field).as_ref(), &marker, "{:?}", path);
                if let Some(set) = set {
                    assert!(std::ptr::eq(field_set(&raw), set), "layout for {:?}", path);
                }
            }
        }
    }

    #[test]
    fn earlier_alias_beats_the_next_one() {
        for (set, field) in alias_tables() {
            for pair in field.candidates.windows(2) {
                let mut raw = base(set);
                insert_at(&mut raw, pair[1], json!("later"));
                insert_at(&mut raw, pair[0], json!("earlier"));
                assert_eq!(
                    resolve(&raw, &field).as_ref(),
                    &json!("earlier"),
                    "{:?} vs {:?}",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let raw = json!({"content": {"title": "T", "downloads": [{"url": "u"}]}});
        let a = resolve_page(&raw).unwrap();
        let b = resolve_page(&raw).unwrap();
        assert_eq!(a.title, b.title);
        assert_eq!(a.documents, b.documents);
    }
}
