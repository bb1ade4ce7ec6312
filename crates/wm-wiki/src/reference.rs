//! Local uids of wiki entities and the row identifiers hashed from them.
//!
//! A local uid concatenates each reference part prefixed by its length in
//! characters (`4:Main7:WebHome`), so no separator ever needs escaping. Row
//! identifiers are the [`stable_hash`] of that uid.

use wm_core::stable_hash;

/// Split a document full name into space and page at the last unescaped dot.
///
/// `A.B.WebHome` yields `("A.B", "WebHome")`; a name without a dot has an
/// empty space.
pub fn split_fullname(fullname: &str) -> (&str, &str) {
    let bytes = fullname.as_bytes();
    for i in (0..bytes.len()).rev() {
        if bytes[i] == b'.' && (i == 0 || bytes[i - 1] != b'\\') {
            return (&fullname[..i], &fullname[i + 1..]);
        }
    }
    ("", fullname)
}

/// Length-prefixed concatenation of `parts`
pub fn local_uid(parts: &[&str]) -> String {
    let mut uid = String::new();
    for part in parts {
        uid.push_str(&part.chars().count().to_string());
        uid.push(':');
        uid.push_str(part);
    }
    uid
}

fn document_uid(fullname: &str) -> String {
    let (space, page) = split_fullname(fullname);
    local_uid(&[space, page])
}

/// Row id of a document translation; an empty `language` is the default one.
pub fn document_id(fullname: &str, language: &str) -> i64 {
    let mut uid = document_uid(fullname);
    if !language.is_empty() {
        uid.push_str(&local_uid(&[language]));
    }
    stable_hash(&uid)
}

/// Row id of the `number`th object of class `class_name` on a document.
pub fn object_id(document: &str, class_name: &str, number: i64) -> i64 {
    let mut uid = document_uid(document);
    uid.push_str(&document_uid(class_name));
    uid.push_str(&local_uid(&[&number.to_string()]));
    stable_hash(&uid)
}

#[cfg(test)]
#[path = "reference_test.rs"]
mod tests;
