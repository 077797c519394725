// src/authority/xml.rs
//! Decoding of KeyAPI XML responses
//!
//! Every response is a `<result>` document with a `<status>` child. Only the
//! fields the rekey jobs consume are decoded; unknown elements are ignored.

use roxmltree::{Document, Node};

use crate::consts::KEYAPI_SUCCESS;
use crate::enums::KeyKind;
use crate::error::{RekeyError, Result};
use crate::model::{BatchOutcome, KeyStatus, KeyStatusSet, KeyVersion};

/// Decode the `status` response: per-version KEK and HMAC key states
pub fn parse_status(body: &str) -> Result<KeyStatusSet> {
    let doc = Document::parse(body)?;
    let root = checked_root(&doc)?;

    let mut set = KeyStatusSet::new();
    set.keyapi_state = child_text(root, "keyapi_state").map(str::to_owned);
    set.active_kek_version = child_number(root, "kek_version")?;
    set.active_hmac_version = child_number(root, "hmac_version")?;
    set.target_kek_version = child_number(root, "target_kek_version")?;

    if let Some(master_keys) = child(root, "master_keys") {
        for kek in master_keys.children().filter(|n| n.has_tag_name("kek")) {
            let version = version_attr(kek)?;
            let status = KeyStatus {
                valid: bool_attr(kek, "valid", false),
                checked: bool_attr(kek, "checked", false),
                count: count_attr(kek)?,
            };
            set.insert(KeyKind::Kek, version, status);
        }
    }

    // HMAC keys carry no validity flags; a listed key is usable.
    if let Some(hmac_keys) = child(root, "hmac_keys") {
        for hmac in hmac_keys.children().filter(|n| n.has_tag_name("hmac")) {
            let version = version_attr(hmac)?;
            let status = KeyStatus {
                valid: bool_attr(hmac, "valid", true),
                checked: false,
                count: count_attr(hmac)?,
            };
            set.insert(KeyKind::Hmac, version, status);
        }
    }

    Ok(set)
}

/// Decode a `reencrypt_deks` / `rehash_tokens` response
pub fn parse_batch_outcome(body: &str) -> Result<BatchOutcome> {
    let doc = Document::parse(body)?;
    let root = checked_root(&doc)?;

    Ok(BatchOutcome {
        converted: child_number(root, "converted")?.unwrap_or(0),
        failed: child_number(root, "failed")?.unwrap_or(0),
    })
}

fn checked_root<'a, 'i>(doc: &'a Document<'i>) -> Result<Node<'a, 'i>> {
    let root = doc.root_element();
    if !root.has_tag_name("result") {
        return Err(RekeyError::protocol(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }
    match child_text(root, "status") {
        Some(KEYAPI_SUCCESS) => Ok(root),
        Some(other) => Err(RekeyError::protocol(format!("KeyAPI status: {other}"))),
        None => Err(RekeyError::protocol("response has no <status>")),
    }
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn child_number<T: std::str::FromStr>(node: Node<'_, '_>, name: &str) -> Result<Option<T>> {
    child_text(node, name)
        .map(|text| {
            text.parse()
                .map_err(|_| RekeyError::protocol(format!("<{name}> is not a number: {text:?}")))
        })
        .transpose()
}

fn version_attr(node: Node<'_, '_>) -> Result<KeyVersion> {
    let raw = node.attribute("version").ok_or_else(|| {
        RekeyError::protocol(format!("<{}> without version", node.tag_name().name()))
    })?;
    raw.trim()
        .parse()
        .map_err(|_| RekeyError::protocol(format!("bad key version: {raw:?}")))
}

fn count_attr(node: Node<'_, '_>) -> Result<Option<u64>> {
    node.attribute("count")
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| RekeyError::protocol(format!("bad key count: {raw:?}")))
        })
        .transpose()
}

fn bool_attr(node: Node<'_, '_>, name: &str, default: bool) -> bool {
    match node.attribute(name) {
        Some(value) => value.trim() == "true",
        None => default,
    }
}
