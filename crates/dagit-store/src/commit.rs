use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use dagit_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Object, ObjectKind};

/// Author or committer identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
}

/// A parsed commit object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree of the snapshot.
    #[serde(rename = "tree")]
    pub tree_id: ObjectId,
    /// Parents in header order; the first is the mainline parent of a merge.
    #[serde(rename = "parents")]
    pub parent_ids: Vec<ObjectId>,
    pub author: Person,
    pub committer: Person,
    pub message: String,
    #[serde(rename = "commitTime")]
    pub commit_time: DateTime<FixedOffset>,
    #[serde(rename = "authorTime")]
    pub author_time: DateTime<FixedOffset>,
}

impl Commit {
    /// Returns `true` for a commit with no parents.
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Returns `true` for a commit with two or more parents.
    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }
}

/// One `author`/`committer` header line after its keyword.
struct Signature {
    person: Person,
    time: DateTime<FixedOffset>,
}

/// Parse a commit object.
///
/// The header block runs up to the first blank line: a `tree` line first,
/// then any number of `parent` lines, then `author` and `committer`. Other
/// headers (`gpgsig`, `encoding`, `mergetag`, continuation lines) are
/// ignored. The message is everything after the blank line with a single
/// trailing newline removed.
pub fn parse_commit(obj: &Object) -> StoreResult<Commit> {
    if obj.kind != ObjectKind::Commit {
        return Err(StoreError::KindMismatch {
            id: obj.id,
            expected: "commit",
            actual: obj.kind.to_string(),
        });
    }
    parse_commit_content(&obj.id, &obj.content)
}

/// Parse raw commit content. `id` only labels errors.
pub fn parse_commit_content(id: &ObjectId, content: &[u8]) -> StoreResult<Commit> {
    let malformed = |reason: String| StoreError::MalformedCommit { id: *id, reason };

    let text = String::from_utf8_lossy(content);
    let (headers, message) = match text.split_once("\n\n") {
        Some((headers, rest)) => (headers, rest.strip_suffix('\n').unwrap_or(rest)),
        None => (text.as_ref(), ""),
    };

    let mut lines = headers.lines();
    let tree_id = lines
        .next()
        .and_then(|line| line.strip_prefix("tree "))
        .ok_or_else(|| malformed("first line is not a tree header".into()))
        .and_then(|hex| {
            ObjectId::from_hex(hex.trim()).map_err(|e| malformed(format!("tree id: {e}")))
        })?;

    let mut parent_ids = Vec::new();
    let mut author = None;
    let mut committer = None;

    for line in lines {
        if let Some(hex) = line.strip_prefix("parent ") {
            let parent = ObjectId::from_hex(hex.trim())
                .map_err(|e| malformed(format!("parent id: {e}")))?;
            parent_ids.push(parent);
        } else if let Some(rest) = line.strip_prefix("author ") {
            author = Some(parse_signature(rest).map_err(|r| malformed(format!("author: {r}")))?);
        } else if let Some(rest) = line.strip_prefix("committer ") {
            committer =
                Some(parse_signature(rest).map_err(|r| malformed(format!("committer: {r}")))?);
        }
    }

    let author = author.ok_or_else(|| malformed("missing author header".into()))?;
    let committer = committer.ok_or_else(|| malformed("missing committer header".into()))?;

    Ok(Commit {
        tree_id,
        parent_ids,
        author: author.person,
        committer: committer.person,
        message: message.to_string(),
        commit_time: committer.time,
        author_time: author.time,
    })
}

/// Parse `Name <email> <unix-seconds> <+hhmm>`.
///
/// The name is everything before the first `<`; the timestamp is the first
/// token after the closing `>`. A missing or unreadable zone offset falls
/// back to UTC.
fn parse_signature(rest: &str) -> Result<Signature, String> {
    let open = rest.find('<').ok_or("no '<' before email")?;
    let close = rest[open..]
        .find('>')
        .map(|i| open + i)
        .ok_or("unterminated email")?;

    let person = Person {
        name: rest[..open].trim().to_string(),
        email: rest[open + 1..close].to_string(),
    };

    let mut tail = rest[close + 1..].split_whitespace();
    let secs: i64 = tail
        .next()
        .ok_or("missing timestamp")?
        .parse()
        .map_err(|_| "timestamp is not a number")?;
    let offset = tail.next().and_then(parse_tz).unwrap_or_else(|| Utc.fix());
    let time = DateTime::from_timestamp(secs, 0)
        .ok_or("timestamp out of range")?
        .with_timezone(&offset);

    Ok(Signature { person, time })
}

/// Parse a `+hhmm` / `-hhmm` zone offset.
fn parse_tz(tz: &str) -> Option<FixedOffset> {
    let (sign, digits) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

    fn commit_object(text: &str) -> Object {
        Object::new(
            ObjectKind::Commit,
            ObjectId::from_raw([5; 20]),
            "objects/05/05",
            text.as_bytes().to_vec(),
        )
    }

    fn commit_text(parents: &[String], message: &str) -> String {
        let mut s = format!("tree {TREE}\n");
        for p in parents {
            s.push_str(&format!("parent {p}\n"));
        }
        s.push_str("author Ada Lovelace <ada@example.com> 1700000000 +0200\n");
        s.push_str("committer Charles Babbage <cb@example.com> 1700000360 -0130\n");
        s.push('\n');
        s.push_str(message);
        s
    }

    #[test]
    fn parses_root_commit() {
        let commit = parse_commit(&commit_object(&commit_text(&[], "Initial commit\n"))).unwrap();
        assert_eq!(commit.tree_id.to_hex(), TREE);
        assert!(commit.is_root());
        assert_eq!(commit.author.name, "Ada Lovelace");
        assert_eq!(commit.author.email, "ada@example.com");
        assert_eq!(commit.committer.name, "Charles Babbage");
        assert_eq!(commit.message, "Initial commit");
        assert_eq!(commit.author_time.timestamp(), 1_700_000_000);
        assert_eq!(commit.commit_time.timestamp(), 1_700_000_360);
        assert_eq!(commit.author_time.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(commit.commit_time.offset().local_minus_utc(), -(3600 + 1800));
    }

    #[test]
    fn only_one_trailing_newline_is_stripped() {
        let text = commit_text(&[], "subject\n\nbody\n\n");
        let commit = parse_commit(&commit_object(&text)).unwrap();
        assert_eq!(commit.message, "subject\n\nbody\n");
    }

    #[test]
    fn merge_keeps_parent_order() {
        let parents = vec!["a".repeat(40), "b".repeat(40), "c".repeat(40)];
        let commit = parse_commit(&commit_object(&commit_text(&parents, "merge"))).unwrap();
        assert!(commit.is_merge());
        let got: Vec<String> = commit.parent_ids.iter().map(|p| p.to_hex()).collect();
        assert_eq!(got, parents);
    }

    #[test]
    fn extra_headers_are_ignored() {
        let text = format!(
            "tree {TREE}\nauthor A <a@x> 1 +0000\ncommitter C <c@x> 2 +0000\n\
             gpgsig -----BEGIN PGP SIGNATURE-----\n x\n -----END PGP SIGNATURE-----\n\nsigned\n"
        );
        let commit = parse_commit(&commit_object(&text)).unwrap();
        assert_eq!(commit.message, "signed");
    }

    #[test]
    fn missing_message_is_empty() {
        let text = format!("tree {TREE}\nauthor A <a@x> 1 +0000\ncommitter C <c@x> 2 +0000\n");
        assert_eq!(parse_commit(&commit_object(&text)).unwrap().message, "");
    }

    #[test]
    fn missing_tree_is_malformed() {
        let err = parse_commit(&commit_object("author A <a@x> 1 +0000\n\nmsg")).unwrap_err();
        assert!(matches!(err, StoreError::MalformedCommit { .. }));
    }

    #[test]
    fn bad_timestamp_is_malformed() {
        let text =
            format!("tree {TREE}\nauthor A <a@x> soon +0000\ncommitter C <c@x> 2 +0000\n\nm");
        let err = parse_commit(&commit_object(&text)).unwrap_err();
        assert!(err.to_string().contains("author"));
    }

    #[test]
    fn short_lines_do_not_panic() {
        let text = format!("tree {TREE}\nx\nab\nauthor A <a@x> 1 +0000\ncommitter C <c@x> 2\n\nm");
        let commit = parse_commit(&commit_object(&text)).unwrap();
        assert_eq!(commit.commit_time.offset().local_minus_utc(), 0);
    }

    #[test]
    fn serializes_with_wire_names() {
        let commit = parse_commit(&commit_object(&commit_text(&[], "m"))).unwrap();
        let json = serde_json::to_value(&commit).unwrap();
        assert_eq!(json["tree"], TREE);
        assert!(json["parents"].as_array().unwrap().is_empty());
        assert_eq!(json["commitTime"], "2023-11-14T20:49:20-01:30");
        assert_eq!(json["author"]["email"], "ada@example.com");
    }

    proptest! {
        #[test]
        fn parent_count_and_order_survive(
            ids in proptest::collection::vec(proptest::array::uniform20(any::<u8>()), 0..8)
        ) {
            let parents: Vec<String> =
                ids.iter().map(|b| ObjectId::from_raw(*b).to_hex()).collect();
            let commit = parse_commit(&commit_object(&commit_text(&parents, "m"))).unwrap();
            let got: Vec<String> = commit.parent_ids.iter().map(|p| p.to_hex()).collect();
            prop_assert_eq!(got, parents);
        }
    }
}
