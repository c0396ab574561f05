//! Parsers for the line-oriented output of the backend tools.
//!
//! The eos binary and the MGM's find interface emit one record per line,
//! with space-separated `key=value` tokens inside a record. The quirks live
//! here: the fixed `keylength.file=` header and byte-counted path of find
//! records, the xattrn/xattrv pairing, and recycle's space-containing
//! restore paths.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::ClientError;

/// Canonical metadata record for a namespace entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileInfo {
    pub is_dir: bool,
    pub inode: u64,
    pub file_id: u64,
    pub uid: u64,
    pub gid: u64,
    pub size: u64,
    /// Total bytes under a container. Unspecified for files.
    pub tree_size: u64,
    /// Number of entries under a container. Unspecified for files.
    pub tree_count: u64,
    pub mtime_sec: u64,
    pub mtime_nanos: u32,
    /// Namespace path, trailing slash stripped.
    pub path: String,
    pub etag: String,
    /// URL of the MGM this record came from.
    pub instance: String,
    /// Raw short-form system ACL, if any.
    pub sys_acl: String,
    /// Raw attribute map of the record.
    pub attrs: HashMap<String, String>,
}

/// A trashbin record. `restore_key` is what the backend keys on;
/// `restore_path` is informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletedEntry {
    pub restore_path: String,
    pub restore_key: String,
    pub size: u64,
    pub deletion_mtime_sec: u64,
    pub is_dir: bool,
}

/// Number of tokens before `restore-path=` in a recycle line, counting the
/// empty token produced by the double space after `recycle=ls`.
const RECYCLE_RESTORE_PATH_POS: usize = 9;

/// Byte length of the `keylength.file=` header opening every find record.
const FIND_HEADER_LEN: usize = 15;

fn invalid(line: &str, what: &str) -> ClientError {
    ClientError::InvalidResponse(format!("{what} in line '{line}'"))
}

fn parse_u64(kv: &HashMap<String, String>, key: &str, line: &str) -> Result<u64, ClientError> {
    let raw = kv
        .get(key)
        .ok_or_else(|| invalid(line, &format!("missing field '{key}'")))?;
    raw.parse::<u64>()
        .map_err(|_| invalid(line, &format!("unparseable field '{key}={raw}'")))
}

fn parse_u64_or_zero(
    kv: &HashMap<String, String>,
    key: &str,
    line: &str,
) -> Result<u64, ClientError> {
    match kv.get(key) {
        None => Ok(0),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| invalid(line, &format!("unparseable field '{key}={raw}'"))),
    }
}

/// Split space-separated `k=v` tokens into a map. Tokens without `=` are
/// dropped.
fn key_value_map<'a, I: IntoIterator<Item = &'a str>>(tokens: I) -> HashMap<String, String> {
    let mut kv = HashMap::new();
    for token in tokens {
        if let Some((k, v)) = token.split_once('=') {
            if !k.is_empty() {
                kv.insert(k.to_string(), v.to_string());
            }
        }
    }
    kv
}

/// Strip one trailing slash; containers are reported with it, the canonical
/// path is without.
pub(crate) fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Parse the output of a find run over `dir_path`, one record per line.
/// The entry for `dir_path` itself is filtered out.
pub fn parse_find_output(
    dir_path: &str,
    raw: &str,
    instance: &str,
) -> Result<Vec<FileInfo>, ClientError> {
    let clean = strip_trailing_slash(dir_path);
    let mut infos = Vec::new();
    for line in raw.lines() {
        if line.is_empty() {
            continue;
        }
        let fi = parse_find_record(line, instance)?;
        if fi.path == clean {
            continue;
        }
        infos.push(fi);
    }
    Ok(infos)
}

/// Parse one find record:
/// `keylength.file=<len> file=<path> key=value ... xattrn=<n> xattrv=<v> ...`
/// where `<len>` is the byte length of `<path>` (paths may contain spaces).
fn parse_find_record(line: &str, instance: &str) -> Result<FileInfo, ClientError> {
    let rest = line
        .get(FIND_HEADER_LEN..)
        .ok_or_else(|| invalid(line, "truncated record header"))?;
    let sep = rest
        .find(" file=/")
        .ok_or_else(|| invalid(line, "missing file= token"))?;
    let len: usize = rest[..sep]
        .parse()
        .map_err(|_| invalid(line, "unparseable path length"))?;

    // skip " file=" and take the byte-counted path
    let rest = &rest[sep + 6..];
    let name = rest
        .get(..len)
        .ok_or_else(|| invalid(line, "path shorter than its declared length"))?;
    let rest = rest
        .get(len + 1..)
        .ok_or_else(|| invalid(line, "record ends at path"))?;

    let mut kv = HashMap::new();
    kv.insert("file".to_string(), strip_trailing_slash(name).to_string());

    // Extended attributes arrive as an xattrn token followed by its xattrv;
    // fold the pair into one binding.
    let mut pending_xattr: Option<String> = None;
    for token in rest.split(' ') {
        let Some((k, v)) = token.split_once('=') else {
            continue;
        };
        match k {
            "xattrn" => pending_xattr = Some(v.to_string()),
            "xattrv" => {
                if let Some(name) = pending_xattr.take() {
                    kv.insert(name, v.to_string());
                }
            }
            _ => {
                kv.insert(k.to_string(), v.to_string());
            }
        }
    }

    file_info_from_map(kv, line, instance)
}

/// Build a `FileInfo` from a raw record map.
///
/// `files` and `container` counters only exist for containers, so the
/// presence of `files` decides `is_dir`.
fn file_info_from_map(
    kv: HashMap<String, String>,
    line: &str,
    instance: &str,
) -> Result<FileInfo, ClientError> {
    let inode = parse_u64(&kv, "ino", line)?;
    let file_id = parse_u64(&kv, "fid", line)?;
    let uid = parse_u64(&kv, "uid", line)?;
    let gid = parse_u64(&kv, "gid", line)?;

    let tree_size = parse_u64_or_zero(&kv, "treesize", line)?;
    let file_count = parse_u64_or_zero(&kv, "files", line)?;
    let dir_count = parse_u64_or_zero(&kv, "container", line)?;
    let size = parse_u64_or_zero(&kv, "size", line)?;

    let mtime_raw = kv
        .get("mtime")
        .ok_or_else(|| invalid(line, "missing field 'mtime'"))?;
    let (sec_raw, nanos_raw) = mtime_raw.split_once('.').unwrap_or((mtime_raw.as_str(), "0"));
    let mtime_sec = sec_raw
        .parse::<u64>()
        .map_err(|_| invalid(line, &format!("unparseable field 'mtime={mtime_raw}'")))?;
    let mtime_nanos = nanos_raw
        .parse::<u32>()
        .map_err(|_| invalid(line, &format!("unparseable field 'mtime={mtime_raw}'")))?;

    let is_dir = kv.contains_key("files");

    Ok(FileInfo {
        is_dir,
        inode,
        file_id,
        uid,
        gid,
        size,
        tree_size,
        tree_count: file_count + dir_count,
        mtime_sec,
        mtime_nanos,
        path: kv.get("file").cloned().unwrap_or_default(),
        etag: kv.get("etag").cloned().unwrap_or_default(),
        instance: instance.to_string(),
        sys_acl: kv.get("sys.acl").cloned().unwrap_or_default(),
        attrs: kv,
    })
}

/// Parse the output of `recycle ls -m`, one deleted entry per line.
pub fn parse_recycle_list(raw: &str) -> Result<Vec<DeletedEntry>, ClientError> {
    let mut entries = Vec::new();
    for line in raw.lines() {
        if line.is_empty() {
            continue;
        }
        entries.push(parse_recycle_entry(line)?);
    }
    Ok(entries)
}

/// Parse one recycle record, e.g.
/// `recycle=ls  recycle-bin=/eos/backup/proc/recycle/ uid=jdoe gid=it
///  size=381038 deletion-time=1510823151 type=file
///  keylength.restore-path=36 restore-path=/eos/user/j/jdoe/app.ico
///  restore-key=000000002544fdb3`
///
/// The restore path may contain spaces, so everything between token
/// position 9 and the trailing `restore-key=` token is rejoined before
/// key/value splitting.
fn parse_recycle_entry(line: &str) -> Result<DeletedEntry, ClientError> {
    let mut tokens: Vec<&str> = line.split(' ').collect();
    let restore_key_token = tokens
        .pop()
        .ok_or_else(|| invalid(line, "empty recycle record"))?;
    if tokens.len() < RECYCLE_RESTORE_PATH_POS {
        return Err(invalid(line, "short recycle record"));
    }
    let restore_path_token = tokens[RECYCLE_RESTORE_PATH_POS..].join(" ");
    tokens.truncate(RECYCLE_RESTORE_PATH_POS);

    let mut kv = key_value_map(tokens);
    for token in [restore_path_token.as_str(), restore_key_token] {
        if let Some((k, v)) = token.split_once('=') {
            kv.insert(k.to_string(), v.to_string());
        }
    }

    let size = parse_u64(&kv, "size", line)?;
    let deletion_raw = kv
        .get("deletion-time")
        .ok_or_else(|| invalid(line, "missing field 'deletion-time'"))?;
    let deletion_mtime_sec = deletion_raw
        .split('.')
        .next()
        .unwrap_or_default()
        .parse::<u64>()
        .map_err(|_| invalid(line, &format!("unparseable field 'deletion-time={deletion_raw}'")))?;
    let is_dir = kv.get("type").map(String::as_str) == Some("recursive-dir");

    Ok(DeletedEntry {
        restore_path: kv.get("restore-path").cloned().unwrap_or_default(),
        restore_key: kv.get("restore-key").cloned().unwrap_or_default(),
        size,
        deletion_mtime_sec,
        is_dir,
    })
}

/// Parse quota output, selecting the quota node whose `space=` is a prefix
/// of `path`. Returns `(max_logical_bytes, used_logical_bytes)`; fields the
/// backend omits come back as zero.
pub fn parse_quota(path: &str, raw: &str) -> Result<(u64, u64), ClientError> {
    for line in raw.lines() {
        if line.is_empty() {
            continue;
        }
        let kv = key_value_map(line.split(' '));
        let Some(space) = kv.get("space") else {
            continue;
        };
        if space.is_empty() || !path.starts_with(space.as_str()) {
            continue;
        }
        let max_bytes = kv
            .get("maxlogicalbytes")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let used_bytes = kv
            .get("usedlogicalbytes")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        return Ok((max_bytes, used_bytes));
    }
    Ok((0, 0))
}
