//! Codec for the backend's short-form ACL text.
//!
//! An ACL is a comma-separated list of `type:qualifier:permissions` entries,
//! e.g. `u:1001:rwx,egroup:project-admins:rx`. The codec round-trips that
//! text and maintains the entries as an ordered list keyed by
//! (type, qualifier). Qualifier translation (uid vs username) is the
//! caller's business; here it is an opaque string.

use crate::error::ClientError;

/// ACL entry type for users. Citrine backends store the qualifier of these
/// entries as a numeric uid.
pub const TYPE_USER: &str = "u";
/// ACL entry type for unix groups.
pub const TYPE_GROUP: &str = "g";
/// ACL entry type for e-groups.
pub const TYPE_EGROUP: &str = "egroup";

/// A single ACL rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub entry_type: String,
    pub qualifier: String,
    pub permissions: String,
}

impl AclEntry {
    pub fn new(entry_type: &str, qualifier: &str, permissions: &str) -> Self {
        Self {
            entry_type: entry_type.to_string(),
            qualifier: qualifier.to_string(),
            permissions: permissions.to_string(),
        }
    }

    /// Parse a single `type:qualifier:permissions` token.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let parts: Vec<&str> = raw.split(':').collect();
        let [t, q, p] = parts.as_slice() else {
            return Err(ClientError::InvalidInput(format!(
                "malformed acl entry '{raw}'"
            )));
        };
        if t.is_empty() || q.is_empty() {
            return Err(ClientError::InvalidInput(format!(
                "malformed acl entry '{raw}'"
            )));
        }
        Ok(Self::new(t, q, p))
    }

    pub fn serialize(&self) -> String {
        format!("{}:{}:{}", self.entry_type, self.qualifier, self.permissions)
    }

    fn matches(&self, entry_type: &str, qualifier: &str) -> bool {
        self.entry_type == entry_type && self.qualifier == qualifier
    }
}

/// An ordered ACL list with keyed lookup on (type, qualifier).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acls {
    entries: Vec<AclEntry>,
}

impl Acls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse short-form ACL text. Empty input yields an empty list.
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        let mut entries = Vec::new();
        for token in text.split(',') {
            if token.is_empty() {
                continue;
            }
            entries.push(AclEntry::parse(token)?);
        }
        Ok(Self { entries })
    }

    /// Serialize back to short form, preserving insertion order.
    pub fn serialize(&self) -> String {
        self.entries
            .iter()
            .map(AclEntry::serialize)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Overwrite the permissions of the first entry matching
    /// (type, qualifier), or append a new entry.
    pub fn set(
        &mut self,
        entry_type: &str,
        qualifier: &str,
        permissions: &str,
    ) -> Result<(), ClientError> {
        if entry_type.is_empty() || qualifier.is_empty() {
            return Err(ClientError::InvalidInput(format!(
                "invalid acl target '{entry_type}:{qualifier}'"
            )));
        }
        match self
            .entries
            .iter_mut()
            .find(|e| e.matches(entry_type, qualifier))
        {
            Some(entry) => entry.permissions = permissions.to_string(),
            None => self
                .entries
                .push(AclEntry::new(entry_type, qualifier, permissions)),
        }
        Ok(())
    }

    /// Remove the first entry matching (type, qualifier). No-op if absent.
    pub fn delete(&mut self, entry_type: &str, qualifier: &str) {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.matches(entry_type, qualifier))
        {
            self.entries.remove(pos);
        }
    }

    /// First entry matching (type, qualifier).
    pub fn get(&self, entry_type: &str, qualifier: &str) -> Result<&AclEntry, ClientError> {
        self.entries
            .iter()
            .find(|e| e.matches(entry_type, qualifier))
            .ok_or_else(|| ClientError::NotFound(format!("{entry_type}:{qualifier}")))
    }

    pub fn entries(&self) -> &[AclEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<AclEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_text() {
        let acls = Acls::parse("").unwrap();
        assert!(acls.entries().is_empty());
    }

    #[test]
    fn test_parse_and_serialize() {
        let text = "u:1001:rwx,g:1002:rx,egroup:project-admins:rx";
        let acls = Acls::parse(text).unwrap();
        assert_eq!(acls.entries().len(), 3);
        assert_eq!(acls.serialize(), text);
    }

    #[test]
    fn test_parse_rejects_malformed_entry() {
        let err = Acls::parse("u:1001").unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
        let err = Acls::parse(":1001:rwx").unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut acls = Acls::parse("u:1001:rw,g:1002:rx").unwrap();
        acls.set(TYPE_USER, "1001", "rwx").unwrap();
        assert_eq!(acls.serialize(), "u:1001:rwx,g:1002:rx");
    }

    #[test]
    fn test_set_appends_new_entry() {
        let mut acls = Acls::parse("u:1001:rw").unwrap();
        acls.set(TYPE_GROUP, "1002", "rx").unwrap();
        assert_eq!(acls.serialize(), "u:1001:rw,g:1002:rx");
    }

    #[test]
    fn test_delete_first_match_only() {
        let mut acls = Acls::parse("u:1001:rw,u:1001:r,g:1002:rx").unwrap();
        acls.delete(TYPE_USER, "1001");
        assert_eq!(acls.serialize(), "u:1001:r,g:1002:rx");
        // deleting an absent entry is a no-op
        acls.delete(TYPE_USER, "9999");
        assert_eq!(acls.serialize(), "u:1001:r,g:1002:rx");
    }

    #[test]
    fn test_get() {
        let acls = Acls::parse("u:1001:rw,g:1002:rx").unwrap();
        let entry = acls.get(TYPE_GROUP, "1002").unwrap();
        assert_eq!(entry.permissions, "rx");
        assert!(matches!(
            acls.get(TYPE_USER, "42"),
            Err(ClientError::NotFound(_))
        ));
    }

    #[test]
    fn test_round_trip_after_mutations() {
        let mut acls = Acls::new();
        acls.set(TYPE_USER, "1001", "rw").unwrap();
        acls.set(TYPE_EGROUP, "it-dep", "rx").unwrap();
        acls.set(TYPE_USER, "1001", "rwx").unwrap();
        acls.delete(TYPE_EGROUP, "absent");
        let reparsed = Acls::parse(&acls.serialize()).unwrap();
        assert_eq!(reparsed, acls);
    }
}
