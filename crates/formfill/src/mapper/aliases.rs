//! Canonical alias table for donor-data keys.
//!
//! Maps canonical keys (the names well-behaved extractors emit, e.g.
//! `firstName`) to lower-cased alias substrings commonly seen in form
//! field identifiers. The built-in table can be extended from config but
//! never replaced, so tier behavior stays predictable.

use std::collections::BTreeMap;

/// One built-in table entry: canonical key plus alias substrings.
struct AliasEntry {
    canonical: &'static str,
    aliases: &'static [&'static str],
}

const BUILTIN: &[AliasEntry] = &[
    AliasEntry {
        canonical: "address",
        aliases: &["street_address", "address_line", "street", "addr"],
    },
    AliasEntry {
        canonical: "city",
        aliases: &["city", "town"],
    },
    AliasEntry {
        canonical: "dateOfBirth",
        aliases: &["date_of_birth", "dob", "birth_date", "birthdate"],
    },
    AliasEntry {
        canonical: "driverLicense",
        aliases: &[
            "drivers_license",
            "driver_license",
            "license_number",
            "dl_number",
        ],
    },
    AliasEntry {
        canonical: "email",
        aliases: &["email_address", "e_mail", "email"],
    },
    AliasEntry {
        canonical: "firstName",
        aliases: &["first_name", "fname", "given_name", "givenname"],
    },
    AliasEntry {
        canonical: "fullName",
        aliases: &["full_name", "applicant_name", "client_name"],
    },
    AliasEntry {
        canonical: "gender",
        aliases: &["gender", "sex"],
    },
    AliasEntry {
        canonical: "lastName",
        aliases: &["last_name", "lname", "surname", "family_name"],
    },
    AliasEntry {
        canonical: "middleName",
        aliases: &["middle_name", "mname", "middle_initial"],
    },
    AliasEntry {
        canonical: "nationality",
        aliases: &["nationality", "citizenship"],
    },
    AliasEntry {
        canonical: "phone",
        aliases: &["phone_number", "telephone", "phone", "mobile", "cell"],
    },
    AliasEntry {
        canonical: "ssn",
        aliases: &["social_security_number", "social_security", "ssn"],
    },
    AliasEntry {
        canonical: "state",
        aliases: &["state", "province"],
    },
    AliasEntry {
        canonical: "zipCode",
        aliases: &["zip_code", "zip", "postal_code", "postcode"],
    },
];

/// Alias lookup table. Entries iterate in canonical-key order, which keeps
/// tier evaluation deterministic.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    /// The built-in table covering common personal-data keys.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for entry in BUILTIN {
            table.extend_entry(entry.canonical, entry.aliases.iter().map(|a| a.to_string()));
        }
        table
    }

    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds aliases for a canonical key, creating the entry if needed.
    /// Aliases are stored lower-cased.
    pub fn extend_entry(&mut self, canonical: &str, aliases: impl IntoIterator<Item = String>) {
        let entry = self.entries.entry(canonical.to_string()).or_default();
        for alias in aliases {
            let alias = alias.to_ascii_lowercase();
            if !entry.contains(&alias) {
                entry.push(alias);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical keys that `name` refers to, in table order. A name refers
    /// to a canonical key when, lower-cased, it contains the canonical key
    /// itself or one of its aliases.
    pub fn canonicals_for(&self, name: &str) -> Vec<&str> {
        let name_lower = name.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|(canonical, aliases)| {
                name_lower.contains(&canonical.to_ascii_lowercase())
                    || aliases.iter().any(|alias| name_lower.contains(alias))
            })
            .map(|(canonical, _)| canonical.as_str())
            .collect()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}
