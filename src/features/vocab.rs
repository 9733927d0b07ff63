//! Categorical vocabularies.
//!
//! A vocabulary is an ordered list of labels; a label's index is its
//! encoded value. The built-in tables are in the order the training-time
//! label encoders sorted them (byte order, so upper-case labels first).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROTOCOL_TYPES: &[&str] = &["icmp", "tcp", "udp"];

pub const SERVICES: &[&str] = &[
    "IRC", "X11", "Z39_50", "aol", "auth", "bgp", "courier", "csnet_ns", "ctf", "daytime",
    "discard", "domain", "domain_u", "echo", "eco_i", "ecr_i", "efs", "exec", "finger", "ftp",
    "ftp_data", "gopher", "harvest", "hostnames", "http", "http_2784", "http_443", "http_8001",
    "imap4", "iso_tsap", "klogin", "kshell", "ldap", "link", "login", "mtp", "name",
    "netbios_dgm", "netbios_ns", "netbios_ssn", "netstat", "nnsp", "nntp", "ntp_u", "other",
    "pm_dump", "pop_2", "pop_3", "printer", "private", "red_i", "remote_job", "rje", "shell",
    "smtp", "sql_net", "ssh", "sunrpc", "supdup", "systat", "telnet", "tftp_u", "tim_i", "time",
    "urh_i", "urp_i", "uucp", "uucp_path", "vmnet", "whois",
];

pub const FLAGS: &[&str] = &[
    "OTH", "REJ", "RSTO", "RSTOS0", "RSTR", "S0", "S1", "S2", "S3", "SF", "SH",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    #[error("vocabulary {name} is empty")]
    Empty { name: String },
    #[error("vocabulary {name} contains {label:?} more than once (after case folding)")]
    Duplicate { name: String, label: String },
}

/// Normalization applied to both submitted values and vocabulary labels
/// before they are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseRule {
    Lower,
    Upper,
}

impl CaseRule {
    pub fn fold(self, value: &str) -> String {
        let value = value.trim();
        match self {
            CaseRule::Lower => value.to_lowercase(),
            CaseRule::Upper => value.to_uppercase(),
        }
    }
}

/// Ordered label set with a label -> index lookup.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    name: String,
    labels: Vec<String>,
    index: HashMap<String, usize>,
    rule: CaseRule,
}

impl Vocabulary {
    /// Build a vocabulary. Labels are folded with the same rule as inputs,
    /// so stored upper-case labels such as `IRC` and `X11` stay reachable
    /// from lower-cased input. Labels that collide after folding are
    /// rejected.
    pub fn new(name: &str, labels: Vec<String>, rule: CaseRule) -> Result<Self, VocabularyError> {
        if labels.is_empty() {
            return Err(VocabularyError::Empty { name: name.to_string() });
        }

        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index.insert(rule.fold(label), i).is_some() {
                return Err(VocabularyError::Duplicate {
                    name: name.to_string(),
                    label: label.clone(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            labels,
            index,
            rule,
        })
    }

    /// Index of `value` after folding, or `None` if it is not a known label.
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.index.get(&self.rule.fold(value)).copied()
    }

    /// Label at `index`.
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rule(&self) -> CaseRule {
        self.rule
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Vocabulary artifact as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyLists {
    pub protocol_type: Vec<String>,
    pub service: Vec<String>,
    pub flag: Vec<String>,
}

impl Default for VocabularyLists {
    fn default() -> Self {
        fn owned(labels: &[&str]) -> Vec<String> {
            labels.iter().map(|s| s.to_string()).collect()
        }
        Self {
            protocol_type: owned(PROTOCOL_TYPES),
            service: owned(SERVICES),
            flag: owned(FLAGS),
        }
    }
}

/// The three categorical vocabularies the encoder consults.
#[derive(Debug, Clone)]
pub struct Vocabularies {
    pub protocol_type: Vocabulary,
    pub service: Vocabulary,
    pub flag: Vocabulary,
}

impl Vocabularies {
    pub fn from_lists(lists: VocabularyLists) -> Result<Self, VocabularyError> {
        use super::schema::{FLAG, PROTOCOL_TYPE, SERVICE};

        Ok(Self {
            protocol_type: Vocabulary::new(PROTOCOL_TYPE, lists.protocol_type, CaseRule::Lower)?,
            service: Vocabulary::new(SERVICE, lists.service, CaseRule::Lower)?,
            flag: Vocabulary::new(FLAG, lists.flag, CaseRule::Upper)?,
        })
    }

    /// Built-in tables.
    pub fn builtin() -> Result<Self, VocabularyError> {
        Self::from_lists(VocabularyLists::default())
    }

    pub fn to_lists(&self) -> VocabularyLists {
        VocabularyLists {
            protocol_type: self.protocol_type.labels().to_vec(),
            service: self.service.labels().to_vec(),
            flag: self.flag.labels().to_vec(),
        }
    }
}
