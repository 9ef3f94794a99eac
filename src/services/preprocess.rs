use crate::domain::models::{PreprocessReport, ScanStats};
use crate::keyring::{KeyId, KeyringError};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

// Matches the historical defaults: expired and revoked material never makes
// it into the signature graph.
const EXCLUDE_EXPIRED_KEYS: bool = true;
const EXCLUDE_REVOKED_KEYS: bool = true;
const EXCLUDE_EXPIRED_SIGS: bool = true;
const EXCLUDE_REVOKED_SIGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Self-signed, not revoked or expired.
    Valid,
    /// Valid and connected to the signature graph (set in the second pass).
    ValidConnected,
    /// No self-signature.
    Invalid,
    Expired,
    Revoked,
    RevokedByOwner,
    RevokedByDesignated,
    Unknown,
}

impl KeyStatus {
    fn as_str(self) -> &'static str {
        match self {
            KeyStatus::Valid => "V",
            KeyStatus::ValidConnected => "VC",
            KeyStatus::Invalid => "I",
            KeyStatus::Expired => "E",
            KeyStatus::Revoked => "R",
            KeyStatus::RevokedByOwner => "Ro",
            KeyStatus::RevokedByDesignated => "Rd",
            KeyStatus::Unknown => "?",
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct SigRecord {
    issuer: KeyId,
    date: String,
    expired: bool,
    revoked: bool,
}

#[derive(Debug, Default)]
struct UidRecord {
    name: String,
    revoked: bool,
    selfsig: Option<String>,
    /// Most recent signature per issuer.
    sigs: HashMap<KeyId, SigRecord>,
    /// Most recent certification revocation per issuer.
    revocations: HashMap<KeyId, String>,
}

impl UidRecord {
    fn add_signature(&mut self, key_id: KeyId, sig: SigRecord) {
        if EXCLUDE_REVOKED_SIGS && sig.revoked {
            return;
        }
        if EXCLUDE_EXPIRED_SIGS && sig.expired {
            return;
        }
        if sig.issuer == key_id {
            if self.selfsig.as_deref() < Some(sig.date.as_str()) {
                self.selfsig = Some(sig.date);
            }
        } else {
            let newer = self
                .sigs
                .get(&sig.issuer)
                .map_or(true, |existing| existing.date < sig.date);
            if newer {
                self.sigs.insert(sig.issuer, sig);
            }
        }
    }

    /// Applies stored revocations: a certification revocation newer than the
    /// same issuer's signature voids that signature.
    fn commit(&mut self) {
        for (issuer, rev_date) in &self.revocations {
            if let Some(sig) = self.sigs.get_mut(issuer) {
                if sig.date < *rev_date {
                    sig.revoked = true;
                }
            }
        }
    }
}

#[derive(Debug)]
struct KeyRecord {
    id: KeyId,
    keylen: u32,
    pkalgo: u32,
    created: String,
    expire: String,
    version: u32,
    status: KeyStatus,
    valid_uids: u32,
    uids: Vec<UidRecord>,
    /// Committed non-self signatures, most recent per issuer.
    sigs: HashMap<KeyId, SigRecord>,
    selfsig: Option<String>,
}

impl KeyRecord {
    fn new(
        id: KeyId,
        flags: &str,
        keylen: u32,
        pkalgo: u32,
        created: String,
        expire: String,
        version: u32,
    ) -> Self {
        let mut status = KeyStatus::Unknown;
        if EXCLUDE_EXPIRED_KEYS && flags.contains('e') {
            status = KeyStatus::Expired;
        }
        if EXCLUDE_REVOKED_KEYS && flags.contains('r') {
            status = KeyStatus::Revoked;
        }
        KeyRecord {
            id,
            keylen,
            pkalgo,
            created,
            expire,
            version,
            status,
            valid_uids: 0,
            uids: Vec::new(),
            sigs: HashMap::new(),
            selfsig: None,
        }
    }

    fn add_key_signature(&mut self, sig: SigRecord) {
        if EXCLUDE_REVOKED_SIGS && sig.revoked {
            return;
        }
        if EXCLUDE_EXPIRED_SIGS && sig.expired {
            return;
        }
        if sig.issuer == self.id {
            if self.selfsig.as_deref() < Some(sig.date.as_str()) {
                self.selfsig = Some(sig.date);
            }
        } else {
            let newer = self
                .sigs
                .get(&sig.issuer)
                .map_or(true, |existing| existing.date < sig.date);
            if newer {
                self.sigs.insert(sig.issuer, sig);
            }
        }
    }

    /// Rolls user IDs up into the key: only self-signed, unrevoked UIDs
    /// contribute their signatures, and a key with no such UID is invalid.
    fn commit(&mut self) {
        self.valid_uids = 0;
        let uids = std::mem::take(&mut self.uids);
        for mut uid in uids {
            uid.commit();
            if !uid.revoked && uid.selfsig.is_some() {
                self.valid_uids += 1;
                if let Some(date) = uid.selfsig.clone() {
                    let id = self.id;
                    self.add_key_signature(SigRecord {
                        issuer: id,
                        date,
                        expired: false,
                        revoked: false,
                    });
                }
                for (_, sig) in uid.sigs.clone() {
                    self.add_key_signature(sig);
                }
            }
            self.uids.push(uid);
        }
        if self.status == KeyStatus::Unknown {
            self.status = if self.selfsig.is_some() {
                KeyStatus::Valid
            } else {
                KeyStatus::Invalid
            };
        }
    }

    /// Primary UID for the report's name column: the first usable UID.
    fn primary_uid(&self) -> Option<&str> {
        self.uids
            .iter()
            .find(|u| !u.revoked && u.selfsig.is_some())
            .or_else(|| self.uids.first())
            .map(|u| u.name.as_str())
    }
}

fn field<'a>(fields: &[&'a str], idx: usize, lineno: usize) -> Result<&'a str, KeyringError> {
    fields
        .get(idx)
        .copied()
        .ok_or_else(|| KeyringError::MalformedRecord {
            line: lineno,
            reason: format!("missing field {}", idx),
        })
}

fn numeric_field(fields: &[&str], idx: usize, lineno: usize) -> Result<u32, KeyringError> {
    let raw = field(fields, idx, lineno)?;
    raw.parse().map_err(|_| KeyringError::MalformedRecord {
        line: lineno,
        reason: format!("bad numeric field {:?}", raw),
    })
}

struct DumpScan {
    keys: Vec<KeyRecord>,
    total_keys: u64,
}

/// Parses the pgpring colon-delimited dump: `pub`, `uid`, `sig` and `rev`
/// records. Every key is committed when the next `pub` record (or EOF)
/// arrives.
fn scan_dump(reader: impl BufRead) -> anyhow::Result<DumpScan> {
    let mut keys: Vec<KeyRecord> = Vec::new();
    let mut total_keys = 0u64;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = lineno + 1;
        let fields: Vec<&str> = line.trim_end().split(':').collect();
        match fields[0] {
            "pub" => {
                if let Some(key) = keys.last_mut() {
                    key.commit();
                }
                let flags = field(&fields, 1, lineno)?;
                let keylen = numeric_field(&fields, 2, lineno)?;
                let pkalgo = numeric_field(&fields, 3, lineno)?;
                let id: KeyId = field(&fields, 4, lineno)?.parse()?;
                let created = field(&fields, 5, lineno)?.to_string();
                let expire = field(&fields, 6, lineno)?.to_string();
                let version = numeric_field(&fields, 7, lineno)?;
                keys.push(KeyRecord::new(
                    id, flags, keylen, pkalgo, created, expire, version,
                ));
                total_keys += 1;
                if total_keys % 100_000 == 0 {
                    info!(total_keys, "scanning keyring dump");
                }
            }
            "uid" => {
                let Some(key) = keys.last_mut() else {
                    warn!(lineno, "uid record before any pub record");
                    continue;
                };
                key.uids.push(UidRecord {
                    name: field(&fields, 9, lineno)?.to_string(),
                    ..UidRecord::default()
                });
            }
            "sig" => {
                let Some(key) = keys.last_mut() else {
                    warn!(lineno, "sig record before any pub record");
                    continue;
                };
                let issuer: KeyId = field(&fields, 1, lineno)?.parse()?;
                let date = field(&fields, 2, lineno)?.to_string();
                let flags = field(&fields, 5, lineno)?;
                let key_id = key.id;
                let sig = SigRecord {
                    issuer,
                    date,
                    expired: flags.contains('e'),
                    revoked: false,
                };
                if key.uids.is_empty() {
                    // Direct key signature (no UID yet).
                    key.add_key_signature(sig);
                } else if let Some(uid) = key.uids.last_mut() {
                    uid.add_signature(key_id, sig);
                }
            }
            "rev" => {
                let Some(key) = keys.last_mut() else {
                    warn!(lineno, "rev record before any pub record");
                    continue;
                };
                let issuer: KeyId = field(&fields, 1, lineno)?.parse()?;
                let date = field(&fields, 2, lineno)?.to_string();
                let revtype_raw = field(&fields, 4, lineno)?;
                let revtype = u32::from_str_radix(revtype_raw.trim_start_matches("0x"), 16)
                    .map_err(|_| KeyringError::MalformedRecord {
                        line: lineno,
                        reason: format!("bad revocation type {:?}", revtype_raw),
                    })?;
                match revtype {
                    0x20 => {
                        key.status = if issuer == key.id {
                            KeyStatus::RevokedByOwner
                        } else {
                            KeyStatus::RevokedByDesignated
                        };
                    }
                    0x30 => {
                        if let Some(uid) = key.uids.last_mut() {
                            if issuer == key.id {
                                uid.revoked = true;
                            } else {
                                let newer = uid
                                    .revocations
                                    .get(&issuer)
                                    .map_or(true, |existing| *existing < date);
                                if newer {
                                    uid.revocations.insert(issuer, date);
                                }
                            }
                        }
                    }
                    other => debug!(lineno, revtype = other, "ignoring revocation type"),
                }
            }
            // Subpacket and other record types carry nothing the graph needs.
            _ => {}
        }
    }
    if let Some(key) = keys.last_mut() {
        key.commit();
    }

    Ok(DumpScan { keys, total_keys })
}

/// Preprocesses a keyring dump into the signature-graph file plus the side
/// tables (`keystatus.csv`, `keynames.csv`, `scan.json`).
///
/// Two passes over the scanned keys: the first collects valid keys carrying
/// non-self signatures, the second drops signatures whose issuer is not such
/// a key itself and discards keys left without any.
pub fn run(dump: &Path, data_dir: &Path) -> anyhow::Result<PreprocessReport> {
    let keyring_bytes = std::fs::metadata(dump)?.len();
    let reader = std::io::BufReader::new(std::fs::File::open(dump)?);
    let mut scan = scan_dump(reader)?;
    info!(
        total_keys = scan.total_keys,
        "keyring dump scanned, filtering signature graph"
    );

    let interesting: HashSet<KeyId> = scan
        .keys
        .iter()
        .filter(|k| k.status == KeyStatus::Valid && !k.sigs.is_empty())
        .map(|k| k.id)
        .collect();

    std::fs::create_dir_all(data_dir)?;
    let preprocessed_path = data_dir.join("preprocessed");
    let mut out = std::io::BufWriter::new(std::fs::File::create(&preprocessed_path)?);
    let mut names = std::io::BufWriter::new(std::fs::File::create(data_dir.join("keynames.csv"))?);

    let mut trusted: HashSet<KeyId> = HashSet::new();
    let mut seen: HashSet<KeyId> = HashSet::new();
    let mut usable_keys = 0u64;
    let mut total_sigs = 0u64;
    let mut dropped_keys = 0u64;
    for key in &scan.keys {
        if !interesting.contains(&key.id) || !seen.insert(key.id) {
            continue;
        }
        let mut issuers: Vec<KeyId> = key
            .sigs
            .values()
            .filter(|s| !s.revoked && interesting.contains(&s.issuer))
            .map(|s| s.issuer)
            .collect();
        if issuers.is_empty() {
            dropped_keys += 1;
            continue;
        }
        issuers.sort_unstable();
        trusted.insert(key.id);
        usable_keys += 1;
        total_sigs += issuers.len() as u64;
        writeln!(out, "p{}", key.id)?;
        for issuer in issuers {
            writeln!(out, "s{}", issuer)?;
        }
        if let Some(name) = key.primary_uid() {
            writeln!(names, "{};{}", key.id, name.replace(';', ","))?;
        }
    }
    out.flush()?;
    names.flush()?;

    let mut status_out =
        std::io::BufWriter::new(std::fs::File::create(data_dir.join("keystatus.csv"))?);
    for key in &mut scan.keys {
        if key.status == KeyStatus::Valid && trusted.contains(&key.id) {
            key.status = KeyStatus::ValidConnected;
        }
        writeln!(
            status_out,
            "{};{};{};{};{};{};{};{}",
            key.status,
            key.id,
            key.pkalgo,
            key.keylen,
            key.created,
            key.expire,
            key.version,
            key.valid_uids
        )?;
    }
    status_out.flush()?;

    let stats = ScanStats {
        keyring_bytes,
        total_keys: scan.total_keys,
        usable_keys,
        total_sigs,
    };
    std::fs::write(
        data_dir.join("scan.json"),
        serde_json::to_string_pretty(&stats)?,
    )?;
    info!(
        usable_keys,
        total_sigs, dropped_keys, "preprocessing complete"
    );

    Ok(PreprocessReport {
        scan: stats,
        dropped_keys,
        preprocessed_path: preprocessed_path.to_string_lossy().to_string(),
    })
}
