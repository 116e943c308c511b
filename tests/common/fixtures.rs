//! Test fixtures for credsift

use std::path::Path;

use sha2::{Digest, Sha256};

use credsift::domain::{Discovery, Rule};
use credsift::infrastructure::codec::RawDiscovery;

/// A discovery with its rule fully populated
pub fn discovery(id: i64, line_number: u32, snippet: &str) -> Discovery {
    Discovery {
        id,
        filename: "a.js".to_string(),
        commit_id: String::new(),
        repo_url: "local".to_string(),
        line_number,
        snippet: snippet.to_string(),
        rule_id: 9,
        rule: Some(Rule {
            id: 9,
            regex: "password".to_string(),
            category: "password".to_string(),
            description: "Plaintext password".to_string(),
        }),
        state: "new".to_string(),
        timestamp: "2024-05-01T10:00:00Z".to_string(),
    }
}

/// Write a discoveries CSV export the way the external tool does.
pub fn write_discoveries_csv(path: &Path, discoveries: &[Discovery]) {
    let mut writer = csv::Writer::from_path(path).expect("failed to create csv fixture");
    for discovery in discoveries {
        writer
            .serialize(RawDiscovery::from(discovery))
            .expect("failed to serialize csv row");
    }
    writer.flush().expect("failed to flush csv fixture");
}

/// The deterministic export filename the runners derive for a target.
pub fn expected_discoveries_file_name(target: &Path) -> String {
    let digest = hex::encode(Sha256::digest(target.to_string_lossy().as_bytes()));
    format!("{}.csv", &digest[..8])
}
